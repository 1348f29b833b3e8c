use anyhow::{Context as _, Result};
use async_trait::async_trait;
use plugin_core::{Plugin, PluginContext, PluginSpec};
use tracing::{info, warn};
use triggers::LoadCounts;

/// Owner-only: re-reads the commands document and swaps it in. A document
/// that fails to load leaves the current table in place.
#[derive(Debug)]
pub struct Reload;

fn reload(ctx: &PluginContext) -> Result<LoadCounts> {
    let doc = ctx.source.load()?;
    let counts = ctx
        .triggers
        .reload(&doc)
        .with_context(|| format!("invalid trigger document {}", ctx.source.name()))?;
    Ok(counts)
}

#[async_trait]
impl Plugin for Reload {
    fn id(&self) -> &'static str {
        "reload"
    }

    fn help(&self) -> &'static str {
        "Reload the commands file (owner only)"
    }

    fn spec(&self) -> PluginSpec {
        PluginSpec::new("reload", &["reload"])
    }

    async fn run(&self, ctx: &PluginContext, _args: &str) -> Result<Option<String>> {
        if !ctx.is_owner {
            info!(sender = %ctx.sender, "Refused reload from non-owner");
            return Ok(Some("Sorry, only the owner can reload commands.".to_owned()));
        }

        let name = ctx.source.name();
        let reply = match reload(ctx) {
            Ok(counts) => format!("✅ Reloaded `{name}` ({counts})."),
            Err(e) => {
                warn!(source = %name, error = %format!("{e:#}"), "Failed to reload triggers");
                format!("❌ Failed to reload: `{e:#}`")
            }
        };
        Ok(Some(reply))
    }
}
