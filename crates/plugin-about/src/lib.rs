use anyhow::Result;
use async_trait::async_trait;
use plugin_core::{Plugin, PluginContext, PluginSpec, format_uptime};

/// Bot version, uptime and owner.
#[derive(Debug, Clone)]
pub struct About {
    version: &'static str,
    owner: Option<String>,
}

impl About {
    #[must_use]
    pub const fn new(version: &'static str, owner: Option<String>) -> Self {
        Self { version, owner }
    }
}

#[async_trait]
impl Plugin for About {
    fn id(&self) -> &'static str {
        "about"
    }

    fn help(&self) -> &'static str {
        "Version, uptime and owner"
    }

    fn spec(&self) -> PluginSpec {
        PluginSpec::new("about", &["about"])
    }

    async fn run(&self, ctx: &PluginContext, _args: &str) -> Result<Option<String>> {
        let owner = self
            .owner
            .as_deref()
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .unwrap_or("Unknown");
        Ok(Some(format!(
            "🤖 Trigger Bot\nVersion: {}\nUptime: {}\nOwner: {owner}",
            self.version,
            format_uptime(ctx.started_at.elapsed()),
        )))
    }
}
