use anyhow::Result;
use async_trait::async_trait;
use plugin_core::{Plugin, PluginContext, PluginSpec, format_uptime};

#[derive(Debug)]
pub struct Ping;

#[async_trait]
impl Plugin for Ping {
    fn id(&self) -> &'static str {
        "ping"
    }

    fn help(&self) -> &'static str {
        "🏓"
    }

    fn spec(&self) -> PluginSpec {
        PluginSpec::new("ping", &["ping"])
    }

    async fn run(&self, ctx: &PluginContext, _args: &str) -> Result<Option<String>> {
        let uptime = format_uptime(ctx.started_at.elapsed());
        Ok(Some(format!("🏓 Pong! Uptime: {uptime}")))
    }
}
