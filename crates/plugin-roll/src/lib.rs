use core::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use plugin_core::{Plugin, PluginContext, PluginSpec};
use tracing::debug;

/// `roll <expr>`, plus `adv` and `dis` as shorthands for rolling with
/// advantage or disadvantage.
#[derive(Debug)]
pub struct Roll;

impl Roll {
    /// The expression to evaluate for one invocation. `adv`/`dis` put their
    /// own name in front, so `adv +5` rolls `adv+5`.
    fn expression(command: &str, args: &str) -> String {
        match command {
            "adv" | "dis" => format!("{command}{args}"),
            _ => args.to_owned(),
        }
    }

    fn usage(prefix: &str) -> String {
        format!(
            "❌ Invalid roll. Try examples like:\n\
             `{prefix}roll 3d6 + 2d4 + 5` • `{prefix}roll 2d20kh1 + 1d6 - 2` • `{prefix}roll adv + 3` • `{prefix}roll d20`"
        )
    }
}

#[async_trait]
impl Plugin for Roll {
    fn id(&self) -> &'static str {
        "roll"
    }

    fn help(&self) -> &'static str {
        "Roll dice: 3d6+2d4+5, 4d6kh3, adv+1"
    }

    fn spec(&self) -> PluginSpec {
        PluginSpec::new("roll", &["roll", "adv", "dis"])
    }

    fn rate_limited(&self) -> bool {
        true
    }

    fn cooldown_notice(&self, retry_after: Duration) -> Option<String> {
        Some(format!(
            "⏳ Roll is on cooldown here. Try again in {:.1}s.",
            retry_after.as_secs_f64()
        ))
    }

    async fn run(&self, ctx: &PluginContext, args: &str) -> Result<Option<String>> {
        let expr = Self::expression(&ctx.command, args);
        match dice::evaluate_expression(&expr) {
            Ok(roll) => Ok(Some(roll.text)),
            Err(e) => {
                debug!(channel = %ctx.channel, expr = %expr, error = %e, "Rejected roll");
                Ok(Some(Self::usage(&ctx.prefix)))
            }
        }
    }
}
