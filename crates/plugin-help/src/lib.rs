use anyhow::Result;
use async_trait::async_trait;
use plugin_core::{Plugin, PluginContext, PluginSpec};

#[derive(Debug)]
pub struct Help;

fn listing<'a>(items: impl IntoIterator<Item = &'a str>, prefix: &str) -> String {
    let rendered: Vec<String> = items
        .into_iter()
        .map(|item| format!("`{prefix}{item}`"))
        .collect();
    if rendered.is_empty() {
        "_none_".to_owned()
    } else {
        rendered.join(", ")
    }
}

#[async_trait]
impl Plugin for Help {
    fn id(&self) -> &'static str {
        "help"
    }

    fn help(&self) -> &'static str {
        "List commands and keyword triggers"
    }

    fn spec(&self) -> PluginSpec {
        PluginSpec::new("help", &["help"])
    }

    async fn run(&self, ctx: &PluginContext, _args: &str) -> Result<Option<String>> {
        let prefix = &*ctx.prefix;
        let builtins = ctx.registry.command_names();
        let snapshot = ctx.triggers.snapshot();
        let table = snapshot.table();
        // Built-ins win over JSON commands of the same name.
        let json_commands = table
            .command_keys()
            .into_iter()
            .filter(|key| ctx.registry.entry_by_command(key).is_none());

        let lines = [
            format!("**Prefix:** `{prefix}`"),
            String::new(),
            format!("**Built-in commands:** {}", listing(builtins, prefix)),
            format!("**JSON commands:** {}", listing(json_commands, prefix)),
            format!(
                "**Keyword triggers (no prefix):** {}",
                listing(table.keyword_keys(), "")
            ),
            String::new(),
            format!(
                "• Dice help: try `{prefix}roll 1d20+5`, `{prefix}roll adv+2`, or `{prefix}roll 3d6 + 2d4 + 5`"
            ),
        ];
        Ok(Some(lines.join("\n")))
    }
}
