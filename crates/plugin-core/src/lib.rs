use core::{
    fmt::{self, Write as _},
    time::Duration,
};
use std::{collections::HashMap, sync::Arc, time::Instant};

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use triggers::{TriggerStore, normalize_key};

/// Everything a built-in command may look at while handling one message.
#[derive(Clone)]
pub struct PluginContext {
    pub channel: Arc<str>,
    pub sender: Arc<str>,
    /// Lower-cased command word that selected the plugin, without prefix.
    pub command: Arc<str>,
    pub prefix: Arc<str>,
    pub is_owner: bool,
    pub registry: Arc<PluginRegistry>,
    pub triggers: Arc<TriggerStore>,
    pub source: Arc<dyn TriggerSource>,
    pub started_at: Instant,
}

impl fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContext")
            .field("channel", &self.channel)
            .field("sender", &self.sender)
            .field("command", &self.command)
            .field("prefix", &self.prefix)
            .field("is_owner", &self.is_owner)
            .field("source", &self.source.name())
            .finish_non_exhaustive()
    }
}

/// A built-in command. Built-ins take precedence over JSON commands with the
/// same name.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn help(&self) -> &'static str;
    /// Default registration; config may add command names or disable it.
    fn spec(&self) -> PluginSpec;
    /// Whether invocations go through the per-channel cooldown.
    fn rate_limited(&self) -> bool {
        false
    }
    /// Reply sent instead of running while the cooldown holds. `None` stays
    /// silent.
    fn cooldown_notice(&self, _retry_after: Duration) -> Option<String> {
        None
    }
    /// Handles one invocation and returns the text to send, if any.
    async fn run(&self, ctx: &PluginContext, args: &str) -> Result<Option<String>>;
}

/// Where the trigger document comes from, so `reload` can fetch a fresh copy.
pub trait TriggerSource: Send + Sync {
    /// Human-readable origin, e.g. a file path.
    fn name(&self) -> String;
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or decoded.
    fn load(&self) -> Result<serde_json::Value>;
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct PluginTriggers {
    #[serde(default)]
    pub commands: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct PluginSpec {
    pub id: String,
    #[serde(default = "enabled_true")]
    pub enabled: bool,
    #[serde(default)]
    pub triggers: PluginTriggers,
}

const fn enabled_true() -> bool {
    true
}

impl PluginSpec {
    #[must_use]
    pub fn new(id: &str, commands: &[&str]) -> Self {
        Self {
            id: id.to_owned(),
            enabled: true,
            triggers: PluginTriggers {
                commands: commands.iter().map(|c| (*c).to_owned()).collect(),
            },
        }
    }
}

#[derive(Clone)]
pub struct PluginEntry {
    pub spec: PluginSpec,
    pub plugin: Arc<dyn Plugin>,
}

impl fmt::Debug for PluginEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginEntry")
            .field("spec", &self.spec)
            .field("plugin", &self.plugin.id())
            .finish()
    }
}

/// Built-in commands by id and by command name. Filled once at startup and
/// shared read-only afterwards.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    by_id: HashMap<String, PluginEntry>,
    by_command: HashMap<String, String>,
}

impl PluginRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `plugin` under `spec`, replacing an entry with the same id.
    /// Command names are matched case-insensitively and without prefix.
    pub fn register(&mut self, spec: PluginSpec, plugin: Arc<dyn Plugin>) -> Option<PluginEntry> {
        let id = spec.id.clone();
        self.by_command.retain(|_, existing| *existing != id);
        for cmd in &spec.triggers.commands {
            let cmd = normalize_key(cmd);
            if !cmd.is_empty() {
                self.by_command.insert(cmd, id.clone());
            }
        }
        self.by_id.insert(id, PluginEntry { spec, plugin })
    }

    #[must_use]
    pub fn entry_by_command(&self, command: &str) -> Option<&PluginEntry> {
        self.by_command
            .get(command)
            .and_then(|id| self.by_id.get(id))
    }

    /// Registered command names, sorted.
    #[must_use]
    pub fn command_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_command.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Entries sorted by id.
    #[must_use]
    pub fn entries(&self) -> Vec<&PluginEntry> {
        let mut entries: Vec<&PluginEntry> = self.by_id.values().collect();
        entries.sort_by(|a, b| a.spec.id.cmp(&b.spec.id));
        entries
    }
}

#[must_use]
pub fn truncate(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

/// `1d 2h 3m 4s`; zero days, hours and minutes are left out.
#[must_use]
pub fn format_uptime(uptime: Duration) -> String {
    let total = uptime.as_secs();
    let (days, rem) = (total / 86_400, total % 86_400);
    let (hours, rem) = (rem / 3_600, rem % 3_600);
    let (minutes, seconds) = (rem / 60, rem % 60);

    let mut out = String::new();
    for (value, unit) in [(days, 'd'), (hours, 'h'), (minutes, 'm')] {
        if value > 0 {
            let _ = write!(out, "{value}{unit} ");
        }
    }
    let _ = write!(out, "{seconds}s");
    out
}
