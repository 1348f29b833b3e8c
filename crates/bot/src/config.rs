use core::time::Duration;
use std::{fs, path::Path, path::PathBuf};

use anyhow::{Context as _, Result, ensure};
use plugin_core::PluginSpec;
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub(crate) struct BotConfig {
    /// Marks a message as a command, matched case-insensitively.
    pub(crate) prefix: String,
    /// Per-channel cooldown shared by every trigger and by rate-limited
    /// built-ins.
    pub(crate) cooldown_secs: u64,
    pub(crate) commands_file: PathBuf,
    /// Matrix user allowed to run `reload`. Unset means anyone.
    pub(crate) owner: Option<String>,
    #[serde(alias = "tools")]
    pub(crate) plugins: Vec<PluginSpec>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: "!".to_owned(),
            cooldown_secs: 5,
            commands_file: PathBuf::from("./commands.json"),
            owner: None,
            plugins: Vec::new(),
        }
    }
}

impl BotConfig {
    pub(crate) const fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    fn validate(self) -> Result<Self> {
        ensure!(!self.prefix.trim().is_empty(), "config: prefix must not be empty");
        Ok(self)
    }
}

/// Reads the YAML config at `path`. A missing file means all defaults.
pub(crate) fn load_config(path: &Path) -> Result<BotConfig> {
    if !path.exists() {
        info!(file = %path.display(), "No config file, using defaults");
        return BotConfig::default().validate();
    }
    let yaml = fs::read_to_string(path)
        .with_context(|| format!("reading config file at {}", path.display()))?;
    if yaml.trim().is_empty() {
        return BotConfig::default().validate();
    }
    let cfg: BotConfig = serde_yaml::from_str(&yaml).context("parsing YAML config")?;
    cfg.validate()
}
