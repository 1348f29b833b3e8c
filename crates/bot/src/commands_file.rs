use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context as _, Result};
use plugin_core::TriggerSource;
use serde_json::{Value, json};
use tracing::{info, warn};

/// The commands/keywords JSON document on disk.
#[derive(Debug, Clone)]
pub(crate) struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the starter document if nothing exists at the path yet.
    /// Returns whether a file was created.
    pub(crate) fn ensure_exists(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        warn!(file = %self.path.display(), "Commands file not found, creating a starter file");
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(&starter())?;
        fs::write(&self.path, data)
            .with_context(|| format!("writing starter commands file at {}", self.path.display()))?;
        info!(file = %self.path.display(), "Wrote starter commands file");
        Ok(true)
    }
}

impl TriggerSource for JsonFileSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Value> {
        let data = fs::read_to_string(&self.path)
            .with_context(|| format!("reading commands file at {}", self.path.display()))?;
        serde_json::from_str(&data)
            .with_context(|| format!("parsing commands file at {}", self.path.display()))
    }
}

fn starter() -> Value {
    json!({
        "commands": {
            "hello": ["Hey there! 👋", "Hello!", "Yo!", "Hiya 👋"],
            "ping": "Pong!",
            "version": format!("Matrix trigger bot v{}", env!("CARGO_PKG_VERSION")),
        },
        "keywords": {
            "bean": [
                "Bean detected. Initiating chili protocol… 🌶️🫘",
                "Mr. Bean is in the house! 🧥",
                "It’s Bean time 🫘",
            ],
            "war": ["⚔️ War… war never changes.", "War? I prefer board games."],
        },
    })
}
