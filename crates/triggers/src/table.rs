use core::fmt;
use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::warn;

use crate::{
    error::{LoadError, Section, json_kind},
    reply::{Reply, Variants},
};

/// Canonical form of a trigger key: trimmed and lower-cased.
#[must_use]
pub fn normalize_key(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Literal commands and free-text keywords, each mapping a normalized key to
/// its reply. Built once per load and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct TriggerTable {
    commands: HashMap<String, Reply>,
    keywords: HashMap<String, Reply>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadCounts {
    pub commands: usize,
    pub keywords: usize,
}

impl fmt::Display for LoadCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} commands, {} keywords",
            self.commands, self.keywords
        )
    }
}

impl TriggerTable {
    /// Builds a table from an already decoded document of the form
    /// `{"commands": {key: reply}, "keywords": {key: reply}}`, where a reply
    /// is a string or a non-empty list of strings. Missing sections are
    /// empty. Keys that normalize to the same text keep the last one seen.
    ///
    /// # Errors
    ///
    /// Returns a [`LoadError`] naming the offending section on any
    /// structural problem.
    pub fn from_value(value: &Value) -> Result<Self, LoadError> {
        let Value::Object(root) = value else {
            return Err(LoadError::NotAnObject {
                found: json_kind(value),
            });
        };
        Ok(Self {
            commands: load_section(root, Section::Commands)?,
            keywords: load_section(root, Section::Keywords)?,
        })
    }

    #[must_use]
    pub fn command(&self, key: &str) -> Option<&Reply> {
        self.commands.get(key)
    }

    #[must_use]
    pub fn keyword(&self, key: &str) -> Option<&Reply> {
        self.keywords.get(key)
    }

    /// Command keys, sorted.
    #[must_use]
    pub fn command_keys(&self) -> Vec<&str> {
        sorted_keys(&self.commands)
    }

    /// Keyword keys, sorted.
    #[must_use]
    pub fn keyword_keys(&self) -> Vec<&str> {
        sorted_keys(&self.keywords)
    }

    pub(crate) const fn keywords(&self) -> &HashMap<String, Reply> {
        &self.keywords
    }

    #[must_use]
    pub fn counts(&self) -> LoadCounts {
        LoadCounts {
            commands: self.commands.len(),
            keywords: self.keywords.len(),
        }
    }
}

fn sorted_keys(map: &HashMap<String, Reply>) -> Vec<&str> {
    let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
    keys.sort_unstable();
    keys
}

fn load_section(
    root: &Map<String, Value>,
    section: Section,
) -> Result<HashMap<String, Reply>, LoadError> {
    let entries = match root.get(section.name()) {
        None | Some(Value::Null) => return Ok(HashMap::new()),
        Some(Value::Object(entries)) => entries,
        Some(other) => {
            return Err(LoadError::SectionNotMapping {
                section,
                found: json_kind(other),
            });
        }
    };

    let mut out = HashMap::with_capacity(entries.len());
    for (raw_key, raw_reply) in entries {
        let key = normalize_key(raw_key);
        if key.is_empty() {
            warn!(section = %section, "Skipping trigger with blank key");
            continue;
        }
        let reply = parse_reply(section, &key, raw_reply)?;
        out.insert(key, reply);
    }
    Ok(out)
}

fn parse_reply(section: Section, key: &str, value: &Value) -> Result<Reply, LoadError> {
    let invalid = || LoadError::InvalidEntry {
        section,
        key: key.to_owned(),
    };
    match value {
        Value::String(text) => Ok(Reply::Single(text.clone())),
        Value::Array(items) => {
            let texts = items
                .iter()
                .map(|item| item.as_str().map(ToOwned::to_owned).ok_or_else(invalid))
                .collect::<Result<Vec<_>, _>>()?;
            Variants::new(texts)
                .map(Reply::Variants)
                .ok_or_else(|| LoadError::EmptyVariants {
                    section,
                    key: key.to_owned(),
                })
        }
        Value::Null | Value::Bool(_) | Value::Number(_) | Value::Object(_) => Err(invalid()),
    }
}
