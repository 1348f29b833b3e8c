use core::fmt;

use serde_json::Value;
use thiserror::Error;

/// The two sections of a trigger document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Commands,
    Keywords,
}

impl Section {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Commands => "commands",
            Self::Keywords => "keywords",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Structural problem in a trigger document. The previously loaded table
/// stays in effect whenever one of these is returned.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("trigger config must be an object, found {found}")]
    NotAnObject { found: &'static str },

    #[error("section `{section}` must map keys to replies, found {found}")]
    SectionNotMapping {
        section: Section,
        found: &'static str,
    },

    #[error("`{section}.{key}`: reply must be a string or a list of strings")]
    InvalidEntry { section: Section, key: String },

    #[error("`{section}.{key}`: reply list is empty")]
    EmptyVariants { section: Section, key: String },

    #[error("`keywords.{key}`: cannot build matcher")]
    Pattern {
        key: String,
        #[source]
        source: regex::Error,
    },
}

impl LoadError {
    /// Section the error was found in, when it belongs to one.
    #[must_use]
    pub const fn section(&self) -> Option<Section> {
        match self {
            Self::NotAnObject { .. } => None,
            Self::SectionNotMapping { section, .. }
            | Self::InvalidEntry { section, .. }
            | Self::EmptyVariants { section, .. } => Some(*section),
            Self::Pattern { .. } => Some(Section::Keywords),
        }
    }
}

pub(crate) const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
