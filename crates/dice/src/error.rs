use thiserror::Error;

/// Failure to parse or validate a dice expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiceError {
    /// Nothing in the grammar matches at `position` (an offset into the
    /// whitespace-stripped, lower-cased expression).
    #[error("unrecognized roll syntax at offset {position}: `{fragment}`")]
    Syntax { fragment: String, position: usize },

    #[error("keep count {requested} is invalid for {dice} dice")]
    InvalidKeepCount { requested: u32, dice: u32 },

    #[error("{what} {value} is out of range ({min}..={max})")]
    OutOfRange {
        what: &'static str,
        value: u64,
        min: u64,
        max: u64,
    },
}

impl DiceError {
    pub(crate) fn syntax(normalized: &str, position: usize) -> Self {
        Self::Syntax {
            fragment: normalized.get(position..).unwrap_or_default().to_owned(),
            position,
        }
    }
}
