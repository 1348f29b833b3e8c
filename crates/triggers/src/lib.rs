//! Command and keyword trigger tables.
//!
//! A [`TriggerStore`] owns the current [`TriggerSnapshot`]: the normalized
//! [`TriggerTable`] plus its [`KeywordPattern`]s, ordered longest key first.
//! Reloading replaces the snapshot wholesale or not at all.

mod error;
mod pattern;
mod reply;
mod store;
mod table;

pub use error::{LoadError, Section};
pub use pattern::{KeywordPattern, compile_patterns};
pub use reply::{Reply, Variants};
pub use store::{TriggerSnapshot, TriggerStore};
pub use table::{LoadCounts, TriggerTable, normalize_key};
