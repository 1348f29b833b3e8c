use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::info;

use crate::{
    error::LoadError,
    pattern::{KeywordPattern, compile_patterns},
    reply::Reply,
    table::{LoadCounts, TriggerTable, normalize_key},
};

/// One consistent generation of the trigger table together with the keyword
/// matchers derived from it.
#[derive(Debug, Default)]
pub struct TriggerSnapshot {
    table: TriggerTable,
    patterns: Vec<KeywordPattern>,
}

impl TriggerSnapshot {
    /// # Errors
    ///
    /// Any [`LoadError`] from parsing the document or building matchers.
    pub fn from_value(value: &Value) -> Result<Self, LoadError> {
        let table = TriggerTable::from_value(value)?;
        let patterns = compile_patterns(table.keywords())?;
        Ok(Self { table, patterns })
    }

    /// Looks up a command; `key` is normalized first.
    #[must_use]
    pub fn lookup_command(&self, key: &str) -> Option<&Reply> {
        self.table.command(&normalize_key(key))
    }

    /// Keyword matchers, longest key first.
    #[must_use]
    pub fn keyword_patterns(&self) -> &[KeywordPattern] {
        &self.patterns
    }

    #[must_use]
    pub const fn table(&self) -> &TriggerTable {
        &self.table
    }
}

/// Holds the current [`TriggerSnapshot`]. Reloads build a complete new
/// snapshot off to the side and swap it in, so a reader sees either the old
/// or the new generation in full.
#[derive(Debug, Default)]
pub struct TriggerStore {
    current: RwLock<Arc<TriggerSnapshot>>,
}

impl TriggerStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store already holding `value`.
    ///
    /// # Errors
    ///
    /// See [`TriggerStore::reload`].
    pub fn from_value(value: &Value) -> Result<Self, LoadError> {
        let store = Self::new();
        store.reload(value)?;
        Ok(store)
    }

    /// The generation current at call time. Hold on to it for the duration
    /// of one decision.
    #[must_use]
    pub fn snapshot(&self) -> Arc<TriggerSnapshot> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    #[must_use]
    pub fn lookup_command(&self, key: &str) -> Option<Reply> {
        self.snapshot().lookup_command(key).cloned()
    }

    /// Replaces the whole table. On error the previous generation stays.
    ///
    /// # Errors
    ///
    /// Any [`LoadError`] from the new document.
    pub fn reload(&self, value: &Value) -> Result<LoadCounts, LoadError> {
        let next = TriggerSnapshot::from_value(value)?;
        let counts = next.table.counts();
        let patterns = next.patterns.len();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
        info!(
            commands = counts.commands,
            keywords = counts.keywords,
            patterns,
            "Loaded trigger table"
        );
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use serde_json::json;

    use super::*;

    fn first_keyword_reply(snapshot: &TriggerSnapshot, text: &str) -> Option<String> {
        snapshot
            .keyword_patterns()
            .iter()
            .find(|p| p.is_match(text))
            .and_then(|p| p.reply().texts().first().cloned())
    }

    #[test]
    fn starts_empty() {
        let store = TriggerStore::new();
        assert!(store.lookup_command("hello").is_none());
        assert!(store.snapshot().keyword_patterns().is_empty());
    }

    #[test]
    fn lookup_normalizes_its_key() {
        let store = TriggerStore::from_value(&json!({ "commands": { "hello": "Hi" } })).unwrap();
        assert_eq!(store.lookup_command("  HELLO "), Some(Reply::Single("Hi".to_owned())));
    }

    #[test]
    fn failed_reload_keeps_previous_table() {
        let store = TriggerStore::from_value(&json!({
            "commands": { "hello": "Hi" },
            "keywords": { "bean": "Bean!" }
        }))
        .unwrap();

        let err = store
            .reload(&json!({
                "commands": { "bye": "Bye" },
                "keywords": { "bean": [] }
            }))
            .unwrap_err();
        assert!(matches!(err, LoadError::EmptyVariants { .. }));

        let snapshot = store.snapshot();
        assert!(snapshot.lookup_command("hello").is_some());
        assert!(snapshot.lookup_command("bye").is_none());
        assert_eq!(
            first_keyword_reply(&snapshot, "a bean appears").as_deref(),
            Some("Bean!")
        );
    }

    #[test]
    fn held_snapshot_survives_reload() {
        let store = TriggerStore::from_value(&json!({ "commands": { "a": "old" } })).unwrap();
        let held = store.snapshot();
        let counts = store
            .reload(&json!({ "commands": { "a": "new", "b": "x" } }))
            .unwrap();
        assert_eq!(counts.commands, 2);
        assert_eq!(held.lookup_command("a"), Some(&Reply::Single("old".to_owned())));
        assert_eq!(
            store.lookup_command("a"),
            Some(Reply::Single("new".to_owned()))
        );
    }

    #[test]
    fn readers_never_see_a_mixed_generation() {
        let generation = |tag: &str| {
            json!({
                "commands": { "which": tag },
                "keywords": { "which": tag }
            })
        };
        let store = TriggerStore::from_value(&generation("a")).unwrap();

        thread::scope(|scope| {
            scope.spawn(|| {
                for i in 0..200 {
                    let tag = if i % 2 == 0 { "b" } else { "a" };
                    store.reload(&generation(tag)).unwrap();
                }
            });
            for _ in 0..4 {
                scope.spawn(|| {
                    for _ in 0..500 {
                        let snapshot = store.snapshot();
                        let command = snapshot
                            .lookup_command("which")
                            .and_then(|r| r.texts().first().cloned());
                        let keyword = first_keyword_reply(&snapshot, "which one");
                        assert_eq!(command, keyword);
                    }
                });
            }
        });
    }
}
