//! Decides, for one line of chat text, whether and how the bot answers.
//!
//! Prefixed text is a command: a built-in plugin if one owns the first word,
//! otherwise a JSON command matched on the whole remainder and then on the
//! first word. Unprefixed text goes through the keyword patterns, and only
//! the first matching keyword is considered. Every JSON and keyword reply,
//! and every rate-limited built-in, passes the shared [`CooldownGate`].

mod cooldown;

use core::time::Duration;
use std::{sync::Arc, time::Instant};

use plugin_core::{PluginContext, PluginEntry, PluginRegistry, TriggerSource};
use rand::Rng;
use tracing::{debug, info, warn};
use triggers::{Reply, TriggerStore, normalize_key};

pub use cooldown::{Admission, CooldownGate, CooldownKey, TriggerKind};

#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub prefix: String,
    pub cooldown: Duration,
    /// Sender allowed to run owner-only built-ins; `None` allows everyone.
    pub owner: Option<String>,
}

/// One incoming text event.
#[derive(Debug, Clone, Copy)]
pub struct Incoming<'a> {
    pub text: &'a str,
    pub channel: &'a str,
    pub sender: &'a str,
    pub now: Instant,
}

#[derive(Debug)]
pub enum Route<'r> {
    /// Hand off to a built-in plugin.
    Builtin {
        entry: &'r PluginEntry,
        command: String,
        args: String,
    },
    Reply {
        kind: TriggerKind,
        key: String,
        text: String,
    },
    /// A trigger matched but is still cooling down in this channel.
    Suppressed {
        kind: TriggerKind,
        key: String,
        retry_after: Duration,
    },
    Ignored,
}

pub struct Router {
    prefix: Arc<str>,
    cooldown: Duration,
    owner: Option<String>,
    registry: Arc<PluginRegistry>,
    triggers: Arc<TriggerStore>,
    source: Arc<dyn TriggerSource>,
    gate: CooldownGate,
    started_at: Instant,
}

impl core::fmt::Debug for Router {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Router")
            .field("prefix", &self.prefix)
            .field("cooldown", &self.cooldown)
            .field("owner", &self.owner)
            .field("registry", &self.registry)
            .field("cooldown_entries", &self.gate.len())
            .finish_non_exhaustive()
    }
}

impl Router {
    #[must_use]
    pub fn new(
        config: RouterConfig,
        registry: Arc<PluginRegistry>,
        triggers: Arc<TriggerStore>,
        source: Arc<dyn TriggerSource>,
    ) -> Self {
        Self {
            prefix: Arc::from(config.prefix),
            cooldown: config.cooldown,
            owner: config.owner,
            registry,
            triggers,
            source,
            gate: CooldownGate::new(),
            started_at: Instant::now(),
        }
    }

    /// Routes `msg` and produces the reply to send, if any. Built-ins are run
    /// here; their failures are logged and produce no reply.
    pub async fn dispatch(&self, msg: Incoming<'_>) -> Option<String> {
        // ThreadRng is not Send; keep it out of the awaited section.
        let route = {
            let mut rng = rand::thread_rng();
            self.route_with(&msg, &mut rng)
        };

        match route {
            Route::Builtin {
                entry,
                command,
                args,
            } => {
                let ctx = self.context(&msg, &command);
                info!(channel = %msg.channel, plugin = %entry.spec.id, command = %command, "Running built-in command");
                match entry.plugin.run(&ctx, &args).await {
                    Ok(reply) => reply,
                    Err(e) => {
                        warn!(error = %e, plugin = %entry.spec.id, "Plugin failed");
                        None
                    }
                }
            }
            Route::Reply { kind, key, text } => {
                info!(channel = %msg.channel, kind = kind.as_str(), key = %key, "Trigger fired");
                Some(text)
            }
            Route::Suppressed {
                kind: TriggerKind::Builtin,
                key,
                retry_after,
            } => {
                debug!(channel = %msg.channel, command = %key, ?retry_after, "Built-in cooling down");
                self.registry
                    .entry_by_command(&key)
                    .and_then(|entry| entry.plugin.cooldown_notice(retry_after))
            }
            Route::Suppressed {
                kind,
                key,
                retry_after,
            } => {
                debug!(channel = %msg.channel, kind = kind.as_str(), key = %key, ?retry_after, "Trigger cooling down");
                None
            }
            Route::Ignored => None,
        }
    }

    /// The routing decision alone, with an explicit RNG for reply variants.
    /// Records cooldowns but runs nothing.
    pub fn route_with<R: Rng + ?Sized>(&self, msg: &Incoming<'_>, rng: &mut R) -> Route<'_> {
        let trimmed = msg.text.trim();
        let Some(rest) = strip_prefix_ignore_case(trimmed, &self.prefix) else {
            return self.route_keyword(msg, rng);
        };

        let rest = rest.trim();
        let (first, args) = rest
            .split_once(char::is_whitespace)
            .map_or((rest, ""), |(word, args)| (word, args.trim()));
        let first_word = first.to_lowercase();

        if let Some(entry) = self.registry.entry_by_command(&first_word) {
            if entry.plugin.rate_limited() {
                let key = CooldownKey::new(msg.channel, TriggerKind::Builtin, &entry.spec.id);
                if let Admission::Blocked { retry_after } =
                    self.gate.admit(key, msg.now, self.cooldown)
                {
                    return Route::Suppressed {
                        kind: TriggerKind::Builtin,
                        key: first_word,
                        retry_after,
                    };
                }
            }
            return Route::Builtin {
                entry,
                command: first_word,
                args: args.to_owned(),
            };
        }

        let raw = normalize_key(rest);
        let snapshot = self.triggers.snapshot();
        let table = snapshot.table();
        let matched = [raw.as_str(), first_word.as_str()]
            .into_iter()
            .find_map(|key| table.command(key).map(|reply| (key, reply)));
        match matched {
            Some((key, reply)) => self.fire(msg, TriggerKind::Command, key, reply, rng),
            None => {
                debug!(channel = %msg.channel, command = %first_word, "No command matched");
                Route::Ignored
            }
        }
    }

    fn route_keyword<R: Rng + ?Sized>(&self, msg: &Incoming<'_>, rng: &mut R) -> Route<'_> {
        let snapshot = self.triggers.snapshot();
        snapshot
            .keyword_patterns()
            .iter()
            .find(|pattern| pattern.is_match(msg.text))
            .map_or(Route::Ignored, |pattern| {
                self.fire(msg, TriggerKind::Keyword, pattern.key(), pattern.reply(), rng)
            })
    }

    fn fire<R: Rng + ?Sized>(
        &self,
        msg: &Incoming<'_>,
        kind: TriggerKind,
        key: &str,
        reply: &Reply,
        rng: &mut R,
    ) -> Route<'_> {
        match self
            .gate
            .admit(CooldownKey::new(msg.channel, kind, key), msg.now, self.cooldown)
        {
            Admission::Admitted => Route::Reply {
                kind,
                key: key.to_owned(),
                text: reply.pick(rng).to_owned(),
            },
            Admission::Blocked { retry_after } => Route::Suppressed {
                kind,
                key: key.to_owned(),
                retry_after,
            },
        }
    }

    fn context(&self, msg: &Incoming<'_>, command: &str) -> PluginContext {
        PluginContext {
            channel: Arc::from(msg.channel),
            sender: Arc::from(msg.sender),
            command: Arc::from(command),
            prefix: Arc::clone(&self.prefix),
            is_owner: self.owner.as_deref().is_none_or(|owner| owner == msg.sender),
            registry: Arc::clone(&self.registry),
            triggers: Arc::clone(&self.triggers),
            source: Arc::clone(&self.source),
            started_at: self.started_at,
        }
    }
}

fn strip_prefix_ignore_case<'t>(text: &'t str, prefix: &str) -> Option<&'t str> {
    if prefix.is_empty() {
        return None;
    }
    let head = text.get(..prefix.len())?;
    (head.to_lowercase() == prefix.to_lowercase()).then(|| &text[prefix.len()..])
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use async_trait::async_trait;
    use plugin_core::{Plugin, PluginSpec};
    use rand::{SeedableRng as _, rngs::StdRng};
    use serde_json::{Value, json};

    use super::*;

    const WINDOW: Duration = Duration::from_secs(5);

    #[derive(Debug)]
    struct Echo {
        limited: bool,
    }

    #[async_trait]
    impl Plugin for Echo {
        fn id(&self) -> &'static str {
            "echo"
        }
        fn help(&self) -> &'static str {
            "echo"
        }
        fn spec(&self) -> PluginSpec {
            PluginSpec::new("echo", &["echo", "say"])
        }
        fn rate_limited(&self) -> bool {
            self.limited
        }
        fn cooldown_notice(&self, retry_after: Duration) -> Option<String> {
            Some(format!("wait {:.1}s", retry_after.as_secs_f64()))
        }
        async fn run(&self, ctx: &PluginContext, args: &str) -> Result<Option<String>> {
            Ok(Some(format!("{}|{args}|{}", ctx.command, ctx.is_owner)))
        }
    }

    #[derive(Debug)]
    struct Failing;

    #[async_trait]
    impl Plugin for Failing {
        fn id(&self) -> &'static str {
            "boom"
        }
        fn help(&self) -> &'static str {
            "fails"
        }
        fn spec(&self) -> PluginSpec {
            PluginSpec::new("boom", &["boom"])
        }
        async fn run(&self, _ctx: &PluginContext, _args: &str) -> Result<Option<String>> {
            anyhow::bail!("kaboom")
        }
    }

    struct Fixed(Value);

    impl TriggerSource for Fixed {
        fn name(&self) -> String {
            "fixed".to_owned()
        }
        fn load(&self) -> Result<Value> {
            Ok(self.0.clone())
        }
    }

    fn router_with(doc: &Value, limited: bool, owner: Option<&str>) -> Router {
        let mut registry = PluginRegistry::new();
        let echo = Echo { limited };
        registry.register(echo.spec(), Arc::new(echo));
        registry.register(Failing.spec(), Arc::new(Failing));
        let triggers = TriggerStore::from_value(doc).unwrap();
        Router::new(
            RouterConfig {
                prefix: "!".to_owned(),
                cooldown: WINDOW,
                owner: owner.map(ToOwned::to_owned),
            },
            Arc::new(registry),
            Arc::new(triggers),
            Arc::new(Fixed(doc.clone())),
        )
    }

    fn router(doc: &Value) -> Router {
        router_with(doc, false, None)
    }

    fn msg<'a>(text: &'a str, channel: &'static str, now: Instant) -> Incoming<'a> {
        Incoming {
            text,
            channel,
            sender: "@alice:example.org",
            now,
        }
    }

    fn reply_text(route: Route<'_>) -> Option<String> {
        match route {
            Route::Reply { text, .. } => Some(text),
            Route::Builtin { .. } | Route::Suppressed { .. } | Route::Ignored => None,
        }
    }

    #[test]
    fn command_variants_then_cooldown() {
        let router = router(&json!({ "commands": { "hello": ["Hi", "Yo"] } }));
        let mut rng = StdRng::seed_from_u64(1);
        let t0 = Instant::now();

        let first = reply_text(router.route_with(&msg("!hello there", "room", t0), &mut rng));
        assert!(matches!(first.as_deref(), Some("Hi" | "Yo")));

        let second = router.route_with(&msg("!hello there", "room", t0 + Duration::from_secs(1)), &mut rng);
        assert!(matches!(
            second,
            Route::Suppressed {
                kind: TriggerKind::Command,
                ..
            }
        ));

        let later = router.route_with(&msg("!hello there", "room", t0 + Duration::from_secs(6)), &mut rng);
        assert!(reply_text(later).is_some());
    }

    #[test]
    fn exact_remainder_beats_first_word() {
        let router = router(&json!({
            "commands": { "good morning": "gm", "good": "g" }
        }));
        let mut rng = StdRng::seed_from_u64(2);
        let t0 = Instant::now();
        assert_eq!(
            reply_text(router.route_with(&msg("!Good Morning", "a", t0), &mut rng)).as_deref(),
            Some("gm")
        );
        assert_eq!(
            reply_text(router.route_with(&msg("!good day", "b", t0), &mut rng)).as_deref(),
            Some("g")
        );
    }

    #[test]
    fn prefixed_text_never_reaches_keywords() {
        let router = router(&json!({ "keywords": { "bean": "Bean!" } }));
        let mut rng = StdRng::seed_from_u64(3);
        let route = router.route_with(&msg("!bean", "room", Instant::now()), &mut rng);
        assert!(matches!(route, Route::Ignored));
        let route = router.route_with(&msg("!nothing about bean", "room", Instant::now()), &mut rng);
        assert!(matches!(route, Route::Ignored));
    }

    #[test]
    fn keyword_prefers_longer_phrase() {
        let router = router(&json!({
            "keywords": { "war": "r1", "world war": "r2" }
        }));
        let mut rng = StdRng::seed_from_u64(4);
        let route = router.route_with(&msg("world war stories", "room", Instant::now()), &mut rng);
        assert_eq!(reply_text(route).as_deref(), Some("r2"));
    }

    #[test]
    fn blocked_first_keyword_stops_the_search() {
        let router = router(&json!({
            "keywords": { "war": "r1", "world war": "r2" }
        }));
        let mut rng = StdRng::seed_from_u64(5);
        let t0 = Instant::now();
        assert!(reply_text(router.route_with(&msg("world war", "room", t0), &mut rng)).is_some());

        let route = router.route_with(&msg("world war and war", "room", t0 + Duration::from_secs(1)), &mut rng);
        assert!(matches!(
            route,
            Route::Suppressed { kind: TriggerKind::Keyword, ref key, .. } if key == "world war"
        ));
    }

    #[test]
    fn cooldowns_are_per_channel_and_per_namespace() {
        let router = router(&json!({
            "commands": { "bean": "cmd" },
            "keywords": { "bean": "kw" }
        }));
        let mut rng = StdRng::seed_from_u64(6);
        let t0 = Instant::now();
        assert_eq!(
            reply_text(router.route_with(&msg("!bean", "room", t0), &mut rng)).as_deref(),
            Some("cmd")
        );
        assert_eq!(
            reply_text(router.route_with(&msg("bean", "room", t0), &mut rng)).as_deref(),
            Some("kw")
        );
        assert_eq!(
            reply_text(router.route_with(&msg("bean", "other", t0), &mut rng)).as_deref(),
            Some("kw")
        );
        assert!(matches!(
            router.route_with(&msg("bean", "room", t0), &mut rng),
            Route::Suppressed { .. }
        ));
    }

    #[test]
    fn builtins_shadow_json_commands() {
        let router = router(&json!({ "commands": { "echo": "json echo" } }));
        let mut rng = StdRng::seed_from_u64(7);
        let route = router.route_with(&msg("  !ECHO  Some Text ", "room", Instant::now()), &mut rng);
        match route {
            Route::Builtin {
                entry,
                command,
                args,
            } => {
                assert_eq!(entry.spec.id, "echo");
                assert_eq!(command, "echo");
                assert_eq!(args, "Some Text");
            }
            other => panic!("unexpected route {other:?}"),
        }
    }

    #[test]
    fn unmatched_text_is_ignored() {
        let router = router(&json!({ "commands": { "hello": "Hi" }, "keywords": { "bean": "b" } }));
        let mut rng = StdRng::seed_from_u64(8);
        let now = Instant::now();
        assert!(matches!(router.route_with(&msg("!", "r", now), &mut rng), Route::Ignored));
        assert!(matches!(router.route_with(&msg("!bye", "r", now), &mut rng), Route::Ignored));
        assert!(matches!(router.route_with(&msg("beans", "r", now), &mut rng), Route::Ignored));
        assert!(matches!(router.route_with(&msg("", "r", now), &mut rng), Route::Ignored));
    }

    #[tokio::test]
    async fn dispatch_runs_builtins_with_context() {
        let router = router_with(&json!({}), false, Some("@owner:example.org"));
        let reply = router.dispatch(msg("!say hi there", "room", Instant::now())).await;
        assert_eq!(reply.as_deref(), Some("say|hi there|false"));
    }

    #[tokio::test]
    async fn dispatch_reports_builtin_cooldown() {
        let router = router_with(&json!({}), true, None);
        let t0 = Instant::now();
        let first = router.dispatch(msg("!echo a", "room", t0)).await;
        assert_eq!(first.as_deref(), Some("echo|a|true"));
        let second = router
            .dispatch(msg("!say b", "room", t0 + Duration::from_secs(2)))
            .await;
        assert_eq!(
            second.as_deref(),
            Some("wait 3.0s")
        );
    }

    #[tokio::test]
    async fn dispatch_swallows_plugin_errors_and_silences_cooldowns() {
        let router = router(&json!({ "keywords": { "bean": "b" } }));
        let t0 = Instant::now();
        assert_eq!(router.dispatch(msg("!boom", "room", t0)).await, None);
        assert_eq!(
            router.dispatch(msg("bean", "room", t0)).await.as_deref(),
            Some("b")
        );
        assert_eq!(router.dispatch(msg("bean", "room", t0)).await, None);
    }

    #[test]
    fn prefix_matching_ignores_case() {
        assert_eq!(strip_prefix_ignore_case("Bot, roll", "bot,"), Some(" roll"));
        assert_eq!(strip_prefix_ignore_case("!roll", "!"), Some("roll"));
        assert_eq!(strip_prefix_ignore_case("roll", "!"), None);
        assert_eq!(strip_prefix_ignore_case("é", "!!"), None);
        assert_eq!(strip_prefix_ignore_case("!roll", ""), None);
    }
}
