use tracing::{Subscriber, level_filters::LevelFilter};
use tracing_subscriber::{
    EnvFilter, Layer, layer::SubscriberExt as _, registry::LookupSpan, util::SubscriberInitExt as _,
};

/// SDK targets that are noisy at INFO; `RUST_LOG` can still raise them.
const QUIET_TARGETS: [&str; 3] = ["matrix_sdk=warn", "matrix_sdk_base=warn", "matrix_sdk_crypto=warn"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    /// Value of `RUST_LOG_MODE`; anything but `json` is pretty.
    fn from_mode(mode: Option<&str>) -> Self {
        match mode.map(str::trim) {
            Some(m) if m.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Pretty,
        }
    }

    pub(crate) fn layer<S>(self) -> Box<dyn Layer<S> + Send + Sync + 'static>
    where
        for<'a> S: Subscriber + LookupSpan<'a>,
    {
        let fmt = tracing_subscriber::fmt::layer().with_thread_names(true);

        match self {
            Self::Json => Box::new(fmt.json().with_target(false)),
            Self::Pretty => Box::new(
                fmt.pretty()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            ),
        }
    }
}

fn env_filter() -> EnvFilter {
    let explicit = std::env::var_os("RUST_LOG").is_some();
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    if explicit {
        return filter;
    }
    QUIET_TARGETS
        .iter()
        .filter_map(|d| d.parse().ok())
        .fold(filter, EnvFilter::add_directive)
}

/// `RUST_LOG` picks levels (default INFO), `RUST_LOG_MODE=json` switches to
/// JSON lines.
pub(crate) fn init_tracing() {
    let mode = std::env::var("RUST_LOG_MODE").ok();
    tracing_subscriber::registry()
        .with(env_filter())
        .with(LogFormat::from_mode(mode.as_deref()).layer())
        .init();
}
