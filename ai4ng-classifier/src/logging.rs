//! Tracing setup
//!
//! The subscriber is installed before configuration is read, so config file
//! discovery and overrides are logged. It starts at `RUST_LOG` (or `info`)
//! and takes the configured `logging.level` once the config is loaded.

use ai4ng_common::config::LoggingConfig;
use tracing::{warn, Subscriber};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::{reload, EnvFilter, Registry};

/// Level used until the configuration is loaded
pub const STARTUP_LEVEL: &str = "info";

/// Handle for changing the active filter after startup
pub struct LogLevel {
    handle: reload::Handle<EnvFilter, Registry>,
    from_env: bool,
}

impl LogLevel {
    /// Switch to the configured level; a valid `RUST_LOG` keeps precedence
    ///
    /// Returns whether the filter changed.
    pub fn apply(&self, config: &LoggingConfig) -> bool {
        if self.from_env {
            return false;
        }
        match self.handle.reload(EnvFilter::new(&config.level)) {
            Ok(()) => true,
            Err(e) => {
                warn!("Could not apply log level {}: {}", config.level, e);
                false
            }
        }
    }
}

/// Install the global subscriber writing to stdout
pub fn init() -> LogLevel {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (subscriber, level) = subscriber(rust_log.as_deref(), std::io::stdout);
    subscriber.init();
    level
}

/// Registry with a reloadable filter and a fmt layer on `make_writer`
pub fn subscriber<W>(
    rust_log: Option<&str>,
    make_writer: W,
) -> (impl Subscriber + Send + Sync + 'static, LogLevel)
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let from_env = rust_log.and_then(|directives| EnvFilter::try_new(directives).ok());
    let is_from_env = from_env.is_some();
    let filter = from_env.unwrap_or_else(|| EnvFilter::new(STARTUP_LEVEL));

    let (filter, handle) = reload::Layer::new(filter);
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(make_writer));

    (
        subscriber,
        LogLevel {
            handle,
            from_env: is_from_env,
        },
    )
}
