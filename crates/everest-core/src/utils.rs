//! # Utilities
//!
//! Logging initialization and the panic hook.
//!
//! Screen output goes to stdout at DEBUG (ERROR only when quiet); an optional
//! log file always receives DEBUG. `EVEREST_LOG` overrides the global filter
//! and `EVEREST_LOG_FORMAT=json` switches the screen to JSON lines.

use crate::config::{Config, ensure_dir};
use crate::EverestError;
use std::path::PathBuf;
use tracing_subscriber::filter::{LevelFilter, filter_fn};
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

/// Environment variable holding `EnvFilter` directives.
pub const LOG_ENV: &str = "EVEREST_LOG";

/// Environment variable selecting the screen format (`text` or `json`).
pub const LOG_FORMAT_ENV: &str = "EVEREST_LOG_FORMAT";

/// Filter directives used when `EVEREST_LOG` is unset.
pub const DEFAULT_DIRECTIVES: &str = "everest=debug,everest_core=debug,warn";

type Stack = Layered<EnvFilter, Registry>;
type BoxedLayer = Box<dyn Layer<Stack> + Send + Sync>;

/// Logging options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingOptions {
    /// Log file; created along with its directory.
    pub file: Option<PathBuf>,
    /// Only report errors on screen.
    pub quiet: bool,
    /// JSON lines on screen.
    pub json: bool,
    /// Event targets that are never logged (prefix match).
    pub muted_targets: Vec<String>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            file: None,
            quiet: false,
            json: false,
            muted_targets: vec!["png".to_string()],
        }
    }
}

impl From<&Config> for LoggingOptions {
    fn from(config: &Config) -> Self {
        let json = config.logging.json
            || std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));
        Self {
            file: config.log_file(),
            quiet: config.logging.quiet,
            json,
            ..Self::default()
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// Fails if a subscriber is already installed.
pub fn init_logging(options: &LoggingOptions) -> Result<(), EverestError> {
    let env_filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let screen_level = if options.quiet {
        LevelFilter::ERROR
    } else {
        LevelFilter::DEBUG
    };

    let mut layers: Vec<BoxedLayer> = Vec::new();

    let muted = options.muted_targets.clone();
    let screen_filter = filter_fn(move |meta| {
        *meta.level() <= screen_level && !is_muted(&muted, meta.target())
    });
    if options.json {
        layers.push(
            fmt::layer()
                .json()
                .with_writer(std::io::stdout)
                .with_target(true)
                .with_filter(screen_filter)
                .boxed(),
        );
    } else {
        layers.push(
            fmt::layer()
                .with_writer(std::io::stdout)
                .with_target(true)
                .with_filter(screen_filter)
                .boxed(),
        );
    }

    if let Some(path) = &options.file {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        ensure_dir(&dir)?;
        let file_name = path.file_name().ok_or_else(|| {
            EverestError::InvalidConfig(format!("log file '{}' has no file name", path.display()))
        })?;
        let appender = tracing_appender::rolling::never(&dir, file_name);

        let muted = options.muted_targets.clone();
        let file_filter = filter_fn(move |meta| {
            *meta.level() <= LevelFilter::DEBUG && !is_muted(&muted, meta.target())
        });
        layers.push(
            fmt::layer()
                .with_writer(appender)
                .with_ansi(false)
                .with_target(true)
                .with_filter(file_filter)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| EverestError::InvalidConfig(format!("logging: {}", e)))?;

    tracing::debug!("Logging initialized");
    Ok(())
}

/// Log panics through tracing before running the previous hook.
///
/// With `debug` set, a backtrace is captured and logged line by line.
pub fn install_panic_hook(debug: bool) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        match info.location() {
            Some(location) => tracing::error!(
                "panic at {}:{}: {}",
                location.file(),
                location.line(),
                payload
            ),
            None => tracing::error!("panic: {}", payload),
        }
        if debug {
            let backtrace = std::backtrace::Backtrace::force_capture();
            for line in backtrace.to_string().lines() {
                tracing::error!("{}", line);
            }
        }
        previous(info);
    }));
}

fn is_muted(muted: &[String], target: &str) -> bool {
    muted.iter().any(|m| target.starts_with(m.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn muted_targets_match_prefix() {
        let muted = vec!["png".to_string()];
        assert!(is_muted(&muted, "png::decoder"));
        assert!(!is_muted(&muted, "everest_core::pld"));
    }

    #[test]
    fn options_from_config() {
        let mut config = Config::default();
        config.logging.quiet = true;
        config.logging.file = Some(PathBuf::from("/tmp/everest.log"));
        let options = LoggingOptions::from(&config);
        assert!(options.quiet);
        assert_eq!(options.file, Some(PathBuf::from("/tmp/everest.log")));
        assert_eq!(options.muted_targets, vec!["png".to_string()]);
    }
}
