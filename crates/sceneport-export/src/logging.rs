//! Logging and tracing utilities
//!
//! The library only emits `tracing` events and spans. Binaries decide where
//! they go by installing a subscriber with [`init_with_config`].

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::Level;

/// Whether tracing has been initialized
static TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Filter used when `RUST_LOG` is not set
    pub default_level: String,
    /// Show the target (module path) in log output
    pub show_target: bool,
    /// Show source file in log output
    pub show_file: bool,
    /// Show line number in log output
    pub show_line_number: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: "warn,sceneport=info".to_string(),
            show_target: true,
            show_file: false,
            show_line_number: false,
        }
    }
}

impl TracingConfig {
    /// Filter for a `-v` count: warn, info, debug, then trace
    pub fn from_verbosity(verbosity: u8) -> Self {
        let level = match verbosity {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self {
            default_level: level.as_str().to_lowercase(),
            show_target: verbosity >= 2,
            ..Default::default()
        }
    }
}

/// Install the global subscriber once; later calls are ignored
pub fn init_with_config(config: TracingConfig) {
    if TRACING_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
        .is_ok()
    {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

        let fmt_layer = fmt::layer()
            .with_target(config.show_target)
            .with_file(config.show_file)
            .with_line_number(config.show_line_number);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .with(filter)
            .init();
    }
}

/// Run one pipeline stage inside an `export` span and log its duration
pub fn stage<T, F>(name: &str, f: F) -> T
where
    F: FnOnce() -> T,
{
    let span = tracing::info_span!("export", stage = %name);
    let _guard = span.enter();

    let start = std::time::Instant::now();
    let result = f();
    let duration = start.elapsed();

    tracing::debug!(duration_ms = %duration.as_millis(), "Stage complete");

    result
}
