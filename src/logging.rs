//! Logging setup.
//!
//! Everything goes to stderr: stdout belongs to command output (and to the
//! editor protocol when embedded). Levels come from the `[logging]` group,
//! `RUST_LOG` wins when set.
//!
//! ```toml
//! [logging]
//! default = "warn"
//!
//! [logging.modules]
//! "luasense::checker" = "debug"
//! ```
//!
//! ```bash
//! RUST_LOG=luasense=debug luasense check src/main.lua
//! ```

use std::sync::Once;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// HH:MM:SS.mmm
struct ClockTime;

impl FormatTime for ClockTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Filter directives for a config: the default level, then per-target
/// overrides in name order.
pub fn filter_directives(config: &LoggingConfig) -> String {
    let mut targets: Vec<(&String, &String)> = config.modules.iter().collect();
    targets.sort();
    targets
        .into_iter()
        .fold(config.default.clone(), |mut directives, (target, level)| {
            directives.push(',');
            directives.push_str(target);
            directives.push('=');
            directives.push_str(level);
            directives
        })
}

/// Install the global subscriber. Only the first call has any effect.
pub fn init_with_config(config: &LoggingConfig) {
    INIT.call_once(|| {
        let filter = match std::env::var("RUST_LOG") {
            Ok(_) => EnvFilter::from_default_env(),
            Err(_) => EnvFilter::new(filter_directives(config)),
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_timer(ClockTime)
            .with_level(true)
            .with_filter(filter);

        tracing_subscriber::registry().with(fmt_layer).init();
    });
}

/// Quiet defaults (`warn`).
pub fn init() {
    init_with_config(&LoggingConfig::default());
}

/// Info-level event tagged with the component that emitted it.
///
/// ```ignore
/// log_event!("modules", "rescan", "{count} files");
/// ```
#[macro_export]
macro_rules! log_event {
    ($component:expr, $event:expr) => {
        tracing::info!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::info!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}

/// Debug-level variant of [`log_event!`].
#[macro_export]
macro_rules! debug_event {
    ($component:expr, $event:expr) => {
        tracing::debug!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::debug!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}
