//! Logging setup for the binary.
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the process. `RUST_LOG` takes precedence over the configured level:
//!
//! ```bash
//! RUST_LOG=homecast=debug homecast
//! ```

use std::sync::Once;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingSettings;

static INIT: Once = Once::new();

/// Install the fmt subscriber. Only the first call takes effect.
pub fn init(settings: &LoggingSettings) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::try_new(&settings.level).unwrap_or_else(|_| EnvFilter::new("info"))
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_names(true)
            .with_writer(std::io::stderr)
            .with_filter(filter);

        // Another subscriber may already be installed (e.g. by an embedding
        // application); keep it.
        let _ = tracing_subscriber::registry().with(fmt_layer).try_init();
    });
}
