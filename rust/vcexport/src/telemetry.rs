//! Tracing setup for the export binary.

use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

static INIT: OnceCell<()> = OnceCell::new();

/// Install the global subscriber once. `RUST_LOG` overrides the default
/// directive, which keeps the exporter itself at info and its HTTP stack
/// at warn so progress messages are not drowned out.
pub fn init_tracing() {
    let _ = INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,vcexport=info"));
        fmt().with_env_filter(filter).with_target(false).init();
    });
}
