// ============================================================
// Infra - Tracing setup
// ============================================================
// RUST_LOG wins when set; otherwise this crate logs at info.
// Safe to call more than once (tests, embedding binaries).

use tracing_subscriber::EnvFilter;

pub const DEFAULT_DIRECTIVE: &str = "encoder_tuner=info";

pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init();
}
