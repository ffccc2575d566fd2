//! Process-wide tracing setup.

pub mod tracing;

pub use crate::tracing::{LogFormat, LogSettings, UnknownLogFormat};

/// Initialize tracing with JSON output and `RUST_LOG` filtering.
///
/// Safe to call multiple times; later calls are no-ops.
pub fn init() {
    tracing::init_with(&LogSettings::default());
}
