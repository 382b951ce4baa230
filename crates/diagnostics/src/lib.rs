//! Logging setup shared by the dcosfs crates.
//!
//! Usage:
//! - Set DCOSFS_LOG=off (default) - no logs
//! - Set DCOSFS_LOG=info - framework/app discovery, mounts
//! - Set DCOSFS_LOG=debug - every listing refresh and remote read

use std::sync::Once;

// Re-export emit so macros can use it
pub use emit;

/// Environment variable consulted by [`init_diagnostics`].
pub const LOG_ENV: &str = "DCOSFS_LOG";

static INIT: Once = Once::new();

/// Parses a `DCOSFS_LOG` value. `Ok(None)` means logging is off.
pub fn parse_level(value: &str) -> Result<Option<emit::Level>, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "off" => Ok(None),
        "debug" => Ok(Some(emit::Level::Debug)),
        "info" => Ok(Some(emit::Level::Info)),
        "warn" => Ok(Some(emit::Level::Warn)),
        "error" => Ok(Some(emit::Level::Error)),
        other => Err(other.to_string()),
    }
}

/// Initialize diagnostics from the DCOSFS_LOG environment variable.
///
/// Safe to call more than once; only the first call has an effect.
pub fn init_diagnostics() {
    let value = std::env::var(LOG_ENV).unwrap_or_else(|_| "off".to_string());
    let level = match parse_level(&value) {
        Ok(level) => level,
        Err(unknown) => {
            // Bootstrap warning, the emitter isn't running yet
            eprintln!("Warning: Unknown {LOG_ENV} value '{unknown}', using 'info'");
            Some(emit::Level::Info)
        }
    };
    if let Some(level) = level {
        init_with_level(level);
    }
}

/// Initialize diagnostics at a fixed minimum level, ignoring the environment.
pub fn init_with_level(level: emit::Level) {
    INIT.call_once(|| {
        let rt = emit::setup()
            .emit_to(emit_term::stderr())
            .emit_when(emit::level::min_filter(level))
            .init();

        // The emitter lives for the whole process; flushing happens at exit.
        std::mem::forget(rt);
    });
}

/// Log basic operations (mounts, discovered frameworks and apps).
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::emit::info!($($arg)*)
    };
}

/// Log detailed diagnostics (listing refreshes, remote reads, cache hits).
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::emit::debug!($($arg)*)
    };
}

/// Log recoverable failures, e.g. a background refresh that will be retried.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::emit::warn!($($arg)*)
    };
}

/// Log failures surfaced to a caller.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::emit::error!($($arg)*)
    };
}

pub use init_diagnostics as init;
