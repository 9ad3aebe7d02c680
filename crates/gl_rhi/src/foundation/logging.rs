//! Logging utilities and structured logging support
//!
//! The RHI only talks to the `log` facade. Binaries pick the backend; the
//! helpers here wire up `env_logger` the way the demo and tests expect.

pub use log::{debug, info, warn, error, trace};

/// Initialize the logging system
///
/// Honors `RUST_LOG`. Calling it twice is harmless; the second call is ignored.
pub fn init() {
    if let Err(err) = env_logger::try_init() {
        debug!("Logger already installed, keeping it: {}", err);
    }
}

/// Initialize logging with a default filter when `RUST_LOG` is unset
///
/// Returns `false` when another logger was already installed; the existing
/// logger stays in place and is told about it at debug level.
pub fn init_with_default_filter(filter: &str) -> bool {
    let env = env_logger::Env::default().default_filter_or(filter);
    match env_logger::Builder::from_env(env).try_init() {
        Ok(()) => true,
        Err(err) => {
            debug!("Logger already installed, keeping it: {}", err);
            false
        }
    }
}

/// Initialize logging for unit tests
///
/// Output is captured by the test harness and only shown for failing tests.
pub fn init_for_tests() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_reports_existing_logger() {
        init_for_tests();
        assert!(!init_with_default_filter("debug"));
    }
}
