//! The `log` module defines an interface to the crate's internal logging
//! facilities. This is not to be confused with _measurement_, which records
//! data about the simulated process itself.
//!
//! This module (re)exports the five logging macros: `error!`, `warn!`,
//! `info!`, `debug!` and `trace!` where `error!` represents the
//! highest-priority messages and `trace!` the lowest. To emit a log message,
//! simply use one of these macros in your code:
//!
//! ```rust
//! use hocsim::info;
//!
//! pub fn do_a_thing() {
//!     info!("A thing is being done.");
//! }
//! ```
//!
//! Logging is _disabled_ by default. Log messages are enabled/disabled using
//! the functions:
//!
//!  - `enable_logging()`: turns on all log messages
//!  - `disable_logging()`: turns off all log messages
//!  - `set_log_level(level: LevelFilter)`: enables only log messages with
//!    priority at least `level`

use env_logger::Builder;
pub use log::{debug, error, info, trace, warn, LevelFilter};

use std::sync::Once;

// Logging disabled.
const DEFAULT_LOG_LEVEL: LevelFilter = LevelFilter::Off;

static INSTALL: Once = Once::new();

/// Installs the global logger on first use. The backing `env_logger` is
/// built wide open; the effective level is controlled through
/// `log::set_max_level` so it can be changed after installation.
fn install_logger() {
    INSTALL.call_once(|| {
        let logger = Builder::new().filter_level(LevelFilter::Trace).build();
        if log::set_boxed_logger(Box::new(logger)).is_err() {
            // Another logger was installed by the host application; level
            // changes still apply to it through the facade.
            debug!("global logger already installed, reusing it");
        }
        log::set_max_level(DEFAULT_LOG_LEVEL);
    });
}

/// Enables the logger with no level filter / full logging. Equivalent to
/// `set_log_level(LevelFilter::Trace)`.
pub fn enable_logging() {
    set_log_level(LevelFilter::Trace);
}

/// Disables logging completely. Equivalent to
/// `set_log_level(LevelFilter::Off)`.
pub fn disable_logging() {
    set_log_level(LevelFilter::Off);
}

/// Sets the global log level. A filter level of `LevelFilter::Off` disables
/// logging.
pub fn set_log_level(level: LevelFilter) {
    install_logger();
    log::set_max_level(level);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_round_trip() {
        set_log_level(LevelFilter::Warn);
        assert_eq!(log::max_level(), LevelFilter::Warn);
        disable_logging();
        assert_eq!(log::max_level(), LevelFilter::Off);
    }
}
