//! A minimal, zero-dependency logging crate for the Talos runtime.
//!
//! Provides thread-safe leveled logging with automatic module-path capture
//! and colored terminal output. The level can be set programmatically or
//! from the `TALOS_LOG` environment variable.
//!
//! # Example
//!
//! ```
//! use talos_log::{error, warn, info, debug, Level};
//!
//! talos_log::set_level(Level::Debug);
//!
//! let status = "running";
//! info!("runtime is {}", status);
//! debug!("slot table: {:?}", vec![1, 2, 3]);
//! warn!("template larger than expected");
//! error!("context already freed");
//! ```

use std::fmt::Arguments;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};

/// Log levels, ordered from most severe (`Error`) to least severe (`Trace`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    /// Critical failures and errors.
    Error = 0,
    /// Potentially harmful situations.
    Warn = 1,
    /// Informational messages.
    Info = 2,
    /// Detailed diagnostic information.
    Debug = 3,
    /// Most detailed tracing information.
    Trace = 4,
}

impl Level {
    /// Returns the ANSI color code for this log level.
    const fn color_code(&self) -> &'static str {
        match self {
            Level::Error => "\x1b[31m", // Red
            Level::Warn => "\x1b[33m",  // Yellow
            Level::Info => "\x1b[32m",  // Green
            Level::Debug => "\x1b[36m", // Cyan
            Level::Trace => "\x1b[35m", // Magenta
        }
    }

    /// Returns the string representation of this log level.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    /// Parses a string into a `Level` (case-insensitive).
    ///
    /// # Example
    ///
    /// ```
    /// use talos_log::Level;
    ///
    /// assert_eq!(Level::from_str("error"), Ok(Level::Error));
    /// assert_eq!(Level::from_str("INFO"), Ok(Level::Info));
    /// assert!(Level::from_str("loud").is_err());
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_uppercase().as_str() {
            "ERROR" => Ok(Level::Error),
            "WARN" => Ok(Level::Warn),
            "INFO" => Ok(Level::Info),
            "DEBUG" => Ok(Level::Debug),
            "TRACE" => Ok(Level::Trace),
            _ => Err(format!("Invalid log level: {s}")),
        }
    }
}

/// The global logger instance.
///
/// Uses atomic operations for thread-safe level management and is used as a
/// singleton via [`get_logger`].
pub struct Logger {
    level: AtomicU8,
}

impl Logger {
    const fn new(level: Level) -> Self {
        Logger {
            level: AtomicU8::new(level as u8),
        }
    }

    /// Sets the minimum log level. Messages below it are discarded.
    pub fn set_level(&self, level: Level) {
        self.level.store(level as u8, Ordering::SeqCst);
    }

    /// Returns the current minimum log level.
    pub fn level(&self) -> Level {
        match self.level.load(Ordering::Relaxed) {
            0 => Level::Error,
            1 => Level::Warn,
            2 => Level::Info,
            3 => Level::Debug,
            4 => Level::Trace,
            _ => Level::Info, // Default fallback
        }
    }

    /// Checks if a message at the given level would be logged.
    pub fn enabled(&self, level: Level) -> bool {
        level as u8 <= self.level.load(Ordering::Relaxed)
    }
}

/// Global logger singleton.
static LOGGER: OnceLock<Logger> = OnceLock::new();

/// Returns a reference to the global logger, initializing it at
/// `Level::Info` on first call.
pub fn get_logger() -> &'static Logger {
    LOGGER.get_or_init(|| Logger::new(Level::Info))
}

/// Sets the minimum log level for the global logger.
pub fn set_level(level: Level) {
    get_logger().set_level(level);
}

/// Sets the minimum log level from a string.
///
/// # Errors
///
/// Returns `Err` if the string does not name a level.
pub fn set_level_from_str(s: &str) -> Result<(), String> {
    let level = Level::from_str(s)?;
    set_level(level);
    Ok(())
}

/// Initializes the log level from the `TALOS_LOG` environment variable.
///
/// Unset or unparsable values leave the level at its default.
///
/// # Example
///
/// ```
/// talos_log::init_from_env();
/// ```
pub fn init_from_env() {
    if let Ok(value) = std::env::var("TALOS_LOG") {
        let _ = set_level_from_str(&value);
    }
}

/// Internal function that performs the actual logging.
///
/// Called by the log macros after checking if the level is enabled.
#[doc(hidden)]
pub fn __log_with_target(level: Level, target: &str, args: Arguments) {
    static RESET: &str = "\x1b[0m";

    if !get_logger().enabled(level) {
        return;
    }

    let color = level.color_code();
    let level_str = level.as_str();

    println!("{color}[{level_str}]{RESET} {target}: {args}");
}

/// The primary logging macro. Captures the calling module path as the target.
#[macro_export]
macro_rules! log {
    (level: $level:expr, $($arg:tt)*) => {
        {
            if $crate::get_logger().enabled($level) {
                $crate::__log_with_target(
                    $level,
                    module_path!(),
                    format_args!($($arg)*)
                );
            }
        }
    };
}

/// Logs a message at the Error level.
#[macro_export]
macro_rules! error {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Error, $($arg)*)
    };
}

/// Logs a message at the Warn level.
#[macro_export]
macro_rules! warn {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Warn, $($arg)*)
    };
}

/// Logs a message at the Info level.
#[macro_export]
macro_rules! info {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Info, $($arg)*)
    };
}

/// Logs a message at the Debug level.
#[macro_export]
macro_rules! debug {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Debug, $($arg)*)
    };
}

/// Logs a message at the Trace level.
#[macro_export]
macro_rules! trace {
    ($($arg:tt)*) => {
        $crate::log!(level: $crate::Level::Trace, $($arg)*)
    };
}
