//! Thread-local error reporting for the Talos runtime.
//!
//! The runtime has no unwinding failure path: every fallible operation
//! returns a sentinel (`None`) and reports detail through this per-thread
//! channel. The channel holds a single error code and an accumulating
//! message buffer:
//!
//! - The **first** raised code wins; later raises keep accumulating
//!   messages (newline-joined) without overwriting the code, until an
//!   explicit [`clear`].
//! - The message buffer is bounded ([`ERROR_BUFFER_SIZE`]); overflow
//!   truncates instead of growing.
//!
//! Callers performing retries or best-effort recovery must [`clear`]
//! proactively, or stale context leaks into the next report.
//!
//! # Example
//!
//! ```rust
//! use talos::error::{self, ErrorCode};
//!
//! error::clear();
//!
//! let missing: Option<u32> = error::raise(ErrorCode::KeyError, "no such slot");
//! assert!(missing.is_none());
//! assert_eq!(error::current(), ErrorCode::KeyError);
//! assert_eq!(error::current_message(), "no such slot");
//!
//! error::clear();
//! assert_eq!(error::current(), ErrorCode::None);
//! ```
//!
//! # Thread Safety
//!
//! Storage is `std::thread_local!`: lazily created per thread, torn down
//! with the thread, and invisible to every other thread. No process-wide
//! initialization is needed.

use std::cell::RefCell;
use std::fmt;

/// Capacity of the per-thread message buffer in bytes.
pub const ERROR_BUFFER_SIZE: usize = 10 * 1024;

/// Error codes reported through the channel.
///
/// The numeric values are a stable contract with embedders and never
/// change.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// No error is set.
    None = 0,
    /// Unclassified failure.
    Generic = 1,
    /// Arithmetic or buffer overflow.
    Overflow = 2,
    /// Transient, non-fatal notice; typically logged and cleared at once.
    Warning = 3,
    /// Arithmetic or buffer underflow.
    Underflow = 4,
    /// Failure in a collaborating external system.
    IoError = 5,
    /// Resource exhaustion.
    NoMemory = 6,
    /// Malformed input from the caller.
    InvalidParameter = 7,
    /// Internal contract violation.
    RuntimeError = 8,
    /// Lookup on a missing key or slot.
    KeyError = 9,
    /// Reserved for impossible conditions; never expected in correct code.
    ProgrammingError = 10,
}

impl ErrorCode {
    /// Returns the stable numeric value of this code.
    #[must_use]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Maps a numeric value back to its code.
    #[must_use]
    pub const fn from_code(code: i32) -> Option<ErrorCode> {
        match code {
            0 => Some(ErrorCode::None),
            1 => Some(ErrorCode::Generic),
            2 => Some(ErrorCode::Overflow),
            3 => Some(ErrorCode::Warning),
            4 => Some(ErrorCode::Underflow),
            5 => Some(ErrorCode::IoError),
            6 => Some(ErrorCode::NoMemory),
            7 => Some(ErrorCode::InvalidParameter),
            8 => Some(ErrorCode::RuntimeError),
            9 => Some(ErrorCode::KeyError),
            10 => Some(ErrorCode::ProgrammingError),
            _ => None,
        }
    }

    /// Human-readable name of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::None => "no error",
            ErrorCode::Generic => "generic error",
            ErrorCode::Overflow => "overflow",
            ErrorCode::Warning => "warning",
            ErrorCode::Underflow => "underflow",
            ErrorCode::IoError => "i/o error",
            ErrorCode::NoMemory => "out of memory",
            ErrorCode::InvalidParameter => "invalid parameter",
            ErrorCode::RuntimeError => "runtime error",
            ErrorCode::KeyError => "key error",
            ErrorCode::ProgrammingError => "programming error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-thread error state.
struct ThreadError {
    code: ErrorCode,
    message: String,
}

thread_local! {
    static CURRENT: RefCell<ThreadError> = const {
        RefCell::new(ThreadError {
            code: ErrorCode::None,
            message: String::new(),
        })
    };
}

/// Appends `text` to `buffer`, truncating at the capacity limit.
fn append_bounded(buffer: &mut String, text: &str) {
    let remaining = ERROR_BUFFER_SIZE.saturating_sub(buffer.len());
    if remaining == 0 {
        return;
    }
    if text.len() <= remaining {
        buffer.push_str(text);
        return;
    }

    let mut cut = remaining;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    buffer.push_str(&text[..cut]);
}

/// Raises an error on the calling thread and returns the `None` sentinel.
///
/// If no error is set, the message buffer is reset and `code` becomes the
/// thread's error code. If one is already set, `message` is appended after
/// a newline and the existing code stays (first code wins, message history
/// accumulates).
///
/// The return type lets call sites propagate the sentinel directly:
///
/// ```rust
/// use talos::error::{self, ErrorCode};
///
/// fn read_block(offset: u64) -> Option<Vec<u8>> {
///     if offset > 1024 {
///         return error::raise(ErrorCode::IoError, "offset beyond device");
///     }
///     Some(vec![0; 512])
/// }
///
/// # error::clear();
/// assert!(read_block(4096).is_none());
/// assert_eq!(error::current(), ErrorCode::IoError);
/// # error::clear();
/// ```
pub fn raise<T>(code: ErrorCode, message: &str) -> Option<T> {
    talos_log::trace!("raise {code}: {message}");

    CURRENT.with(|state| {
        let mut state = state.borrow_mut();
        if state.code == ErrorCode::None {
            state.message.clear();
            state.code = code;
        } else {
            append_bounded(&mut state.message, "\n");
        }
        append_bounded(&mut state.message, message);
    });

    None
}

/// Returns the calling thread's current error code.
#[must_use]
pub fn current() -> ErrorCode {
    CURRENT.with(|state| state.borrow().code)
}

/// Returns a snapshot of the calling thread's accumulated message.
///
/// Meaningful only while an error is set; after [`clear`] the content is
/// stale until the next raise.
#[must_use]
pub fn current_message() -> String {
    CURRENT.with(|state| state.borrow().message.clone())
}

/// Returns the calling thread's code and message together.
#[must_use]
pub fn current_error() -> (ErrorCode, String) {
    CURRENT.with(|state| {
        let state = state.borrow();
        (state.code, state.message.clone())
    })
}

/// Returns `true` if the calling thread's current code equals `code`.
#[must_use]
pub fn is_set(code: ErrorCode) -> bool {
    current() == code
}

/// Clears the calling thread's error code.
///
/// The message buffer is left in place; it is logically stale until the
/// next raise resets it.
pub fn clear() {
    CURRENT.with(|state| state.borrow_mut().code = ErrorCode::None);
}

/// If an error is set, writes the accumulated message and a newline to
/// stdout, then clears the code.
pub fn print_and_clear() {
    let (code, message) = current_error();
    if code != ErrorCode::None {
        println!("{message}");
    }
    clear();
}

/// Runs `f` and restores the error code that was current before it ran.
///
/// For cleanup paths that must not disturb an in-flight error: the inner
/// work may raise and clear freely, the surrounding report survives.
///
/// ```rust
/// use talos::error::{self, ErrorCode};
///
/// error::clear();
/// let _: Option<()> = error::raise(ErrorCode::IoError, "device vanished");
///
/// error::with_preserved_code(|| {
///     let _: Option<()> = error::raise(ErrorCode::KeyError, "cache miss");
/// });
///
/// assert_eq!(error::current(), ErrorCode::IoError);
/// # error::clear();
/// ```
pub fn with_preserved_code<R>(f: impl FnOnce() -> R) -> R {
    let saved = current();
    let result = f();
    CURRENT.with(|state| state.borrow_mut().code = saved);
    result
}

/// Raises an error with a formatted message prefixed by the call site
/// (`module: (file:line)`), returning the `None` sentinel.
///
/// ```rust
/// use talos::error::{self, ErrorCode};
///
/// # error::clear();
/// fn lookup(name: &str) -> Option<u32> {
///     talos::raise!(ErrorCode::KeyError, "unknown attribute `{}`", name)
/// }
///
/// assert!(lookup("mtime").is_none());
/// assert_eq!(error::current(), ErrorCode::KeyError);
/// assert!(error::current_message().contains("unknown attribute `mtime`"));
/// # error::clear();
/// ```
#[macro_export]
macro_rules! raise {
    ($code:expr, $($arg:tt)*) => {
        $crate::error::raise(
            $code,
            &format!(
                "{}: ({}:{}) {}",
                module_path!(),
                file!(),
                line!(),
                format_args!($($arg)*)
            ),
        )
    };
}

/// Raises a [`ErrorCode::Warning`] with the formatted message and
/// immediately prints-and-clears it.
///
/// Warnings are transient notices; nothing should be left for the caller
/// to inspect.
#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)*) => {{
        let _: Option<()> =
            $crate::raise!($crate::error::ErrorCode::Warning, $($arg)*);
        $crate::error::print_and_clear();
    }};
}
