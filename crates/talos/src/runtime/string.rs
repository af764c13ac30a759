//! Arena-interned immutable strings.
//!
//! `RuntimeString` stores its bytes in the global metadata arena, so the
//! data is stable for the process lifetime and the handle itself is just a
//! pointer and a length. Descriptors use it for class names and doc
//! strings; selectors use it for slot names.

use crate::runtime::get_global_arena;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ptr::NonNull;

/// Immutable string whose bytes live in the global metadata arena.
///
/// Equality and hashing are by content. Copies are cheap (pointer +
/// length); the underlying bytes are shared and never reclaimed.
pub struct RuntimeString {
    /// Start of the UTF-8 bytes in the arena. Dangling when `len == 0`.
    ptr: NonNull<u8>,
    len: usize,
}

impl RuntimeString {
    /// Copies `s` into the global metadata arena.
    #[must_use]
    pub fn new(s: &str) -> Self {
        if s.is_empty() {
            return RuntimeString {
                ptr: NonNull::dangling(),
                len: 0,
            };
        }

        let ptr = get_global_arena().alloc_raw(s.len(), 1);

        // SAFETY: ptr addresses s.len() fresh arena bytes; the source is a
        // borrowed slice that cannot overlap them.
        unsafe {
            std::ptr::copy_nonoverlapping(s.as_ptr(), ptr.as_ptr(), s.len());
        }

        RuntimeString { ptr, len: s.len() }
    }

    /// Returns the string contents.
    ///
    /// The data lives in the arena for the process lifetime, so the
    /// returned slice is `'static`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        if self.len == 0 {
            return "";
        }

        // SAFETY: the bytes were copied from a valid &str at construction
        // and the arena never reclaims or moves them.
        unsafe {
            std::str::from_utf8_unchecked(std::slice::from_raw_parts(
                self.ptr.as_ptr(),
                self.len,
            ))
        }
    }

    /// Length of the string in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the string is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

// SAFETY: the referenced bytes are immutable and live in the arena for the
// process lifetime.
unsafe impl Send for RuntimeString {}
unsafe impl Sync for RuntimeString {}

impl Clone for RuntimeString {
    fn clone(&self) -> Self {
        RuntimeString {
            ptr: self.ptr,
            len: self.len,
        }
    }
}

impl PartialEq for RuntimeString {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for RuntimeString {}

impl Hash for RuntimeString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl fmt::Display for RuntimeString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for RuntimeString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}
