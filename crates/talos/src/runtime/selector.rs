//! Selector interning for slot names.
//!
//! Each unique slot name has exactly one interned record in the global
//! metadata arena, so selectors compare by pointer identity and method
//! tables can key on the interned address instead of the name. Hashes are
//! precomputed once with `fxhash`.
//!
//! # Thread Safety
//!
//! The interning table is behind an `RwLock`; hits take the read lock only.
//! Interned records are arena-resident and never reclaimed, so `Selector`
//! values are valid for the entire program.

use crate::runtime::get_global_arena;
use crate::runtime::string::RuntimeString;
use fxhash::FxHashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ptr::NonNull;
use std::sync::{OnceLock, RwLock};

/// Opaque selector handle for `extern "C"` slot signatures.
///
/// Slot implementations receive the dispatched selector through this handle
/// (the `_cmd` argument). Convert back with [`Selector::from_handle`].
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct SelectorHandle(*const InternedSelector);

/// Interned selector record, arena-resident for the process lifetime.
#[repr(C)]
struct InternedSelector {
    /// Slot name (e.g. "con", "read", "finalize").
    name: RuntimeString,
    /// Precomputed fxhash of the name.
    hash: u64,
}

/// Global interning table: name hash to the records sharing it.
///
/// Collisions land in the same bucket and are disambiguated by name, so two
/// distinct names can never alias one selector.
struct SelectorRegistry {
    table: RwLock<FxHashMap<u64, Vec<NonNull<InternedSelector>>>>,
}

// SAFETY: the pointers target arena memory that is never reclaimed, and the
// table itself is lock-protected.
unsafe impl Send for SelectorRegistry {}
unsafe impl Sync for SelectorRegistry {}

static REGISTRY: OnceLock<SelectorRegistry> = OnceLock::new();

/// A unique, interned slot name.
///
/// # Example
///
/// ```rust
/// use talos::Selector;
///
/// let a = Selector::intern("read");
/// let b = Selector::intern("read");
///
/// // Same name, same interned record.
/// assert_eq!(a, b);
/// assert_eq!(a.key(), b.key());
/// ```
pub struct Selector {
    /// Interned record in the global arena; valid for the process lifetime.
    ptr: NonNull<InternedSelector>,
}

impl Selector {
    /// Returns the selector for `name`, interning it on first use.
    ///
    /// Repeated calls with the same name return pointer-identical
    /// selectors, from any thread.
    ///
    /// # Panics
    ///
    /// Panics if the interning lock is poisoned or the metadata arena is
    /// exhausted.
    #[must_use]
    pub fn intern(name: &str) -> Selector {
        let registry = REGISTRY.get_or_init(|| SelectorRegistry {
            table: RwLock::new(FxHashMap::default()),
        });

        let hash = fxhash::hash64(name);

        // Fast path: read lock only.
        {
            let table = registry.table.read().unwrap();
            if let Some(found) = Self::find(table.get(&hash), name) {
                return found;
            }
        }

        let mut table = registry.table.write().unwrap();

        // Another thread may have interned it while we waited.
        if let Some(found) = Self::find(table.get(&hash), name) {
            return found;
        }

        let arena = get_global_arena();
        let interned = InternedSelector {
            name: RuntimeString::new(name),
            hash,
        };
        let ptr: *mut InternedSelector = arena.alloc(interned);

        // SAFETY: arena allocations are never null.
        let ptr = unsafe { NonNull::new_unchecked(ptr) };
        table.entry(hash).or_default().push(ptr);

        Selector { ptr }
    }

    /// Searches a hash bucket for an exact name match.
    fn find(
        bucket: Option<&Vec<NonNull<InternedSelector>>>,
        name: &str,
    ) -> Option<Selector> {
        for &ptr in bucket? {
            // SAFETY: bucket entries point at arena-resident records.
            let interned = unsafe { ptr.as_ref() };
            if interned.name.as_str() == name {
                return Some(Selector { ptr });
            }
        }
        None
    }

    /// Returns the slot name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        // SAFETY: the record is arena-resident for the process lifetime.
        let interned: &'static InternedSelector = unsafe { self.ptr.as_ref() };
        interned.name.as_str()
    }

    /// Returns the precomputed hash of the name.
    #[must_use]
    pub fn hash(&self) -> u64 {
        // SAFETY: the record is arena-resident for the process lifetime.
        unsafe { self.ptr.as_ref() }.hash
    }

    /// Identity key of the interned record.
    ///
    /// Method tables key on this value: interning guarantees one record per
    /// name, so the address is a collision-free key.
    #[must_use]
    pub fn key(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    /// Converts to the opaque handle used in `extern "C"` slot signatures.
    #[inline]
    #[must_use]
    pub fn as_handle(&self) -> SelectorHandle {
        SelectorHandle(self.ptr.as_ptr())
    }

    /// Recovers a selector from a handle received in a slot implementation.
    ///
    /// # Safety
    ///
    /// `handle` must have been produced by [`Selector::as_handle`]; the
    /// runtime only ever passes such handles to slot implementations.
    #[inline]
    #[must_use]
    pub unsafe fn from_handle(handle: SelectorHandle) -> Self {
        Selector {
            // SAFETY: guaranteed non-null by the caller contract.
            ptr: unsafe {
                NonNull::new_unchecked(handle.0.cast_mut())
            },
        }
    }
}

// SAFETY: interned records are immutable after creation and arena-resident
// for the process lifetime.
unsafe impl Send for Selector {}
unsafe impl Sync for Selector {}

impl Clone for Selector {
    fn clone(&self) -> Self {
        Selector { ptr: self.ptr }
    }
}

impl PartialEq for Selector {
    fn eq(&self, other: &Self) -> bool {
        // Pointer equality: same name, same record (interning guarantee).
        std::ptr::eq(self.ptr.as_ptr(), other.ptr.as_ptr())
    }
}

impl Eq for Selector {}

impl Hash for Selector {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash());
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selector")
            .field("name", &self.name())
            .field("hash", &format!("{:#x}", self.hash()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_interning_identity() {
        let a = Selector::intern("con");
        let b = Selector::intern("con");

        assert_eq!(a, b);
        assert_eq!(a.key(), b.key());
        assert!(std::ptr::eq(a.ptr.as_ptr(), b.ptr.as_ptr()));
    }

    #[test]
    fn test_distinct_names() {
        let a = Selector::intern("read");
        let b = Selector::intern("write");

        assert_ne!(a, b);
        assert_ne!(a.key(), b.key());
        assert_eq!(a.name(), "read");
        assert_eq!(b.name(), "write");
    }

    #[test]
    fn test_hash_stability() {
        let a = Selector::intern("seek");
        let b = Selector::intern("seek");

        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.hash(), fxhash::hash64("seek"));
    }

    #[test]
    fn test_handle_roundtrip() {
        let sel = Selector::intern("tell");
        let handle = sel.as_handle();

        let back = unsafe { Selector::from_handle(handle) };
        assert_eq!(sel, back);
        assert_eq!(back.name(), "tell");
    }

    #[test]
    fn test_concurrent_interning() {
        let handles: Vec<_> = (0..10)
            .map(|_| thread::spawn(|| Selector::intern("sharedSlot")))
            .collect();

        let selectors: Vec<_> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        for sel in &selectors[1..] {
            assert_eq!(selectors[0].key(), sel.key());
        }
    }

    #[test]
    fn test_debug_format() {
        let sel = Selector::intern("close");
        let text = format!("{sel:?}");

        assert!(text.contains("close"));
        assert!(text.contains("Selector"));
    }
}
