//! Talos runtime module.
//!
//! Core runtime infrastructure:
//!
//! - [`class`]: class descriptors, one-time type initialization, the
//!   registry, and the unimplemented-slot trap
//! - [`object`]: instance layout and object handles
//! - [`selector`]: interned slot names
//! - [`dispatch`]: construction protocol and slot dispatch
//! - [`message`]: argument packs for dispatch
//! - [`string`]: arena-interned strings for descriptor metadata
//!
//! # Global Arena
//!
//! The runtime keeps one process-lifetime arena for metadata: descriptors,
//! selectors, strings, and instance templates. It is initialized on first
//! use and never torn down, so every pointer into it is stable.

pub mod class;
pub mod dispatch;
pub mod message;
pub mod object;
pub mod selector;
pub mod string;

pub use class::{Class, ClassDef, Imp, Method, OBJECT, SlotBuilder};
pub use dispatch::{
    FINALIZE_SLOT, allocate_instance, construct, release_instance, send,
    send_super,
};
pub use message::MessageArgs;
pub use object::{Object, ObjectPtr};
pub use selector::{Selector, SelectorHandle};
pub use string::RuntimeString;

use std::sync::OnceLock;
use talos_mem::Arena;

/// Global arena for long-lived runtime metadata.
static GLOBAL_ARENA: OnceLock<Arena> = OnceLock::new();

/// Returns the global metadata arena, initializing it on first call.
///
/// The reference is valid for the entire program; so is every allocation
/// made through it.
#[must_use]
pub fn get_global_arena() -> &'static Arena {
    GLOBAL_ARENA.get_or_init(|| Arena::new(4096))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_arena_is_a_singleton() {
        let a = std::ptr::from_ref(get_global_arena());
        let b = std::ptr::from_ref(get_global_arena());

        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn test_global_arena_allocation() {
        let arena = get_global_arena();

        let ptr: *mut u32 = arena.alloc(42);
        unsafe {
            assert_eq!(*ptr, 42);
        }
    }
}
