//! Memory infrastructure for the Talos runtime.
//!
//! This crate provides the two allocation regimes the runtime is built on:
//!
//! - [`arena`]: a thread-safe bump arena for process-lifetime metadata
//!   (class descriptors, interned selectors, instance templates). Pointers
//!   are stable and never reclaimed.
//! - [`context`]: hierarchical ownership contexts. Every instance allocation
//!   belongs to a context; freeing a context cascades to descendant contexts
//!   and runs registered destructor callbacks before reclaiming memory.

pub mod arena;
pub mod context;

pub use arena::Arena;
pub use context::{Context, Destructor};
