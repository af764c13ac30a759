//! Talos: a single-inheritance object runtime with hierarchical ownership
//! allocation.
//!
//! Talos provides classes, virtual dispatch, and runtime "is-a" queries as
//! a passive library:
//!
//! - **Static descriptors** — one process-lifetime record per class, built
//!   once by a recursive, idempotent type initializer
//! - **Copy-down dispatch** — a subclass's table starts as a copy of its
//!   superclass's, so every dispatch is one table hit on the instance's own
//!   leaf class
//! - **Context ownership** — instances belong to hierarchical allocator
//!   contexts; freeing a context runs registered finalizers and reclaims
//!   every descendant allocation
//! - **Thread-local error channel** — fallible operations return a sentinel
//!   and report detail through a per-thread code + accumulating message
//!   pair; nothing unwinds
//!
//! # Architecture
//!
//! The workspace splits along allocation regimes:
//!
//! - `talos` (this crate): descriptors, dispatch, and the error channel
//! - `talos-mem`: the metadata arena and the ownership contexts
//! - `talos-log`: leveled logging used across the runtime
//!
//! # Example
//!
//! ```rust
//! use talos::{
//!     ClassDef, Context, MessageArgs, ObjectPtr, Selector, SelectorHandle,
//!     OBJECT, construct, send,
//! };
//!
//! #[repr(C)]
//! struct CounterFields {
//!     count: u64,
//! }
//!
//! unsafe extern "C" fn counter_con(
//!     this: ObjectPtr,
//!     _cmd: SelectorHandle,
//!     args: *const *mut u8,
//!     ret: *mut u8,
//! ) {
//!     let argv = unsafe { std::slice::from_raw_parts(args.cast::<usize>(), 1) };
//!     let fields = unsafe { &mut *this.payload::<CounterFields>() };
//!     fields.count = argv[0] as u64;
//!     unsafe { std::ptr::write_unaligned(ret.cast::<*mut u8>(), this.as_raw()) };
//! }
//!
//! unsafe extern "C" fn counter_get(
//!     this: ObjectPtr,
//!     _cmd: SelectorHandle,
//!     _args: *const *mut u8,
//!     ret: *mut u8,
//! ) {
//!     let fields = unsafe { &*this.payload::<CounterFields>() };
//!     unsafe { std::ptr::write_unaligned(ret.cast::<usize>(), fields.count as usize) };
//! }
//!
//! static COUNTER: ClassDef = ClassDef::new(
//!     "Counter",
//!     "A counting object.",
//!     std::mem::size_of::<CounterFields>(),
//!     Some(&OBJECT),
//!     |b| {
//!         b.slot("con", counter_con, 1);
//!         b.slot("get", counter_get, 0);
//!     },
//! );
//!
//! let counter = COUNTER.initialize();
//! let ctx = Context::new();
//!
//! let obj = construct(
//!     &counter,
//!     &counter,
//!     &Selector::intern("con"),
//!     &ctx,
//!     &MessageArgs::one(5),
//! )
//! .unwrap();
//!
//! assert!(obj.is_instance_of(&OBJECT.initialize()));
//! let count = unsafe { send(&obj, &Selector::intern("get"), &MessageArgs::None) };
//! assert_eq!(count, Some(5));
//!
//! ctx.free();
//! ```

pub mod error;
pub mod runtime;

// Re-export commonly used types
pub use error::ErrorCode;
pub use runtime::{
    Class, ClassDef, Imp, MessageArgs, Method, OBJECT, Object, ObjectPtr,
    RuntimeString, Selector, SelectorHandle, SlotBuilder,
};
pub use runtime::{
    FINALIZE_SLOT, allocate_instance, construct, release_instance, send,
    send_super,
};
pub use talos_mem::{Context, Destructor};
