//! Construction and dispatch.
//!
//! The construction protocol stamps an instance out of the class template
//! under an allocator context, runs a constructor slot, and registers the
//! finalizer destructor. Dispatch is an indirect call through the
//! instance's own leaf-class table entry; copy-down initialization makes
//! inherited slots leaf-resident, so no chain walk happens per call.
//!
//! Every fallible operation here returns `None` and reports detail through
//! the thread-local error channel; see [`crate::error`].
//!
//! # Dispatch Algorithm
//!
//! 1. Read the leaf class from the instance header
//! 2. One slot-table hit by interned selector identity
//! 3. Validate the argument count against the slot's arity
//! 4. Invoke the implementation through the C-shaped [`Imp`] pointer
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
//! struct PairFields {
//!     x: u64,
//!     y: u64,
//! }
//!
//! unsafe extern "C" fn pair_con(
//!     this: ObjectPtr,
//!     _cmd: SelectorHandle,
//!     args: *const *mut u8,
//!     ret: *mut u8,
//! ) {
//!     let argv = unsafe { std::slice::from_raw_parts(args.cast::<usize>(), 2) };
//!     let fields = unsafe { &mut *this.payload::<PairFields>() };
//!     fields.x = argv[0] as u64;
//!     fields.y = argv[1] as u64;
//!     unsafe { std::ptr::write_unaligned(ret.cast::<*mut u8>(), this.as_raw()) };
//! }
//!
//! unsafe extern "C" fn pair_sum(
//!     this: ObjectPtr,
//!     _cmd: SelectorHandle,
//!     _args: *const *mut u8,
//!     ret: *mut u8,
//! ) {
//!     let fields = unsafe { &*this.payload::<PairFields>() };
//!     unsafe {
//!         std::ptr::write_unaligned(ret.cast::<usize>(), (fields.x + fields.y) as usize)
//!     };
//! }
//!
//! static PAIR: ClassDef = ClassDef::new(
//!     "Pair",
//!     "A pair of integers.",
//!     std::mem::size_of::<PairFields>(),
//!     Some(&OBJECT),
//!     |b| {
//!         b.slot("con", pair_con, 2);
//!         b.slot("sum", pair_sum, 0);
//!     },
//! );
//!
//! let pair = PAIR.initialize();
//! let ctx = Context::new();
//!
//! let con = Selector::intern("con");
//! let obj = construct(&pair, &pair, &con, &ctx, &MessageArgs::two(3, 4)).unwrap();
//!
//! let sum = unsafe { send(&obj, &Selector::intern("sum"), &MessageArgs::None) };
//! assert_eq!(sum, Some(7));
//!
//! ctx.free();
//! ```

use crate::error::ErrorCode;
use crate::runtime::class::{Class, Imp};
use crate::runtime::message::MessageArgs;
use crate::runtime::object::{Object, ObjectPtr};
use crate::runtime::selector::Selector;
use std::ptr::NonNull;
use talos_mem::Context;

/// Name of the destructor slot.
///
/// When a class implements it, [`construct`] registers a context destructor
/// that dispatches it once, right before the instance's memory is
/// reclaimed. Implementations release external resources there.
pub const FINALIZE_SLOT: &str = "finalize";

/// Size of the return slot handed to every slot implementation.
const RET_SLOT_SIZE: usize = 16;

/// Invokes `imp` on `this`, returning whatever it wrote to the return slot
/// (zero when it wrote nothing).
///
/// # Safety
///
/// `this` must be live and `imp` must be a slot implementation following
/// the [`Imp`] convention with arguments matching `args`.
unsafe fn call_imp(
    this: ObjectPtr,
    imp: Imp,
    selector: &Selector,
    args: &MessageArgs,
) -> usize {
    let slice = args.as_slice();
    let args_ptr: *const *mut u8 = slice.as_ptr().cast::<*mut u8>();

    let mut ret = [0u8; RET_SLOT_SIZE];

    // SAFETY: the caller vouches for this/imp/args; ret is writable stack
    // memory large enough for every encoded return type.
    unsafe {
        imp(this, selector.as_handle(), args_ptr, ret.as_mut_ptr());
    }

    // SAFETY: ret is readable; read_unaligned tolerates any offset.
    unsafe { std::ptr::read_unaligned(ret.as_ptr().cast::<usize>()) }
}

/// Allocates a raw instance of `class` under `context`.
///
/// The new memory is a byte-copy of the class template: header pointing at
/// the leaf descriptor, payload holding the declared defaults. No
/// constructor runs and no destructor is registered; [`construct`] is the
/// normal creation path.
///
/// Returns `None` and raises [`ErrorCode::NoMemory`] if the context cannot
/// provide the memory.
#[must_use]
pub fn allocate_instance(class: &Class, context: &Context) -> Option<Object> {
    match context.duplicate(class.template_bytes()) {
        // SAFETY: the template copy carries a valid header.
        Some(ptr) => Some(unsafe { Object::from_ptr(ObjectPtr::new(ptr)) }),
        None => crate::raise!(
            ErrorCode::NoMemory,
            "unable to allocate a `{}` instance ({} bytes)",
            class.name(),
            class.size()
        ),
    }
}

/// Constructs an instance of `class` under `context`.
///
/// `virtual_class` names the class that declared the constructor slot; it
/// must be `class` itself or an ancestor (constructing through an
/// inherited constructor while sizing for the concrete class). The
/// instance memory is a byte-copy of `class`'s template, sized at
/// `class`'s full layout.
///
/// The constructor receives the new memory as self and, on success, writes
/// the (possibly relocated) self pointer into its return slot. A
/// constructor that relocates must keep the instance owned by `context`.
/// On failure it raises on the error channel and leaves the return slot
/// null; the runtime then reclaims the allocation, so the failed self must
/// never be reused.
///
/// If the constructed class implements [`FINALIZE_SLOT`], a destructor is
/// registered with `context` and dispatches it exactly once when the
/// context is freed.
///
/// Returns `None` after raising on any failure: `class` not inheriting
/// from `virtual_class` (InvalidParameter), a missing constructor slot
/// (ProgrammingError), an arity mismatch (InvalidParameter), allocation
/// failure (NoMemory), or a constructor-signaled failure (its own code).
#[must_use]
pub fn construct(
    class: &Class,
    virtual_class: &Class,
    constructor: &Selector,
    context: &Context,
    args: &MessageArgs,
) -> Option<Object> {
    if !class.is_subclass_of(virtual_class) {
        return crate::raise!(
            ErrorCode::InvalidParameter,
            "`{}` does not inherit from `{}`, the constructor's class",
            class.name(),
            virtual_class.name()
        );
    }

    let Some(method) = class.lookup_method(constructor) else {
        return crate::raise!(
            ErrorCode::ProgrammingError,
            "class `{}` has no constructor slot `{}`",
            class.name(),
            constructor.name()
        );
    };

    if method.is_implemented() && args.count() != method.arity {
        return crate::raise!(
            ErrorCode::InvalidParameter,
            "constructor `{}` of `{}` takes {} arguments, got {}",
            constructor.name(),
            class.name(),
            method.arity,
            args.count()
        );
    }

    let Some(memory) = context.duplicate(class.template_bytes()) else {
        return crate::raise!(
            ErrorCode::NoMemory,
            "unable to allocate a `{}` instance ({} bytes)",
            class.name(),
            class.size()
        );
    };

    let this = ObjectPtr::new(memory);

    // SAFETY: this addresses a fresh template copy; the slot table only
    // holds Imp-shaped pointers and the arity was validated above.
    let constructed = unsafe { call_imp(this, method.imp, constructor, args) }
        as *mut u8;

    let Some(constructed) = NonNull::new(constructed) else {
        // The constructor raised; reclaim the failed allocation.
        context.release(memory);
        return None;
    };

    // SAFETY: the constructor returned a live instance (itself, or its
    // relocation under the same context).
    let object = unsafe { Object::from_ptr(ObjectPtr::new(constructed)) };

    if object.class().implements(&Selector::intern(FINALIZE_SLOT)) {
        context.set_destructor(constructed, finalize_instance);
    }

    Some(object)
}

/// Releases a single instance ahead of its context's teardown.
///
/// Runs the registered finalizer (if any) and reclaims the instance's
/// memory; the rest of the context is untouched, and the later context
/// free will not finalize this instance again. Takes the handle by value:
/// the instance is gone afterwards.
///
/// Returns `false` if the instance does not belong to `context`.
pub fn release_instance(context: &Context, object: Object) -> bool {
    context.release(object.as_ptr().as_non_null())
}

/// Context destructor: dispatches the instance's `finalize` slot.
unsafe fn finalize_instance(ptr: NonNull<u8>) {
    let this = ObjectPtr::new(ptr);

    // SAFETY: the owning context invokes destructors before reclaiming the
    // memory, so the header is still valid here.
    let class = unsafe { this.class() };
    let selector = Selector::intern(FINALIZE_SLOT);

    if let Some(method) = class.lookup_method(&selector) {
        if method.is_implemented() {
            talos_log::trace!("finalizing `{}` instance", class.name());
            // SAFETY: finalize takes no arguments and the instance is live.
            let _ = unsafe {
                call_imp(this, method.imp, &selector, &MessageArgs::None)
            };
        }
    }
}

/// Dispatches `selector` on `object`'s leaf class.
///
/// Returns whatever the slot wrote to its return slot (zero for slots that
/// return nothing). Returns `None` after raising [`ErrorCode::KeyError`]
/// for an unknown slot or [`ErrorCode::InvalidParameter`] for an arity
/// mismatch.
///
/// Dispatching a slot marked unimplemented aborts the process; see
/// [`SlotBuilder::unimplemented`](crate::runtime::class::SlotBuilder::unimplemented).
///
/// # Safety
///
/// `object` must be live, and `args` must encode what the slot
/// implementation expects (the runtime validates the count, not the
/// types).
#[must_use]
pub unsafe fn send(
    object: &Object,
    selector: &Selector,
    args: &MessageArgs,
) -> Option<usize> {
    let class = object.class();

    let Some(method) = class.lookup_method(selector) else {
        return crate::raise!(
            ErrorCode::KeyError,
            "class `{}` has no slot `{}`",
            class.name(),
            selector.name()
        );
    };

    if method.is_implemented() && args.count() != method.arity {
        return crate::raise!(
            ErrorCode::InvalidParameter,
            "slot `{}` of `{}` takes {} arguments, got {}",
            selector.name(),
            class.name(),
            method.arity,
            args.count()
        );
    }

    // SAFETY: forwarded caller contract; arity validated above.
    Some(unsafe { call_imp(object.as_ptr(), method.imp, selector, args) })
}

/// Dispatches `impl_class`'s own version of `selector` on `object`,
/// bypassing the instance's override.
///
/// This is deliberate ancestor chaining: an overriding slot calls the
/// behavior it replaced. The entry is taken from `impl_class`'s table
/// regardless of the instance's actual class.
///
/// # Safety
///
/// Same contract as [`send`]; additionally the instance's payload must be
/// layout-compatible with what `impl_class`'s slot expects, which holds
/// whenever `object`'s class inherits from `impl_class`.
#[must_use]
pub unsafe fn send_super(
    object: &Object,
    impl_class: &Class,
    selector: &Selector,
    args: &MessageArgs,
) -> Option<usize> {
    let Some(method) = impl_class.lookup_method(selector) else {
        return crate::raise!(
            ErrorCode::KeyError,
            "class `{}` has no slot `{}`",
            impl_class.name(),
            selector.name()
        );
    };

    if method.is_implemented() && args.count() != method.arity {
        return crate::raise!(
            ErrorCode::InvalidParameter,
            "slot `{}` of `{}` takes {} arguments, got {}",
            selector.name(),
            impl_class.name(),
            method.arity,
            args.count()
        );
    }

    // SAFETY: forwarded caller contract; arity validated above.
    Some(unsafe { call_imp(object.as_ptr(), method.imp, selector, args) })
}

impl Object {
    /// Convenience for [`send`] with this instance as the receiver.
    ///
    /// # Safety
    ///
    /// Same contract as [`send`].
    #[must_use]
    pub unsafe fn send(
        &self,
        selector: &Selector,
        args: &MessageArgs,
    ) -> Option<usize> {
        // SAFETY: forwarded caller contract.
        unsafe { send(self, selector, args) }
    }
}
