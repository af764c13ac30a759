//! Instance layout and object handles.
//!
//! Every instance begins with an [`ObjectHeader`]: the leaf-class
//! descriptor pointer and the immediate-superclass pointer, byte-copied
//! from the class template at allocation time. The payload (instance
//! fields) follows; subclass payload structs embed their parent's payload
//! struct as their first field, so ancestor layouts concatenate base-first.
//!
//! Two handle types cover the two audiences:
//!
//! - [`ObjectPtr`]: the opaque pointer slot implementations receive in
//!   their `extern "C"` signatures.
//! - [`Object`]: the handle the rest of the program holds, with safe
//!   accessors for the header.
//!
//! Instances are owned by the allocator context that created them, not by
//! these handles; a handle is valid for as long as its context keeps the
//! instance alive.

use crate::runtime::class::{Class, ClassInner};
use std::fmt;
use std::ptr::NonNull;

/// Common prefix of every instance, byte-copied from the class template.
#[repr(C)]
#[derive(Clone, Copy)]
pub(crate) struct ObjectHeader {
    /// Leaf class: the actually-constructed class, never an ancestor, even
    /// when the instance is reached through an ancestor-typed handle.
    pub(crate) class: NonNull<ClassInner>,
    /// Immediate superclass of the leaf class.
    pub(crate) super_class: NonNull<ClassInner>,
}

impl ObjectHeader {
    pub(crate) const SIZE: usize = std::mem::size_of::<ObjectHeader>();
    pub(crate) const ALIGN: usize = std::mem::align_of::<ObjectHeader>();
}

/// Opaque instance pointer for `extern "C"` slot signatures.
///
/// Slot implementations receive their receiver through this type and reach
/// their fields with [`ObjectPtr::payload`].
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq)]
pub struct ObjectPtr(NonNull<u8>);

impl ObjectPtr {
    pub(crate) fn new(ptr: NonNull<u8>) -> ObjectPtr {
        ObjectPtr(ptr)
    }

    /// Returns the raw instance address.
    ///
    /// Constructor slots write this value into their return slot to hand
    /// the instance back to [`construct`](crate::runtime::dispatch::construct).
    #[must_use]
    pub fn as_raw(self) -> *mut u8 {
        self.0.as_ptr()
    }

    pub(crate) fn as_non_null(self) -> NonNull<u8> {
        self.0
    }

    /// Reads the leaf class from the instance header.
    ///
    /// # Safety
    ///
    /// The pointer must address a live instance (its owning context has not
    /// freed or released it).
    #[must_use]
    pub unsafe fn class(self) -> Class {
        // SAFETY: live instances start with a valid header.
        let header = unsafe { *self.0.as_ptr().cast::<ObjectHeader>() };
        Class {
            inner: header.class,
        }
    }

    /// Reads the immediate superclass from the instance header.
    ///
    /// # Safety
    ///
    /// Same contract as [`ObjectPtr::class`].
    #[must_use]
    pub unsafe fn super_class(self) -> Class {
        // SAFETY: live instances start with a valid header.
        let header = unsafe { *self.0.as_ptr().cast::<ObjectHeader>() };
        Class {
            inner: header.super_class,
        }
    }

    /// Returns a typed pointer to the instance payload.
    ///
    /// # Safety
    ///
    /// The instance must be live, and `T` must be the payload struct of the
    /// instance's class (or of an ancestor: ancestor layouts are a prefix
    /// of the payload).
    #[must_use]
    pub unsafe fn payload<T>(self) -> *mut T {
        // SAFETY: the payload begins right after the header.
        unsafe { self.0.as_ptr().add(ObjectHeader::SIZE) }.cast::<T>()
    }
}

impl fmt::Debug for ObjectPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectPtr({:p})", self.0.as_ptr())
    }
}

/// Handle to a constructed instance.
///
/// Non-owning: the instance belongs to the allocator context it was
/// constructed under and dies when that context is freed. Accessors assume
/// the instance is live, which holds as long as the owning context is.
///
/// # Example
///
/// ```rust
/// use talos::{ClassDef, Context, OBJECT};
/// use talos::runtime::dispatch::allocate_instance;
///
/// static MARKER: ClassDef =
///     ClassDef::new("Marker", "", 8, Some(&OBJECT), |_| {});
///
/// let class = MARKER.initialize();
/// let ctx = Context::new();
///
/// let obj = allocate_instance(&class, &ctx).unwrap();
/// assert_eq!(obj.class_name(), "Marker");
/// assert!(obj.is_instance_of(&OBJECT.initialize()));
///
/// ctx.free();
/// ```
pub struct Object {
    ptr: ObjectPtr,
}

impl Object {
    /// Wraps a raw instance pointer.
    ///
    /// # Safety
    ///
    /// `ptr` must address a live instance created from a class template
    /// (so its header is valid).
    #[must_use]
    pub unsafe fn from_ptr(ptr: ObjectPtr) -> Object {
        Object { ptr }
    }

    /// Returns the opaque pointer for this instance.
    #[must_use]
    pub fn as_ptr(&self) -> ObjectPtr {
        self.ptr
    }

    /// Returns the instance's leaf class.
    #[must_use]
    pub fn class(&self) -> Class {
        // SAFETY: the from_ptr contract guarantees a live header.
        unsafe { self.ptr.class() }
    }

    /// Returns the immediate superclass of the instance's leaf class.
    #[must_use]
    pub fn super_class(&self) -> Class {
        // SAFETY: the from_ptr contract guarantees a live header.
        unsafe { self.ptr.super_class() }
    }

    /// Name of the instance's leaf class.
    #[must_use]
    pub fn class_name(&self) -> &'static str {
        self.class().name()
    }

    /// Byte length of the full instance layout.
    #[must_use]
    pub fn size(&self) -> usize {
        self.class().size()
    }

    /// Walks the ancestor chain testing whether this instance is a member
    /// of `class`, directly or through inheritance.
    #[must_use]
    pub fn is_instance_of(&self, class: &Class) -> bool {
        self.class().is_subclass_of(class)
    }

    /// Returns a typed pointer to the instance payload.
    ///
    /// # Safety
    ///
    /// `T` must be the payload struct of the instance's class or of an
    /// ancestor, and access must follow Rust's aliasing rules.
    #[must_use]
    pub unsafe fn payload<T>(&self) -> *mut T {
        // SAFETY: forwarded contract.
        unsafe { self.ptr.payload::<T>() }
    }
}

impl Clone for Object {
    fn clone(&self) -> Self {
        Object { ptr: self.ptr }
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        // Identity: two handles are equal when they name the same instance.
        self.ptr == other.ptr
    }
}

impl Eq for Object {}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("class", &self.class_name())
            .field("size", &self.size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::class::ClassDef;
    use crate::runtime::dispatch::allocate_instance;
    use talos_mem::Context;

    #[repr(C)]
    struct CounterFields {
        count: u64,
    }

    static COUNTER: ClassDef = ClassDef::new(
        "ObjCounter",
        "",
        std::mem::size_of::<CounterFields>(),
        None,
        |_| {},
    );

    #[test]
    fn test_header_names_leaf_class() {
        let class = COUNTER.initialize();
        let ctx = Context::new();

        let obj = allocate_instance(&class, &ctx).unwrap();

        assert_eq!(obj.class(), class);
        assert_eq!(obj.class_name(), "ObjCounter");
        assert_eq!(obj.size(), class.size());
        // ObjCounter is itself a root, so its super sentinel is itself.
        assert_eq!(obj.super_class(), class);

        ctx.free();
    }

    #[test]
    fn test_payload_starts_zeroed() {
        let class = COUNTER.initialize();
        let ctx = Context::new();

        let obj = allocate_instance(&class, &ctx).unwrap();
        let fields = unsafe { &*obj.payload::<CounterFields>() };
        assert_eq!(fields.count, 0);

        ctx.free();
    }

    #[test]
    fn test_handle_identity() {
        let class = COUNTER.initialize();
        let ctx = Context::new();

        let a = allocate_instance(&class, &ctx).unwrap();
        let b = allocate_instance(&class, &ctx).unwrap();

        assert_ne!(a, b);
        assert_eq!(a, a.clone());

        ctx.free();
    }
}
