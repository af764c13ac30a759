//! Class descriptors and one-time type initialization.
//!
//! Every class has exactly one descriptor, created at first use and alive
//! for the rest of the process. Descriptors form a tree rooted at
//! [`OBJECT`]; the root's superclass pointer is a sentinel referring to
//! itself, which is what terminates ancestor-chain walks.
//!
//! # Initialization
//!
//! Classes are declared as `static` [`ClassDef`] records. Calling
//! [`ClassDef::initialize`] builds the descriptor once, superclass first:
//! the slot table starts as a copy of the superclass's finished table, then
//! the class's slot function overrides individual slots, marks slots
//! unimplemented, or writes payload defaults into the instance template.
//! Repeated calls are no-ops and leave the descriptor bit-identical.
//!
//! # Thread Safety
//!
//! Descriptors are mutated only while being built, under the per-class
//! one-time cell. Afterwards dispatch and type queries are read-only and
//! safe from any thread.

use crate::runtime::get_global_arena;
use crate::runtime::object::{ObjectHeader, ObjectPtr};
use crate::runtime::selector::{Selector, SelectorHandle};
use crate::runtime::string::RuntimeString;
use fxhash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::ptr::NonNull;
use std::sync::{OnceLock, RwLock};

/// Slot implementation function pointer.
///
/// Every slot shares one C-compatible shape:
///
/// - `this`: the receiver instance
/// - `cmd`: the selector the call was dispatched through
/// - `args`: pointer to an array of `usize`-encoded arguments
/// - `ret`: 16-byte return slot, zeroed before the call
///
/// Constructor slots additionally follow the construction protocol: on
/// success they write the (possibly relocated) self pointer into `ret`; on
/// failure they raise on the error channel and leave `ret` null.
pub type Imp = unsafe extern "C" fn(
    this: ObjectPtr,
    cmd: SelectorHandle,
    args: *const *mut u8,
    ret: *mut u8,
);

/// A populated slot: the selector it answers to, the implementation, and
/// the number of `usize` arguments the implementation expects.
#[derive(Clone)]
pub struct Method {
    /// Slot selector.
    pub selector: Selector,
    /// Implementation function pointer.
    pub imp: Imp,
    /// Number of arguments beyond `this` and `cmd`.
    pub arity: usize,
}

impl Method {
    /// Returns `false` for slots explicitly marked unimplemented.
    ///
    /// Invoking such a slot aborts the process; see
    /// [`SlotBuilder::unimplemented`].
    #[must_use]
    pub fn is_implemented(&self) -> bool {
        !std::ptr::fn_addr_eq(self.imp, unimplemented_slot as Imp)
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("selector", &self.selector.name())
            .field("imp", &format!("{:p}", self.imp as *const ()))
            .field("arity", &self.arity)
            .finish()
    }
}

/// Descriptor data, allocated in the global metadata arena and never
/// deallocated.
#[repr(C)]
pub(crate) struct ClassInner {
    /// Class name (e.g. "Object", "FileLikeObject").
    pub(crate) name: RuntimeString,
    /// Doc string attached to the class.
    pub(crate) doc: RuntimeString,
    /// Byte length of the full instance layout (header + payload).
    pub(crate) size: usize,
    /// The descriptor's own address; descriptor identity for type queries.
    pub(crate) self_ref: NonNull<ClassInner>,
    /// Immediate superclass. The root descriptor points at itself, which
    /// terminates every ancestor walk.
    pub(crate) super_class: NonNull<ClassInner>,
    /// Slot table, keyed by interned selector identity. Copy-down: after
    /// initialization it holds inherited and own slots alike.
    pub(crate) methods: RwLock<FxHashMap<usize, Method>>,
    /// Instance template: `size` bytes whose header already points at this
    /// descriptor. Instances are byte-copies of it.
    pub(crate) template: NonNull<u8>,
}

/// Copyable reference to a finished descriptor, stored in one-time cells
/// and the registry.
#[derive(Clone, Copy)]
pub(crate) struct ClassHandle(pub(crate) NonNull<ClassInner>);

// SAFETY: descriptors are arena-resident for the process lifetime and
// immutable after initialization (the slot table is lock-protected).
unsafe impl Send for ClassHandle {}
unsafe impl Sync for ClassHandle {}

/// Global registry mapping class names to descriptors.
struct ClassRegistry {
    classes: RwLock<FxHashMap<&'static str, ClassHandle>>,
}

static REGISTRY: OnceLock<ClassRegistry> = OnceLock::new();

thread_local! {
    /// Classes currently being built on this thread; a repeat entry means
    /// the parent chain loops back on itself.
    static INIT_STACK: RefCell<Vec<*const ClassDef>> = const { RefCell::new(Vec::new()) };
}

/// Builder handed to a class's slot function during initialization.
///
/// At that point the slot table already contains the superclass's slots;
/// the builder overrides them, adds new ones, marks slots unimplemented,
/// and writes payload defaults into the template.
pub struct SlotBuilder<'a> {
    table: &'a mut FxHashMap<usize, Method>,
    payload: &'a mut [u8],
}

impl SlotBuilder<'_> {
    /// Binds `imp` to the slot `name`, overriding any inherited binding.
    pub fn slot(&mut self, name: &str, imp: Imp, arity: usize) {
        let selector = Selector::intern(name);
        self.table.insert(
            selector.key(),
            Method {
                selector,
                imp,
                arity,
            },
        );
    }

    /// Marks the slot `name` as intentionally unimplemented.
    ///
    /// Invoking it on any instance aborts the process with a diagnostic
    /// naming the class; abstract classes use this for slots subclasses
    /// must provide.
    pub fn unimplemented(&mut self, name: &str) {
        let selector = Selector::intern(name);
        self.table.insert(
            selector.key(),
            Method {
                selector,
                imp: unimplemented_slot,
                arity: 0,
            },
        );
    }

    /// Writes default bytes into the instance template at `offset` within
    /// the payload.
    ///
    /// Instances are byte-copies of the template, so fields a constructor
    /// leaves untouched start with these defaults (all other payload bytes
    /// are zero).
    ///
    /// # Panics
    ///
    /// Panics if the range falls outside the declared payload.
    pub fn default_bytes(&mut self, offset: usize, bytes: &[u8]) {
        let end = offset
            .checked_add(bytes.len())
            .expect("template default range overflows");
        assert!(
            end <= self.payload.len(),
            "template default at {offset}..{end} exceeds payload of {} bytes",
            self.payload.len()
        );
        self.payload[offset..end].copy_from_slice(bytes);
    }
}

/// A `static` class declaration.
///
/// Declaring a class is declaring one of these; the descriptor itself is
/// built on the first [`initialize`](ClassDef::initialize) call.
///
/// # Example
///
/// ```rust
/// use talos::{ClassDef, OBJECT};
///
/// static STREAM: ClassDef = ClassDef::new(
///     "Stream",
///     "Abstract byte stream.",
///     16,
///     Some(&OBJECT),
///     |b| b.unimplemented("read"),
/// );
///
/// let stream = STREAM.initialize();
/// assert_eq!(stream.name(), "Stream");
/// assert!(stream.super_class().is_root());
/// ```
pub struct ClassDef {
    name: &'static str,
    doc: &'static str,
    payload_size: usize,
    parent: Option<&'static ClassDef>,
    slots: fn(&mut SlotBuilder<'_>),
    cell: OnceLock<ClassHandle>,
}

impl ClassDef {
    /// Declares a class.
    ///
    /// `payload_size` is the byte length of the **full** payload, including
    /// the superclass's fields: subclass payload structs embed their
    /// parent's payload struct as their first field, C-style.
    #[must_use]
    pub const fn new(
        name: &'static str,
        doc: &'static str,
        payload_size: usize,
        parent: Option<&'static ClassDef>,
        slots: fn(&mut SlotBuilder<'_>),
    ) -> Self {
        ClassDef {
            name,
            doc,
            payload_size,
            parent,
            slots,
            cell: OnceLock::new(),
        }
    }

    /// Builds this class's descriptor, initializing the superclass first.
    ///
    /// Idempotent: only the first call does work, and repeated calls leave
    /// every descriptor in the chain bit-identical.
    ///
    /// # Panics
    ///
    /// Panics on setup contract violations: a duplicate class name, an
    /// inheritance cycle, or a payload smaller than the superclass's.
    pub fn initialize(&'static self) -> Class {
        if let Some(handle) = self.cell.get() {
            return Class { inner: handle.0 };
        }

        INIT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            let key = std::ptr::from_ref(self);
            assert!(
                !stack.contains(&key),
                "inheritance cycle detected at class `{}`",
                self.name
            );
            stack.push(key);
        });

        let handle = *self.cell.get_or_init(|| build_class(self));

        INIT_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });

        Class { inner: handle.0 }
    }
}

/// The root class. Every hierarchy bottoms out here; its descriptor's
/// superclass pointer refers to itself.
pub static OBJECT: ClassDef =
    ClassDef::new("Object", "Root of every class hierarchy.", 0, None, |_| {});

/// One-time descriptor construction. Runs under `def`'s one-time cell.
fn build_class(def: &'static ClassDef) -> ClassHandle {
    let super_class = def.parent.map(|parent| parent.initialize());

    if let Some(parent) = def.parent {
        assert!(
            def.payload_size >= parent.payload_size,
            "class `{}` declares a smaller payload than its superclass `{}`",
            def.name,
            parent.name
        );
    }

    let arena = get_global_arena();
    let size = ObjectHeader::SIZE + def.payload_size;

    // Copy-down inheritance: start from the superclass's finished table,
    // then let the class override its own slots.
    let mut table = match &super_class {
        // SAFETY: the superclass descriptor is finished and arena-resident.
        Some(sup) => unsafe { sup.inner.as_ref() }
            .methods
            .read()
            .unwrap()
            .clone(),
        None => FxHashMap::default(),
    };
    let mut payload = vec![0u8; def.payload_size];
    {
        let mut builder = SlotBuilder {
            table: &mut table,
            payload: &mut payload,
        };
        (def.slots)(&mut builder);
    }
    let slot_count = table.len();

    let template = arena.alloc_raw(size, ObjectHeader::ALIGN);

    let inner = ClassInner {
        name: RuntimeString::new(def.name),
        doc: RuntimeString::new(def.doc),
        size,
        self_ref: NonNull::dangling(),
        super_class: NonNull::dangling(),
        methods: RwLock::new(table),
        template,
    };
    let inner_ptr: *mut ClassInner = arena.alloc(inner);

    // SAFETY: arena allocations are never null.
    let inner_nn = unsafe { NonNull::new_unchecked(inner_ptr) };
    // Root sentinel: with no parent, the superclass pointer is the
    // descriptor itself.
    let super_nn = super_class.map_or(inner_nn, |sup| sup.inner);

    // SAFETY: inner_ptr was just allocated and nothing else references it
    // yet; template addresses `size` fresh arena bytes sized and aligned
    // for a header followed by the payload.
    unsafe {
        (*inner_ptr).self_ref = inner_nn;
        (*inner_ptr).super_class = super_nn;

        let header = ObjectHeader {
            class: inner_nn,
            super_class: super_nn,
        };
        std::ptr::write(template.as_ptr().cast::<ObjectHeader>(), header);
        std::ptr::copy_nonoverlapping(
            payload.as_ptr(),
            template.as_ptr().add(ObjectHeader::SIZE),
            def.payload_size,
        );
    }

    register(def.name, ClassHandle(inner_nn));

    talos_log::debug!(
        "initialized class `{}` ({} bytes, {} slots)",
        def.name,
        size,
        slot_count
    );

    ClassHandle(inner_nn)
}

/// Records a finished descriptor under its name.
///
/// # Panics
///
/// Panics if the name is already registered.
fn register(name: &'static str, handle: ClassHandle) {
    let registry = REGISTRY.get_or_init(|| ClassRegistry {
        classes: RwLock::new(FxHashMap::default()),
    });

    let mut classes = registry.classes.write().unwrap();
    assert!(
        !classes.contains_key(name),
        "duplicate class name `{name}` in registry"
    );
    classes.insert(name, handle);
}

/// Handle to a finished class descriptor.
///
/// Cheap to clone, compared by descriptor identity, valid for the process
/// lifetime.
pub struct Class {
    pub(crate) inner: NonNull<ClassInner>,
}

impl Class {
    /// Looks a class up by name in the global registry.
    ///
    /// Useful at boundaries where only a name crosses (the descriptor
    /// returned is pointer-identical to the one `initialize` yields).
    ///
    /// # Panics
    ///
    /// Panics if the registry lock is poisoned.
    #[must_use]
    pub fn lookup(name: &str) -> Option<Class> {
        let registry = REGISTRY.get()?;
        let classes = registry.classes.read().unwrap();
        classes.get(name).map(|handle| Class { inner: handle.0 })
    }

    fn inner(&self) -> &'static ClassInner {
        // SAFETY: descriptors are arena-resident for the process lifetime.
        unsafe { self.inner.as_ref() }
    }

    /// Returns the class name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.inner().name.as_str()
    }

    /// Returns the class doc string.
    #[must_use]
    pub fn doc(&self) -> &'static str {
        self.inner().doc.as_str()
    }

    /// Byte length of the full instance layout (header + payload).
    #[must_use]
    pub fn size(&self) -> usize {
        self.inner().size
    }

    /// Byte length of the instance payload.
    #[must_use]
    pub fn payload_size(&self) -> usize {
        self.inner().size - ObjectHeader::SIZE
    }

    /// Returns the immediate superclass.
    ///
    /// The root class returns itself; check with [`Class::is_root`].
    #[must_use]
    pub fn super_class(&self) -> Class {
        Class {
            inner: self.inner().super_class,
        }
    }

    /// Returns `true` for the root of the descriptor tree.
    #[must_use]
    pub fn is_root(&self) -> bool {
        std::ptr::eq(self.inner().super_class.as_ptr(), self.inner.as_ptr())
    }

    /// Walks the ancestor chain testing whether this class is `other` or
    /// inherits from it.
    ///
    /// Comparison is by descriptor identity, never by name. The walk
    /// terminates at the root's self-sentinel, so it is finite for every
    /// well-formed hierarchy.
    #[must_use]
    pub fn is_subclass_of(&self, other: &Class) -> bool {
        // The queried descriptor's self-reference is the identity anchor.
        let target = other.inner().self_ref;
        let mut current = self.inner;

        loop {
            if std::ptr::eq(current.as_ptr(), target.as_ptr()) {
                return true;
            }

            // SAFETY: every link in the chain is an arena-resident
            // descriptor.
            let next = unsafe { current.as_ref() }.super_class;
            if std::ptr::eq(next.as_ptr(), current.as_ptr()) {
                return false;
            }
            current = next;
        }
    }

    /// Returns the slot bound to `selector`, inherited or own.
    ///
    /// One table hit: copy-down initialization makes inherited slots
    /// leaf-resident, so no chain walk happens at dispatch time.
    ///
    /// # Panics
    ///
    /// Panics if the slot-table lock is poisoned.
    #[must_use]
    pub fn lookup_method(&self, selector: &Selector) -> Option<Method> {
        self.inner()
            .methods
            .read()
            .unwrap()
            .get(&selector.key())
            .cloned()
    }

    /// Returns `true` if the class binds `selector` to a real
    /// implementation (not an unimplemented marker).
    #[must_use]
    pub fn implements(&self, selector: &Selector) -> bool {
        self.lookup_method(selector)
            .is_some_and(|method| method.is_implemented())
    }

    /// Number of slots in the table (inherited and own).
    ///
    /// # Panics
    ///
    /// Panics if the slot-table lock is poisoned.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.inner().methods.read().unwrap().len()
    }

    /// The instance template this class stamps out.
    pub(crate) fn template_bytes(&self) -> &'static [u8] {
        let inner = self.inner();
        // SAFETY: the template is `size` initialized arena bytes.
        unsafe {
            std::slice::from_raw_parts(inner.template.as_ptr(), inner.size)
        }
    }
}

// SAFETY: Class is a handle to an arena-resident descriptor whose only
// mutable part (the slot table) is lock-protected.
unsafe impl Send for Class {}
unsafe impl Sync for Class {}

impl Clone for Class {
    fn clone(&self) -> Self {
        Class { inner: self.inner }
    }
}

impl PartialEq for Class {
    fn eq(&self, other: &Self) -> bool {
        // Descriptor identity: one descriptor per class.
        std::ptr::eq(self.inner.as_ptr(), other.inner.as_ptr())
    }
}

impl Eq for Class {}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let super_name =
            (!self.is_root()).then(|| self.super_class().name().to_string());
        f.debug_struct("Class")
            .field("name", &self.name())
            .field("size", &self.size())
            .field("super_class", &super_name)
            .finish()
    }
}

/// Trap bound to slots marked unimplemented.
///
/// Aborts the process with a diagnostic naming the class and slot. Misuse
/// of an abstract class is not a recoverable condition.
pub(crate) unsafe extern "C" fn unimplemented_slot(
    this: ObjectPtr,
    cmd: SelectorHandle,
    _args: *const *mut u8,
    _ret: *mut u8,
) {
    // SAFETY: the runtime only dispatches slots on live instances, and cmd
    // always carries the dispatched selector.
    let class = unsafe { this.class() };
    let selector = unsafe { Selector::from_handle(cmd) };

    talos_log::error!(
        "class `{}` does not implement `{}`: is it an abstract class?",
        class.name(),
        selector.name()
    );
    std::process::abort();
}

#[cfg(test)]
mod tests {
    use super::*;

    static INIT_ROOT_A: ClassDef =
        ClassDef::new("InitRootA", "", 0, None, |_| {});
    static INIT_CHILD_A: ClassDef =
        ClassDef::new("InitChildA", "", 8, Some(&INIT_ROOT_A), |_| {});
    static INIT_GRANDCHILD_A: ClassDef =
        ClassDef::new("InitGrandChildA", "", 16, Some(&INIT_CHILD_A), |_| {});

    #[test]
    fn test_initialize_builds_chain() {
        let grandchild = INIT_GRANDCHILD_A.initialize();

        assert_eq!(grandchild.name(), "InitGrandChildA");
        assert_eq!(grandchild.super_class().name(), "InitChildA");
        assert_eq!(
            grandchild.super_class().super_class().name(),
            "InitRootA"
        );
        assert!(grandchild.super_class().super_class().is_root());
    }

    #[test]
    fn test_initialize_is_idempotent() {
        static ROOT: ClassDef = ClassDef::new("IdemRoot", "", 0, None, |_| {});
        static CHILD: ClassDef =
            ClassDef::new("IdemChild", "", 8, Some(&ROOT), |_| {});

        let first = CHILD.initialize();
        let second = CHILD.initialize();

        // Same descriptor, bit-identical fields, ancestors included.
        assert!(std::ptr::eq(first.inner.as_ptr(), second.inner.as_ptr()));
        assert_eq!(first.size(), second.size());
        assert_eq!(first.slot_count(), second.slot_count());
        assert!(std::ptr::eq(
            first.template_bytes().as_ptr(),
            second.template_bytes().as_ptr()
        ));
        assert!(std::ptr::eq(
            first.super_class().inner.as_ptr(),
            ROOT.initialize().inner.as_ptr()
        ));
    }

    #[test]
    fn test_root_sentinel() {
        let root = OBJECT.initialize();

        assert!(root.is_root());
        assert_eq!(root.super_class(), root);
        assert_eq!(root.payload_size(), 0);
    }

    #[test]
    fn test_is_subclass_of() {
        static ROOT: ClassDef = ClassDef::new("SubRoot", "", 0, None, |_| {});
        static CHILD: ClassDef =
            ClassDef::new("SubChild", "", 0, Some(&ROOT), |_| {});
        static GRANDCHILD: ClassDef =
            ClassDef::new("SubGrandChild", "", 0, Some(&CHILD), |_| {});

        let root = ROOT.initialize();
        let child = CHILD.initialize();
        let grandchild = GRANDCHILD.initialize();

        assert!(child.is_subclass_of(&root));
        assert!(grandchild.is_subclass_of(&child));
        assert!(grandchild.is_subclass_of(&root));

        assert!(!root.is_subclass_of(&child));
        assert!(!root.is_subclass_of(&grandchild));
        assert!(!child.is_subclass_of(&grandchild));

        // A class is a subclass of itself.
        assert!(root.is_subclass_of(&root));
        assert!(grandchild.is_subclass_of(&grandchild));
    }

    #[test]
    fn test_registry_lookup_is_identity() {
        static ROOT: ClassDef = ClassDef::new("RegRoot", "", 0, None, |_| {});

        let class = ROOT.initialize();
        let found = Class::lookup("RegRoot").unwrap();

        assert_eq!(class, found);
        assert!(Class::lookup("NoSuchClass").is_none());
    }

    #[test]
    fn test_doc_and_size() {
        static DOCUMENTED: ClassDef = ClassDef::new(
            "Documented",
            "Carries a doc string.",
            24,
            None,
            |_| {},
        );

        let class = DOCUMENTED.initialize();
        assert_eq!(class.doc(), "Carries a doc string.");
        assert_eq!(class.size(), ObjectHeader::SIZE + 24);
        assert_eq!(class.payload_size(), 24);
    }

    #[test]
    fn test_template_defaults() {
        static DEFAULTED: ClassDef =
            ClassDef::new("Defaulted", "", 8, None, |b| {
                b.default_bytes(0, &[0xAB, 0xCD]);
            });

        let class = DEFAULTED.initialize();
        let payload = &class.template_bytes()[ObjectHeader::SIZE..];

        assert_eq!(payload[0], 0xAB);
        assert_eq!(payload[1], 0xCD);
        assert!(payload[2..].iter().all(|&b| b == 0));
    }

    unsafe extern "C" fn noop_slot(
        _this: ObjectPtr,
        _cmd: SelectorHandle,
        _args: *const *mut u8,
        _ret: *mut u8,
    ) {
    }

    #[test]
    fn test_copy_down_tables() {
        static ROOT: ClassDef = ClassDef::new("TableRoot", "", 0, None, |b| {
            b.slot("inherited", noop_slot, 0);
        });
        static CHILD: ClassDef =
            ClassDef::new("TableChild", "", 0, Some(&ROOT), |b| {
                b.slot("own", noop_slot, 1);
            });

        let child = CHILD.initialize();

        // The inherited slot is leaf-resident after copy-down.
        let inherited = child.lookup_method(&Selector::intern("inherited"));
        assert!(inherited.is_some());
        assert_eq!(inherited.unwrap().arity, 0);

        let own = child.lookup_method(&Selector::intern("own"));
        assert_eq!(own.unwrap().arity, 1);

        // The parent never sees the child's slot.
        let root = ROOT.initialize();
        assert!(root.lookup_method(&Selector::intern("own")).is_none());
        assert_eq!(child.slot_count(), 2);
        assert_eq!(root.slot_count(), 1);
    }

    #[test]
    fn test_override_replaces_inherited_binding() {
        unsafe extern "C" fn root_version(
            _this: ObjectPtr,
            _cmd: SelectorHandle,
            _args: *const *mut u8,
            ret: *mut u8,
        ) {
            unsafe { std::ptr::write_unaligned(ret.cast::<usize>(), 1) };
        }
        unsafe extern "C" fn child_version(
            _this: ObjectPtr,
            _cmd: SelectorHandle,
            _args: *const *mut u8,
            ret: *mut u8,
        ) {
            unsafe { std::ptr::write_unaligned(ret.cast::<usize>(), 2) };
        }

        static ROOT: ClassDef =
            ClassDef::new("OverrideRoot", "", 0, None, |b| {
                b.slot("value", root_version, 0);
            });
        static CHILD: ClassDef =
            ClassDef::new("OverrideChild", "", 0, Some(&ROOT), |b| {
                b.slot("value", child_version, 0);
            });

        let root = ROOT.initialize();
        let child = CHILD.initialize();
        let sel = Selector::intern("value");

        let root_imp = root.lookup_method(&sel).unwrap().imp;
        let child_imp = child.lookup_method(&sel).unwrap().imp;

        assert!(!std::ptr::fn_addr_eq(root_imp, child_imp));
    }

    #[test]
    fn test_unimplemented_marker() {
        static ABSTRACT: ClassDef =
            ClassDef::new("AbstractMarked", "", 0, None, |b| {
                b.unimplemented("mustOverride");
            });

        let class = ABSTRACT.initialize();
        let sel = Selector::intern("mustOverride");

        let method = class.lookup_method(&sel).unwrap();
        assert!(!method.is_implemented());
        assert!(!class.implements(&sel));
    }

    #[test]
    fn test_class_equality_and_debug() {
        static ROOT: ClassDef = ClassDef::new("DebugRootCls", "", 0, None, |_| {});
        static CHILD: ClassDef =
            ClassDef::new("DebugChildCls", "", 0, Some(&ROOT), |_| {});

        let root = ROOT.initialize();
        let child = CHILD.initialize();

        assert_ne!(root, child);
        assert_eq!(root, root.clone());

        let text = format!("{child:?}");
        assert!(text.contains("DebugChildCls"));
        assert!(text.contains("DebugRootCls"));
    }
}
