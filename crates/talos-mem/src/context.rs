//! Hierarchical ownership contexts.
//!
//! A [`Context`] is a node in an ownership tree. Every allocation (a
//! *block*) belongs to exactly one context and may carry at most one
//! destructor callback. Freeing a context cascades to all descendant
//! contexts first (deepest-first), then runs the context's own destructors
//! in reverse allocation order, and only then reclaims block memory.
//!
//! # Architecture
//!
//! Context descriptors are allocated in a private metadata arena and are
//! never reclaimed. This keeps a freed context's descriptor readable for
//! the process lifetime, which is what makes freeing a context a second
//! time a guaranteed no-op rather than undefined behavior. Block memory
//! (the actual payloads) comes from the system allocator and is reclaimed
//! on `free` or `release`.
//!
//! # Thread Safety
//!
//! Child lists and block lists are lock-protected, so concurrent use is
//! memory-safe. Semantic atomicity across operations (for example,
//! allocating from a context another thread is freeing) still requires
//! external synchronization by the caller.
//!
//! # Example
//!
//! ```rust
//! use talos_mem::context::Context;
//!
//! let ctx = Context::new();
//! let block = ctx.alloc(64).unwrap();
//!
//! unsafe {
//!     // Blocks are zero-initialized.
//!     assert_eq!(*block.as_ptr(), 0);
//! }
//!
//! assert!(ctx.free());
//! assert!(!ctx.free()); // Second free is a no-op.
//! ```

use crate::arena::Arena;
use std::alloc::{self, Layout};
use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};

/// Alignment of every block a context hands out.
///
/// Matches the metadata arena's alignment so instance templates copied out
/// of the arena keep their field alignment.
const BLOCK_ALIGNMENT: usize = 16;

/// Destructor callback attached to a block.
///
/// Invoked exactly once with the block's pointer, before the block's memory
/// is reclaimed. The callback must release any external resources the block
/// holds; it must not free the block itself.
pub type Destructor = unsafe fn(NonNull<u8>);

/// A single allocation owned by a context.
struct Block {
    ptr: NonNull<u8>,
    layout: Layout,
    destructor: Option<Destructor>,
}

/// Context node stored in the private metadata arena.
///
/// Never deallocated; `free` empties the lists and flips `freed`, leaving
/// the descriptor itself readable forever.
pub(crate) struct ContextInner {
    /// Child contexts, freed along with this one.
    children: Mutex<Vec<NonNull<ContextInner>>>,
    /// Blocks owned directly by this context.
    blocks: Mutex<Vec<Block>>,
    /// Set once on free; repeated frees observe it and return early.
    freed: AtomicBool,
    /// The process-wide default context refuses to be freed.
    global: bool,
}

/// Private arena holding context descriptors.
fn shell_arena() -> &'static Arena {
    static SHELLS: OnceLock<Arena> = OnceLock::new();
    SHELLS.get_or_init(|| Arena::new(4096))
}

/// Process-wide default context.
static GLOBAL: OnceLock<Context> = OnceLock::new();

/// Handle to an ownership context.
///
/// Handles are cheap to clone and compare by identity. A handle does not
/// keep its context alive in the Rust ownership sense; the context tree is
/// torn down explicitly through [`Context::free`].
///
/// # Example
///
/// ```rust
/// use talos_mem::context::Context;
///
/// let parent = Context::new();
/// let child = parent.child();
///
/// let block = child.alloc(32).unwrap();
/// let _ = block;
///
/// // Freeing the parent cascades into the child.
/// assert!(parent.free());
/// assert!(child.is_freed());
/// ```
pub struct Context {
    inner: NonNull<ContextInner>,
}

impl Context {
    /// Returns the process-wide default context.
    ///
    /// Created lazily on first access and never freed; allocations made
    /// here live until process exit unless released individually.
    #[must_use]
    pub fn global() -> Context {
        GLOBAL
            .get_or_init(|| Context::with_flags(true))
            .clone()
    }

    /// Creates a new independent top-level context.
    #[must_use]
    pub fn new() -> Context {
        Context::with_flags(false)
    }

    fn with_flags(global: bool) -> Context {
        let inner = ContextInner {
            children: Mutex::new(Vec::new()),
            blocks: Mutex::new(Vec::new()),
            freed: AtomicBool::new(false),
            global,
        };

        let ptr: *mut ContextInner = shell_arena().alloc(inner);

        // SAFETY: arena allocations are never null.
        Context {
            inner: unsafe { NonNull::new_unchecked(ptr) },
        }
    }

    /// Creates a child context, freed along with this context.
    ///
    /// # Panics
    ///
    /// Panics if the child-list lock is poisoned.
    #[must_use]
    pub fn child(&self) -> Context {
        let child = Context::with_flags(false);

        // SAFETY: self.inner points at an arena-resident ContextInner.
        let inner = unsafe { self.inner.as_ref() };
        inner.children.lock().unwrap().push(child.inner);

        child
    }

    /// Allocates a zero-initialized block of `size` bytes in this context.
    ///
    /// Returns `None` if the context has been freed, `size` is zero, or the
    /// system allocator fails.
    ///
    /// # Panics
    ///
    /// Panics if the block-list lock is poisoned.
    #[must_use]
    pub fn alloc(&self, size: usize) -> Option<NonNull<u8>> {
        // SAFETY: self.inner points at an arena-resident ContextInner.
        let inner = unsafe { self.inner.as_ref() };
        if inner.freed.load(Ordering::Acquire) {
            return None;
        }

        let layout = Layout::from_size_align(size, BLOCK_ALIGNMENT).ok()?;
        if layout.size() == 0 {
            return None;
        }

        // SAFETY: layout has non-zero size.
        let ptr = NonNull::new(unsafe { alloc::alloc_zeroed(layout) })?;

        inner.blocks.lock().unwrap().push(Block {
            ptr,
            layout,
            destructor: None,
        });

        Some(ptr)
    }

    /// Allocates a block holding a byte-copy of `source`.
    ///
    /// This is the template-duplication primitive the runtime builds
    /// instances with. Returns `None` under the same conditions as
    /// [`Context::alloc`].
    #[must_use]
    pub fn duplicate(&self, source: &[u8]) -> Option<NonNull<u8>> {
        let ptr = self.alloc(source.len())?;

        // SAFETY: ptr addresses source.len() freshly allocated bytes that
        // cannot overlap a caller-visible slice.
        unsafe {
            std::ptr::copy_nonoverlapping(
                source.as_ptr(),
                ptr.as_ptr(),
                source.len(),
            );
        }

        Some(ptr)
    }

    /// Registers the destructor for a block owned by this context.
    ///
    /// At most one destructor is attached per block; registering again
    /// replaces the previous callback. The destructor runs exactly once,
    /// before the block's memory is reclaimed.
    ///
    /// Returns `false` if `ptr` is not a block of this context.
    ///
    /// # Panics
    ///
    /// Panics if the block-list lock is poisoned.
    pub fn set_destructor(&self, ptr: NonNull<u8>, destructor: Destructor) -> bool {
        // SAFETY: self.inner points at an arena-resident ContextInner.
        let inner = unsafe { self.inner.as_ref() };

        let mut blocks = inner.blocks.lock().unwrap();
        match blocks.iter_mut().find(|b| b.ptr == ptr) {
            Some(block) => {
                block.destructor = Some(destructor);
                true
            }
            None => false,
        }
    }

    /// Releases a single block early: runs its destructor (if any) and
    /// reclaims its memory without touching the rest of the context.
    ///
    /// Returns `false` if `ptr` is not a block of this context.
    ///
    /// # Panics
    ///
    /// Panics if the block-list lock is poisoned.
    pub fn release(&self, ptr: NonNull<u8>) -> bool {
        // SAFETY: self.inner points at an arena-resident ContextInner.
        let inner = unsafe { self.inner.as_ref() };

        let block = {
            let mut blocks = inner.blocks.lock().unwrap();
            match blocks.iter().position(|b| b.ptr == ptr) {
                Some(index) => blocks.swap_remove(index),
                None => return false,
            }
        };

        // Run the destructor outside the lock so it may re-enter the
        // context (allocate, release other blocks).
        if let Some(destructor) = block.destructor {
            // SAFETY: the block is still allocated; it was removed from the
            // list so nothing can free it concurrently.
            unsafe { destructor(block.ptr) };
        }

        // SAFETY: ptr/layout come from the matching alloc call and the
        // block has been removed from the list.
        unsafe { alloc::dealloc(block.ptr.as_ptr(), block.layout) };

        true
    }

    /// Frees this context: descendant contexts first (deepest-first), then
    /// this context's own destructors in reverse allocation order, then the
    /// block memory.
    ///
    /// Returns `true` if the context was actually torn down. Freeing an
    /// already-freed context is a no-op, and the process-wide default
    /// context refuses to be freed; both return `false`.
    ///
    /// # Panics
    ///
    /// Panics if a list lock is poisoned.
    pub fn free(&self) -> bool {
        // SAFETY: self.inner points at an arena-resident ContextInner.
        let inner = unsafe { self.inner.as_ref() };
        if inner.global {
            return false;
        }

        // SAFETY: inner is arena-resident for the process lifetime.
        unsafe { free_inner(self.inner) }
    }

    /// Returns `true` once this context has been freed.
    #[must_use]
    pub fn is_freed(&self) -> bool {
        // SAFETY: self.inner points at an arena-resident ContextInner.
        unsafe { self.inner.as_ref() }.freed.load(Ordering::Acquire)
    }

    /// Number of blocks currently owned directly by this context.
    ///
    /// # Panics
    ///
    /// Panics if the block-list lock is poisoned.
    #[must_use]
    pub fn block_count(&self) -> usize {
        // SAFETY: self.inner points at an arena-resident ContextInner.
        unsafe { self.inner.as_ref() }.blocks.lock().unwrap().len()
    }
}

/// Recursive teardown. The freed flag is claimed first so concurrent or
/// repeated frees become no-ops before any destructor runs.
///
/// # Safety
///
/// `inner_ptr` must point at an arena-resident `ContextInner`.
unsafe fn free_inner(inner_ptr: NonNull<ContextInner>) -> bool {
    // SAFETY: guaranteed by the caller.
    let inner = unsafe { inner_ptr.as_ref() };

    if inner.freed.swap(true, Ordering::AcqRel) {
        return false;
    }

    // Children first: destructors deepest in the tree run before their
    // ancestors' blocks are touched.
    let children = std::mem::take(&mut *inner.children.lock().unwrap());
    for child in children.into_iter().rev() {
        // SAFETY: child descriptors are arena-resident like our own.
        unsafe { free_inner(child) };
    }

    // Take the block list before running destructors so callbacks may
    // re-enter the context without deadlocking.
    let blocks = std::mem::take(&mut *inner.blocks.lock().unwrap());

    for block in blocks.iter().rev() {
        if let Some(destructor) = block.destructor {
            // SAFETY: the block memory is still allocated here.
            unsafe { destructor(block.ptr) };
        }
    }

    for block in blocks {
        // SAFETY: ptr/layout come from the matching alloc call; the list
        // was emptied, so each block is reclaimed exactly once.
        unsafe { alloc::dealloc(block.ptr.as_ptr(), block.layout) };
    }

    true
}

impl Default for Context {
    fn default() -> Self {
        Context::new()
    }
}

impl Clone for Context {
    fn clone(&self) -> Self {
        Context { inner: self.inner }
    }
}

impl PartialEq for Context {
    fn eq(&self, other: &Self) -> bool {
        // Identity: two handles are equal when they name the same node.
        std::ptr::eq(self.inner.as_ptr(), other.inner.as_ptr())
    }
}

impl Eq for Context {}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("freed", &self.is_freed())
            .field("blocks", &self.block_count())
            .finish()
    }
}

// SAFETY: Context is Send + Sync because ContextInner is arena-resident
// (never moves, process lifetime), its lists are lock-protected, and the
// freed flag is atomic.
unsafe impl Send for Context {}
unsafe impl Sync for Context {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // One counter per test; the harness runs tests concurrently and a
    // shared counter would race.
    macro_rules! counting_destructor {
        ($counter:ident, $destructor:ident) => {
            static $counter: AtomicUsize = AtomicUsize::new(0);

            unsafe fn $destructor(_ptr: NonNull<u8>) {
                $counter.fetch_add(1, Ordering::SeqCst);
            }
        };
    }

    static DROP_ORDER: Mutex<Vec<u8>> = Mutex::new(Vec::new());

    unsafe fn ordered_destructor(ptr: NonNull<u8>) {
        // The first byte of each block is a test-assigned tag.
        let tag = unsafe { *ptr.as_ptr() };
        DROP_ORDER.lock().unwrap().push(tag);
    }

    #[test]
    fn test_alloc_is_zeroed() {
        let ctx = Context::new();
        let ptr = ctx.alloc(128).unwrap();

        let bytes =
            unsafe { std::slice::from_raw_parts(ptr.as_ptr(), 128) };
        assert!(bytes.iter().all(|&b| b == 0));

        ctx.free();
    }

    #[test]
    fn test_duplicate_copies_source() {
        let ctx = Context::new();
        let source = [1u8, 2, 3, 4, 5, 6, 7, 8];

        let ptr = ctx.duplicate(&source).unwrap();
        let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), 8) };
        assert_eq!(bytes, &source);

        ctx.free();
    }

    #[test]
    fn test_zero_size_alloc_fails() {
        let ctx = Context::new();
        assert!(ctx.alloc(0).is_none());
        ctx.free();
    }

    #[test]
    fn test_destructor_runs_exactly_once() {
        counting_destructor!(ONCE_COUNT, once_destructor);

        let ctx = Context::new();
        let ptr = ctx.alloc(16).unwrap();
        assert!(ctx.set_destructor(ptr, once_destructor));

        assert!(ctx.free());
        assert_eq!(ONCE_COUNT.load(Ordering::SeqCst), 1);

        // Second free is a no-op, not a second destructor call.
        assert!(!ctx.free());
        assert_eq!(ONCE_COUNT.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_release_runs_destructor_and_detaches() {
        counting_destructor!(RELEASE_COUNT, release_destructor);

        let ctx = Context::new();
        let ptr = ctx.alloc(16).unwrap();
        ctx.set_destructor(ptr, release_destructor);

        assert!(ctx.release(ptr));
        assert_eq!(RELEASE_COUNT.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.block_count(), 0);

        // The later free must not run the destructor again.
        ctx.free();
        assert_eq!(RELEASE_COUNT.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_release_unknown_pointer() {
        let ctx = Context::new();
        let other = Context::new();
        let ptr = other.alloc(16).unwrap();

        assert!(!ctx.release(ptr));

        other.free();
        ctx.free();
    }

    #[test]
    fn test_free_cascades_deepest_first() {
        DROP_ORDER.lock().unwrap().clear();

        let parent = Context::new();
        let child = parent.child();

        let parent_block = parent.alloc(16).unwrap();
        let child_block = child.alloc(16).unwrap();

        unsafe {
            *parent_block.as_ptr() = 1;
            *child_block.as_ptr() = 2;
        }
        parent.set_destructor(parent_block, ordered_destructor);
        child.set_destructor(child_block, ordered_destructor);

        assert!(parent.free());
        assert!(child.is_freed());

        // Child destructors run before the parent's own.
        assert_eq!(*DROP_ORDER.lock().unwrap(), vec![2, 1]);
    }

    #[test]
    fn test_freed_child_skipped_by_parent_free() {
        counting_destructor!(SKIPPED_COUNT, skipped_destructor);

        let parent = Context::new();
        let child = parent.child();

        let ptr = child.alloc(16).unwrap();
        child.set_destructor(ptr, skipped_destructor);

        assert!(child.free());
        assert_eq!(SKIPPED_COUNT.load(Ordering::SeqCst), 1);

        assert!(parent.free());
        assert_eq!(SKIPPED_COUNT.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_alloc_after_free_fails() {
        let ctx = Context::new();
        ctx.free();
        assert!(ctx.alloc(16).is_none());
    }

    #[test]
    fn test_global_refuses_free() {
        let global = Context::global();
        assert!(!global.free());
        assert!(!global.is_freed());
    }

    #[test]
    fn test_handle_identity() {
        let a = Context::new();
        let b = a.clone();
        let c = Context::new();

        assert_eq!(a, b);
        assert_ne!(a, c);

        a.free();
        c.free();
    }
}
