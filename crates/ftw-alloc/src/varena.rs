//! Arena allocator for flexibly-sized structs.
//!
//! A [`VArena`] serves one struct layout — a fixed header followed by a
//! trailing array whose length is chosen per allocation — by keeping a bank
//! of [`Arena`]s, one per power-of-two size class. Describe the layout with
//! `align_of`, `size_of`, `offset_of!`, and the element size:
//!
//! ```
//! use std::mem::{align_of, offset_of, size_of};
//! use ftw_alloc::VArena;
//!
//! #[repr(C)]
//! struct DirEntry {
//!     depth: u32,
//!     name_len: u32,
//!     name: [u8; 0], // trailing array, length chosen per allocation
//! }
//!
//! let mut names = VArena::new(
//!     align_of::<DirEntry>(),
//!     size_of::<DirEntry>(),
//!     offset_of!(DirEntry, name),
//!     size_of::<u8>(),
//! );
//! let ent = names.alloc(16).unwrap();
//! // ... use ent as a DirEntry with 16 name bytes ...
//! unsafe { names.free(ent, 16) };
//! ```

#![allow(unsafe_code)]

use std::ptr::NonNull;

use smallvec::SmallVec;

use crate::arena::Arena;
use crate::size::{ceil_log2, flex_size};

/// An arena allocator for flexibly-sized structs.
///
/// Like [`Arena`], a `VArena` is `Send` but deliberately not `Sync`.
pub struct VArena {
    /// Struct alignment.
    align: usize,
    /// Minimum struct size (the header with an empty trailing array).
    min: usize,
    /// Byte offset of the trailing array.
    offset: usize,
    /// Size of one trailing-array element.
    elem_size: usize,
    /// log2 of the class-0 chunk size; class `k` chunks are
    /// `1 << (shift + k)` bytes.
    shift: u32,
    /// One fixed arena per size class, created on demand.
    arenas: SmallVec<[Arena; 4]>,
}

impl VArena {
    /// Create a varena for a struct with the given layout.
    ///
    /// The parameters mirror `align_of::<T>()`, `size_of::<T>()`,
    /// `offset_of!(T, member)`, and the trailing element size.
    ///
    /// # Panics
    ///
    /// Panics if `align` is not a power of two or `elem_size` is zero.
    pub fn new(align: usize, min: usize, offset: usize, elem_size: usize) -> Self {
        assert!(
            align.is_power_of_two(),
            "varena alignment must be a power of two, got {align}"
        );
        assert!(elem_size > 0, "varena element size must be non-zero");

        // The smallest class must already hold the empty struct.
        let class0 = flex_size(align, min, offset, elem_size, 0).max(1);
        Self {
            align,
            min,
            offset,
            elem_size,
            shift: ceil_log2(class0),
            arenas: SmallVec::new(),
        }
    }

    /// The allocation size for `count` trailing elements.
    pub fn object_size(&self, count: usize) -> usize {
        flex_size(self.align, self.min, self.offset, self.elem_size, count)
    }

    /// Number of size classes instantiated so far.
    pub fn class_count(&self) -> usize {
        self.arenas.len()
    }

    /// Total bytes held across all class arenas.
    pub fn memory_bytes(&self) -> usize {
        self.arenas.iter().map(Arena::memory_bytes).sum()
    }

    /// The size class holding objects with `count` trailing elements.
    ///
    /// This single function is the classification used by `alloc`,
    /// `realloc`, and `free` alike: identical inputs always map to the
    /// same class. `None` means the object is unrepresentable (saturated
    /// size) and allocation must fail.
    fn size_class(&self, count: usize) -> Option<u32> {
        let bytes = self.object_size(count).max(1);
        let class = ceil_log2(bytes).max(self.shift) - self.shift;
        // The class chunk size must be representable.
        1usize.checked_shl(self.shift + class)?;
        Some(class)
    }

    /// Get or create the arena for the given size class.
    fn class_arena(&mut self, class: u32) -> &mut Arena {
        let idx = class as usize;
        while self.arenas.len() <= idx {
            let chunk = 1usize << (self.shift + self.arenas.len() as u32);
            self.arenas.push(Arena::new(self.align, chunk));
        }
        &mut self.arenas[idx]
    }

    /// Allocate a struct with room for `count` trailing elements.
    ///
    /// The memory is uninitialized. Returns `None` on allocation failure
    /// or when the requested size saturates.
    pub fn alloc(&mut self, count: usize) -> Option<NonNull<u8>> {
        let class = self.size_class(count)?;
        self.class_arena(class).alloc()
    }

    /// Resize a struct from `old_count` to `new_count` trailing elements.
    ///
    /// When both counts fall in the same size class this is a no-op that
    /// returns `ptr` unchanged. Otherwise the object moves: the header and
    /// the surviving elements are copied into a fresh chunk and the
    /// original is freed. On failure the original allocation stays valid
    /// and `None` is returned.
    ///
    /// # Safety
    ///
    /// `ptr` must be live, allocated by this varena with exactly
    /// `old_count` elements.
    pub unsafe fn realloc(
        &mut self,
        ptr: NonNull<u8>,
        old_count: usize,
        new_count: usize,
    ) -> Option<NonNull<u8>> {
        let old_class = self
            .size_class(old_count)
            .expect("live object has a valid size class");
        if self.size_class(new_count) == Some(old_class) {
            return Some(ptr);
        }

        let new_ptr = self.alloc(new_count)?;
        // Header plus the elements that survive the resize.
        let keep = self.offset + self.elem_size * old_count.min(new_count);
        // SAFETY: both objects are live and at least `keep` bytes (their
        // flex sizes cover offset + count elements); distinct size classes
        // mean distinct chunks, so the ranges cannot overlap.
        unsafe {
            std::ptr::copy_nonoverlapping(ptr.as_ptr(), new_ptr.as_ptr(), keep);
            self.free(ptr, old_count);
        }
        Some(new_ptr)
    }

    /// Free a struct allocated with `count` trailing elements.
    ///
    /// # Safety
    ///
    /// `ptr` must be live, allocated by this varena, and `count` must
    /// equal the count passed to [`alloc`](Self::alloc) (or the last
    /// successful [`realloc`](Self::realloc)). A mismatched `count` files
    /// the chunk under the wrong size class.
    pub unsafe fn free(&mut self, ptr: NonNull<u8>, count: usize) {
        let class = self
            .size_class(count)
            .expect("live object has a valid size class");
        debug_assert!((class as usize) < self.arenas.len(), "free before any alloc");
        // SAFETY: per contract, ptr came from this class's arena.
        unsafe { self.arenas[class as usize].free(ptr) };
    }
}
