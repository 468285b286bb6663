//! Slab-backed arena for fixed-size chunks.
//!
//! An [`Arena`] hands out uniformly sized, uniformly aligned chunks and
//! recycles them through an intrusive free list. Slabs are never returned
//! to the OS individually; all memory is released when the arena is
//! dropped.

#![allow(unsafe_code)]

use std::mem;
use std::ptr::NonNull;

use smallvec::SmallVec;

use crate::raw;
use crate::size::align_ceil;

/// Target byte size for the first slab of an arena.
const FIRST_SLAB_BYTES: usize = 4096;

/// One contiguous allocation holding many chunks.
struct Slab {
    ptr: NonNull<u8>,
    bytes: usize,
}

/// An arena allocator for fixed-size chunks.
///
/// All chunks share one `(align, size)` pair, fixed at construction.
/// `alloc` pops the free list, growing by a fresh slab when empty; `free`
/// pushes a chunk back. Freed chunks are reused in LIFO order.
///
/// Arenas are intentionally not thread safe: they are `Send` but not
/// `Sync`, and callers must not share one between threads.
pub struct Arena {
    /// Head of the intrusive free list. `None` when every chunk is live.
    free: Option<NonNull<u8>>,
    /// Slabs in allocation order; slab `i` holds twice as many chunks as
    /// slab `i - 1`.
    slabs: SmallVec<[Slab; 4]>,
    /// Chunk alignment.
    align: usize,
    /// Chunk size.
    size: usize,
}

// SAFETY: an Arena exclusively owns every slab it points into; moving it
// to another thread moves that ownership wholesale. The raw pointers are
// never shared, so Send is sound (Sync is deliberately not implemented).
unsafe impl Send for Arena {}

impl Arena {
    /// Create an arena for chunks of the given alignment and size.
    ///
    /// `align` is raised to the alignment of a machine word and `size` to
    /// the size of one, then rounded up to a multiple of `align`: a free
    /// chunk's first word stores the free-list link.
    ///
    /// # Panics
    ///
    /// Panics if `align` is not a power of two.
    pub fn new(align: usize, size: usize) -> Self {
        assert!(
            align.is_power_of_two(),
            "arena alignment must be a power of two, got {align}"
        );
        let align = align.max(mem::align_of::<usize>());
        let size = align_ceil(align, size.max(mem::size_of::<usize>()));
        Self {
            free: None,
            slabs: SmallVec::new(),
            align,
            size,
        }
    }

    /// Create an arena sized for values of type `T`.
    pub fn of<T>() -> Self {
        Self::new(mem::align_of::<T>(), mem::size_of::<T>())
    }

    /// The chunk alignment, after the word-size adjustment in [`new`](Self::new).
    pub fn chunk_align(&self) -> usize {
        self.align
    }

    /// The chunk size, after the word-size adjustment in [`new`](Self::new).
    pub fn chunk_size(&self) -> usize {
        self.size
    }

    /// Number of slabs currently allocated.
    pub fn slab_count(&self) -> usize {
        self.slabs.len()
    }

    /// Total bytes held across all slabs.
    pub fn memory_bytes(&self) -> usize {
        self.slabs.iter().map(|s| s.bytes).sum()
    }

    /// Decode a free chunk's link to the next free chunk.
    ///
    /// # Safety
    ///
    /// `chunk` must be a free chunk of this arena whose first word holds an
    /// encoded link.
    unsafe fn chunk_next(&self, chunk: NonNull<u8>) -> Option<NonNull<u8>> {
        let base = (chunk.as_ptr() as usize).wrapping_add(self.size);
        // SAFETY: free chunks are word-aligned and at least word-sized.
        let rel = unsafe { chunk.as_ptr().cast::<usize>().read() };
        NonNull::new(base.wrapping_add(rel) as *mut u8)
    }

    /// Encode the free-list link in a chunk's first word.
    ///
    /// The link is stored as an offset from the end of `chunk`, so a
    /// zero-filled slab already reads as a chain of consecutive chunks.
    ///
    /// # Safety
    ///
    /// `chunk` must point at a chunk of this arena that the caller owns.
    unsafe fn chunk_set_next(&self, chunk: NonNull<u8>, next: Option<NonNull<u8>>) {
        let base = (chunk.as_ptr() as usize).wrapping_add(self.size);
        let addr = next.map_or(0usize, |p| p.as_ptr() as usize);
        // SAFETY: free chunks are word-aligned and at least word-sized.
        unsafe { chunk.as_ptr().cast::<usize>().write(addr.wrapping_sub(base)) };
    }

    /// Allocate a new slab and thread its chunks onto the free list.
    fn grow(&mut self) -> Option<()> {
        let mut bytes = FIRST_SLAB_BYTES.max(self.size);
        // Trim the excess so the slab is a whole number of chunks.
        bytes -= bytes % self.size;
        // Double the size for every slab.
        if self.slabs.len() >= usize::BITS as usize {
            return None;
        }
        let bytes = bytes.checked_mul(1usize << self.slabs.len())?;

        let slab = raw::zalloc(self.align, bytes)?;

        // In a zeroed slab every chunk's offset-encoded link is zero,
        // i.e. "the chunk immediately after me" — the list comes
        // pre-threaded in ascending order. Only the last chunk needs
        // patching to continue into the existing free list.
        //
        // SAFETY: bytes >= self.size, so the last chunk is in bounds, and
        // the slab is exclusively ours.
        unsafe {
            let last = NonNull::new_unchecked(slab.as_ptr().add(bytes - self.size));
            self.chunk_set_next(last, self.free);
        }

        self.free = Some(slab);
        self.slabs.push(Slab { ptr: slab, bytes });
        Some(())
    }

    /// Allocate one chunk.
    ///
    /// The memory is uninitialized (recycled chunks retain the previous
    /// owner's bytes beyond the first word). Returns `None` when a new
    /// slab cannot be allocated.
    pub fn alloc(&mut self) -> Option<NonNull<u8>> {
        let chunk = match self.free {
            Some(chunk) => chunk,
            None => {
                self.grow()?;
                self.free.expect("a fresh slab populates the free list")
            }
        };
        // SAFETY: chunk is the free-list head, owned by this arena.
        self.free = unsafe { self.chunk_next(chunk) };
        Some(chunk)
    }

    /// Return a chunk to the arena.
    ///
    /// The chunk is recycled by later `alloc` calls; memory is only
    /// released to the OS when the arena is dropped.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this arena's [`alloc`](Self::alloc)
    /// and must not already be free.
    pub unsafe fn free(&mut self, ptr: NonNull<u8>) {
        // SAFETY: per contract, ptr is a live chunk of this arena; writing
        // the link touches only its first word.
        unsafe { self.chunk_set_next(ptr, self.free) };
        self.free = Some(ptr);
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        for slab in self.slabs.drain(..) {
            // SAFETY: each slab was allocated by raw::zalloc with exactly
            // this alignment and byte count, and is not referenced after
            // the arena is gone.
            unsafe { raw::dealloc(slab.ptr, self.align, slab.bytes) };
        }
    }
}
