//! Shared profiles for the ftw substrate benchmarks.
//!
//! The benchmarks model the allocation behavior of a breadth-first
//! traversal: directory records are flexible structs keyed by name
//! length, allocated in bursts and reclaimed as subtrees complete.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use ftw_alloc::VArena;

/// A directory-record layout typical of the traversal: a 32-byte header
/// followed by the entry name.
pub const RECORD_ALIGN: usize = 8;
/// Header size of the modeled record.
pub const RECORD_MIN: usize = 32;
/// Offset of the trailing name bytes.
pub const RECORD_NAME_OFFSET: usize = 32;

/// A varena shaped like the traversal's directory-record pool.
pub fn record_varena() -> VArena {
    VArena::new(RECORD_ALIGN, RECORD_MIN, RECORD_NAME_OFFSET, 1)
}

/// Name lengths drawn from a plausible directory mix: mostly short, a
/// long tail.
pub fn name_lengths() -> Vec<usize> {
    (0..1024)
        .map(|i| match i % 16 {
            0 => 200 + i % 55,
            1..=3 => 40 + i % 24,
            _ => 8 + i % 12,
        })
        .collect()
}
