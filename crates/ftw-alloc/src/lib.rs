//! Arena allocation for the ftw traversal substrate.
//!
//! Provides saturating size arithmetic, aligned raw allocation, and two
//! arena allocators: [`Arena`] for fixed-size chunks and [`VArena`] for
//! structs with a trailing variable-length array. This crate is the only
//! one in the workspace that may contain `unsafe` code; every unsafe block
//! carries a `SAFETY:` comment.
//!
//! Allocation failure is reported as `None`, never by panic; size
//! computations that would overflow saturate to a sentinel that downstream
//! allocation deterministically rejects.
//!
//! Arenas are intentionally not thread safe.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod arena;
pub mod raw;
pub mod size;
pub mod varena;

pub use arena::Arena;
pub use size::{align_ceil, align_floor, array_size, array_size_of, flex_size};
pub use varena::VArena;

// Compile-time assertion: arenas move between threads but are never shared.
const _: fn() = || {
    fn assert_send<T: Send>() {}
    assert_send::<Arena>();
    assert_send::<VArena>();
};
