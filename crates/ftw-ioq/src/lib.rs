//! Asynchronous I/O queues for the ftw traversal substrate.
//!
//! An [`Ioq`] off-loads blocking filesystem operations — directory opens
//! and closes, descriptor closes — from the traversal thread onto a pool
//! of background workers, returning completions through a bounded ring.
//! The traversal thread matches completions to its own records via an
//! opaque cookie.
//!
//! One thread at a time holds the driver role (the `&mut self` API
//! surface); worker threads live behind the queue and never outlive it.
//! The queue never logs and never panics on expected failures: submission
//! rejections come back as [`QueueFull`] with the operation inside, and
//! per-operation errors ride inside the completion entry as `errno`
//! values.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod dir;
pub mod entry;
pub mod error;
pub mod queue;
pub mod ring;

pub use dir::Dir;
pub use entry::{IoqEnt, IoqOp, IoqOpKind};
pub use error::QueueFull;
pub use queue::Ioq;
pub use ring::Ring;

/// Errno values reported in completions, re-exported from `nix`.
pub use nix::errno::Errno;
