//! Queue entries: one per outstanding operation.
//!
//! An [`IoqEnt`] is created at submission, carried through the submission
//! ring to a worker, filled in with the operation's result, and returned
//! to the driver through the completion ring. Entries cannot be built
//! outside this crate, so every entry in flight was admitted against the
//! queue's depth.

use std::ffi::CString;
use std::os::fd::{OwnedFd, RawFd};

use nix::errno::Errno;

use crate::dir::Dir;

/// The kind of I/O operation an entry carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IoqOpKind {
    /// Close a file descriptor.
    Close,
    /// Open a directory.
    Opendir,
    /// Close a directory.
    Closedir,
}

/// An I/O operation and its arguments.
///
/// Resources submitted with an operation ride inside it: a cancelled or
/// failed entry still carries them, so the caller can recover (or simply
/// drop) whatever the syscall never consumed.
#[derive(Debug)]
pub enum IoqOp {
    /// `close(2)` on a descriptor the queue now owns.
    Close {
        /// The descriptor to close. The worker takes it when the
        /// operation runs; it is still present on cancelled entries.
        fd: Option<OwnedFd>,
    },
    /// Open a directory at `path` relative to `dfd`.
    Opendir {
        /// The caller-allocated directory, opened by the worker.
        dir: Dir,
        /// Base descriptor for the relative lookup (`None` = CWD). Stays
        /// caller-owned; it must remain open until the completion is
        /// popped.
        dfd: Option<RawFd>,
        /// The path to open, relative to `dfd`.
        path: CString,
    },
    /// Close an open directory.
    Closedir {
        /// The directory to close.
        dir: Dir,
    },
}

impl IoqOp {
    /// The operation's discriminant.
    pub fn kind(&self) -> IoqOpKind {
        match self {
            IoqOp::Close { .. } => IoqOpKind::Close,
            IoqOp::Opendir { .. } => IoqOpKind::Opendir,
            IoqOp::Closedir { .. } => IoqOpKind::Closedir,
        }
    }
}

/// A completed (or in-flight) queue entry.
#[derive(Debug)]
pub struct IoqEnt {
    pub(crate) op: IoqOp,
    pub(crate) result: Result<(), Errno>,
    pub(crate) cookie: u64,
}

impl IoqEnt {
    pub(crate) fn new(op: IoqOp, cookie: u64) -> Self {
        Self {
            op,
            result: Ok(()),
            cookie,
        }
    }

    /// The operation this entry carries.
    pub fn op(&self) -> &IoqOp {
        &self.op
    }

    /// The operation's discriminant.
    pub fn kind(&self) -> IoqOpKind {
        self.op.kind()
    }

    /// The operation's outcome: `Ok(())` on success, the errno on
    /// failure. Cancelled entries report [`Errno::ECANCELED`].
    pub fn result(&self) -> Result<(), Errno> {
        self.result
    }

    /// The caller's cookie, returned unchanged. Workers never touch it;
    /// it is the driver's only means of matching completions to the work
    /// that spawned them.
    pub fn cookie(&self) -> u64 {
        self.cookie
    }
}
