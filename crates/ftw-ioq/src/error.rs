//! Error types for queue submission.

use std::error::Error;
use std::fmt;

use crate::entry::IoqOp;

/// A submission was rejected because every entry slot is in use.
///
/// The rejected operation rides inside, so the caller recovers whatever
/// resources it carried (an fd to close, a directory handle). The
/// condition is transient: popping and freeing a completion opens a slot.
#[derive(Debug)]
pub struct QueueFull(
    /// The rejected operation, handed back untouched.
    pub IoqOp,
);

impl fmt::Display for QueueFull {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "I/O queue full: all entry slots are outstanding")
    }
}

impl Error for QueueFull {}
