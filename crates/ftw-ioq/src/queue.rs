//! The asynchronous I/O queue: submission, worker pool, completion.
//!
//! An [`Ioq`] moves blocking filesystem calls off the driver thread. The
//! driver submits operations, workers execute them and publish results to
//! the completion ring, and the driver drains completions at its own pace.
//! The driver surface takes `&mut self`, so exactly one thread holds that
//! role at a time; handing the queue to another thread hands the role
//! with it.

use std::os::fd::{IntoRawFd, OwnedFd, RawFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::{ffi::CString, thread};

use nix::errno::Errno;
use nix::unistd::close;

use crate::dir::Dir;
use crate::entry::{IoqEnt, IoqOp};
use crate::error::QueueFull;
use crate::ring::Ring;

/// State shared between the driver and the worker threads.
struct Shared {
    /// Submitted, not-yet-dispatched entries.
    pending: Ring<IoqEnt>,
    /// Finished entries awaiting the driver.
    ready: Ring<IoqEnt>,
    /// Set by [`Ioq::cancel`]; once set, popped work completes as
    /// `ECANCELED` without dispatching.
    cancel: AtomicBool,
}

// Compile-time assertion: the shared state crosses thread boundaries.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<Shared>();
};

/// Run one entry's syscall and record the outcome.
fn dispatch(ent: &mut IoqEnt) {
    ent.result = match &mut ent.op {
        IoqOp::Close { fd } => match fd.take() {
            Some(fd) => close(fd.into_raw_fd()),
            // A close entry always carries its fd until dispatched.
            None => Err(Errno::EBADF),
        },
        IoqOp::Opendir { dir, dfd, path } => dir.open_at(*dfd, path),
        IoqOp::Closedir { dir } => dir.close(),
    };
}

/// Worker thread body: pop, execute, publish, until the queue stops.
fn work(shared: Arc<Shared>) {
    while let Some(mut ent) = shared.pending.pop() {
        if shared.cancel.load(Ordering::Acquire) {
            ent.result = Err(Errno::ECANCELED);
        } else {
            dispatch(&mut ent);
        }
        if shared.ready.push(ent).is_err() {
            break;
        }
    }
}

/// A queue of asynchronous I/O operations.
///
/// Dropping the queue cancels undispatched work, stops and joins every
/// worker, and releases any unclaimed completions (closing the
/// descriptors they carry).
pub struct Ioq {
    depth: usize,
    /// Entry slots not currently occupied. Decremented at submission,
    /// incremented by [`free`](Self::free).
    free_slots: usize,
    /// Entries submitted and not yet popped by the driver.
    outstanding: usize,
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl Ioq {
    /// Create a queue with `depth` entry slots served by `nthreads`
    /// background workers.
    ///
    /// `nthreads` may be zero: nothing is dispatched, but submission,
    /// cancellation, and draining still work, which makes cancellation
    /// behavior deterministic to test.
    ///
    /// # Panics
    ///
    /// Panics if `depth` is zero, or if the OS refuses to spawn a worker
    /// thread.
    pub fn new(depth: usize, nthreads: usize) -> Self {
        assert!(depth > 0, "ioq depth must be at least 1");

        let shared = Arc::new(Shared {
            pending: Ring::new(depth),
            ready: Ring::new(depth),
            cancel: AtomicBool::new(false),
        });

        let workers = (0..nthreads)
            .map(|i| {
                let shared = Arc::clone(&shared);
                thread::Builder::new()
                    .name(format!("ftw-ioq-worker-{i}"))
                    .spawn(move || work(shared))
                    .expect("failed to spawn I/O queue worker")
            })
            .collect();

        Self {
            depth,
            free_slots: depth,
            outstanding: 0,
            shared,
            workers,
        }
    }

    /// The configured depth: the bound on concurrently outstanding
    /// entries.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The number of worker threads.
    pub fn nthreads(&self) -> usize {
        self.workers.len()
    }

    /// The number of free entry slots. Never exceeds
    /// [`depth`](Self::depth).
    pub fn capacity(&self) -> usize {
        self.free_slots
    }

    fn submit(&mut self, op: IoqOp, cookie: u64) -> Result<(), QueueFull> {
        if self.free_slots == 0 {
            return Err(QueueFull(op));
        }
        match self.shared.pending.try_push(IoqEnt::new(op, cookie)) {
            Ok(()) => {
                self.free_slots -= 1;
                self.outstanding += 1;
                Ok(())
            }
            // The ring holds `depth` entries and `free_slots > 0` implies
            // fewer than that are queued, so this arm is only reachable
            // through a stopped ring mid-drop.
            Err(ent) => Err(QueueFull(ent.op)),
        }
    }

    /// Asynchronously `close(2)` a descriptor.
    ///
    /// The queue owns `fd` from the moment submission succeeds; `cookie`
    /// comes back unchanged on the completion.
    pub fn close(&mut self, fd: OwnedFd, cookie: u64) -> Result<(), QueueFull> {
        self.submit(IoqOp::Close { fd: Some(fd) }, cookie)
    }

    /// Asynchronously open the directory at `path`, relative to `dfd`
    /// (`None` = CWD), into the caller-allocated `dir`.
    ///
    /// `dfd` must remain open until the completion is popped.
    pub fn opendir(
        &mut self,
        dir: Dir,
        dfd: Option<RawFd>,
        path: CString,
        cookie: u64,
    ) -> Result<(), QueueFull> {
        self.submit(IoqOp::Opendir { dir, dfd, path }, cookie)
    }

    /// Asynchronously close a directory.
    pub fn closedir(&mut self, dir: Dir, cookie: u64) -> Result<(), QueueFull> {
        self.submit(IoqOp::Closedir { dir }, cookie)
    }

    /// Pop a completion, blocking until one is available.
    ///
    /// Returns `None` immediately when nothing is outstanding, so a
    /// drained queue never parks its driver.
    pub fn pop(&mut self) -> Option<IoqEnt> {
        if self.outstanding == 0 {
            return None;
        }
        let ent = self.shared.ready.pop()?;
        self.outstanding -= 1;
        Some(ent)
    }

    /// Pop a completion without blocking.
    pub fn try_pop(&mut self) -> Option<IoqEnt> {
        if self.outstanding == 0 {
            return None;
        }
        let ent = self.shared.ready.try_pop()?;
        self.outstanding -= 1;
        Some(ent)
    }

    /// Release a popped entry's slot, handing back its operation (and any
    /// resources a cancelled or failed operation still carries).
    pub fn free(&mut self, ent: IoqEnt) -> IoqOp {
        debug_assert!(self.free_slots < self.depth, "more frees than submissions");
        self.free_slots += 1;
        ent.op
    }

    /// Cancel all not-yet-dispatched work.
    ///
    /// Queued submissions move to the completion ring with `ECANCELED`;
    /// operations a worker has already picked up complete normally.
    /// Idempotent, and not terminal: the submit/pop/free cycle keeps
    /// working, though later submissions also surface as cancelled.
    pub fn cancel(&mut self) {
        self.shared.cancel.store(true, Ordering::Release);
        for mut ent in self.shared.pending.drain() {
            ent.result = Err(Errno::ECANCELED);
            // Completion capacity equals depth, so cancelled entries
            // always fit.
            let _ = self.shared.ready.push(ent);
        }
    }
}

impl Drop for Ioq {
    fn drop(&mut self) {
        self.cancel();
        self.shared.pending.stop();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        // Unclaimed completions are dropped with the rings; their owned
        // descriptors close themselves.
    }
}
