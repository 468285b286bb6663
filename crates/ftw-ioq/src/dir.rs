//! Directory handles the queue opens and closes on behalf of the driver.
//!
//! A [`Dir`] is allocated by the caller and opened later by a worker, so
//! the open syscall happens off the traversal thread. Iteration over the
//! opened directory belongs to the traversal layer, not this crate; all
//! the queue needs is the open/close lifecycle and the raw descriptor.

use std::ffi::CStr;
use std::os::fd::RawFd;

use nix::errno::Errno;
use nix::fcntl::{open, openat, OFlag};
use nix::sys::stat::Mode;
use nix::unistd::close;

/// An allocated, possibly unopened directory.
#[derive(Debug)]
pub struct Dir {
    fd: Option<RawFd>,
}

impl Dir {
    /// Allocate an unopened directory.
    pub fn new() -> Self {
        Self { fd: None }
    }

    /// Open the directory at `path`, relative to `dfd` (`None` means the
    /// current working directory).
    ///
    /// Fails with `EBUSY` if this handle is already open.
    pub fn open_at(&mut self, dfd: Option<RawFd>, path: &CStr) -> Result<(), Errno> {
        if self.fd.is_some() {
            return Err(Errno::EBUSY);
        }
        let flags = OFlag::O_RDONLY | OFlag::O_CLOEXEC | OFlag::O_DIRECTORY;
        let fd = match dfd {
            Some(dfd) => openat(dfd, path, flags, Mode::empty())?,
            None => open(path, flags, Mode::empty())?,
        };
        self.fd = Some(fd);
        Ok(())
    }

    /// Close the directory. Closing an unopened handle is a no-op.
    pub fn close(&mut self) -> Result<(), Errno> {
        match self.fd.take() {
            Some(fd) => close(fd),
            None => Ok(()),
        }
    }

    /// Whether the handle currently holds an open descriptor.
    pub fn is_open(&self) -> bool {
        self.fd.is_some()
    }

    /// The underlying descriptor, if open.
    pub fn as_raw_fd(&self) -> Option<RawFd> {
        self.fd
    }
}

impl Default for Dir {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Dir {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    #[test]
    fn open_close_round_trip() {
        let mut dir = Dir::new();
        assert!(!dir.is_open());

        let path = CString::new("/tmp").unwrap();
        dir.open_at(None, &path).unwrap();
        assert!(dir.is_open());
        assert!(dir.as_raw_fd().is_some());

        dir.close().unwrap();
        assert!(!dir.is_open());
        // Closing again is a no-op.
        dir.close().unwrap();
    }

    #[test]
    fn open_missing_path_reports_enoent() {
        let mut dir = Dir::new();
        let path = CString::new("/nonexistent-ftw-test-dir").unwrap();
        assert_eq!(dir.open_at(None, &path), Err(Errno::ENOENT));
        assert!(!dir.is_open());
    }

    #[test]
    fn open_non_directory_reports_enotdir() {
        let mut dir = Dir::new();
        let path = CString::new("/dev/null").unwrap();
        assert_eq!(dir.open_at(None, &path), Err(Errno::ENOTDIR));
    }

    #[test]
    fn double_open_reports_ebusy() {
        let mut dir = Dir::new();
        let path = CString::new("/tmp").unwrap();
        dir.open_at(None, &path).unwrap();
        assert_eq!(dir.open_at(None, &path), Err(Errno::EBUSY));
        assert!(dir.is_open());
    }

    #[test]
    fn open_relative_to_dirfd() {
        let mut base = Dir::new();
        base.open_at(None, &CString::new("/").unwrap()).unwrap();

        let mut sub = Dir::new();
        sub.open_at(base.as_raw_fd(), &CString::new("tmp").unwrap())
            .unwrap();
        assert!(sub.is_open());
    }
}
