use nix::errno::Errno;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type HalResult<T> = std::result::Result<T, HalError>;

/// Kernel-facing failures. The OS error text is part of each message, so
/// callers can print the error as-is.
#[derive(Error, Debug)]
pub enum HalError {
    #[error("failed to read mount table {}: {err}", path.display())]
    MountTable { path: PathBuf, err: io::Error },

    #[error("opening {what} {} failed: {err}", path.display())]
    Open {
        what: &'static str,
        path: PathBuf,
        err: io::Error,
    },

    #[error("ioctl {request} on {} failed: {errno}", path.display())]
    Ioctl {
        request: &'static str,
        path: PathBuf,
        errno: Errno,
    },

    #[error("mount {} -> {} failed: {errno}", device.display(), target.display())]
    Mount {
        device: PathBuf,
        target: PathBuf,
        errno: Errno,
    },

    #[error("umount {} failed: {errno}", target.display())]
    Unmount { target: PathBuf, errno: Errno },

    #[error("statfs {} failed: {errno}", path.display())]
    Statfs { path: PathBuf, errno: Errno },

    #[error("{0}")]
    Other(String),
}

impl HalError {
    /// The errno behind this error, when the kernel produced one.
    pub fn errno(&self) -> Option<Errno> {
        match self {
            HalError::Ioctl { errno, .. }
            | HalError::Mount { errno, .. }
            | HalError::Unmount { errno, .. }
            | HalError::Statfs { errno, .. } => Some(*errno),
            HalError::MountTable { err, .. } | HalError::Open { err, .. } => {
                err.raw_os_error().map(Errno::from_raw)
            }
            HalError::Other(_) => None,
        }
    }
}
