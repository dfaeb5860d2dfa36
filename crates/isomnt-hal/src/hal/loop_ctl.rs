//! Native loop-device plumbing (`/dev/loop-control` + `LOOP_*` ioctls).
//!
//! Every descriptor is held in a [`File`] so it is closed on every return
//! path. The kernel-side association made by `LOOP_SET_FD` outlives those
//! descriptors and is only undone by [`detach`].

use crate::{HalError, HalResult};
use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};

pub const LOOP_CONTROL: &str = "/dev/loop-control";
pub const DEV_DIR: &str = "/dev";

// <linux/loop.h>
const LOOP_SET_FD: u32 = 0x4C00;
const LOOP_CLR_FD: u32 = 0x4C01;
const LOOP_CTL_GET_FREE: u32 = 0x4C82;

mod ioctl {
    use super::{LOOP_CLR_FD, LOOP_CTL_GET_FREE, LOOP_SET_FD};

    nix::ioctl_none_bad!(loop_ctl_get_free, LOOP_CTL_GET_FREE);
    nix::ioctl_write_int_bad!(loop_set_fd, LOOP_SET_FD);
    nix::ioctl_none_bad!(loop_clr_fd, LOOP_CLR_FD);
}

/// A numbered loop device node, e.g. `/dev/loop7`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopDevice {
    pub index: u32,
    pub path: PathBuf,
}

impl LoopDevice {
    pub fn new(dev_dir: &Path, index: u32) -> Self {
        Self {
            index,
            path: dev_dir.join(format!("loop{index}")),
        }
    }

    pub fn from_index(index: u32) -> Self {
        Self::new(Path::new(DEV_DIR), index)
    }
}

/// Open handle on the loop-control interface.
#[derive(Debug)]
pub struct LoopControl {
    file: File,
    path: PathBuf,
}

impl LoopControl {
    pub fn open(path: &Path) -> HalResult<Self> {
        let file = open_rw("loop control", path)?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Ask the kernel for the lowest unused loop index. Single request, no retry.
    pub fn next_free(&self) -> HalResult<u32> {
        // SAFETY: LOOP_CTL_GET_FREE takes no argument; the descriptor is owned by `self.file`.
        let index = unsafe { ioctl::loop_ctl_get_free(self.file.as_raw_fd()) }.map_err(
            |errno| HalError::Ioctl {
                request: "LOOP_CTL_GET_FREE",
                path: self.path.clone(),
                errno,
            },
        )?;
        u32::try_from(index)
            .map_err(|_| HalError::Other(format!("kernel returned loop index {index}")))
    }
}

/// Allocate a free loop device and bind `backing` to it.
pub fn bind(control_path: &Path, dev_dir: &Path, backing: &Path) -> HalResult<LoopDevice> {
    let control = LoopControl::open(control_path)?;
    let device = LoopDevice::new(dev_dir, control.next_free()?);
    log::debug!("free loop device: {}", device.path.display());

    attach(&device.path, backing)?;
    Ok(device)
}

/// Associate `backing` with an existing loop node via `LOOP_SET_FD`.
pub fn attach(device: &Path, backing: &Path) -> HalResult<()> {
    // LOOP_SET_FD requires a writable descriptor even for read-only mounts.
    let file = open_rw("backing file", backing)?;
    let node = open_rw("loop device", device)?;

    // SAFETY: both descriptors stay open for the duration of the call.
    unsafe { ioctl::loop_set_fd(node.as_raw_fd(), file.as_raw_fd()) }.map_err(|errno| {
        HalError::Ioctl {
            request: "LOOP_SET_FD",
            path: device.to_path_buf(),
            errno,
        }
    })?;
    Ok(())
}

/// Disassociate whatever file is bound to `device` via `LOOP_CLR_FD`.
pub fn detach(device: &Path) -> HalResult<()> {
    let node = open_rw("loop device", device)?;

    // SAFETY: LOOP_CLR_FD takes no argument; `node` outlives the call.
    unsafe { ioctl::loop_clr_fd(node.as_raw_fd()) }.map_err(|errno| HalError::Ioctl {
        request: "LOOP_CLR_FD",
        path: device.to_path_buf(),
        errno,
    })?;
    Ok(())
}

fn open_rw(what: &'static str, path: &Path) -> HalResult<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|err| HalError::Open {
            what,
            path: path.to_path_buf(),
            err,
        })
}
