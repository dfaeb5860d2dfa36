//! isomnt Hardware Abstraction Layer (HAL).
//!
//! Everything that touches the kernel lives here: the loop-control ioctls,
//! `mount(2)`/`umount(2)`, `statfs(2)` and the `/proc/mounts` parser.

mod error;
pub mod hal;
pub mod procfs {
    pub mod mounts;
}

pub use error::{HalError, HalResult};
pub use hal::*;
pub use procfs::mounts::{MatchPolicy, MountRecord, MountTable};
