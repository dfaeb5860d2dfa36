//! HAL trait definitions and implementations.
//!
//! This module defines the core traits for kernel operations and provides
//! both real (LinuxHal) and fake (FakeHal) implementations.

pub mod fake_hal;
pub mod guards;
pub mod host_info_ops;
pub mod linux_hal;
pub mod loop_ctl;
pub mod loop_ops;
pub mod mount_ops;
pub mod probe_ops;

pub use fake_hal::{FakeHal, Operation, EXT4_MAGIC};
pub use guards::LoopGuard;
pub use host_info_ops::HostInfoOps;
pub use linux_hal::LinuxHal;
pub use loop_ctl::LoopDevice;
pub use loop_ops::LoopOps;
pub use mount_ops::{MountOps, MountOptions, ISO9660_FSTYPE};
pub use probe_ops::{ProbeOps, ISO9660_MAGIC};

/// Complete HAL combining every kernel interface the ISO mounter touches.
pub trait IsoHal: MountOps + LoopOps + ProbeOps + HostInfoOps {}

/// Automatically implement IsoHal for any type implementing all required traits.
impl<T> IsoHal for T where T: MountOps + LoopOps + ProbeOps + HostInfoOps + ?Sized {}
