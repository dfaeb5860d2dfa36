//! Mount operations trait.

use crate::HalResult;
use nix::mount::MsFlags;
use std::path::Path;

/// Filesystem type string handed to `mount(2)` for optical images.
pub const ISO9660_FSTYPE: &str = "iso9660";

/// Trait for mounting and unmounting filesystems.
pub trait MountOps {
    /// Mount a device to a target path.
    ///
    /// # Arguments
    /// * `device` - Device path (e.g., `/dev/loop0`)
    /// * `target` - Mount point path
    /// * `fstype` - Filesystem type (e.g., `"iso9660"`)
    /// * `options` - Mount flags and data
    fn mount_device(
        &self,
        device: &Path,
        target: &Path,
        fstype: &str,
        options: &MountOptions,
    ) -> HalResult<()>;

    /// Unmount a filesystem.
    fn unmount(&self, target: &Path) -> HalResult<()>;
}

/// Mount options and flags.
#[derive(Debug, Clone, Default)]
pub struct MountOptions {
    pub read_only: bool,
    /// Filesystem-specific data string (e.g. "norock,nojoliet")
    pub data: Option<String>,
}

impl MountOptions {
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            data: None,
        }
    }

    pub fn flags(&self) -> MsFlags {
        if self.read_only {
            MsFlags::MS_RDONLY
        } else {
            MsFlags::empty()
        }
    }
}
