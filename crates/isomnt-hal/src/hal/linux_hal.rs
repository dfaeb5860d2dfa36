//! Linux HAL implementation using real system calls.

use super::{loop_ctl, HostInfoOps, LoopOps, MountOps, MountOptions, ProbeOps};
use crate::procfs::mounts::PROC_MOUNTS;
use crate::{HalError, HalResult, LoopDevice};
use std::fs;
use std::path::{Path, PathBuf};

/// Real HAL implementation for Linux systems.
#[derive(Debug, Clone)]
pub struct LinuxHal {
    mounts_path: PathBuf,
    loop_control: PathBuf,
    dev_dir: PathBuf,
}

impl Default for LinuxHal {
    fn default() -> Self {
        Self::new()
    }
}

impl LinuxHal {
    pub fn new() -> Self {
        Self::with_paths(PROC_MOUNTS, loop_ctl::LOOP_CONTROL, loop_ctl::DEV_DIR)
    }

    /// Point the HAL at alternative kernel interfaces (mount table, loop-control node,
    /// directory holding `loopN` nodes).
    pub fn with_paths(
        mounts_path: impl Into<PathBuf>,
        loop_control: impl Into<PathBuf>,
        dev_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            mounts_path: mounts_path.into(),
            loop_control: loop_control.into(),
            dev_dir: dev_dir.into(),
        }
    }

}

impl MountOps for LinuxHal {
    fn mount_device(
        &self,
        device: &Path,
        target: &Path,
        fstype: &str,
        options: &MountOptions,
    ) -> HalResult<()> {
        log::debug!(
            "mount {} -> {} (type: {}, flags: {:?})",
            device.display(),
            target.display(),
            fstype,
            options.flags()
        );

        nix::mount::mount(
            Some(device),
            target,
            Some(fstype),
            options.flags(),
            options.data.as_deref(),
        )
        .map_err(|errno| HalError::Mount {
            device: device.to_path_buf(),
            target: target.to_path_buf(),
            errno,
        })
    }

    fn unmount(&self, target: &Path) -> HalResult<()> {
        log::debug!("umount {}", target.display());

        nix::mount::umount(target).map_err(|errno| HalError::Unmount {
            target: target.to_path_buf(),
            errno,
        })
    }
}

impl LoopOps for LinuxHal {
    fn loop_attach(&self, image: &Path) -> HalResult<LoopDevice> {
        loop_ctl::bind(&self.loop_control, &self.dev_dir, image)
    }

    fn loop_detach(&self, loop_device: &Path) -> HalResult<()> {
        loop_ctl::detach(loop_device)
    }
}

impl ProbeOps for LinuxHal {
    fn filesystem_magic(&self, path: &Path) -> HalResult<i64> {
        let stat = nix::sys::statfs::statfs(path).map_err(|errno| HalError::Statfs {
            path: path.to_path_buf(),
            errno,
        })?;
        Ok(stat.filesystem_type().0 as i64)
    }
}

impl HostInfoOps for LinuxHal {
    fn proc_mounts(&self) -> HalResult<Vec<u8>> {
        fs::read(&self.mounts_path).map_err(|err| HalError::MountTable {
            path: self.mounts_path.clone(),
            err,
        })
    }

    fn effective_uid(&self) -> u32 {
        nix::unistd::geteuid().as_raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MatchPolicy, MountTable, ISO9660_FSTYPE, ISO9660_MAGIC};
    use tempfile::tempdir;

    fn hal_in(dir: &Path) -> LinuxHal {
        LinuxHal::with_paths(
            dir.join("mounts"),
            dir.join("loop-control"),
            dir.to_path_buf(),
        )
    }

    #[test]
    fn proc_mounts_reads_configured_table() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("mounts"), "/dev/loop0 /mnt/iso iso9660 ro 0 0\n").unwrap();

        let hal = hal_in(dir.path());
        assert_eq!(
            hal.proc_mounts().unwrap(),
            b"/dev/loop0 /mnt/iso iso9660 ro 0 0\n".to_vec()
        );
    }

    #[test]
    fn proc_mounts_keeps_non_utf8_lines() {
        let dir = tempdir().unwrap();
        let table: &[u8] = b"/dev/sdb1 /media/caf\xe9 vfat rw 0 0\n/dev/loop0 /mnt/iso iso9660 ro 0 0\n";
        std::fs::write(dir.path().join("mounts"), table).unwrap();

        let raw = hal_in(dir.path()).proc_mounts().unwrap();
        let mounts = MountTable::parse(&raw);
        assert_eq!(mounts.records().len(), 2);
        assert!(mounts.is_mountpoint(Path::new("/mnt/iso"), MatchPolicy::Exact));
    }

    #[test]
    fn proc_mounts_missing_table_is_an_error() {
        let dir = tempdir().unwrap();
        let err = hal_in(dir.path()).proc_mounts().unwrap_err();
        assert!(matches!(err, HalError::MountTable { .. }));
    }

    #[test]
    fn default_hal_reads_the_kernel_table() {
        let raw = LinuxHal::new().proc_mounts().unwrap();
        assert!(MountTable::parse(&raw).is_mountpoint(Path::new("/"), MatchPolicy::Exact));
    }

    #[test]
    fn filesystem_magic_of_tempdir_is_not_iso9660() {
        let dir = tempdir().unwrap();
        let magic = LinuxHal::new().filesystem_magic(dir.path()).unwrap();
        assert_ne!(magic, ISO9660_MAGIC);
    }

    #[test]
    fn filesystem_magic_of_missing_path_fails() {
        let dir = tempdir().unwrap();
        let err = LinuxHal::new()
            .filesystem_magic(&dir.path().join("nope"))
            .unwrap_err();
        assert!(matches!(err, HalError::Statfs { .. }));
    }

    #[test]
    fn unmount_of_plain_directory_fails() {
        let dir = tempdir().unwrap();
        let err = LinuxHal::new().unmount(dir.path()).unwrap_err();
        assert!(matches!(err, HalError::Unmount { .. }));
    }

    #[test]
    fn mount_of_missing_device_fails() {
        let dir = tempdir().unwrap();
        let err = LinuxHal::new()
            .mount_device(
                &dir.path().join("loop99"),
                dir.path(),
                ISO9660_FSTYPE,
                &MountOptions::read_only(),
            )
            .unwrap_err();
        assert!(matches!(err, HalError::Mount { .. }));
    }

    #[test]
    fn loop_attach_without_loop_control_fails() {
        let dir = tempdir().unwrap();
        let image = dir.path().join("disc.iso");
        std::fs::write(&image, b"").unwrap();

        let err = hal_in(dir.path()).loop_attach(&image).unwrap_err();
        assert!(matches!(err, HalError::Open { .. }));
    }

    #[test]
    fn effective_uid_matches_process_credentials() {
        assert_eq!(
            LinuxHal::new().effective_uid(),
            nix::unistd::geteuid().as_raw()
        );
    }
}
