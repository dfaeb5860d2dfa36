//! Fake HAL implementation for testing.
//!
//! This implementation records all operations without executing them and keeps
//! an in-memory model of the kernel's loop table and mount table, allowing for
//! CI-safe testing without root privileges or real loop devices.

use super::{HostInfoOps, LoopOps, MountOps, MountOptions, ProbeOps};
use crate::procfs::mounts::{MountRecord, MountTable};
use crate::{HalError, HalResult, LoopDevice, ISO9660_FSTYPE, ISO9660_MAGIC};
use nix::errno::Errno;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// `statfs(2)` magic reported for anything that is not an image mount.
pub const EXT4_MAGIC: i64 = 0xEF53;

/// Operation records for testing and verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Mount {
        device: PathBuf,
        target: PathBuf,
        fstype: String,
        read_only: bool,
    },
    Unmount {
        target: PathBuf,
    },
    LoopAttach {
        image: PathBuf,
        loop_device: PathBuf,
    },
    LoopDetach {
        loop_device: PathBuf,
    },
}

/// Shared state for FakeHal operations.
#[derive(Debug, Clone, Default)]
struct FakeHalState {
    /// All operations that were recorded
    operations: Vec<Operation>,
    /// Mount table, in mount order
    mounts: Vec<MountRecord>,
    /// Filesystem magic per mount point
    fs_magic: HashMap<PathBuf, i64>,
    /// Attached loop devices: index -> backing file
    loops: BTreeMap<u32, PathBuf>,
    euid: u32,
    mount_error: Option<Errno>,
    detach_error: Option<Errno>,
    statfs_error: Option<Errno>,
    /// Tables served by upcoming `proc_mounts` reads instead of `mounts`
    table_overrides: VecDeque<Vec<u8>>,
}

/// Fake HAL implementation that records operations without executing them.
///
/// This is designed for testing and CI environments where real system
/// operations would fail or be dangerous.
#[derive(Debug, Clone, Default)]
pub struct FakeHal {
    state: Arc<Mutex<FakeHalState>>,
}

impl FakeHal {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeHalState::default())),
        }
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<Operation> {
        self.state.lock().unwrap().operations.clone()
    }

    /// Get the number of operations recorded.
    pub fn operation_count(&self) -> usize {
        self.state.lock().unwrap().operations.len()
    }

    /// Check if a specific operation was recorded.
    pub fn has_operation(&self, check: impl Fn(&Operation) -> bool) -> bool {
        self.state.lock().unwrap().operations.iter().any(check)
    }

    /// Clear recorded operations. Kernel-side state is kept.
    pub fn clear(&self) {
        self.state.lock().unwrap().operations.clear();
    }

    pub fn set_effective_uid(&self, uid: u32) {
        self.state.lock().unwrap().euid = uid;
    }

    /// Seed the mount table with an existing mount (e.g. an ext4 bind mount).
    pub fn add_mount(&self, record: MountRecord, magic: i64) {
        let mut state = self.state.lock().unwrap();
        state.fs_magic.insert(record.mount_point.clone(), magic);
        state.mounts.push(record);
    }

    /// Make the next `mount_device` call fail with `errno`.
    pub fn fail_next_mount(&self, errno: Errno) {
        self.state.lock().unwrap().mount_error = Some(errno);
    }

    /// Make the next `loop_detach` call fail with `errno`.
    pub fn fail_next_detach(&self, errno: Errno) {
        self.state.lock().unwrap().detach_error = Some(errno);
    }

    /// Make the next `filesystem_magic` call fail with `errno`.
    pub fn fail_next_statfs(&self, errno: Errno) {
        self.state.lock().unwrap().statfs_error = Some(errno);
    }

    /// Serve `content` for one upcoming `proc_mounts` read. Queued tables are
    /// consumed in order before the simulated table is rendered again.
    pub fn override_next_mount_table(&self, content: impl Into<Vec<u8>>) {
        self.state
            .lock()
            .unwrap()
            .table_overrides
            .push_back(content.into());
    }

    /// Currently attached loop devices, lowest index first.
    pub fn attached_loops(&self) -> Vec<LoopDevice> {
        self.state
            .lock()
            .unwrap()
            .loops
            .keys()
            .map(|index| LoopDevice::from_index(*index))
            .collect()
    }

    pub fn backing_file(&self, loop_device: &Path) -> Option<PathBuf> {
        let state = self.state.lock().unwrap();
        loop_index(&state, loop_device).and_then(|index| state.loops.get(&index).cloned())
    }

    /// Snapshot of the simulated mount table.
    pub fn mount_table(&self) -> MountTable {
        MountTable::parse(&self.rendered_mounts())
    }

    /// Simulated mount table rendered in `/proc/mounts` form.
    pub fn rendered_mounts(&self) -> Vec<u8> {
        let state = self.state.lock().unwrap();
        let mut out = Vec::new();
        for record in &state.mounts {
            out.extend(record.to_line());
            out.push(b'\n');
        }
        out
    }

    fn record_operation(&self, op: Operation) {
        self.state.lock().unwrap().operations.push(op);
    }
}

fn loop_index(state: &FakeHalState, loop_device: &Path) -> Option<u32> {
    state
        .loops
        .keys()
        .copied()
        .find(|index| LoopDevice::from_index(*index).path == loop_device)
}

impl MountOps for FakeHal {
    fn mount_device(
        &self,
        device: &Path,
        target: &Path,
        fstype: &str,
        options: &MountOptions,
    ) -> HalResult<()> {
        log::info!(
            "FAKE HAL: mount {} -> {} (type: {})",
            device.display(),
            target.display(),
            fstype
        );

        self.record_operation(Operation::Mount {
            device: device.to_path_buf(),
            target: target.to_path_buf(),
            fstype: fstype.to_string(),
            read_only: options.read_only,
        });

        let mut state = self.state.lock().unwrap();
        if let Some(errno) = state.mount_error.take() {
            return Err(HalError::Mount {
                device: device.to_path_buf(),
                target: target.to_path_buf(),
                errno,
            });
        }

        let magic = if fstype == ISO9660_FSTYPE {
            ISO9660_MAGIC
        } else {
            EXT4_MAGIC
        };
        state.fs_magic.insert(target.to_path_buf(), magic);
        state.mounts.push(MountRecord {
            source: device.to_path_buf(),
            mount_point: target.to_path_buf(),
            fstype: Some(fstype.to_string()),
            options: Some(if options.read_only { "ro" } else { "rw" }.to_string()),
        });

        Ok(())
    }

    fn unmount(&self, target: &Path) -> HalResult<()> {
        log::info!("FAKE HAL: unmount {}", target.display());

        self.record_operation(Operation::Unmount {
            target: target.to_path_buf(),
        });

        let mut state = self.state.lock().unwrap();
        // The most recent mount on a path is the visible one.
        let pos = state
            .mounts
            .iter()
            .rposition(|record| record.mount_point == target)
            .ok_or_else(|| HalError::Unmount {
                target: target.to_path_buf(),
                errno: Errno::EINVAL,
            })?;
        state.mounts.remove(pos);
        if !state.mounts.iter().any(|record| record.mount_point == target) {
            state.fs_magic.remove(target);
        }

        Ok(())
    }
}

impl LoopOps for FakeHal {
    fn loop_attach(&self, image: &Path) -> HalResult<LoopDevice> {
        let device = {
            let mut state = self.state.lock().unwrap();
            let index = (0..)
                .find(|index| !state.loops.contains_key(index))
                .unwrap_or_default();
            state.loops.insert(index, image.to_path_buf());
            LoopDevice::from_index(index)
        };

        log::info!(
            "FAKE HAL: loop attach {} -> {}",
            image.display(),
            device.path.display()
        );

        self.record_operation(Operation::LoopAttach {
            image: image.to_path_buf(),
            loop_device: device.path.clone(),
        });
        Ok(device)
    }

    fn loop_detach(&self, loop_device: &Path) -> HalResult<()> {
        log::info!("FAKE HAL: loop detach {}", loop_device.display());

        self.record_operation(Operation::LoopDetach {
            loop_device: loop_device.to_path_buf(),
        });

        let mut state = self.state.lock().unwrap();
        let ioctl_err = |errno| HalError::Ioctl {
            request: "LOOP_CLR_FD",
            path: loop_device.to_path_buf(),
            errno,
        };
        if let Some(errno) = state.detach_error.take() {
            return Err(ioctl_err(errno));
        }
        let index = loop_index(&state, loop_device).ok_or_else(|| ioctl_err(Errno::ENXIO))?;
        state.loops.remove(&index);

        Ok(())
    }
}

impl ProbeOps for FakeHal {
    fn filesystem_magic(&self, path: &Path) -> HalResult<i64> {
        let mut state = self.state.lock().unwrap();
        if let Some(errno) = state.statfs_error.take() {
            return Err(HalError::Statfs {
                path: path.to_path_buf(),
                errno,
            });
        }
        Ok(state.fs_magic.get(path).copied().unwrap_or(EXT4_MAGIC))
    }
}

impl HostInfoOps for FakeHal {
    fn proc_mounts(&self) -> HalResult<Vec<u8>> {
        let queued = self.state.lock().unwrap().table_overrides.pop_front();
        Ok(queued.unwrap_or_else(|| self.rendered_mounts()))
    }

    fn effective_uid(&self) -> u32 {
        self.state.lock().unwrap().euid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procfs::mounts::MatchPolicy;

    #[test]
    fn fake_hal_records_mount() {
        let hal = FakeHal::new();
        let device = Path::new("/dev/loop0");
        let target = Path::new("/mnt/test");

        hal.mount_device(device, target, ISO9660_FSTYPE, &MountOptions::read_only())
            .unwrap();

        assert_eq!(hal.operation_count(), 1);
        assert!(hal.has_operation(|op| matches!(op, Operation::Mount { read_only: true, .. })));
        let table = hal.mount_table();
        let record = table.find_by_mountpoint(target, MatchPolicy::Exact).unwrap();
        assert_eq!(record.source, Path::new("/dev/loop0"));
        assert_eq!(record.fstype.as_deref(), Some("iso9660"));
        assert_eq!(hal.filesystem_magic(target).unwrap(), ISO9660_MAGIC);
    }

    #[test]
    fn fake_hal_records_unmount() {
        let hal = FakeHal::new();
        let target = Path::new("/mnt/test");

        hal.mount_device(
            Path::new("/dev/loop0"),
            target,
            ISO9660_FSTYPE,
            &MountOptions::read_only(),
        )
        .unwrap();
        hal.unmount(target).unwrap();

        assert_eq!(hal.operation_count(), 2);
        assert!(hal.has_operation(|op| matches!(op, Operation::Unmount { .. })));
        assert!(hal.mount_table().records().is_empty());
        assert_eq!(hal.filesystem_magic(target).unwrap(), EXT4_MAGIC);
    }

    #[test]
    fn fake_hal_unmount_of_unknown_target_fails() {
        let hal = FakeHal::new();
        let err = hal.unmount(Path::new("/mnt/none")).unwrap_err();
        assert_eq!(err.errno(), Some(Errno::EINVAL));
    }

    #[test]
    fn fake_hal_hands_out_lowest_free_loop() {
        let hal = FakeHal::new();
        let a = hal.loop_attach(Path::new("/tmp/a.iso")).unwrap();
        let b = hal.loop_attach(Path::new("/tmp/b.iso")).unwrap();
        assert_eq!((a.index, b.index), (0, 1));

        hal.loop_detach(&a.path).unwrap();
        let c = hal.loop_attach(Path::new("/tmp/c.iso")).unwrap();
        assert_eq!(c.index, 0);
        assert_eq!(hal.backing_file(&c.path), Some(PathBuf::from("/tmp/c.iso")));
    }

    #[test]
    fn fake_hal_detach_of_unbound_loop_is_enxio() {
        let hal = FakeHal::new();
        let err = hal.loop_detach(Path::new("/dev/loop5")).unwrap_err();
        assert_eq!(err.errno(), Some(Errno::ENXIO));
    }

    #[test]
    fn fake_hal_injected_failures_fire_once() {
        let hal = FakeHal::new();
        let target = Path::new("/mnt/x");
        hal.fail_next_mount(Errno::EBUSY);

        let opts = MountOptions::read_only();
        let err = hal
            .mount_device(Path::new("/dev/loop0"), target, ISO9660_FSTYPE, &opts)
            .unwrap_err();
        assert_eq!(err.errno(), Some(Errno::EBUSY));
        hal.mount_device(Path::new("/dev/loop0"), target, ISO9660_FSTYPE, &opts)
            .unwrap();
    }

    #[test]
    fn fake_hal_statfs_failure_fires_once() {
        let hal = FakeHal::new();
        let target = Path::new("/mnt/x");
        hal.fail_next_statfs(Errno::EACCES);

        let err = hal.filesystem_magic(target).unwrap_err();
        assert!(matches!(err, HalError::Statfs { .. }));
        assert_eq!(err.errno(), Some(Errno::EACCES));
        assert_eq!(hal.filesystem_magic(target).unwrap(), EXT4_MAGIC);
    }

    #[test]
    fn fake_hal_serves_queued_tables_then_live_state() {
        let hal = FakeHal::new();
        hal.add_mount(MountRecord::new("/dev/loop0", "/mnt/iso"), ISO9660_MAGIC);
        hal.override_next_mount_table(b"/dev/sdb1 /srv ext4 rw 0 0\n".to_vec());
        hal.override_next_mount_table(Vec::new());

        assert_eq!(hal.proc_mounts().unwrap(), b"/dev/sdb1 /srv ext4 rw 0 0\n".to_vec());
        assert!(hal.proc_mounts().unwrap().is_empty());
        assert_eq!(hal.proc_mounts().unwrap(), hal.rendered_mounts());
        assert!(hal.mount_table().is_mountpoint(Path::new("/mnt/iso"), MatchPolicy::Exact));
    }

    #[test]
    fn fake_hal_can_clear() {
        let hal = FakeHal::new();
        hal.loop_attach(Path::new("/tmp/a.iso")).unwrap();

        assert_eq!(hal.operation_count(), 1);

        hal.clear();

        assert_eq!(hal.operation_count(), 0);
        assert_eq!(hal.attached_loops().len(), 1);
    }
}
