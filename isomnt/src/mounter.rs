//! Mount/unmount orchestration.
//!
//! Nothing is remembered between invocations: on unmount the loop device is
//! recovered from the live mount table. The kernel tables are read without
//! locking, so another process can change them between a check and the
//! action that follows it.

use crate::errors::{IsomntError, Result};
use crate::preflight;
use isomnt_hal::{
    IsoHal, LoopDevice, LoopGuard, MatchPolicy, MountOptions, MountTable, ISO9660_FSTYPE,
    ISO9660_MAGIC,
};
use std::path::{Path, PathBuf};

pub struct IsoMounter<'a, H: IsoHal + ?Sized> {
    hal: &'a H,
    policy: MatchPolicy,
}

impl<'a, H: IsoHal + ?Sized> IsoMounter<'a, H> {
    pub fn new(hal: &'a H) -> Self {
        Self {
            hal,
            policy: MatchPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: MatchPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn ensure_root(&self) -> Result<()> {
        if self.hal.effective_uid() != 0 {
            return Err(IsomntError::NotRoot);
        }
        Ok(())
    }

    fn mount_table(&self) -> Result<MountTable> {
        Ok(MountTable::parse(&self.hal.proc_mounts()?))
    }

    /// Bind `image` to a free loop device and mount it read-only at `target`.
    ///
    /// If `mount(2)` fails the loop device is detached again before the error
    /// is returned.
    pub fn mount(&self, image: &Path, target: &Path) -> Result<LoopDevice> {
        preflight::check_image(image)?;
        preflight::check_target(target)?;
        if self.mount_table()?.is_mountpoint(target, self.policy) {
            return Err(IsomntError::AlreadyMounted(target.to_path_buf()));
        }

        log::info!("Mounting .iso image: {}", image.display());

        let guard = LoopGuard::new(self.hal, self.hal.loop_attach(image)?);
        log::info!(
            "attached {} to {}",
            image.display(),
            guard.device().path.display()
        );

        self.hal.mount_device(
            &guard.device().path,
            target,
            ISO9660_FSTYPE,
            &MountOptions::read_only(),
        )?;

        Ok(guard.release())
    }

    /// Detach the loop device behind `target`, then unmount it.
    ///
    /// Returns the loop device that was detached, or `None` when the mount
    /// table no longer had a record for `target` by the time it was re-read.
    pub fn unmount(&self, target: &Path) -> Result<Option<PathBuf>> {
        preflight::check_target(target)?;
        if !self.mount_table()?.is_mountpoint(target, self.policy) {
            return Err(IsomntError::NothingMounted(target.to_path_buf()));
        }

        let magic = match self.hal.filesystem_magic(target) {
            Ok(magic) => Some(magic),
            Err(err) => {
                log::debug!("{err}");
                None
            }
        };
        if magic != Some(ISO9660_MAGIC) {
            return Err(IsomntError::UnsupportedFilesystem {
                target: target.to_path_buf(),
                magic,
            });
        }

        log::info!("Unmounting .iso image from: {}", target.display());

        let device = self
            .mount_table()?
            .find_by_mountpoint(target, self.policy)
            .map(|record| record.source_path().to_path_buf());

        match &device {
            Some(device) => {
                self.hal.loop_detach(device)?;
                log::info!("detached {}", device.display());
            }
            None => log::debug!(
                "{} vanished from the mount table; skipping loop detach",
                target.display()
            ),
        }

        self.hal.unmount(target)?;
        Ok(device)
    }
}
