use crate::{LoopDevice, LoopOps};

/// RAII guard that detaches a loop device when dropped.
///
/// Wraps the window between `LOOP_SET_FD` and a successful mount so a failed
/// mount never leaves an orphaned association behind.
#[derive(Debug)]
pub struct LoopGuard<'a, H: LoopOps + ?Sized> {
    hal: &'a H,
    device: LoopDevice,
    active: bool,
}

impl<'a, H: LoopOps + ?Sized> LoopGuard<'a, H> {
    pub fn new(hal: &'a H, device: LoopDevice) -> Self {
        Self {
            hal,
            device,
            active: true,
        }
    }

    /// Prevent automatic detach and return the loop device.
    pub fn release(mut self) -> LoopDevice {
        self.active = false;
        self.device.clone()
    }

    pub fn device(&self) -> &LoopDevice {
        &self.device
    }
}

impl<'a, H: LoopOps + ?Sized> Drop for LoopGuard<'a, H> {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        match self.hal.loop_detach(&self.device.path) {
            Ok(()) => log::info!("detached {}", self.device.path.display()),
            Err(err) => log::warn!(
                "loop guard failed to detach {}: {}",
                self.device.path.display(),
                err
            ),
        }
    }
}
