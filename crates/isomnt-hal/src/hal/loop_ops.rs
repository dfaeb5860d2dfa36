//! Loop device operations.

use crate::{HalResult, LoopDevice};
use std::path::Path;

pub trait LoopOps {
    /// Allocate the lowest free loop device and bind `image` to it.
    fn loop_attach(&self, image: &Path) -> HalResult<LoopDevice>;

    /// Detach a loop device (`LOOP_CLR_FD`).
    fn loop_detach(&self, loop_device: &Path) -> HalResult<()>;
}
