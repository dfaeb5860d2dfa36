//! Host information (read-only).
//!
//! This is "world-touching" (reads `/proc`, queries credentials) and belongs in the HAL.

use crate::HalResult;

pub trait HostInfoOps {
    /// Raw bytes of the live mount table. Never cached.
    fn proc_mounts(&self) -> HalResult<Vec<u8>>;

    fn effective_uid(&self) -> u32;
}
