//! Byte-exact records exchanged with the host.
//!
//! Host and device are built independently, so the layouts below are fixed: `#[repr(C)]`,
//! 32-bit little-endian fields, no padding.

use bytemuck::{Pod, Zeroable};

use crate::{Error, Result};
use crate::config::{DigitalConfig, AnalogConfig};

/// Capture configuration blob as sent by the host.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct RawCaptureConfig {
    pub enabled_digital: u32,
    /// Literal channel count, or one of the short-shot/calibrate escape codes.
    pub enabled_analog: u32,
    pub sample_rate: u32,
    /// Low 8 bits: post-trigger percentage of the buffer; high 24 bits: post-trigger sample cap.
    pub post_fill: u32,
    pub digital: DigitalConfig,
    pub analog: AnalogConfig,
}

impl RawCaptureConfig {
    pub const SIZE: usize = core::mem::size_of::<Self>();

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        read_record(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Reads a fixed-layout record, rejecting any length other than its exact size.
pub(crate) fn read_record<T: Pod>(bytes: &[u8]) -> Result<T> {
    let expected = core::mem::size_of::<T>();
    if bytes.len() != expected {
        return Err(Error::InvalidLength { expected, actual: bytes.len() })
    }
    Ok(bytemuck::pod_read_unaligned(bytes))
}
