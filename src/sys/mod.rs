//! Collaborators of the capture controller.
//!
//! Clock tree programming, the two capture engines and the host side (global state machine,
//! indicators and the USB handler) live outside this crate; the controller only reaches them
//! through these traits.

use crate::{Error, Result};
use crate::regs::cgu::{ClockConfig, ClockDomain};
use crate::regs::led::Indicators;
use crate::config::{PostFill, DigitalConfig, AnalogConfig};
use crate::buffer::CaptureBuffer;
use crate::rendezvous::CapturedSamples;

pub trait ClockDriver {
    fn set_domain_enabled(&mut self, domain: ClockDomain, enabled: bool);
    fn set_pll0audio(&mut self, msel: u8, nsel: u8, psel: u8);
    /// Recompute the derived clock frequencies after a PLL change.
    fn update_clocks(&mut self);
}

/// Everything a capture engine needs besides its own channel configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSetup {
    pub buffer: CaptureBuffer,
    pub post_fill: PostFill,
    /// Capture as much as the buffer holds instead of waiting for a trigger.
    pub forced_trigger: bool,
    pub clock: ClockConfig,
}

pub trait CaptureEngine {
    type Config;

    fn init(&mut self);
    fn configure(&mut self, setup: &EngineSetup, config: &Self::Config) -> Result<()>;
    /// Does everything needed to start sampling except actually starting it.
    fn prepare_to_arm(&mut self) -> Result<()>;
    /// Start sampling. `cycle` identifies this arm cycle and is echoed back in the report.
    fn arm(&mut self, cycle: u32);
    fn disarm(&mut self) -> Result<()>;
}

pub trait Host {
    /// Ask the device state machine to enter the capturing state.
    fn request_capturing(&mut self) -> Result<()>;
    fn write_indicators(&mut self, value: Indicators);
    fn send_samples(&mut self, samples: &CapturedSamples);
    fn signal_failed_sampling(&mut self, error: Error);
}

pub trait Platform {
    type Clock: ClockDriver;
    type Digital: CaptureEngine<Config = DigitalConfig>;
    type Analog: CaptureEngine<Config = AnalogConfig>;
    type Host: Host;
}

#[cfg(test)]
pub(crate) mod sim;
