//! Recording stand-ins for the controller's collaborators.

use crate::{Error, Result};
use crate::regs::cgu::ClockDomain;
use crate::regs::led::Indicators;
use crate::config::{DigitalConfig, AnalogConfig};
use crate::rendezvous::CapturedSamples;

use super::{ClockDriver, CaptureEngine, EngineSetup, Host, Platform};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    Domain(ClockDomain, bool),
    Pll(u8, u8, u8),
    Update,
}

#[derive(Debug, Default)]
pub struct SimClock {
    pub events: Vec<ClockEvent>,
}

impl SimClock {
    /// Number of times the PLL-dependent domains were gated off for a switch.
    pub fn gate_cycles(&self) -> usize {
        self.events.iter()
            .filter(|&&event| event == ClockEvent::Domain(ClockDomain::Peripheral, false))
            .count()
    }
}

impl ClockDriver for SimClock {
    fn set_domain_enabled(&mut self, domain: ClockDomain, enabled: bool) {
        self.events.push(ClockEvent::Domain(domain, enabled))
    }

    fn set_pll0audio(&mut self, msel: u8, nsel: u8, psel: u8) {
        self.events.push(ClockEvent::Pll(msel, nsel, psel))
    }

    fn update_clocks(&mut self) {
        self.events.push(ClockEvent::Update)
    }
}

#[derive(Debug)]
pub struct SimEngine<C> {
    pub inits: usize,
    pub configured: Vec<(EngineSetup, C)>,
    pub prepares: usize,
    pub arms: usize,
    pub armed_cycle: Option<u32>,
    pub disarms: usize,
    pub fail_configure: bool,
    pub fail_prepare: bool,
    pub fail_disarm: bool,
}

impl<C> Default for SimEngine<C> {
    fn default() -> Self {
        SimEngine {
            inits: 0,
            configured: Vec::new(),
            prepares: 0,
            arms: 0,
            armed_cycle: None,
            disarms: 0,
            fail_configure: false,
            fail_prepare: false,
            fail_disarm: false,
        }
    }
}

impl<C: Clone> CaptureEngine for SimEngine<C> {
    type Config = C;

    fn init(&mut self) {
        self.inits += 1
    }

    fn configure(&mut self, setup: &EngineSetup, config: &C) -> Result<()> {
        if self.fail_configure {
            return Err(Error::Other("engine configuration failed".into()))
        }
        self.configured.push((*setup, config.clone()));
        Ok(())
    }

    fn prepare_to_arm(&mut self) -> Result<()> {
        self.prepares += 1;
        if self.fail_prepare {
            return Err(Error::SamplingFailed)
        }
        Ok(())
    }

    fn arm(&mut self, cycle: u32) {
        self.arms += 1;
        self.armed_cycle = Some(cycle)
    }

    fn disarm(&mut self) -> Result<()> {
        self.disarms += 1;
        if self.fail_disarm {
            return Err(Error::Other("engine did not stop".into()))
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct SimHost {
    pub refuse_capturing: bool,
    pub capture_requests: usize,
    pub indicators: Indicators,
    pub samples: Vec<CapturedSamples>,
    pub failures: Vec<Error>,
}

impl Host for SimHost {
    fn request_capturing(&mut self) -> Result<()> {
        self.capture_requests += 1;
        if self.refuse_capturing {
            return Err(Error::Busy)
        }
        Ok(())
    }

    fn write_indicators(&mut self, value: Indicators) {
        self.indicators = value
    }

    fn send_samples(&mut self, samples: &CapturedSamples) {
        self.samples.push(*samples)
    }

    fn signal_failed_sampling(&mut self, error: Error) {
        self.failures.push(error)
    }
}

#[derive(Debug)]
pub struct SimPlatform;

impl Platform for SimPlatform {
    type Clock = SimClock;
    type Digital = SimEngine<DigitalConfig>;
    type Analog = SimEngine<AnalogConfig>;
    type Host = SimHost;
}
