//! Capture configuration as requested by the host, decoded from its wire form.

use bytemuck::{Pod, Zeroable};

use crate::{Error, Result};
use crate::params::RawCaptureConfig;

pub const DIGITAL_CHANNELS: u32 = 11;
pub const DIGITAL_CHANNEL_MASK: u32 = (1 << DIGITAL_CHANNELS) - 1;
pub const ANALOG_CHANNELS: u32 = 2;

/// Number of enabled analog channels, or one of the escape requests sharing the same field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalogChannels {
    Literal(u32),
    /// Small fixed-size probe of both analog channels; the samples are not kept.
    ShortShot,
    /// Capture of both analog channels for input calibration.
    Calibrate,
}

impl Default for AnalogChannels {
    fn default() -> Self {
        AnalogChannels::Literal(0)
    }
}

impl AnalogChannels {
    pub const SHORT_SHOT_CODE: u32 = 0xffff_fffe;
    pub const CALIBRATE_CODE: u32 = 0xffff_ffff;

    pub fn from_code(code: u32) -> Result<Self> {
        match code {
            Self::SHORT_SHOT_CODE => Ok(AnalogChannels::ShortShot),
            Self::CALIBRATE_CODE => Ok(AnalogChannels::Calibrate),
            count if count <= ANALOG_CHANNELS => Ok(AnalogChannels::Literal(count)),
            count => {
                log::info!("rejecting request for {} analog channels", count);
                Err(Error::InvalidSignalCombination)
            }
        }
    }

    pub fn code(self) -> u32 {
        match self {
            AnalogChannels::Literal(count) => count,
            AnalogChannels::ShortShot => Self::SHORT_SHOT_CODE,
            AnalogChannels::Calibrate => Self::CALIBRATE_CODE,
        }
    }

    /// Number of physically sampled channels.
    pub fn count(self) -> u32 {
        match self {
            AnalogChannels::Literal(count) => count,
            AnalogChannels::ShortShot | AnalogChannels::Calibrate => ANALOG_CHANNELS,
        }
    }

    pub fn is_escape(self) -> bool {
        !matches!(self, AnalogChannels::Literal(_))
    }
}

/// Amount of samples retained after the trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PostFill {
    /// Percentage of the buffer used for samples taken after the trigger.
    pub percent: u8,
    /// Maximum number of samples taken after the trigger (24 bits).
    pub max_samples: u32,
}

impl PostFill {
    pub fn from_bits(bits: u32) -> Self {
        PostFill { percent: bits as u8, max_samples: bits >> 8 }
    }

    pub fn bits(self) -> u32 {
        (self.max_samples & 0x00ff_ffff) << 8 | self.percent as u32
    }
}

/// Configuration forwarded to the digital engine.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct DigitalConfig {
    /// Bit N set when DIO N is sampled.
    pub enabled_channels: u32,
    /// Bit N set when DIO N takes part in the trigger condition.
    pub enabled_triggers: u32,
    /// Per-channel trigger setup, interpreted by the digital engine only.
    pub trigger_setup: [u32; DIGITAL_CHANNELS as usize],
}

/// Configuration forwarded to the analog engine.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct AnalogConfig {
    /// Bit N set when analog channel N is sampled.
    pub enabled_channels: u32,
    /// Bit N set when analog channel N takes part in the trigger condition.
    pub enabled_triggers: u32,
    /// Volts/div range index per channel, one nibble each.
    pub volts_per_div: u32,
    /// Bit N set for AC coupling of channel N.
    pub couplings: u32,
    pub noise_reduction: u32,
    /// Trigger levels, interpreted by the analog engine only.
    pub trigger_levels: [u32; ANALOG_CHANNELS as usize],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureConfig {
    pub digital_channels: u32,
    pub analog_channels: AnalogChannels,
    /// Requested sample rate in Hz; `0` means "never configured".
    pub sample_rate: u32,
    pub post_fill: PostFill,
    pub digital: DigitalConfig,
    pub analog: AnalogConfig,
}

impl CaptureConfig {
    pub fn from_raw(raw: &RawCaptureConfig) -> Result<Self> {
        Ok(CaptureConfig {
            digital_channels: raw.enabled_digital,
            analog_channels: AnalogChannels::from_code(raw.enabled_analog)?,
            sample_rate: raw.sample_rate,
            post_fill: PostFill::from_bits(raw.post_fill),
            digital: raw.digital,
            analog: raw.analog,
        })
    }

    pub fn to_raw(&self) -> RawCaptureConfig {
        RawCaptureConfig {
            enabled_digital: self.digital_channels,
            enabled_analog: self.analog_channels.code(),
            sample_rate: self.sample_rate,
            post_fill: self.post_fill.bits(),
            digital: self.digital,
            analog: self.analog,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_raw(&RawCaptureConfig::from_bytes(bytes)?)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_raw().as_bytes().to_vec()
    }

    /// Transient configuration used to probe both analog inputs at a fixed rate with a forced
    /// trigger and DC coupling.
    pub fn calibration(volts_per_div: u8, analog_channels: AnalogChannels) -> Self {
        let range = (volts_per_div & 0x7) as u32;
        CaptureConfig {
            digital_channels: 0,
            analog_channels,
            sample_rate: 1_000_000,
            post_fill: PostFill { percent: 100, max_samples: 0x000f_ffff },
            digital: DigitalConfig::default(),
            analog: AnalogConfig {
                enabled_channels: 0b11,
                enabled_triggers: 0,
                volts_per_div: range | range << 4,
                couplings: 0,
                noise_reduction: 0,
                ..Default::default()
            },
        }
    }

    /// True when no enabled engine has a channel taking part in a trigger condition.
    pub fn forced_trigger(&self) -> bool {
        let digital_trigger = self.digital_channels > 0 && self.digital.enabled_triggers > 0;
        let analog_trigger = self.analog_channels.count() > 0 && self.analog.enabled_triggers > 0;
        !(digital_trigger || analog_trigger)
    }
}
