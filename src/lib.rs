//! Capture control core of the LabTool mixed-signal sampler.
//!
//! The controller picks a sample clock for the requested rate, splits the sample memory between
//! the digital and analog capture engines, arms both engines and merges their completion reports
//! into a single notification. Calibration factors for the analog inputs are derived separately
//! from a raw calibration record.

mod sys;
mod regs;
mod config;
mod params;
mod rate;
mod buffer;
mod rendezvous;
mod controller;
mod calibration;

#[derive(Debug)]
pub enum Error {
    UnsupportedSampleRate,
    InvalidSignalCombination,
    NoChannelsEnabled,
    InvalidLength { expected: usize, actual: usize },
    Busy,
    SamplingFailed,
    Other(Box<dyn std::error::Error + Sync + Send + 'static>),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::UnsupportedSampleRate =>
                write!(f, "unsupported sample rate"),
            Self::InvalidSignalCombination =>
                write!(f, "invalid signal combination"),
            Self::NoChannelsEnabled =>
                write!(f, "no channels enabled"),
            Self::InvalidLength { expected, actual } =>
                write!(f, "invalid record length: expected {} bytes, got {}", expected, actual),
            Self::Busy =>
                write!(f, "device busy"),
            Self::SamplingFailed =>
                write!(f, "sampling failed"),
            Self::Other(error) =>
                write!(f, "{}", error),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Other(error) => Some(error.as_ref()),
            _ => None
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        match error.downcast::<Self>() {
            Ok(error) => error,
            Err(error) => Error::Other(error.into()),
        }
    }
}

pub type Result<T> =
    core::result::Result<T, Error>;

pub use sys::{
    Platform,
    ClockDriver,
    CaptureEngine,
    EngineSetup,
    Host,
};

pub use regs::cgu::{
    ClockConfig,
    ClockDomain,
};

pub use regs::led::Indicators;

pub use config::{
    AnalogChannels,
    PostFill,
    DigitalConfig,
    AnalogConfig,
    CaptureConfig,
};

pub use rate::{
    RateIndex,
    SampleClock,
};

pub use buffer::{
    CaptureBuffer,
    BufferPlan,
};

pub use rendezvous::{
    Half,
    EngineReport,
    CapturedSamples,
    PrefillStatus,
};

pub use controller::{
    Purpose,
    HostIntent,
    Controller,
};

pub use params::RawCaptureConfig;

pub use calibration::{
    CalibrationRaw,
    Calibration,
    Factors,
    ANALOG_RANGES,
};
