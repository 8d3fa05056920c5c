//! Linear conversion of analog input codes to volts.
//!
//! During calibration the device drives a known voltage from its DAC into both analog inputs,
//! first at a few DAC codes (to measure the DAC itself), then at a low and a high target for every
//! volts/div range (to measure the inputs). The factors derived here map an input code to volts as
//! `intercept + slope * code`.

use bytemuck::{Pod, Zeroable};
use wide::f64x4;

use crate::Result;
use crate::config::ANALOG_CHANNELS;
use crate::params::read_record;

/// Number of volts/div ranges of an analog input.
pub const ANALOG_RANGES: usize = 8;

const CHANNELS: usize = ANALOG_CHANNELS as usize;

/// Volts/div of each range, in millivolts.
pub const VOLTS_PER_DIV_MV: [i32; ANALOG_RANGES] = [20, 50, 100, 200, 500, 1000, 2000, 5000];

/// Checksum or version of a record that was never written by a calibration.
pub const DEFAULT_MARKER: u32 = 0x00DE_AD00;

const DAC_POINTS: usize = 3;
const DAC_LOW: usize = 0;
const DAC_HIGH: usize = 2;
const DAC_MAX: i32 = (1 << 10) - 1;

// limit on the magnitude of either factor of a plausible calibration
const FACTOR_LIMIT: f64 = 1000.0;

/// Calibration measurements as stored on the device.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct CalibrationRaw {
    pub checksum: u32,
    pub version: u32,
    /// DAC codes the output was measured at.
    pub dac_out: [u32; DAC_POINTS],
    /// Output measured by the user at each of `dac_out`, in mV.
    pub measured_out_mv: [[i32; DAC_POINTS]; CHANNELS],
    /// Low and high output targets for each range, in mV.
    pub target_low_mv: [i32; ANALOG_RANGES],
    pub target_high_mv: [i32; ANALOG_RANGES],
    /// Input codes read back with the output at the low and high targets.
    pub measured_low: [[u32; ANALOG_RANGES]; CHANNELS],
    pub measured_high: [[u32; ANALOG_RANGES]; CHANNELS],
}

impl CalibrationRaw {
    pub const SIZE: usize = core::mem::size_of::<Self>();

    /// Placeholder record for a device that has not been calibrated.
    ///
    /// Only the markers are meaningful. The DAC points, targets (four divisions, clipped to the
    /// DAC swing) and input codes are nominal values for an ideal front-end, not measurements.
    pub fn factory() -> CalibrationRaw {
        let target_mv = VOLTS_PER_DIV_MV.map(|volts_per_div| (4 * volts_per_div).min(2750));
        CalibrationRaw {
            checksum: DEFAULT_MARKER,
            version: DEFAULT_MARKER,
            dac_out: [256, 512, 768],
            measured_out_mv: [[2750, 0, -2750]; CHANNELS],
            target_low_mv: target_mv.map(|mv| -mv),
            target_high_mv: target_mv,
            measured_low: [[111; ANALOG_RANGES]; CHANNELS],
            measured_high: [[911; ANALOG_RANGES]; CHANNELS],
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        read_record(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }

    pub fn is_default(&self) -> bool {
        self.checksum == DEFAULT_MARKER || self.version == DEFAULT_MARKER
    }

    /// Voltage the DAC actually outputs when asked for `target_mv` on `channel`, in volts.
    ///
    /// The device picks the DAC code with single precision arithmetic, and so does this.
    fn estimate_output(&self, channel: usize, target_mv: i32) -> f64 {
        let code_low = self.dac_out[DAC_LOW] as f32;
        let code_high = self.dac_out[DAC_HIGH] as f32;
        let mv_low = self.measured_out_mv[channel][DAC_LOW] as f32;
        let mv_high = self.measured_out_mv[channel][DAC_HIGH] as f32;

        let slope = (mv_high - mv_low) / (code_high - code_low);
        let intercept = mv_low - slope * code_low;
        let code = (((target_mv as f32 - intercept) / slope) as i32).clamp(0, DAC_MAX);
        ((intercept + slope * code as f32) / 1000.0) as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Factors {
    /// Volts at code 0.
    pub intercept: f64,
    /// Volts per code.
    pub slope: f64,
}

impl Factors {
    fn is_plausible(&self) -> bool {
        [self.intercept, self.slope].iter()
            .all(|factor| factor.is_finite() && factor.abs() <= FACTOR_LIMIT)
    }
}

#[derive(Debug, Clone)]
pub struct Calibration {
    raw: CalibrationRaw,
    factors: [[Factors; ANALOG_RANGES]; CHANNELS],
    reasonable: bool,
}

impl Calibration {
    pub fn new(raw: CalibrationRaw) -> Calibration {
        let mut factors = [[Factors::default(); ANALOG_RANGES]; CHANNELS];
        for range in 0..ANALOG_RANGES {
            for channel in 0..CHANNELS {
                let volts_low = raw.estimate_output(channel, raw.target_low_mv[range]);
                let volts_high = raw.estimate_output(channel, raw.target_high_mv[range]);
                let code_low = raw.measured_low[channel][range] as f64;
                let code_high = raw.measured_high[channel][range] as f64;
                let slope = (volts_low - volts_high) / (code_low - code_high);
                factors[channel][range] = Factors {
                    intercept: volts_low - slope * code_low,
                    slope,
                };
            }
        }
        let reasonable = factors.iter().flatten().all(Factors::is_plausible);
        Calibration { raw, factors, reasonable }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Calibration::new(CalibrationRaw::from_bytes(bytes)?))
    }

    pub fn factory() -> Calibration {
        Calibration::new(CalibrationRaw::factory())
    }

    pub fn raw(&self) -> &CalibrationRaw {
        &self.raw
    }

    /// Factors of analog input `channel` at volts/div `range`.
    ///
    /// Panics if `channel` is not 0 or 1, or `range` is not below `ANALOG_RANGES`; the same
    /// applies to the conversions below.
    pub fn factors(&self, channel: usize, range: usize) -> Factors {
        assert!(channel < CHANNELS && range < ANALOG_RANGES,
            "no calibration for channel {} range {}", channel, range);
        self.factors[channel][range]
    }

    pub fn is_default(&self) -> bool {
        self.raw.is_default()
    }

    /// Whether every factor is finite and of a sane magnitude.
    pub fn is_reasonable(&self) -> bool {
        self.reasonable
    }

    pub fn code_to_volts(&self, channel: usize, range: usize, code: u16) -> f64 {
        let Factors { intercept, slope } = self.factors(channel, range);
        intercept + slope * code as f64
    }

    pub fn codes_to_volts(&self, channel: usize, range: usize, codes: &[u16]) -> Vec<f64> {
        let Factors { intercept, slope } = self.factors(channel, range);
        let (intercept_x4, slope_x4) = (f64x4::splat(intercept), f64x4::splat(slope));
        let mut volts = Vec::with_capacity(codes.len());
        let mut chunks = codes.chunks_exact(4);
        for chunk in &mut chunks {
            let codes = f64x4::from([
                chunk[0] as f64, chunk[1] as f64, chunk[2] as f64, chunk[3] as f64
            ]);
            volts.extend_from_slice(&codes.mul_add(slope_x4, intercept_x4).to_array());
        }
        volts.extend(chunks.remainder().iter().map(|&code| intercept + slope * code as f64));
        volts
    }

    pub fn log_raw(&self) {
        let raw = &self.raw;
        log::info!("measured output: {:?} mV at DAC codes {:?}", raw.measured_out_mv, raw.dac_out);
        log::info!("               Low               High");
        log::info!(" V/div     mV    A0   A1      mV    A0   A1");
        for (range, volts_per_div) in VOLTS_PER_DIV_MV.iter().enumerate() {
            log::info!("{:>5}mV   {:5} {:4} {:4}    {:5} {:4} {:4}", volts_per_div,
                raw.target_low_mv[range], raw.measured_low[0][range], raw.measured_low[1][range],
                raw.target_high_mv[range], raw.measured_high[0][range], raw.measured_high[1][range]);
        }
    }

    pub fn log_factors(&self) {
        if self.is_default() {
            log::warn!("using default calibration; the device is uncalibrated or its record is invalid");
        }
        if !self.is_reasonable() {
            log::warn!("calibration contains implausible factors, consider recalibrating");
        }
        log::info!(" V/div     A0 intercept  A0 slope    A1 intercept  A1 slope");
        for (range, volts_per_div) in VOLTS_PER_DIV_MV.iter().enumerate() {
            let [a0, a1] = [0, 1].map(|channel| self.factors[channel][range]);
            log::info!("{:>5}mV  {:12.7} {:10.7}  {:12.7} {:10.7}", volts_per_div,
                a0.intercept, a0.slope, a1.intercept, a1.slope);
        }
    }
}
