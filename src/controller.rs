use std::sync::Arc;

use crate::{Error, Result};
use crate::sys::{Platform, CaptureEngine, EngineSetup, Host};
use crate::regs::cgu::ClockConfig;
use crate::regs::led::Indicators;
use crate::config::{AnalogChannels, CaptureConfig};
use crate::rate::SampleClock;
use crate::buffer::{BufferPlan, CaptureBuffer};
use crate::rendezvous::{Half, EngineReport, PrefillStatus, Rendezvous, Outcome};
use crate::calibration::ANALOG_RANGES;

/// Why the current capture was configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Purpose {
    #[default]
    None,
    HostRequest,
    ShortShot,
    Calibrate,
}

/// What the host last asked for through `start`/`stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostIntent {
    #[default]
    Idle,
    Disarmed,
    Armed,
}

/// Keeps the pending result unless `step` failed; the latest failure wins.
fn record_failure(result: &mut Result<()>, step: Result<()>) {
    if let Err(error) = step {
        *result = Err(error)
    }
}

pub struct Controller<P: Platform> {
    clock: P::Clock,
    digital: P::Digital,
    analog: P::Analog,
    host: P::Host,
    sample_clock: SampleClock,
    digital_buffer: CaptureBuffer,
    analog_buffer: CaptureBuffer,
    // zero unless the engine has been successfully configured
    digital_channels: u32,
    analog_channels: u32,
    indicators: Indicators,
    rendezvous: Rendezvous,
    prefill: Arc<PrefillStatus>,
    calibration_config: CaptureConfig,
    host_config: CaptureConfig,
    purpose: Purpose,
    host_intent: HostIntent,
}

impl<P: Platform> Controller<P> {
    pub fn new(clock: P::Clock, digital: P::Digital, analog: P::Analog, host: P::Host)
            -> Controller<P> {
        Controller {
            clock,
            digital,
            analog,
            host,
            sample_clock: SampleClock::default(),
            digital_buffer: CaptureBuffer::full(),
            analog_buffer: CaptureBuffer::full(),
            digital_channels: 0,
            analog_channels: 0,
            indicators: Indicators::empty(),
            rendezvous: Rendezvous::default(),
            prefill: Arc::new(PrefillStatus::default()),
            calibration_config: CaptureConfig::default(),
            host_config: CaptureConfig::default(),
            purpose: Purpose::None,
            host_intent: HostIntent::Idle,
        }
    }

    /// Bring the buffers, the sample clock and both engines to their power-up state.
    pub fn init(&mut self) {
        self.modify_indicators(|val| val.remove(Indicators::Armed | Indicators::Triggered));
        self.digital_buffer = CaptureBuffer::full();
        self.analog_buffer = CaptureBuffer::full();
        self.sample_clock.apply_initial(&mut self.clock);
        self.rendezvous.cancel();
        self.digital.init();
        self.analog.init();
    }

    /// Apply a capture configuration.
    ///
    /// A literal analog channel count makes this a host request: the configuration is kept for
    /// `start`, and the device state machine must agree to enter the capturing state. The
    /// short-shot and calibrate escapes are transient and leave the state machine alone.
    ///
    /// Both engines are disabled until the whole configuration has been applied, so a rejected
    /// configuration leaves nothing half enabled.
    pub fn configure(&mut self, config: &CaptureConfig) -> Result<()> {
        match config.analog_channels {
            AnalogChannels::ShortShot =>
                self.purpose = Purpose::ShortShot,
            AnalogChannels::Calibrate =>
                self.purpose = Purpose::Calibrate,
            AnalogChannels::Literal(_) => {
                self.host_config = *config;
                self.purpose = Purpose::HostRequest;
                self.host.request_capturing()?;
            }
        }

        self.modify_indicators(|val| val.remove(Indicators::Armed | Indicators::Triggered));
        self.digital_channels = 0;
        self.analog_channels = 0;

        let analog_channels = config.analog_channels.count();
        if config.digital_channels == 0 && analog_channels == 0 {
            log::info!("rejecting configuration without any channels");
            return Err(Error::NoChannelsEnabled)
        }
        check_combination(config)?;
        self.sample_clock.set_sample_rate(&mut self.clock, config.sample_rate, analog_channels)?;
        let plan = BufferPlan::new(config.analog_channels, config.digital_channels,
            config.digital.enabled_channels)?;

        let forced_trigger = config.forced_trigger();
        let clock = *self.sample_clock.config();
        if config.digital_channels > 0 {
            self.digital_buffer = plan.digital.ok_or(Error::InvalidSignalCombination)?;
            self.digital.configure(&EngineSetup {
                buffer: self.digital_buffer,
                post_fill: config.post_fill,
                forced_trigger,
                clock,
            }, &config.digital)?;
        }
        if analog_channels > 0 {
            self.analog_buffer = plan.analog.ok_or(Error::InvalidSignalCombination)?;
            self.analog.configure(&EngineSetup {
                buffer: self.analog_buffer,
                post_fill: config.post_fill,
                forced_trigger,
                clock,
            }, &config.analog)?;
        }

        self.digital_channels = config.digital_channels;
        self.analog_channels = analog_channels;
        log::debug!("configured {} digital, {} analog channels at {} Hz for {:?}{}",
            self.digital_channels, self.analog_channels, clock.sample_rate, self.purpose,
            if forced_trigger { " (forced trigger)" } else { "" });
        Ok(())
    }

    /// Start sampling with the last applied configuration.
    ///
    /// An engine that fails to prepare aborts arming; an engine prepared before it is left as
    /// is, and has to be disarmed before retrying.
    pub fn arm(&mut self) -> Result<()> {
        if self.purpose == Purpose::HostRequest {
            self.host.request_capturing()?;
        }

        self.modify_indicators(|val| {
            val.insert(Indicators::Armed);
            val.remove(Indicators::Triggered);
        });

        let digital_enabled = self.digital_channels > 0;
        let analog_enabled = self.analog_channels > 0;
        self.rendezvous.begin(digital_enabled, analog_enabled);
        self.prefill.reset();

        if digital_enabled {
            self.digital.prepare_to_arm()?;
        } else {
            self.prefill.mark_done(Half::Digital);
        }
        if analog_enabled {
            self.analog.prepare_to_arm()?;
        } else {
            self.prefill.mark_done(Half::Analog);
        }

        let cycle = self.rendezvous.generation();
        if digital_enabled {
            self.digital.arm(cycle);
        }
        if analog_enabled {
            self.analog.arm(cycle);
        }
        log::debug!("armed cycle {}", cycle);
        Ok(())
    }

    /// Stop sampling. Disarming a disarmed device is not an error; every enabled engine is told
    /// to stop even if another one fails to.
    pub fn disarm(&mut self) -> Result<()> {
        self.modify_indicators(|val| val.remove(Indicators::Armed | Indicators::Triggered));
        self.rendezvous.cancel();

        let mut result = Ok(());
        if self.digital_channels > 0 {
            record_failure(&mut result, self.digital.disarm());
        }
        if self.analog_channels > 0 {
            record_failure(&mut result, self.analog.disarm());
        }
        result
    }

    /// Host "start": arm with the last host configuration, restoring it first if the host had
    /// stopped the device in the meantime.
    pub fn start(&mut self) -> Result<()> {
        if self.host_config.sample_rate == 0 {
            log::info!("start requested before any host configuration");
            return Err(Error::UnsupportedSampleRate)
        }

        let mut result = Ok(());
        if self.host_intent == HostIntent::Disarmed {
            record_failure(&mut result, self.disarm());
            self.init();
            let config = self.host_config;
            record_failure(&mut result, self.configure(&config));
        }
        self.host_intent = HostIntent::Armed;
        record_failure(&mut result, self.arm());
        result
    }

    /// Host "stop": disarm, then keep the analog front-end lightly busy until the next start.
    pub fn stop(&mut self) -> Result<()> {
        let mut result = self.disarm();
        if self.host_intent == HostIntent::Armed {
            self.host_intent = HostIntent::Disarmed;
        }
        record_failure(&mut result, self.hot_standby());
        result
    }

    /// Run short-shot probes of both analog inputs at the widest range between captures.
    pub fn hot_standby(&mut self) -> Result<()> {
        self.init();
        self.configure_for_calibration(ANALOG_RANGES as u8 - 1, AnalogChannels::ShortShot)
    }

    /// Configure and arm a capture of both analog inputs at `volts_per_div` for calibration.
    pub fn configure_for_calibration(&mut self, volts_per_div: u8, analog: AnalogChannels)
            -> Result<()> {
        log::debug!("configure_for_calibration({}, {:?})", volts_per_div, analog);
        self.calibration_config = CaptureConfig::calibration(volts_per_div, analog);
        let config = self.calibration_config;
        if let Err(error) = self.configure(&config) {
            log::debug!("calibration capture not armed: {}", error);
            return Err(error)
        }
        self.arm()
    }

    /// Whether the samples of the current capture are discarded rather than sent to the host.
    pub fn will_waste(&self) -> bool {
        self.purpose == Purpose::ShortShot
    }

    /// Completion callbacks of the engines. Reports carry the cycle the engine was armed for;
    /// reports for any cycle but the current one are dropped.
    pub fn report_digital_done(&mut self, report: &EngineReport) {
        let outcome = self.rendezvous.done(Half::Digital, report);
        self.deliver(outcome)
    }

    pub fn report_digital_failed(&mut self, cycle: u32, error: Error) {
        let outcome = self.rendezvous.failed(Half::Digital, cycle, error);
        self.deliver(outcome)
    }

    pub fn report_analog_done(&mut self, report: &EngineReport) {
        let outcome = self.rendezvous.done(Half::Analog, report);
        self.deliver(outcome)
    }

    pub fn report_analog_failed(&mut self, cycle: u32, error: Error) {
        let outcome = self.rendezvous.failed(Half::Analog, cycle, error);
        self.deliver(outcome)
    }

    pub fn report_triggered(&mut self) {
        self.modify_indicators(|val| val.insert(Indicators::Triggered))
    }

    fn deliver(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Nothing => (),
            Outcome::Samples(samples) => {
                log::debug!("cycle {} complete", self.rendezvous.generation());
                self.host.send_samples(&samples)
            }
            Outcome::Failed(error) => {
                log::info!("cycle {} failed: {}", self.rendezvous.generation(), error);
                self.host.signal_failed_sampling(error)
            }
        }
    }

    fn modify_indicators<F: FnOnce(&mut Indicators)>(&mut self, f: F) {
        let mut value = self.indicators;
        f(&mut value);
        if value != self.indicators {
            log::trace!("indicators {:?}", value);
        }
        self.indicators = value;
        self.host.write_indicators(value)
    }

    /// Flags the engines poll to learn whether the other engine has finished prefilling.
    pub fn prefill_status(&self) -> Arc<PrefillStatus> {
        self.prefill.clone()
    }

    pub fn clock_config(&self) -> &'static ClockConfig {
        self.sample_clock.config()
    }

    pub fn sample_rate(&self) -> u32 {
        self.clock_config().sample_rate
    }

    pub fn analog_match_value(&self) -> u16 {
        self.clock_config().counter
    }

    /// Frequency the analog converter runs at; not the same as the sample rate.
    pub fn adc_frequency(&self) -> u32 {
        self.clock_config().pll_freq
    }

    pub fn enabled_channels(&self) -> (u32, u32) {
        (self.digital_channels, self.analog_channels)
    }

    pub fn digital_buffer(&self) -> CaptureBuffer {
        self.digital_buffer
    }

    pub fn analog_buffer(&self) -> CaptureBuffer {
        self.analog_buffer
    }

    pub fn purpose(&self) -> Purpose {
        self.purpose
    }

    pub fn host_intent(&self) -> HostIntent {
        self.host_intent
    }

    pub fn host_config(&self) -> &CaptureConfig {
        &self.host_config
    }

    pub fn indicators(&self) -> Indicators {
        self.indicators
    }

    /// Number of arm cycles so far.
    pub fn cycle(&self) -> u32 {
        self.rendezvous.generation()
    }
}

/// Rejects sample rate and channel combinations the engines cannot keep up with.
#[cfg(feature = "weighted-config-check")]
fn check_combination(config: &CaptureConfig) -> Result<()> {
    use crate::config::DIGITAL_CHANNEL_MASK;

    // below this PLL0AUDIO can take seconds to lock
    const MIN_SAMPLE_RATE: u32 = 20_000;
    const MHZ: u32 = 1_000_000;

    let rate = config.sample_rate;
    let analog_channels = config.analog_channels.count();
    if rate < MIN_SAMPLE_RATE {
        log::info!("sample rate {} Hz is below {} Hz", rate, MIN_SAMPLE_RATE);
        return Err(Error::InvalidSignalCombination)
    }

    if analog_channels == 0 {
        let channels = config.digital.enabled_channels & DIGITAL_CHANNEL_MASK;
        let triggers = config.digital.enabled_triggers & DIGITAL_CHANNEL_MASK != 0;
        let legal = if channels > 0xff {
            rate <= 20 * MHZ
        } else if channels > 0x0f {
            rate <= 50 * MHZ && !(triggers && rate > 40 * MHZ)
        } else if channels > 0x03 {
            !(triggers && rate > 80 * MHZ)
        } else {
            true
        };
        if !legal {
            log::info!("{} Hz is too fast for digital channels {:#x}{}", rate, channels,
                if triggers { " with triggers" } else { "" });
            return Err(Error::InvalidSignalCombination)
        }
        return Ok(())
    }

    if config.digital_channels == 0 {
        if rate > 60 * MHZ || (analog_channels >= 2 && rate > 30 * MHZ) {
            log::info!("{} Hz is too fast for {} analog channels", rate, analog_channels);
            return Err(Error::UnsupportedSampleRate)
        }
        return Ok(())
    }

    if rate > 20 * MHZ {
        log::info!("{} Hz is too fast for mixed analog and digital capture", rate);
        return Err(Error::InvalidSignalCombination)
    }
    Ok(())
}

#[cfg(not(feature = "weighted-config-check"))]
fn check_combination(_config: &CaptureConfig) -> Result<()> {
    Ok(())
}
