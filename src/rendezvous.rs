//! Merging of the two capture engines' completion reports.
//!
//! Each arm cycle starts with both halves pending (or disabled, for an engine with no enabled
//! channels). Every engine reports exactly one outcome per cycle, from interrupt context; the
//! merged result is handed to the host once, when neither half is still waiting.

use std::sync::atomic::{AtomicU8, Ordering};

use crate::Error;
use crate::buffer::CaptureBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Half {
    Digital,
    Analog,
}

impl Half {
    fn bit(self) -> u8 {
        match self {
            Half::Digital => 1<<0,
            Half::Analog  => 1<<1,
        }
    }

    fn trigger_shift(self) -> u32 {
        match self {
            Half::Digital => 0,
            Half::Analog  => 16,
        }
    }
}

/// Result of one engine's capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineReport {
    /// Arm cycle the engine was started for.
    pub cycle: u32,
    pub buffer: CaptureBuffer,
    /// Trigger point bits, in the engine's own 16-bit half.
    pub trigger_point: u32,
    pub trigger_sample: u32,
    pub active_channels: u32,
}

/// Combined result of both engines, as sent to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapturedSamples {
    /// Digital trigger bits in the low half, analog trigger bits in the high half.
    pub trigger_point: u32,
    pub digital_trigger_sample: u32,
    pub analog_trigger_sample: u32,
    pub digital_active_channels: u32,
    pub analog_active_channels: u32,
    pub digital_buffer: Option<CaptureBuffer>,
    pub analog_buffer: Option<CaptureBuffer>,
}

impl CapturedSamples {
    fn merge(&mut self, half: Half, report: &EngineReport) {
        self.trigger_point |= report.trigger_point << half.trigger_shift();
        match half {
            Half::Digital => {
                self.digital_trigger_sample = report.trigger_sample;
                self.digital_active_channels = report.active_channels;
                self.digital_buffer = Some(report.buffer);
            }
            Half::Analog => {
                self.analog_trigger_sample = report.trigger_sample;
                self.analog_active_channels = report.active_channels;
                self.analog_buffer = Some(report.buffer);
            }
        }
    }
}

/// Prefill completion flags, polled by the engines from interrupt context.
#[derive(Debug, Default)]
pub struct PrefillStatus(AtomicU8);

impl PrefillStatus {
    pub fn reset(&self) {
        self.0.store(0, Ordering::Release)
    }

    pub fn mark_done(&self, half: Half) {
        self.0.fetch_or(half.bit(), Ordering::AcqRel);
    }

    pub fn is_done(&self, half: Half) -> bool {
        self.0.load(Ordering::Acquire) & half.bit() != 0
    }

    pub fn is_complete(&self) -> bool {
        self.is_done(Half::Digital) && self.is_done(Half::Analog)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Disabled,
    Waiting,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Disarmed,
    Pending { digital: Slot, analog: Slot },
    Complete,
}

/// What has to be reported to the host after an engine callback.
#[derive(Debug)]
pub(crate) enum Outcome {
    Nothing,
    Samples(CapturedSamples),
    Failed(Error),
}

#[derive(Debug)]
pub(crate) struct Rendezvous {
    generation: u32,
    phase: Phase,
    samples: CapturedSamples,
    failure: Option<Error>,
}

impl Default for Rendezvous {
    fn default() -> Self {
        Rendezvous {
            generation: 0,
            phase: Phase::Disarmed,
            samples: CapturedSamples::default(),
            failure: None,
        }
    }
}

impl Rendezvous {
    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.phase, Phase::Pending { .. })
    }

    #[cfg(test)]
    pub fn samples(&self) -> &CapturedSamples {
        &self.samples
    }

    /// Start a new arm cycle.
    pub fn begin(&mut self, digital_enabled: bool, analog_enabled: bool) {
        let slot = |enabled| if enabled { Slot::Waiting } else { Slot::Disabled };
        self.generation = self.generation.wrapping_add(1);
        self.phase = Phase::Pending { digital: slot(digital_enabled), analog: slot(analog_enabled) };
        self.samples = CapturedSamples::default();
        self.failure = None;
        log::trace!("cycle {}: {:?}", self.generation, self.phase);
    }

    /// Abandon the current cycle; reports arriving after this are dropped.
    pub fn cancel(&mut self) {
        if self.is_pending() {
            log::debug!("cycle {}: cancelled", self.generation);
            self.phase = Phase::Disarmed;
        }
    }

    fn slots(&self, half: Half) -> Option<(Slot, Slot)> {
        match (self.phase, half) {
            (Phase::Pending { digital, analog }, Half::Digital) => Some((digital, analog)),
            (Phase::Pending { digital, analog }, Half::Analog) => Some((analog, digital)),
            _ => None,
        }
    }

    fn set_slot(&mut self, half: Half, slot: Slot) {
        if let Phase::Pending { digital, analog } = &mut self.phase {
            match half {
                Half::Digital => *digital = slot,
                Half::Analog => *analog = slot,
            }
        }
    }

    fn own_slot_waiting(&self, half: Half, cycle: u32) -> Option<Slot> {
        if cycle != self.generation {
            log::debug!("cycle {}: ignoring {:?} report from cycle {}",
                self.generation, half, cycle);
            return None
        }
        match self.slots(half) {
            Some((Slot::Waiting, other)) => Some(other),
            Some((own, _)) => {
                log::debug!("cycle {}: ignoring {:?} report in state {:?}",
                    self.generation, half, own);
                None
            }
            None => {
                log::debug!("cycle {}: ignoring {:?} report while {:?}",
                    self.generation, half, self.phase);
                None
            }
        }
    }

    pub fn done(&mut self, half: Half, report: &EngineReport) -> Outcome {
        let Some(other) = self.own_slot_waiting(half, report.cycle)
            else { return Outcome::Nothing };
        self.samples.merge(half, report);
        self.set_slot(half, Slot::Done);
        log::trace!("cycle {}: {:?} done, {:x?}", self.generation, half, report);
        match other {
            Slot::Waiting => Outcome::Nothing,
            Slot::Disabled | Slot::Done => {
                self.phase = Phase::Complete;
                Outcome::Samples(self.samples)
            }
            Slot::Failed => {
                self.phase = Phase::Complete;
                Outcome::Failed(self.failure.take().unwrap_or(Error::SamplingFailed))
            }
        }
    }

    /// A failure is surfaced even when the other engine is enabled: at once if that engine has
    /// already finished, otherwise held until it reports. When both engines fail, the later error
    /// is reported.
    pub fn failed(&mut self, half: Half, cycle: u32, error: Error) -> Outcome {
        let Some(other) = self.own_slot_waiting(half, cycle) else { return Outcome::Nothing };
        self.set_slot(half, Slot::Failed);
        log::debug!("cycle {}: {:?} failed: {}", self.generation, half, error);
        match other {
            Slot::Waiting => {
                // let the other engine finish; its report completes the cycle
                self.failure = Some(error);
                Outcome::Nothing
            }
            Slot::Disabled | Slot::Done | Slot::Failed => {
                self.phase = Phase::Complete;
                self.failure = None;
                Outcome::Failed(error)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn report(trigger_point: u32, start: u32) -> EngineReport {
        report_for(1, trigger_point, start)
    }

    fn report_for(cycle: u32, trigger_point: u32, start: u32) -> EngineReport {
        EngineReport {
            cycle,
            buffer: CaptureBuffer::new(start, 0x100),
            trigger_point,
            trigger_sample: start & 0xff,
            active_channels: 0b11,
        }
    }

    #[test]
    fn test_both_halves() {
        let mut rendezvous = Rendezvous::default();
        rendezvous.begin(true, true);
        assert!(matches!(rendezvous.done(Half::Digital, &report(0x3, 0x2000_0010)),
            Outcome::Nothing));
        let Outcome::Samples(samples) = rendezvous.done(Half::Analog, &report(0x1, 0x2000_8020))
            else { panic!("expected samples") };
        assert_eq!(samples.trigger_point, 0x0001_0003);
        assert_eq!(samples.digital_trigger_sample, 0x10);
        assert_eq!(samples.analog_trigger_sample, 0x20);
        assert_eq!(samples.digital_buffer, Some(CaptureBuffer::new(0x2000_0010, 0x100)));
        assert_eq!(samples.analog_buffer, Some(CaptureBuffer::new(0x2000_8020, 0x100)));
        assert!(!rendezvous.is_pending());
    }

    #[test]
    fn test_disabled_half_presatisfied() {
        let mut rendezvous = Rendezvous::default();
        rendezvous.begin(false, true);
        let Outcome::Samples(samples) = rendezvous.done(Half::Analog, &report(0x1, 0x2000_0000))
            else { panic!("expected samples") };
        assert_eq!(samples.digital_buffer, None);
        assert_eq!(samples.trigger_point, 0x0001_0000);
    }

    #[test]
    fn test_at_most_once() {
        let mut rendezvous = Rendezvous::default();
        rendezvous.begin(true, false);
        assert!(matches!(rendezvous.done(Half::Digital, &report(1, 0)), Outcome::Samples(_)));
        assert!(matches!(rendezvous.done(Half::Digital, &report(1, 0)), Outcome::Nothing));
        assert!(matches!(rendezvous.failed(Half::Digital, 1, Error::SamplingFailed),
            Outcome::Nothing));
    }

    #[test]
    fn test_disabled_engine_report_ignored() {
        let mut rendezvous = Rendezvous::default();
        rendezvous.begin(false, true);
        assert!(matches!(rendezvous.done(Half::Digital, &report(1, 0)), Outcome::Nothing));
        assert!(rendezvous.is_pending());
        assert_eq!(rendezvous.samples().digital_buffer, None);
    }

    #[test]
    fn test_late_report_after_cancel() {
        let mut rendezvous = Rendezvous::default();
        rendezvous.begin(true, true);
        assert!(matches!(rendezvous.done(Half::Digital, &report(1, 0)), Outcome::Nothing));
        rendezvous.cancel();
        assert!(matches!(rendezvous.done(Half::Analog, &report(1, 0)), Outcome::Nothing));
        // the next cycle starts from scratch and does not take the old cycle's report
        rendezvous.begin(true, true);
        assert_eq!(rendezvous.generation(), 2);
        assert_eq!(*rendezvous.samples(), CapturedSamples::default());
        assert!(matches!(rendezvous.done(Half::Analog, &report_for(1, 0x7, 0)), Outcome::Nothing));
        assert!(matches!(rendezvous.failed(Half::Analog, 1, Error::Busy), Outcome::Nothing));
        assert_eq!(*rendezvous.samples(), CapturedSamples::default());
        assert!(matches!(rendezvous.done(Half::Digital, &report_for(2, 0x2, 0)), Outcome::Nothing));
        let Outcome::Samples(samples) = rendezvous.done(Half::Analog, &report_for(2, 0x3, 0))
            else { panic!("expected samples") };
        assert_eq!(samples.trigger_point, 0x0003_0002);
    }

    #[test]
    fn test_failure_after_other_done() {
        let mut rendezvous = Rendezvous::default();
        rendezvous.begin(true, true);
        assert!(matches!(rendezvous.done(Half::Digital, &report(1, 0)), Outcome::Nothing));
        assert!(matches!(rendezvous.failed(Half::Analog, 1, Error::Busy),
            Outcome::Failed(Error::Busy)));
        assert!(!rendezvous.is_pending());
        assert!(matches!(rendezvous.done(Half::Analog, &report(1, 0)), Outcome::Nothing));
    }

    #[test]
    fn test_both_failed_later_error_wins() {
        let mut rendezvous = Rendezvous::default();
        rendezvous.begin(true, true);
        assert!(matches!(rendezvous.failed(Half::Digital, 1, Error::Busy), Outcome::Nothing));
        assert!(matches!(rendezvous.failed(Half::Analog, 1, Error::SamplingFailed),
            Outcome::Failed(Error::SamplingFailed)));
        assert!(!rendezvous.is_pending());
        // the held error is gone with the cycle
        assert!(matches!(rendezvous.done(Half::Digital, &report(1, 0)), Outcome::Nothing));
        assert!(matches!(rendezvous.failed(Half::Analog, 1, Error::Busy), Outcome::Nothing));
    }

    #[test]
    fn test_held_failure_reported_once() {
        let mut rendezvous = Rendezvous::default();
        rendezvous.begin(true, true);
        assert!(matches!(rendezvous.failed(Half::Digital, 1, Error::Busy), Outcome::Nothing));
        assert!(matches!(rendezvous.done(Half::Analog, &report(1, 0)),
            Outcome::Failed(Error::Busy)));
        assert!(matches!(rendezvous.done(Half::Analog, &report(1, 0)), Outcome::Nothing));
        // a new cycle does not inherit the failure
        rendezvous.begin(false, true);
        assert!(matches!(rendezvous.done(Half::Analog, &report_for(2, 1, 0)),
            Outcome::Samples(_)));
    }

    #[test]
    fn test_failure_with_other_disabled() {
        let mut rendezvous = Rendezvous::default();
        rendezvous.begin(true, false);
        assert!(matches!(rendezvous.failed(Half::Digital, 1, Error::Busy),
            Outcome::Failed(Error::Busy)));
        assert!(!rendezvous.is_pending());
    }

    #[test]
    fn test_failure_waits_for_other() {
        let mut rendezvous = Rendezvous::default();
        rendezvous.begin(true, true);
        assert!(matches!(rendezvous.failed(Half::Analog, 1, Error::Busy), Outcome::Nothing));
        assert!(rendezvous.is_pending());
        assert!(matches!(rendezvous.done(Half::Digital, &report(1, 0)),
            Outcome::Failed(Error::Busy)));
        assert!(!rendezvous.is_pending());
    }

    #[test]
    fn test_prefill_status() {
        let prefill = PrefillStatus::default();
        prefill.mark_done(Half::Analog);
        assert!(prefill.is_done(Half::Analog));
        assert!(!prefill.is_complete());
        prefill.mark_done(Half::Digital);
        assert!(prefill.is_complete());
        prefill.reset();
        assert!(!prefill.is_done(Half::Digital));
    }
}
