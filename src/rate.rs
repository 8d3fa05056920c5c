use crate::{Error, Result};
use crate::regs::cgu::{self, ClockConfig, ClockDomain, CLOCK_CONFIGS};
use crate::sys::ClockDriver;

/// Position of an entry in the clock configuration table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateIndex(usize);

impl RateIndex {
    pub const INITIAL: RateIndex = RateIndex(cgu::INITIAL_RATE_INDEX);

    /// Find the table entry for exactly `sample_rate`.
    ///
    /// With no analog channels enabled the digital-only high speed range is searched first; the
    /// general range is always searched last (and exclusively when analog channels are enabled).
    pub fn find(sample_rate: u32, analog_channels: u32) -> Option<RateIndex> {
        let found = if analog_channels == 0 {
            search_range(cgu::DIGITAL_ONLY_RANGE_START, sample_rate)
                .or_else(|| search_range(cgu::GENERAL_RANGE_START, sample_rate))
        } else {
            search_range(cgu::GENERAL_RANGE_START, sample_rate)
        };
        log::trace!("find({}, {}) = {:?}", sample_rate, analog_channels, found);
        found.map(RateIndex)
    }

    pub fn get(self) -> usize {
        self.0
    }

    pub fn config(self) -> &'static ClockConfig {
        &CLOCK_CONFIGS[self.0]
    }
}

fn search_range(start: usize, sample_rate: u32) -> Option<usize> {
    CLOCK_CONFIGS[start..].iter()
        .take_while(|config| !config.is_sentinel())
        .position(|config| config.sample_rate == sample_rate)
        .map(|offset| start + offset)
}

/// The PLL0AUDIO setting currently in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleClock {
    current: RateIndex,
    analog_channels: Option<u32>,
}

impl Default for SampleClock {
    fn default() -> Self {
        SampleClock { current: RateIndex::INITIAL, analog_channels: None }
    }
}

impl SampleClock {
    pub fn current(&self) -> RateIndex {
        self.current
    }

    pub fn config(&self) -> &'static ClockConfig {
        self.current.config()
    }

    /// Program the power-up rate. The dependent clock domains are not running yet, so they are
    /// not gated.
    pub fn apply_initial<C: ClockDriver>(&mut self, clock: &mut C) {
        let config = RateIndex::INITIAL.config();
        clock.set_pll0audio(config.msel, config.nsel, config.psel);
        self.current = RateIndex::INITIAL;
        clock.update_clocks();
        log::debug!("initial sample rate {} Hz (index {})",
            config.sample_rate, self.current.get());
    }

    pub fn set_sample_rate<C: ClockDriver>(&mut self, clock: &mut C, sample_rate: u32,
            analog_channels: u32) -> Result<()> {
        match RateIndex::find(sample_rate, analog_channels) {
            Some(index) => self.select_and_apply(clock, index, analog_channels),
            None => {
                log::info!("failed to change sample rate to {} Hz, keeping it at {} Hz",
                    sample_rate, self.config().sample_rate);
                Err(Error::UnsupportedSampleRate)
            }
        }
    }

    /// Switch PLL0AUDIO to the entry at `index`; a no-op if it is already in effect for the same
    /// number of analog channels.
    pub fn select_and_apply<C: ClockDriver>(&mut self, clock: &mut C, index: RateIndex,
            analog_channels: u32) -> Result<()> {
        if self.current == index && self.analog_channels == Some(analog_channels) {
            return Ok(())
        }

        let config = index.config();
        if analog_channels == 2 && config.counter == 1 {
            // two channels sample at twice the rate, which would need a match value of 0.5
            log::info!("{} Hz cannot be sampled on two analog channels", config.sample_rate);
            return Err(Error::UnsupportedSampleRate)
        }

        let old_sample_rate = self.config().sample_rate;
        for domain in ClockDomain::ALL {
            clock.set_domain_enabled(domain, false);
        }
        clock.set_pll0audio(config.msel, config.nsel, config.psel);
        self.current = index;
        clock.update_clocks();
        for domain in ClockDomain::ALL {
            clock.set_domain_enabled(domain, true);
        }
        self.analog_channels = Some(analog_channels);
        log::debug!("changed sample rate from {} Hz to {} Hz (index {})",
            old_sample_rate, config.sample_rate, index.get());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sys::sim::{SimClock, ClockEvent};

    #[test]
    fn test_find_general_range() {
        for (index, config) in CLOCK_CONFIGS[..cgu::DIGITAL_ONLY_RANGE_START - 1].iter().enumerate() {
            for analog_channels in [1, 2] {
                assert_eq!(RateIndex::find(config.sample_rate, analog_channels),
                    Some(RateIndex(index)));
            }
        }
    }

    #[test]
    fn test_find_digital_only_range() {
        // 90 and 100 MHz exist only in the digital-only range
        assert_eq!(RateIndex::find(90_000_000, 0), Some(RateIndex(33)));
        assert_eq!(RateIndex::find(100_000_000, 0), Some(RateIndex(34)));
        assert_eq!(RateIndex::find(90_000_000, 1), None);
        assert_eq!(RateIndex::find(100_000_000, 2), None);
        // rates in both ranges prefer the digital-only range without analog channels
        assert_eq!(RateIndex::find(10_000_000, 0), Some(RateIndex(25)));
        assert_eq!(RateIndex::find(10_000_000, 1), Some(RateIndex(16)));
        // rates below the digital-only range fall back to the general range
        assert_eq!(RateIndex::find(50, 0), Some(RateIndex(0)));
    }

    #[test]
    fn test_find_exact_only() {
        assert_eq!(RateIndex::find(0, 0), None);
        assert_eq!(RateIndex::find(1_500_000, 1), None);
        assert_eq!(RateIndex::find(2_000_001, 0), None);
    }

    #[test]
    fn test_table_ranges_unique() {
        for start in [cgu::GENERAL_RANGE_START, cgu::DIGITAL_ONLY_RANGE_START] {
            let rates = CLOCK_CONFIGS[start..].iter()
                .take_while(|config| !config.is_sentinel())
                .map(|config| config.sample_rate)
                .collect::<Vec<_>>();
            let mut unique = rates.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(rates.len(), unique.len());
        }
        assert!(CLOCK_CONFIGS[cgu::DIGITAL_ONLY_RANGE_START - 1].is_sentinel());
        assert!(CLOCK_CONFIGS.last().unwrap().is_sentinel());
    }

    #[test]
    fn test_select_and_apply_idempotent() {
        let mut clock = SimClock::default();
        let mut sample_clock = SampleClock::default();
        sample_clock.set_sample_rate(&mut clock, 1_000_000, 1).unwrap();
        assert_eq!(clock.gate_cycles(), 1);
        assert_eq!(sample_clock.config().counter, 80);
        sample_clock.set_sample_rate(&mut clock, 1_000_000, 1).unwrap();
        assert_eq!(clock.gate_cycles(), 1);
        // same rate, different channel context
        sample_clock.set_sample_rate(&mut clock, 1_000_000, 2).unwrap();
        assert_eq!(clock.gate_cycles(), 2);
    }

    #[test]
    fn test_select_and_apply_sequence() {
        let mut clock = SimClock::default();
        let mut sample_clock = SampleClock::default();
        sample_clock.set_sample_rate(&mut clock, 30_000_000, 0).unwrap();
        assert_eq!(sample_clock.current(), RateIndex(27));
        assert_eq!(clock.events, [
            ClockEvent::Domain(ClockDomain::Peripheral, false),
            ClockEvent::Domain(ClockDomain::Vadc, false),
            ClockEvent::Pll(15, 1, 1),
            ClockEvent::Update,
            ClockEvent::Domain(ClockDomain::Peripheral, true),
            ClockEvent::Domain(ClockDomain::Vadc, true),
        ]);
    }

    #[test]
    fn test_two_channels_counter_one_rejected() {
        let mut clock = SimClock::default();
        let mut sample_clock = SampleClock::default();
        for rate in [50_000_000, 60_000_000, 70_000_000, 80_000_000] {
            assert!(matches!(sample_clock.set_sample_rate(&mut clock, rate, 2),
                Err(Error::UnsupportedSampleRate)));
        }
        assert_eq!(clock.gate_cycles(), 0);
        assert_eq!(sample_clock.current(), RateIndex::INITIAL);
        // the same rates are fine on one channel
        sample_clock.set_sample_rate(&mut clock, 50_000_000, 1).unwrap();
        assert_eq!(sample_clock.config().counter, 1);
    }

    #[test]
    fn test_unknown_rate_keeps_clock() {
        let mut clock = SimClock::default();
        let mut sample_clock = SampleClock::default();
        assert!(matches!(sample_clock.set_sample_rate(&mut clock, 123, 0),
            Err(Error::UnsupportedSampleRate)));
        assert!(clock.events.is_empty());
    }
}
