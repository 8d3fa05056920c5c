//! Sample clock configurations.
//!
//! Both capture engines are clocked from PLL0AUDIO without additional integer dividers. Each
//! entry lists the PLL multiplier and dividers for a requested sample rate, together with the
//! counter (digital engine) or match value (analog engine) that divides the PLL output down to
//! the sample rate.

/// Clock domains fed by PLL0AUDIO; they must be gated while the PLL is reprogrammed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockDomain {
    Peripheral,
    Vadc,
}

impl ClockDomain {
    pub const ALL: [ClockDomain; 2] = [ClockDomain::Peripheral, ClockDomain::Vadc];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockConfig {
    /// Requested sample rate in Hz; `0` terminates a range of the table.
    pub sample_rate: u32,
    /// PLL0AUDIO multiplier.
    pub msel: u8,
    /// PLL0AUDIO pre-divider.
    pub nsel: u8,
    /// PLL0AUDIO post-divider.
    pub psel: u8,
    /// Counter for the digital engine, match value for the analog engine.
    pub counter: u16,
    /// Actual PLL0AUDIO output (fADC) in Hz.
    pub pll_freq: u32,
}

impl ClockConfig {
    pub(crate) fn is_sentinel(&self) -> bool {
        self.sample_rate == 0
    }
}

const fn rate(sample_rate: u32, msel: u8, nsel: u8, psel: u8, counter: u16, pll_freq: u32)
        -> ClockConfig {
    ClockConfig { sample_rate, msel, nsel, psel, counter, pll_freq }
}

const SENTINEL: ClockConfig = rate(0, 0, 0, 0, 0, 0);

/// Index of the 2 MHz entry selected at power-up.
pub const INITIAL_RATE_INDEX: usize = 14;

/// Start of the range usable by either engine.
pub const GENERAL_RANGE_START: usize = 0;

/// Start of the range that only the digital engine can sustain.
pub const DIGITAL_ONLY_RANGE_START: usize = 25;

pub static CLOCK_CONFIGS: [ClockConfig; 36] = [
    //      wanted     M    N   P  counter      fADC
    rate(       50, 100, 250, 24,    4000,    200_000),
    rate(      100, 100, 250, 12,    4000,    400_000),
    rate(      200, 100, 250,  6,    4000,    800_000),
    rate(      500, 100, 200,  3,    4000,  2_000_000),
    rate(    1_000, 100, 150,  2,    4000,  4_000_000),
    rate(    2_000, 100, 150,  1,    4000,  8_000_000),
    rate(    5_000, 100,  60,  1,    4000, 20_000_000),
    rate(   10_000, 100,  30,  1,    4000, 40_000_000),
    rate(   20_000, 100,  15,  1,    4000, 80_000_000),
    rate(   50_000, 100,  15,  1,    1600, 80_000_000),
    rate(  100_000, 100,  15,  1,     800, 80_000_000),
    rate(  200_000, 100,  15,  1,     400, 80_000_000),
    rate(  500_000, 100,  15,  1,     160, 80_000_000),
    rate(1_000_000, 100,  15,  1,      80, 80_000_000),
    rate(2_000_000, 100,  15,  1,      40, 80_000_000), // INITIAL_RATE_INDEX
    rate(5_000_000, 100,  15,  1,      16, 80_000_000),
    rate(10_000_000, 100, 15,  1,       8, 80_000_000),
    rate(20_000_000, 100, 15,  1,       4, 80_000_000),
    rate(30_000_000, 100, 20,  1,       2, 60_000_000),
    rate(40_000_000, 100, 15,  1,       2, 80_000_000),
    rate(50_000_000, 100, 24,  1,       1, 50_000_000),
    rate(60_000_000, 100, 20,  1,       1, 60_000_000),
    rate(70_000_000,  70, 12,  1,       1, 70_000_000),
    rate(80_000_000, 100, 15,  1,       1, 80_000_000),
    SENTINEL,
    rate( 10_000_000, 50,  3,  1,      20, 200_000_000), // DIGITAL_ONLY_RANGE_START
    rate( 20_000_000, 50,  3,  1,      10, 200_000_000),
    rate( 30_000_000, 15,  1,  1,       6, 180_000_000),
    rate( 40_000_000, 50,  3,  1,       5, 200_000_000),
    rate( 50_000_000, 50,  3,  1,       4, 200_000_000),
    rate( 60_000_000, 15,  1,  1,       3, 180_000_000),
    rate( 70_000_000, 70,  4,  1,       3, 210_000_000),
    rate( 80_000_000, 20,  1,  1,       3, 240_000_000),
    rate( 90_000_000, 15,  1,  1,       2, 180_000_000),
    rate(100_000_000, 50,  3,  1,       2, 200_000_000),
    SENTINEL,
];
