//! Sample memory map.
//!
//! Both capture engines share one 64 KiB SRAM bank. With only one kind of signal enabled the
//! whole bank is a single buffer; with a mix of analog and digital signals it is split so that
//! both buffers hold the same number of samples, with the analog buffer ending at the top of
//! the bank.

pub const SAMPLE_MEMORY_START: u32 = 0x2000_0000;
pub const SAMPLE_MEMORY_SIZE: u32 = 0x1_0000;
pub const SAMPLE_MEMORY_END: u32 = SAMPLE_MEMORY_START + SAMPLE_MEMORY_SIZE;

/// Number of samples taken by a short-shot analog probe.
pub const SHORT_SHOT_SAMPLES: u32 = 1024;

/// Split of the sample memory for one analog/digital channel count combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferCombination {
    pub analog: u32,
    /// Number of digital channels copied by the digital engine, i.e. highest enabled + 1.
    pub digital: u32,
    pub digital_end: u32,
    pub analog_start: u32,
}

const fn row(analog: u32, digital: u32, digital_end: u32, analog_start: u32) -> BufferCombination {
    BufferCombination { analog, digital, digital_end, analog_start }
}

// When both engines run at the same rate the analog engine needs sixteen times the memory of
// a single digital channel; concatenation of digital data adds further alignment constraints.
pub static BUFFER_COMBINATIONS: [BufferCombination; 22] = [
    //  analog  digital  end of digital  start of analog
    row(1,       1,      0x2000_1C00,    0x2000_2000),
    row(1,       2,      0x2000_1C00,    0x2000_2000),
    row(1,       3,      0x2000_3300,    0x2000_3400),
    row(1,       4,      0x2000_3300,    0x2000_3400),
    row(1,       5,      0x2000_5400,    0x2000_5800),
    row(1,       6,      0x2000_5400,    0x2000_5800),
    row(1,       7,      0x2000_5400,    0x2000_5800),
    row(1,       8,      0x2000_5400,    0x2000_5800),
    row(1,       9,      0x2000_5A00,    0x2000_6000),
    row(1,      10,      0x2000_6180,    0x2000_6400),
    row(1,      11,      0x2000_65C0,    0x2000_6C00),
    row(2,       1,      0x2000_0F00,    0x2000_1000),
    row(2,       2,      0x2000_0F00,    0x2000_1000),
    row(2,       3,      0x2000_1C00,    0x2000_2000),
    row(2,       4,      0x2000_1C00,    0x2000_2000),
    row(2,       5,      0x2000_3200,    0x2000_3800),
    row(2,       6,      0x2000_3200,    0x2000_3800),
    row(2,       7,      0x2000_3200,    0x2000_3800),
    row(2,       8,      0x2000_3200,    0x2000_3800),
    row(2,       9,      0x2000_3600,    0x2000_4000),
    row(2,      10,      0x2000_3C00,    0x2000_4000),
    row(2,      11,      0x2000_3F40,    0x2000_4800),
];
