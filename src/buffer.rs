use crate::{Error, Result};
use crate::config::{AnalogChannels, DIGITAL_CHANNEL_MASK};
use crate::regs::memory::{
    BUFFER_COMBINATIONS,
    SAMPLE_MEMORY_START,
    SAMPLE_MEMORY_SIZE,
    SAMPLE_MEMORY_END,
    SHORT_SHOT_SAMPLES,
};

/// A region of sample memory handed to a capture engine, used by it as a circular buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureBuffer {
    pub start: u32,
    pub size: u32,
}

impl CaptureBuffer {
    pub fn new(start: u32, size: u32) -> CaptureBuffer {
        CaptureBuffer { start, size }
    }

    /// The whole sample memory.
    pub fn full() -> CaptureBuffer {
        CaptureBuffer::new(SAMPLE_MEMORY_START, SAMPLE_MEMORY_SIZE)
    }

    pub fn end(&self) -> u32 {
        self.start + self.size
    }
}

/// Buffers for the engines that take part in a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BufferPlan {
    pub digital: Option<CaptureBuffer>,
    pub analog: Option<CaptureBuffer>,
}

impl BufferPlan {
    /// Partition the sample memory for the enabled channels.
    ///
    /// With only digital or only analog channels the whole memory is one buffer. With both, the
    /// digital engine has to copy every channel up to the highest enabled one, so the split is
    /// looked up by that number rather than by `digital_channels`. Any gap between the two
    /// buffers stays unused so that the analog buffer ends at the top of the memory.
    pub fn new(analog: AnalogChannels, digital_channels: u32, digital_mask: u32)
            -> Result<BufferPlan> {
        let analog_channels = match analog {
            AnalogChannels::Literal(0) =>
                return Ok(BufferPlan { digital: Some(CaptureBuffer::full()), analog: None }),
            AnalogChannels::ShortShot if digital_channels == 0 => {
                let size = SHORT_SHOT_SAMPLES * core::mem::size_of::<u16>() as u32;
                let buffer = CaptureBuffer::new(SAMPLE_MEMORY_START, size);
                return Ok(BufferPlan { digital: None, analog: Some(buffer) })
            }
            AnalogChannels::ShortShot => {
                log::info!("short-shot capture cannot include digital channels");
                return Err(Error::InvalidSignalCombination)
            }
            analog => analog.count(),
        };

        if digital_channels == 0 {
            return Ok(BufferPlan { digital: None, analog: Some(CaptureBuffer::full()) })
        }

        let copied_channels = 32 - (digital_mask & DIGITAL_CHANNEL_MASK).leading_zeros();
        let combination = BUFFER_COMBINATIONS.iter()
            .find(|row| row.analog == analog_channels && row.digital == copied_channels);
        match combination {
            Some(row) => {
                let plan = BufferPlan {
                    digital: Some(CaptureBuffer::new(SAMPLE_MEMORY_START,
                        row.digital_end - SAMPLE_MEMORY_START)),
                    analog: Some(CaptureBuffer::new(row.analog_start,
                        SAMPLE_MEMORY_END - row.analog_start)),
                };
                log::trace!("buffer plan for {} analog, {} digital: {:x?}",
                    analog_channels, copied_channels, plan);
                Ok(plan)
            }
            None => {
                log::info!("no buffer split for {} analog and {} digital channels (mask {:#x})",
                    analog_channels, copied_channels, digital_mask);
                Err(Error::InvalidSignalCombination)
            }
        }
    }
}
