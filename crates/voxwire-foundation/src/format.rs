use crate::error::AudioError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_SAMPLE_RATE_HZ: u32 = 16_000;
pub const DEFAULT_BITS_PER_SAMPLE: u16 = 16;
pub const DEFAULT_CHANNELS: u16 = 1;

/// Capture format supplied by the caller at start. Immutable for the
/// lifetime of a capture session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate_hz: u32,
    pub bits_per_sample: u16,
    pub channels: u16,
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            bits_per_sample: DEFAULT_BITS_PER_SAMPLE,
            channels: DEFAULT_CHANNELS,
        }
    }
}

impl AudioFormat {
    pub fn new(sample_rate_hz: u32, bits_per_sample: u16, channels: u16) -> Self {
        Self {
            sample_rate_hz,
            bits_per_sample,
            channels,
        }
    }

    /// Bytes spanning one sample across all channels.
    pub fn bytes_per_sample(&self) -> usize {
        (self.bits_per_sample as usize / 8) * self.channels as usize
    }

    /// Fixed per-cycle read size: the byte count spanning a 10 ms window
    /// at this rate and depth. 16 kHz / 16-bit / mono => 320.
    pub fn read_chunk_bytes(&self) -> usize {
        self.bytes_per_sample() * (self.sample_rate_hz as usize / 100)
    }

    pub fn validate(&self) -> Result<(), AudioError> {
        if self.sample_rate_hz == 0 || self.channels == 0 || self.bits_per_sample == 0 {
            return Err(AudioError::FormatNotSupported {
                format: format!("{:?}", self),
            });
        }
        if self.bits_per_sample % 8 != 0 {
            return Err(AudioError::FormatNotSupported {
                format: format!("bits_per_sample {} is not byte-aligned", self.bits_per_sample),
            });
        }
        Ok(())
    }
}
