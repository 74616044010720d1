use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::ring_buffer::{ByteConsumer, ByteProducer, ByteRingBuffer};
use voxwire_foundation::{AudioError, AudioFormat};

/// Ring capacity in read cycles. At the default format one cycle is 10 ms,
/// so the callback can run ~640 ms ahead of a stalled reader before bytes
/// are shed.
const RING_CYCLES: usize = 64;

/// An open platform audio input. A line is opened for exactly one capture
/// session; `stop` and `close` are each called exactly once, by the capture
/// loop's teardown guard.
pub trait DeviceLine {
    fn start(&mut self) -> Result<(), AudioError>;
    /// Reads up to `buf.len()` PCM bytes. Returns 0 when no data is
    /// currently available; that is not an error.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, AudioError>;
    fn stop(&mut self);
    fn close(&mut self);
}

/// Seam between capture logic and the platform audio backend. Opening
/// happens on the thread that will read the line; `supports` is the
/// synchronous preflight used to fail a start before anything is spawned.
pub trait LineProvider: Send + Sync {
    /// Validates the format against the device without allocating any
    /// stream resources.
    fn supports(&self, format: &AudioFormat) -> Result<(), AudioError>;
    fn open(&self, format: &AudioFormat) -> Result<Box<dyn DeviceLine>, AudioError>;
}

/// CPAL-backed line provider. Streams are thread-affine, so the stream
/// itself is only built by `DeviceLine::start` on the capture thread.
pub struct CpalLineProvider {
    device_name: Option<String>,
}

impl CpalLineProvider {
    pub fn new(device_name: Option<String>) -> Self {
        Self { device_name }
    }

    fn find_device(&self) -> Result<cpal::Device, AudioError> {
        let host = cpal::default_host();
        match &self.device_name {
            Some(name) => {
                let mut devices = host.input_devices().map_err(|e| AudioError::Fatal(e.to_string()))?;
                devices
                    .find(|d| d.name().map(|n| &n == name).unwrap_or(false))
                    .ok_or_else(|| AudioError::DeviceNotFound {
                        name: Some(name.clone()),
                    })
            }
            None => host
                .default_input_device()
                .ok_or(AudioError::DeviceNotFound { name: None }),
        }
    }

    fn matching_config(
        device: &cpal::Device,
        format: &AudioFormat,
    ) -> Result<(StreamConfig, SampleFormat), AudioError> {
        format.validate()?;

        // The capture path carries 16-bit little-endian PCM; the callback
        // converts whatever the device delivers down to that.
        if format.bits_per_sample != 16 {
            return Err(AudioError::FormatNotSupported {
                format: format!("{} bits per sample (16 required)", format.bits_per_sample),
            });
        }

        let supported = device.supported_input_configs()?;
        for range in supported {
            if range.channels() != format.channels {
                continue;
            }
            let rate = format.sample_rate_hz;
            if rate < range.min_sample_rate() || rate > range.max_sample_rate() {
                continue;
            }
            if !matches!(
                range.sample_format(),
                SampleFormat::I16 | SampleFormat::F32 | SampleFormat::U16
            ) {
                continue;
            }
            let config = StreamConfig {
                channels: format.channels,
                sample_rate: rate,
                buffer_size: cpal::BufferSize::Default,
            };
            return Ok((config, range.sample_format()));
        }

        Err(AudioError::FormatNotSupported {
            format: format!(
                "{} Hz, {} channel(s)",
                format.sample_rate_hz, format.channels
            ),
        })
    }
}

impl LineProvider for CpalLineProvider {
    fn supports(&self, format: &AudioFormat) -> Result<(), AudioError> {
        let device = self.find_device()?;
        Self::matching_config(&device, format).map(|_| ())
    }

    fn open(&self, format: &AudioFormat) -> Result<Box<dyn DeviceLine>, AudioError> {
        let device = self.find_device()?;
        let (config, sample_format) = Self::matching_config(&device, format)?;
        if let Ok(name) = device.name() {
            tracing::info!("Opened input device: {}", name);
        }

        let ring = ByteRingBuffer::new(format.read_chunk_bytes() * RING_CYCLES);
        let (producer, consumer) = ring.split();

        Ok(Box::new(CpalDeviceLine {
            device: Some(device),
            config,
            sample_format,
            producer: Some(producer),
            consumer,
            stream: None,
            failed: Arc::new(AtomicBool::new(false)),
            overflow_bytes: Arc::new(AtomicU64::new(0)),
        }))
    }
}

pub struct CpalDeviceLine {
    device: Option<cpal::Device>,
    config: StreamConfig,
    sample_format: SampleFormat,
    producer: Option<ByteProducer>,
    consumer: ByteConsumer,
    stream: Option<Stream>,
    failed: Arc<AtomicBool>,
    overflow_bytes: Arc<AtomicU64>,
}

impl CpalDeviceLine {
    fn build_stream(&mut self) -> Result<Stream, AudioError> {
        let device = self
            .device
            .take()
            .ok_or_else(|| AudioError::Fatal("device line already started".to_string()))?;
        let producer = self
            .producer
            .take()
            .ok_or_else(|| AudioError::Fatal("device line already started".to_string()))?;
        let producer = Arc::new(Mutex::new(producer));
        let overflow = Arc::clone(&self.overflow_bytes);

        let failed = Arc::clone(&self.failed);
        let err_fn = move |err: cpal::StreamError| {
            tracing::error!("Audio stream error: {}", err);
            failed.store(true, Ordering::SeqCst);
        };

        // Common handler once samples are i16: push little-endian bytes
        let push_i16 = move |samples: &[i16]| {
            thread_local! {
                static BYTE_BUFFER: std::cell::RefCell<Vec<u8>> =
                    const { std::cell::RefCell::new(Vec::new()) };
            }
            BYTE_BUFFER.with(|buf| {
                let mut bytes = buf.borrow_mut();
                bytes.clear();
                bytes.reserve(samples.len() * 2);
                for &s in samples {
                    bytes.extend_from_slice(&s.to_le_bytes());
                }
                let written = producer.lock().write(&bytes);
                if written < bytes.len() {
                    overflow.fetch_add((bytes.len() - written) as u64, Ordering::Relaxed);
                }
            });
        };

        // Thread-local conversion buffer avoids allocations in the callback
        thread_local! {
            static CONVERT_BUFFER: std::cell::RefCell<Vec<i16>> =
                const { std::cell::RefCell::new(Vec::new()) };
        }

        let stream = match self.sample_format {
            SampleFormat::I16 => device.build_input_stream(
                &self.config,
                move |data: &[i16], _: &_| {
                    push_i16(data);
                },
                err_fn,
                None,
            )?,
            SampleFormat::F32 => device.build_input_stream(
                &self.config,
                move |data: &[f32], _: &_| {
                    CONVERT_BUFFER.with(|buf| {
                        let mut converted = buf.borrow_mut();
                        converted.clear();
                        converted.reserve(data.len());
                        // Clamp [-1.0, 1.0] and scale to i16
                        for &s in data {
                            let clamped = s.clamp(-1.0, 1.0);
                            converted.push((clamped * 32767.0).round() as i16);
                        }
                        push_i16(&converted);
                    });
                },
                err_fn,
                None,
            )?,
            SampleFormat::U16 => device.build_input_stream(
                &self.config,
                move |data: &[u16], _: &_| {
                    CONVERT_BUFFER.with(|buf| {
                        let mut converted = buf.borrow_mut();
                        converted.clear();
                        converted.reserve(data.len());
                        // Convert unsigned [0,65535] to signed [-32768,32767]
                        for &s in data {
                            converted.push((s as i32 - 32768) as i16);
                        }
                        push_i16(&converted);
                    });
                },
                err_fn,
                None,
            )?,
            other => {
                return Err(AudioError::FormatNotSupported {
                    format: format!("{:?}", other),
                });
            }
        };

        Ok(stream)
    }
}

impl DeviceLine for CpalDeviceLine {
    fn start(&mut self) -> Result<(), AudioError> {
        let stream = self.build_stream()?;
        stream.play()?;
        self.stream = Some(stream);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, AudioError> {
        if self.failed.load(Ordering::SeqCst) {
            return Err(AudioError::DeviceDisconnected);
        }
        Ok(self.consumer.read(buf))
    }

    fn stop(&mut self) {
        if let Some(stream) = &self.stream {
            if let Err(e) = stream.pause() {
                tracing::warn!("Failed to pause input stream: {}", e);
            }
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
        }
        let shed = self.overflow_bytes.load(Ordering::Relaxed);
        if shed > 0 {
            tracing::warn!("Device line shed {} bytes to a stalled reader", shed);
        }
    }
}
