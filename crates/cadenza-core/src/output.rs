//! CPAL audio output backend.

use crate::backend::AudioBackend;
use crate::callback::RenderCallback;
use crate::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

#[derive(Debug, Clone, Default)]
pub struct AudioOutputConfig {
    pub output_device_index: Option<usize>,
}

/// Wrapper to hold a `cpal::Stream` in a `Send` context.
///
/// `cpal::Stream` is `!Send` on some platforms. `AudioOutput` is only driven from behind the
/// engine's mutex and the stream stays owned by it until stopped.
struct StreamHandle(#[allow(dead_code)] cpal::Stream);

// SAFETY: the stream is only touched behind the engine's Mutex and is never accessed
// concurrently.
unsafe impl Send for StreamHandle {}

pub struct AudioOutput {
    sample_rate: f64,
    channels: usize,
    output_device_index: Option<usize>,
    stream: Option<StreamHandle>,
}

impl AudioOutput {
    pub fn new(config: AudioOutputConfig) -> Result<Self> {
        let device = Self::get_device(config.output_device_index)?;
        let output_config = device.default_output_config()?;

        Ok(Self {
            sample_rate: output_config.sample_rate().0 as f64,
            channels: output_config.channels() as usize,
            output_device_index: config.output_device_index,
            stream: None,
        })
    }

    fn get_device(index: Option<usize>) -> Result<cpal::Device> {
        let host = cpal::default_host();

        if let Some(idx) = index {
            let devices: Vec<_> = host.output_devices()?.collect();

            let device_count = devices.len();
            devices.into_iter().nth(idx).ok_or_else(|| {
                Error::InvalidDevice(format!(
                    "Output device index {} out of range (available: {})",
                    idx, device_count
                ))
            })
        } else {
            host.default_output_device()
                .ok_or_else(|| Error::InvalidDevice("No output device available".to_string()))
        }
    }

    fn build_stream<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        mut callback: RenderCallback,
    ) -> Result<cpal::Stream>
    where
        T: cpal::SizedSample + cpal::FromSample<f32>,
    {
        let channels = config.channels as usize;
        let mut scratch = vec![0.0f32; 8192 * channels];

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    for chunk in data.chunks_mut(scratch.len().max(channels)) {
                        let out = &mut scratch[..chunk.len()];
                        callback.process_interleaved(out, channels);
                        for (sample, value) in chunk.iter_mut().zip(out.iter()) {
                            *sample = T::from_sample(*value);
                        }
                    }
                }));

                if result.is_err() {
                    for sample in data.iter_mut() {
                        *sample = T::from_sample(0.0);
                    }
                }
            },
            |err| {
                tracing::warn!(error = %err, "audio stream error");
            },
            None,
        )?;

        Ok(stream)
    }

    pub fn set_output_device(&mut self, index: Option<usize>) {
        self.output_device_index = index;
    }

    /// List available output devices.
    pub fn list_output_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices: Result<Vec<String>> = host
            .output_devices()?
            .enumerate()
            .map(|(idx, device)| Ok(format!("{}: {}", idx, device.name()?)))
            .collect();
        devices
    }
}

impl AudioBackend for AudioOutput {
    fn name(&self) -> String {
        Self::get_device(self.output_device_index)
            .and_then(|device| Ok(device.name()?))
            .unwrap_or_else(|_| "unknown".to_string())
    }

    fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    fn channels(&self) -> usize {
        self.channels
    }

    fn start(&mut self, callback: RenderCallback) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let device = Self::get_device(self.output_device_index)?;
        let config = device.default_output_config()?;

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => Self::build_stream::<f32>(&device, &config.into(), callback)?,
            cpal::SampleFormat::I16 => Self::build_stream::<i16>(&device, &config.into(), callback)?,
            cpal::SampleFormat::U16 => Self::build_stream::<u16>(&device, &config.into(), callback)?,
            format => {
                return Err(Error::InvalidConfig(format!(
                    "Unsupported sample format: {:?}",
                    format
                )));
            }
        };

        stream.play()?;
        self.stream = Some(StreamHandle(stream));
        tracing::debug!(
            sample_rate = self.sample_rate,
            channels = self.channels,
            "audio output started"
        );
        Ok(())
    }

    fn stop(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("audio output stopped");
        }
    }

    fn is_running(&self) -> bool {
        self.stream.is_some()
    }
}
