use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use log::{error, info};

use crate::software_device::SoftwareToneDevice;
use crate::tone_device::DeviceError;

/// Live audio output via cpal, rendering a `SoftwareToneDevice`.
///
/// Holds the cpal `Stream` alive. Drop this to stop playback. The device
/// clock advances with the output callback, so tones scheduled by the
/// session line up with what is actually heard.
pub struct AudioOutput {
    _stream: Stream,
    pub sample_rate: u32,
}

impl AudioOutput {
    /// Open the default output device and start streaming `device`.
    /// Returns immediately; audio is pulled on cpal's callback thread.
    pub fn start(device: SoftwareToneDevice) -> Result<Self, DeviceError> {
        let host = cpal::default_host();

        let output = host
            .default_output_device()
            .ok_or_else(|| DeviceError::Unavailable("no default audio output device".into()))?;

        info!(
            "Audio output: {}",
            output.name().unwrap_or_else(|_| "unknown".into())
        );

        let supported = output
            .default_output_config()
            .map_err(|e| DeviceError::Unavailable(format!("no supported output config: {e}")))?;

        let sample_rate = supported.sample_rate().0;
        let format = supported.sample_format();
        let config: StreamConfig = supported.into();
        device.set_sample_rate(sample_rate);

        info!(
            "Audio output config: {} Hz, {} ch, {:?}",
            sample_rate, config.channels, format
        );

        let stream = match format {
            SampleFormat::F32 => build_stream::<f32>(&output, &config, device)?,
            SampleFormat::I16 => build_stream::<i16>(&output, &config, device)?,
            SampleFormat::U16 => build_stream::<u16>(&output, &config, device)?,
            other => {
                return Err(DeviceError::Unavailable(format!(
                    "unsupported sample format: {other:?}"
                )))
            }
        };

        stream
            .play()
            .map_err(|e| DeviceError::Backend(format!("failed to start output stream: {e}")))?;

        Ok(Self {
            _stream: stream,
            sample_rate,
        })
    }
}

fn build_stream<S>(
    output: &cpal::Device,
    config: &StreamConfig,
    device: SoftwareToneDevice,
) -> Result<Stream, DeviceError>
where
    S: SizedSample + FromSample<f32>,
{
    let channels = config.channels.max(1) as usize;
    let mut mono: Vec<f32> = Vec::new();
    let err_fn = |e: cpal::StreamError| error!("Audio output stream error: {e}");

    output
        .build_output_stream(
            config,
            move |data: &mut [S], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                mono.resize(frames, 0.0);
                device.render(&mut mono);
                for (frame, &sample) in data.chunks_mut(channels).zip(mono.iter()) {
                    let value = S::from_sample(sample);
                    frame.iter_mut().for_each(|out| *out = value);
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| DeviceError::Backend(format!("failed to build output stream: {e}")))
}
