//! The outbound tone-synthesis capability.
//!
//! A device hands out tone sources (oscillators) and amplitude envelopes,
//! wires them together, and accepts parameter changes scheduled on its own
//! clock. Smooth ramps are optional: the default ramp methods fall back to
//! a stepped change at the ramp's end time.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ToneId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnvelopeId(pub u32);

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("tone device unavailable: {0}")]
    Unavailable(String),

    #[error("unknown tone source {0:?}")]
    UnknownTone(ToneId),

    #[error("unknown envelope {0:?}")]
    UnknownEnvelope(EnvelopeId),

    #[error("audio backend error: {0}")]
    Backend(String),
}

pub trait ToneDevice: Send {
    /// Device clock in seconds. Scheduled times are on this clock.
    fn current_time(&self) -> f64;

    fn create_tone(&mut self, frequency_hz: f64) -> Result<ToneId, DeviceError>;

    fn create_envelope(&mut self) -> Result<EnvelopeId, DeviceError>;

    /// Route source → envelope → output.
    fn connect(&mut self, tone: ToneId, envelope: EnvelopeId) -> Result<(), DeviceError>;

    fn set_gain(&mut self, envelope: EnvelopeId, value: f64, at: f64) -> Result<(), DeviceError>;

    fn set_frequency(&mut self, tone: ToneId, hz: f64, at: f64) -> Result<(), DeviceError>;

    fn start(&mut self, tone: ToneId, at: f64) -> Result<(), DeviceError>;

    fn stop(&mut self, tone: ToneId, at: f64) -> Result<(), DeviceError>;

    fn ramp_gain_linear(
        &mut self,
        envelope: EnvelopeId,
        value: f64,
        end: f64,
    ) -> Result<(), DeviceError> {
        self.set_gain(envelope, value, end)
    }

    fn ramp_gain_exponential(
        &mut self,
        envelope: EnvelopeId,
        value: f64,
        end: f64,
    ) -> Result<(), DeviceError> {
        self.set_gain(envelope, value, end)
    }

    fn ramp_frequency_linear(&mut self, tone: ToneId, hz: f64, end: f64) -> Result<(), DeviceError> {
        self.set_frequency(tone, hz, end)
    }
}
