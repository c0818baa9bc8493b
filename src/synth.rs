use crate::instrument::{fretted_midi, midi_to_hz};
use crate::tone_device::{DeviceError, ToneDevice};
use crate::types::*;
use log::{debug, trace, warn};
use serde::Serialize;

pub const ATTACK_S: f64 = 0.01;
pub const TAP_SUSTAIN_S: f64 = 0.45;
pub const STRUM_SUSTAIN_S: f64 = 0.6;
pub const RELEASE_S: f64 = 0.35;
/// Exponential decays cannot reach zero; this is "silent".
pub const SILENCE_GAIN: f64 = 0.0001;
/// Delay between successive strings of a strum.
pub const STRUM_SPREAD_S: f64 = 0.025;
/// Slide glide time per pixel of travel, clamped to [SLIDE_MIN_S, SLIDE_MAX_S].
pub const SLIDE_SECONDS_PER_PX: f64 = 1.0 / 300.0;
pub const SLIDE_MIN_S: f64 = 0.3;
pub const SLIDE_MAX_S: f64 = 1.0;
/// Extra time after the envelope ends before the source is stopped.
const STOP_PADDING_S: f64 = 0.05;

/// One tone to schedule, relative to the trigger time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToneSpec {
    pub delay_s: f64,
    pub start_hz: f64,
    /// Equal to `start_hz` unless the tone glides
    pub end_hz: f64,
    pub peak_gain: f64,
    pub attack_s: f64,
    pub sustain_s: f64,
    pub release_s: f64,
}

impl ToneSpec {
    fn plucked(delay_s: f64, hz: f64, peak_gain: f64, sustain_s: f64) -> Self {
        Self {
            delay_s,
            start_hz: hz,
            end_hz: hz,
            peak_gain,
            attack_s: ATTACK_S,
            sustain_s,
            release_s: RELEASE_S,
        }
    }

    /// Offset of the end of the release, relative to the trigger time.
    pub fn end_s(&self) -> f64 {
        self.delay_s + self.attack_s + self.sustain_s + self.release_s
    }

    pub fn glides(&self) -> bool {
        self.start_hz != self.end_hz
    }
}

/// Strings in the order a strum reaches them: top-to-bottom going down.
pub fn strum_order(direction: StrumDirection) -> [GuitarString; STRING_COUNT] {
    let mut order = GuitarString::ALL;
    if direction == StrumDirection::Up {
        order.reverse();
    }
    order
}

pub fn tap_tones(pitch: &PitchSnapshot, velocity: f64, master_gain: f64) -> Vec<ToneSpec> {
    vec![ToneSpec::plucked(
        0.0,
        pitch.frequency_hz,
        velocity * master_gain,
        TAP_SUSTAIN_S,
    )]
}

/// One tone per string at its currently fretted pitch, staggered by `STRUM_SPREAD_S`.
pub fn strum_tones(
    fretted: &FrettedState,
    direction: StrumDirection,
    velocity: f64,
    master_gain: f64,
) -> Vec<ToneSpec> {
    strum_order(direction)
        .iter()
        .enumerate()
        .map(|(i, &string)| {
            let hz = midi_to_hz(fretted_midi(string, fretted.get(string)) as f64);
            ToneSpec::plucked(
                i as f64 * STRUM_SPREAD_S,
                hz,
                velocity * master_gain,
                STRUM_SUSTAIN_S,
            )
        })
        .collect()
}

pub fn slide_duration_s(distance_px: f64) -> f64 {
    if distance_px.is_nan() {
        return SLIDE_MIN_S;
    }
    (distance_px * SLIDE_SECONDS_PER_PX).clamp(SLIDE_MIN_S, SLIDE_MAX_S)
}

pub fn slide_tone(
    from_hz: f64,
    to_hz: f64,
    distance_px: f64,
    velocity: f64,
    master_gain: f64,
) -> ToneSpec {
    ToneSpec {
        delay_s: 0.0,
        start_hz: from_hz,
        end_hz: to_hz,
        peak_gain: velocity * master_gain,
        attack_s: ATTACK_S,
        sustain_s: slide_duration_s(distance_px),
        release_s: RELEASE_S,
    }
}

/// Fire-and-forget bridge from musical triggers to a `ToneDevice`.
///
/// Without a device every trigger is a silent no-op. Device errors are
/// logged and swallowed; they never reach the gesture pipeline.
pub struct SynthDispatcher {
    device: Option<Box<dyn ToneDevice>>,
    master_gain: f64,
}

impl SynthDispatcher {
    pub fn new(device: Box<dyn ToneDevice>, master_gain: f64) -> Self {
        Self {
            device: Some(device),
            master_gain,
        }
    }

    /// A dispatcher with no device attached.
    pub fn silent(master_gain: f64) -> Self {
        Self {
            device: None,
            master_gain,
        }
    }

    pub fn is_available(&self) -> bool {
        self.device.is_some()
    }

    pub fn master_gain(&self) -> f64 {
        self.master_gain
    }

    pub fn trigger_tap(&mut self, pitch: &PitchSnapshot, velocity: f64) {
        let tones = tap_tones(pitch, velocity, self.master_gain);
        self.play(&tones);
    }

    pub fn trigger_strum(&mut self, fretted: &FrettedState, direction: StrumDirection, velocity: f64) {
        let tones = strum_tones(fretted, direction, velocity, self.master_gain);
        self.play(&tones);
    }

    pub fn trigger_slide(&mut self, from_hz: f64, to_hz: f64, distance_px: f64, velocity: f64) {
        let tone = slide_tone(from_hz, to_hz, distance_px, velocity, self.master_gain);
        self.play(std::slice::from_ref(&tone));
    }

    fn play(&mut self, tones: &[ToneSpec]) {
        let device = match self.device.as_mut() {
            Some(d) => d,
            None => {
                trace!("No tone device; dropping {} tone(s)", tones.len());
                return;
            }
        };
        let now = device.current_time();
        for spec in tones {
            if let Err(e) = schedule_tone(device.as_mut(), now, spec) {
                warn!("Tone device rejected a tone: {}", e);
                return;
            }
        }
        debug!("Scheduled {} tone(s) at t={:.3}s", tones.len(), now);
    }
}

/// Program one tone on the device: attack ramp, held sustain, exponential
/// release, and a linear glide over the sustain when the tone glides.
fn schedule_tone(device: &mut dyn ToneDevice, now: f64, spec: &ToneSpec) -> Result<(), DeviceError> {
    let start = now + spec.delay_s;
    let peak_at = start + spec.attack_s;
    let sustain_end = peak_at + spec.sustain_s;
    let end = sustain_end + spec.release_s;
    trace!(
        "tone {:.1}→{:.1} Hz gain {:.3} [{:.3}s..{:.3}s]",
        spec.start_hz,
        spec.end_hz,
        spec.peak_gain,
        start,
        end
    );

    let tone = device.create_tone(spec.start_hz)?;
    let envelope = device.create_envelope()?;
    device.connect(tone, envelope)?;

    device.set_gain(envelope, 0.0, start)?;
    device.ramp_gain_linear(envelope, spec.peak_gain, peak_at)?;
    device.set_gain(envelope, spec.peak_gain, sustain_end)?;
    device.ramp_gain_exponential(envelope, SILENCE_GAIN, end)?;

    if spec.glides() {
        device.set_frequency(tone, spec.start_hz, start)?;
        device.ramp_frequency_linear(tone, spec.end_hz, start + spec.sustain_s)?;
    }

    device.start(tone, start)?;
    device.stop(tone, end + STOP_PADDING_S)?;
    Ok(())
}
