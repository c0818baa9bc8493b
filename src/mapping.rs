use crate::instrument::{fretted_midi, midi_to_hz, pitch_label};
use crate::types::*;

/// Pixels of slide travel per semitone.
pub const SLIDE_PX_PER_SEMITONE: f64 = 40.0;
pub const SLIDE_MIN_SEMITONES: f64 = 1.0;
pub const SLIDE_MAX_SEMITONES: f64 = 6.0;

/// Derive the sounding pitch of `string` at `fret`.
pub fn pitch_snapshot(
    string: GuitarString,
    fret: u8,
    articulation: Articulation,
    duration_ms: Option<f64>,
) -> PitchSnapshot {
    let fret = fret.min(MAX_FRET);
    let midi = fretted_midi(string, fret);
    PitchSnapshot {
        string,
        fret,
        articulation,
        midi,
        frequency_hz: midi_to_hz(midi as f64),
        label: pitch_label(midi as i32),
        duration_ms,
    }
}

/// Strum velocity from pointer speed (px/ms). 0 → 0.25, saturates at 1.0
/// from 1.25 px/ms.
pub fn velocity_for_strum_speed(speed: f64) -> f64 {
    if speed.is_nan() {
        return 0.25;
    }
    (0.25 + speed.max(0.0) * 0.6).clamp(0.25, 1.0)
}

/// Tap velocity from press duration. Shorter taps are louder.
pub fn velocity_for_tap_duration(duration_ms: f64) -> f64 {
    if duration_ms.is_nan() {
        return 0.9;
    }
    (1.0 - duration_ms / 350.0).clamp(0.2, 0.9)
}

/// Semitones covered by a slide of `distance_px`, in [1, 6].
pub fn slide_semitones(distance_px: f64) -> f64 {
    if distance_px.is_nan() {
        return SLIDE_MIN_SEMITONES;
    }
    (distance_px / SLIDE_PX_PER_SEMITONE).clamp(SLIDE_MIN_SEMITONES, SLIDE_MAX_SEMITONES)
}

/// Fret reached by sliding from `start_fret`, clamped to the board.
pub fn slide_target_fret(start_fret: u8, direction: SlideDirection, distance_px: f64) -> u8 {
    let delta = slide_semitones(distance_px).round() as i32;
    let signed = match direction {
        SlideDirection::Right => delta,
        SlideDirection::Left => -delta,
    };
    (start_fret.min(MAX_FRET) as i32 + signed).clamp(0, MAX_FRET as i32) as u8
}
