use crate::types::*;

/// Chromatic pitch-class names, index 0 = C.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Reference pitch for equal temperament: A4 = MIDI 69 = 440 Hz.
pub const REFERENCE_MIDI: f64 = 69.0;
pub const REFERENCE_HZ: f64 = 440.0;

/// Six-string standard tuning, top of the surface first.
///
/// Open tuning (top → bottom):
///   E4  B3  G3  D3  A2  E2
pub const STANDARD_TUNING: [StringDefinition; STRING_COUNT] = [
    StringDefinition {
        id: GuitarString::HighE,
        name: "High E",
        label: "E4",
        open_midi: 64,
        open_hz: 329.63,
        order: 0,
    },
    StringDefinition {
        id: GuitarString::B,
        name: "B",
        label: "B3",
        open_midi: 59,
        open_hz: 246.94,
        order: 1,
    },
    StringDefinition {
        id: GuitarString::G,
        name: "G",
        label: "G3",
        open_midi: 55,
        open_hz: 196.0,
        order: 2,
    },
    StringDefinition {
        id: GuitarString::D,
        name: "D",
        label: "D3",
        open_midi: 50,
        open_hz: 146.83,
        order: 3,
    },
    StringDefinition {
        id: GuitarString::A,
        name: "A",
        label: "A2",
        open_midi: 45,
        open_hz: 110.0,
        order: 4,
    },
    StringDefinition {
        id: GuitarString::LowE,
        name: "Low E",
        label: "E2",
        open_midi: 40,
        open_hz: 82.41,
        order: 5,
    },
];

pub fn definition(string: GuitarString) -> &'static StringDefinition {
    &STANDARD_TUNING[string.index()]
}

/// Sounding MIDI note of `string` held at `fret`. The fret is clamped to the board.
pub fn fretted_midi(string: GuitarString, fret: u8) -> u8 {
    definition(string).open_midi + fret.min(MAX_FRET)
}

/// Convert MIDI note number (fractional) to Hz. A4 = MIDI 69 = 440 Hz.
pub fn midi_to_hz(midi: f64) -> f64 {
    REFERENCE_HZ * 2.0_f64.powf((midi - REFERENCE_MIDI) / 12.0)
}

/// Convert Hz to MIDI note number (fractional).
pub fn hz_to_midi(hz: f64) -> f64 {
    REFERENCE_MIDI + 12.0 * (hz / REFERENCE_HZ).log2()
}

/// Pitch-class name of a MIDI note, e.g. 66 → "F#".
pub fn note_name(midi: i32) -> &'static str {
    NOTE_NAMES[midi.rem_euclid(12) as usize]
}

/// Note name with octave, e.g. 64 → "E4". Octave = floor(midi / 12) - 1.
pub fn pitch_label(midi: i32) -> String {
    format!("{}{}", note_name(midi), midi.div_euclid(12) - 1)
}
