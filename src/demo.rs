use crate::types::*;

/// Delay after the last note ends before the demo reports completion.
pub const DEMO_COMPLETION_DELAY_MS: u64 = 600;

/// Velocity for demo notes (they have no tap duration to derive one from).
pub const DEMO_VELOCITY: f64 = 0.75;

/// The built-in demo: an open E minor arpeggio, a short melody on the top
/// strings, and a final low E. Leaves the board fretted as E minor, so a
/// strum right after the demo rings the chord.
pub fn demo_script() -> Vec<DemoNote> {
    use GuitarString::*;
    let note = |offset_ms, string, fret, duration_ms| DemoNote {
        offset_ms,
        string,
        fret,
        duration_ms,
    };
    vec![
        // Em arpeggio, low to high
        note(0, LowE, 0, 450),
        note(300, A, 2, 450),
        note(600, D, 2, 450),
        note(900, G, 0, 450),
        note(1200, B, 0, 450),
        note(1500, HighE, 0, 600),
        // G - F# - E on the top string
        note(2100, HighE, 3, 300),
        note(2400, HighE, 2, 300),
        note(2700, HighE, 0, 300),
        // D - B on the B string
        note(3000, B, 3, 300),
        note(3300, B, 0, 500),
        // Low E to finish
        note(3900, LowE, 0, 900),
    ]
}

/// Offset at which the demo finishes: the last note end plus the completion delay.
pub fn completion_offset_ms(script: &[DemoNote], completion_delay_ms: u64) -> u64 {
    script.iter().map(DemoNote::end_ms).max().unwrap_or(0) + completion_delay_ms
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord::detect_chord;

    #[test]
    fn test_script_is_time_ordered_and_on_board() {
        let script = demo_script();
        assert!(!script.is_empty());
        for pair in script.windows(2) {
            assert!(pair[0].offset_ms <= pair[1].offset_ms);
        }
        assert!(script.iter().all(|n| n.fret <= MAX_FRET));
    }

    #[test]
    fn test_completion_offset() {
        let script = demo_script();
        assert_eq!(completion_offset_ms(&script, DEMO_COMPLETION_DELAY_MS), 4800 + 600);
        assert_eq!(completion_offset_ms(&[], 250), 250);
    }

    #[test]
    fn test_script_ends_on_e_minor() {
        let mut fretted = FrettedState::default();
        for n in demo_script() {
            fretted.set(n.string, n.fret);
        }
        assert_eq!(detect_chord(&fretted).unwrap().label, "E minor");
    }
}
