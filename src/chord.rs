use crate::instrument::{fretted_midi, note_name};
use crate::types::*;

/// Qualities tried against every candidate root, in tie-break order.
const QUALITIES: [ChordQuality; 2] = [ChordQuality::Major, ChordQuality::Minor];

/// Infer the best-fit major or minor triad from the fretted state.
///
/// Every distinct pitch class is tried as a root. A root matches a quality
/// when all template intervals are present; extra intervals are tolerated
/// but counted. Fewest extras wins, then major over minor, then the root
/// sounding highest on the surface (first-seen string order).
///
/// Returns `None` for fewer than three distinct pitch classes or when no
/// root matches either template.
pub fn detect_chord(fretted: &FrettedState) -> Option<DetectedChord> {
    let pitch_classes = distinct_pitch_classes(fretted);
    if pitch_classes.len() < 3 {
        return None;
    }

    let mut candidates: Vec<(usize, ChordQuality, u8, Vec<u8>)> = Vec::new();
    for &root in &pitch_classes {
        let mut intervals: Vec<u8> = pitch_classes
            .iter()
            .map(|&pc| (pc + 12 - root) % 12)
            .collect();
        intervals.sort_unstable();

        for quality in QUALITIES {
            let template = quality.template();
            if template.iter().all(|i| intervals.contains(i)) {
                let extras = intervals.iter().filter(|i| !template.contains(i)).count();
                candidates.push((extras, quality, root, intervals.clone()));
            }
        }
    }

    // Stable sort keeps first-seen root order among full ties
    candidates.sort_by_key(|(extras, quality, _, _)| (*extras, quality_rank(*quality)));

    candidates
        .into_iter()
        .next()
        .map(|(_, quality, root, intervals)| {
            let root_name = note_name(root as i32);
            DetectedChord {
                root: root_name.to_string(),
                root_pitch_class: root,
                quality,
                notes: intervals
                    .iter()
                    .map(|&i| note_name((root + i) as i32).to_string())
                    .collect(),
                label: format!("{} {}", root_name, quality),
                intervals,
            }
        })
}

/// Distinct pitch classes present, in first-seen string order (top → bottom).
fn distinct_pitch_classes(fretted: &FrettedState) -> Vec<u8> {
    let mut seen: Vec<u8> = Vec::with_capacity(STRING_COUNT);
    for (string, fret) in fretted.iter() {
        let pc = fretted_midi(string, fret) % 12;
        if !seen.contains(&pc) {
            seen.push(pc);
        }
    }
    seen
}

fn quality_rank(quality: ChordQuality) -> u8 {
    match quality {
        ChordQuality::Major => 0,
        ChordQuality::Minor => 1,
    }
}
