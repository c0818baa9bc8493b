use crate::fretboard::{normalized_x_for_fret, USABLE_SPAN};
use crate::types::*;
use crossbeam_channel::Receiver;
use std::io::{self, Write};

/// Renders a live ASCII dashboard of the session status.
pub struct ConsoleDisplay {
    rx: Receiver<StatusFrame>,
}

impl ConsoleDisplay {
    pub fn new(rx: Receiver<StatusFrame>) -> Self {
        Self { rx }
    }

    pub fn run(&self) {
        let mut stdout = io::stdout();
        for frame in self.rx.iter() {
            // Clear screen and move cursor home
            print!("\x1b[2J\x1b[H");
            print!("{}", render(&frame));
            let _ = stdout.flush();
        }
    }
}

/// One full screen for `frame`.
pub fn render(frame: &StatusFrame) -> String {
    let mut out = String::new();
    let status = &frame.status;

    out.push_str("╔══════════════════════════════════════════════════════════╗\n");
    out.push_str("║  FRET GESTURES — Live Monitor                            ║\n");
    out.push_str("╠══════════════════════════════════════════════════════════╣\n");
    out.push_str(&format!(
        "  Time: {:.2}s{}\n",
        frame.timestamp_ms as f64 / 1000.0,
        if frame.demo_active { "   [DEMO]" } else { "" }
    ));
    out.push_str(&format!("  {}\n\n", status.message));

    // Fretboard: one row per string, ▼ on the held fret
    let highlighted = status
        .active
        .as_ref()
        .or_else(|| status.slide.as_ref().map(|s| &s.pitch))
        .map(|p| p.string);
    for (string, fret) in frame.fretted.iter() {
        let marker = if Some(string) == highlighted { '*' } else { ' ' };
        out.push_str(&format!(
            " {}{:>6} {}  {:>2}\n",
            marker,
            crate::instrument::definition(string).label,
            make_string_row(fret, 36),
            fret
        ));
    }
    out.push('\n');

    if let Some(pitch) = &status.active {
        out.push_str(&format!("  Note:  {}\n", pitch));
    }
    if let Some(strum) = &status.strum {
        out.push_str(&format!(
            "  Strum: {}  velocity {}\n",
            strum.direction,
            make_bar(strum.velocity, 20)
        ));
    }
    if let Some(slide) = &status.slide {
        out.push_str(&format!(
            "  Slide: {} {} → {} ({:.1} st)\n",
            slide.direction, slide.from_label, slide.pitch.label, slide.semitones
        ));
    }
    match &status.chord {
        Some(chord) => out.push_str(&format!(
            "  Chord: {}  [{}]\n",
            chord.label,
            chord.notes.join(" ")
        )),
        None if status.strum.is_some() => out.push_str("  Chord: ---\n"),
        None => {}
    }

    out.push_str("\n  Recent gestures:\n");
    for (i, g) in frame.log.iter().enumerate() {
        out.push_str(&format!("    {}. {}\n", i + 1, g));
    }
    out.push_str("╚══════════════════════════════════════════════════════════╝\n");
    out
}

fn make_bar(val: f64, width: usize) -> String {
    let filled = (val.clamp(0.0, 1.0) * width as f64).round() as usize;
    let empty = width.saturating_sub(filled);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

/// A string drawn as `─`, with `▼` where `fret` sits on the usable span.
fn make_string_row(fret: u8, width: usize) -> String {
    let pos = if fret == 0 {
        None
    } else {
        let (lo, hi) = USABLE_SPAN;
        let t = (normalized_x_for_fret(fret) - lo) / (hi - lo);
        Some(((t * (width - 1) as f64).round() as usize).min(width - 1))
    };
    let mut row = String::from("║");
    for i in 0..width {
        row.push(if Some(i) == pos { '▼' } else { '─' });
    }
    row
}
