use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};

// ─── Instrument ─────────────────────────────────────────────────────────────

/// One of the six string slots, top-to-bottom as drawn on the surface.
/// Serializes as camelCase names ("highE", "b", ..., "lowE").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GuitarString {
    HighE,
    B,
    G,
    D,
    A,
    LowE,
}

impl GuitarString {
    /// All strings in display order (index 0 = top of the surface).
    pub const ALL: [GuitarString; STRING_COUNT] = [
        GuitarString::HighE,
        GuitarString::B,
        GuitarString::G,
        GuitarString::D,
        GuitarString::A,
        GuitarString::LowE,
    ];

    /// Display order index, 0 = top.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Inverse of `index()`. Out-of-range indices clamp to the bottom string.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index.min(STRING_COUNT - 1)]
    }
}

impl fmt::Display for GuitarString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(crate::instrument::definition(*self).name)
    }
}

/// Static definition of one string in standard tuning.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StringDefinition {
    pub id: GuitarString,
    /// Human name, e.g. "High E"
    pub name: &'static str,
    /// Short display label, e.g. "E4" for the high E string
    pub label: &'static str,
    /// Open-string pitch as a MIDI note number
    pub open_midi: u8,
    /// Open-string fundamental in Hz
    pub open_hz: f64,
    /// Top-to-bottom ordering index
    pub order: usize,
}

// ─── Pointer input ──────────────────────────────────────────────────────────

/// A point on the playing surface. Pixel space for absolute positions,
/// 0.0–1.0 for surface-normalized positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One completed pointer interaction, summarized at pointer-up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    /// Elapsed time from pointer-down to pointer-up
    pub duration_ms: f64,
    /// Net displacement in pixels (positive dy = downward)
    pub dx: f64,
    pub dy: f64,
    /// Net velocity in px/ms
    pub vx: f64,
    pub vy: f64,
    /// Absolute end position in pixels
    pub end: Point,
    /// End position normalized to the surface, if the surface size is known
    #[serde(default)]
    pub normalized_end: Option<Point>,
}

// ─── Gestures ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrumDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlideDirection {
    Left,
    Right,
}

impl fmt::Display for StrumDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StrumDirection::Up => "up",
            StrumDirection::Down => "down",
        })
    }
}

impl fmt::Display for SlideDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SlideDirection::Left => "left",
            SlideDirection::Right => "right",
        })
    }
}

/// A classified gesture. Produced once per pointer interaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GestureEvent {
    Tap {
        position: Point,
        #[serde(default)]
        normalized: Option<Point>,
        duration_ms: f64,
    },
    Strum {
        direction: StrumDirection,
        distance_px: f64,
        speed: f64,
    },
    Slide {
        direction: SlideDirection,
        distance_px: f64,
        speed: f64,
    },
    Unknown {
        detail: String,
    },
}

impl GestureEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            GestureEvent::Tap { .. } => "tap",
            GestureEvent::Strum { .. } => "strum",
            GestureEvent::Slide { .. } => "slide",
            GestureEvent::Unknown { .. } => "unknown",
        }
    }
}

impl fmt::Display for GestureEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GestureEvent::Tap { position, duration_ms, .. } => write!(
                f,
                "Tap at ({:.0}, {:.0}) for {:.0}ms",
                position.x, position.y, duration_ms
            ),
            GestureEvent::Strum { direction, distance_px, speed } => write!(
                f,
                "Strum {} {:.0}px @ {:.2}px/ms",
                direction, distance_px, speed
            ),
            GestureEvent::Slide { direction, distance_px, speed } => write!(
                f,
                "Slide {} {:.0}px @ {:.2}px/ms",
                direction, distance_px, speed
            ),
            GestureEvent::Unknown { detail } => write!(f, "Unknown: {}", detail),
        }
    }
}

// ─── Musical state ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Articulation {
    Tap,
    Slide,
}

/// The pitch produced by one string/fret, derived on every tap or slide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitchSnapshot {
    pub string: GuitarString,
    pub fret: u8,
    pub articulation: Articulation,
    pub midi: u8,
    pub frequency_hz: f64,
    /// Note name with octave, e.g. "F#4"
    pub label: String,
    /// Duration of the tap that produced this pitch, if any
    pub duration_ms: Option<f64>,
}

impl fmt::Display for PitchSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} string fret {} → {} ({:.1} Hz)",
            self.string, self.fret, self.label, self.frequency_hz
        )
    }
}

/// Currently held fret per string. 0 = open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrettedState {
    frets: [u8; STRING_COUNT],
}

impl FrettedState {
    pub fn get(&self, string: GuitarString) -> u8 {
        self.frets[string.index()]
    }

    /// Hold `fret` on `string`, clamped to the fretboard.
    pub fn set(&mut self, string: GuitarString, fret: u8) {
        self.frets[string.index()] = fret.min(MAX_FRET);
    }

    /// Build a state from explicit (string, fret) pairs; unnamed strings stay open.
    pub fn from_pairs(pairs: &[(GuitarString, u8)]) -> Self {
        let mut state = Self::default();
        for &(string, fret) in pairs {
            state.set(string, fret);
        }
        state
    }

    /// (string, fret) pairs in display order.
    pub fn iter(&self) -> impl Iterator<Item = (GuitarString, u8)> + '_ {
        GuitarString::ALL.iter().map(move |&s| (s, self.get(s)))
    }
}

/// The most recently played string/fret; the implicit anchor for slides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastTouched {
    pub string: GuitarString,
    pub fret: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChordQuality {
    Major,
    Minor,
}

impl ChordQuality {
    /// Interval template relative to the root, in semitones.
    pub fn template(self) -> &'static [u8] {
        match self {
            ChordQuality::Major => &[0, 4, 7],
            ChordQuality::Minor => &[0, 3, 7],
        }
    }
}

impl fmt::Display for ChordQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChordQuality::Major => "major",
            ChordQuality::Minor => "minor",
        })
    }
}

/// Best-fit triad for the current fretted state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedChord {
    pub root: String,
    pub root_pitch_class: u8,
    pub quality: ChordQuality,
    /// Names of the observed pitch classes, ordered by interval above the root
    pub notes: Vec<String>,
    /// Observed intervals above the root, ascending
    pub intervals: Vec<u8>,
    /// "<Root> <quality>", e.g. "G major"
    pub label: String,
}

// ─── Engine status ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrumSummary {
    pub direction: StrumDirection,
    pub speed: f64,
    pub velocity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideSummary {
    pub direction: SlideDirection,
    pub from_fret: u8,
    pub from_label: String,
    /// Semitone span derived from the slide distance, before rounding
    pub semitones: f64,
    pub distance_px: f64,
    /// Where the slide landed
    pub pitch: PitchSnapshot,
}

/// Externally visible snapshot, replaced wholesale on every gesture or demo tick.
/// At most one of `active`, `strum`, `slide` is populated.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineStatus {
    pub last_gesture: Option<GestureEvent>,
    pub message: String,
    pub active: Option<PitchSnapshot>,
    pub strum: Option<StrumSummary>,
    pub slide: Option<SlideSummary>,
    pub chord: Option<DetectedChord>,
}

impl EngineStatus {
    pub fn idle(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }
}

// ─── Demo ───────────────────────────────────────────────────────────────────

/// One authored note of the demo performance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DemoNote {
    /// Offset from demo start
    pub offset_ms: u64,
    pub string: GuitarString,
    pub fret: u8,
    pub duration_ms: u64,
}

impl DemoNote {
    pub fn end_ms(&self) -> u64 {
        self.offset_ms + self.duration_ms
    }
}

// ─── Inter-thread messages ──────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A raw pointer interaction, classified by the runtime
    Motion(MotionSample),
    /// An already classified gesture
    Gesture(GestureEvent),
    StartDemo,
    Reset,
    Shutdown,
}

/// Status broadcast to presentation sinks after every state change.
#[derive(Debug, Clone, Serialize)]
pub struct StatusFrame {
    /// Milliseconds since session start
    pub timestamp_ms: u64,
    pub status: EngineStatus,
    /// Most recent first
    pub log: Vec<GestureEvent>,
    pub fretted: FrettedState,
    pub demo_active: bool,
}

// ─── Session clock ──────────────────────────────────────────────────────────

/// Monotonic clock for the session.
#[derive(Clone)]
pub struct SessionClock {
    start: Instant,
}

impl SessionClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Wall-clock instant corresponding to a session timestamp.
    pub fn instant_at_ms(&self, ms: u64) -> Instant {
        self.start + Duration::from_millis(ms)
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Constants ──────────────────────────────────────────────────────────────

pub const STRING_COUNT: usize = 6;
pub const MAX_FRET: u8 = 12;
pub const DEFAULT_LOG_LIMIT: usize = 5;
