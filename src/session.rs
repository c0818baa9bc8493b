use crate::chord::detect_chord;
use crate::demo::{completion_offset_ms, demo_script, DEMO_COMPLETION_DELAY_MS, DEMO_VELOCITY};
use crate::fretboard::{fret_for_normalized_x, normalized_x_for_fret, string_center_y, string_for_y};
use crate::mapping::{
    pitch_snapshot, slide_semitones, slide_target_fret, velocity_for_strum_speed,
    velocity_for_tap_duration,
};
use crate::synth::SynthDispatcher;
use crate::timer::TimerQueue;
use crate::types::*;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::Path;

pub const IDLE_MESSAGE: &str = "Tap a string, strum across the strings, or slide along one";
pub const DEMO_PLAYING_MESSAGE: &str = "Playing demo...";
pub const DEMO_FINISHED_MESSAGE: &str = "Demo finished. Your turn!";

/// Nominal surface size used to place demo notes in pixel space.
pub const NOMINAL_SURFACE_WIDTH_PX: f64 = 720.0;
pub const NOMINAL_SURFACE_HEIGHT_PX: f64 = 280.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Gestures kept in the log, most recent first
    pub log_limit: usize,
    /// Overall output level; tone gain = velocity × master_gain
    pub master_gain: f64,
    pub demo_completion_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            log_limit: DEFAULT_LOG_LIMIT,
            master_gain: 0.35,
            demo_completion_delay_ms: DEMO_COMPLETION_DELAY_MS,
        }
    }
}

impl SessionConfig {
    /// Load from a JSON file. Returns None if file is absent or malformed.
    pub fn load(path: &Path) -> Option<Self> {
        let data = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str(&data) {
            Ok(c) => {
                info!("Loaded session config from {:?}", path);
                Some(c)
            }
            Err(e) => {
                warn!("Failed to parse session config {:?}: {}", path, e);
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum DemoTick {
    Note(DemoNote),
    Finish,
}

/// Owns all mutable musical state and the pending demo timers.
///
/// Every mutation goes through `handle_gesture`, `start_demo`,
/// `poll_timers`, `reset` or `shutdown`. Times are session milliseconds
/// supplied by the caller, so the engine itself never reads a clock.
pub struct Session {
    config: SessionConfig,
    fretted: FrettedState,
    last_touched: Option<LastTouched>,
    log: VecDeque<GestureEvent>,
    status: EngineStatus,
    timers: TimerQueue<DemoTick>,
    demo_active: bool,
    script: Vec<DemoNote>,
    dispatcher: SynthDispatcher,
}

impl Session {
    pub fn new(config: SessionConfig, dispatcher: SynthDispatcher) -> Self {
        Self {
            log: VecDeque::with_capacity(config.log_limit),
            config,
            fretted: FrettedState::default(),
            last_touched: None,
            status: EngineStatus::idle(IDLE_MESSAGE),
            timers: TimerQueue::new(),
            demo_active: false,
            script: demo_script(),
            dispatcher,
        }
    }

    /// Replace the built-in demo performance.
    pub fn with_demo_script(mut self, script: Vec<DemoNote>) -> Self {
        self.script = script;
        self
    }

    // ─── Accessors ──────────────────────────────────────────────────────

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn status(&self) -> &EngineStatus {
        &self.status
    }

    /// Logged gestures, most recent first.
    pub fn log(&self) -> impl Iterator<Item = &GestureEvent> {
        self.log.iter()
    }

    /// Human-readable gesture log, most recent first.
    pub fn log_descriptions(&self) -> Vec<String> {
        self.log.iter().map(|g| g.to_string()).collect()
    }

    pub fn fretted(&self) -> &FrettedState {
        &self.fretted
    }

    pub fn last_touched(&self) -> Option<LastTouched> {
        self.last_touched
    }

    pub fn is_demo_active(&self) -> bool {
        self.demo_active
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Session time of the next scheduled demo tick, if any.
    pub fn next_deadline(&self) -> Option<u64> {
        self.timers.next_deadline()
    }

    pub fn status_frame(&self, timestamp_ms: u64) -> StatusFrame {
        StatusFrame {
            timestamp_ms,
            status: self.status.clone(),
            log: self.log.iter().cloned().collect(),
            fretted: self.fretted,
            demo_active: self.demo_active,
        }
    }

    // ─── Live gestures ──────────────────────────────────────────────────

    /// Process one live gesture. A running demo is canceled first, so no
    /// stale demo tick can overwrite the state this gesture produces.
    pub fn handle_gesture(&mut self, gesture: GestureEvent) {
        self.interrupt_demo();
        debug!("Gesture: {}", gesture);

        let status = match &gesture {
            GestureEvent::Tap {
                position,
                normalized,
                duration_ms,
            } => {
                let string = string_for_y(position.y);
                let fret = fret_for_normalized_x(normalized.map(|p| p.x));
                self.play_note(
                    string,
                    fret,
                    Some(*duration_ms),
                    velocity_for_tap_duration(*duration_ms),
                )
            }
            GestureEvent::Strum {
                direction, speed, ..
            } => self.strum(*direction, *speed),
            GestureEvent::Slide {
                direction,
                distance_px,
                speed,
            } => self.slide(*direction, *distance_px, *speed),
            GestureEvent::Unknown { detail } => EngineStatus::idle(detail.clone()),
        };

        self.record(gesture, status);
    }

    fn play_note(
        &mut self,
        string: GuitarString,
        fret: u8,
        duration_ms: Option<f64>,
        velocity: f64,
    ) -> EngineStatus {
        let pitch = pitch_snapshot(string, fret, Articulation::Tap, duration_ms);
        self.fretted.set(string, pitch.fret);
        self.last_touched = Some(LastTouched {
            string,
            fret: pitch.fret,
        });
        self.dispatcher.trigger_tap(&pitch, velocity);

        EngineStatus {
            message: format!("{} string, fret {}: {}", string, pitch.fret, pitch.label),
            active: Some(pitch),
            ..EngineStatus::default()
        }
    }

    fn strum(&mut self, direction: StrumDirection, speed: f64) -> EngineStatus {
        let velocity = velocity_for_strum_speed(speed);
        let chord = detect_chord(&self.fretted);
        self.dispatcher.trigger_strum(&self.fretted, direction, velocity);

        let message = match &chord {
            Some(c) => format!("Strummed {} ({})", c.label, direction),
            None => format!("Strummed {}", direction),
        };
        EngineStatus {
            message,
            strum: Some(StrumSummary {
                direction,
                speed,
                velocity,
            }),
            chord,
            ..EngineStatus::default()
        }
    }

    fn slide(&mut self, direction: SlideDirection, distance_px: f64, speed: f64) -> EngineStatus {
        let (string, start_fret) = match self.last_touched {
            Some(last) => (last.string, last.fret),
            None => (GuitarString::from_index(STRING_COUNT / 2), 0),
        };
        let target = slide_target_fret(start_fret, direction, distance_px);
        let from = pitch_snapshot(string, start_fret, Articulation::Slide, None);
        let to = pitch_snapshot(string, target, Articulation::Slide, None);

        self.fretted.set(string, target);
        self.last_touched = Some(LastTouched {
            string,
            fret: target,
        });
        self.dispatcher.trigger_slide(
            from.frequency_hz,
            to.frequency_hz,
            distance_px,
            velocity_for_strum_speed(speed),
        );

        EngineStatus {
            message: format!(
                "Slid {} on {} string: {} → {}",
                direction, string, from.label, to.label
            ),
            slide: Some(SlideSummary {
                direction,
                from_fret: start_fret,
                from_label: from.label,
                semitones: slide_semitones(distance_px),
                distance_px,
                pitch: to,
            }),
            ..EngineStatus::default()
        }
    }

    /// Prepend to the log, trim it, and swap in the new status in one step.
    fn record(&mut self, gesture: GestureEvent, mut status: EngineStatus) {
        status.last_gesture = Some(gesture.clone());
        self.log.push_front(gesture);
        self.log.truncate(self.config.log_limit);
        self.status = status;
    }

    // ─── Demo playback ──────────────────────────────────────────────────

    /// Schedule the demo performance starting at `now_ms`.
    /// Returns false (and changes nothing) if a demo is already playing.
    pub fn start_demo(&mut self, now_ms: u64) -> bool {
        if self.demo_active {
            debug!("Demo already playing; ignoring start request");
            return false;
        }
        self.timers.cancel_all();
        self.demo_active = true;

        for note in &self.script {
            self.timers
                .schedule(now_ms + note.offset_ms, DemoTick::Note(*note));
        }
        let finish = now_ms + completion_offset_ms(&self.script, self.config.demo_completion_delay_ms);
        self.timers.schedule(finish, DemoTick::Finish);

        info!(
            "Demo started: {} notes, finishing at +{}ms",
            self.script.len(),
            finish - now_ms
        );
        self.status = EngineStatus::idle(DEMO_PLAYING_MESSAGE);
        true
    }

    /// Fire every demo tick due at or before `now_ms`, in schedule order.
    /// Returns how many fired.
    pub fn poll_timers(&mut self, now_ms: u64) -> usize {
        let mut fired = 0;
        while let Some((_, tick)) = self.timers.pop_due(now_ms) {
            match tick {
                DemoTick::Note(note) => self.play_demo_note(note),
                DemoTick::Finish => self.finish_demo(),
            }
            fired += 1;
        }
        fired
    }

    /// Demo notes skip classification and surface mapping, but update
    /// state, log and status exactly as a tap on that string/fret would.
    fn play_demo_note(&mut self, note: DemoNote) {
        let nx = normalized_x_for_fret(note.fret);
        let y = string_center_y(note.string);
        let gesture = GestureEvent::Tap {
            position: Point::new(nx * NOMINAL_SURFACE_WIDTH_PX, y),
            normalized: Some(Point::new(nx, y / NOMINAL_SURFACE_HEIGHT_PX)),
            duration_ms: note.duration_ms as f64,
        };
        let status = self.play_note(
            note.string,
            note.fret,
            Some(note.duration_ms as f64),
            DEMO_VELOCITY,
        );
        self.record(gesture, status);
    }

    fn finish_demo(&mut self) {
        info!("Demo finished");
        self.demo_active = false;
        self.status = EngineStatus::idle(DEMO_FINISHED_MESSAGE);
    }

    fn interrupt_demo(&mut self) {
        if self.demo_active {
            let canceled = self.timers.cancel_all();
            self.demo_active = false;
            info!("Demo interrupted; canceled {} pending tick(s)", canceled);
        }
    }

    // ─── Lifecycle ──────────────────────────────────────────────────────

    /// Back to a fresh session: open strings, empty log, idle status,
    /// no pending demo ticks.
    pub fn reset(&mut self) {
        self.timers.cancel_all();
        self.demo_active = false;
        self.fretted = FrettedState::default();
        self.last_touched = None;
        self.log.clear();
        self.status = EngineStatus::idle(IDLE_MESSAGE);
        info!("Session reset");
    }

    /// Cancel everything pending; state is left readable.
    pub fn shutdown(&mut self) {
        let canceled = self.timers.cancel_all();
        self.demo_active = false;
        if canceled > 0 {
            info!("Session shut down; dropped {} pending tick(s)", canceled);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::software_device::SoftwareToneDevice;

    fn session() -> Session {
        Session::new(SessionConfig::default(), SynthDispatcher::silent(0.35))
    }

    fn tap_at(string: GuitarString, fret: u8, duration_ms: f64) -> GestureEvent {
        GestureEvent::Tap {
            position: Point::new(300.0, string_center_y(string)),
            normalized: Some(Point::new(normalized_x_for_fret(fret), 0.5)),
            duration_ms,
        }
    }

    fn strum(direction: StrumDirection) -> GestureEvent {
        GestureEvent::Strum {
            direction,
            distance_px: 150.0,
            speed: 0.8,
        }
    }

    fn slide(direction: SlideDirection, distance_px: f64) -> GestureEvent {
        GestureEvent::Slide {
            direction,
            distance_px,
            speed: 0.4,
        }
    }

    /// Exactly one of active/strum/slide is populated.
    fn populated(status: &EngineStatus) -> usize {
        [status.active.is_some(), status.strum.is_some(), status.slide.is_some()]
            .iter()
            .filter(|&&b| b)
            .count()
    }

    #[test]
    fn test_tap_updates_state_and_status() {
        let mut s = session();
        s.handle_gesture(tap_at(GuitarString::HighE, 2, 60.0));

        assert_eq!(s.fretted().get(GuitarString::HighE), 2);
        assert_eq!(
            s.last_touched(),
            Some(LastTouched {
                string: GuitarString::HighE,
                fret: 2
            })
        );
        let active = s.status().active.as_ref().unwrap();
        assert_eq!(active.label, "F#4");
        assert_eq!(active.articulation, Articulation::Tap);
        assert_eq!(active.duration_ms, Some(60.0));
        assert_eq!(populated(s.status()), 1);
        assert_eq!(s.status().last_gesture.as_ref().map(|g| g.kind()), Some("tap"));
    }

    #[test]
    fn test_tap_without_normalized_position_is_open() {
        let mut s = session();
        s.handle_gesture(GestureEvent::Tap {
            position: Point::new(10.0, 200.0),
            normalized: None,
            duration_ms: 80.0,
        });
        assert_eq!(s.last_touched().unwrap().string, GuitarString::A);
        assert_eq!(s.last_touched().unwrap().fret, 0);
        assert_eq!(s.status().active.as_ref().unwrap().label, "A2");
    }

    #[test]
    fn test_strum_reports_chord_from_fretted_state() {
        let mut s = session();
        // Open G shape
        for (string, fret) in [
            (GuitarString::HighE, 3),
            (GuitarString::A, 2),
            (GuitarString::LowE, 3),
        ] {
            s.handle_gesture(tap_at(string, fret, 50.0));
        }
        s.handle_gesture(strum(StrumDirection::Down));

        let status = s.status();
        assert_eq!(status.chord.as_ref().unwrap().label, "G major");
        let summary = status.strum.unwrap();
        assert_eq!(summary.direction, StrumDirection::Down);
        assert!((summary.velocity - velocity_for_strum_speed(0.8)).abs() < 1e-9);
        assert!(status.message.contains("G major"));
        assert_eq!(populated(status), 1);
        // Strumming does not change what is held
        assert_eq!(s.fretted().get(GuitarString::LowE), 3);
    }

    #[test]
    fn test_strum_without_chord_uses_direction_message() {
        let mut s = session();
        // E F F#: no triad
        for (string, fret) in [
            (GuitarString::B, 6),
            (GuitarString::G, 11),
            (GuitarString::D, 2),
            (GuitarString::A, 7),
            (GuitarString::LowE, 2),
        ] {
            s.handle_gesture(tap_at(string, fret, 50.0));
        }
        s.handle_gesture(strum(StrumDirection::Up));
        assert!(s.status().chord.is_none());
        assert_eq!(s.status().message, "Strummed up");
    }

    #[test]
    fn test_slide_from_last_touched() {
        let mut s = session();
        s.handle_gesture(tap_at(GuitarString::G, 4, 50.0));
        s.handle_gesture(slide(SlideDirection::Right, 80.0));

        assert_eq!(s.fretted().get(GuitarString::G), 6);
        assert_eq!(
            s.last_touched(),
            Some(LastTouched {
                string: GuitarString::G,
                fret: 6
            })
        );
        let summary = s.status().slide.as_ref().unwrap();
        assert_eq!(summary.from_fret, 4);
        assert_eq!(summary.pitch.fret, 6);
        assert_eq!(summary.pitch.articulation, Articulation::Slide);
        assert_eq!(summary.pitch.label, "C#4");
        assert_eq!(populated(s.status()), 1);
    }

    #[test]
    fn test_slide_without_anchor_uses_middle_string() {
        let mut s = session();
        s.handle_gesture(slide(SlideDirection::Right, 10.0));
        let last = s.last_touched().unwrap();
        assert_eq!(last.string, GuitarString::D);
        // Minimum span is one semitone
        assert_eq!(last.fret, 1);
        s.handle_gesture(slide(SlideDirection::Left, 9999.0));
        assert_eq!(s.last_touched().unwrap().fret, 0);
    }

    #[test]
    fn test_unknown_only_changes_message() {
        let mut s = session();
        s.handle_gesture(tap_at(GuitarString::B, 1, 50.0));
        let fretted = *s.fretted();
        s.handle_gesture(GestureEvent::Unknown {
            detail: "too small".into(),
        });
        assert_eq!(s.status().message, "too small");
        assert_eq!(populated(s.status()), 0);
        assert_eq!(*s.fretted(), fretted);
        assert_eq!(s.last_touched().unwrap().string, GuitarString::B);
    }

    #[test]
    fn test_log_is_bounded_most_recent_first() {
        let config = SessionConfig {
            log_limit: 3,
            ..SessionConfig::default()
        };
        let mut s = Session::new(config, SynthDispatcher::silent(0.35));
        for fret in 0..6 {
            s.handle_gesture(tap_at(GuitarString::HighE, fret, 50.0));
        }
        let frets: Vec<u8> = s
            .log()
            .map(|g| match g {
                GestureEvent::Tap { normalized, .. } => {
                    fret_for_normalized_x(normalized.map(|p| p.x))
                }
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(frets, vec![5, 4, 3]);
        assert_eq!(s.log_descriptions().len(), 3);
    }

    #[test]
    fn test_demo_plays_through_and_finishes() {
        let mut s = session();
        assert!(s.start_demo(1_000));
        assert!(s.is_demo_active());
        let script = demo_script();
        assert_eq!(s.pending_timers(), script.len() + 1);
        assert_eq!(s.status().message, DEMO_PLAYING_MESSAGE);

        // First note fires at the start offset
        assert_eq!(s.poll_timers(1_000), 1);
        assert_eq!(s.last_touched().unwrap().string, GuitarString::LowE);
        assert!(s.status().active.is_some());
        assert_eq!(s.log().count(), 1);

        // Everything else, including completion
        let fired = s.poll_timers(1_000_000);
        assert_eq!(fired, script.len());
        assert!(!s.is_demo_active());
        assert_eq!(s.pending_timers(), 0);
        assert_eq!(s.status().message, DEMO_FINISHED_MESSAGE);
        assert_eq!(detect_chord(s.fretted()).unwrap().label, "E minor");
        assert_eq!(s.log().count(), DEFAULT_LOG_LIMIT);
    }

    #[test]
    fn test_demo_start_while_active_is_noop() {
        let mut s = session();
        assert!(s.start_demo(0));
        s.poll_timers(0);
        let pending = s.pending_timers();
        assert!(!s.start_demo(50));
        assert_eq!(s.pending_timers(), pending);
        assert_eq!(s.next_deadline(), Some(300));
    }

    #[test]
    fn test_live_gesture_cancels_demo() {
        let mut s = session();
        s.start_demo(0);
        s.poll_timers(700); // three notes in
        assert!(s.pending_timers() > 0);

        s.handle_gesture(tap_at(GuitarString::HighE, 7, 40.0));
        assert!(!s.is_demo_active());
        assert_eq!(s.pending_timers(), 0);

        // Nothing stale fires later
        assert_eq!(s.poll_timers(1_000_000), 0);
        assert_eq!(s.last_touched().unwrap().fret, 7);
        assert_eq!(s.status().active.as_ref().unwrap().label, "B4");

        // A new demo can start after the interruption
        assert!(s.start_demo(2_000_000));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut s = session();
        s.handle_gesture(tap_at(GuitarString::D, 5, 50.0));
        s.start_demo(0);
        s.reset();
        assert_eq!(*s.fretted(), FrettedState::default());
        assert!(s.last_touched().is_none());
        assert_eq!(s.log().count(), 0);
        assert_eq!(s.pending_timers(), 0);
        assert!(!s.is_demo_active());
        assert_eq!(s.status(), &EngineStatus::idle(IDLE_MESSAGE));
    }

    #[test]
    fn test_config_load() {
        let dir = std::env::temp_dir().join(format!("fret-gestures-config-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let partial = dir.join("partial.json");
        std::fs::write(&partial, r#"{"log_limit":2}"#).unwrap();
        let config = SessionConfig::load(&partial).unwrap();
        assert_eq!(config.log_limit, 2);
        assert_eq!(config.master_gain, SessionConfig::default().master_gain);
        assert_eq!(config.demo_completion_delay_ms, DEMO_COMPLETION_DELAY_MS);

        let malformed = dir.join("malformed.json");
        std::fs::write(&malformed, "{ log_limit: ").unwrap();
        assert!(SessionConfig::load(&malformed).is_none());

        assert!(SessionConfig::load(&dir.join("missing.json")).is_none());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_gestures_reach_tone_device() {
        let device = SoftwareToneDevice::new(48_000);
        let mut s = Session::new(
            SessionConfig::default(),
            SynthDispatcher::new(Box::new(device.clone()), 0.35),
        );
        s.handle_gesture(tap_at(GuitarString::HighE, 5, 50.0));
        assert_eq!(device.voice_count(), 1);
        s.handle_gesture(strum(StrumDirection::Down));
        assert_eq!(device.voice_count(), 1 + STRING_COUNT);
        s.handle_gesture(slide(SlideDirection::Left, 40.0));
        assert_eq!(device.voice_count(), 2 + STRING_COUNT);
        s.handle_gesture(GestureEvent::Unknown { detail: "?".into() });
        assert_eq!(device.voice_count(), 2 + STRING_COUNT);
    }
}
