//! JSONL gesture-script reader: parses scripted input back into session events.
//!
//! One JSON object per line, tagged by `"type"`:
//!
//! ```text
//! {"type":"motion","duration_ms":90,"dx":2,"dy":1,"vx":0,"vy":0,"end":{"x":300,"y":80},"normalized_end":{"x":0.5,"y":0.3}}
//! {"type":"gesture","gesture":{"kind":"strum","direction":"down","distance_px":120,"speed":0.9}}
//! {"type":"demo","at_ms":1500}
//! {"type":"reset"}
//! ```
//!
//! `at_ms` is optional and only used when pacing playback in real time.
//! Blank lines and lines starting with `#` are skipped.

use crate::types::*;
use crossbeam_channel::Sender;
use log::{info, warn};
use serde::Deserialize;
use std::io::BufRead;
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScriptCommand {
    Motion(MotionSample),
    Gesture { gesture: GestureEvent },
    Demo,
    Reset,
}

impl ScriptCommand {
    pub fn into_event(self) -> SessionEvent {
        match self {
            ScriptCommand::Motion(m) => SessionEvent::Motion(m),
            ScriptCommand::Gesture { gesture } => SessionEvent::Gesture(gesture),
            ScriptCommand::Demo => SessionEvent::StartDemo,
            ScriptCommand::Reset => SessionEvent::Reset,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScriptLine {
    /// Session time at which to deliver this line when pacing
    #[serde(default)]
    pub at_ms: Option<u64>,
    #[serde(flatten)]
    pub command: ScriptCommand,
}

/// Line-by-line JSONL script reader.
pub struct ScriptReader<R: BufRead> {
    reader: R,
    line_buf: String,
    line_no: usize,
}

impl<R: BufRead> ScriptReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_buf: String::new(),
            line_no: 0,
        }
    }

    /// Read the next command. Returns `None` at EOF, `Err` for unparseable lines.
    pub fn next_line(&mut self) -> Option<Result<ScriptLine, String>> {
        loop {
            self.line_buf.clear();
            match self.reader.read_line(&mut self.line_buf) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line_no += 1;
                    let trimmed = self.line_buf.trim();
                    if trimmed.is_empty() || trimmed.starts_with('#') {
                        continue;
                    }
                    return Some(
                        serde_json::from_str::<ScriptLine>(trimmed)
                            .map_err(|e| format!("line {}: {}", self.line_no, e)),
                    );
                }
                Err(e) => return Some(Err(format!("read line {}: {}", self.line_no + 1, e))),
            }
        }
    }

    /// Read all remaining commands, skipping malformed lines.
    pub fn read_all(mut self) -> Vec<ScriptLine> {
        let mut lines = Vec::new();
        while let Some(result) = self.next_line() {
            match result {
                Ok(line) => lines.push(line),
                Err(e) => warn!("Skipping script {}", e),
            }
        }
        lines
    }
}

/// Feed script lines to the runtime. With `realtime`, each line carrying
/// `at_ms` waits until the session clock reaches it. Returns how many
/// events were delivered before the channel closed.
pub fn play_script(
    lines: Vec<ScriptLine>,
    tx: &Sender<SessionEvent>,
    clock: &SessionClock,
    realtime: bool,
) -> usize {
    info!("Playing script: {} line(s){}", lines.len(), if realtime { " (paced)" } else { "" });
    let mut sent = 0;
    for line in lines {
        if realtime {
            if let Some(at) = line.at_ms {
                let now = clock.now_ms();
                if at > now {
                    thread::sleep(Duration::from_millis(at - now));
                }
            }
        }
        if tx.send(line.command.into_event()).is_err() {
            break;
        }
        sent += 1;
    }
    sent
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const SCRIPT: &str = r#"
# warm-up tap on the high E string
{"type":"motion","duration_ms":90,"dx":2,"dy":1,"vx":0.0,"vy":0.0,"end":{"x":300,"y":40},"normalized_end":{"x":0.5,"y":0.1}}
{"type":"gesture","at_ms":500,"gesture":{"kind":"strum","direction":"down","distance_px":120,"speed":0.9}}
not json at all
{"type":"demo","at_ms":1500}
{"type":"reset"}
"#;

    #[test]
    fn test_reads_all_command_kinds() {
        let lines = ScriptReader::new(Cursor::new(SCRIPT)).read_all();
        assert_eq!(lines.len(), 4);

        match &lines[0].command {
            ScriptCommand::Motion(m) => {
                assert_eq!(m.duration_ms, 90.0);
                assert_eq!(m.normalized_end, Some(Point::new(0.5, 0.1)));
            }
            other => panic!("expected motion, got {:?}", other),
        }
        assert_eq!(lines[0].at_ms, None);

        assert_eq!(lines[1].at_ms, Some(500));
        assert_eq!(
            lines[1].command,
            ScriptCommand::Gesture {
                gesture: GestureEvent::Strum {
                    direction: StrumDirection::Down,
                    distance_px: 120.0,
                    speed: 0.9
                }
            }
        );
        assert_eq!(lines[2].command, ScriptCommand::Demo);
        assert_eq!(lines[2].at_ms, Some(1500));
        assert_eq!(lines[3].command, ScriptCommand::Reset);
    }

    #[test]
    fn test_malformed_line_reports_line_number() {
        let mut reader = ScriptReader::new(Cursor::new("{\"type\":\"reset\"}\n{\"type\":\"nope\"}\n"));
        assert!(reader.next_line().unwrap().is_ok());
        let err = reader.next_line().unwrap().unwrap_err();
        assert!(err.starts_with("line 2"), "{}", err);
        assert!(reader.next_line().is_none());
    }

    #[test]
    fn test_play_script_sends_in_order() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let lines = ScriptReader::new(Cursor::new(SCRIPT)).read_all();
        let sent = play_script(lines, &tx, &SessionClock::new(), false);
        assert_eq!(sent, 4);
        drop(tx);
        let kinds: Vec<&str> = rx
            .iter()
            .map(|e| match e {
                SessionEvent::Motion(_) => "motion",
                SessionEvent::Gesture(_) => "gesture",
                SessionEvent::StartDemo => "demo",
                SessionEvent::Reset => "reset",
                SessionEvent::Shutdown => "shutdown",
            })
            .collect();
        assert_eq!(kinds, vec!["motion", "gesture", "demo", "reset"]);
    }
}
