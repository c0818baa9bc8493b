use crate::types::*;
use crossbeam_channel::Receiver;
use log::{debug, error, info};
use rosc::{OscMessage, OscPacket, OscType};
use std::net::UdpSocket;

/// Mirrors every status frame to an OSC listener over UDP.
pub struct OscSender {
    rx: Receiver<StatusFrame>,
    target: String,
}

impl OscSender {
    pub fn new(rx: Receiver<StatusFrame>, target: String) -> Self {
        Self { rx, target }
    }

    /// Run the OSC sender loop. Blocks the calling thread.
    pub fn run(&self) {
        let socket = match UdpSocket::bind("0.0.0.0:0") {
            Ok(s) => s,
            Err(e) => {
                error!("Failed to bind UDP socket: {}", e);
                return;
            }
        };
        info!("OSC sender → {}", self.target);

        for frame in self.rx.iter() {
            if let Err(e) = self.send_frame(&socket, &frame) {
                debug!("OSC send error: {}", e);
            }
        }
        info!("OSC sender shutting down");
    }

    fn send_frame(
        &self,
        socket: &UdpSocket,
        frame: &StatusFrame,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let bundle = OscPacket::Bundle(rosc::OscBundle {
            timetag: rosc::OscTime { seconds: 0, fractional: 1 },
            content: status_messages(frame)
                .into_iter()
                .map(OscPacket::Message)
                .collect(),
        });
        let buf = rosc::encoder::encode(&bundle)?;
        socket.send_to(&buf, &self.target)?;
        Ok(())
    }
}

/// The OSC messages describing one frame.
///
/// Always sent: `/fret/gesture`, `/fret/message`, `/fret/demo` and one
/// `/fret/frets/<i>` per string (top string first). Pitch, strum, slide
/// and chord addresses appear only when the status carries them.
pub fn status_messages(frame: &StatusFrame) -> Vec<OscMessage> {
    let status = &frame.status;
    let mut msgs = Vec::new();

    let kind = status.last_gesture.as_ref().map_or("none", GestureEvent::kind);
    msgs.push(message("/fret/gesture", vec![OscType::String(kind.into())]));
    msgs.push(message("/fret/message", vec![OscType::String(status.message.clone())]));

    let pitch = status
        .active
        .as_ref()
        .or_else(|| status.slide.as_ref().map(|s| &s.pitch));
    if let Some(p) = pitch {
        msgs.push(message(
            "/fret/pitch",
            vec![
                OscType::Float(p.frequency_hz as f32),
                OscType::Int(p.midi as i32),
                OscType::Int(p.string.index() as i32),
                OscType::Int(p.fret as i32),
            ],
        ));
    }

    if let Some(strum) = &status.strum {
        msgs.push(message(
            "/fret/strum",
            vec![
                OscType::String(strum.direction.to_string()),
                OscType::Float(strum.velocity as f32),
            ],
        ));
    }

    if let Some(slide) = &status.slide {
        msgs.push(message(
            "/fret/slide",
            vec![
                OscType::String(slide.direction.to_string()),
                OscType::Int(slide.from_fret as i32),
                OscType::Int(slide.pitch.fret as i32),
                OscType::Float(slide.semitones as f32),
            ],
        ));
    }

    if let Some(chord) = &status.chord {
        msgs.push(message("/fret/chord", vec![OscType::String(chord.label.clone())]));
    }

    for (string, fret) in frame.fretted.iter() {
        msgs.push(message(
            &format!("/fret/frets/{}", string.index()),
            vec![OscType::Int(fret as i32)],
        ));
    }

    msgs.push(message("/fret/demo", vec![OscType::Int(frame.demo_active as i32)]));
    msgs
}

fn message(addr: &str, args: Vec<OscType>) -> OscMessage {
    OscMessage {
        addr: addr.to_string(),
        args,
    }
}
