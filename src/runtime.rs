use crate::gesture::classify;
use crate::session::Session;
use crate::types::*;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use log::{debug, info, trace};

/// The runtime is the session's single event loop.
///
/// It receives `SessionEvent`s (raw motion, classified gestures, demo and
/// reset requests) in arrival order, sleeps until either the next event or
/// the next demo tick is due, and after every state change fans a
/// `StatusFrame` out to the presentation sinks.
///
/// Gesture handling and demo ticks both run on this one thread, so session
/// state is never touched concurrently. Demo ticks already due when an
/// event is dequeued fire first; a live gesture then cancels whatever is
/// still pending before it mutates anything.
pub struct Runtime {
    input_rx: Receiver<SessionEvent>,
    status_txs: Vec<Sender<StatusFrame>>,
    session: Session,
    clock: SessionClock,
}

impl Runtime {
    pub fn new(
        input_rx: Receiver<SessionEvent>,
        status_txs: Vec<Sender<StatusFrame>>,
        session: Session,
        clock: SessionClock,
    ) -> Self {
        Self {
            input_rx,
            status_txs,
            session,
            clock,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn into_session(self) -> Session {
        self.session
    }

    /// Run until the input channel closes or a `Shutdown` arrives.
    /// Blocks the calling thread.
    pub fn run(&mut self) {
        info!("Runtime running (log limit {})", self.session.config().log_limit);
        let mut event_count: u64 = 0;

        loop {
            let event = match self.session.next_deadline() {
                Some(due) => match self.input_rx.recv_deadline(self.clock.instant_at_ms(due)) {
                    Ok(event) => Some(event),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                None => match self.input_rx.recv() {
                    Ok(event) => Some(event),
                    Err(_) => break,
                },
            };

            let mut changed = self.session.poll_timers(self.clock.now_ms()) > 0;

            if let Some(event) = event {
                event_count += 1;
                match event {
                    SessionEvent::Motion(motion) => {
                        let gesture = classify(&motion);
                        trace!("Classified {:?} as {}", motion, gesture.kind());
                        self.session.handle_gesture(gesture);
                        changed = true;
                    }
                    SessionEvent::Gesture(gesture) => {
                        self.session.handle_gesture(gesture);
                        changed = true;
                    }
                    SessionEvent::StartDemo => {
                        changed |= self.session.start_demo(self.clock.now_ms());
                    }
                    SessionEvent::Reset => {
                        self.session.reset();
                        changed = true;
                    }
                    SessionEvent::Shutdown => {
                        debug!("Shutdown requested");
                        break;
                    }
                }
            }

            if changed {
                self.broadcast();
            }
        }

        self.session.shutdown();
        info!("Runtime shutting down after {} events", event_count);
    }

    fn broadcast(&self) {
        let frame = self.session.status_frame(self.clock.now_ms());
        trace!("Status: {}", frame.status.message);
        for tx in &self.status_txs {
            let _ = tx.send(frame.clone());
        }
    }
}
