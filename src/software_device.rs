use crate::tone_device::{DeviceError, EnvelopeId, ToneDevice, ToneId};
use log::trace;
use std::collections::HashMap;
use std::f64::consts::TAU;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq)]
enum Ramp {
    Step,
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Copy)]
struct ParamEvent {
    time: f64,
    value: f64,
    ramp: Ramp,
}

/// A parameter timeline: stepped values and ramps scheduled at absolute times.
///
/// A ramp event interpolates from the previous event's (time, value) to its
/// own. Exponential ramps need both endpoints strictly positive; otherwise
/// the value holds until the ramp's end and then steps.
#[derive(Debug, Clone)]
pub struct Automation {
    initial: f64,
    events: Vec<ParamEvent>,
}

impl Automation {
    pub fn new(initial: f64) -> Self {
        Self {
            initial,
            events: Vec::new(),
        }
    }

    fn push(&mut self, event: ParamEvent) {
        // Keep time order; equal times keep insertion order
        let at = self.events.partition_point(|e| e.time <= event.time);
        self.events.insert(at, event);
    }

    pub fn set_at(&mut self, value: f64, time: f64) {
        self.push(ParamEvent { time, value, ramp: Ramp::Step });
    }

    pub fn linear_to(&mut self, value: f64, end: f64) {
        self.push(ParamEvent { time: end, value, ramp: Ramp::Linear });
    }

    pub fn exponential_to(&mut self, value: f64, end: f64) {
        self.push(ParamEvent { time: end, value, ramp: Ramp::Exponential });
    }

    pub fn value_at(&self, t: f64) -> f64 {
        let mut prev_time = 0.0;
        let mut prev_value = self.initial;
        for event in &self.events {
            if event.time <= t {
                prev_time = event.time;
                prev_value = event.value;
                continue;
            }
            let span = event.time - prev_time;
            let progress = if span > 0.0 { (t - prev_time) / span } else { 1.0 };
            return match event.ramp {
                Ramp::Step => prev_value,
                Ramp::Linear => prev_value + (event.value - prev_value) * progress,
                Ramp::Exponential => {
                    if prev_value > 0.0 && event.value > 0.0 {
                        prev_value * (event.value / prev_value).powf(progress)
                    } else {
                        prev_value
                    }
                }
            };
        }
        prev_value
    }
}

struct Voice {
    frequency: Automation,
    envelope: Option<EnvelopeId>,
    start: Option<f64>,
    stop: Option<f64>,
    phase: f64,
}

impl Voice {
    fn sounding_at(&self, t: f64) -> bool {
        match self.start {
            Some(start) => t >= start && self.stop.map_or(true, |stop| t < stop),
            None => false,
        }
    }
}

struct Mixer {
    sample_rate: u32,
    frames_rendered: u64,
    next_id: u32,
    voices: HashMap<ToneId, Voice>,
    envelopes: HashMap<EnvelopeId, Automation>,
}

impl Mixer {
    fn time(&self) -> f64 {
        self.frames_rendered as f64 / self.sample_rate as f64
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn voice(&mut self, tone: ToneId) -> Result<&mut Voice, DeviceError> {
        self.voices.get_mut(&tone).ok_or(DeviceError::UnknownTone(tone))
    }

    fn envelope(&mut self, envelope: EnvelopeId) -> Result<&mut Automation, DeviceError> {
        self.envelopes
            .get_mut(&envelope)
            .ok_or(DeviceError::UnknownEnvelope(envelope))
    }

    fn render(&mut self, out: &mut [f32]) {
        let dt = 1.0 / self.sample_rate as f64;
        for sample in out.iter_mut() {
            let t = self.time();
            let mut acc = 0.0;
            for voice in self.voices.values_mut() {
                if !voice.sounding_at(t) {
                    continue;
                }
                let gain = voice
                    .envelope
                    .and_then(|e| self.envelopes.get(&e))
                    .map_or(0.0, |env| env.value_at(t));
                acc += gain * voice.phase.sin();
                voice.phase = (voice.phase + TAU * voice.frequency.value_at(t) * dt) % TAU;
            }
            *sample = acc.clamp(-1.0, 1.0) as f32;
            self.frames_rendered += 1;
        }

        // Drop voices that have finished, along with their envelopes
        let now = self.time();
        let finished: Vec<ToneId> = self
            .voices
            .iter()
            .filter(|(_, v)| v.stop.is_some_and(|stop| stop <= now))
            .map(|(&id, _)| id)
            .collect();
        for id in finished {
            if let Some(voice) = self.voices.remove(&id) {
                if let Some(env) = voice.envelope {
                    self.envelopes.remove(&env);
                }
            }
        }
    }
}

/// In-process software synthesizer implementing `ToneDevice`.
///
/// Sine voices through WebAudio-style gain automation, mixed to mono.
/// Cloning yields another handle to the same mixer, so one clone can be
/// handed to the session while another renders (or is inspected).
/// The device clock advances only as samples are rendered.
#[derive(Clone)]
pub struct SoftwareToneDevice {
    mixer: Arc<Mutex<Mixer>>,
}

impl SoftwareToneDevice {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            mixer: Arc::new(Mutex::new(Mixer {
                sample_rate: sample_rate.max(1),
                frames_rendered: 0,
                next_id: 0,
                voices: HashMap::new(),
                envelopes: HashMap::new(),
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Mixer>, DeviceError> {
        self.mixer
            .lock()
            .map_err(|_| DeviceError::Backend("mixer lock poisoned".into()))
    }

    pub fn sample_rate(&self) -> u32 {
        self.lock().map_or(0, |m| m.sample_rate)
    }

    /// Change the output rate. Only meaningful before rendering starts.
    pub fn set_sample_rate(&self, sample_rate: u32) {
        if let Ok(mut m) = self.lock() {
            m.sample_rate = sample_rate.max(1);
        }
    }

    /// Render the next `out.len()` mono samples, advancing the device clock.
    pub fn render(&self, out: &mut [f32]) {
        match self.lock() {
            Ok(mut m) => m.render(out),
            Err(_) => out.fill(0.0),
        }
    }

    /// Number of voices created and not yet finished.
    pub fn voice_count(&self) -> usize {
        self.lock().map_or(0, |m| m.voices.len())
    }

    /// Scheduled start times of live voices, earliest first.
    pub fn start_times(&self) -> Vec<f64> {
        let mut starts: Vec<f64> = self
            .lock()
            .map(|m| m.voices.values().filter_map(|v| v.start).collect())
            .unwrap_or_default();
        starts.sort_by(|a, b| a.total_cmp(b));
        starts
    }

    pub fn frequency_at(&self, tone: ToneId, t: f64) -> Option<f64> {
        let m = self.lock().ok()?;
        m.voices.get(&tone).map(|v| v.frequency.value_at(t))
    }

    /// Gain of the envelope connected to `tone` at time `t`.
    pub fn gain_at(&self, tone: ToneId, t: f64) -> Option<f64> {
        let m = self.lock().ok()?;
        let env = m.voices.get(&tone)?.envelope?;
        m.envelopes.get(&env).map(|a| a.value_at(t))
    }

    /// Ids of live voices in creation order.
    pub fn tones(&self) -> Vec<ToneId> {
        let mut ids: Vec<ToneId> = self
            .lock()
            .map(|m| m.voices.keys().copied().collect())
            .unwrap_or_default();
        ids.sort_by_key(|id| id.0);
        ids
    }
}

impl ToneDevice for SoftwareToneDevice {
    fn current_time(&self) -> f64 {
        self.lock().map_or(0.0, |m| m.time())
    }

    fn create_tone(&mut self, frequency_hz: f64) -> Result<ToneId, DeviceError> {
        let mut m = self.lock()?;
        let id = ToneId(m.next_id());
        m.voices.insert(
            id,
            Voice {
                frequency: Automation::new(frequency_hz),
                envelope: None,
                start: None,
                stop: None,
                phase: 0.0,
            },
        );
        trace!("software device: tone {:?} @ {:.1} Hz", id, frequency_hz);
        Ok(id)
    }

    fn create_envelope(&mut self) -> Result<EnvelopeId, DeviceError> {
        let mut m = self.lock()?;
        let id = EnvelopeId(m.next_id());
        m.envelopes.insert(id, Automation::new(1.0));
        Ok(id)
    }

    fn connect(&mut self, tone: ToneId, envelope: EnvelopeId) -> Result<(), DeviceError> {
        let mut m = self.lock()?;
        if !m.envelopes.contains_key(&envelope) {
            return Err(DeviceError::UnknownEnvelope(envelope));
        }
        m.voice(tone)?.envelope = Some(envelope);
        Ok(())
    }

    fn set_gain(&mut self, envelope: EnvelopeId, value: f64, at: f64) -> Result<(), DeviceError> {
        self.lock()?.envelope(envelope)?.set_at(value, at);
        Ok(())
    }

    fn set_frequency(&mut self, tone: ToneId, hz: f64, at: f64) -> Result<(), DeviceError> {
        self.lock()?.voice(tone)?.frequency.set_at(hz, at);
        Ok(())
    }

    fn start(&mut self, tone: ToneId, at: f64) -> Result<(), DeviceError> {
        self.lock()?.voice(tone)?.start = Some(at);
        Ok(())
    }

    fn stop(&mut self, tone: ToneId, at: f64) -> Result<(), DeviceError> {
        self.lock()?.voice(tone)?.stop = Some(at);
        Ok(())
    }

    fn ramp_gain_linear(&mut self, envelope: EnvelopeId, value: f64, end: f64) -> Result<(), DeviceError> {
        self.lock()?.envelope(envelope)?.linear_to(value, end);
        Ok(())
    }

    fn ramp_gain_exponential(
        &mut self,
        envelope: EnvelopeId,
        value: f64,
        end: f64,
    ) -> Result<(), DeviceError> {
        self.lock()?.envelope(envelope)?.exponential_to(value, end);
        Ok(())
    }

    fn ramp_frequency_linear(&mut self, tone: ToneId, hz: f64, end: f64) -> Result<(), DeviceError> {
        self.lock()?.voice(tone)?.frequency.linear_to(hz, end);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::{SynthDispatcher, ATTACK_S, RELEASE_S, SILENCE_GAIN, TAP_SUSTAIN_S};
    use crate::mapping::pitch_snapshot;
    use crate::types::*;

    #[test]
    fn test_automation_ramps() {
        let mut a = Automation::new(1.0);
        a.set_at(0.0, 1.0);
        a.linear_to(0.5, 2.0);
        a.set_at(0.5, 3.0);
        a.exponential_to(0.005, 5.0);
        assert_eq!(a.value_at(0.5), 1.0);
        assert_eq!(a.value_at(1.0), 0.0);
        assert!((a.value_at(1.5) - 0.25).abs() < 1e-9);
        assert!((a.value_at(2.5) - 0.5).abs() < 1e-9);
        // Halfway through a 100x exponential decay is a 10x drop
        assert!((a.value_at(4.0) - 0.05).abs() < 1e-9);
        assert!((a.value_at(9.0) - 0.005).abs() < 1e-12);
    }

    #[test]
    fn test_exponential_from_zero_holds() {
        let mut a = Automation::new(0.0);
        a.exponential_to(1.0, 1.0);
        assert_eq!(a.value_at(0.5), 0.0);
        assert_eq!(a.value_at(1.0), 1.0);
    }

    #[test]
    fn test_dispatched_tap_envelope() {
        let device = SoftwareToneDevice::new(48_000);
        let mut d = SynthDispatcher::new(Box::new(device.clone()), 0.5);
        let pitch = pitch_snapshot(GuitarString::HighE, 5, Articulation::Tap, Some(50.0));
        d.trigger_tap(&pitch, 0.8);

        let tones = device.tones();
        assert_eq!(tones.len(), 1);
        let tone = tones[0];
        assert_eq!(device.start_times(), vec![0.0]);
        assert!((device.frequency_at(tone, 0.2).unwrap() - 440.0).abs() < 1e-9);
        assert_eq!(device.gain_at(tone, 0.0), Some(0.0));
        assert!((device.gain_at(tone, ATTACK_S).unwrap() - 0.4).abs() < 1e-9);
        assert!((device.gain_at(tone, 0.3).unwrap() - 0.4).abs() < 1e-9);
        let end = ATTACK_S + TAP_SUSTAIN_S + RELEASE_S;
        assert!((device.gain_at(tone, end).unwrap() - SILENCE_GAIN).abs() < 1e-9);
    }

    #[test]
    fn test_render_produces_audio_and_frees_voices() {
        let device = SoftwareToneDevice::new(8_000);
        let mut d = SynthDispatcher::new(Box::new(device.clone()), 0.5);
        let pitch = pitch_snapshot(GuitarString::A, 0, Articulation::Tap, None);
        d.trigger_tap(&pitch, 0.9);

        let mut buf = vec![0.0f32; 2_400]; // 0.3s
        device.render(&mut buf);
        let peak = buf.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.3, "peak={}", peak);
        assert!((device.current_time() - 0.3).abs() < 1e-9);

        let mut tail = vec![0.0f32; 8_000];
        device.render(&mut tail);
        assert_eq!(device.voice_count(), 0);
    }

    #[test]
    fn test_glide_reaches_target() {
        let device = SoftwareToneDevice::new(48_000);
        let mut d = SynthDispatcher::new(Box::new(device.clone()), 1.0);
        d.trigger_slide(220.0, 440.0, 150.0, 0.5);
        let tone = device.tones()[0];
        assert!((device.frequency_at(tone, 0.0).unwrap() - 220.0).abs() < 1e-9);
        assert!((device.frequency_at(tone, 0.25).unwrap() - 330.0).abs() < 1e-6);
        assert!((device.frequency_at(tone, 0.6).unwrap() - 440.0).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_handles_are_errors() {
        let mut device = SoftwareToneDevice::new(48_000);
        assert!(matches!(
            device.start(ToneId(99), 0.0),
            Err(DeviceError::UnknownTone(ToneId(99)))
        ));
        let tone = device.create_tone(100.0).unwrap();
        assert!(matches!(
            device.connect(tone, EnvelopeId(42)),
            Err(DeviceError::UnknownEnvelope(_))
        ));
    }
}
