//! Voice Engine — owns every sounding voice, the sustain pedal, and the
//! per-note lifecycle.
//!
//! Per note id the lifecycle is: idle, sounding, then either straight into
//! the release tail or parked as sustained (released by the player, held
//! audible by the pedal) until the pedal lifts. Voices whose release is
//! still rendering live in a separate retiring list, so a re-press during
//! a tail starts a fresh voice while the old one rings out.
//!
//! The engine knows nothing about input sources; it is driven purely by
//! `start` / `stop` / `set_sustain` in host call order.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreError;

use super::envelope::{ATTACK_SECS, PEAK_GAIN, RELEASE_SECS};
use super::mixer::Mixer;
use super::oscillator::Waveform;
use super::voice::Voice;

/// Engine configuration. `None` fields fall back to the built-in values
/// (triangle wave, 0.4 peak over 10 ms, 150 ms release, 0.8 master gain).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Waveform name: "sine", "square", "sawtooth", "triangle".
    pub waveform: String,
    /// Peak envelope gain [0, 1].
    pub peak_gain: Option<f64>,
    /// Attack ramp time in seconds.
    pub attack: Option<f64>,
    /// Release ramp time in seconds.
    pub release: Option<f64>,
    /// Master output gain applied after mixing.
    pub master_gain: Option<f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            waveform: "triangle".to_string(),
            peak_gain: None,
            attack: None,
            release: None,
            master_gain: None,
        }
    }
}

/// The polyphonic note-voice engine.
#[derive(Debug)]
pub struct VoiceEngine {
    sample_rate: f64,
    waveform: Waveform,
    peak: f64,
    attack: f64,
    release: f64,
    /// Live voices, at most one per note id.
    voices: HashMap<String, Voice>,
    /// Notes released by the player but held audible by the pedal.
    /// Always a subset of the live voice keys; always empty while the
    /// pedal is up.
    sustained: HashSet<String>,
    /// Released voices still rendering their tails.
    retiring: Vec<Voice>,
    sustain: bool,
    mixer: Mixer,
}

impl VoiceEngine {
    pub fn new(sample_rate: f64) -> Result<Self, CoreError> {
        VoiceEngine::with_config(sample_rate, &EngineConfig::default())
    }

    pub fn with_config(sample_rate: f64, config: &EngineConfig) -> Result<Self, CoreError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(CoreError::InvalidSampleRate { rate: sample_rate });
        }
        let mut mixer = Mixer::new();
        if let Some(gain) = config.master_gain {
            mixer.master_gain = gain;
        }
        Ok(VoiceEngine {
            sample_rate,
            waveform: Waveform::from_name(&config.waveform),
            peak: config.peak_gain.unwrap_or(PEAK_GAIN),
            attack: config.attack.unwrap_or(ATTACK_SECS),
            release: config.release.unwrap_or(RELEASE_SECS),
            voices: HashMap::new(),
            sustained: HashSet::new(),
            retiring: Vec::new(),
            sustain: false,
            mixer,
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Start a voice for `note`. A note with a live voice is left alone
    /// (no double trigger); if that voice was only held by the pedal, the
    /// press reclaims it so the next pedal lift no longer releases it.
    pub fn start(&mut self, note: &str, frequency: f64) {
        if self.voices.contains_key(note) {
            if self.sustained.remove(note) {
                debug!(note, "press reclaimed a pedal-held note");
            } else {
                debug!(note, "start for a note already sounding");
            }
            return;
        }
        let voice = Voice::new(
            frequency,
            self.waveform,
            self.sample_rate,
            self.peak,
            self.attack,
            self.release,
        );
        self.voices.insert(note.to_string(), voice);
    }

    /// Stop `note`. With the pedal down the voice keeps sounding and the
    /// note is parked as sustained; otherwise its release begins. A stop
    /// for a note with no live voice is absorbed.
    pub fn stop(&mut self, note: &str) {
        if !self.voices.contains_key(note) {
            debug!(note, "stop for a note with no live voice");
            return;
        }
        if self.sustain {
            self.sustained.insert(note.to_string());
            return;
        }
        self.begin_release(note);
    }

    /// Move the pedal. Lifting it releases every pedal-held note through
    /// the same ramp as a normal stop; pressing it changes nothing until
    /// a later stop arrives.
    pub fn set_sustain(&mut self, active: bool) {
        self.sustain = active;
        if !active {
            for note in std::mem::take(&mut self.sustained) {
                self.begin_release(&note);
            }
        }
    }

    fn begin_release(&mut self, note: &str) {
        if let Some(mut voice) = self.voices.remove(note) {
            voice.note_off();
            self.retiring.push(voice);
        }
        self.sustained.remove(note);
    }

    pub fn sustain_active(&self) -> bool {
        self.sustain
    }

    /// True while `note` has a live (sounding or pedal-held) voice.
    pub fn is_live(&self, note: &str) -> bool {
        self.voices.contains_key(note)
    }

    /// True while `note` is held audible only by the pedal.
    pub fn is_sustained(&self, note: &str) -> bool {
        self.sustained.contains(note)
    }

    pub fn live_count(&self) -> usize {
        self.voices.len()
    }

    pub fn retiring_count(&self) -> usize {
        self.retiring.len()
    }

    /// Render one block into `out`, mixing every live and retiring voice.
    /// Voices whose release completed inside the block are torn down
    /// afterwards, never mid-ramp.
    pub fn render(&mut self, out: &mut [f32]) {
        self.mixer.clear(out.len());
        for voice in self.voices.values_mut().chain(self.retiring.iter_mut()) {
            for i in 0..out.len() {
                self.mixer.add(i, voice.next_sample());
            }
        }
        self.mixer.write_to(out);
        self.retiring.retain(|v| !v.is_finished());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f64 = 48_000.0;
    const RELEASE_SAMPLES: usize = (RELEASE_SECS * SR) as usize;

    fn engine() -> VoiceEngine {
        VoiceEngine::new(SR).unwrap()
    }

    fn render_samples(e: &mut VoiceEngine, n: usize) -> Vec<f32> {
        let mut out = vec![0.0_f32; n];
        e.render(&mut out);
        out
    }

    fn peak_of(samples: &[f32]) -> f32 {
        samples.iter().fold(0.0_f32, |m, &s| m.max(s.abs()))
    }

    #[test]
    fn rejects_bad_sample_rates() {
        assert!(VoiceEngine::new(0.0).is_err());
        assert!(VoiceEngine::new(-44100.0).is_err());
        assert!(VoiceEngine::new(f64::NAN).is_err());
        assert!(VoiceEngine::new(48_000.0).is_ok());
    }

    #[test]
    fn start_stop_cycle_returns_to_idle() {
        let mut e = engine();
        e.start("A4", 440.0);
        assert!(e.is_live("A4"));
        assert_eq!(e.live_count(), 1);

        e.stop("A4");
        assert!(!e.is_live("A4"), "stop immediately retires the voice");
        assert_eq!(e.retiring_count(), 1);

        render_samples(&mut e, RELEASE_SAMPLES + 64);
        assert_eq!(e.retiring_count(), 0, "tail torn down after the ramp");
    }

    #[test]
    fn start_is_idempotent() {
        let mut e = engine();
        e.start("A4", 440.0);
        e.start("A4", 440.0);
        assert_eq!(e.live_count(), 1, "second start is a no-op");

        e.stop("A4");
        assert_eq!(e.live_count(), 0, "one stop fully releases the note");
        render_samples(&mut e, RELEASE_SAMPLES + 64);
        assert_eq!(e.retiring_count(), 0);
    }

    #[test]
    fn stop_without_voice_is_absorbed() {
        let mut e = engine();
        e.stop("A4");
        e.stop("G#4");
        assert_eq!(e.live_count(), 0);
        assert_eq!(e.retiring_count(), 0);
    }

    #[test]
    fn polyphony_renders_all_voices() {
        let mut e = engine();
        e.start("C4", 261.63);
        e.start("E4", 329.63);
        e.start("G4", 392.00);
        assert_eq!(e.live_count(), 3);

        let block = render_samples(&mut e, 4800);
        assert!(peak_of(&block) > 0.1, "chord should be audible");
    }

    #[test]
    fn silence_when_no_voices() {
        let mut e = engine();
        let block = render_samples(&mut e, 256);
        assert!(block.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn sustain_holds_released_note() {
        let mut e = engine();
        e.start("A4", 440.0);
        e.set_sustain(true);
        e.stop("A4");

        // The voice persists, sounding, between stop and pedal lift.
        assert!(e.is_live("A4"));
        assert!(e.is_sustained("A4"));
        let block = render_samples(&mut e, 4800);
        assert!(peak_of(&block) > 0.1, "pedal-held note keeps sounding");

        e.set_sustain(false);
        assert!(!e.is_live("A4"), "pedal lift releases the note");
        assert!(!e.is_sustained("A4"));
        assert_eq!(e.retiring_count(), 1);
    }

    #[test]
    fn sustain_released_before_stop_has_no_effect() {
        let mut e = engine();
        e.set_sustain(true);
        e.start("A4", 440.0);
        e.set_sustain(false);

        e.stop("A4");
        assert!(!e.is_live("A4"), "stop releases immediately, pedal was up");
        assert_eq!(e.retiring_count(), 1);
    }

    #[test]
    fn pedal_press_alone_changes_nothing() {
        let mut e = engine();
        e.start("A4", 440.0);
        e.set_sustain(true);
        assert!(e.is_live("A4"));
        assert!(!e.is_sustained("A4"), "sustained only after a stop");
    }

    #[test]
    fn sustained_set_empty_while_pedal_up() {
        let mut e = engine();
        e.start("C4", 261.63);
        e.start("E4", 329.63);
        e.set_sustain(true);
        e.stop("C4");
        e.stop("E4");
        assert!(e.is_sustained("C4") && e.is_sustained("E4"));

        e.set_sustain(false);
        assert!(!e.is_sustained("C4") && !e.is_sustained("E4"));
        assert_eq!(e.live_count(), 0);
        assert_eq!(e.retiring_count(), 2, "both drain through the release path");
    }

    #[test]
    fn repress_reclaims_pedal_held_note() {
        let mut e = engine();
        e.start("A4", 440.0);
        e.set_sustain(true);
        e.stop("A4");
        assert!(e.is_sustained("A4"));

        // Key goes back down while the pedal is still held.
        e.start("A4", 440.0);
        assert!(e.is_live("A4"));
        assert!(!e.is_sustained("A4"), "press reclaims the note from the pedal");
        assert_eq!(e.live_count(), 1, "no second voice, no retrigger");

        // Pedal lift must not silence a key that is physically down.
        e.set_sustain(false);
        assert!(e.is_live("A4"));
        assert_eq!(e.retiring_count(), 0);

        e.stop("A4");
        assert!(!e.is_live("A4"));
    }

    #[test]
    fn restart_during_release_tail_starts_fresh_voice() {
        let mut e = engine();
        e.start("A4", 440.0);
        render_samples(&mut e, 960);
        e.stop("A4");
        render_samples(&mut e, 960); // partway through the tail

        e.start("A4", 440.0);
        assert!(e.is_live("A4"), "re-press restarts immediately");
        assert_eq!(e.retiring_count(), 1, "old tail keeps ringing");

        render_samples(&mut e, RELEASE_SAMPLES);
        assert_eq!(e.retiring_count(), 0);
        assert!(e.is_live("A4"), "fresh voice unaffected by the old teardown");
    }

    #[test]
    fn release_tail_lasts_the_full_window_and_no_longer() {
        let mut e = engine();
        e.start("A4", 440.0);
        render_samples(&mut e, 960);
        e.stop("A4");

        render_samples(&mut e, RELEASE_SAMPLES - 64);
        assert_eq!(e.retiring_count(), 1, "tail still rendering");

        render_samples(&mut e, 128);
        assert_eq!(e.retiring_count(), 0, "torn down right after the ramp");
    }

    #[test]
    fn rendered_peak_respects_envelope_cap() {
        let mut e = engine();
        e.start("A4", 440.0);
        let block = render_samples(&mut e, 9600);
        // One voice: envelope peak 0.4, master gain 0.8, soft clip.
        let cap = (PEAK_GAIN * 0.8_f64).tanh() as f32;
        assert!(
            peak_of(&block) <= cap + 1e-6,
            "peak {} exceeds cap {cap}",
            peak_of(&block)
        );
    }

    #[test]
    fn attack_ramp_prevents_click() {
        let mut e = engine();
        e.start("A4", 440.0);
        let block = render_samples(&mut e, 8);
        // 8 samples in, the envelope has only reached ~1.6% of peak.
        assert!(
            peak_of(&block) < 0.01,
            "first samples must ramp from silence, got {}",
            peak_of(&block)
        );
    }

    #[test]
    fn config_overrides_apply() {
        let config = EngineConfig {
            waveform: "sine".to_string(),
            peak_gain: Some(0.9),
            attack: Some(0.0),
            release: Some(0.001),
            master_gain: Some(1.0),
        };
        let mut e = VoiceEngine::with_config(SR, &config).unwrap();
        e.start("A4", 440.0);
        let block = render_samples(&mut e, 4800);
        // Instant attack at 0.9 peak: well above the default cap.
        assert!(peak_of(&block) > 0.5);

        e.stop("A4");
        render_samples(&mut e, 96);
        assert_eq!(e.retiring_count(), 0, "1 ms release finishes fast");
    }

    #[test]
    fn config_defaults_are_none() {
        let config = EngineConfig::default();
        assert_eq!(config.waveform, "triangle");
        assert!(config.peak_gain.is_none());
        assert!(config.attack.is_none());
        assert!(config.release.is_none());
        assert!(config.master_gain.is_none());
    }

    #[test]
    fn stop_is_totally_ordered_per_note() {
        // press, release, press, release on one note id; the voice count
        // for that note is 0 or 1 at every step.
        let mut e = engine();
        for _ in 0..3 {
            e.start("D4", 293.66);
            assert_eq!(e.live_count(), 1);
            e.stop("D4");
            assert_eq!(e.live_count(), 0);
        }
        render_samples(&mut e, RELEASE_SAMPLES + 64);
        assert_eq!(e.retiring_count(), 0);
    }
}
