//! Voice — one sounding note: a tone generator shaped by a gain envelope.
//!
//! A voice is constructed already sounding (the attack starts on the first
//! rendered sample) and retires itself exactly one release window after
//! `note_off`. The engine drops it only once `is_finished` reports true,
//! so teardown can never truncate the release ramp.

use super::envelope::GainEnvelope;
use super::oscillator::{Oscillator, Waveform};

#[derive(Debug, Clone)]
pub struct Voice {
    oscillator: Oscillator,
    envelope: GainEnvelope,
    /// Latched once the release envelope has fully rendered.
    finished: bool,
}

impl Voice {
    /// Create a voice at `frequency` and begin its attack. The envelope
    /// timings come from the owning engine's configuration.
    pub fn new(
        frequency: f64,
        waveform: Waveform,
        sample_rate: f64,
        peak: f64,
        attack: f64,
        release: f64,
    ) -> Self {
        let mut envelope = GainEnvelope::new(sample_rate);
        envelope.peak = peak;
        envelope.attack = attack;
        envelope.release = release;
        envelope.gate_on();
        Voice {
            oscillator: Oscillator::new(waveform, frequency, sample_rate),
            envelope,
            finished: false,
        }
    }

    /// Begin the release ramp. The generator keeps running for exactly
    /// the release window, then the voice reports finished.
    pub fn note_off(&mut self) {
        self.envelope.gate_off();
    }

    /// Generate the next output sample.
    pub fn next_sample(&mut self) -> f64 {
        if self.finished {
            return 0.0;
        }

        let osc = self.oscillator.next_sample();
        let gain = self.envelope.next_sample();

        if self.envelope.is_finished() {
            self.finished = true;
        }

        osc * gain
    }

    /// True once released and fully rendered; safe to tear down.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::envelope::{ATTACK_SECS, PEAK_GAIN, RELEASE_SECS};

    const SR: f64 = 48_000.0;

    fn voice(frequency: f64) -> Voice {
        Voice::new(frequency, Waveform::Triangle, SR, PEAK_GAIN, ATTACK_SECS, RELEASE_SECS)
    }

    #[test]
    fn voice_sounds_after_attack() {
        let mut v = voice(440.0);
        let mut peak = 0.0_f64;
        for _ in 0..4800 {
            peak = peak.max(v.next_sample().abs());
        }
        assert!(peak > 0.2, "voice should be audible, peak={peak}");
        assert!(peak <= PEAK_GAIN + 1e-9, "gain capped at {PEAK_GAIN}");
    }

    #[test]
    fn voice_finishes_exactly_after_release_window() {
        let mut v = voice(440.0);
        for _ in 0..1000 {
            v.next_sample();
        }
        v.note_off();

        let release_samples = (RELEASE_SECS * SR) as usize;
        for _ in 0..release_samples - 1 {
            v.next_sample();
            assert!(!v.is_finished(), "teardown must wait for the full ramp");
        }
        v.next_sample();
        assert!(v.is_finished());
        assert_eq!(v.next_sample(), 0.0, "finished voice is silent");
    }

    #[test]
    fn release_tail_decays_to_silence() {
        let mut v = voice(261.63);
        for _ in 0..2000 {
            v.next_sample();
        }
        v.note_off();
        let mut tail_end = 0.0_f64;
        let release_samples = (RELEASE_SECS * SR) as usize;
        for i in 0..release_samples {
            let s = v.next_sample().abs();
            if i >= release_samples - 48 {
                tail_end = tail_end.max(s);
            }
        }
        assert!(tail_end < 0.01, "tail should approach silence, got {tail_end}");
    }
}
