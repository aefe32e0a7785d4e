//! Continuous-tone oscillator.
//!
//! A plain phase-accumulator generator. Triangle is the default timbre
//! (warmer than sine, less harsh than sawtooth); the other shapes exist
//! for configuration parity and are generated naively, which is adequate
//! at piano-range fundamentals.

use std::f64::consts::PI;

/// Supported waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    #[default]
    Triangle,
}

impl Waveform {
    /// Parse a waveform name. Unknown names fall back to triangle.
    pub fn from_name(name: &str) -> Waveform {
        match name {
            "sine" => Waveform::Sine,
            "square" => Waveform::Square,
            "sawtooth" | "saw" => Waveform::Sawtooth,
            _ => Waveform::Triangle,
        }
    }
}

/// A fixed-frequency tone generator for one voice.
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub waveform: Waveform,
    pub frequency: f64,
    phase: f64,
    sample_rate: f64,
}

impl Oscillator {
    pub fn new(waveform: Waveform, frequency: f64, sample_rate: f64) -> Self {
        Oscillator {
            waveform,
            frequency,
            phase: 0.0,
            sample_rate,
        }
    }

    /// Generate the next sample in [-1, 1].
    pub fn next_sample(&mut self) -> f64 {
        let sample = match self.waveform {
            Waveform::Sine => (2.0 * PI * self.phase).sin(),
            Waveform::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * self.phase - 1.0,
            Waveform::Triangle => {
                // Rises 0..0.5, falls 0.5..1.
                if self.phase < 0.5 {
                    4.0 * self.phase - 1.0
                } else {
                    3.0 - 4.0 * self.phase
                }
            }
        };

        self.phase += self.frequency / self.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        sample
    }
}
