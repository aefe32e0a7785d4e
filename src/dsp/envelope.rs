//! Gain envelope — the click-free attack and release ramps applied to
//! every voice.
//!
//! Unlike a full ADSR there is no decay or sustain-level stage: the
//! reference instrument ramps to a fixed peak and holds there until the
//! note is released. The release always ramps from the envelope's current
//! instantaneous level, so a note stopped mid-attack decays from the
//! partial level instead of jumping.

/// Normalized gain the attack ramps to.
pub const PEAK_GAIN: f64 = 0.4;
/// Attack ramp duration in seconds.
pub const ATTACK_SECS: f64 = 0.01;
/// Release ramp duration in seconds, measured from the release request.
pub const RELEASE_SECS: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Stage {
    Idle,
    Attack,
    Peak,
    Release,
}

/// Linear attack/hold/release envelope, advanced one sample at a time
/// against the engine's sample clock.
#[derive(Debug, Clone)]
pub struct GainEnvelope {
    /// Peak gain the attack targets.
    pub peak: f64,
    /// Attack time in seconds.
    pub attack: f64,
    /// Release time in seconds.
    pub release: f64,

    sample_rate: f64,
    stage: Stage,
    level: f64,
    /// Samples in the current ramp stage.
    stage_samples: usize,
    stage_counter: usize,
    /// Level at the start of the current ramp.
    start_level: f64,
}

impl GainEnvelope {
    pub fn new(sample_rate: f64) -> Self {
        GainEnvelope {
            peak: PEAK_GAIN,
            attack: ATTACK_SECS,
            release: RELEASE_SECS,
            sample_rate,
            stage: Stage::Idle,
            level: 0.0,
            stage_samples: 0,
            stage_counter: 0,
            start_level: 0.0,
        }
    }

    /// Begin the attack ramp (note on).
    pub fn gate_on(&mut self) {
        self.stage = Stage::Attack;
        self.stage_samples = (self.attack * self.sample_rate) as usize;
        self.stage_counter = 0;
        self.start_level = self.level;
    }

    /// Begin the release ramp (note off). Cancels an in-flight attack and
    /// ramps to silence from the current level.
    pub fn gate_off(&mut self) {
        if self.stage == Stage::Idle {
            return;
        }
        self.stage = Stage::Release;
        self.stage_samples = (self.release * self.sample_rate) as usize;
        self.stage_counter = 0;
        self.start_level = self.level;
    }

    /// Generate the next gain value.
    pub fn next_sample(&mut self) -> f64 {
        match self.stage {
            Stage::Idle => {
                self.level = 0.0;
            }
            Stage::Attack => {
                if self.stage_samples == 0 {
                    self.level = self.peak;
                    self.stage = Stage::Peak;
                } else {
                    let t = self.stage_counter as f64 / self.stage_samples as f64;
                    self.level = self.start_level + (self.peak - self.start_level) * t;
                    self.stage_counter += 1;
                    if self.stage_counter >= self.stage_samples {
                        self.level = self.peak;
                        self.stage = Stage::Peak;
                    }
                }
            }
            Stage::Peak => {
                self.level = self.peak;
            }
            Stage::Release => {
                if self.stage_samples == 0 {
                    self.level = 0.0;
                    self.stage = Stage::Idle;
                } else {
                    let t = self.stage_counter as f64 / self.stage_samples as f64;
                    self.level = self.start_level * (1.0 - t);
                    self.stage_counter += 1;
                    if self.stage_counter >= self.stage_samples {
                        self.level = 0.0;
                        self.stage = Stage::Idle;
                    }
                }
            }
        }
        self.level
    }

    /// Current instantaneous gain.
    pub fn level(&self) -> f64 {
        self.level
    }

    /// True once the release has fully rendered.
    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Idle
    }
}
