//! Mixer — sums voice outputs into a host block.
//!
//! Polyphony is bounded only by what the mix can carry, so the output is
//! soft-clipped with tanh rather than hard-limited.

/// A summing mixer with master gain and soft clipping.
#[derive(Debug, Clone)]
pub struct Mixer {
    pub master_gain: f64,
    buffer: Vec<f64>,
}

impl Mixer {
    pub fn new() -> Self {
        Mixer {
            master_gain: 0.8,
            buffer: Vec::new(),
        }
    }

    /// Zero the accumulator for a block of `num_samples`.
    pub fn clear(&mut self, num_samples: usize) {
        self.buffer.clear();
        self.buffer.resize(num_samples, 0.0);
    }

    /// Accumulate one sample at `index`.
    pub fn add(&mut self, index: usize, sample: f64) {
        if index < self.buffer.len() {
            self.buffer[index] += sample;
        }
    }

    /// Write the mixed block into the host's f32 buffer, applying master
    /// gain and the soft clipper.
    pub fn write_to(&self, out: &mut [f32]) {
        for (dst, &src) in out.iter_mut().zip(self.buffer.iter()) {
            *dst = soft_clip(src * self.master_gain) as f32;
        }
    }
}

impl Default for Mixer {
    fn default() -> Self {
        Mixer::new()
    }
}

/// tanh soft clipper; transparent at piano levels, saturates gracefully
/// when many voices pile up.
fn soft_clip(x: f64) -> f64 {
    x.tanh()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_sources() {
        let mut m = Mixer::new();
        m.master_gain = 1.0;
        m.clear(4);
        m.add(0, 0.1);
        m.add(0, 0.2);
        m.add(3, 0.5);

        let mut out = [0.0_f32; 4];
        m.write_to(&mut out);
        assert!((out[0] as f64 - (0.3_f64).tanh()).abs() < 1e-6);
        assert_eq!(out[1], 0.0);
        assert!((out[3] as f64 - (0.5_f64).tanh()).abs() < 1e-6);
    }

    #[test]
    fn clear_resets_accumulator() {
        let mut m = Mixer::new();
        m.clear(2);
        m.add(0, 1.0);
        m.clear(2);

        let mut out = [1.0_f32; 2];
        m.write_to(&mut out);
        assert_eq!(out, [0.0, 0.0]);
    }

    #[test]
    fn output_never_exceeds_unity() {
        // tanh saturates to exactly 1.0 in f32 for large sums, so the
        // contract is <= 1.0; a moderate pile-up still stays strictly below.
        let mut m = Mixer::new();
        m.clear(2);
        for _ in 0..100 {
            m.add(0, 0.4);
        }
        for _ in 0..10 {
            m.add(1, 0.4);
        }
        let mut out = [0.0_f32; 2];
        m.write_to(&mut out);
        assert!(out[0].abs() <= 1.0, "soft clip bounds output at 1.0");
        assert!(out[1].abs() < 1.0, "moderate sums stay below full scale");
    }

    #[test]
    fn out_of_range_add_is_ignored() {
        let mut m = Mixer::new();
        m.clear(1);
        m.add(5, 1.0);
        let mut out = [0.0_f32; 1];
        m.write_to(&mut out);
        assert_eq!(out[0], 0.0);
    }
}
