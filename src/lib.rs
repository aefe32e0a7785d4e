pub mod dsp;
pub mod error;
pub mod layout;
pub mod notes;
pub mod piano;
pub mod resolver;

use wasm_bindgen::prelude::*;

use crate::dsp::engine::EngineConfig;
use crate::notes::NoteTable;
use crate::piano::Piano;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WASM-exposed: return the keybed-core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed: the default note table as an array of
/// `{note, frequency, isBlack, keyboardKey}` records, for the
/// presentation layer to lay out its keys from.
#[wasm_bindgen]
pub fn default_note_table() -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(&NoteTable::default())
        .map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed handle around the instrument core. The host forwards raw
/// DOM events in; pulls rendered sample blocks out from its AudioWorklet.
#[wasm_bindgen]
pub struct PianoCore {
    inner: Piano,
}

#[wasm_bindgen]
impl PianoCore {
    /// Build a core with the default thirteen-key table and engine
    /// settings. `sample_rate` is the host AudioContext's rate.
    #[wasm_bindgen(constructor)]
    pub fn new(sample_rate: f64) -> Result<PianoCore, JsValue> {
        Piano::new(sample_rate)
            .map(|inner| PianoCore { inner })
            .map_err(|e| JsValue::from_str(&format!("{e}")))
    }

    /// Build a core with an engine configuration object
    /// (`{waveform, peakGain, attack, release, masterGain}`).
    pub fn with_config(sample_rate: f64, config: JsValue) -> Result<PianoCore, JsValue> {
        let config: EngineConfig = serde_wasm_bindgen::from_value(config)
            .map_err(|e| JsValue::from_str(&format!("{e}")))?;
        Piano::with_config(sample_rate, NoteTable::default(), &config)
            .map(|inner| PianoCore { inner })
            .map_err(|e| JsValue::from_str(&format!("{e}")))
    }

    /// Report the on-screen size of the key strip for touch hit-testing.
    pub fn set_layout_size(&mut self, width: f32, height: f32) {
        self.inner.set_layout_size(width, height);
    }

    // ── Input events ────────────────────────────────────────

    pub fn key_down(&mut self, key: &str, in_text_entry: bool) {
        self.inner.key_down(key, in_text_entry);
    }

    pub fn key_up(&mut self, key: &str) {
        self.inner.key_up(key);
    }

    pub fn pointer_down(&mut self, note: &str) {
        self.inner.pointer_down(note);
    }

    pub fn pointer_up(&mut self, note: &str) {
        self.inner.pointer_up(note);
    }

    pub fn pointer_leave(&mut self, note: &str) {
        self.inner.pointer_leave(note);
    }

    pub fn touch_start(&mut self, id: u32, x: f32, y: f32) {
        self.inner.touch_start(id as u64, x, y);
    }

    pub fn touch_move(&mut self, id: u32, x: f32, y: f32) {
        self.inner.touch_move(id as u64, x, y);
    }

    pub fn touch_end(&mut self, id: u32) {
        self.inner.touch_end(id as u64);
    }

    pub fn touch_cancel(&mut self, id: u32) {
        self.inner.touch_cancel(id as u64);
    }

    pub fn set_sustain(&mut self, active: bool) {
        self.inner.set_sustain(active);
    }

    // ── Observable state for highlighting ───────────────────

    /// Currently pressed note ids, as a JS array of strings.
    pub fn pressed_notes(&self) -> Result<JsValue, JsValue> {
        serde_wasm_bindgen::to_value(&self.inner.pressed_notes())
            .map_err(|e| JsValue::from_str(&format!("{e}")))
    }

    pub fn is_pressed(&self, note: &str) -> bool {
        self.inner.is_pressed(note)
    }

    pub fn sustain_active(&self) -> bool {
        self.inner.sustain_active()
    }

    // ── Audio ───────────────────────────────────────────────

    /// Render the next `len` samples for AudioWorklet playback.
    pub fn render_block(&mut self, len: usize) -> Vec<f32> {
        let mut out = vec![0.0_f32; len];
        self.inner.render(&mut out);
        out
    }

    /// Host signal: output device creation/resume failed. Non-fatal;
    /// the core keeps tracking state and renders silence.
    pub fn report_device_unavailable(&mut self) {
        self.inner.report_device_unavailable();
    }

    /// Host signal: the output device is usable (again).
    pub fn report_device_available(&mut self) {
        self.inner.report_device_available();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_matches_manifest() {
        assert_eq!(core_version(), env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn facade_constructs_with_default_table() {
        let p = Piano::new(44_100.0).unwrap();
        assert_eq!(p.note_table().len(), 13);
    }
}
