//! Piano — wires the input resolver to the voice engine and exposes the
//! observable state the presentation layer highlights from.
//!
//! All state changes are synchronous: by the time any input method
//! returns, the pressed-set and sustain flag already reflect the event,
//! so key highlighting can never lag the audio.

use std::collections::BTreeSet;

use tracing::warn;

use crate::dsp::engine::{EngineConfig, VoiceEngine};
use crate::error::CoreError;
use crate::layout::StripLayout;
use crate::notes::NoteTable;
use crate::resolver::{InputResolver, NoteSink, TouchId};

/// Default strip geometry until the host reports its real key area.
const DEFAULT_WIDTH: f32 = 800.0;
const DEFAULT_HEIGHT: f32 = 200.0;

/// Fans resolved note events out to the engine and the pressed-set.
struct EngineSink<'a> {
    engine: &'a mut VoiceEngine,
    pressed: &'a mut BTreeSet<String>,
}

impl NoteSink for EngineSink<'_> {
    fn press_note(&mut self, note: &str, frequency: f64) {
        self.engine.start(note, frequency);
        self.pressed.insert(note.to_string());
    }

    fn release_note(&mut self, note: &str) {
        self.engine.stop(note);
        self.pressed.remove(note);
    }

    fn set_sustain(&mut self, active: bool) {
        self.engine.set_sustain(active);
    }
}

/// The assembled instrument core: one resolver, one engine, one table,
/// one layout. Multiple independent instances can coexist.
#[derive(Debug)]
pub struct Piano {
    resolver: InputResolver,
    layout: StripLayout,
    engine: VoiceEngine,
    /// Note ids currently pressed by the player (not pedal-held ones).
    pressed: BTreeSet<String>,
    device_available: bool,
    device_loss_reported: bool,
}

impl Piano {
    pub fn new(sample_rate: f64) -> Result<Self, CoreError> {
        Piano::with_config(sample_rate, NoteTable::default(), &EngineConfig::default())
    }

    pub fn with_config(
        sample_rate: f64,
        table: NoteTable,
        config: &EngineConfig,
    ) -> Result<Self, CoreError> {
        let engine = VoiceEngine::with_config(sample_rate, config)?;
        let layout = StripLayout::new(&table, DEFAULT_WIDTH, DEFAULT_HEIGHT);
        Ok(Piano {
            resolver: InputResolver::new(table),
            layout,
            engine,
            pressed: BTreeSet::new(),
            device_available: true,
            device_loss_reported: false,
        })
    }

    /// Tell the core the on-screen size of the key strip, so touch
    /// coordinates hit-test against the real geometry.
    pub fn set_layout_size(&mut self, width: f32, height: f32) {
        self.layout = StripLayout::new(self.resolver.table(), width, height);
    }

    // ── Input events (forwarded to the resolver) ────────────

    pub fn key_down(&mut self, symbol: &str, in_text_entry: bool) {
        let mut sink = EngineSink {
            engine: &mut self.engine,
            pressed: &mut self.pressed,
        };
        self.resolver.key_down(symbol, in_text_entry, &mut sink);
    }

    pub fn key_up(&mut self, symbol: &str) {
        let mut sink = EngineSink {
            engine: &mut self.engine,
            pressed: &mut self.pressed,
        };
        self.resolver.key_up(symbol, &mut sink);
    }

    pub fn pointer_down(&mut self, note: &str) {
        let mut sink = EngineSink {
            engine: &mut self.engine,
            pressed: &mut self.pressed,
        };
        self.resolver.pointer_down(note, &mut sink);
    }

    pub fn pointer_up(&mut self, note: &str) {
        let mut sink = EngineSink {
            engine: &mut self.engine,
            pressed: &mut self.pressed,
        };
        self.resolver.pointer_up(note, &mut sink);
    }

    pub fn pointer_leave(&mut self, note: &str) {
        let mut sink = EngineSink {
            engine: &mut self.engine,
            pressed: &mut self.pressed,
        };
        self.resolver.pointer_leave(note, &mut sink);
    }

    pub fn touch_start(&mut self, id: TouchId, x: f32, y: f32) {
        let mut sink = EngineSink {
            engine: &mut self.engine,
            pressed: &mut self.pressed,
        };
        self.resolver.touch_start(id, x, y, &self.layout, &mut sink);
    }

    pub fn touch_move(&mut self, id: TouchId, x: f32, y: f32) {
        let mut sink = EngineSink {
            engine: &mut self.engine,
            pressed: &mut self.pressed,
        };
        self.resolver.touch_move(id, x, y, &self.layout, &mut sink);
    }

    pub fn touch_end(&mut self, id: TouchId) {
        let mut sink = EngineSink {
            engine: &mut self.engine,
            pressed: &mut self.pressed,
        };
        self.resolver.touch_end(id, &mut sink);
    }

    pub fn touch_cancel(&mut self, id: TouchId) {
        let mut sink = EngineSink {
            engine: &mut self.engine,
            pressed: &mut self.pressed,
        };
        self.resolver.touch_cancel(id, &mut sink);
    }

    /// Direct pedal control, for an on-screen pedal button.
    pub fn set_sustain(&mut self, active: bool) {
        self.engine.set_sustain(active);
    }

    // ── Observable state ────────────────────────────────────

    /// Note ids currently pressed, in pitch-name order.
    pub fn pressed_notes(&self) -> Vec<String> {
        self.pressed.iter().cloned().collect()
    }

    pub fn is_pressed(&self, note: &str) -> bool {
        self.pressed.contains(note)
    }

    pub fn sustain_active(&self) -> bool {
        self.engine.sustain_active()
    }

    pub fn note_table(&self) -> &NoteTable {
        self.resolver.table()
    }

    pub fn engine(&self) -> &VoiceEngine {
        &self.engine
    }

    // ── Audio ───────────────────────────────────────────────

    /// Render one block for the host. With the output device gone the
    /// core stays interactive but renders silence.
    pub fn render(&mut self, out: &mut [f32]) {
        if !self.device_available {
            out.fill(0.0);
            return;
        }
        self.engine.render(out);
    }

    /// Host reports that the output device could not be created or
    /// resumed. Logged once; never fatal.
    pub fn report_device_unavailable(&mut self) {
        self.device_available = false;
        if !self.device_loss_reported {
            self.device_loss_reported = true;
            warn!("audio output device unavailable; continuing without sound");
        }
    }

    /// Host reports the device came (back) up.
    pub fn report_device_available(&mut self) {
        self.device_available = true;
    }

    pub fn device_available(&self) -> bool {
        self.device_available
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn piano() -> Piano {
        let mut p = Piano::new(48_000.0).unwrap();
        p.set_layout_size(800.0, 200.0);
        p
    }

    #[test]
    fn keyboard_press_updates_audio_and_highlight_together() {
        let mut p = piano();
        p.key_down("a", false);
        assert!(p.is_pressed("C4"));
        assert!(p.engine().is_live("C4"));

        p.key_up("a");
        assert!(!p.is_pressed("C4"));
        assert!(!p.engine().is_live("C4"));
    }

    #[test]
    fn space_drives_the_pedal() {
        let mut p = piano();
        p.key_down(" ", false);
        assert!(p.sustain_active());
        p.key_up(" ");
        assert!(!p.sustain_active());
    }

    #[test]
    fn sustained_note_is_not_shown_as_pressed() {
        let mut p = piano();
        p.key_down("h", false); // A4
        p.key_down(" ", false);
        p.key_up("h");

        // Audible through the pedal, but the key itself is up.
        assert!(p.engine().is_live("A4"));
        assert!(!p.is_pressed("A4"));

        p.key_up(" ");
        assert!(!p.engine().is_live("A4"));
    }

    #[test]
    fn touch_slide_moves_the_highlight() {
        let mut p = piano();
        p.touch_start(1, 30.0, 150.0); // C4
        assert_eq!(p.pressed_notes(), vec!["C4"]);

        p.touch_move(1, 150.0, 150.0); // D4
        assert_eq!(p.pressed_notes(), vec!["D4"]);

        p.touch_end(1);
        assert!(p.pressed_notes().is_empty());
        assert_eq!(p.engine().live_count(), 0);
    }

    #[test]
    fn pointer_chord_lists_notes_in_order() {
        let mut p = piano();
        p.pointer_down("G4");
        p.pointer_down("C4");
        p.pointer_down("E4");
        assert_eq!(p.pressed_notes(), vec!["C4", "E4", "G4"]);
    }

    #[test]
    fn device_loss_keeps_state_but_silences_output() {
        let mut p = piano();
        p.report_device_unavailable();
        p.report_device_unavailable(); // second report is quiet

        p.key_down("a", false);
        assert!(p.is_pressed("C4"), "state tracking continues");

        let mut out = vec![1.0_f32; 256];
        p.render(&mut out);
        assert!(out.iter().all(|&s| s == 0.0), "no device, no sound");

        p.report_device_available();
        let mut out = vec![0.0_f32; 4800];
        p.render(&mut out);
        assert!(out.iter().any(|&s| s != 0.0), "sound resumes with the device");
    }

    #[test]
    fn render_is_audible_after_press() {
        let mut p = piano();
        p.key_down("f", false); // F4
        let mut out = vec![0.0_f32; 4800];
        p.render(&mut out);
        let peak = out.iter().fold(0.0_f32, |m, &s| m.max(s.abs()));
        assert!(peak > 0.1, "pressed key should be audible, peak={peak}");
    }
}
