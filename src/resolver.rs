//! Input Resolver — folds the three raw input streams (physical keyboard,
//! pointer, multi-touch) into a single press/release stream against a
//! [`NoteSink`].
//!
//! The resolver knows nothing about synthesis; the engine sits behind the
//! sink. Per-source bookkeeping lives here: the held-key set suppresses
//! key-repeat, the ownership table tracks which note each touch contact is
//! pressing so slides work, and per-note holder counts make sure a note
//! stops only when its last holder lets go.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::layout::KeyLayout;
use crate::notes::NoteTable;

/// The physical key bound to the sustain pedal. Never falls through to
/// note lookup.
pub const PEDAL_KEY: &str = " ";

/// Receives resolved note events. Implemented by the facade, which fans
/// out to the voice engine and the observable pressed-set.
pub trait NoteSink {
    fn press_note(&mut self, note: &str, frequency: f64);
    fn release_note(&mut self, note: &str);
    fn set_sustain(&mut self, active: bool);
}

/// Identifier assigned by the input device to one active touch contact.
pub type TouchId = u64;

#[derive(Debug)]
pub struct InputResolver {
    table: NoteTable,
    /// Physical key symbols currently down. Keydown for a symbol already
    /// here is key-repeat and is dropped.
    held_keys: HashSet<String>,
    /// Active contact -> the note it currently presses.
    touch_owner: HashMap<TouchId, String>,
    /// Note id -> number of independent holders (key, pointer, contacts).
    /// Press is forwarded on 0->1, release on 1->0.
    holders: HashMap<String, u32>,
}

impl InputResolver {
    pub fn new(table: NoteTable) -> Self {
        InputResolver {
            table,
            held_keys: HashSet::new(),
            touch_owner: HashMap::new(),
            holders: HashMap::new(),
        }
    }

    pub fn table(&self) -> &NoteTable {
        &self.table
    }

    /// Number of active touch contacts currently owning a note.
    pub fn active_contacts(&self) -> usize {
        self.touch_owner.len()
    }

    // ── Physical keyboard ───────────────────────────────────

    /// Handle a physical key-down. `in_text_entry` is supplied by the host
    /// and suppresses the event entirely (the user is typing, not playing).
    pub fn key_down(&mut self, symbol: &str, in_text_entry: bool, sink: &mut impl NoteSink) {
        if in_text_entry {
            return;
        }
        let symbol = symbol.to_lowercase();
        if symbol == PEDAL_KEY {
            sink.set_sustain(true);
            return;
        }
        if self.held_keys.contains(&symbol) {
            // Key-repeat from the host; the note is already down.
            debug!(key = %symbol, "ignoring repeated key-down");
            return;
        }
        let Some(info) = self.table.by_key(&symbol) else {
            return;
        };
        let note = info.note.clone();
        self.held_keys.insert(symbol);
        self.press(&note, sink);
    }

    /// Handle a physical key-up. A key-up for a symbol that was never
    /// held is a safe no-op.
    pub fn key_up(&mut self, symbol: &str, sink: &mut impl NoteSink) {
        let symbol = symbol.to_lowercase();
        if symbol == PEDAL_KEY {
            sink.set_sustain(false);
            return;
        }
        if !self.held_keys.remove(&symbol) {
            return;
        }
        if let Some(info) = self.table.by_key(&symbol) {
            let note = info.note.clone();
            self.release(&note, sink);
        }
    }

    // ── Pointer ─────────────────────────────────────────────

    /// Pointer pressed on a key.
    pub fn pointer_down(&mut self, note: &str, sink: &mut impl NoteSink) {
        self.press(note, sink);
    }

    /// Pointer released over a key.
    pub fn pointer_up(&mut self, note: &str, sink: &mut impl NoteSink) {
        self.release(note, sink);
    }

    /// Pointer dragged off a key while still pressed. Identical to a
    /// release, so dragging off cannot leave a stuck note.
    pub fn pointer_leave(&mut self, note: &str, sink: &mut impl NoteSink) {
        self.release(note, sink);
    }

    // ── Touch ───────────────────────────────────────────────

    /// A new contact landed at `(x, y)`.
    pub fn touch_start(
        &mut self,
        id: TouchId,
        x: f32,
        y: f32,
        layout: &impl KeyLayout,
        sink: &mut impl NoteSink,
    ) {
        if let Some(note) = layout.resolve_note_at(x, y).map(str::to_owned) {
            self.claim(id, note, sink);
        }
    }

    /// An existing contact moved. Sliding within a key does nothing;
    /// sliding onto a new key releases the old one and presses the new;
    /// sliding off the keyboard releases whatever the contact owned.
    pub fn touch_move(
        &mut self,
        id: TouchId,
        x: f32,
        y: f32,
        layout: &impl KeyLayout,
        sink: &mut impl NoteSink,
    ) {
        match layout.resolve_note_at(x, y).map(str::to_owned) {
            Some(note) => self.claim(id, note, sink),
            None => {
                if let Some(prev) = self.touch_owner.remove(&id) {
                    self.release(&prev, sink);
                }
            }
        }
    }

    /// Contact lifted. Releases the owned note, if any.
    pub fn touch_end(&mut self, id: TouchId, sink: &mut impl NoteSink) {
        if let Some(prev) = self.touch_owner.remove(&id) {
            self.release(&prev, sink);
        }
    }

    /// Contact cancelled by the host. Handled exactly like an end so no
    /// ownership entry or voice is orphaned.
    pub fn touch_cancel(&mut self, id: TouchId, sink: &mut impl NoteSink) {
        self.touch_end(id, sink);
    }

    // ── Internals ───────────────────────────────────────────

    /// Make `id` own `note`, releasing whatever it owned before.
    fn claim(&mut self, id: TouchId, note: String, sink: &mut impl NoteSink) {
        if let Some(prev) = self.touch_owner.get(&id) {
            if *prev == note {
                return;
            }
            let prev = prev.clone();
            self.release(&prev, sink);
        }
        self.press(&note, sink);
        self.touch_owner.insert(id, note);
    }

    fn press(&mut self, note: &str, sink: &mut impl NoteSink) {
        let Some(info) = self.table.get(note) else {
            debug!(note, "press for a note not in the table");
            return;
        };
        let frequency = info.frequency;
        let count = self.holders.entry(note.to_string()).or_insert(0);
        *count += 1;
        if *count == 1 {
            sink.press_note(note, frequency);
        }
    }

    fn release(&mut self, note: &str, sink: &mut impl NoteSink) {
        match self.holders.get_mut(note) {
            Some(1) => {
                self.holders.remove(note);
                sink.release_note(note);
            }
            Some(count) => {
                *count -= 1;
            }
            None => {
                // Already released by another path (e.g. pointer up then
                // leave); absorbed.
                debug!(note, "release with no holder");
            }
        }
    }
}

impl Default for InputResolver {
    fn default() -> Self {
        InputResolver::new(NoteTable::default())
    }
}
