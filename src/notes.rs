//! Note table — immutable pitch records consumed by the resolver and the
//! presentation layer.
//!
//! Each record binds a note id (e.g. `"C#4"`) to its frequency, its
//! black/white class, and the physical keyboard symbol that plays it. The
//! table is built once and stays stable for the process lifetime.

use serde::{Deserialize, Serialize};

const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// One key's immutable attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteInfo {
    /// Stable note id, e.g. `"C4"` or `"F#4"`. Never reused for a
    /// different pitch.
    pub note: String,
    /// Frequency in Hz (12-TET, A4 = 440).
    pub frequency: f64,
    /// Black-key class, for layout and styling.
    pub is_black: bool,
    /// Bound physical keyboard symbol (lowercase), e.g. `"a"`.
    pub keyboard_key: String,
}

/// Parse a note id (e.g. "C4", "F#3", "Bb5") into a MIDI note number.
pub fn note_to_midi(note: &str) -> Option<i32> {
    let bytes = note.as_bytes();
    let base = match bytes.first()? {
        b'C' => 0,
        b'D' => 2,
        b'E' => 4,
        b'F' => 5,
        b'G' => 7,
        b'A' => 9,
        b'B' => 11,
        _ => return None,
    };

    let (accidental, octave_start) = match bytes.get(1) {
        Some(b'#') => (1, 2),
        Some(b'b') => (-1, 2),
        _ => (0, 1),
    };

    let octave: i32 = note[octave_start..].parse().ok()?;
    Some((octave + 1) * 12 + base + accidental)
}

/// MIDI note number to frequency: `440 * 2^((midi - 69) / 12)`.
pub fn midi_to_frequency(midi: i32) -> f64 {
    440.0 * (2.0_f64).powf((midi as f64 - 69.0) / 12.0)
}

/// MIDI note number to a note id, sharps only ("C#4", not "Db4").
pub fn midi_to_note(midi: i32) -> String {
    let name = NOTE_NAMES[midi.rem_euclid(12) as usize];
    let octave = midi.div_euclid(12) - 1;
    format!("{name}{octave}")
}

/// The ordered note table. Queryable by note id and by keyboard symbol,
/// filterable by key class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteTable {
    notes: Vec<NoteInfo>,
}

impl NoteTable {
    /// Build a table from explicit records.
    pub fn from_records(notes: Vec<NoteInfo>) -> Self {
        NoteTable { notes }
    }

    /// Build a chromatic table of `symbols.len()` keys starting at
    /// `low_midi`, binding one keyboard symbol per key in order.
    pub fn range(low_midi: i32, symbols: &[&str]) -> Self {
        let notes = symbols
            .iter()
            .enumerate()
            .map(|(i, sym)| {
                let midi = low_midi + i as i32;
                let note = midi_to_note(midi);
                NoteInfo {
                    is_black: note.contains('#'),
                    frequency: midi_to_frequency(midi),
                    note,
                    keyboard_key: sym.to_string(),
                }
            })
            .collect();
        NoteTable { notes }
    }

    /// Look up a record by note id.
    pub fn get(&self, note: &str) -> Option<&NoteInfo> {
        self.notes.iter().find(|n| n.note == note)
    }

    /// Look up a record by its bound keyboard symbol.
    pub fn by_key(&self, symbol: &str) -> Option<&NoteInfo> {
        self.notes.iter().find(|n| n.keyboard_key == symbol)
    }

    /// All records in pitch order.
    pub fn iter(&self) -> impl Iterator<Item = &NoteInfo> {
        self.notes.iter()
    }

    /// White keys in pitch order.
    pub fn white_keys(&self) -> impl Iterator<Item = &NoteInfo> {
        self.notes.iter().filter(|n| !n.is_black)
    }

    /// Black keys in pitch order.
    pub fn black_keys(&self) -> impl Iterator<Item = &NoteInfo> {
        self.notes.iter().filter(|n| n.is_black)
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

impl Default for NoteTable {
    /// The thirteen-key C4..C5 strip with the classic home-row binding:
    /// white keys on `a s d f g h j k`, sharps on `w e t y u`.
    fn default() -> Self {
        NoteTable::range(
            60,
            &[
                "a", "w", "s", "e", "d", "f", "t", "g", "y", "h", "u", "j", "k",
            ],
        )
    }
}
