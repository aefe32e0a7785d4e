//! Key layout — coordinate hit-testing for touch input.
//!
//! The resolver only needs `resolve_note_at`; hosts with their own DOM
//! hit-testing can implement [`KeyLayout`] directly. [`StripLayout`] is the
//! built-in single-strip geometry: white keys split the width evenly and
//! black keys overlay the upper region between their neighbours.

use crate::notes::NoteTable;

/// Resolves screen coordinates to the note id under them, if any.
pub trait KeyLayout {
    fn resolve_note_at(&self, x: f32, y: f32) -> Option<&str>;
}

/// Black keys are 0.6x a white key's width and cover the top 0.6 of the
/// strip's height, the usual piano proportions.
const BLACK_WIDTH_RATIO: f32 = 0.6;
const BLACK_HEIGHT_RATIO: f32 = 0.6;

#[derive(Debug, Clone)]
struct BlackKey {
    note: String,
    min_x: f32,
    max_x: f32,
}

/// A single horizontal strip of keys built from a [`NoteTable`].
#[derive(Debug, Clone)]
pub struct StripLayout {
    width: f32,
    height: f32,
    white_notes: Vec<String>,
    black_keys: Vec<BlackKey>,
    white_width: f32,
}

impl StripLayout {
    pub fn new(table: &NoteTable, width: f32, height: f32) -> Self {
        let white_notes: Vec<String> =
            table.white_keys().map(|n| n.note.clone()).collect();
        let white_width = width / white_notes.len().max(1) as f32;
        let black_width = white_width * BLACK_WIDTH_RATIO;

        // A black key is centered 3/4 of the way across the white key that
        // precedes it in pitch order.
        let mut black_keys = Vec::new();
        let mut whites_seen = 0usize;
        for info in table.iter() {
            if info.is_black {
                let center = (whites_seen as f32 - 0.25) * white_width;
                black_keys.push(BlackKey {
                    note: info.note.clone(),
                    min_x: center - black_width / 2.0,
                    max_x: center + black_width / 2.0,
                });
            } else {
                whites_seen += 1;
            }
        }

        StripLayout {
            width,
            height,
            white_notes,
            black_keys,
            white_width,
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }
}

impl KeyLayout for StripLayout {
    fn resolve_note_at(&self, x: f32, y: f32) -> Option<&str> {
        if x < 0.0 || x >= self.width || y < 0.0 || y >= self.height {
            return None;
        }

        // Black keys sit on top, so they win the hit-test in the upper
        // region.
        if y < self.height * BLACK_HEIGHT_RATIO {
            for key in &self.black_keys {
                if x >= key.min_x && x < key.max_x {
                    return Some(&key.note);
                }
            }
        }

        let idx = (x / self.white_width) as usize;
        self.white_notes.get(idx).map(String::as_str)
    }
}
