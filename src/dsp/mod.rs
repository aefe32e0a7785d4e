//! Synthesis — pure Rust, deterministic, sample-domain.
//!
//! The same code serves the browser (samples pulled by an AudioWorklet
//! through the WASM bindings) and native tests. All timing is counted in
//! samples against the output device's rate, so envelope windows stay
//! exact regardless of host scheduling jitter.

pub mod engine;
pub mod envelope;
pub mod mixer;
pub mod oscillator;
pub mod voice;
