use std::fmt;

/// Errors surfaced by the core. The taxonomy is deliberately narrow:
/// unresolvable input and redundant transitions are absorbed as no-ops
/// inside the resolver and engine, so only construction-time problems and
/// host-reported capability loss ever reach a caller.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// The engine was asked to run at a non-positive or non-finite rate.
    InvalidSampleRate { rate: f64 },
    /// The host could not create or resume the output device. Non-fatal:
    /// the engine keeps tracking state but produces silence.
    DeviceUnavailable,
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::InvalidSampleRate { rate } => {
                write!(f, "Invalid sample rate: {rate}")
            }
            CoreError::DeviceUnavailable => {
                write!(f, "Audio output device unavailable")
            }
        }
    }
}

impl std::error::Error for CoreError {}
