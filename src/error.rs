// THEORY:
// The `error` module defines the single failure vocabulary of the engine. Every
// stage reports problems synchronously through `AnalysisError`, and `analyze` is
// all-or-nothing: either a complete report comes back or one of these errors does.
//
// There are exactly three kinds of failure:
// 1.  **Dimension**: the input pixels themselves are unusable (empty extent, a
//     sample buffer that disagrees with the declared shape).
// 2.  **Alignment**: the geometric search degenerated to an empty overlap.
// 3.  **Config**: a tunable parameter is out of its legal range. These are
//     detected before a single pixel is touched, and never silently clamped.

use thiserror::Error;

/// Everything that can make an analysis fail.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// Malformed or empty image input.
    #[error("dimension error: {0}")]
    Dimension(String),

    /// The best alignment shift leaves no overlapping pixels.
    #[error("alignment error: shift ({dx}, {dy}) leaves a {width}x{height} overlap")]
    Alignment {
        dx: i32,
        dy: i32,
        width: u32,
        height: u32,
    },

    /// A configuration value is outside its legal range.
    #[error("invalid configuration `{field}`: {reason}")]
    Config {
        field: &'static str,
        reason: String,
    },
}

impl AnalysisError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        AnalysisError::Config {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
