// =============================================================================
// Analysis error taxonomy
// =============================================================================
//
// Fatal conditions of one analysis call. Per-field "indicator undefined" is
// not an error: it travels as `Reading::Warmup` / `Reading::NoSignal` through
// to the scorer, which skips the affected rule.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Malformed or non-monotonic bar sequence, or an invalid caller value.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Empty bar sequence.
    #[error("insufficient data: at least one price bar is required")]
    InsufficientData,

    /// An external collaborator (bar, flow or index source) failed.
    #[error("{source_name} data unavailable: {reason}")]
    DataUnavailable {
        source_name: &'static str,
        reason: String,
    },
}

impl AnalysisError {
    pub fn unavailable(source_name: &'static str, reason: impl Into<String>) -> Self {
        Self::DataUnavailable {
            source_name,
            reason: reason.into(),
        }
    }

    /// Short machine-readable tag for API payloads and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InsufficientData => "insufficient_data",
            Self::DataUnavailable { .. } => "data_unavailable",
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
