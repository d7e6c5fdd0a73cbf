use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

/// Typed failures raised by the rating, value and combination code.
///
/// Every variant is a rejected input. Nothing in the engine retries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid odds {odds}: decimal odds must be finite and greater than 1.0")]
    InvalidOdds { odds: f64 },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl EngineError {
    pub fn input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }
}

pub(crate) fn ensure_finite(label: &str, value: f64) -> EngineResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EngineError::input(format!("{label} must be finite, got {value}")))
    }
}
