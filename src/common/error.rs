//! Error types for landmark_slam

use std::fmt;

/// Main error type for the SLAM estimator
#[derive(Debug)]
pub enum SlamError {
    /// Numerical computation failed (matrix inversion, etc.)
    NumericalError(String),
    /// Invalid parameter
    InvalidParameter(String),
}

impl fmt::Display for SlamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlamError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
            SlamError::InvalidParameter(msg) => write!(f, "Invalid parameter: {}", msg),
        }
    }
}

impl std::error::Error for SlamError {}

/// Result type alias for SLAM operations
pub type SlamResult<T> = Result<T, SlamError>;
