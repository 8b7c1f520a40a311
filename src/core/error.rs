use thiserror::Error;

/// Result type for matrix profile operations.
pub type Result<T> = std::result::Result<T, ProfileError>;

/// Errors that can occur while building or computing a matrix profile.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProfileError {
    /// Empty or non-finite series, or an option outside its domain.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Subsequence length incompatible with the series length.
    #[error("invalid subsequence length {m} for series of length {len}")]
    InvalidWindow { m: usize, len: usize },

    /// STAMP sample fraction must be positive.
    #[error("sample fraction must be in (0, 1], got {0}")]
    InvalidSample(f64),

    /// A query window has zero standard deviation and cannot be z-normalized.
    #[error("subsequence at {index} has zero variance")]
    ZeroVariance { index: usize },

    /// Distance profile or cross-correlation requested outside the series.
    #[error("subsequence index {index} out of range (valid: 0..{len})")]
    IndexOutOfRange { index: usize, len: usize },

    /// The FFT backend rejected a buffer.
    #[error("FFT failure: {0}")]
    Fft(String),

    /// The worker pool could not be started.
    #[error("worker pool error: {0}")]
    WorkerPool(String),
}

impl From<realfft::FftError> for ProfileError {
    fn from(err: realfft::FftError) -> Self {
        ProfileError::Fft(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_embeds_payload() {
        let err = ProfileError::InvalidWindow { m: 9, len: 4 };
        assert_eq!(
            err.to_string(),
            "invalid subsequence length 9 for series of length 4"
        );

        let err = ProfileError::IndexOutOfRange { index: 12, len: 10 };
        assert!(err.to_string().contains("12"));
        assert!(err.to_string().contains("0..10"));

        let err = ProfileError::InvalidSample(-0.5);
        assert!(err.to_string().contains("-0.5"));
    }
}
