//! Stable error codes for the engine surface
//!
//! The embedding service layer maps these to its own transport; the engine
//! guarantees the classification, in particular that `RetryableConflict`
//! (duplicate order-number allocation) is the only code a caller should
//! retry.

/// Engine error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Input failed a write-time check (bad quantity, negative amount)
    Validation,
    /// Referenced row does not exist
    NotFound,
    /// Unique-constraint conflict that is NOT retryable (duplicate item,
    /// duplicate category name)
    Conflict,
    /// Order-number allocation collision; retry in a fresh attempt
    RetryableConflict,
    /// Underlying store failure
    Storage,
}

impl ErrorCode {
    /// Whether a caller should re-invoke the operation in a new attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RetryableConflict)
    }

    /// Stable code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation => "E0001",
            Self::NotFound => "E0002",
            Self::Conflict => "E0003",
            Self::RetryableConflict => "E0004",
            Self::Storage => "E9001",
        }
    }

    /// Default human-readable message
    pub fn default_message(&self) -> &'static str {
        match self {
            Self::Validation => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::Conflict => "Resource already exists",
            Self::RetryableConflict => "Allocation conflict, retry the operation",
            Self::Storage => "Storage error",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}
