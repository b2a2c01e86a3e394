use thiserror::Error;

/// Validation errors for Pricefeed values.
///
/// Every variant is raised before any tier is consulted, so none of them is
/// ever retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("Invalid round ID: {0}")]
    InvalidRoundId(String),

    #[error("Answer is required")]
    EmptyAnswer,

    #[error("Invalid answer format: {0}")]
    InvalidAnswer(String),

    #[error("Answer out of range: {0}")]
    AnswerOutOfRange(String),

    #[error("Invalid signer identity: {0}")]
    InvalidIdentity(String),

    #[error("Invalid round timestamps: updated_at {updated_at} precedes started_at {started_at}")]
    InvalidTimestamps { started_at: i64, updated_at: i64 },
}

impl CoreError {
    /// Create a new InvalidRoundId error
    pub fn invalid_round_id(raw: impl Into<String>) -> Self {
        Self::InvalidRoundId(raw.into())
    }

    /// Create a new InvalidAnswer error
    pub fn invalid_answer(raw: impl Into<String>) -> Self {
        Self::InvalidAnswer(raw.into())
    }

    /// Create a new AnswerOutOfRange error
    pub fn answer_out_of_range(raw: impl Into<String>) -> Self {
        Self::AnswerOutOfRange(raw.into())
    }

    /// Create a new InvalidIdentity error
    pub fn invalid_identity(raw: impl Into<String>) -> Self {
        Self::InvalidIdentity(raw.into())
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            CoreError::invalid_round_id("abc").to_string(),
            "Invalid round ID: abc"
        );
        assert_eq!(CoreError::EmptyAnswer.to_string(), "Answer is required");
        let err = CoreError::InvalidTimestamps {
            started_at: 10,
            updated_at: 5,
        };
        assert!(err.to_string().contains("precedes"));
    }
}
