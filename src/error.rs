//! Application error type.
//!
//! Every fallible operation in the crate returns `AppError`. The error carries a
//! process exit code so the binary can map failures to stable codes:
//!
//! - `2`: invalid input, shape mismatch or configuration error
//! - `3`: not enough observations for the requested model
//! - `4`: numerical failure (singular design, non-positive weight, non-finite values)

/// Invalid input, shape mismatch or configuration error.
pub const EXIT_INPUT: u8 = 2;
/// Not enough observations for the requested model.
pub const EXIT_INSUFFICIENT: u8 = 3;
/// Numerical failure inside one of the least-squares solves.
pub const EXIT_NUMERICAL: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Prefix the message with the stage that failed, keeping the exit code.
    ///
    /// Used to report which sub-fit (`preliminary fit`, `variance fit`, ...)
    /// aborted an estimation.
    pub fn with_context(self, stage: impl std::fmt::Display) -> Self {
        Self {
            exit_code: self.exit_code,
            message: format!("{stage}: {}", self.message),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_prefixes_message_and_keeps_code() {
        let err = AppError::new(EXIT_NUMERICAL, "design matrix is singular").with_context("variance fit");
        assert_eq!(err.exit_code(), EXIT_NUMERICAL);
        assert_eq!(err.to_string(), "variance fit: design matrix is singular");
    }
}
