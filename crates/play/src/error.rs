use std::fmt;

/// Failures raised below the command layer: reading and writing `play.json`
/// and persona files, validating persona tokens and verbosity levels, and
/// reading operator input.
///
/// Commands never return this type. They turn it into an `awi:` failure
/// [`crate::outcome::Outcome`] (`awi:invalid-input`, `awi:not-found`,
/// `awi:internal-error`) so the session can report it like any other answer.
#[derive(Debug, Clone)]
pub enum CoreError {
    /// A value the operator or a stored file supplied was rejected: a
    /// malformed persona token, a verbosity outside `1..=4`, or a config
    /// written for another major version.
    InvalidInput(String),
    /// No persona file exists for the requested token.
    NotFound(String),
    /// IO or JSON failure on config and persona files, or on the input
    /// stream feeding a session.
    Internal(String),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            CoreError::NotFound(what) => write!(f, "not found: {what}"),
            CoreError::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for CoreError {}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FilePersonaStore, MAX_VERBOSITY};
    use crate::host::ConfigProvider;
    use crate::testing::fixture;

    #[test]
    fn persona_token_rejection_reads_as_invalid_input() {
        let error = FilePersonaStore::new("personas")
            .persona_path("../etc")
            .expect_err("token with a path separator");
        assert_eq!(error.to_string(), "invalid input: invalid persona token: '../etc'");
    }

    #[test]
    fn verbosity_out_of_bounds_is_invalid_input() {
        let fixture = fixture();
        let error = fixture
            .config
            .set_verbosity(MAX_VERBOSITY + 1)
            .expect_err("above the limit");
        assert!(matches!(error, CoreError::InvalidInput(_)), "{error:?}");
    }
}
