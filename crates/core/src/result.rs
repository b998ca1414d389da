//! Result alias and logging combinators.

use crate::error::Error;

/// The standard Result type for Kickoff HQ operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Combinators for errors that are recovered from by logging.
///
/// Used where a failure must not interrupt the caller, e.g. the best-effort
/// reload after a rejected collect.
pub trait ResultExt<T> {
    /// Convert to an Option, logging the error at `warn` level.
    fn into_option_logged(self, operation: &str) -> Option<T>;

    /// Get the value or a fallback, logging the error at `warn` level.
    fn or_default_logged(self, operation: &str, default: T) -> T;

    /// Inspect the error without consuming the Result.
    fn inspect_error<F: FnOnce(&Error)>(self, f: F) -> Self;
}

impl<T> ResultExt<T> for Result<T> {
    fn into_option_logged(self, operation: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(operation, error = %e, "Operation failed");
                None
            }
        }
    }

    fn or_default_logged(self, operation: &str, default: T) -> T {
        match self {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(operation, error = %e, "Operation failed, using fallback");
                default
            }
        }
    }

    fn inspect_error<F: FnOnce(&Error)>(self, f: F) -> Self {
        if let Err(ref e) = self {
            f(e);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_option_ok() {
        let result: Result<i32> = Ok(42);
        assert_eq!(result.into_option_logged("test"), Some(42));
    }

    #[test]
    fn test_into_option_err() {
        let result: Result<i32> = Err(Error::PollerStopped);
        assert_eq!(result.into_option_logged("test"), None);
    }

    #[test]
    fn test_or_default_logged() {
        let ok: Result<i32> = Ok(1);
        let err: Result<i32> = Err(Error::network("reload", "offline"));
        assert_eq!(ok.or_default_logged("reload", 9), 1);
        assert_eq!(err.or_default_logged("reload", 9), 9);
    }

    #[test]
    fn test_inspect_error_sees_error() {
        let mut seen = None;
        let result: Result<()> = Err(Error::already_collected("drill-7"));
        let _ = result.inspect_error(|e| seen = Some(e.clone()));
        assert_eq!(seen, Some(Error::already_collected("drill-7")));
    }
}
