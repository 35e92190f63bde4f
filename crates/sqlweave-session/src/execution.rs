//! The boundary where connection failures become sqlweave errors.

use sqlweave_core::{BoxError, Error, Operation, Outcome};

/// Wrap a driver failure once. Errors that already are sqlweave errors pass
/// through untouched.
pub(crate) fn execution_error(operation: Operation, command_text: &str, source: BoxError) -> Error {
    match source.downcast::<Error>() {
        Ok(err) => *err,
        Err(source) => Error::execution(operation, command_text, source),
    }
}

/// Map the error arm of a connection outcome through [`execution_error`].
pub(crate) fn wrap<T>(
    outcome: Outcome<T, BoxError>,
    operation: Operation,
    command_text: &str,
) -> Outcome<T, Error> {
    match outcome {
        Outcome::Ok(value) => Outcome::Ok(value),
        Outcome::Err(source) => Outcome::Err(execution_error(operation, command_text, source)),
        Outcome::Cancelled(reason) => Outcome::Cancelled(reason),
        Outcome::Panicked(payload) => Outcome::Panicked(payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlweave_core::UsageError;

    #[test]
    fn test_driver_errors_are_wrapped_once() {
        let err = execution_error(Operation::ExecuteNonQuery, "DELETE FROM t", "locked".into());
        match err {
            Error::Execution(inner) => {
                assert_eq!(inner.operation, Operation::ExecuteNonQuery);
                assert_eq!(inner.command_text, "DELETE FROM t");
                assert_eq!(inner.source.to_string(), "locked");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_domain_errors_pass_through() {
        let source: BoxError = Box::new(Error::from(UsageError::EmptyBatch));
        let err = execution_error(Operation::ExecuteReader, "SELECT 1", source);
        assert!(matches!(err, Error::Usage(UsageError::EmptyBatch)));
    }
}
