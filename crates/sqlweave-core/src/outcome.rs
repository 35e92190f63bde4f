//! Propagation helpers for `Outcome`-returning async code.
//!
//! `?` does not work on [`Outcome`](asupersync::Outcome), so these macros
//! play its part: unwrap the success value or return early, converting the
//! error with `From` and passing cancellation and panics through untouched.

/// Unwrap `Outcome::Ok` or return the other variants from the enclosing
/// function. Errors are converted with `From`.
#[macro_export]
macro_rules! try_outcome {
    ($expr:expr) => {
        match $expr {
            $crate::Outcome::Ok(value) => value,
            $crate::Outcome::Err(err) => {
                return $crate::Outcome::Err(::core::convert::From::from(err));
            }
            $crate::Outcome::Cancelled(reason) => return $crate::Outcome::Cancelled(reason),
            $crate::Outcome::Panicked(payload) => return $crate::Outcome::Panicked(payload),
        }
    };
}

/// Unwrap a `Result` inside a function returning `Outcome`, returning
/// `Outcome::Err` on failure.
#[macro_export]
macro_rules! try_result {
    ($expr:expr) => {
        match $expr {
            ::core::result::Result::Ok(value) => value,
            ::core::result::Result::Err(err) => {
                return $crate::Outcome::Err(::core::convert::From::from(err));
            }
        }
    };
}
