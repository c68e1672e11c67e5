//! Error types and the error-handling policy for the ratelim client.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur when using the ratelim client.
#[derive(Error, Debug)]
pub enum RatelimError {
    /// HTTP error returned by the limiting service.
    #[error("HTTP error {status_code}: {message}")]
    Http { status_code: u16, message: String },

    /// Error making the HTTP request.
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Missing required configuration.
    #[error("Missing required configuration: {0}")]
    MissingConfig(&'static str),

    /// A limit definition failed local validation.
    #[error("Invalid limit definition: {message}")]
    InvalidLimit { message: String },

    /// A rate policy name the limiting service does not define.
    #[error("Unrecognized rate policy `{0}`")]
    InvalidPolicy(String),

    /// No tokens were granted within the wait budget of
    /// [`acquire_or_wait`](crate::RatelimClient::acquire_or_wait).
    #[error("No tokens granted for `{group}` within {max_wait:?}")]
    WaitExceeded { group: String, max_wait: Duration },
}

/// What the client does when a call to the limiting service fails.
///
/// Every limit and flag check has a local substitute: a limit check can fail
/// open or closed, a flag check can report on or off. The policy decides
/// whether a remote failure is absorbed into that substitute or surfaced to
/// the caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Log the failure and act as if the check passed.
    #[default]
    PassThrough,
    /// Log the failure and act as if the check was denied.
    FailClosed,
    /// Return the failure to the caller.
    Propagate,
}

impl ErrorPolicy {
    /// Resolves a failed remote call to a substitute value or an error.
    ///
    /// `open` is the substitute for [`ErrorPolicy::PassThrough`], `closed`
    /// the one for [`ErrorPolicy::FailClosed`].
    pub(crate) fn resolve<T>(
        self,
        error: RatelimError,
        open: T,
        closed: T,
    ) -> Result<T, RatelimError> {
        match self {
            ErrorPolicy::PassThrough => {
                tracing::warn!(error = %error, "limiting service call failed, failing open");
                Ok(open)
            }
            ErrorPolicy::FailClosed => {
                tracing::warn!(error = %error, "limiting service call failed, failing closed");
                Ok(closed)
            }
            ErrorPolicy::Propagate => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_error() -> RatelimError {
        RatelimError::Http {
            status_code: 500,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_pass_through_substitutes_open_value() {
        let resolved = ErrorPolicy::PassThrough.resolve(sample_error(), true, false);
        assert!(resolved.unwrap());
    }

    #[test]
    fn test_fail_closed_substitutes_closed_value() {
        let resolved = ErrorPolicy::FailClosed.resolve(sample_error(), true, false);
        assert!(!resolved.unwrap());
    }

    #[test]
    fn test_propagate_returns_the_error() {
        let resolved = ErrorPolicy::Propagate.resolve(sample_error(), true, false);
        assert!(matches!(
            resolved,
            Err(RatelimError::Http {
                status_code: 500,
                ..
            })
        ));
    }

    #[test]
    fn test_default_policy_is_pass_through() {
        assert_eq!(ErrorPolicy::default(), ErrorPolicy::PassThrough);
    }
}
