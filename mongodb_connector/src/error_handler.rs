/// Message signature of the server's `Unauthorized` failure.
pub const AUTHORIZATION_FAILURE_MESSAGE: &str = "Command failed with error 13";
/// Message signature of the server's `AuthenticationFailed` failure.
pub const AUTHENTICATION_FAILURE_MESSAGE: &str = "Command failed with error 18";

/// What an [`ErrorHandler`] wants done with a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDecision {
    /// Pause and try the operation again.
    Retry,
    /// Stop and return the error to the caller.
    Fatal,
}

/// Called with every failed attempt of an `execute` call.
pub trait ErrorHandler: Send + Sync {
    fn on_error(&self, description: &str, error: &anyhow::Error) -> ErrorDecision;
}

impl<F> ErrorHandler for F
where
    F: Fn(&str, &anyhow::Error) -> ErrorDecision + Send + Sync,
{
    fn on_error(&self, description: &str, error: &anyhow::Error) -> ErrorDecision {
        self(description, error)
    }
}

/// Treats every failure as fatal. This is the default handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailFast;

impl ErrorHandler for FailFast {
    fn on_error(&self, description: &str, error: &anyhow::Error) -> ErrorDecision {
        tracing::error!("Error while attempting to {}: {:#}", description, error);
        ErrorDecision::Fatal
    }
}

/// Logs failures and keeps retrying.
///
/// With `fatal_on_authorization_failure` set, failures recognised by
/// [`is_authorization_failure`] stop the loop instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct RetryTransient {
    pub fatal_on_authorization_failure: bool,
}

impl ErrorHandler for RetryTransient {
    fn on_error(&self, description: &str, error: &anyhow::Error) -> ErrorDecision {
        if self.fatal_on_authorization_failure && is_authorization_failure(error) {
            tracing::error!(
                "Not authorized to {}, giving up. Caused by: {:#}",
                description,
                error
            );
            return ErrorDecision::Fatal;
        }
        tracing::warn!("Error while attempting to {}: {:#}", description, error);
        ErrorDecision::Retry
    }
}

/// Returns `true` when any error in the chain carries an authorization or
/// authentication failure signature.
pub fn is_authorization_failure(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        let message = cause.to_string();
        message.contains(AUTHORIZATION_FAILURE_MESSAGE)
            || message.contains(AUTHENTICATION_FAILURE_MESSAGE)
    })
}
