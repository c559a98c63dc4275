//! Error types.
//!
//! [`PatternError`] is a setup-time failure: a route template that cannot be
//! compiled. [`RouteError`] is the request-time channel that carries a
//! failure forward along the middleware chain.

use std::any::Any;
use std::fmt;

use thiserror::Error;

use crate::http::response::StatusCode;

/// A route template that cannot be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    #[error("unbalanced parenthesis at byte {position} in `{template}`")]
    UnbalancedParen { template: String, position: usize },

    #[error("missing parameter name at byte {position} in `{template}`")]
    EmptyParamName { template: String, position: usize },

    #[error("empty group at byte {position} in `{template}`")]
    EmptyGroup { template: String, position: usize },

    #[error("duplicate parameter `{name}` in `{template}`")]
    DuplicateParam { template: String, name: String },

    /// A custom group may not contain capturing groups of its own.
    #[error("nested capture group in `{template}`")]
    NestedGroup { template: String },

    #[error("invalid pattern `{template}`: {reason}")]
    Regex { template: String, reason: String },
}

/// A failure raised while handling a request.
///
/// Handlers hand one of these to the next error handler by returning it,
/// by calling [`Context::next_with`](super::Context::next_with), or by
/// panicking (see [`RouteError::from_panic`]).
#[derive(Debug, Error)]
pub enum RouteError {
    /// Carries the status and message the default responder will send.
    #[error("{status}: {message}")]
    Status { status: StatusCode, message: String },

    /// Any other failure. Answered with a generic 500.
    #[error(transparent)]
    Opaque(#[from] anyhow::Error),
}

impl RouteError {
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        RouteError::Status {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::status(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::status(StatusCode::BAD_REQUEST, message)
    }

    pub fn opaque<M>(message: M) -> Self
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        RouteError::Opaque(anyhow::Error::msg(message))
    }

    /// The status the default responder answers with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RouteError::Status { status, .. } => *status,
            RouteError::Opaque(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_status(&self) -> bool {
        matches!(self, RouteError::Status { .. })
    }

    /// Converts a caught panic payload.
    ///
    /// A `RouteError` raised with [`std::panic::panic_any`] comes back
    /// unchanged; string payloads become opaque errors with that message.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let payload = match payload.downcast::<RouteError>() {
            Ok(err) => return *err,
            Err(other) => other,
        };
        let payload = match payload.downcast::<String>() {
            Ok(msg) => return Self::opaque(*msg),
            Err(other) => other,
        };
        match payload.downcast::<&'static str>() {
            Ok(msg) => Self::opaque(*msg),
            Err(_) => Self::opaque("handler panicked"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_of_opaque_is_500() {
        let err = RouteError::opaque("boom");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.is_status());
    }

    #[test]
    fn from_panic_keeps_route_error() {
        let payload: Box<dyn Any + Send> =
            Box::new(RouteError::status(StatusCode::FORBIDDEN, "nope"));
        let err = RouteError::from_panic(payload);
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.to_string(), "403 Forbidden: nope");
    }

    #[test]
    fn from_panic_string_payloads() {
        let err = RouteError::from_panic(Box::new("static message"));
        assert_eq!(err.to_string(), "static message");

        let err = RouteError::from_panic(Box::new(String::from("owned message")));
        assert_eq!(err.to_string(), "owned message");

        let err = RouteError::from_panic(Box::new(42_u32));
        assert_eq!(err.to_string(), "handler panicked");
    }

    #[test]
    fn anyhow_converts_to_opaque() {
        fn fails() -> Result<(), RouteError> {
            Err(anyhow::anyhow!("disk on fire"))?;
            Ok(())
        }
        let err = fails().unwrap_err();
        assert!(matches!(err, RouteError::Opaque(_)));
    }
}
