use thiserror::Error;

/// Why a call to an external service failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteFailure {
    /// Connection refused, DNS failure, TLS failure
    Unreachable,
    Timeout,
    /// HTTP 401 / 403
    Unauthorized,
    /// HTTP 429
    QuotaExceeded,
    /// Any other 4xx: the service understood the query and refused it
    Rejected,
    /// HTTP 5xx
    ServerError,
    /// Body could not be decoded
    InvalidResponse,
}

impl RemoteFailure {
    /// Failures worth a second attempt
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            RemoteFailure::Unreachable
                | RemoteFailure::Timeout
                | RemoteFailure::QuotaExceeded
                | RemoteFailure::ServerError
        )
    }
}

/// Errors surfaced by collectors
///
/// A valid query that matches nothing is not an error: collectors report it as
/// [`crate::collect::Outcome::NoData`].
#[derive(Debug, Error)]
pub enum CollectError {
    /// Network, authentication or quota failure of an external API.
    #[error("{service} request failed ({kind:?}): {message}")]
    RemoteService {
        service: String,
        kind: RemoteFailure,
        message: String,
    },

    /// Missing or malformed credentials or parameters.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl CollectError {
    pub fn remote(service: impl Into<String>, kind: RemoteFailure, message: impl Into<String>) -> Self {
        CollectError::RemoteService {
            service: service.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        CollectError::Configuration(message.into())
    }

    /// True when the user may simply try again later
    pub fn is_retryable(&self) -> bool {
        match self {
            CollectError::RemoteService { kind, .. } => kind.is_transient(),
            CollectError::Configuration(_) => false,
        }
    }
}

pub type CollectResult<T> = std::result::Result<T, CollectError>;
