//! Blocking HTTP plumbing shared by the remote collectors.

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::warn;

use crate::error::{CollectError, CollectResult, RemoteFailure};

/// Longest response body excerpt kept in error messages
const BODY_EXCERPT: usize = 300;

/// Client with request and connect timeouts
pub fn build_client(timeout: Duration) -> CollectResult<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .user_agent(concat!("agromon/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| CollectError::config(format!("failed to create HTTP client: {}", e)))
}

/// Map an HTTP status to a failure kind, `None` on success
pub fn classify_status(status: StatusCode) -> Option<RemoteFailure> {
    if status.is_success() {
        return None;
    }
    Some(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteFailure::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS => RemoteFailure::QuotaExceeded,
        s if s.is_server_error() => RemoteFailure::ServerError,
        _ => RemoteFailure::Rejected,
    })
}

pub fn classify_error(err: &reqwest::Error) -> RemoteFailure {
    if err.is_timeout() {
        RemoteFailure::Timeout
    } else if err.is_connect() {
        RemoteFailure::Unreachable
    } else if err.is_decode() {
        RemoteFailure::InvalidResponse
    } else if let Some(kind) = err.status().and_then(classify_status) {
        kind
    } else {
        RemoteFailure::Unreachable
    }
}

/// Send `request` and decode a JSON body. Transport errors and non-success
/// statuses become [`CollectError::RemoteService`].
pub fn send_json<T: DeserializeOwned>(service: &str, request: RequestBuilder) -> CollectResult<T> {
    let response = request
        .send()
        .map_err(|e| CollectError::remote(service, classify_error(&e), e.to_string()))?;

    let status = response.status();
    if let Some(kind) = classify_status(status) {
        let body = response.text().unwrap_or_default();
        let excerpt: String = body.chars().take(BODY_EXCERPT).collect();
        return Err(CollectError::remote(
            service,
            kind,
            format!("HTTP {}: {}", status, excerpt),
        ));
    }

    response.json::<T>().map_err(|e| {
        CollectError::remote(service, RemoteFailure::InvalidResponse, e.to_string())
    })
}

/// Run `attempt`; on a transient failure wait `delay` and run it exactly once more
pub fn with_single_retry<T, F>(service: &str, delay: Duration, mut attempt: F) -> CollectResult<T>
where
    F: FnMut() -> CollectResult<T>,
{
    match attempt() {
        Err(err) if err.is_retryable() => {
            warn!(
                service = service,
                error = %err,
                delay_ms = delay.as_millis() as u64,
                "Transient failure, retrying once"
            );
            std::thread::sleep(delay);
            attempt()
        }
        other => other,
    }
}
