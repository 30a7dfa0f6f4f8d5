//! Shared response handling for the store clients.

use sotto_core::Error;

/// Map a non-success response to the right error variant. Auth and missing
/// resources keep their dedicated variants regardless of which operation
/// tripped them; everything else goes through `wrap` (`Error::Store`,
/// `Error::Search`, ...).
pub(crate) async fn reject(op: &str, response: reqwest::Response, wrap: fn(String) -> Error) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match status {
        reqwest::StatusCode::UNAUTHORIZED => {
            Error::Unauthorized(format!("{} rejected: {}", op, body))
        }
        reqwest::StatusCode::NOT_FOUND => Error::NotFound(format!("{}: {}", op, body)),
        _ => wrap(format!("{} returned {}: {}", op, status, body)),
    }
}
