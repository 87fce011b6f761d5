//! Shared HTTP plumbing for the collaborator clients

use std::time::Duration;

use reqwest::Response;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::{Retryable as RetryClass, default_on_request_failure, default_on_request_success};
use serde::de::DeserializeOwned;

use crate::ItineraryError;
use crate::error::CollaboratorError;

const USER_AGENT: &str = concat!("itinerai/", env!("CARGO_PKG_VERSION"));

/// Longest error body kept in an error message
const MAX_ERROR_BODY: usize = 512;

/// Build a client with the given request timeout.
///
/// Retries are not installed as middleware; call sites wrap whole
/// operations in [`crate::retry::RetryPolicy`].
pub fn build_client(timeout: Duration) -> crate::Result<ClientWithMiddleware> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ItineraryError::internal(format!("Failed to create HTTP client: {e}")))?;
    Ok(ClientBuilder::new(client).build())
}

/// Send a request and turn transport failures and non-success statuses into
/// [`CollaboratorError`]s classified as transient or not
pub async fn send(request: RequestBuilder) -> Result<Response, CollaboratorError> {
    let response = match request.send().await {
        Ok(response) => response,
        Err(err) => {
            let transient = matches!(default_on_request_failure(&err), Some(RetryClass::Transient));
            // Request URLs can carry API keys in the query string.
            let message = match err {
                reqwest_middleware::Error::Reqwest(err) => err.without_url().to_string(),
                reqwest_middleware::Error::Middleware(err) => err.to_string(),
            };
            return Err(CollaboratorError::Network { message, transient });
        }
    };

    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status();
    let transient = matches!(
        default_on_request_success(&response),
        Some(RetryClass::Transient)
    );
    let body = response.text().await.unwrap_or_default();
    Err(CollaboratorError::Http {
        status: status.as_u16(),
        message: truncate(&body),
        transient,
    })
}

/// Read a JSON body into `T`
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, CollaboratorError> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| CollaboratorError::transient(format!("Failed to read response body: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| CollaboratorError::InvalidResponse(format!("Unexpected response body: {e}")))
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
