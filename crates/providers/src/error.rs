//! Typed failures of the remote generative service.

use reqwest::StatusCode;
use serde::Deserialize;

/// Message Google returns when the key does not grant access to the model.
const ENTITY_NOT_FOUND: &str = "Requested entity was not found";

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("No Gemini API key configured (set GEMINI_API_KEY or settings.gemini.auth.api_key)")]
    MissingCredential,

    #[error("Requested entity was not found: {0}")]
    EntityNotFound(String),

    #[error("gemini error: {status}\n{body}")]
    Status { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("malformed image payload: {0}")]
    Image(#[from] base64::DecodeError),
}

impl ProviderError {
    /// Whether the user needs to pick a different key.
    pub fn is_credential_problem(&self) -> bool {
        matches!(
            self,
            ProviderError::MissingCredential | ProviderError::EntityNotFound(_)
        )
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Map a non-success HTTP response onto a [`ProviderError`].
pub fn classify_http_error(status: StatusCode, body: &str) -> ProviderError {
    let body = body.trim();
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        if envelope.error.message.contains(ENTITY_NOT_FOUND) {
            return ProviderError::EntityNotFound(envelope.error.status);
        }
    } else if body.contains(ENTITY_NOT_FOUND) {
        return ProviderError::EntityNotFound(status.to_string());
    }

    let detail: String = body.chars().take(800).collect();
    ProviderError::Status {
        status,
        body: detail,
    }
}
