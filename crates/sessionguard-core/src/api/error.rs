use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExchangeError {
    #[error("Credentials rejected: {0}")]
    CredentialRejected(String),

    #[error("Transport failure: {0}")]
    TransportFailure(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ExchangeError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        match body.char_indices().nth(MAX_ERROR_BODY_LENGTH) {
            None => body.to_string(),
            Some((cut, _)) => format!(
                "{}... (truncated, {} total bytes)",
                &body[..cut],
                body.len()
            ),
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 | 403 => ExchangeError::CredentialRejected(truncated),
            _ => ExchangeError::TransportFailure(format!("Status {}: {}", status, truncated)),
        }
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, ExchangeError::CredentialRejected(_))
    }
}

impl From<reqwest::Error> for ExchangeError {
    fn from(err: reqwest::Error) -> Self {
        ExchangeError::TransportFailure(err.to_string())
    }
}
