//! The remote credential exchange.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SessionConfig;

use super::channel::HttpChannel;
use super::ExchangeError;

/// A user identifier and secret. No local validation is applied.
#[derive(Clone)]
pub struct Credentials {
    pub user: String,
    password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Result of a successful credential exchange.
///
/// `user_id` is the identifier the caller logged in with; the server only
/// supplies the token and its validity window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    pub token: String,
    pub user_id: String,
    pub expires_in_millis: u64,
}

impl SessionGrant {
    pub fn expires_in(&self) -> Duration {
        Duration::from_millis(self.expires_in_millis)
    }
}

#[async_trait]
pub trait CredentialExchange: Send + Sync {
    async fn login(&self, credentials: &Credentials) -> Result<SessionGrant, ExchangeError>;
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    user: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    /// Validity window in milliseconds, despite the field name.
    #[serde(rename = "expiresAt", alias = "expiresIn")]
    expires_in_millis: u64,
}

/// Credential exchange against a JSON login endpoint.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpCredentialExchange {
    client: Client,
    login_url: String,
}

impl HttpCredentialExchange {
    pub fn new(config: &SessionConfig) -> Result<Self, ExchangeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            login_url: config.login_url(),
        })
    }

    /// An outbound channel sharing this exchange's connection pool.
    pub fn channel(&self, base_url: impl Into<String>) -> HttpChannel {
        HttpChannel::from_client(self.client.clone(), base_url)
    }

    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ExchangeError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ExchangeError::from_status(status, &body))
        }
    }
}

#[async_trait]
impl CredentialExchange for HttpCredentialExchange {
    async fn login(&self, credentials: &Credentials) -> Result<SessionGrant, ExchangeError> {
        debug!(url = %self.login_url, user = %credentials.user, "Sending login request");

        let response = self
            .client
            .post(&self.login_url)
            .header(header::ACCEPT, "application/json")
            .json(&LoginRequest {
                user: &credentials.user,
                password: credentials.password(),
            })
            .send()
            .await?;

        let response = Self::check_response(response).await?;

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| ExchangeError::TransportFailure(format!("Invalid login response: {}", e)))?;

        Ok(SessionGrant {
            token: login.token,
            user_id: credentials.user.clone(),
            expires_in_millis: login.expires_in_millis,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_login_response() {
        let json = r#"{"token": "eyJhbGciOi.abc.def", "userID": "admin", "expiresAt": 3600000}"#;
        let resp: LoginResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.token, "eyJhbGciOi.abc.def");
        assert_eq!(resp.expires_in_millis, 3_600_000);

        let json = r#"{"token": "t", "expiresIn": 5000}"#;
        let resp: LoginResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.expires_in_millis, 5000);
    }

    #[test]
    fn test_negative_expiry_is_rejected() {
        let json = r#"{"token": "t", "expiresAt": -1}"#;
        assert!(serde_json::from_str::<LoginResponse>(json).is_err());
    }

    #[test]
    fn test_login_request_shape() {
        let body = serde_json::to_value(LoginRequest {
            user: "admin",
            password: "hunter2",
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"user": "admin", "password": "hunter2"}));
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("admin", "hunter2");
        let shown = format!("{:?}", creds);
        assert!(shown.contains("admin"));
        assert!(!shown.contains("hunter2"));
    }

    #[test]
    fn test_exchange_uses_configured_url() {
        let config = SessionConfig {
            api_base_url: "https://auth.example.com".into(),
            ..SessionConfig::default()
        };
        let exchange = HttpCredentialExchange::new(&config).unwrap();
        assert_eq!(exchange.login_url, "https://auth.example.com/api/login");
    }
}
