//! Outbound request channel carrying the session token.

use std::sync::Arc;

use parking_lot::RwLock;
use reqwest::{header, Client, Method, RequestBuilder};

/// Header carrying the session token on outbound requests
pub const TOKEN_HEADER: &str = "Token";

/// Somewhere the current session token is attached for outgoing requests.
///
/// `attach` is called on login and resume, `clear` on logout. Both run
/// while the session manager holds its state lock and must not block.
pub trait OutboundChannel: Send + Sync {
    fn attach(&self, token: &str);
    fn clear(&self);
}

/// Channel for hosts that make no authenticated requests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullChannel;

impl OutboundChannel for NullChannel {
    fn attach(&self, _token: &str) {}
    fn clear(&self) {}
}

/// A reqwest client that adds the session token to every request it builds.
/// Clones share both the connection pool and the attached token.
#[derive(Clone)]
pub struct HttpChannel {
    client: Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
}

impl HttpChannel {
    pub fn from_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            token: Arc::new(RwLock::new(None)),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().clone()
    }

    pub fn auth_headers(&self) -> Result<header::HeaderMap, header::InvalidHeaderValue> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = *self.token.read() {
            headers.insert(TOKEN_HEADER, header::HeaderValue::from_str(token)?);
        }
        Ok(headers)
    }

    /// Start a request to `path` under the base URL with the token attached.
    pub fn request(
        &self,
        method: Method,
        path: &str,
    ) -> Result<RequestBuilder, header::InvalidHeaderValue> {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Ok(self.client.request(method, url).headers(self.auth_headers()?))
    }
}

impl OutboundChannel for HttpChannel {
    fn attach(&self, token: &str) {
        *self.token.write() = Some(token.to_string());
    }

    fn clear(&self) {
        *self.token.write() = None;
    }
}
