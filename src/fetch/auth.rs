//! Credential wrappers around [`HttpClient`](super::HttpClient).

use super::HttpClient;
use async_trait::async_trait;
use reqwest::header::HeaderName;

/// An [`HttpClient`] wrapper that injects a static token as an HTTP header
/// on every request it executes.
pub struct ApiKey<C> {
    pub inner: C,
    pub header_name: String,
    pub key: String,
}

impl<C> ApiKey<C> {
    /// Convenience constructor for `Authorization: Bearer <token>`, the
    /// scheme the telemetry backend expects.
    pub fn bearer(inner: C, token: String) -> Self {
        Self {
            inner,
            header_name: "Authorization".to_string(),
            key: format!("Bearer {token}"),
        }
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for ApiKey<C> {
    async fn execute(&self, mut req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        let header_name = HeaderName::from_bytes(self.header_name.as_bytes())
            .expect("ApiKey: invalid header name");
        req.headers_mut()
            .insert(header_name, self.key.parse().expect("ApiKey: invalid header value"));
        self.inner.execute(req).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_formats_authorization_header() {
        let wrapped = ApiKey::bearer(crate::fetch::BasicClient::new(), "tok-123".to_string());
        assert_eq!(wrapped.header_name, "Authorization");
        assert_eq!(wrapped.key, "Bearer tok-123");
    }
}
