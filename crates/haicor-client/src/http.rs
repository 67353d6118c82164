//! HTTP transport for the reasoning backend.

use haicor_types::{ApiTransport, TransportError};

/// Transport that talks JSON over HTTP to a backend rooted at `base_url`.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read(res: reqwest::Response) -> Result<serde_json::Value, TransportError> {
        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| TransportError::Decode(e.to_string()))
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[async_trait::async_trait]
impl ApiTransport for HttpTransport {
    async fn get_json(&self, path: &str) -> Result<serde_json::Value, TransportError> {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Self::read(res).await
    }

    async fn post_json(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, TransportError> {
        let res = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        Self::read(res).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_drops_trailing_slash() {
        let t = HttpTransport::new("http://localhost:3001/");
        assert_eq!(t.base_url(), "http://localhost:3001");
        assert_eq!(t.url("/api/story"), "http://localhost:3001/api/story");
    }
}
