//! HTTP client abstraction for testability

use std::time::Duration;

use async_trait::async_trait;

/// HTTP response from a request
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Abstraction over HTTP client for dependency injection
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait HttpClient: Send + Sync {
    /// Send a GET request to the given URL
    async fn get(&self, url: &str) -> crate::Result<HttpResponse>;

    /// Send a POST request with form-encoded body
    async fn post_form(&self, url: &str, params: &[(&str, &str)]) -> crate::Result<HttpResponse>;
}

/// Production HTTP client using reqwest
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Build a client with a per-request timeout and user agent
    pub fn new(timeout: Duration, user_agent: &str) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| crate::ForumWatchError::Http(format!("Building HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

fn describe(method: &str, url: &str, e: &reqwest::Error) -> crate::ForumWatchError {
    if e.is_timeout() {
        crate::ForumWatchError::Http(format!("{} {} timed out", method, url))
    } else {
        crate::ForumWatchError::Http(format!("{} {} failed: {}", method, url, e))
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str) -> crate::Result<HttpResponse> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| describe("GET", url, &e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| crate::ForumWatchError::Http(format!("Reading response body: {}", e)))?;

        tracing::debug!("GET {} -> {} ({} bytes)", url, status, body.len());
        Ok(HttpResponse { status, body })
    }

    async fn post_form(&self, url: &str, params: &[(&str, &str)]) -> crate::Result<HttpResponse> {
        // The URL can carry a bot token, keep it out of the logs
        let target = url.split("/bot").next().unwrap_or(url);
        tracing::debug!("POST {}", target);
        let response = self
            .client
            .post(url)
            .form(params)
            .send()
            .await
            .map_err(|e| describe("POST", target, &e.without_url()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| crate::ForumWatchError::Http(format!("Reading response body: {}", e)))?;

        tracing::debug!("POST {} -> {} ({} bytes)", target, status, body.len());
        Ok(HttpResponse { status, body })
    }
}
