//! HTTP dispatch of synthesized workflow requests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::workflow::schema::{ActionDetails, HttpMethod};

/// One outbound request, fully resolved.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<serde_json::Value>,
    pub headers: Option<HashMap<String, String>>,
    pub timeout: Duration,
}

impl DispatchRequest {
    pub fn from_action(details: &ActionDetails, timeout: Duration) -> Self {
        Self {
            method: details.method,
            url: details.url.clone(),
            body: details.body.clone().map(serde_json::Value::Object),
            headers: details.headers.clone(),
            timeout,
        }
    }
}

/// Whatever the target answered, error statuses included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResponse {
    pub status: u16,
    /// Canonical reason phrase for `status` (e.g. "Not Found")
    pub reason: String,
    pub body: String,
}

impl DispatchResponse {
    /// 2xx and 3xx count as success.
    pub fn is_success(&self) -> bool {
        self.status < 400
    }
}

/// The request never produced a response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Network(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

#[async_trait]
pub trait HttpDispatcher: Send + Sync {
    async fn request(&self, request: DispatchRequest) -> Result<DispatchResponse, DispatchError>;
}

/// `HttpDispatcher` on top of a shared reqwest client.
#[derive(Clone, Default)]
pub struct ReqwestDispatcher {
    client: reqwest::Client,
}

impl ReqwestDispatcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl HttpDispatcher for ReqwestDispatcher {
    async fn request(&self, request: DispatchRequest) -> Result<DispatchResponse, DispatchError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self
            .client
            .request(method, &request.url)
            .timeout(request.timeout);
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }
        if let Some(ref headers) = request.headers {
            for (name, value) in headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }

        tracing::debug!("[Dispatcher] {} {}", request.method, request.url);

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                DispatchError::Timeout(request.timeout)
            } else if e.is_builder() {
                DispatchError::InvalidRequest(e.to_string())
            } else {
                DispatchError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                DispatchError::Timeout(request.timeout)
            } else {
                DispatchError::Network(format!("Failed to read response body: {}", e))
            }
        })?;

        Ok(DispatchResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or("").to_string(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(method: HttpMethod, url: String) -> DispatchRequest {
        DispatchRequest {
            method,
            url,
            body: None,
            headers: None,
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_post_with_body_and_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login"))
            .and(header("X-Client", "apiflow"))
            .and(body_json(serde_json::json!({"username": "admin"})))
            .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"token":"xyz"}"#))
            .mount(&server)
            .await;

        let mut req = request(HttpMethod::Post, format!("{}/login", server.uri()));
        req.body = Some(serde_json::json!({"username": "admin"}));
        req.headers = Some(HashMap::from([("X-Client".to_string(), "apiflow".to_string())]));

        let response = ReqwestDispatcher::new().request(req).await.unwrap();
        assert_eq!(response.status, 201);
        assert!(response.is_success());
        assert_eq!(response.body, r#"{"token":"xyz"}"#);
    }

    #[tokio::test]
    async fn test_error_status_is_a_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_string("nope"))
            .mount(&server)
            .await;

        let response = ReqwestDispatcher::new()
            .request(request(HttpMethod::Get, format!("{}/missing", server.uri())))
            .await
            .unwrap();
        assert_eq!(response.status, 404);
        assert_eq!(response.reason, "Not Found");
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let mut req = request(HttpMethod::Get, format!("{}/slow", server.uri()));
        req.timeout = Duration::from_millis(50);

        let err = ReqwestDispatcher::new().request(req).await.unwrap_err();
        assert_eq!(err, DispatchError::Timeout(Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        // Port 9 (discard) is essentially never listening on localhost.
        let err = ReqwestDispatcher::new()
            .request(request(HttpMethod::Get, "http://127.0.0.1:9/".to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Network(_)));
    }
}
