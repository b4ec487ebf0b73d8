//! `ServiceUnderTest` over a live HTTP endpoint.

use std::time::Duration;

use reqwest::{blocking::Client, header::CONTENT_TYPE, Method};
use tracing::debug;

use rlfuzz_contracts::{
    config::ServiceConfig,
    dial::HttpMethod,
    error::{EnvironmentError, FuzzError, FuzzResult},
    execution::{ApiRequest, ApiResponse},
};
use rlfuzz_core::traits::ServiceUnderTest;

/// Blocking JSON client bound to one base URL, e.g. `http://localhost:8080/api`.
pub struct HttpService {
    client: Client,
    base_url: String,
    timeout_ms: u64,
}

impl HttpService {
    pub fn new(config: &ServiceConfig) -> FuzzResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(FuzzError::ConfigError {
                reason: "service.base_url must not be empty".to_string(),
            });
        }
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| FuzzError::ConfigError {
                reason: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_ms: config.timeout_ms,
        })
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn classify(&self, e: reqwest::Error) -> EnvironmentError {
        if e.is_timeout() {
            EnvironmentError::Timeout {
                millis: self.timeout_ms,
            }
        } else {
            EnvironmentError::Transport {
                reason: e.to_string(),
            }
        }
    }
}

fn method(m: HttpMethod) -> Method {
    match m {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

impl ServiceUnderTest for HttpService {
    fn send(&mut self, request: &ApiRequest) -> Result<ApiResponse, EnvironmentError> {
        let url = self.url_for(&request.path);
        let mut builder = self.client.request(method(request.method), &url);
        if let Some(body) = &request.body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone());
        }

        let response = builder.send().map_err(|e| self.classify(e))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| EnvironmentError::MalformedResponse {
                reason: e.to_string(),
            })?;

        debug!(method = %request.method, url = %url, status, "request completed");
        Ok(ApiResponse::new(status, body))
    }
}
