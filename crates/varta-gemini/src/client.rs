// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the Gemini generateContent and operations APIs.
//!
//! Provides [`GeminiClient`] which handles request construction,
//! authentication, streaming SSE responses, and transient error retry.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};
use varta_core::VartaError;

use crate::types::{
    ApiErrorResponse, GenerateContentRequest, GenerateContentResponse, Operation,
    VideoGenerationRequest,
};

/// Base URL for the Gemini API.
const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// HTTP client for Gemini API communication.
///
/// Manages the authentication header, connection pooling, and retry logic
/// for transient errors (429, 500, 503). Calls that belong to the
/// long-running video operation translate a provider "not found" into
/// [`VartaError::KeyReset`], since an invalid or expired credential-scoped
/// resource surfaces there as a 404.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    max_retries: u32,
    base_url: String,
}

impl GeminiClient {
    /// Creates a new Gemini API client.
    pub fn new(api_key: String) -> Result<Self, VartaError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&api_key)
                .map_err(|e| VartaError::Config(format!("invalid API key header value: {e}")))?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| VartaError::Backend {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            api_key,
            max_retries: 1,
            base_url: API_BASE_URL.to_string(),
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// Sends a one-shot generateContent request.
    pub async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, VartaError> {
        let url = format!("{}/models/{model}:generateContent", self.base_url);
        let body = self.post_with_retry(&url, request, false).await?;
        serde_json::from_str(&body).map_err(|e| VartaError::Backend {
            message: format!("failed to parse API response: {e}"),
            source: Some(Box::new(e)),
        })
    }

    /// Sends a streaming generateContent request and returns the raw HTTP
    /// response for SSE parsing.
    pub async fn stream_generate(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<reqwest::Response, VartaError> {
        let url = format!(
            "{}/models/{model}:streamGenerateContent?alt=sse",
            self.base_url
        );

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying streaming request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&url)
                .json(request)
                .send()
                .await
                .map_err(|e| VartaError::Backend {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "streaming response received");

            if status.is_success() {
                return Ok(response);
            }

            let body = response.text().await.unwrap_or_default();
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(api_error(status, &body));
                continue;
            }
            return Err(api_error(status, &body));
        }

        Err(last_error.unwrap_or_else(|| VartaError::backend("streaming request failed after retries")))
    }

    /// Starts a long-running video generation operation.
    pub async fn start_video(
        &self,
        model: &str,
        request: &VideoGenerationRequest,
    ) -> Result<Operation, VartaError> {
        let url = format!("{}/models/{model}:predictLongRunning", self.base_url);
        let body = self.post_with_retry(&url, request, true).await?;
        serde_json::from_str(&body).map_err(|e| VartaError::Backend {
            message: format!("failed to parse operation: {e}"),
            source: Some(Box::new(e)),
        })
    }

    /// Polls a long-running operation by resource name.
    pub async fn poll_operation(&self, name: &str) -> Result<Operation, VartaError> {
        let url = format!("{}/{name}", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| VartaError::Backend {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(video_error(status, &body));
        }
        serde_json::from_str(&body).map_err(|e| VartaError::Backend {
            message: format!("failed to parse operation: {e}"),
            source: Some(Box::new(e)),
        })
    }

    /// Downloads generated media bytes from a file URI returned by a
    /// completed operation. The API key is appended as a query parameter,
    /// matching the file-service contract.
    pub async fn download(&self, uri: &str) -> Result<Vec<u8>, VartaError> {
        let sep = if uri.contains('?') { '&' } else { '?' };
        let url = format!("{uri}{sep}key={}", self.api_key);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| VartaError::Backend {
                message: format!("media download failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(video_error(status, &body));
        }
        let bytes = response.bytes().await.map_err(|e| VartaError::Backend {
            message: format!("failed to read media bytes: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(bytes.to_vec())
    }

    /// POST with retry-once on transient status codes. `video` selects the
    /// video-path error mapping (404 -> KeyReset).
    async fn post_with_retry<B: serde::Serialize>(
        &self,
        url: &str,
        request: &B,
        video: bool,
    ) -> Result<String, VartaError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(url)
                .json(request)
                .send()
                .await
                .map_err(|e| VartaError::Backend {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "response received");

            let body = response.text().await.unwrap_or_default();
            if status.is_success() {
                return Ok(body);
            }

            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, body = %body, "transient error, will retry");
                last_error = Some(api_error(status, &body));
                continue;
            }

            return Err(if video {
                video_error(status, &body)
            } else {
                api_error(status, &body)
            });
        }

        Err(last_error.unwrap_or_else(|| VartaError::backend("request failed after retries")))
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}

/// Map a non-success response to a backend error, extracting the API error
/// message when the body parses.
fn api_error(status: reqwest::StatusCode, body: &str) -> VartaError {
    let message = if let Ok(api_err) = serde_json::from_str::<ApiErrorResponse>(body) {
        format!(
            "Gemini API error ({} {}): {}",
            api_err.error.code, api_err.error.status, api_err.error.message
        )
    } else {
        format!("API returned {status}: {body}")
    };
    VartaError::Backend {
        message,
        source: None,
    }
}

/// Video-path error mapping: a provider "not found" means the current
/// credential no longer scopes the operation and must be reselected.
fn video_error(status: reqwest::StatusCode, body: &str) -> VartaError {
    if status == reqwest::StatusCode::NOT_FOUND || body.contains("Requested entity was not found")
    {
        return VartaError::KeyReset;
    }
    api_error(status, body)
}
