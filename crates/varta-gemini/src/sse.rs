// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SSE stream parser for streaming generateContent responses.
//!
//! Converts a reqwest response byte stream into a stream of
//! [`GenerateContentResponse`] chunks using the `eventsource-stream` crate
//! for SSE protocol compliance.

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use varta_core::VartaError;

use crate::types::GenerateContentResponse;

/// Parses a reqwest streaming response into typed response chunks.
///
/// Each SSE data payload is one `GenerateContentResponse` JSON document.
/// Events with empty data (keep-alives) are silently skipped.
pub fn parse_sse_stream(
    response: reqwest::Response,
) -> Pin<Box<dyn Stream<Item = Result<GenerateContentResponse, VartaError>> + Send>> {
    let byte_stream = response.bytes_stream();
    let event_stream = byte_stream.eventsource();

    let mapped = event_stream.filter_map(|result| async move {
        match result {
            Ok(event) => {
                if event.data.trim().is_empty() {
                    return None;
                }
                Some(
                    serde_json::from_str::<GenerateContentResponse>(&event.data).map_err(|e| {
                        VartaError::Backend {
                            message: format!("failed to parse stream chunk: {e}"),
                            source: Some(Box::new(e)),
                        }
                    }),
                )
            }
            Err(e) => Some(Err(VartaError::Backend {
                message: format!("SSE stream error: {e}"),
                source: None,
            })),
        }
    });

    Box::pin(mapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    /// Serve raw SSE text through wiremock to get a real reqwest::Response.
    async fn mock_sse_response(sse_text: &str) -> reqwest::Response {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(sse_text.to_string()),
            )
            .mount(&server)
            .await;

        reqwest::get(&server.uri()).await.unwrap()
    }

    #[tokio::test]
    async fn parses_text_chunks_in_order() {
        let sse = concat!(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Na\"}]}}]}\n\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"ma\"}]}}]}\n\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"ste\"}]}}]}\n\n",
        );
        let response = mock_sse_response(sse).await;
        let chunks: Vec<_> = parse_sse_stream(response)
            .map(|r| r.unwrap().text())
            .collect()
            .await;
        assert_eq!(chunks, vec!["Na", "ma", "ste"]);
    }

    #[tokio::test]
    async fn malformed_chunk_surfaces_error() {
        let sse = "data: {not json}\n\n";
        let response = mock_sse_response(sse).await;
        let mut stream = parse_sse_stream(response);
        let first = stream.next().await.unwrap();
        assert!(first.is_err());
    }

    #[tokio::test]
    async fn grounding_chunks_survive_parsing() {
        let sse = concat!(
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"x\"}]},",
            "\"groundingMetadata\":{\"groundingChunks\":[{\"web\":{\"uri\":\"https://s.example\",\"title\":\"S\"}}]}}]}\n\n",
        );
        let response = mock_sse_response(sse).await;
        let mut stream = parse_sse_stream(response);
        let chunk = stream.next().await.unwrap().unwrap();
        let sources: Vec<_> = chunk.web_sources().collect();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].title.as_deref(), Some("S"));
    }
}
