use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use medchat::config::GeminiConfig;

pub const TEST_MODEL: &str = "gemini-test";
pub const TEST_KEY: &str = "test-key";

/// Path of the streaming endpoint for `TEST_MODEL`
#[allow(dead_code)]
pub fn stream_path() -> String {
    format!("/v1beta/models/{}:streamGenerateContent", TEST_MODEL)
}

/// Gemini config pointed at a mock server
#[allow(dead_code)]
pub fn gemini_config(server: &MockServer) -> GeminiConfig {
    GeminiConfig {
        model: TEST_MODEL.to_string(),
        api_base: server.uri(),
        api_key: Some(TEST_KEY.to_string()),
        ..Default::default()
    }
}

/// SSE body carrying one text fragment per event
#[allow(dead_code)]
pub fn sse_body(fragments: &[&str]) -> String {
    fragments
        .iter()
        .map(|text| {
            let chunk = serde_json::json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [{ "text": text }] }
                }]
            });
            format!("data: {}\r\n\r\n", chunk)
        })
        .collect()
}

/// Mount a streaming answer that expects exactly `times` requests
#[allow(dead_code)]
pub async fn mount_stream(server: &MockServer, fragments: &[&str], times: u64) {
    Mock::given(method("POST"))
        .and(path(stream_path()))
        .and(query_param("alt", "sse"))
        .and(header("x-goog-api-key", TEST_KEY))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(sse_body(fragments)),
        )
        .expect(times)
        .mount(server)
        .await;
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Smallest valid PNG: one transparent pixel
#[allow(dead_code)]
pub const TINY_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];
