//! Common test utilities for engine tests.

#![allow(dead_code)] // Not all test files use every helper

use std::io::Write;

use serde::Serialize;
use serde_json::{Value, json};
use tempfile::NamedTempFile;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use anki_csv_engine::{AnkiClient, Engine};

/// Start a new mock server for testing.
pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// Create an engine whose client talks to the mock server.
pub fn engine_for_mock(server: &MockServer) -> Engine {
    Engine::from_client(AnkiClient::builder().url(server.uri()).build())
}

/// Create a successful AnkiConnect response.
pub fn mock_anki_response<T: Serialize>(result: T) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "result": result,
        "error": null
    }))
}

/// Create a `multi` response from per-action `(result, error)` pairs.
pub fn mock_multi_response(results: Vec<(Value, Option<&str>)>) -> ResponseTemplate {
    let envelopes: Vec<Value> = results
        .into_iter()
        .map(|(result, error)| json!({"result": result, "error": error}))
        .collect();
    mock_anki_response(envelopes)
}

/// Mount a mock for a specific action, expected exactly once.
pub async fn mock_action(server: &MockServer, action: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "action": action,
            "version": 6
        })))
        .respond_with(response)
        .expect(1)
        .mount(server)
        .await;
}

/// Mount a mock for a specific action, expected `times` times.
pub async fn mock_action_times(
    server: &MockServer,
    action: &str,
    response: ResponseTemplate,
    times: u64,
) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "action": action,
            "version": 6
        })))
        .respond_with(response)
        .expect(times)
        .mount(server)
        .await;
}

/// Mount a mock for a `multi` request whose first sub-action is `sub_action`.
pub async fn mock_multi(
    server: &MockServer,
    sub_action: &str,
    response: ResponseTemplate,
    times: u64,
) {
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "action": "multi",
            "params": {"actions": [{"action": sub_action, "version": 6}]}
        })))
        .respond_with(response)
        .expect(times)
        .mount(server)
        .await;
}

/// Mount the checks every AnkiConnect import starts with.
pub async fn mock_prepare(server: &MockServer, model: &str, fields: &[&str], times: u64) {
    mock_action_times(server, "version", mock_anki_response(6), times).await;
    mock_action_times(
        server,
        "modelNames",
        mock_anki_response(vec!["Basic", "Cloze", model]),
        times,
    )
    .await;
    mock_action_times(server, "modelFieldNames", mock_anki_response(fields), times).await;
    mock_action_times(server, "createDeck", mock_anki_response(1234_i64), times).await;
}

/// A `notesInfo` entry.
pub fn note_info(note_id: i64, tags: &[&str]) -> Value {
    json!({
        "noteId": note_id,
        "modelName": "Basic",
        "tags": tags,
        "fields": {
            "Front": {"value": "", "order": 0},
            "Back": {"value": "", "order": 1}
        },
        "cards": [note_id + 1]
    })
}

/// Write CSV text to a temporary file.
pub fn csv_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}
