//! Tests for AnkiConnect imports.

mod common;

use anki_csv_engine::{CsvSource, Engine, Error, ImportOptions, NoteMapper, sync::lookup_query};
use common::{
    csv_file, engine_for_mock, mock_action, mock_anki_response, mock_multi, mock_multi_response,
    mock_prepare, note_info, setup_mock_server,
};
use serde_json::json;
use tempfile::tempdir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, ResponseTemplate};

fn options() -> ImportOptions {
    ImportOptions::new("Spanish", "Basic")
}

#[tokio::test]
async fn test_adds_new_and_updates_existing() {
    let server = setup_mock_server().await;
    mock_prepare(&server, "Basic", &["Front", "Back"], 1).await;
    mock_action(&server, "canAddNotes", mock_anki_response(vec![true, false])).await;
    mock_action(&server, "addNotes", mock_anki_response(vec![Some(111_i64)])).await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "action": "multi",
            "params": {"actions": [{
                "action": "findNotes",
                "params": {"query": "deck:\"Spanish\" \"Front:adios\""}
            }]}
        })))
        .respond_with(mock_multi_response(vec![(json!([222]), None)]))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "action": "multi",
            "params": {"actions": [{
                "action": "updateNoteFields",
                "params": {"note": {"id": 222, "fields": {"Front": "adios", "Back": "goodbye"}}}
            }]}
        })))
        .respond_with(mock_multi_response(vec![(json!(null), None)]))
        .expect(1)
        .mount(&server)
        .await;

    mock_action(
        &server,
        "notesInfo",
        mock_anki_response(vec![note_info(222, &["farewell", "old"])]),
    )
    .await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "action": "multi",
            "params": {"actions": [{"action": "addTags", "params": {"notes": [222], "tags": "new"}}]}
        })))
        .respond_with(mock_multi_response(vec![(json!(null), None)]))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "action": "multi",
            "params": {"actions": [{"action": "removeTags", "params": {"notes": [222], "tags": "old"}}]}
        })))
        .respond_with(mock_multi_response(vec![(json!(null), None)]))
        .expect(1)
        .mount(&server)
        .await;

    let csv = csv_file("Front,Back,tags\nhola,hello,greeting\nadios,goodbye,farewell new\n");
    let engine = engine_for_mock(&server);
    let report = engine
        .import_csv(&CsvSource::local(csv.path()), &options())
        .await
        .unwrap();

    assert_eq!(report.added, 1);
    assert_eq!(report.updated, 1);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.failed, 0);
    assert_eq!(report.tags_added, 1);
    assert_eq!(report.tags_removed, 1);
}

#[tokio::test]
async fn test_second_run_adds_nothing() {
    let server = setup_mock_server().await;
    mock_prepare(&server, "Basic", &["Front", "Back"], 2).await;

    // First run sees two new notes, the second finds both already present.
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"action": "canAddNotes"})))
        .respond_with(mock_anki_response(vec![true, true]))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"action": "canAddNotes"})))
        .respond_with(mock_anki_response(vec![false, false]))
        .expect(1)
        .mount(&server)
        .await;

    mock_action(&server, "addNotes", mock_anki_response(vec![Some(1_i64), Some(2_i64)])).await;
    mock_multi(
        &server,
        "findNotes",
        mock_multi_response(vec![(json!([1]), None), (json!([2]), None)]),
        1,
    )
    .await;
    mock_multi(
        &server,
        "updateNoteFields",
        mock_multi_response(vec![(json!(null), None), (json!(null), None)]),
        1,
    )
    .await;
    mock_action(
        &server,
        "notesInfo",
        mock_anki_response(vec![note_info(1, &["a"]), note_info(2, &[])]),
    )
    .await;

    let csv = csv_file("Front,Back,Tags\nuno,one,a\ndos,two,\n");
    let engine = engine_for_mock(&server);
    let source = CsvSource::local(csv.path());

    let first = engine.import_csv(&source, &options()).await.unwrap();
    let second = engine.import_csv(&source, &options()).await.unwrap();

    assert_eq!((first.added, first.updated), (2, 0));
    assert_eq!((second.added, second.updated), (0, 2));
    assert_eq!((second.tags_added, second.tags_removed), (0, 0));
}

#[tokio::test]
async fn test_ambiguous_or_missing_matches_are_skipped() {
    let server = setup_mock_server().await;
    mock_prepare(&server, "Basic", &["Front", "Back"], 1).await;
    mock_action(&server, "canAddNotes", mock_anki_response(vec![false, false, false])).await;
    mock_multi(
        &server,
        "findNotes",
        mock_multi_response(vec![
            (json!([]), None),
            (json!([5, 6]), None),
            (json!([7]), None),
        ]),
        1,
    )
    .await;
    mock_multi(
        &server,
        "updateNoteFields",
        mock_multi_response(vec![(json!(null), None)]),
        1,
    )
    .await;
    mock_action(&server, "notesInfo", mock_anki_response(vec![note_info(7, &[])])).await;

    let csv = csv_file("Front,Back\nnone,x\nmany,y\none,z\n");
    let engine = engine_for_mock(&server);
    let report = engine
        .import_csv(&CsvSource::local(csv.path()), &options())
        .await
        .unwrap();

    assert_eq!(report.updated, 1);
    assert_eq!(report.skipped, 2);
    assert_eq!(
        report.issues.iter().map(|i| i.line).collect::<Vec<_>>(),
        vec![2, 3]
    );
}

#[tokio::test]
async fn test_rejected_adds_and_failed_updates_count_as_failed() {
    let server = setup_mock_server().await;
    mock_prepare(&server, "Basic", &["Front", "Back"], 1).await;
    mock_action(&server, "canAddNotes", mock_anki_response(vec![true, false])).await;
    mock_action(&server, "addNotes", mock_anki_response(vec![None::<i64>])).await;
    mock_multi(&server, "findNotes", mock_multi_response(vec![(json!([9]), None)]), 1).await;
    mock_multi(
        &server,
        "updateNoteFields",
        mock_multi_response(vec![(json!(null), Some("note was not found: 9"))]),
        1,
    )
    .await;

    let csv = csv_file("Front,Back\na,1\nb,2\n");
    let engine = engine_for_mock(&server);
    let report = engine
        .import_csv(&CsvSource::local(csv.path()), &options())
        .await
        .unwrap();

    assert_eq!(report.added, 0);
    assert_eq!(report.updated, 0);
    assert_eq!(report.failed, 2);
}

#[tokio::test]
async fn test_short_add_response_is_an_error() {
    let server = setup_mock_server().await;
    mock_prepare(&server, "Basic", &["Front", "Back"], 1).await;
    mock_action(&server, "canAddNotes", mock_anki_response(vec![true, true])).await;
    mock_action(&server, "addNotes", mock_anki_response(vec![Some(1_i64)])).await;

    let csv = csv_file("Front,Back\na,1\nb,2\n");
    let engine = engine_for_mock(&server);
    let err = engine
        .import_csv(&CsvSource::local(csv.path()), &options())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnexpectedResponse(msg) if msg.contains("addNotes")));
}

#[tokio::test]
async fn test_short_lookup_response_is_an_error() {
    let server = setup_mock_server().await;
    mock_prepare(&server, "Basic", &["Front", "Back"], 1).await;
    mock_action(&server, "canAddNotes", mock_anki_response(vec![false, false])).await;
    mock_multi(&server, "findNotes", mock_multi_response(vec![(json!([1]), None)]), 1).await;

    let csv = csv_file("Front,Back\na,1\nb,2\n");
    let engine = engine_for_mock(&server);
    let err = engine
        .import_csv(&CsvSource::local(csv.path()), &options())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnexpectedResponse(msg) if msg.contains("findNotes")));
}

#[tokio::test]
async fn test_all_new_notes_send_no_batches() {
    let server = setup_mock_server().await;
    mock_prepare(&server, "Basic", &["Front", "Back"], 1).await;
    mock_action(&server, "canAddNotes", mock_anki_response(vec![true])).await;
    mock_action(&server, "addNotes", mock_anki_response(vec![Some(1_i64)])).await;
    // Any `multi` request would hit no mock and fail the import.

    let csv = csv_file("Front,Back\na,1\n");
    let engine = engine_for_mock(&server);
    let report = engine
        .import_csv(&CsvSource::local(csv.path()), &options())
        .await
        .unwrap();

    assert_eq!(report.added, 1);
}

#[tokio::test]
async fn test_unknown_field_is_fatal() {
    let server = setup_mock_server().await;
    mock_prepare(&server, "Basic", &["Front", "Back"], 1).await;

    let csv = csv_file("Front,Extra\na,1\n");
    let engine = engine_for_mock(&server);
    let err = engine
        .import_csv(&CsvSource::local(csv.path()), &options())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UnknownField { field, .. } if field == "Extra"));
}

#[tokio::test]
async fn test_missing_model_is_fatal() {
    let server = setup_mock_server().await;
    mock_action(&server, "version", mock_anki_response(6)).await;
    mock_action(&server, "modelNames", mock_anki_response(vec!["Basic"])).await;

    let table = anki_csv_engine::CsvTable::from_reader(
        "Front,Back\na,1\n".as_bytes(),
        Default::default(),
    )
    .unwrap();
    let mapper = NoteMapper::new("Spanish", "Vocab", table.header(), false).unwrap();

    let engine = engine_for_mock(&server);
    let err = engine.sync().prepare(&mapper).await.unwrap_err();

    assert!(matches!(err, Error::ModelNotFound(name) if name == "Vocab"));
}

#[tokio::test]
async fn test_connection_refused() {
    let engine = Engine::from_client(
        anki_csv_engine::AnkiClient::builder()
            .url("http://127.0.0.1:9")
            .build(),
    );

    let csv = csv_file("Front,Back\na,1\n");
    let err = engine
        .import_csv(&CsvSource::local(csv.path()), &options())
        .await
        .unwrap_err();

    assert!(err.is_connection_refused());
}

#[tokio::test]
async fn test_remote_csv_is_downloaded() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Front,Back\na,1\n"))
        .expect(1)
        .mount(&server)
        .await;

    let source = CsvSource::remote(&format!("{}/cards.csv", server.uri())).unwrap();
    let fetched = source.fetch().await.unwrap();
    let path = fetched.path().to_path_buf();

    assert!(fetched.is_temporary());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "Front,Back\na,1\n");

    fetched.close().unwrap();
    assert!(!path.exists());
}

#[tokio::test]
async fn test_downloaded_csv_removed_when_import_fails() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .and(path("/cards.csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Front,Back\na,1\n"))
        .expect(1)
        .mount(&server)
        .await;
    mock_action(
        &server,
        "version",
        ResponseTemplate::new(200).set_body_json(json!({
            "result": null,
            "error": "collection is not available"
        })),
    )
    .await;

    let downloads = tempdir().unwrap();
    let source = CsvSource::remote(&format!("{}/cards.csv", server.uri())).unwrap();
    let engine = engine_for_mock(&server);
    let result = engine
        .import_csv(&source, &options().temp_dir(downloads.path()))
        .await;

    assert!(result.is_err());
    let leftovers: Vec<_> = std::fs::read_dir(downloads.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert!(leftovers.is_empty(), "left behind: {:?}", leftovers);
}

#[tokio::test]
async fn test_remote_csv_http_error() {
    let server = setup_mock_server().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let source = CsvSource::remote(&format!("{}/missing.csv", server.uri())).unwrap();
    assert!(matches!(source.fetch().await, Err(Error::Download(_))));
}

#[test]
fn test_lookup_query_format() {
    assert_eq!(
        lookup_query("Lang::Spanish", "Front", "el *gato*"),
        "deck:\"Lang::Spanish\" \"Front:el \\*gato\\*\""
    );
}
