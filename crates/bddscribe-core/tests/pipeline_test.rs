//! End-to-end pipeline tests over fixture records.
//!
//! The extraction boundary is replaced with a fixture extractor so nothing
//! here touches the network or a model; chunks are matched to canned
//! records by marker substrings the way real chunks carry their operation
//! summary.

use std::collections::HashMap;

use async_trait::async_trait;
use bddscribe_core::{pipeline, ChunkExtractor, Config, Error, NoopTracker, RawEndpointRecord};
use serde_json::json;
use tempfile::tempdir;

struct FixtureExtractor {
    records: HashMap<&'static str, RawEndpointRecord>,
}

impl FixtureExtractor {
    fn new(records: Vec<(&'static str, RawEndpointRecord)>) -> Self {
        Self {
            records: records.into_iter().collect(),
        }
    }
}

#[async_trait]
impl ChunkExtractor for FixtureExtractor {
    async fn extract(&self, chunk_html: &str) -> RawEndpointRecord {
        self.records
            .iter()
            .find(|(marker, _)| chunk_html.contains(*marker))
            .map(|(_, record)| record.clone())
            .unwrap_or_else(RawEndpointRecord::empty)
    }
}

fn get_books_record() -> RawEndpointRecord {
    RawEndpointRecord::from_llm_json(&json!({
        "path": "/BookStore/v1/Books",
        "method": "GET",
        "parameters": [
            {"name": "ISBN", "in": "query", "required": true, "type": "string"}
        ],
        "responses": {
            "200": {"description": "OK"},
            "404": {"description": "not found"}
        }
    }))
}

fn post_books_record() -> RawEndpointRecord {
    RawEndpointRecord::from_llm_json(&json!({
        "path": "/BookStore/v1/Books",
        "method": "POST",
        "requestBody": {
            "required": true,
            "content": {"application/json": {"schema": {"properties": {
                "title": {"type": "string"},
                "price": {"type": "number"}
            }}}}
        },
        "responses": {"200": {"description": "created"}}
    }))
}

fn post_user_record() -> RawEndpointRecord {
    RawEndpointRecord::from_llm_json(&json!({
        "path": "/Account/v1/User",
        "method": "POST",
        "responses": {"200": {"description": "created"}, "401": {"description": "denied"}}
    }))
}

fn config_for(output_dir: &std::path::Path) -> Config {
    Config::new(
        "https://demoqa.com/swagger/",
        "fixture-model",
        output_dir.to_string_lossy(),
    )
}

#[tokio::test]
async fn test_pipeline_generates_features_steps_and_crud() {
    let dir = tempdir().unwrap();
    let config = config_for(dir.path());
    let extractor = FixtureExtractor::new(vec![
        ("GET /BookStore/v1/Books", get_books_record()),
        ("POST /BookStore/v1/Books", post_books_record()),
        ("POST /Account/v1/User", post_user_record()),
    ]);

    let chunks = vec![
        "<div class=\"opblock\">GET /BookStore/v1/Books</div>".to_string(),
        "<div class=\"opblock\">POST /BookStore/v1/Books</div>".to_string(),
        "<div class=\"opblock\">POST /Account/v1/User</div>".to_string(),
        "<div class=\"opblock\">an unrecognizable fragment</div>".to_string(),
    ];

    let summary = pipeline::run_from_chunks(&config, chunks, &extractor, &NoopTracker)
        .await
        .expect("pipeline should succeed");

    assert_eq!(summary.chunk_count, 4);
    assert_eq!(summary.endpoints, 3);
    assert_eq!(summary.skipped_records, 1);
    assert_eq!(summary.conflicts, 0);
    assert_eq!(summary.step_files.len(), 3);
    // Three endpoint features plus one CRUD feature per group
    assert_eq!(summary.feature_files.len(), 5);

    let features_dir = dir.path().join("features");
    assert!(features_dir.join("GET_BookStore_v1_Books.feature").exists());
    assert!(features_dir.join("POST_Account_v1_User.feature").exists());
    assert!(features_dir
        .join("crud")
        .join("test_bookstore_crud_e2e.feature")
        .exists());
    assert!(dir
        .path()
        .join("steps")
        .join("get_book_store_v1_books_steps.rs")
        .exists());

    let feature = std::fs::read_to_string(features_dir.join("GET_BookStore_v1_Books.feature"))
        .unwrap();
    assert!(feature.contains("Feature: GET /BookStore/v1/Books API Endpoint"));
    assert!(feature.contains("Scenario: Missing required parameters"));
    assert!(feature.contains("Scenario: Resource not found"));

    // BookStore sees Account's POST endpoint as an integration partner
    let crud = std::fs::read_to_string(
        features_dir.join("crud").join("test_bookstore_crud_e2e.feature"),
    )
    .unwrap();
    assert!(crud.contains("Scenario: Create BookStore resource"));
    assert!(crud.contains("Scenario: Read BookStore resource"));
    assert!(!crud.contains("Scenario: Delete BookStore resource"));
    assert!(crud.contains("BookStore integration with other resources"));
}

#[tokio::test]
async fn test_pipeline_merges_duplicates_and_reports_conflicts() {
    let dir = tempdir().unwrap();
    let config = config_for(dir.path());

    let mut flipped = get_books_record();
    flipped.method = "get".to_string();
    flipped.parameters[0].required = false;

    let extractor = FixtureExtractor::new(vec![
        ("first extraction", get_books_record()),
        ("second extraction", flipped),
    ]);
    let chunks = vec![
        "chunk with first extraction".to_string(),
        "chunk with second extraction".to_string(),
    ];

    let summary = pipeline::run_from_chunks(&config, chunks, &extractor, &NoopTracker)
        .await
        .expect("pipeline should succeed");

    assert_eq!(summary.endpoints, 1);
    assert_eq!(summary.conflicts, 1);
}

#[tokio::test]
async fn test_pipeline_fails_when_nothing_usable() {
    let dir = tempdir().unwrap();
    let config = config_for(dir.path());
    let extractor = FixtureExtractor::new(vec![]);
    let chunks = vec!["noise".to_string(), "more noise".to_string()];

    let err = pipeline::run_from_chunks(&config, chunks, &extractor, &NoopTracker)
        .await
        .expect_err("pipeline must fail with no endpoints");
    assert!(matches!(err, Error::NoEndpoints(2)));

    // Nothing should have been written
    assert!(!dir.path().join("features").exists());
}
