//! Integration tests for the filesystem backend

use contractnav_core::{ContractRole, StoreError};
use contractnav_store::{ContractBackend, LocalBackend};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::fs;
use tempfile::TempDir;

fn write(dir: &std::path::Path, name: &str, contents: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(name), contents).unwrap();
}

#[tokio::test]
async fn lists_only_json_files_sorted() {
    let root = TempDir::new().unwrap();
    let provider = root.path().join("provider");
    for name in ["zebra.json", "apple.json", "middle.json", "readme.txt"] {
        write(&provider, name, "{}");
    }
    fs::create_dir_all(provider.join("nested.json")).unwrap();

    let backend = LocalBackend::new(root.path());
    let names = backend.list(ContractRole::Provider).await.unwrap();

    assert_eq!(names, vec!["apple.json", "middle.json", "zebra.json"]);
}

#[tokio::test]
async fn listing_falls_back_to_flat_layout() {
    let root = TempDir::new().unwrap();
    write(root.path(), "legacy.json", "{}");
    write(root.path(), "notes.md", "");

    let backend = LocalBackend::new(root.path());

    assert_eq!(backend.list(ContractRole::Provider).await.unwrap(), vec!["legacy.json"]);
    assert_eq!(backend.list(ContractRole::Consumer).await.unwrap(), vec!["legacy.json"]);
}

#[tokio::test]
async fn role_directory_wins_over_flat_layout() {
    let root = TempDir::new().unwrap();
    write(root.path(), "legacy.json", "{}");
    write(&root.path().join("provider"), "current.json", "{}");

    let backend = LocalBackend::new(root.path());
    assert_eq!(backend.list(ContractRole::Provider).await.unwrap(), vec!["current.json"]);
}

#[tokio::test]
async fn missing_root_lists_nothing() {
    let root = TempDir::new().unwrap();
    let backend = LocalBackend::new(root.path().join("does-not-exist"));

    assert!(backend.list(ContractRole::Provider).await.unwrap().is_empty());
    assert!(backend.list(ContractRole::Consumer).await.unwrap().is_empty());
}

#[tokio::test]
async fn loads_from_role_directory() {
    let root = TempDir::new().unwrap();
    write(
        &root.path().join("consumer"),
        "mobile.json",
        r#"{"openapi":"3.0.0","info":{"title":"Mobile Consumer"}}"#,
    );

    let backend = LocalBackend::new(root.path());
    let spec = backend.load(ContractRole::Consumer, "mobile.json").await.unwrap();

    assert_eq!(spec["info"]["title"], json!("Mobile Consumer"));
}

#[tokio::test]
async fn load_falls_back_to_root_file() {
    let root = TempDir::new().unwrap();
    write(root.path(), "legacy.json", r#"{"openapi":"3.0.0"}"#);

    let backend = LocalBackend::new(root.path());
    let spec = backend.load(ContractRole::Provider, "legacy.json").await.unwrap();

    assert_eq!(spec["openapi"], json!("3.0.0"));
}

#[tokio::test]
async fn load_keeps_raw_key_order() {
    let root = TempDir::new().unwrap();
    write(&root.path().join("provider"), "raw.json", r#"{"paths":{},"info":{},"openapi":"3.0.0"}"#);

    let backend = LocalBackend::new(root.path());
    let spec = backend.load(ContractRole::Provider, "raw.json").await.unwrap();

    let keys: Vec<&String> = spec.as_object().unwrap().keys().collect();
    assert_eq!(keys, ["paths", "info", "openapi"]);
}

#[tokio::test]
async fn non_json_name_is_rejected_before_io() {
    // The root does not exist, so any filesystem access would surface as NotFound
    let backend = LocalBackend::new("/definitely/not/a/real/contracts/root");

    let result = backend.load(ContractRole::Provider, "api.yaml").await;
    assert!(matches!(result, Err(StoreError::InvalidName(_))));

    let result = backend.load(ContractRole::Provider, "../escape.json").await;
    assert!(matches!(result, Err(StoreError::InvalidName(_))));
}

#[tokio::test]
async fn missing_contract_is_not_found() {
    let root = TempDir::new().unwrap();
    let backend = LocalBackend::new(root.path());

    let result = backend.load(ContractRole::Provider, "nonexistent.json").await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn invalid_json_is_a_parse_error() {
    let root = TempDir::new().unwrap();
    write(&root.path().join("provider"), "broken.json", "{\"openapi\": ");

    let backend = LocalBackend::new(root.path());
    let result = backend.load(ContractRole::Provider, "broken.json").await;

    assert!(matches!(result, Err(StoreError::Parse { .. })));
}
