use serde::Deserialize;
use serde_json::json;

use vdoc_drivers::MemoryDriver;
use vdoc_serde::value_to_json;
use vdoc_store::{DocumentStore, FetchOptions, StoreConfig, StoreError};

fn store(docs: serde_json::Value) -> DocumentStore {
    DocumentStore::new(MemoryDriver::from_json(docs).unwrap())
}

fn fetch(store: &mut DocumentStore, uri: &str) -> Option<serde_json::Value> {
    store
        .fetch_default(uri)
        .unwrap()
        .map(|value| value_to_json(&value))
}

#[test]
fn test_globals_reference_and_own_keys() {
    let mut store = store(json!({
        "_/index.json": {"global": "value"},
        "data.json": {"$ref": "_/index.json", "key": "val"},
    }));
    assert_eq!(
        fetch(&mut store, "data.json"),
        Some(json!({"global": "value", "key": "val"}))
    );
}

#[test]
fn test_mutual_references_terminate() {
    let mut store = store(json!({
        "/a.json": {"id": "a", "next": {"$ref": "b.json"}},
        "/b.json": {"id": "b", "next": {"$ref": "a.json"}},
    }));
    assert_eq!(
        fetch(&mut store, "/a"),
        Some(json!({"id": "a", "next": {"id": "b", "next": {"$ref": "a.json"}}}))
    );
}

#[test]
fn test_inheritance_globals_and_references_combined() {
    let mut store = store(json!({
        "/index.json": {"site": {"title": "Docs", "lang": "en"}},
        "/_/authors.json": {"ann": {"name": "Ann"}},
        "/guide/index.json": {"site": {"lang": "fr"}, "layout": "guide"},
        "/guide/_/index.json": {"footer": "guide footer"},
        "/guide/intro.json": {
            "title": "Intro",
            "author": {"$ref": "../_/authors.json#ann"},
        },
    }));
    assert_eq!(
        fetch(&mut store, "/guide/intro"),
        Some(json!({
            "site": {"title": "Docs", "lang": "fr"},
            "layout": "guide",
            "authors": {"ann": {"name": "Ann"}},
            "footer": "guide footer",
            "title": "Intro",
            "author": {"name": "Ann"},
        }))
    );
}

#[test]
fn test_directory_fetch_uses_index_document() {
    let mut store = store(json!({
        "/index.json": {"theme": "light"},
        "/blog/index.json": {"posts": 2},
    }));
    assert_eq!(
        fetch(&mut store, "/blog"),
        Some(json!({"theme": "light", "posts": 2}))
    );
    // The root index has nothing above it.
    assert_eq!(fetch(&mut store, "/"), Some(json!({"theme": "light"})));
}

#[test]
fn test_missing_documents_are_not_errors() {
    let mut store = store(json!({}));
    assert_eq!(fetch(&mut store, "/nope"), None);
    assert_eq!(store.get("/nope.json").unwrap(), None);
    assert!(!store.exists("/nope.json").unwrap());

    let opts = FetchOptions::default().with_default(7);
    let value = store.fetch("/nope", &opts).unwrap().unwrap();
    assert_eq!(value_to_json(&value), json!(7));
}

#[test]
fn test_raw_fetch_skips_assembly() {
    let mut store = store(json!({
        "/index.json": {"inherited": true},
        "/_/index.json": {"global": true},
        "/doc.json": {"own": "$ref:index.json#inherited"},
    }));
    let raw = store.fetch("/doc", &FetchOptions::raw()).unwrap().unwrap();
    assert_eq!(
        value_to_json(&raw),
        json!({"own": "$ref:index.json#inherited"})
    );
}

#[test]
fn test_writes_refresh_assembled_values() {
    let mut store = store(json!({
        "/index.json": {"mode": "old"},
        "/doc.json": {"name": "doc"},
    }));
    assert_eq!(
        fetch(&mut store, "/doc"),
        Some(json!({"mode": "old", "name": "doc"}))
    );

    let mut settings = vdoc_core::Value::map();
    settings.insert("mode", "new");
    store.set("/index.json", settings).unwrap();
    assert_eq!(
        fetch(&mut store, "/doc"),
        Some(json!({"mode": "new", "name": "doc"}))
    );
}

#[test]
fn test_denied_reads_are_errors() {
    let mut driver = MemoryDriver::from_json(json!({
        "/public/a.json": {"a": 1},
        "/secret/b.json": {"b": 2},
    }))
    .unwrap();
    driver.deny("/secret");
    let mut store = DocumentStore::new(driver);

    assert_eq!(fetch(&mut store, "/public/a"), Some(json!({"a": 1})));
    let err = store.fetch_default("/secret/b.json").unwrap_err();
    assert!(err.is_access_denied());
    assert!(matches!(
        store.list_dir("/secret"),
        Err(StoreError::AccessDenied { .. })
    ));
}

#[test]
fn test_custom_configuration() {
    let config = StoreConfig::from_json(
        r#"{"indexName": "_settings", "globalsDir": "shared", "referenceKey": "@include"}"#,
    )
    .unwrap();
    let driver = MemoryDriver::from_json(json!({
        "/_settings.json": {"inherited": 1},
        "/shared/_settings.json": {"global": 2},
        "/part.json": {"p": 3},
        "/doc.json": {"x": {"@include": "part.json"}},
    }))
    .unwrap();
    let mut store = DocumentStore::with_config(driver, config);
    assert_eq!(
        fetch(&mut store, "/doc"),
        Some(json!({"inherited": 1, "global": 2, "x": {"inherited": 1, "global": 2, "p": 3}}))
    );
}

#[derive(Debug, Deserialize, PartialEq)]
struct Server {
    host: String,
    port: u16,
    #[serde(default)]
    tls: bool,
}

#[test]
fn test_fetch_into_struct() {
    let mut store = store(json!({
        "/defaults.json": {"port": 80, "tls": true},
        "/servers/web.json": {"$ref": "../defaults.json", "host": "example.org"},
    }));
    let server: Server = store
        .fetch_as("/servers/web", &FetchOptions::default())
        .unwrap()
        .unwrap();
    assert_eq!(
        server,
        Server {
            host: "example.org".to_string(),
            port: 80,
            tls: true,
        }
    );
}
