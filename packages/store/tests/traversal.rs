use serde_json::json;

use vdoc_core::DocumentEntry;
use vdoc_drivers::MemoryDriver;
use vdoc_store::{
    DocumentStore, FindEvent, Result, SortKey, SortOrder, TraversalOptions, FULL_INDEX_FILE,
    INDEX_FILE,
};

fn library() -> DocumentStore {
    DocumentStore::new(
        MemoryDriver::from_json(json!({
            "/lib/readme.txt": "hello",
            "/lib/books/dune.json": {"year": 1965},
            "/lib/books/emma.json": {"year": 1815},
            "/lib/books/scifi/solaris.json": {"year": 1961},
            "/lib/maps/world.json": {},
        }))
        .unwrap(),
    )
}

fn names(entries: &[DocumentEntry]) -> Vec<&str> {
    entries.iter().map(|e| e.name.as_str()).collect()
}

#[test]
fn test_read_dir_walks_depth_first() {
    let mut store = library();
    let entries: Vec<DocumentEntry> = store
        .read_dir("/lib", TraversalOptions::default())
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(
        names(&entries),
        vec![
            "books",
            "maps",
            "readme.txt",
            "scifi",
            "dune.json",
            "emma.json",
            "solaris.json",
            "world.json",
        ]
    );
}

#[test]
fn test_read_dir_can_stop_early() {
    let mut store = library();
    let first: Vec<DocumentEntry> = store
        .read_dir("/lib", TraversalOptions::default())
        .take(2)
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(names(&first), vec!["books", "maps"]);

    // The partial walk left the store usable.
    let dune = store.get("/lib/books/dune.json").unwrap();
    assert!(dune.is_some());
}

#[test]
fn test_find_stream_reports_files_with_progress() {
    let mut store = library();
    let events: Vec<FindEvent> = store
        .find_stream("/lib", TraversalOptions::default())
        .collect::<Result<_>>()
        .unwrap();

    let files: Vec<&str> = events.iter().map(|e| e.entry.name.as_str()).collect();
    assert_eq!(
        files,
        vec!["readme.txt", "dune.json", "emma.json", "solaris.json", "world.json"]
    );
    for pair in events.windows(2) {
        assert!(pair[0].progress <= pair[1].progress);
    }
    assert!(events.iter().all(|e| (0.0..=1.0).contains(&e.progress)));
    assert_eq!(events.last().map(|e| e.progress), Some(1.0));
}

#[test]
fn test_find_stream_in_one_directory() {
    let driver = MemoryDriver::from_json(json!({
        "/notes/1.txt": "a", "/notes/2.txt": "b", "/notes/3.txt": "c",
    }))
    .unwrap();
    let mut store = DocumentStore::new(driver);
    let progress: Vec<f64> = store
        .find_stream("/notes", TraversalOptions::default())
        .map(|event| event.unwrap().progress)
        .collect();
    assert_eq!(progress.len(), 3);
    assert!(progress[..2].iter().all(|p| *p < 1.0));
    assert_eq!(progress[2], 1.0);
}

#[test]
fn test_find_stream_sorted_by_size() {
    let mut store = library();
    let options = TraversalOptions::default()
        .with_filter(|p| p.ends_with('/') || p.ends_with(".json"))
        .with_sort(SortKey::Size, SortOrder::Asc);
    let mut stream = store.find_stream("/lib", options);
    let count = stream.by_ref().filter(|event| event.is_ok()).count();
    assert_eq!(count, 4);
    assert_eq!(
        names(stream.files()),
        vec!["world.json", "dune.json", "emma.json", "solaris.json"]
    );
}

#[test]
fn test_index_follows_writes() {
    let mut store = library();
    let flat = store.build_index("/lib", false).unwrap();
    let keys: Vec<&str> = flat.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["books/", "maps/", "readme.txt"]);
    store.build_index("/lib", true).unwrap();

    store.set("/lib/new.txt", "fresh").unwrap();
    store.set("/lib/atlas/europe.json", json_value()).unwrap();
    assert!(store.delete("/lib/readme.txt").unwrap());
    store
        .rename("/lib/books/scifi", "/lib/books/fiction")
        .unwrap();

    let flat = store.index("/lib", false).unwrap();
    assert!(flat.get("new.txt").is_some_and(|s| s.is_file()));
    assert!(flat.get("atlas/").is_some_and(|s| s.is_dir()));
    assert!(flat.get("readme.txt").is_none());
    assert!(flat.get("atlas/europe.json").is_none());

    let full = store.index("/lib", true).unwrap();
    assert!(full.get("atlas/europe.json").is_some());
    assert!(full.get("books/scifi/solaris.json").is_none());
    assert!(full.get("books/fiction/").is_some_and(|s| s.is_dir()));
    assert!(full.get("books/fiction/solaris.json").is_some());
}

fn json_value() -> vdoc_core::Value {
    vdoc_serde::json_to_value(json!({"countries": 44}))
}

#[test]
fn test_index_round_trips_through_the_store() {
    let mut store = library();
    let saved = store.save_index("/lib/books", true).unwrap();
    assert!(store.exists(&format!("/lib/books/{}", FULL_INDEX_FILE)).unwrap());
    assert!(!store.exists(&format!("/lib/books/{}", INDEX_FILE)).unwrap());

    // A saved index never lists itself.
    store.save_index("/lib/books", false).unwrap();
    let rebuilt = store.build_index("/lib/books", true).unwrap();
    let saved_keys: Vec<&String> = saved.iter().map(|(k, _)| k).collect();
    let rebuilt_keys: Vec<&String> = rebuilt.iter().map(|(k, _)| k).collect();
    assert_eq!(saved_keys, rebuilt_keys);

    store.clear_cache();
    let loaded = store.load_index("/lib/books").unwrap().unwrap();
    assert!(loaded.recursive);
    let loaded_keys: Vec<&String> = loaded.iter().map(|(k, _)| k).collect();
    assert_eq!(loaded_keys, saved_keys);
    assert_eq!(
        loaded.get("dune.json").map(|s| s.size),
        saved.get("dune.json").map(|s| s.size)
    );
    assert!(store.load_index("/lib/maps").unwrap().is_none());
}
