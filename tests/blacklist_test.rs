//! Denylist tests
//!
//! Loading, merging and persisting pseudo ID keyed files.

use eha::blacklist::Blacklist;
use eha::event::Event;
use serde_json::{json, Map, Value};
use tempfile::TempDir;

const TIMER_PSEUDO_ID: &str = "9c357fbab2a36d905a9c2658eac6c11df1d23a85";
const MOVIE_PSEUDO_ID: &str = "b1396152c351cf8e840d49d0bbb1cee6ae2c5eca";

fn record(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("test record must be an object"),
    }
}

fn radio_timer() -> Map<String, Value> {
    record(json!({
        "begin": 1504810500,
        "end": 1504818300,
        "eit": 6784,
        "name": "DASDING Sprechstunde",
        "description": "",
        "descriptionextended": "N/A",
        "servicename": "DASDING",
        "serviceref": "1:0:2:6F37:431:A401:FFFF0000:0:0:0:"
    }))
}

fn movie() -> Map<String, Value> {
    record(json!({
        "eventname": "SPUTNIK Black Beatz - Wiederholung",
        "recordingtime": 1505685300,
        "length": "129:47",
        "servicename": "SPUTNIK",
        "serviceref": "1:0:0:0:0:0:0:0:0:0:/media/hdd/movie/black_beatz.ts",
        "description": "",
        "descriptionExtended": "Feinster R'n'B, tighter Hip-Hop und die heissesten Tracks."
    }))
}

fn movie_without_description() -> Map<String, Value> {
    record(json!({
        "eventname": "Aufnahme",
        "recordingtime": 1504104600,
        "servicename": "Das Erste HD",
        "serviceref": "1:0:0:0:0:0:0:0:0:0:/media/hdd/movie/aufnahme.ts",
        "description": "",
        "descriptionExtended": ""
    }))
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_missing_file_is_empty() {
    let dir = TempDir::new().unwrap();
    let blacklist = Blacklist::open(dir.path().join("blacklist.json")).unwrap();

    assert!(blacklist.is_empty());
    assert_eq!(blacklist.path(), Some(dir.path().join("blacklist.json").as_path()));
}

#[test]
fn test_load_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("blacklist.json");
    std::fs::write(&path, format!(r#"{{"{}": {{"name": "x"}}}}"#, TIMER_PSEUDO_ID)).unwrap();

    let blacklist = Blacklist::open(&path).unwrap();

    assert_eq!(blacklist.len(), 1);
    assert!(blacklist.contains(TIMER_PSEUDO_ID));
    assert!(!blacklist.contains(MOVIE_PSEUDO_ID));
}

#[test]
fn test_invalid_json_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("blacklist.json");
    std::fs::write(&path, "[1, 2, 3").unwrap();

    assert!(Blacklist::open(&path).is_err());
}

#[test]
fn test_update_merges_files() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("first.json");
    let second = dir.path().join("second.json");
    std::fs::write(&first, r#"{"aaa": {}}"#).unwrap();
    std::fs::write(&second, r#"{"bbb": {}}"#).unwrap();

    let mut blacklist = Blacklist::open(&first).unwrap();
    blacklist.update(Some(second.as_path())).unwrap();

    assert_eq!(blacklist.len(), 2);
    assert!(blacklist.contains("aaa"));
    assert!(blacklist.contains("bbb"));
}

#[test]
fn test_update_without_path_fails() {
    let mut blacklist = Blacklist::new();
    assert!(blacklist.update(None).is_err());
}

// =============================================================================
// Persisting
// =============================================================================

#[test]
fn test_persist_writes_pseudo_ids() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("blacklist.json");
    let blacklist = Blacklist::open(&path).unwrap();

    let written = blacklist
        .persist(vec![radio_timer(), movie(), movie_without_description()], None)
        .unwrap();
    assert_eq!(written, 2);

    let reloaded = Blacklist::open(&path).unwrap();
    assert_eq!(reloaded.len(), 2);
    assert!(reloaded.contains(TIMER_PSEUDO_ID));
    assert!(reloaded.contains(MOVIE_PSEUDO_ID));
    assert_eq!(
        reloaded.entries()[MOVIE_PSEUDO_ID]["eventname"],
        "SPUTNIK Black Beatz - Wiederholung"
    );
}

#[test]
fn test_persist_nothing_does_not_write() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("blacklist.json");
    let blacklist = Blacklist::open(&path)
        .unwrap()
        .with_pseudo_id_none_warnings(false);

    let written = blacklist
        .persist(vec![movie_without_description()], None)
        .unwrap();

    assert_eq!(written, 0);
    assert!(!path.exists());
}

#[test]
fn test_persist_keeps_existing_entries() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("blacklist.json");
    std::fs::write(
        &path,
        format!(r#"{{"{}": {{"note": "kept"}}, "ccc": {{}}}}"#, MOVIE_PSEUDO_ID),
    )
    .unwrap();

    let blacklist = Blacklist::open(&path).unwrap();
    let written = blacklist.persist(vec![movie(), radio_timer()], None).unwrap();
    assert_eq!(written, 3);

    let reloaded = Blacklist::open(&path).unwrap();
    assert_eq!(reloaded.entries()[MOVIE_PSEUDO_ID]["note"], "kept");
    assert!(reloaded.contains("ccc"));
    assert!(reloaded.contains(TIMER_PSEUDO_ID));
}

#[test]
fn test_persist_to_other_file() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("other.json");

    let written = Blacklist::new().persist(vec![movie()], Some(target.as_path())).unwrap();

    assert_eq!(written, 1);
    assert!(target.exists());
}

// =============================================================================
// Membership
// =============================================================================

#[test]
fn test_is_blacklisted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("blacklist.json");
    let blacklist = Blacklist::open(&path).unwrap();
    blacklist.persist(vec![radio_timer()], None).unwrap();
    let blacklist = Blacklist::open(&path).unwrap();

    let listed = Event::from_record(radio_timer()).unwrap();
    let other = Event::from_record(movie()).unwrap();
    let no_id = Event::from_record(movie_without_description()).unwrap();

    assert!(blacklist.is_blacklisted(&listed));
    assert!(!blacklist.is_blacklisted(&other));
    assert!(!blacklist.is_blacklisted(&no_id));
}
