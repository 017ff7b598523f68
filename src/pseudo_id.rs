//! Pseudo unique identifiers
//!
//! The enigma2 API has no identifier that survives the trip from an EPG
//! listing to a timer to a recorded movie. Events are therefore fingerprinted
//! by their name and description. Hashes are persisted in denylist files, so
//! the key order and hashing rule below must not change.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use sha1::{Digest, Sha1};
use thiserror::Error;

/// Name/description key pairs, tried in order
pub const LISTING_ITEM_KEY_PAIRS: &[(&str, &str)] = &[
    ("eventname", "descriptionExtended"),
    ("title", "longdesc"),
    ("name", "descriptionextended"),
    ("eventname", "description"),
    ("title", "longinfo"),
];

/// Run length annotation, e.g. "sondern Magnums Leben in Gefahr... 47 Min."
const PATTERN_RUNLENGTH: &str = r"\s\d+\sMin\.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PseudoIdError {
    #[error("name or description missing")]
    Missing,

    #[error("name or description is not text")]
    NotText,

    #[error("name or description is empty")]
    Empty,

    #[error("description is empty once run length annotations are removed")]
    EmptyAfterStrip,
}

fn runlength_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PATTERN_RUNLENGTH).expect("valid run length pattern"))
}

/// Hash a name and a description.
///
/// Neither may be blank and the description must keep some text once run
/// length annotations (" 47 Min.") are stripped, since those differ between
/// reruns of the same broadcast.
pub fn from_pair(name: &str, desc: &str) -> Result<String, PseudoIdError> {
    if name.trim().is_empty() || desc.trim().is_empty() {
        return Err(PseudoIdError::Empty);
    }

    let desc_mangled = runlength_re().replace_all(desc, "");
    if desc_mangled.trim().is_empty() {
        return Err(PseudoIdError::EmptyAfterStrip);
    }

    let mut hasher = Sha1::new();
    hasher.update(name.as_bytes());
    hasher.update(desc_mangled.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Pseudo ID of a raw EPG, timer or movie record
pub fn from_record(item: &Map<String, Value>) -> Result<String, PseudoIdError> {
    let mut pair: Option<(&Value, &Value)> = None;

    for (name_key, desc_key) in LISTING_ITEM_KEY_PAIRS {
        if let (Some(name), Some(desc)) = (item.get(*name_key), item.get(*desc_key)) {
            pair = Some((name, desc));
            if desc.as_str().is_some_and(|d| !d.trim().is_empty()) {
                break;
            }
        }
    }

    let (name, desc) = pair.ok_or(PseudoIdError::Missing)?;
    if name.is_null() || desc.is_null() {
        return Err(PseudoIdError::Missing);
    }

    match (name.as_str(), desc.as_str()) {
        (Some(name), Some(desc)) => from_pair(name, desc),
        _ => Err(PseudoIdError::NotText),
    }
}

/// Radio programmes often carry no description; the service reference and
/// broadcast date of an EPG record stand in for it.
pub fn from_radio_record(item: &Map<String, Value>) -> Result<String, PseudoIdError> {
    let text = |key: &str| -> Result<&str, PseudoIdError> {
        match item.get(key) {
            None | Some(Value::Null) => Err(PseudoIdError::Missing),
            Some(value) => value.as_str().ok_or(PseudoIdError::NotText),
        }
    };

    let title = text("title")?;
    let desc = format!("{},{}", text("sref")?, text("date")?);
    from_pair(title, &desc)
}

/// Best effort pseudo ID: the standard rule first, then the radio fallback
pub fn from_record_any(item: &Map<String, Value>, is_radio: bool) -> Option<String> {
    match from_record(item) {
        Ok(id) => Some(id),
        Err(_) if is_radio => from_radio_record(item).ok(),
        Err(_) => None,
    }
}
