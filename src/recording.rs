//! Recording file names
//!
//! A recording is stored as `<trunk>.ts` plus companion files such as
//! `<trunk>.ts.meta`, `<trunk>.ts.ap` or `<trunk>.eit`.

use std::path::Path;

use thiserror::Error;

const EXTENSIONS_LEVEL1: &[&str] = &["ts", "eit"];
const EXTENSIONS_LEVEL2: &[&str] = &["ap", "cuts", "meta", "sc"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrunkError {
    #[error("{0:?} is not a file name")]
    NoFileName(String),

    #[error("{0:?} has no extension")]
    NoExtension(String),

    #[error("{path:?} has bad extension {extension:?}")]
    BadExtension { path: String, extension: String },

    #[error("{0:?} has too many extensions")]
    TooManyExtensions(String),
}

/// Trunk of an enigma2 recording file, e.g. `somefile` for `/hdd/somefile.ts.sc`
pub fn trunk_name(path: &str) -> Result<&str, TrunkError> {
    let name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| TrunkError::NoFileName(path.to_string()))?;

    let bad_extension = |extension: &str| TrunkError::BadExtension {
        path: path.to_string(),
        extension: extension.to_string(),
    };

    let parts: Vec<&str> = name.split('.').collect();
    match parts.as_slice() {
        [_] => Err(TrunkError::NoExtension(path.to_string())),
        [trunk, ext] => {
            if !EXTENSIONS_LEVEL1.contains(ext) {
                return Err(bad_extension(*ext));
            }
            Ok(*trunk)
        }
        [trunk, ext1, ext2] => {
            if !EXTENSIONS_LEVEL1.contains(ext1) {
                return Err(bad_extension(*ext1));
            }
            if !EXTENSIONS_LEVEL2.contains(ext2) {
                return Err(bad_extension(*ext2));
            }
            Ok(*trunk)
        }
        _ => Err(TrunkError::TooManyExtensions(path.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trunk_name() {
        assert_eq!(trunk_name("somefile.ts"), Ok("somefile"));
        assert_eq!(trunk_name("/tmp/somefile.ts"), Ok("somefile"));
        assert_eq!(trunk_name("somefile.ts.sc"), Ok("somefile"));
        assert_eq!(trunk_name("somefile.eit"), Ok("somefile"));
    }

    #[test]
    fn test_trunk_name_errors() {
        assert_eq!(trunk_name(""), Err(TrunkError::NoFileName("".into())));
        assert_eq!(
            trunk_name("somefile"),
            Err(TrunkError::NoExtension("somefile".into()))
        );
        assert!(matches!(
            trunk_name("somefile.bla"),
            Err(TrunkError::BadExtension { extension, .. }) if extension == "bla"
        ));
        assert!(matches!(
            trunk_name("somefile.bla.bla"),
            Err(TrunkError::BadExtension { extension, .. }) if extension == "bla"
        ));
        assert!(matches!(
            trunk_name("somefile.ts.meta.x"),
            Err(TrunkError::TooManyExtensions(_))
        ));
    }
}
