//! Title denylist
//!
//! A flat JSON object mapping pseudo IDs to the raw item they were taken
//! from. Items whose pseudo ID is listed are skipped, e.g. broadcasts that
//! were already recorded. The file is loaded and written as a whole.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::event::Event;

#[derive(Debug, Clone)]
pub struct Blacklist {
    entries: BTreeMap<String, Value>,
    path: Option<PathBuf>,
    pseudo_id_none_warnings: bool,
}

impl Default for Blacklist {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            path: None,
            pseudo_id_none_warnings: true,
        }
    }
}

impl Blacklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a denylist bound to `path` and load it
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let mut blacklist = Self {
            path: Some(path.into()),
            ..Self::default()
        };
        blacklist.update(None)?;
        Ok(blacklist)
    }

    /// Silence warnings about items without a pseudo ID
    pub fn with_pseudo_id_none_warnings(mut self, enabled: bool) -> Self {
        self.pseudo_id_none_warnings = enabled;
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn resolve<'a>(&'a self, filename: Option<&'a Path>) -> Result<&'a Path> {
        filename
            .or(self.path.as_deref())
            .ok_or_else(|| anyhow!("blacklist filename may not be empty"))
    }

    /// Merge the entries of `filename` (or the bound path) into this list.
    ///
    /// A file that cannot be read only produces a warning; a file that is
    /// not valid JSON is an error.
    pub fn update(&mut self, filename: Option<&Path>) -> Result<()> {
        let filename = self.resolve(filename)?.to_path_buf();
        debug!("Trying to load blacklist: {}", filename.display());

        match std::fs::read_to_string(&filename) {
            Ok(content) => {
                let data: BTreeMap<String, Value> = serde_json::from_str(&content)
                    .with_context(|| format!("Invalid blacklist data in {}", filename.display()))?;
                debug!(
                    "the blacklist {} contains {} entrie(s)",
                    filename.display(),
                    data.len()
                );
                self.entries.extend(data);
            }
            Err(e) => {
                warn!("Failed to load blacklist data {}: {}", filename.display(), e);
            }
        }

        debug!("the blacklist contains {} entrie(s)", self.entries.len());
        Ok(())
    }

    /// Write `items` together with the current entries to `filename` (or the
    /// bound path). Entries already listed take precedence over new items.
    ///
    /// Returns the number of entries written; nothing is written when none
    /// of the items has a pseudo ID.
    pub fn persist<I>(&self, items: I, filename: Option<&Path>) -> Result<usize>
    where
        I: IntoIterator<Item = Map<String, Value>>,
    {
        let filename = self.resolve(filename)?;
        let mut data: BTreeMap<String, Value> = BTreeMap::new();

        for item in items {
            let pseudo_id = Event::from_record(item.clone())
                .ok()
                .and_then(|event| event.pseudo_id().map(str::to_string));

            match pseudo_id {
                Some(id) => {
                    data.insert(id, Value::Object(item));
                }
                None => {
                    if self.pseudo_id_none_warnings {
                        warn!("Pseudo ID is None: {:?}", item);
                    }
                }
            }
        }

        if data.is_empty() {
            warn!("No data to persist ..");
            return Ok(0);
        }

        data.extend(self.entries.clone());

        debug!(
            "Persisting blacklist: {} ({} entries)",
            filename.display(),
            data.len()
        );

        let json = serde_json::to_string_pretty(&data)?;
        std::fs::write(filename, json)
            .with_context(|| format!("Failed to write blacklist {}", filename.display()))?;
        Ok(data.len())
    }

    pub fn contains(&self, pseudo_id: &str) -> bool {
        self.entries.contains_key(pseudo_id)
    }

    /// True if the event has a pseudo ID and it is listed
    pub fn is_blacklisted(&self, event: &Event) -> bool {
        event.pseudo_id().is_some_and(|id| self.contains(id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &BTreeMap<String, Value> {
        &self.entries
    }
}
