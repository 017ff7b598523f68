//! Service lookup by name and namespace
//!
//! The same channel name usually exists once per delivery network (DVB-C,
//! DVB-S, ...). The lookup is built from a `getallservices` result and
//! resolves a (service name, namespace) pair to its service reference.
//!
//! [`ServiceFilter`] selects services for the service list.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::sref::{
    ServiceReference, ServiceReferenceError, NS_DVB_C, SERVICE_TYPE_HDTV, SERVICE_TYPE_TV,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("no service {name:?} in namespace {ns:#010x}")]
    NotFound { name: String, ns: u32 },

    #[error(transparent)]
    ServiceReference(#[from] ServiceReferenceError),
}

/// Service entry as returned by `getservices`/`getallservices`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub servicename: String,
    pub servicereference: String,
}

/// Bouquet with its services (`getallservices`)
#[derive(Debug, Clone, Deserialize)]
pub struct Bouquet {
    #[serde(default)]
    pub servicename: String,
    #[serde(default)]
    pub servicereference: String,
    #[serde(default)]
    pub subservices: Vec<ServiceEntry>,
}

#[derive(Debug, Clone, Default)]
pub struct ServiceLookup {
    /// normalized reference -> (service name, namespace)
    by_reference: HashMap<String, (String, u32)>,
    /// (service name, namespace) -> reference
    by_name: HashMap<(String, u32), ServiceReference>,
}

impl ServiceLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bouquets(bouquets: &[Bouquet]) -> Result<Self, LookupError> {
        let mut lookup = Self::new();
        lookup.update(bouquets)?;
        Ok(lookup)
    }

    /// Add the services of `bouquets`; blank references (markers, files)
    /// are skipped.
    pub fn update(&mut self, bouquets: &[Bouquet]) -> Result<(), LookupError> {
        for sub in bouquets.iter().flat_map(|b| b.subservices.iter()) {
            let sref = ServiceReference::parse(&sub.servicereference)?;
            if sref.is_blank() {
                continue;
            }

            let key = (sub.servicename.clone(), sref.ns);
            self.by_reference.insert(sref.normalized(), key.clone());
            self.by_name.insert(key, sref);
        }
        Ok(())
    }

    pub fn get(&self, name: &str, ns: u32) -> Option<&ServiceReference> {
        self.by_name.get(&(name.to_string(), ns))
    }

    /// Canonical service reference of `name` in namespace `ns`
    pub fn lookup_service(&self, name: &str, ns: u32) -> Result<String, LookupError> {
        self.get(name, ns)
            .map(ServiceReference::to_string)
            .ok_or_else(|| LookupError::NotFound {
                name: name.to_string(),
                ns,
            })
    }

    /// Service name and namespace for a reference
    pub fn service_name(&self, reference: &str) -> Result<Option<&(String, u32)>, LookupError> {
        let normalized = ServiceReference::parse(reference)?.normalized();
        Ok(self.by_reference.get(&normalized))
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

// =============================================================================
// Service list filtering
// =============================================================================

/// Service selection by service type, namespace and original network ID.
/// An empty `oids` list accepts any network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceFilter {
    pub service_types: Vec<u32>,
    pub namespaces: Vec<u32>,
    pub oids: Vec<u16>,
}

impl Default for ServiceFilter {
    fn default() -> Self {
        Self {
            service_types: vec![SERVICE_TYPE_TV, SERVICE_TYPE_HDTV],
            namespaces: vec![NS_DVB_C],
            oids: Vec::new(),
        }
    }
}

/// A service that passed a [`ServiceFilter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedService {
    pub reference: ServiceReference,
    pub entry: ServiceEntry,
}

impl ServiceFilter {
    pub fn matches(&self, sref: &ServiceReference) -> bool {
        self.service_types.contains(&sref.service_type)
            && self.namespaces.contains(&sref.ns)
            && (self.oids.is_empty() || self.oids.contains(&sref.oid))
    }

    /// Matching services, one per reference string; entries with a
    /// malformed reference are skipped.
    pub fn select<I>(&self, entries: I) -> Vec<SelectedService>
    where
        I: IntoIterator<Item = ServiceEntry>,
    {
        let mut selected: HashMap<String, SelectedService> = HashMap::new();

        for entry in entries {
            let sref = match ServiceReference::parse(&entry.servicereference) {
                Ok(sref) => sref,
                Err(e) => {
                    debug!("ignored: {:?} ({})", entry.servicename, e);
                    continue;
                }
            };
            if !self.matches(&sref) {
                debug!("ignored: {:?} / {:?}", entry.servicename, entry.servicereference);
                continue;
            }
            selected.insert(
                entry.servicereference.clone(),
                SelectedService {
                    reference: sref,
                    entry,
                },
            );
        }

        selected.into_values().collect()
    }
}

/// Sort by service name, then reference
pub fn sort_by_name(services: &mut [SelectedService]) {
    services.sort_by(|a, b| {
        (&a.entry.servicename, &a.entry.servicereference)
            .cmp(&(&b.entry.servicename, &b.entry.servicereference))
    });
}

/// Sort by normalized service reference
pub fn sort_by_reference(services: &mut [SelectedService]) {
    services.sort_by_key(|s| s.reference.normalized());
}

/// Service list dump, keyed by canonical reference
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceDump {
    /// UTC, `%Y-%m-%d %H:%M:%S`
    pub created: String,
    pub services: BTreeMap<String, ServiceEntry>,
}

impl ServiceDump {
    pub fn new(services: &[SelectedService]) -> Self {
        Self {
            created: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            services: services
                .iter()
                .map(|s| (s.reference.to_string(), s.entry.clone()))
                .collect(),
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write service dump {}", path.display()))
    }
}
