//! Enigma2 service references
//!
//! A service reference is the receiver's compound channel identifier, e.g.
//! `1:0:19:6E:D:85:FFFF0000:0:0:0:`. Fields 2..=6 carry the service type,
//! SID, TSID, original network id and namespace as hexadecimal numbers.
//!
//! See https://wiki.neutrino-hd.de/wiki/Enigma:Services:Formatbeschreibung

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Digital television service
pub const SERVICE_TYPE_TV: u32 = 0x01;
/// Digital radio sound service
pub const SERVICE_TYPE_RADIO: u32 = 0x02;
pub const SERVICE_TYPE_SD4: u32 = 0x10;
/// Advanced codec HD digital television
pub const SERVICE_TYPE_HDTV: u32 = 0x19;
pub const SERVICE_TYPE_UHD: u32 = 0x1f;
pub const SERVICE_TYPE_OPT: u32 = 0xd3;

/// Label/service type pairs
pub const SERVICE_TYPES: &[(&str, u32)] = &[
    ("TV", SERVICE_TYPE_TV),
    ("HDTV", SERVICE_TYPE_HDTV),
    ("RADIO", SERVICE_TYPE_RADIO),
    ("UHD", SERVICE_TYPE_UHD),
    ("SD4", SERVICE_TYPE_SD4),
    ("OPT", SERVICE_TYPE_OPT),
];

/// Namespace of DVB-C services
pub const NS_DVB_C: u32 = 0xffff_0000;
/// Namespace of DVB-S services (Astra 19.2E)
pub const NS_DVB_S: u32 = 192 << 16;
/// Namespace of DVB-S services (Hotbird 13.0E)
pub const NS_DVB_S_HOTBIRD: u32 = 130 << 16;
/// Namespace of DVB-T services
pub const NS_DVB_T: u32 = 0xeeee_0000;

pub const NS_DVB_C_LABEL: &str = "DVB-C";
pub const NS_DVB_S_LABEL: &str = "DVB-S";
pub const NS_DVB_T_LABEL: &str = "DVB-T";
pub const NS_FILE_LABEL: &str = "File";
pub const NS_UNKNOWN_LABEL: &str = "UNKNOWN";

/// Label/namespace pairs
pub const NAMESPACES: &[(&str, u32)] = &[
    (NS_DVB_C_LABEL, NS_DVB_C),
    (NS_DVB_S_LABEL, NS_DVB_S),
    (NS_DVB_T_LABEL, NS_DVB_T),
];

/// Namespace lookup keyed by the significant 16 bits of a namespace
const NS_LOOKUP: &[(u32, &str)] = &[
    (0, NS_FILE_LABEL),
    (NS_DVB_C >> 16, NS_DVB_C_LABEL),
    (NS_DVB_S >> 16, NS_DVB_S_LABEL),
    (NS_DVB_S_HOTBIRD >> 16, NS_DVB_S_LABEL),
    (NS_DVB_T >> 16, NS_DVB_T_LABEL),
];

// =============================================================================
// Errors
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceReferenceError {
    #[error("service reference {0:?} has too few fields")]
    TooFewFields(String),

    #[error("service reference {reference:?}: field {index} ({value:?}) is not a hex number")]
    InvalidField {
        reference: String,
        index: usize,
        value: String,
    },
}

// =============================================================================
// Service Reference
// =============================================================================

/// Parsed service reference
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceReference {
    pub service_type: u32,
    pub sid: u16,
    pub tsid: u16,
    pub oid: u16,
    pub ns: u32,
}

impl ServiceReference {
    /// Parse an enigma2 style service reference.
    ///
    /// Anything following the namespace field (trailing zeros, a service
    /// name or the path of a recording) is ignored.
    pub fn parse(reference: &str) -> Result<Self, ServiceReferenceError> {
        let parts: Vec<&str> = reference.split(':').collect();
        if parts.len() < 7 {
            return Err(ServiceReferenceError::TooFewFields(reference.to_string()));
        }

        let field = |index: usize| -> Result<u32, ServiceReferenceError> {
            u32::from_str_radix(parts[index], 16).map_err(|_| ServiceReferenceError::InvalidField {
                reference: reference.to_string(),
                index,
                value: parts[index].to_string(),
            })
        };
        let narrow = |index: usize| -> Result<u16, ServiceReferenceError> {
            u16::try_from(field(index)?).map_err(|_| ServiceReferenceError::InvalidField {
                reference: reference.to_string(),
                index,
                value: parts[index].to_string(),
            })
        };

        Ok(Self {
            service_type: field(2)?,
            sid: narrow(3)?,
            tsid: narrow(4)?,
            oid: narrow(5)?,
            ns: field(6)?,
        })
    }

    /// Sortable key `TTTT:SSSS:TTTT:OOOO:NNNNNNNN` (not a valid reference)
    pub fn normalized(&self) -> String {
        format!(
            "{:04X}:{:04X}:{:04X}:{:04X}:{:08X}",
            self.service_type, self.sid, self.tsid, self.oid, self.ns
        )
    }

    /// Picon (program icon) file name, e.g. `1_0_25_6E_D_85_FFFF0000_0_0_0.png`
    pub fn picon(&self, extension: &str) -> String {
        let trunk = format!(
            "{:x}_0_{}_{:x}_{:x}_{:x}_{:x}_0_0_0",
            1, self.service_type, self.sid, self.tsid, self.oid, self.ns
        );
        trunk.to_uppercase() + extension
    }

    pub fn is_radio(&self) -> bool {
        self.service_type == SERVICE_TYPE_RADIO
    }

    /// True for references with neither SID, TSID, ONID nor namespace
    /// (bouquet markers, file services)
    pub fn is_blank(&self) -> bool {
        self.sid == 0 && self.tsid == 0 && self.oid == 0 && self.ns == 0
    }

    pub fn namespace_label(&self) -> &'static str {
        guess_namespace_label(self.ns, NS_UNKNOWN_LABEL)
    }

    pub fn service_type_label(&self) -> Option<&'static str> {
        service_type_label(self.service_type)
    }
}

impl fmt::Display for ServiceReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "1:0:{:x}:{:x}:{:x}:{:x}:{:08x}:0:0:0:",
            self.service_type, self.sid, self.tsid, self.oid, self.ns
        )
    }
}

impl FromStr for ServiceReference {
    type Err = ServiceReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// =============================================================================
// Free functions
// =============================================================================

/// Re-render a reference in its canonical lowercase form
pub fn canonicalize(reference: &str) -> Result<String, ServiceReferenceError> {
    Ok(ServiceReference::parse(reference)?.to_string())
}

/// Sortable representation of a reference, see [`ServiceReference::normalized`]
pub fn normalize(reference: &str) -> Result<String, ServiceReferenceError> {
    Ok(ServiceReference::parse(reference)?.normalized())
}

/// Guess a label for a namespace value.
///
/// The high 16 bits are significant; when they are zero the low 16 bits are
/// used instead, so both `0x00c00000` and `0x00c0` map to DVB-S.
pub fn guess_namespace_label(value: u32, fallback: &'static str) -> &'static str {
    let low = value & 0xffff;
    let high = (value >> 16) & 0xffff;
    let key = if high == 0 { low } else { high };

    NS_LOOKUP
        .iter()
        .find(|(ns, _)| *ns == key)
        .map(|(_, label)| *label)
        .unwrap_or(fallback)
}

pub fn service_type_label(service_type: u32) -> Option<&'static str> {
    SERVICE_TYPES
        .iter()
        .find(|(_, st)| *st == service_type)
        .map(|(label, _)| *label)
}
