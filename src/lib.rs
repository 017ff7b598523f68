//! eha - enigma2 HTTP API client
//!
//! Talks to the JSON web interface of enigma2 based set-top boxes and puts
//! EPG, timer and movie items into one common shape.
//!
//! # Modules
//!
//! - `sref` - Service reference codec (parse, canonicalize, normalize)
//! - `event` - Unified event model over EPG, timer and movie records
//! - `pseudo_id` - Fingerprints that survive EPG -> timer -> movie
//! - `blacklist` - Persistent denylist keyed by pseudo ID
//! - `services` - Service lookup and service list filtering
//! - `recording` - Recording file names
//! - `models` - Power states, message types, timer parameters
//! - `api` - HTTP client for the receiver
//! - `config`, `logging`, `cli`, `commands` - the `eha` command line tool

pub mod api;
pub mod blacklist;
pub mod cli;
pub mod commands;
pub mod config;
pub mod event;
pub mod logging;
pub mod models;
pub mod pseudo_id;
pub mod recording;
pub mod services;
pub mod sref;

// Re-export commonly used types
pub use api::{Enigma2Client, Enigma2Error};
pub use blacklist::Blacklist;
pub use event::{Event, EventError, EventKind, PlainEvent, RawEvent};
pub use models::{AfterEvent, MessageType, PowerState, TimerParams};
pub use services::{ServiceEntry, ServiceFilter, ServiceLookup};
pub use sref::{ServiceReference, ServiceReferenceError};
