//! API clients
//!
//! - enigma2: the receiver's JSON web interface

pub mod enigma2;

pub use enigma2::{Enigma2Client, Enigma2Error};
