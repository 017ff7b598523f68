//! Data structures shared by the API client and the command line tools
//!
//! - **Device control**: power states and on-screen message types
//! - **Timers**: parameters for adding a timer
//!
//! Event, service reference and service list types live in their own
//! modules (`event`, `sref`, `services`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// =============================================================================
// Power State
// =============================================================================

/// Power state transitions understood by `powerstate`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerState {
    ToggleStandby,
    DeepStandby,
    Reboot,
    Restart,
    Wakeup,
    Standby,
}

impl PowerState {
    pub const ALL: [PowerState; 6] = [
        PowerState::ToggleStandby,
        PowerState::DeepStandby,
        PowerState::Reboot,
        PowerState::Restart,
        PowerState::Wakeup,
        PowerState::Standby,
    ];

    /// Numeric value sent as `newstate`
    pub fn code(&self) -> u8 {
        match self {
            PowerState::ToggleStandby => 0,
            PowerState::DeepStandby => 1,
            PowerState::Reboot => 2,
            PowerState::Restart => 3,
            PowerState::Wakeup => 4,
            PowerState::Standby => 5,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PowerState::ToggleStandby => "toggle-standby",
            PowerState::DeepStandby => "deep-standby",
            PowerState::Reboot => "reboot",
            PowerState::Restart => "restart",
            PowerState::Wakeup => "wakeup",
            PowerState::Standby => "standby",
        }
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for PowerState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|state| state.name() == s || state.code().to_string() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|p| p.name()).collect();
                format!("unknown power state {:?} (expected one of {})", s, names.join(", "))
            })
    }
}

// =============================================================================
// Messages
// =============================================================================

/// On-screen message type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageType {
    YesNo,
    #[default]
    Info,
    Message,
    Attention,
}

impl MessageType {
    pub fn code(&self) -> u8 {
        match self {
            MessageType::YesNo => 0,
            MessageType::Info => 1,
            MessageType::Message => 2,
            MessageType::Attention => 3,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageType::YesNo => write!(f, "yes/no"),
            MessageType::Info => write!(f, "info"),
            MessageType::Message => write!(f, "message"),
            MessageType::Attention => write!(f, "attention"),
        }
    }
}

/// Default display time of on-screen messages, in seconds
pub const DEFAULT_MESSAGE_TIMEOUT: u32 = 10;

// =============================================================================
// Timers
// =============================================================================

/// What the receiver does once a timer finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AfterEvent {
    Nothing = 0,
    Standby = 1,
    DeepStandby = 2,
    Auto = 3,
}

/// Parameters of `timeradd`. Unset fields are left to the receiver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerParams {
    /// Start, Unix epoch
    pub begin: Option<i64>,
    /// Stop, Unix epoch
    pub end: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub dirname: Option<String>,
    pub tags: Option<String>,
    pub eit: Option<i64>,
    /// Bit mask of weekdays
    pub repeated: Option<u8>,
    pub disabled: Option<bool>,
    /// Zap only, do not record
    pub justplay: Option<bool>,
    pub afterevent: Option<AfterEvent>,
}

impl TimerParams {
    /// Query parameters for the set fields
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let flag = |b: bool| String::from(if b { "1" } else { "0" });
        let mut query = Vec::new();

        if let Some(v) = self.begin {
            query.push(("begin", v.to_string()));
        }
        if let Some(v) = self.end {
            query.push(("end", v.to_string()));
        }
        if let Some(v) = &self.name {
            query.push(("name", v.clone()));
        }
        if let Some(v) = &self.description {
            query.push(("description", v.clone()));
        }
        if let Some(v) = &self.dirname {
            query.push(("dirname", v.clone()));
        }
        if let Some(v) = &self.tags {
            query.push(("tags", v.clone()));
        }
        if let Some(v) = self.eit {
            query.push(("eit", v.to_string()));
        }
        if let Some(v) = self.repeated {
            query.push(("repeated", v.to_string()));
        }
        if let Some(v) = self.disabled {
            query.push(("disabled", flag(v)));
        }
        if let Some(v) = self.justplay {
            query.push(("justplay", flag(v)));
        }
        if let Some(v) = self.afterevent {
            query.push(("afterevent", (v as u8).to_string()));
        }
        query
    }
}
