//! Unified event model
//!
//! The enigma2 API describes a broadcast with different keys depending on
//! where it shows up: EPG listings, timers and recorded movies each have
//! their own record layout. [`RawEvent`] captures those layouts as a tagged
//! union and [`Event`] is the common read-only view built from any of them.
//!
//! | canonical           | EPG               | timer                 | movie                 |
//! |---------------------|-------------------|-----------------------|-----------------------|
//! | `item_id`           | `id`              | `eit`                 | hash of the reference |
//! | `title`             | `title`           | `name`                | `eventname`           |
//! | `start_time`        | `begin_timestamp` | `begin`               | `recordingtime`       |
//! | `stop_time`         | start + duration  | `end`                 | start + duration      |
//! | `duration`          | `duration_sec`    | stop - start          | `length` (`MM:SS`)    |
//! | `service_name`      | `sname`           | `servicename`         | `servicename`         |
//! | `service_reference` | `sref`            | `serviceref`          | `serviceref`          |
//! | `shortinfo`         | `shortdesc`       | `description`         | `description`         |
//! | `longinfo`          | `longdesc`        | `descriptionextended` | `descriptionExtended` |
//!
//! Timestamps returned by the receiver are local to the receiver, not UTC,
//! so events are localized into a configurable timezone.

use std::fmt;

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha1::{Digest, Sha1};
use thiserror::Error;

use crate::pseudo_id;
use crate::sref::{ServiceReference, ServiceReferenceError};

/// The receiver reports local time; this is the zone assumed when none is configured
pub const DEFAULT_LOCAL_TIMEZONE: Tz = chrono_tz::Europe::Berlin;

/// Format of the `realbegin`/`realend` style timestamps of timer items
pub const DT_FORMAT_REAL_KEYS: &str = "%d.%m.%Y %H:%M";

/// Format of `start_time` in the plain form (always UTC)
pub const DT_FORMAT_PLAIN: &str = "%Y-%m-%d %H:%M:%S";

/// `_kind` marker of the plain form
pub const PLAIN_KIND: &str = "EEvent";

/// Control character used by some broadcasters as a line break
const LINE_BREAK_MARKER: char = '\u{8a}';

// =============================================================================
// Errors
// =============================================================================

#[derive(Error, Debug)]
pub enum EventError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("invalid {kind} record: {source}")]
    InvalidRecord {
        kind: EventKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid timestamp {0:?}")]
    InvalidTimestamp(String),

    #[error("duration out of range: {0}")]
    InvalidDuration(String),

    #[error(transparent)]
    ServiceReference(#[from] ServiceReferenceError),
}

// =============================================================================
// Raw records
// =============================================================================

/// Item type of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Epg,
    Timer,
    Movie,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Epg => write!(f, "epg"),
            EventKind::Timer => write!(f, "timer"),
            EventKind::Movie => write!(f, "movie"),
        }
    }
}

/// Timestamp as found in raw records: Unix epoch or `dd.mm.yyyy HH:MM`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawTime {
    Epoch(i64),
    Fractional(f64),
    Text(String),
}

impl RawTime {
    /// Express this timestamp in `tz`; naive text is read as local time of `tz`
    pub fn localize(&self, tz: &Tz) -> Result<DateTime<Tz>, EventError> {
        match self {
            RawTime::Epoch(secs) => tz
                .timestamp_opt(*secs, 0)
                .single()
                .ok_or_else(|| EventError::InvalidTimestamp(secs.to_string())),
            RawTime::Fractional(secs) => tz
                .timestamp_opt(secs.trunc() as i64, 0)
                .single()
                .ok_or_else(|| EventError::InvalidTimestamp(secs.to_string())),
            RawTime::Text(text) => {
                let naive = NaiveDateTime::parse_from_str(text.trim(), DT_FORMAT_REAL_KEYS)
                    .map_err(|_| EventError::InvalidTimestamp(text.clone()))?;
                tz.from_local_datetime(&naive)
                    .earliest()
                    .ok_or_else(|| EventError::InvalidTimestamp(text.clone()))
            }
        }
    }
}

/// EPG listing item (`epgsearch`, `epgservice`, `epgbouquet`)
#[derive(Debug, Clone, Deserialize)]
pub struct EpgRecord {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub begin_timestamp: RawTime,
    pub duration_sec: i64,
    pub sname: Option<String>,
    pub sref: String,
    pub shortdesc: Option<String>,
    pub longdesc: Option<String>,
}

/// Timer item (`timerlist`)
#[derive(Debug, Clone, Deserialize)]
pub struct TimerRecord {
    pub eit: Option<i64>,
    pub name: Option<String>,
    pub begin: RawTime,
    pub end: RawTime,
    pub servicename: Option<String>,
    pub serviceref: String,
    pub description: Option<String>,
    pub descriptionextended: Option<String>,
}

/// Recorded movie item (`movielist`)
#[derive(Debug, Clone, Deserialize)]
pub struct MovieRecord {
    pub eventname: Option<String>,
    pub recordingtime: RawTime,
    #[serde(default)]
    pub length: Option<Value>,
    pub servicename: Option<String>,
    pub serviceref: String,
    pub description: Option<String>,
    #[serde(rename = "descriptionExtended")]
    pub description_extended: Option<String>,
}

/// Serialized canonical form of an [`Event`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlainEvent {
    #[serde(rename = "_kind")]
    pub marker: String,
    #[serde(rename = "_type")]
    pub kind: EventKind,
    pub item_id: Option<i64>,
    pub service_name: Option<String>,
    pub service_reference: String,
    pub title: Option<String>,
    pub shortinfo: Option<String>,
    pub longinfo: Option<String>,
    /// Seconds
    pub duration: i64,
    /// UTC, see [`DT_FORMAT_PLAIN`]
    pub start_time: String,
}

/// Raw record, discriminated by the keys it carries
#[derive(Debug, Clone)]
pub enum RawEvent {
    Epg(EpgRecord),
    Timer(TimerRecord),
    Movie(MovieRecord),
    Plain(PlainEvent),
}

impl RawEvent {
    /// Kind of a raw record: `duration_sec` marks EPG items,
    /// `recordingtime` movies, anything else is taken for a timer.
    pub fn detect_kind(item: &Map<String, Value>) -> EventKind {
        if item.contains_key("duration_sec") {
            EventKind::Epg
        } else if item.contains_key("recordingtime") {
            EventKind::Movie
        } else {
            EventKind::Timer
        }
    }

    pub fn is_plain(item: &Map<String, Value>) -> bool {
        item.get("_kind").and_then(Value::as_str) == Some(PLAIN_KIND)
    }

    pub fn from_record(item: &Map<String, Value>) -> Result<Self, EventError> {
        let value = Value::Object(item.clone());

        if Self::is_plain(item) {
            let kind = item
                .get("_type")
                .and_then(|t| serde_json::from_value(t.clone()).ok())
                .unwrap_or(EventKind::Timer);
            return serde_json::from_value(value)
                .map(RawEvent::Plain)
                .map_err(|source| EventError::InvalidRecord { kind, source });
        }

        let kind = Self::detect_kind(item);
        let parsed = match kind {
            EventKind::Epg => serde_json::from_value(value).map(RawEvent::Epg),
            EventKind::Timer => serde_json::from_value(value).map(RawEvent::Timer),
            EventKind::Movie => serde_json::from_value(value).map(RawEvent::Movie),
        };
        parsed.map_err(|source| EventError::InvalidRecord { kind, source })
    }

    pub fn kind(&self) -> EventKind {
        match self {
            RawEvent::Epg(_) => EventKind::Epg,
            RawEvent::Timer(_) => EventKind::Timer,
            RawEvent::Movie(_) => EventKind::Movie,
            RawEvent::Plain(plain) => plain.kind,
        }
    }
}

// =============================================================================
// Event
// =============================================================================

/// Unified, read-only view of an EPG, timer or movie item
#[derive(Debug, Clone)]
pub struct Event {
    kind: EventKind,
    item_id: Option<i64>,
    service_name: Option<String>,
    service_reference: String,
    title: Option<String>,
    shortinfo: Option<String>,
    longinfo: Option<String>,
    start_time: DateTime<Tz>,
    stop_time: DateTime<Tz>,
    duration: Duration,
    pseudo_id: Option<String>,
    raw: Map<String, Value>,
}

/// Canonical fields before service reference canonicalization
struct Fields {
    item_id: Option<i64>,
    service_name: Option<String>,
    service_reference: String,
    title: Option<String>,
    shortinfo: Option<String>,
    longinfo: Option<String>,
    start_time: DateTime<Tz>,
    duration: Duration,
}

impl Event {
    /// Build an event from a raw record using [`DEFAULT_LOCAL_TIMEZONE`]
    pub fn from_record(item: Map<String, Value>) -> Result<Self, EventError> {
        Self::from_record_in(item, DEFAULT_LOCAL_TIMEZONE)
    }

    /// Build an event from a raw record, localizing timestamps into `tz`
    pub fn from_record_in(item: Map<String, Value>, tz: Tz) -> Result<Self, EventError> {
        let raw = RawEvent::from_record(&item)?;
        let kind = raw.kind();

        let mut fields = match raw {
            RawEvent::Epg(epg) => {
                let duration = Duration::try_seconds(epg.duration_sec)
                    .ok_or_else(|| EventError::InvalidDuration(epg.duration_sec.to_string()))?;
                Fields {
                    item_id: epg.id,
                    service_name: epg.sname,
                    service_reference: epg.sref,
                    title: epg.title,
                    shortinfo: epg.shortdesc,
                    longinfo: epg.longdesc.map(|text| text.replace(LINE_BREAK_MARKER, "\n")),
                    start_time: epg.begin_timestamp.localize(&tz)?,
                    duration,
                }
            }
            RawEvent::Timer(timer) => {
                let start_time = timer.begin.localize(&tz)?;
                let stop_time = timer.end.localize(&tz)?;
                Fields {
                    item_id: timer.eit,
                    service_name: timer.servicename,
                    service_reference: timer.serviceref,
                    title: timer.name,
                    shortinfo: timer.description,
                    longinfo: timer
                        .descriptionextended
                        .map(|text| text.replace(LINE_BREAK_MARKER, "\n")),
                    start_time,
                    duration: stop_time - start_time,
                }
            }
            RawEvent::Movie(movie) => Fields {
                item_id: None,
                service_name: movie.servicename,
                service_reference: movie.serviceref,
                title: movie.eventname,
                shortinfo: movie.description,
                longinfo: movie
                    .description_extended
                    .map(|text| text.replace(LINE_BREAK_MARKER, "\n")),
                start_time: movie.recordingtime.localize(&tz)?,
                duration: movie
                    .length
                    .as_ref()
                    .and_then(Value::as_str)
                    .map(parse_movie_length)
                    .unwrap_or_else(Duration::zero),
            },
            RawEvent::Plain(plain) => {
                let naive = NaiveDateTime::parse_from_str(&plain.start_time, DT_FORMAT_PLAIN)
                    .map_err(|_| EventError::InvalidTimestamp(plain.start_time.clone()))?;
                Fields {
                    item_id: plain.item_id,
                    service_name: plain.service_name,
                    service_reference: plain.service_reference,
                    title: plain.title,
                    shortinfo: plain.shortinfo,
                    longinfo: plain.longinfo,
                    start_time: Utc.from_utc_datetime(&naive).with_timezone(&tz),
                    duration: Duration::try_seconds(plain.duration)
                        .ok_or_else(|| EventError::InvalidDuration(plain.duration.to_string()))?,
                }
            }
        };

        let sref = ServiceReference::parse(&fields.service_reference)?;

        // recordings share a blank reference; hash it with the file path
        if kind == EventKind::Movie && fields.item_id.is_none() {
            fields.item_id = Some(movie_item_id(&fields.service_reference));
        }
        fields.service_reference = sref.to_string();

        let (stop_time, duration) = match fields.start_time.checked_add_signed(fields.duration) {
            Some(stop_time) => (stop_time, fields.duration),
            // movie lengths degrade to zero
            None if kind == EventKind::Movie => (fields.start_time, Duration::zero()),
            None => {
                return Err(EventError::InvalidDuration(
                    fields.duration.num_seconds().to_string(),
                ))
            }
        };

        let pseudo_id = pseudo_id::from_record_any(&item, sref.is_radio());

        Ok(Self {
            kind,
            item_id: fields.item_id,
            service_name: fields.service_name,
            service_reference: fields.service_reference,
            title: fields.title,
            shortinfo: fields.shortinfo,
            longinfo: fields.longinfo,
            start_time: fields.start_time,
            stop_time,
            duration,
            pseudo_id,
            raw: item,
        })
    }

    /// Build an event from any JSON value (must be an object)
    pub fn from_value_in(value: Value, tz: Tz) -> Result<Self, EventError> {
        match value {
            Value::Object(item) => Self::from_record_in(item, tz),
            _ => Err(EventError::NotAnObject),
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn item_id(&self) -> Option<i64> {
        self.item_id
    }

    pub fn service_name(&self) -> Option<&str> {
        self.service_name.as_deref()
    }

    /// Canonical (lowercase, defaulted) service reference
    pub fn service_reference(&self) -> &str {
        &self.service_reference
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn shortinfo(&self) -> Option<&str> {
        self.shortinfo.as_deref()
    }

    pub fn longinfo(&self) -> Option<&str> {
        self.longinfo.as_deref()
    }

    pub fn start_time(&self) -> DateTime<Tz> {
        self.start_time
    }

    pub fn stop_time(&self) -> DateTime<Tz> {
        self.stop_time
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn pseudo_id(&self) -> Option<&str> {
        self.pseudo_id.as_deref()
    }

    /// The record this event was built from
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    pub fn into_raw(self) -> Map<String, Value> {
        self.raw
    }

    /// Service reference followed by the item ID
    pub fn global_id(&self) -> Option<String> {
        self.item_id
            .map(|id| format!("{}{}", self.service_reference, id))
    }

    pub fn to_plain(&self) -> PlainEvent {
        PlainEvent {
            marker: PLAIN_KIND.to_string(),
            kind: self.kind,
            item_id: self.item_id,
            service_name: self.service_name.clone(),
            service_reference: self.service_reference.clone(),
            title: self.title.clone(),
            shortinfo: self.shortinfo.clone(),
            longinfo: self.longinfo.clone(),
            duration: self.duration.num_seconds(),
            start_time: self
                .start_time
                .with_timezone(&Utc)
                .format(DT_FORMAT_PLAIN)
                .to_string(),
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}#{}] {} {}",
            self.service_name.as_deref().unwrap_or_default(),
            self.item_id.map(|id| id.to_string()).unwrap_or_default(),
            self.start_time.format("%y-%m-%d %H:%M"),
            self.title.as_deref().unwrap_or_default(),
        )?;
        match self.shortinfo.as_deref() {
            Some(info) if !info.is_empty() => write!(f, " - {}", info),
            _ => Ok(()),
        }
    }
}

/// Parse a movie `length` such as `"129:38"` (minutes, seconds); malformed
/// values yield a zero duration.
pub fn parse_movie_length(length: &str) -> Duration {
    let Some((minutes, seconds)) = length.split_once(':') else {
        return Duration::zero();
    };
    match (minutes.trim().parse::<i64>(), seconds.trim().parse::<i64>()) {
        (Ok(minutes), Ok(seconds)) => Duration::try_minutes(minutes)
            .zip(Duration::try_seconds(seconds))
            .and_then(|(minutes, seconds)| minutes.checked_add(&seconds))
            .unwrap_or_else(Duration::zero),
        _ => Duration::zero(),
    }
}

/// Stand-in item ID for movies, which have none: derived from the service
/// reference, stable but not collision free.
pub fn movie_item_id(service_reference: &str) -> i64 {
    let digest = Sha1::digest(service_reference.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(bytes)
}
