//! enigma2 web interface client
//!
//! Thin wrapper over the JSON API at `http://<host>/api/<endpoint>`.
//! EPG, timer and movie records are returned as [`Event`]s.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use anyhow::Result;
use chrono_tz::Tz;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::event::{Event, DEFAULT_LOCAL_TIMEZONE};
use crate::models::{MessageType, PowerState, TimerParams};
use crate::services::{Bouquet, ServiceEntry};

/// Host used when none is configured
pub const DEFAULT_REMOTE_ADDR: &str = "enigma2.local";

/// Headers a receiver with REST support answers `OPTIONS /file` with
const REST_HEADERS: &[&str] = &[
    "Access-Control-Allow-Origin",
    "Access-Control-Allow-Credentials",
    "Access-Control-Max-Age",
    "Access-Control-Allow-Methods",
    "Access-Control-Allow-Headers",
];

/// enigma2 API error types
#[derive(Error, Debug)]
pub enum Enigma2Error {
    #[error("Resource not found (404)")]
    NotFound,

    #[error("Server error: {0}")]
    ServerError(u16),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Response has no {0:?} key")]
    MissingKey(String),

    #[error("Request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
}

/// Request dump file content
#[derive(Debug, Serialize)]
struct RequestDump<'a> {
    url: &'a str,
    #[serde(rename = "_filter_key")]
    filter_key: Option<&'a str>,
    response: &'a Value,
}

/// enigma2 API client
pub struct Enigma2Client {
    base_url: String,
    client: reqwest::Client,
    timezone: Tz,
    dry_run: bool,
    dump_requests: Option<PathBuf>,
    request_no: AtomicU32,
}

impl Enigma2Client {
    /// Create a client for the receiver at `remote_addr` (host or host:port)
    pub fn new(remote_addr: impl AsRef<str>) -> Self {
        Self::with_base_url(format!("http://{}", remote_addr.as_ref()))
    }

    /// Create a client with a custom base URL (for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_default(),
            timezone: DEFAULT_LOCAL_TIMEZONE,
            dry_run: false,
            dump_requests: None,
            request_no: AtomicU32::new(0),
        }
    }

    /// Timezone the receiver's timestamps are localized into
    pub fn timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    /// Only log device altering calls (zap, power state, messages)
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Write every API response to `eha_raw_NNNN.json` files in `directory`
    pub fn dump_requests(mut self, directory: Option<PathBuf>) -> Self {
        if let Some(dir) = &directory {
            info!("{} will contain request dump files", dir.display());
        }
        self.dump_requests = directory;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    /// Plain GET returning the decoded JSON body and the request URL
    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<(String, Value)> {
        self.request_no.fetch_add(1, Ordering::SeqCst);
        let url = self.api_url(path);
        debug!("GET {} {:?}", url, params);

        let response = match self.client.get(&url).query(params).send().await {
            Ok(response) => response,
            Err(e) => {
                error!("Error GETting {}: {}", url, e);
                return Err(Enigma2Error::RequestFailed(e).into());
            }
        };
        let request_url = response.url().to_string();

        match response.status() {
            StatusCode::OK => {
                let body = response.text().await?;
                let parsed: Value = serde_json::from_str(&body).map_err(|e| {
                    error!("Error GETting {}: No JSON result? {}", request_url, e);
                    Enigma2Error::InvalidResponse(format!("JSON parse error: {}", e))
                })?;
                Ok((request_url, parsed))
            }
            StatusCode::NOT_FOUND => {
                error!("Error GETting {}: HTTP 404", request_url);
                Err(Enigma2Error::NotFound.into())
            }
            status => {
                error!("Error GETting {}: HTTP {}", request_url, status);
                Err(Enigma2Error::ServerError(status.as_u16()).into())
            }
        }
    }

    fn dump_request(
        &self,
        directory: &std::path::Path,
        url: &str,
        filter_key: Option<&str>,
        response: &Value,
    ) -> Result<()> {
        let request_no = self.request_no.load(Ordering::SeqCst);
        let target = directory.join(format!("eha_raw_{:04}.json", request_no));
        let response = match filter_key {
            Some(key) => response.get(key).unwrap_or(&Value::Null),
            None => response,
        };
        let dump = RequestDump {
            url,
            filter_key,
            response,
        };
        std::fs::write(target, serde_json::to_string_pretty(&dump)?)?;
        Ok(())
    }

    /// Execute an API call; with `filter_key` only that member of the
    /// response object is returned.
    pub async fn api_call(
        &self,
        path: &str,
        params: &[(&str, String)],
        filter_key: Option<&str>,
    ) -> Result<Value> {
        let (url, mut response) = self.get(path, params).await?;

        if let Some(directory) = &self.dump_requests {
            if let Err(e) = self.dump_request(directory, &url, filter_key, &response) {
                warn!("Request dumping failed: {}", e);
            }
        }

        match filter_key {
            Some(key) => response
                .get_mut(key)
                .map(Value::take)
                .ok_or_else(|| Enigma2Error::MissingKey(key.to_string()).into()),
            None => Ok(response),
        }
    }

    async fn api_call_as<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        filter_key: Option<&str>,
    ) -> Result<T> {
        let value = self.api_call(path, params, filter_key).await?;
        let parsed = serde_json::from_value(value).map_err(|e| {
            Enigma2Error::InvalidResponse(format!("{}: unexpected data: {}", path, e))
        })?;
        Ok(parsed)
    }

    /// Wrap a list of raw records; records that do not form an event are
    /// skipped with a warning
    fn events(&self, value: Value) -> Result<Vec<Event>> {
        let Value::Array(items) = value else {
            return Err(Enigma2Error::InvalidResponse("expected a list of items".into()).into());
        };

        Ok(items
            .into_iter()
            .filter_map(|item| match Event::from_value_in(item, self.timezone) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!("Skipping item: {}", e);
                    None
                }
            })
            .collect())
    }

    // =========================================================================
    // Device information
    // =========================================================================

    /// Information about the receiver
    pub async fn about(&self) -> Result<Value> {
        self.api_call("about", &[], None).await
    }

    /// Check whether the receiver's web interface has REST support
    pub async fn has_rest_support(&self) -> Result<bool> {
        let url = format!("{}/file", self.base_url);
        let response = self.client.request(Method::OPTIONS, &url).send().await?;

        if response.status() != StatusCode::OK {
            return Ok(false);
        }

        let headers = response.headers();
        Ok(REST_HEADERS.iter().all(|h| headers.contains_key(*h)))
    }

    // =========================================================================
    // Services
    // =========================================================================

    /// Bouquets (name and reference)
    pub async fn services(&self) -> Result<Vec<ServiceEntry>> {
        self.api_call_as("getservices", &[], Some("services")).await
    }

    /// Services of a bouquet
    pub async fn bouquet_services(&self, bouquet_ref: &str) -> Result<Vec<ServiceEntry>> {
        let params = [("sRef", bouquet_ref.to_string())];
        self.api_call_as("getservices", &params, Some("services")).await
    }

    /// All bouquets together with their services
    pub async fn all_services(&self) -> Result<Vec<Bouquet>> {
        self.api_call_as("getallservices", &[], Some("services")).await
    }

    /// Subservices of the current service
    pub async fn subservices(&self) -> Result<Vec<ServiceEntry>> {
        self.api_call_as("subservices", &[], Some("services")).await
    }

    // =========================================================================
    // EPG
    // =========================================================================

    /// Currently running events of a bouquet's services
    pub async fn epg_bouquet(&self, bouquet_ref: &str) -> Result<Vec<Event>> {
        let params = [("bRef", bouquet_ref.to_string())];
        let res = self.api_call("epgbouquet", &params, Some("events")).await?;
        self.events(res)
    }

    /// Events of a service
    pub async fn epg_service(&self, service_ref: &str) -> Result<Vec<Event>> {
        let params = [("sRef", service_ref.to_string())];
        let res = self.api_call("epgservice", &params, Some("events")).await?;
        self.events(res)
    }

    /// Search the EPG for `what`
    pub async fn search(&self, what: &str) -> Result<Vec<Event>> {
        let params = [("search", what.to_string())];
        let res = self.api_call("epgsearch", &params, Some("events")).await?;
        self.events(res)
    }

    // =========================================================================
    // Timers
    // =========================================================================

    pub async fn timer_list(&self) -> Result<Vec<Event>> {
        let res = self.api_call("timerlist", &[], Some("timers")).await?;
        self.events(res)
    }

    /// Add a timer, returns the receiver's message
    pub async fn timer_add(&self, service_ref: &str, timer: &TimerParams) -> Result<Value> {
        let mut params = timer.to_query();
        params.insert(0, ("sRef", service_ref.to_string()));
        self.api_call("timeradd", &params, Some("message")).await
    }

    /// Add a timer for an EPG event
    pub async fn timer_add_by_event_id(&self, service_ref: &str, event_id: i64) -> Result<Value> {
        let params = [
            ("sRef", service_ref.to_string()),
            ("eventid", event_id.to_string()),
        ];
        self.api_call("timeraddbyeventid", &params, None).await
    }

    /// Delete the timer of `service_ref` running from `begin` to `end` (epoch)
    pub async fn timer_delete(&self, service_ref: &str, begin: i64, end: i64) -> Result<Value> {
        let params = [
            ("sRef", service_ref.to_string()),
            ("begin", begin.to_string()),
            ("end", end.to_string()),
        ];
        self.api_call("timerdelete", &params, Some("message")).await
    }

    // =========================================================================
    // Movies
    // =========================================================================

    pub async fn movie_list(&self) -> Result<Vec<Event>> {
        let res = self.api_call("movielist", &[], Some("movies")).await?;
        self.events(res)
    }

    /// Recorded movies keyed by pseudo ID; movies without one are skipped
    pub async fn movie_index(&self) -> Result<HashMap<String, Map<String, Value>>> {
        let mut index = HashMap::new();

        for movie in self.movie_list().await? {
            match movie.pseudo_id() {
                Some(id) => {
                    let id = id.to_string();
                    index.insert(id, movie.into_raw());
                }
                None => warn!("Pseudo ID is None: {:?}", movie.raw()),
            }
        }
        Ok(index)
    }

    /// Delete a recording
    pub async fn movie_delete(&self, service_ref: &str) -> Result<Value> {
        let params = [("sRef", service_ref.to_string())];
        self.api_call("moviedelete", &params, None).await
    }

    // =========================================================================
    // Device control
    // =========================================================================

    /// Switch to a service
    pub async fn zap(&self, service_ref: &str) -> Result<Value> {
        if self.dry_run {
            info!("WOULD zap to {:?}", service_ref);
            return Ok(Value::String(service_ref.to_string()));
        }

        let params = [("sRef", service_ref.to_string())];
        self.api_call("zap", &params, Some("message")).await
    }

    pub async fn power_state(&self, new_state: PowerState) -> Result<Value> {
        if self.dry_run {
            info!("WOULD set powerstate to {:?}", new_state.name());
            return Ok(Value::Null);
        }

        let params = [("newstate", new_state.code().to_string())];
        self.api_call("powerstate", &params, None).await
    }

    /// Display a message on the receiver's screen; no timeout keeps it
    /// until dismissed
    pub async fn message(
        &self,
        text: &str,
        timeout: Option<u32>,
        message_type: MessageType,
    ) -> Result<Value> {
        if self.dry_run {
            info!(
                "WOULD send message {:?} type={} timeout={:?}",
                text,
                message_type.code(),
                timeout
            );
            return Ok(Value::Null);
        }

        let mut params = vec![
            ("text", text.to_string()),
            ("type", message_type.code().to_string()),
        ];
        if let Some(timeout) = timeout.filter(|t| *t > 0) {
            params.push(("timeout", timeout.to_string()));
        }
        self.api_call("message", &params, None).await
    }

    /// Display a yes/no question and ask for the answer
    pub async fn message_answer(&self, text: &str, timeout: Option<u32>) -> Result<Value> {
        if self.dry_run {
            info!("WOULD send messageanswer {:?} timeout={:?}", text, timeout);
            return Ok(Value::Null);
        }

        let mut params = vec![
            ("text", text.to_string()),
            ("type", MessageType::YesNo.code().to_string()),
            ("getanswer", "now".to_string()),
        ];
        if let Some(timeout) = timeout.filter(|t| *t > 0) {
            params.push(("timeout", timeout.to_string()));
        }
        self.api_call("messageanswer", &params, None).await
    }
}
