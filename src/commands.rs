//! CLI Command Handlers
//!
//! Each handler takes its CLI args, the API client and Output, and returns
//! an ExitCode.

use std::path::Path;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, info};

use crate::api::{Enigma2Client, Enigma2Error};
use crate::blacklist::Blacklist;
use crate::cli::{
    AboutCmd, ApiCmd, EpgSearchCmd, ExitCode, HasRestCmd, MessageCmd, MovieListCmd, Output,
    PowerCmd, ServiceListCmd, ServiceSort, TimerListCmd, ZapCmd,
};
use crate::config::Config;
use crate::event::{Event, PlainEvent};
use crate::recording::trunk_name;
use crate::services::{
    self, SelectedService, ServiceDump, ServiceEntry, ServiceFilter, ServiceLookup,
};
use crate::sref::{guess_namespace_label, ServiceReference, NS_UNKNOWN_LABEL};

// =============================================================================
// Formatting
// =============================================================================

/// Event as printed with `--json`
#[derive(Debug, Serialize)]
pub struct EventOutput {
    #[serde(flatten)]
    pub event: PlainEvent,
    pub pseudo_id: Option<String>,
}

impl From<&Event> for EventOutput {
    fn from(event: &Event) -> Self {
        Self {
            event: event.to_plain(),
            pseudo_id: event.pseudo_id().map(str::to_string),
        }
    }
}

/// Human readable event block: header, title and, depending on `verbose`,
/// duration with long description and the pseudo ID.
pub fn render_event(event: &Event, verbose: u8, technical: bool) -> String {
    let mut lines = Vec::new();

    let start = event.start_time().format("%d.%m.%Y %H:%M");
    let stop = event.stop_time().format("%H:%M");
    let item_id = event.item_id().unwrap_or_default();
    let service_name = event.service_name().unwrap_or_default();

    if technical {
        lines.push(format!(
            "{} -- {} #{:06} {:30} {}",
            start,
            stop,
            item_id,
            service_name,
            event.service_reference()
        ));
    } else {
        lines.push(format!("{} -- {} #{:06} {}", start, stop, item_id, service_name));
    }

    let shortinfo = match event.shortinfo() {
        Some(info) if !info.is_empty() => format!(" - {}", info),
        _ => String::new(),
    };
    lines.push(format!("{}{}", event.title().unwrap_or_default(), shortinfo));

    if verbose > 0 {
        lines.push(format!(
            "{} mins. {}",
            event.duration().num_minutes(),
            event.longinfo().unwrap_or_default()
        ));
    }
    if verbose > 1 {
        lines.push(format!(
            "PSEUDO ID: {}",
            event.pseudo_id().unwrap_or("None")
        ));
    }

    lines.join("\n")
}

fn raw_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// URL that deletes the timer `event` was built from
pub fn timer_delete_url(base_url: &str, event: &Event) -> String {
    let raw = event.raw();
    format!(
        "{}/api/timerdelete?sRef={}&begin={}&end={}",
        base_url,
        urlencoding::encode(&raw_text(raw.get("serviceref"))),
        urlencoding::encode(&raw_text(raw.get("begin"))),
        urlencoding::encode(&raw_text(raw.get("end"))),
    )
}

/// One line of the service list
pub fn render_service(service: &SelectedService) -> String {
    let sref = &service.reference;
    format!(
        "0x{:04X} {:5} {:5} {:50} {}",
        sref.oid,
        sref.service_type_label().unwrap_or("?"),
        guess_namespace_label(sref.ns, NS_UNKNOWN_LABEL),
        service.entry.servicename,
        service.entry.servicereference
    )
}

/// Exit code for a failed call: transport and HTTP failures are network errors
pub fn exit_code_for(e: &anyhow::Error) -> ExitCode {
    if e.downcast_ref::<reqwest::Error>().is_some() {
        return ExitCode::NetworkError;
    }
    match e.downcast_ref::<Enigma2Error>() {
        Some(
            Enigma2Error::RequestFailed(_) | Enigma2Error::ServerError(_) | Enigma2Error::NotFound,
        ) => ExitCode::NetworkError,
        _ => ExitCode::Error,
    }
}

fn failure(output: &Output, what: &str, e: anyhow::Error) -> ExitCode {
    output.error(format!("{} failed: {:#}", what, e), exit_code_for(&e))
}

fn print_events(events: &[Event], output: &Output, technical: bool) -> ExitCode {
    if output.json {
        let data: Vec<EventOutput> = events.iter().map(EventOutput::from).collect();
        if let Err(e) = output.print(&data) {
            return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
        }
        return ExitCode::Success;
    }

    for event in events {
        output.text(render_event(event, output.verbose, technical));
        output.text(" ");
    }
    ExitCode::Success
}

fn print_value(value: &Value, output: &Output) -> ExitCode {
    let result = if output.json {
        output.print(value)
    } else {
        serde_json::to_string_pretty(value)
            .map(|text| output.text(text))
            .map_err(Into::into)
    };
    match result {
        Ok(()) => ExitCode::Success,
        Err(e) => output.error(format!("Failed to serialize: {}", e), ExitCode::Error),
    }
}

// =============================================================================
// EPG Search Command
// =============================================================================

pub async fn epg_search_cmd(
    cmd: EpgSearchCmd,
    client: &Enigma2Client,
    config: &Config,
    output: &Output,
) -> ExitCode {
    let blacklist = match cmd.blacklist.as_ref().or(config.blacklist.as_ref()) {
        Some(path) => match Blacklist::open(path) {
            Ok(blacklist) => Some(blacklist),
            Err(e) => return output.error(format!("{:#}", e), ExitCode::InvalidArgs),
        },
        None => None,
    };

    output.info(format!("Searching for: {}", cmd.query));

    let mut events = match client.search(&cmd.query).await {
        Ok(events) => events,
        Err(e) => return failure(output, "Search", e),
    };

    if output.verbose > 0 || cmd.technical {
        info!("Filtering {} result(s)", events.len());
    }

    if let Some(blacklist) = &blacklist {
        let before = events.len();
        events.retain(|event| !blacklist.is_blacklisted(event));
        debug!("{} blacklisted item(s) skipped", before - events.len());
    }

    print_events(&events, output, cmd.technical)
}

// =============================================================================
// Timer List Command
// =============================================================================

pub async fn timer_list_cmd(
    _cmd: TimerListCmd,
    client: &Enigma2Client,
    output: &Output,
) -> ExitCode {
    let timers = match client.timer_list().await {
        Ok(timers) => timers,
        Err(e) => return failure(output, "Timer list", e),
    };

    if output.json {
        return print_events(&timers, output, false);
    }

    for timer in &timers {
        output.text(render_event(timer, output.verbose, false));
        if output.verbose > 1 {
            output.text(format!(
                "Delete URL: {}",
                timer_delete_url(client.base_url(), timer)
            ));
        }
        output.text(" ");
    }
    ExitCode::Success
}

// =============================================================================
// Movie List Command
// =============================================================================

pub async fn movie_list_cmd(
    cmd: MovieListCmd,
    client: &Enigma2Client,
    output: &Output,
) -> ExitCode {
    if cmd.index {
        return match client.movie_index().await {
            Ok(index) => match output.print(&index) {
                Ok(()) => ExitCode::Success,
                Err(e) => output.error(format!("Failed to serialize: {}", e), ExitCode::Error),
            },
            Err(e) => failure(output, "Movie index", e),
        };
    }

    let movies = match client.movie_list().await {
        Ok(movies) => movies,
        Err(e) => return failure(output, "Movie list", e),
    };

    if let Some(path) = &cmd.persist_blacklist {
        if let Err(e) = persist_movies(path, &movies, output) {
            return output.error(format!("{:#}", e), ExitCode::Error);
        }
    }

    if output.json {
        return print_events(&movies, output, false);
    }

    for movie in &movies {
        output.text(render_event(movie, output.verbose, false));
        if output.verbose > 0 {
            let filename = raw_text(movie.raw().get("filename"));
            match trunk_name(&filename) {
                Ok(trunk) => output.text(format!("Recording: {}", trunk)),
                Err(e) => debug!("{}", e),
            }
        }
        output.text(" ");
    }
    ExitCode::Success
}

fn persist_movies(path: &Path, movies: &[Event], output: &Output) -> anyhow::Result<()> {
    let blacklist = Blacklist::open(path)?;
    let written = blacklist.persist(movies.iter().map(|m| m.raw().clone()), None)?;
    output.info(format!(
        "{} entrie(s) in blacklist {}",
        written,
        path.display()
    ));
    Ok(())
}

// =============================================================================
// Service List Command
// =============================================================================

/// Services of every bouquet, in bouquet order
async fn bouquet_services(client: &Enigma2Client) -> anyhow::Result<Vec<ServiceEntry>> {
    let mut entries = Vec::new();
    for bouquet in client.services().await? {
        info!("Evaluating bouquet {:?}", bouquet.servicename);
        entries.extend(client.bouquet_services(&bouquet.servicereference).await?);
    }
    Ok(entries)
}

pub async fn service_list_cmd(
    cmd: ServiceListCmd,
    client: &Enigma2Client,
    output: &Output,
) -> ExitCode {
    let filter = ServiceFilter {
        service_types: cmd.service_types(),
        namespaces: cmd.namespaces(),
        oids: cmd.oid.clone(),
    };
    debug!("{:?}", filter);

    let entries = match bouquet_services(client).await {
        Ok(entries) => entries,
        Err(e) => return failure(output, "Service list", e),
    };

    let mut selected = filter.select(entries);
    match cmd.sort {
        ServiceSort::Name => services::sort_by_name(&mut selected),
        ServiceSort::Sref => services::sort_by_reference(&mut selected),
    }

    if let Some(path) = &cmd.dump {
        if let Err(e) = ServiceDump::new(&selected).write(path) {
            return output.error(format!("{:#}", e), ExitCode::Error);
        }
    }

    if output.json {
        let data: Vec<&ServiceEntry> = selected.iter().map(|s| &s.entry).collect();
        if let Err(e) = output.print(&data) {
            return output.error(format!("Failed to serialize: {}", e), ExitCode::Error);
        }
        return ExitCode::Success;
    }

    for service in &selected {
        output.text(render_service(service));
    }
    ExitCode::Success
}

// =============================================================================
// Device Commands
// =============================================================================

pub async fn about_cmd(_cmd: AboutCmd, client: &Enigma2Client, output: &Output) -> ExitCode {
    match client.about().await {
        Ok(about) => print_value(&about, output),
        Err(e) => failure(output, "About", e),
    }
}

pub async fn has_rest_cmd(_cmd: HasRestCmd, client: &Enigma2Client, output: &Output) -> ExitCode {
    match client.has_rest_support().await {
        Ok(supported) => print_value(&Value::Bool(supported), output),
        Err(e) => failure(output, "REST support check", e),
    }
}

/// Service reference to zap to: a service name known to the receiver, or
/// the argument itself
async fn resolve_service(cmd: &ZapCmd, client: &Enigma2Client) -> anyhow::Result<String> {
    if let Some(ns) = cmd.ns {
        let lookup = ServiceLookup::from_bouquets(&client.all_services().await?)?;
        return Ok(lookup.lookup_service(&cmd.service, ns.namespace())?);
    }

    let found = bouquet_services(client)
        .await?
        .into_iter()
        .find(|entry| entry.servicename == cmd.service)
        .map(|entry| entry.servicereference);
    Ok(found.unwrap_or_else(|| cmd.service.clone()))
}

pub async fn zap_cmd(cmd: ZapCmd, client: &Enigma2Client, output: &Output) -> ExitCode {
    let zap_to = match resolve_service(&cmd, client).await {
        Ok(zap_to) => zap_to,
        Err(e) => return failure(output, "Service lookup", e),
    };

    info!("Zapping to {:?} ({:?})", cmd.service, zap_to);

    if let Err(e) = ServiceReference::parse(&zap_to) {
        error!("Invalid service reference! {}", e);
        return output.error(format!("Invalid service reference: {}", e), ExitCode::InvalidArgs);
    }

    match client.zap(&zap_to).await {
        Ok(res) => print_value(&res, output),
        Err(e) => failure(output, "Zap", e),
    }
}

pub async fn power_cmd(cmd: PowerCmd, client: &Enigma2Client, output: &Output) -> ExitCode {
    match client.power_state(cmd.state).await {
        Ok(Value::Null) => ExitCode::Success,
        Ok(res) => print_value(&res, output),
        Err(e) => failure(output, "Power state", e),
    }
}

pub async fn message_cmd(cmd: MessageCmd, client: &Enigma2Client, output: &Output) -> ExitCode {
    let result = if cmd.answer {
        client.message_answer(&cmd.text, Some(cmd.timeout)).await
    } else {
        client
            .message(&cmd.text, Some(cmd.timeout), cmd.message_type.into())
            .await
    };

    match result {
        Ok(Value::Null) => ExitCode::Success,
        Ok(res) => print_value(&res, output),
        Err(e) => failure(output, "Message", e),
    }
}

pub async fn api_cmd(cmd: ApiCmd, client: &Enigma2Client, output: &Output) -> ExitCode {
    let params: Vec<(&str, String)> = cmd
        .param
        .iter()
        .map(|(key, value)| (key.as_str(), value.clone()))
        .collect();

    match client
        .api_call(&cmd.call, &params, cmd.filter_key.as_deref())
        .await
    {
        Ok(res) => print_value(&res, output),
        Err(e) => failure(output, &format!("API call {:?}", cmd.call), e),
    }
}
