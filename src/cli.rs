//! CLI - Command Line Interface for eha
//!
//! One binary for the enigma2 tool family: EPG search, timer/movie/service
//! listings and a few device controls. Every listing can be printed as JSON.
//!
//! # Examples
//!
//! ```bash
//! # Search the EPG
//! eha epg-search "tatort" -v
//!
//! # List timers of a specific receiver
//! eha -a 192.168.1.20 timer-list -vv
//!
//! # HD services on DVB-S, sorted by reference
//! eha service-list --ns dvb-s --st hdtv --sort sref
//!
//! # Device control
//! eha zap "ZDF HD"
//! eha power standby
//! eha message "Dinner is ready" --timeout 30
//! ```

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::models::{MessageType, PowerState};
use crate::sref::{
    NS_DVB_C, NS_DVB_S, NS_DVB_T, SERVICE_TYPE_HDTV, SERVICE_TYPE_OPT, SERVICE_TYPE_RADIO,
    SERVICE_TYPE_SD4, SERVICE_TYPE_TV, SERVICE_TYPE_UHD,
};

// =============================================================================
// Exit Codes
// =============================================================================

/// Exit codes for CLI operations (semantic for scripting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// General error
    Error = 1,
    /// Invalid arguments
    InvalidArgs = 2,
    /// Receiver unreachable or HTTP failure
    NetworkError = 3,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> std::process::ExitCode {
        std::process::ExitCode::from(code as u8)
    }
}

// =============================================================================
// Main CLI Structure
// =============================================================================

/// eha - enigma2 HTTP API utilities
#[derive(Parser, Debug)]
#[command(
    name = "eha",
    version,
    about = "Query and control enigma2 based set-top boxes",
    long_about = "Talks to the JSON web interface of an enigma2 receiver.\n\n\
                  EPG, timer and movie items are shown in one common format.",
    after_help = "EXAMPLES:\n\
                  eha epg-search \"tatort\" -v       Search the EPG\n\
                  eha timer-list -vv               Timers with pseudo IDs\n\
                  eha service-list --ns dvb-s      Services on satellite\n\
                  eha zap \"ZDF HD\"                 Switch channel"
)]
pub struct Cli {
    /// enigma2 host address [env: ENIGMA2_HTTP_API_HOST] [default: enigma2.local]
    #[arg(long, short = 'a', global = true)]
    pub remote_addr: Option<String>,

    /// Timezone of the receiver's clock [default: Europe/Berlin]
    #[arg(long, global = true)]
    pub timezone: Option<String>,

    /// Do not change the receiver's state, only log what would be done
    #[arg(long, short = 'n', global = true)]
    pub dry_run: bool,

    /// Verbosity (more v: more verbosity)
    #[arg(long, short = 'v', action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format as JSON (default for non-TTY)
    #[arg(long, short = 'j', global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Write every API response to this directory
    #[arg(long, global = true, value_name = "DIR")]
    pub dump_requests: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Check if JSON output should be used
    pub fn should_json(&self) -> bool {
        self.json || !std::io::stdout().is_terminal()
    }
}

// =============================================================================
// Subcommands
// =============================================================================

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search the EPG
    #[command(visible_alias = "s")]
    EpgSearch(EpgSearchCmd),

    /// List timers
    #[command(visible_alias = "tl")]
    TimerList(TimerListCmd),

    /// List recorded movies
    #[command(visible_alias = "ml")]
    MovieList(MovieListCmd),

    /// List services of all bouquets
    #[command(visible_alias = "sl")]
    ServiceList(ServiceListCmd),

    /// Dump the "about" dataset
    About(AboutCmd),

    /// Check whether the receiver supports REST
    HasRest(HasRestCmd),

    /// Switch to a service (name or service reference)
    Zap(ZapCmd),

    /// Change the power state
    Power(PowerCmd),

    /// Show a message on screen
    #[command(visible_alias = "msg")]
    Message(MessageCmd),

    /// Dump the result of an arbitrary API call
    Api(ApiCmd),
}

// =============================================================================
// Listing Commands
// =============================================================================

/// Search the EPG for a title
#[derive(Args, Debug)]
pub struct EpgSearchCmd {
    /// Search query
    #[arg(required = true)]
    pub query: String,

    /// Dump more technical details
    #[arg(long, short = 't')]
    pub technical: bool,

    /// Skip events listed in this denylist file
    #[arg(long, short = 'b', value_name = "FILE")]
    pub blacklist: Option<PathBuf>,
}

/// List timers
#[derive(Args, Debug)]
pub struct TimerListCmd {}

/// List recorded movies
#[derive(Args, Debug)]
pub struct MovieListCmd {
    /// Add all listed movies to this denylist file
    #[arg(long, value_name = "FILE")]
    pub persist_blacklist: Option<PathBuf>,

    /// Print the movies keyed by pseudo ID (JSON)
    #[arg(long)]
    pub index: bool,
}

/// List services, filtered by service type, namespace and network
#[derive(Args, Debug)]
pub struct ServiceListCmd {
    /// Sort by
    #[arg(long, value_enum, default_value = "name")]
    pub sort: ServiceSort,

    /// Filter by original network ID (hex 0x.. or decimal, repeatable)
    #[arg(long, value_parser = parse_oid)]
    pub oid: Vec<u16>,

    /// Filter by namespace (repeatable) [default: dvb-c]
    #[arg(long, value_enum)]
    pub ns: Vec<NamespaceFilter>,

    /// Filter by service type (repeatable) [default: tv, hdtv]
    #[arg(long, value_enum)]
    pub st: Vec<ServiceTypeFilter>,

    /// File to dump service information to
    #[arg(long, value_name = "FILE")]
    pub dump: Option<PathBuf>,
}

impl ServiceListCmd {
    pub fn namespaces(&self) -> Vec<u32> {
        if self.ns.is_empty() {
            return vec![NS_DVB_C];
        }
        self.ns.iter().map(|ns| ns.namespace()).collect()
    }

    pub fn service_types(&self) -> Vec<u32> {
        if self.st.is_empty() {
            return vec![SERVICE_TYPE_TV, SERVICE_TYPE_HDTV];
        }
        self.st.iter().map(|st| st.service_type()).collect()
    }
}

/// Service list order
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceSort {
    /// Service name (default)
    #[default]
    Name,
    /// Normalized service reference
    Sref,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceFilter {
    #[value(name = "dvb-c")]
    DvbC,
    #[value(name = "dvb-s")]
    DvbS,
    #[value(name = "dvb-t")]
    DvbT,
}

impl NamespaceFilter {
    pub fn namespace(&self) -> u32 {
        match self {
            NamespaceFilter::DvbC => NS_DVB_C,
            NamespaceFilter::DvbS => NS_DVB_S,
            NamespaceFilter::DvbT => NS_DVB_T,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceTypeFilter {
    Tv,
    Hdtv,
    Radio,
    Uhd,
    Sd4,
    Opt,
}

impl ServiceTypeFilter {
    pub fn service_type(&self) -> u32 {
        match self {
            ServiceTypeFilter::Tv => SERVICE_TYPE_TV,
            ServiceTypeFilter::Hdtv => SERVICE_TYPE_HDTV,
            ServiceTypeFilter::Radio => SERVICE_TYPE_RADIO,
            ServiceTypeFilter::Uhd => SERVICE_TYPE_UHD,
            ServiceTypeFilter::Sd4 => SERVICE_TYPE_SD4,
            ServiceTypeFilter::Opt => SERVICE_TYPE_OPT,
        }
    }
}

/// Parse an original network ID given as `0x..` hex or decimal
pub fn parse_oid(value: &str) -> Result<u16, String> {
    let value = value.trim();
    let parsed = match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => value.parse::<u16>(),
    };
    parsed.map_err(|e| format!("invalid network ID {:?}: {}", value, e))
}

// =============================================================================
// Device Commands
// =============================================================================

#[derive(Args, Debug)]
pub struct AboutCmd {}

#[derive(Args, Debug)]
pub struct HasRestCmd {}

/// Switch to a service
#[derive(Args, Debug)]
pub struct ZapCmd {
    /// Service name as listed in the bouquets, or a service reference
    #[arg(required = true)]
    pub service: String,

    /// Resolve the name within this namespace only
    #[arg(long, value_enum)]
    pub ns: Option<NamespaceFilter>,
}

/// Change the power state
#[derive(Args, Debug)]
pub struct PowerCmd {
    /// toggle-standby, deep-standby, reboot, restart, wakeup, standby (or 0-5)
    #[arg(required = true)]
    pub state: PowerState,
}

/// Show a message on the receiver's screen
#[derive(Args, Debug)]
pub struct MessageCmd {
    /// Message text
    #[arg(required = true)]
    pub text: String,

    /// Display time in seconds, 0 keeps the message until dismissed
    #[arg(long, short = 't', default_value_t = crate::models::DEFAULT_MESSAGE_TIMEOUT)]
    pub timeout: u32,

    /// Message type
    #[arg(long = "type", value_enum, default_value = "info")]
    pub message_type: MessageKind,

    /// Ask a yes/no question and print the answer
    #[arg(long, conflicts_with = "message_type")]
    pub answer: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    YesNo,
    Info,
    Message,
    Attention,
}

impl From<MessageKind> for MessageType {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::YesNo => MessageType::YesNo,
            MessageKind::Info => MessageType::Info,
            MessageKind::Message => MessageType::Message,
            MessageKind::Attention => MessageType::Attention,
        }
    }
}

/// Dump the result of an arbitrary API call
#[derive(Args, Debug)]
pub struct ApiCmd {
    /// API endpoint, e.g. currenttime or getcurrent
    #[arg(required = true)]
    pub call: String,

    /// Query parameter as key=value (repeatable)
    #[arg(long, short = 'p', value_parser = parse_param)]
    pub param: Vec<(String, String)>,

    /// Only print this member of the response
    #[arg(long, short = 'k')]
    pub filter_key: Option<String>,
}

/// Parse a `key=value` query parameter
pub fn parse_param(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, val)) if !key.is_empty() => Ok((key.to_string(), val.to_string())),
        _ => Err(format!("expected key=value, got {:?}", value)),
    }
}

// =============================================================================
// JSON Output Types
// =============================================================================

/// Generic JSON output wrapper with status
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonOutput<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub exit_code: i32,
}

fn is_zero(n: &i32) -> bool {
    *n == 0
}

impl<T: Serialize> JsonOutput<T> {
    /// Create success output with data
    pub fn success(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            exit_code: 0,
        }
    }

    /// Create error output (no data)
    pub fn error_msg(msg: impl Into<String>, code: ExitCode) -> JsonOutput<()> {
        JsonOutput::<()> {
            data: None,
            error: Some(msg.into()),
            exit_code: code.into(),
        }
    }
}

// =============================================================================
// Output Helpers
// =============================================================================

/// Output handler for consistent formatting
pub struct Output {
    pub json: bool,
    pub quiet: bool,
    pub verbose: u8,
}

impl Output {
    pub fn new(cli: &Cli) -> Self {
        Self {
            json: cli.should_json(),
            quiet: cli.quiet,
            verbose: cli.verbose,
        }
    }

    /// Print success data as JSON
    pub fn print<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        let output = JsonOutput::success(data);
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    /// Print human readable text
    pub fn text(&self, text: impl std::fmt::Display) {
        println!("{}", text);
    }

    /// Print error and return exit code
    pub fn error(&self, msg: impl Into<String>, code: ExitCode) -> ExitCode {
        let msg = msg.into();
        if self.json {
            let output = JsonOutput::<()>::error_msg(&msg, code);
            if let Ok(json) = serde_json::to_string_pretty(&output) {
                eprintln!("{}", json);
            }
        } else if !self.quiet {
            eprintln!("Error: {}", msg);
        }
        code
    }

    /// Print info message (suppressed in quiet mode)
    pub fn info(&self, msg: impl std::fmt::Display) {
        if !self.quiet && !self.json {
            eprintln!("{}", msg);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
