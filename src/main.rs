//! eha - enigma2 HTTP API utilities
//!
//! # Usage
//!
//! ```bash
//! eha epg-search "blade runner" -v
//! eha timer-list -vv
//! eha -a 192.168.1.20 service-list --ns dvb-s --dump services.json
//! eha --dry-run zap "ZDF HD"
//! ```

use clap::Parser;

use eha::api::Enigma2Client;
use eha::cli::{Cli, Command, ExitCode, Output};
use eha::commands;
use eha::config::Config;
use eha::logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_cli_logger(cli.verbose);

    let exit_code = run_cli(cli).await;
    std::process::exit(exit_code.into());
}

/// Run CLI command and return exit code
async fn run_cli(cli: Cli) -> ExitCode {
    let output = Output::new(&cli);

    let config = match &cli.config {
        Some(path) => match Config::load_from(path) {
            Ok(config) => config,
            Err(e) => return output.error(format!("{:#}", e), ExitCode::InvalidArgs),
        },
        None => Config::load(),
    };

    let timezone = match config.timezone(cli.timezone.as_deref()) {
        Ok(timezone) => timezone,
        Err(e) => return output.error(e.to_string(), ExitCode::InvalidArgs),
    };

    let client = Enigma2Client::new(config.remote_addr(cli.remote_addr.as_deref()))
        .timezone(timezone)
        .dry_run(cli.dry_run)
        .dump_requests(cli.dump_requests.clone().or_else(|| config.dump_requests.clone()));

    match cli.command {
        Command::EpgSearch(cmd) => commands::epg_search_cmd(cmd, &client, &config, &output).await,

        Command::TimerList(cmd) => commands::timer_list_cmd(cmd, &client, &output).await,

        Command::MovieList(cmd) => commands::movie_list_cmd(cmd, &client, &output).await,

        Command::ServiceList(cmd) => commands::service_list_cmd(cmd, &client, &output).await,

        Command::About(cmd) => commands::about_cmd(cmd, &client, &output).await,

        Command::HasRest(cmd) => commands::has_rest_cmd(cmd, &client, &output).await,

        Command::Zap(cmd) => commands::zap_cmd(cmd, &client, &output).await,

        Command::Power(cmd) => commands::power_cmd(cmd, &client, &output).await,

        Command::Message(cmd) => commands::message_cmd(cmd, &client, &output).await,

        Command::Api(cmd) => commands::api_cmd(cmd, &client, &output).await,
    }
}
