use std::time::Duration;

use clap::{Arg, ArgMatches, Command};

use librestoredb::config::ApiConfig;
use librestoredb::error::RestoreError;
use librestoredb::model::UploadMetadata;

pub const HOST_ARG: &str = "host";
pub const API_KEY_ARG: &str = "api-key";

/// `--host` and `--api-key`, shared by every command that talks to the server
pub fn with_server_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(HOST_ARG)
                .long("host")
                .help("RestoreDB server to talk to, for example 'https://restore.example.com'. Overrides the config file.")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new(API_KEY_ARG)
                .long("api-key")
                .help("API key sent as X-API-Key. Overrides the config file.")
                .action(clap::ArgAction::Set),
        )
}

/// Config file and environment, then the command line on top
pub fn api_config(args: &ArgMatches) -> Result<ApiConfig, RestoreError> {
    let mut config = ApiConfig::get()?;
    if let Some(host) = args.get_one::<String>(HOST_ARG) {
        config.set_host(host);
    }
    if let Some(api_key) = args.get_one::<String>(API_KEY_ARG) {
        config.set_api_key(api_key);
    }
    log::debug!("using RestoreDB server {}", config.host);
    Ok(config)
}

/// Parses a `key=value` pair given with `--meta`
pub fn parse_metadata_pair(pair: &str) -> Result<(String, String), RestoreError> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(RestoreError::basic_str(format!(
            "Invalid metadata '{pair}', expected key=value"
        ))),
    }
}

pub fn parse_metadata<'a>(
    pairs: impl IntoIterator<Item = &'a String>,
) -> Result<UploadMetadata, RestoreError> {
    let mut metadata = UploadMetadata::new();
    for pair in pairs {
        let (key, value) = parse_metadata_pair(pair)?;
        metadata.insert(key, value);
    }
    Ok(metadata)
}

/// Human readable transfer rate: B/s, KB/s, MB/s or GB/s
pub fn format_speed(bytes_per_sec: f64) -> String {
    const UNITS: [&str; 4] = ["B/s", "KB/s", "MB/s", "GB/s"];
    if !bytes_per_sec.is_finite() || bytes_per_sec <= 0.0 {
        return "0 B/s".to_string();
    }

    let mut speed = bytes_per_sec;
    let mut unit = 0;
    while speed >= 1024.0 && unit < UNITS.len() - 1 {
        speed /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{speed:.0} {}", UNITS[unit])
    } else {
        format!("{speed:.1} {}", UNITS[unit])
    }
}

/// Time left for `remaining_bytes` at the current rate, `None` until there
/// is a rate to go by
pub fn estimate_remaining(remaining_bytes: u64, bytes_per_sec: f64) -> Option<Duration> {
    if !bytes_per_sec.is_finite() || bytes_per_sec <= 0.0 {
        return None;
    }
    Some(Duration::from_secs(
        (remaining_bytes as f64 / bytes_per_sec).ceil() as u64,
    ))
}

pub fn format_eta(eta: Option<Duration>) -> String {
    match eta {
        Some(eta) => humantime::format_duration(eta).to_string(),
        None => "--".to_string(),
    }
}
