//! CLI for sending files to remote processing services.

mod commands;

use anyhow::{Context, Result};
use cbi_core::config::{self, CbiConfig};
use cbi_core::processor::DEFAULT_PART_NAME;
use cbi_core::TimeUnit;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use commands::{run_checksum, run_process, run_send};

/// Top-level CLI for the CBI client.
#[derive(Debug, Parser)]
#[command(name = "cbi")]
#[command(about = "CBI: submit files to remote signing and packaging services", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Send a file to a processing service and replace it with the result.
    Process {
        /// File to process in place.
        file: PathBuf,

        /// Service URL (defaults to `server_url` from the config file).
        #[arg(long)]
        url: Option<String>,

        /// Form part name carrying the file.
        #[arg(long, default_value = DEFAULT_PART_NAME, value_name = "NAME")]
        part: String,

        /// Extra text parameter, repeatable.
        #[arg(long = "param", value_name = "NAME=VALUE", value_parser = parse_key_value)]
        params: Vec<(String, String)>,

        #[command(flatten)]
        transfer: TransferOptions,
    },

    /// Send an arbitrary multipart request and save a successful response.
    Send {
        /// Service URL (defaults to `server_url` from the config file).
        #[arg(long)]
        url: Option<String>,

        /// File parameter, repeatable.
        #[arg(long = "file", value_name = "NAME=PATH", value_parser = parse_key_path)]
        files: Vec<(String, PathBuf)>,

        /// Text parameter, repeatable.
        #[arg(long = "param", value_name = "NAME=VALUE", value_parser = parse_key_value)]
        params: Vec<(String, String)>,

        /// Where the response body is written.
        #[arg(long, value_name = "PATH")]
        output: PathBuf,

        #[command(flatten)]
        transfer: TransferOptions,
    },

    /// Compute SHA-256 of a file (e.g. after processing).
    Checksum {
        /// Path to the file.
        path: PathBuf,
    },
}

/// Flags overriding the `[transport]` and `[retry]` config sections.
#[derive(Debug, Clone, Default, Args)]
pub struct TransferOptions {
    /// Retries after a failed attempt.
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub retries: Option<i64>,

    /// Wait between attempts, in `--retry-unit`s.
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub retry_interval: Option<i64>,

    /// Unit of `--retry-interval`: milliseconds, seconds or minutes.
    #[arg(long, value_name = "UNIT", value_parser = parse_time_unit)]
    pub retry_unit: Option<TimeUnit>,

    /// Bound on a whole attempt in milliseconds (0 = unbounded).
    #[arg(long, value_name = "MILLIS")]
    pub timeout_millis: Option<u64>,
}

impl TransferOptions {
    pub fn apply(&self, cfg: &mut CbiConfig) {
        if let Some(retries) = self.retries {
            cfg.retry.max_retries = retries;
        }
        if let Some(interval) = self.retry_interval {
            cfg.retry.retry_interval = interval;
        }
        if let Some(unit) = self.retry_unit {
            cfg.retry.retry_interval_unit = unit;
        }
        if let Some(millis) = self.timeout_millis {
            cfg.transport.timeout_millis = millis;
        }
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{s}'")),
    }
}

fn parse_key_path(s: &str) -> Result<(String, PathBuf), String> {
    let (name, path) = parse_key_value(s)?;
    if path.is_empty() {
        return Err(format!("expected NAME=PATH, got '{s}'"));
    }
    Ok((name, PathBuf::from(path)))
}

fn parse_time_unit(s: &str) -> Result<TimeUnit, String> {
    match s.to_ascii_lowercase().as_str() {
        "ms" | "millis" | "milliseconds" => Ok(TimeUnit::Milliseconds),
        "s" | "secs" | "seconds" => Ok(TimeUnit::Seconds),
        "m" | "mins" | "minutes" => Ok(TimeUnit::Minutes),
        _ => Err(format!("unknown time unit '{s}'")),
    }
}

fn service_url(flag: Option<String>, cfg: &CbiConfig) -> Result<String> {
    flag.or_else(|| cfg.server_url.clone())
        .context("no --url given and no server_url in the config file")
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let mut cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Process {
                file,
                url,
                part,
                params,
                transfer,
            } => {
                transfer.apply(&mut cfg);
                let url = service_url(url, &cfg)?;
                run_process(&cfg, &file, &url, &part, &params)?;
            }
            CliCommand::Send {
                url,
                files,
                params,
                output,
                transfer,
            } => {
                transfer.apply(&mut cfg);
                let url = service_url(url, &cfg)?;
                run_send(&cfg, &url, &files, &params, &output)?;
            }
            CliCommand::Checksum { path } => run_checksum(&path)?,
        }

        Ok(())
    }
}
