//! roster-check - Free company roster checker
//!
//! Compares the officer-maintained member spreadsheet against the live
//! Lodestone roster (via xivapi) and prints what needs attention:
//! new and departed members, name and rank changes, promotion candidates,
//! and members missing a join date.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use roster_check::oauth::{Authorizer, ClientSecrets, FileTokenStore};
use roster_check::pipeline::{self, RunOptions};
use roster_check::sheets::SheetsClient;
use roster_check::xivapi::XivApiClient;
use roster_common::config;
use roster_common::{Error, Report};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Report output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Command-line arguments for roster-check
#[derive(Parser, Debug)]
#[command(name = "roster-check")]
#[command(about = "Reconcile the free company spreadsheet against the Lodestone")]
#[command(version)]
struct Args {
    /// Config file (TOML); ROSTER_CHECK_CONFIG is used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reference date for promotion checks (YYYY-MM-DD), defaults to today
    #[arg(long)]
    today: Option<NaiveDate>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Abort on a malformed spreadsheet row instead of skipping it
    #[arg(long)]
    strict_rows: bool,

    /// Exit without waiting for Enter
    #[arg(long)]
    no_pause: bool,

    /// Log level (overridden by RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();
}

/// Render the report for stdout
fn render_report(report: &Report, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Text => Ok(format!("{}\n\n{}", report.date_banner(), report)),
        OutputFormat::Json => serde_json::to_string_pretty(report).map(|json| json + "\n"),
    }
}

/// Write `message` to `prompt` and read one line of input
///
/// Prompts go to stderr so stdout carries nothing but the report.
fn ask<W: Write, R: BufRead>(prompt: &mut W, input: &mut R, message: &str) -> io::Result<String> {
    write!(prompt, "{}", message)?;
    prompt.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line)
}

/// Print the authorization URL and read the pasted code from stdin
fn prompt_for_code(url: &str) -> io::Result<String> {
    let message = format!(
        "Open the following URL in the browser and enter the resulting code \
         after authorization:\n{}\n",
        url
    );
    ask(&mut io::stderr().lock(), &mut io::stdin().lock(), &message)
}

fn wait_for_enter() -> io::Result<()> {
    ask(&mut io::stderr().lock(), &mut io::stdin().lock(), "Press enter to quit.")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let loaded = config::load_config(args.config.as_deref()).context("Failed to load config")?;
    let toml_config = loaded.config;

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| toml_config.logging.level.clone());
    init_tracing(&level);

    info!(
        "Starting roster-check v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &loaded.source {
        Some(path) => info!("Config: {}", path.display()),
        None => warn!("No config file found, using built-in defaults"),
    }

    let options = RunOptions {
        today: args.today.unwrap_or_else(pipeline::today_local),
        strict_rows: args.strict_rows,
    };

    info!("Authenticating with Google");
    let secrets = ClientSecrets::from_file(&toml_config.oauth.credentials_path)
        .context("Failed to load OAuth client secrets")?;
    let authorizer = Authorizer::new(
        secrets,
        FileTokenStore::new(&toml_config.oauth.token_path),
        toml_config.oauth.redirect_uri.clone(),
    )?;
    let access_token = authorizer
        .authorize(prompt_for_code)
        .await
        .map_err(|e| Error::source_unavailable("Google OAuth", e))
        .context("Google authorization failed")?;

    let sheets = SheetsClient::with_base_url(&toml_config.spreadsheet.api_base_url, access_token)?;
    let xivapi = XivApiClient::with_base_url(&toml_config.lodestone.api_base_url)?;

    let outcome = pipeline::run(&toml_config, &sheets, &xivapi, &options)
        .await
        .context("Roster check aborted")?;

    let mut stdout = io::stdout().lock();
    stdout.write_all(render_report(&outcome.report, args.format)?.as_bytes())?;
    stdout.flush()?;
    drop(stdout);

    if !args.no_pause {
        wait_for_enter()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_common::ReconciliationResult;

    fn report() -> Report {
        let today = NaiveDate::from_ymd_opt(2020, 3, 1).unwrap();
        Report::assemble(&ReconciliationResult::default(), today)
    }

    #[test]
    fn test_json_output_is_only_json() {
        let rendered = render_report(&report(), OutputFormat::Json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(parsed["sections"].as_array().unwrap().len(), 6);
        assert!(!rendered.contains("Press enter"));
    }

    #[test]
    fn test_text_output_starts_with_banner() {
        let rendered = render_report(&report(), OutputFormat::Text).unwrap();
        assert!(rendered.starts_with("Today's date is 3/1/2020.\n\nNew Members\n"));
    }

    #[test]
    fn test_ask_writes_prompt_to_given_stream() {
        let mut prompt = Vec::new();
        let mut input = io::Cursor::new(b"4/abc\nextra\n".to_vec());

        let line = ask(&mut prompt, &mut input, "Press enter to quit.").unwrap();

        assert_eq!(line, "4/abc\n");
        assert_eq!(String::from_utf8(prompt).unwrap(), "Press enter to quit.");
    }
}
