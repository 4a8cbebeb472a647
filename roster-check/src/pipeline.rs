//! Run pipeline
//!
//! fetch (both rosters, concurrently) → normalize → snapshot → reconcile →
//! report. Any fetch failure aborts the run before a report exists.

use crate::sheets::SheetsClient;
use crate::xivapi::XivApiClient;
use chrono::{Local, NaiveDate};
use roster_common::config::{ReconcileConfig, TomlConfig};
use roster_common::snapshot::{
    build_remote_snapshot, build_sheet_snapshot, build_sheet_snapshot_strict,
};
use roster_common::{reconcile, Error, ReconciliationResult, RemoteMember, Report, Result};
use tracing::{info, warn};

/// Target free company (FullMetal Alliance)
pub const FREE_COMPANY_ID: &str = "9232097761132854687";

/// Officer roster spreadsheet
pub const SPREADSHEET_ID: &str = "1i09Ey3KFzvJENkToV1o5bSh89AML85fW6cz0o0IMgI0";

/// Member rows, header excluded
pub const SHEET_RANGE: &str = "Members (Condensed)!A2:I";

/// Sheet row number of the first fetched row
pub const SHEET_FIRST_ROW: usize = 2;

/// Per-run options that do not come from the config file
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Reference date for promotion arithmetic
    pub today: NaiveDate,
    /// Abort on the first malformed spreadsheet row instead of skipping it
    pub strict_rows: bool,
}

impl RunOptions {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            strict_rows: false,
        }
    }
}

/// Everything a run produces
#[derive(Debug)]
pub struct RunOutcome {
    pub report: Report,
    pub result: ReconciliationResult,
    /// Spreadsheet rows skipped because their id cell was malformed
    pub rejected_rows: usize,
}

/// Today's local calendar date, time of day discarded
pub fn today_local() -> NaiveDate {
    Local::now().date_naive()
}

/// Fetch both rosters concurrently
pub async fn fetch_rosters(
    sheets: &SheetsClient,
    xivapi: &XivApiClient,
) -> Result<(Vec<Vec<String>>, Vec<RemoteMember>)> {
    info!("Retrieving free company members from spreadsheet and xivapi");

    let sheet_fetch = async {
        sheets
            .fetch_rows(SPREADSHEET_ID, SHEET_RANGE)
            .await
            .map_err(|e| Error::source_unavailable("Google Sheets", e))
    };
    let remote_fetch = async {
        xivapi
            .fetch_members(FREE_COMPANY_ID)
            .await
            .map_err(|e| Error::source_unavailable("xivapi", e))
    };

    tokio::try_join!(sheet_fetch, remote_fetch)
}

/// Reconcile already-fetched rosters and assemble the report
pub fn reconcile_rosters(
    rows: &[Vec<String>],
    members: &[RemoteMember],
    config: &ReconcileConfig,
    options: &RunOptions,
) -> Result<RunOutcome> {
    let (sheet, rejected_rows) = if options.strict_rows {
        (build_sheet_snapshot_strict(rows, SHEET_FIRST_ROW, &config.columns)?, 0)
    } else {
        let built = build_sheet_snapshot(rows, SHEET_FIRST_ROW, &config.columns);
        if !built.rejected.is_empty() {
            warn!(
                "{} spreadsheet row(s) skipped because of a malformed ID",
                built.rejected.len()
            );
        }
        (built.snapshot, built.rejected.len())
    };
    let remote = build_remote_snapshot(members);

    info!(
        spreadsheet_members = sheet.len(),
        lodestone_members = remote.len(),
        "Snapshots built"
    );

    let result = reconcile(&remote, &sheet, options.today, config);
    let report = Report::assemble(&result, options.today);

    Ok(RunOutcome {
        report,
        result,
        rejected_rows,
    })
}

/// Full run against live clients
pub async fn run(
    config: &TomlConfig,
    sheets: &SheetsClient,
    xivapi: &XivApiClient,
    options: &RunOptions,
) -> Result<RunOutcome> {
    let (rows, members) = fetch_rosters(sheets, xivapi).await?;
    reconcile_rosters(&rows, &members, &config.reconcile, options)
}
