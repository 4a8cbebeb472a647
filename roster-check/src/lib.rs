//! roster-check library interface
//!
//! Collaborators that feed the reconciliation core:
//! - OAuth2 installed-app authorization for the Google Sheets API
//! - Google Sheets values client (officer spreadsheet)
//! - xivapi client (Lodestone free company member list)
//! - The run pipeline tying fetch, reconcile and report together

pub mod oauth;
pub mod pipeline;
pub mod sheets;
pub mod xivapi;

/// User agent sent to every remote API
pub const USER_AGENT: &str = concat!("roster-check/", env!("CARGO_PKG_VERSION"));

/// Per-request timeout for every remote API
pub const HTTP_TIMEOUT_SECS: u64 = 30;
