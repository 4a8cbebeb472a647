//! # Roster Common Library
//!
//! Shared code for the free company roster checker:
//! - Canonical member records and keyed snapshots
//! - Spreadsheet row and remote member normalization
//! - The reconciliation engine and its typed observations
//! - Report assembly for presentation
//! - Configuration loading

pub mod config;
pub mod error;
pub mod model;
pub mod normalize;
pub mod reconcile;
pub mod report;
pub mod snapshot;

pub use error::{Error, Result};
pub use model::{JoinDate, MemberId, MemberRecord, RemoteMember};
pub use reconcile::{reconcile, Observation, ReconciliationResult};
pub use report::{Report, Section};
pub use snapshot::Snapshot;
