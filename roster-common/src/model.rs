//! Canonical member data model
//!
//! Both roster sources (the officer-maintained spreadsheet and the xivapi
//! Lodestone mirror) are normalized into [`MemberRecord`] before any
//! comparison takes place.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lodestone character identifier, stable across name changes
pub type MemberId = u64;

/// Join date as recorded in the spreadsheet
///
/// `Unknown` is a valid, reportable state and never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinDate {
    Known(NaiveDate),
    Unknown,
}

impl JoinDate {
    /// Returns the calendar date if known
    pub fn known(&self) -> Option<NaiveDate> {
        match self {
            JoinDate::Known(date) => Some(*date),
            JoinDate::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, JoinDate::Unknown)
    }
}

impl From<Option<NaiveDate>> for JoinDate {
    fn from(date: Option<NaiveDate>) -> Self {
        date.map_or(JoinDate::Unknown, JoinDate::Known)
    }
}

impl fmt::Display for JoinDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JoinDate::Known(date) => write!(f, "{}", date.format("%m/%d/%Y")),
            JoinDate::Unknown => f.write_str("Unknown"),
        }
    }
}

/// Canonical member record produced by both normalizers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRecord {
    pub id: MemberId,
    /// Display name (empty if the source omitted it)
    pub name: String,
    /// Free company rank label
    pub rank: String,
    pub join_date: JoinDate,
}

impl MemberRecord {
    pub fn new(
        id: MemberId,
        name: impl Into<String>,
        rank: impl Into<String>,
        join_date: JoinDate,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            rank: rank.into(),
            join_date,
        }
    }
}

/// One entry of the xivapi `FreeCompanyMembers` list
///
/// Only the fields the reconciliation needs are kept; avatar, server and
/// rank icon are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RemoteMember {
    #[serde(rename = "ID")]
    pub id: MemberId,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Rank", default)]
    pub rank: String,
}
