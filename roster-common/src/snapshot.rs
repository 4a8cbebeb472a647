//! Keyed roster snapshots
//!
//! A [`Snapshot`] maps member id to [`MemberRecord`] and iterates in
//! insertion order. Re-inserting an existing id replaces the record in
//! place (last write wins) and keeps the id's original position.

use crate::config::ColumnMap;
use crate::model::{MemberId, MemberRecord, RemoteMember};
use crate::normalize::{normalize_remote, normalize_row};
use crate::{Error, Result};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Point-in-time keyed capture of one roster
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    records: Vec<MemberRecord>,
    index: HashMap<MemberId, usize>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record, replacing any earlier record with the same id
    ///
    /// Returns the replaced record, if any.
    pub fn insert(&mut self, record: MemberRecord) -> Option<MemberRecord> {
        match self.index.get(&record.id) {
            Some(&pos) => {
                debug!(id = record.id, "Duplicate member id, keeping later record");
                Some(std::mem::replace(&mut self.records[pos], record))
            }
            None => {
                self.index.insert(record.id, self.records.len());
                self.records.push(record);
                None
            }
        }
    }

    pub fn get(&self, id: MemberId) -> Option<&MemberRecord> {
        self.index.get(&id).map(|&pos| &self.records[pos])
    }

    pub fn contains(&self, id: MemberId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, MemberRecord> {
        self.records.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = MemberId> + '_ {
        self.records.iter().map(|r| r.id)
    }
}

impl FromIterator<MemberRecord> for Snapshot {
    fn from_iter<I: IntoIterator<Item = MemberRecord>>(iter: I) -> Self {
        let mut snapshot = Snapshot::new();
        for record in iter {
            snapshot.insert(record);
        }
        snapshot
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a MemberRecord;
    type IntoIter = std::slice::Iter<'a, MemberRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl IntoIterator for Snapshot {
    type Item = MemberRecord;
    type IntoIter = std::vec::IntoIter<MemberRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

/// A spreadsheet row that could not be normalized
#[derive(Debug)]
pub struct RowRejection {
    /// Sheet row number (1-based, as shown in the spreadsheet UI)
    pub row: usize,
    pub error: Error,
}

/// Spreadsheet snapshot plus the rows that were skipped while building it
#[derive(Debug, Default)]
pub struct SheetSnapshot {
    pub snapshot: Snapshot,
    pub rejected: Vec<RowRejection>,
}

/// Build the spreadsheet snapshot
///
/// `first_row` is the sheet row number of `rows[0]` (2 when the header row
/// is excluded from the fetched range). Rows with a malformed identifier
/// are skipped with a warning and reported in `rejected`.
pub fn build_sheet_snapshot<S: AsRef<str>>(
    rows: &[Vec<S>],
    first_row: usize,
    columns: &ColumnMap,
) -> SheetSnapshot {
    let mut built = SheetSnapshot::default();

    for (offset, row) in rows.iter().enumerate() {
        let row_number = first_row + offset;
        match normalize_row(row_number, row, columns) {
            Ok(record) => {
                built.snapshot.insert(record);
            }
            Err(error) => {
                warn!(row = row_number, "Skipping spreadsheet row: {}", error);
                built.rejected.push(RowRejection {
                    row: row_number,
                    error,
                });
            }
        }
    }

    built
}

/// Build the remote (Lodestone) snapshot
pub fn build_remote_snapshot(members: &[RemoteMember]) -> Snapshot {
    members.iter().map(normalize_remote).collect()
}

/// Build a snapshot, failing on the first malformed row
///
/// For callers that prefer aborting over skipping.
pub fn build_sheet_snapshot_strict<S: AsRef<str>>(
    rows: &[Vec<S>],
    first_row: usize,
    columns: &ColumnMap,
) -> Result<Snapshot> {
    rows.iter()
        .enumerate()
        .map(|(offset, row)| normalize_row(first_row + offset, row, columns))
        .collect()
}
