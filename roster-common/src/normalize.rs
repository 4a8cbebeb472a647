//! Row and remote-record normalization
//!
//! Converts raw spreadsheet rows and xivapi member objects into the
//! canonical [`MemberRecord`].
//!
//! Spreadsheet rows are positional; the column map decides which cell holds
//! which field. The Sheets API drops trailing empty cells, so a short row is
//! read as if the missing cells were empty strings.

use crate::config::ColumnMap;
use crate::model::{JoinDate, MemberId, MemberRecord, RemoteMember};
use crate::{Error, Result};
use chrono::NaiveDate;
use tracing::warn;

/// Join dates are entered month first, e.g. `03/15/2020`
const JOIN_DATE_FORMAT: &str = "%m/%d/%Y";

/// Two-digit year variant, e.g. `3/15/20`
const JOIN_DATE_FORMAT_SHORT_YEAR: &str = "%m/%d/%y";

/// Parse a `MM/DD/YYYY` join date
///
/// A two-digit year is expanded by chrono's `%y` rule (`20` is 2020). Any
/// other year width is `MalformedDate`, since `%Y` alone would read `20` as
/// the year 20.
pub fn parse_join_date(text: &str) -> Result<NaiveDate> {
    let trimmed = text.trim();
    let malformed = || Error::MalformedDate(text.to_string());

    let year = trimmed.rsplit('/').next().unwrap_or_default();
    if !year.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    let format = match year.len() {
        4 => JOIN_DATE_FORMAT,
        2 => JOIN_DATE_FORMAT_SHORT_YEAR,
        _ => return Err(malformed()),
    };

    NaiveDate::parse_from_str(trimmed, format).map_err(|_| malformed())
}

/// Pick the join date from the primary column, falling back to the
/// secondary column when the primary cell is empty
///
/// Both empty is `Unknown`. A non-empty cell that fails to parse is
/// `MalformedDate`.
pub fn resolve_join_date(primary: &str, secondary: &str) -> Result<JoinDate> {
    let text = if primary.trim().is_empty() {
        secondary
    } else {
        primary
    };

    if text.trim().is_empty() {
        return Ok(JoinDate::Unknown);
    }

    parse_join_date(text).map(JoinDate::Known)
}

/// Parse the member identifier cell
pub fn parse_member_id(row_number: usize, text: &str) -> Result<MemberId> {
    text.trim()
        .parse::<MemberId>()
        .map_err(|_| Error::MalformedIdentifier {
            row: row_number,
            value: text.to_string(),
        })
}

fn cell<S: AsRef<str>>(row: &[S], index: usize) -> &str {
    row.get(index).map(|c| c.as_ref()).unwrap_or("")
}

/// Normalize one spreadsheet row
///
/// `row_number` is only used for diagnostics. Fails with
/// `MalformedIdentifier` when the id cell is missing or not an integer. An
/// unparseable join date is logged and degraded to `Unknown`.
pub fn normalize_row<S: AsRef<str>>(
    row_number: usize,
    row: &[S],
    columns: &ColumnMap,
) -> Result<MemberRecord> {
    let id = parse_member_id(row_number, cell(row, columns.id))?;
    let name = cell(row, columns.name);
    let rank = cell(row, columns.rank);

    let join_date = match resolve_join_date(
        cell(row, columns.join_date_primary),
        cell(row, columns.join_date_secondary),
    ) {
        Ok(date) => date,
        Err(e) => {
            warn!(row = row_number, id, name = %name, "{}; treating join date as unknown", e);
            JoinDate::Unknown
        }
    };

    Ok(MemberRecord::new(id, name, rank, join_date))
}

/// Normalize one xivapi member
///
/// The Lodestone carries no join dates, so the result is always `Unknown`.
pub fn normalize_remote(member: &RemoteMember) -> MemberRecord {
    MemberRecord::new(member.id, &*member.name, &*member.rank, JoinDate::Unknown)
}

impl From<RemoteMember> for MemberRecord {
    fn from(member: RemoteMember) -> Self {
        MemberRecord::new(member.id, member.name, member.rank, JoinDate::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// A row laid out like the default column map (A..I)
    fn sheet_row(name: &str, rank: &str, secondary: &str, primary: &str, id: &str) -> Vec<String> {
        vec![
            name.to_string(),
            "Balmung".to_string(),
            rank.to_string(),
            String::new(),
            secondary.to_string(),
            primary.to_string(),
            String::new(),
            String::new(),
            id.to_string(),
        ]
    }

    #[test]
    fn test_parse_join_date_month_first() {
        assert_eq!(parse_join_date("03/15/2020").unwrap(), date(2020, 3, 15));
        assert_eq!(parse_join_date("12/01/2019").unwrap(), date(2019, 12, 1));
    }

    #[test]
    fn test_parse_join_date_unpadded_and_whitespace() {
        assert_eq!(parse_join_date("3/5/2020").unwrap(), date(2020, 3, 5));
        assert_eq!(parse_join_date(" 03/15/2020 ").unwrap(), date(2020, 3, 15));
    }

    #[test]
    fn test_parse_join_date_rejects_garbage() {
        assert!(matches!(parse_join_date("soon"), Err(Error::MalformedDate(_))));
        assert!(matches!(parse_join_date("15/03/2020"), Err(Error::MalformedDate(_))));
        assert!(matches!(parse_join_date("2020-03-15"), Err(Error::MalformedDate(_))));
    }

    #[test]
    fn test_parse_join_date_two_digit_year() {
        assert_eq!(parse_join_date("3/15/20").unwrap(), date(2020, 3, 15));
        assert_eq!(parse_join_date("12/01/19").unwrap(), date(2019, 12, 1));
    }

    #[test]
    fn test_parse_join_date_rejects_odd_year_widths() {
        for text in ["3/15/20200", "3/15/020", "3/15/2", "3/15/+2020", "3/15/"] {
            assert!(
                matches!(parse_join_date(text), Err(Error::MalformedDate(_))),
                "{text} should be rejected"
            );
        }
    }

    #[test]
    fn test_resolve_join_date_prefers_primary() {
        let resolved = resolve_join_date("01/02/2021", "03/15/2020").unwrap();
        assert_eq!(resolved, JoinDate::Known(date(2021, 1, 2)));
    }

    #[test]
    fn test_resolve_join_date_falls_back_to_secondary() {
        let resolved = resolve_join_date("", "03/15/2020").unwrap();
        assert_eq!(resolved, JoinDate::Known(date(2020, 3, 15)));
    }

    #[test]
    fn test_resolve_join_date_both_empty_is_unknown() {
        assert_eq!(resolve_join_date("", "").unwrap(), JoinDate::Unknown);
        assert_eq!(resolve_join_date("  ", "").unwrap(), JoinDate::Unknown);
    }

    #[test]
    fn test_resolve_join_date_no_fallback_on_malformed_primary() {
        let resolved = resolve_join_date("TBD", "03/15/2020");
        assert!(matches!(resolved, Err(Error::MalformedDate(_))));
    }

    #[test]
    fn test_normalize_row_reads_mapped_columns() {
        let row = sheet_row("Alice Quill", "New Recruit", "", "01/01/2020", "1001");
        let record = normalize_row(2, &row, &ColumnMap::default()).unwrap();

        assert_eq!(record.id, 1001);
        assert_eq!(record.name, "Alice Quill");
        assert_eq!(record.rank, "New Recruit");
        assert_eq!(record.join_date, JoinDate::Known(date(2020, 1, 1)));
    }

    #[test]
    fn test_normalize_row_secondary_date_fallback() {
        let row = sheet_row("Bob", "Member", "03/15/2020", "", "7");
        let record = normalize_row(2, &row, &ColumnMap::default()).unwrap();
        assert_eq!(record.join_date, JoinDate::Known(date(2020, 3, 15)));
    }

    #[test]
    fn test_normalize_row_malformed_date_becomes_unknown() {
        let row = sheet_row("Bob", "Member", "", "last spring", "7");
        let record = normalize_row(2, &row, &ColumnMap::default()).unwrap();
        assert_eq!(record.join_date, JoinDate::Unknown);
    }

    #[test]
    fn test_normalize_row_malformed_id() {
        let row = sheet_row("Bob", "Member", "", "", "abc");
        let err = normalize_row(5, &row, &ColumnMap::default()).unwrap_err();
        match err {
            Error::MalformedIdentifier { row, value } => {
                assert_eq!(row, 5);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_normalize_row_short_row() {
        // Sheets API trims trailing empty cells; the id column is gone here
        let row = vec!["Carol".to_string(), String::new(), "Member".to_string()];
        assert!(matches!(
            normalize_row(3, &row, &ColumnMap::default()),
            Err(Error::MalformedIdentifier { .. })
        ));

        let columns = ColumnMap {
            id: 1,
            ..Default::default()
        };
        let row = vec!["Carol", "42", "Member"];
        let record = normalize_row(3, &row, &columns).unwrap();
        assert_eq!(record.id, 42);
        assert_eq!(record.join_date, JoinDate::Unknown);
    }

    #[test]
    fn test_normalize_row_is_idempotent() {
        let row = sheet_row("Alice", "New Recruit", "02/02/2020", "", "1");
        let columns = ColumnMap::default();
        let first = normalize_row(2, &row, &columns).unwrap();
        let second = normalize_row(2, &row, &columns).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_normalize_remote_has_unknown_date() {
        let member = RemoteMember {
            id: 99,
            name: "Dana".to_string(),
            rank: "Officer".to_string(),
        };
        let record = normalize_remote(&member);
        assert_eq!(record, MemberRecord::new(99, "Dana", "Officer", JoinDate::Unknown));
        assert_eq!(MemberRecord::from(member), record);
    }
}
