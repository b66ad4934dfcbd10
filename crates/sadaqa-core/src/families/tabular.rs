//! Family extraction from spreadsheet-shaped rows.
//!
//! The first row is treated as a header when one of its cells names the
//! family column; otherwise every row is scanned for name-like, numeric,
//! and short text cells.

use std::sync::LazyLock;

use regex::Regex;

use crate::keywords::{
    contains_any, CELL_HIGH_PRIORITY, CELL_LOW_PRIORITY, DISTRICT_HEADERS, MEMBERS_HEADERS,
    NAME_HEADERS, NEEDS_HEADERS, PRIORITY_HEADERS,
};
use crate::models::{FamilyRecord, Priority, UNSPECIFIED_DISTRICT};

/// A capitalised word followed by at least one more capitalised word.
pub(crate) static PROPER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\p{Lu}\p{Ll}+(?:\s+\p{Lu}\p{Ll}+)+").unwrap());

static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[0-9]+").unwrap());
static ALL_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]+$").unwrap());

/// Column positions found in a header row. `None` means absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderColumns {
    pub name: Option<usize>,
    pub district: Option<usize>,
    pub members: Option<usize>,
    pub needs: Option<usize>,
    pub priority: Option<usize>,
}

/// Locate family columns in a header row.
pub fn detect_header(header: &[String]) -> HeaderColumns {
    let header: Vec<String> = header.iter().map(|c| c.trim().to_lowercase()).collect();
    HeaderColumns {
        name: find_column(&header, NAME_HEADERS),
        district: find_column(&header, DISTRICT_HEADERS),
        members: find_column(&header, MEMBERS_HEADERS),
        needs: find_column(&header, NEEDS_HEADERS),
        priority: find_column(&header, PRIORITY_HEADERS),
    }
}

/// Index of the first header cell containing any of `keywords`.
fn find_column(header: &[String], keywords: &[&str]) -> Option<usize> {
    header.iter().position(|cell| contains_any(cell, keywords))
}

fn cell<'a>(row: &'a [String], idx: Option<usize>) -> &'a str {
    idx.and_then(|i| row.get(i)).map(|s| s.trim()).unwrap_or("")
}

/// First run of ASCII digits, or 0.
pub(crate) fn parse_members(value: &str) -> u32 {
    DIGIT_RUN
        .find(value)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0)
}

fn parse_needs(value: &str) -> Vec<String> {
    value
        .split([',', ';', '|'])
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect()
}

fn parse_priority(value: &str) -> Priority {
    let value = value.to_lowercase();
    if contains_any(&value, CELL_HIGH_PRIORITY) {
        Priority::High
    } else if contains_any(&value, CELL_LOW_PRIORITY) {
        Priority::Low
    } else {
        Priority::Medium
    }
}

/// Extract families from data rows using known header columns.
///
/// `rows[0]` is the header and is skipped. Rows whose name is shorter than
/// two characters are ignored.
pub fn extract_with_header(rows: &[Vec<String>], columns: HeaderColumns) -> Vec<FamilyRecord> {
    rows.iter()
        .skip(1)
        .filter_map(|row| {
            let name = cell(row, columns.name);
            FamilyRecord::new(
                name,
                cell(row, columns.district),
                parse_members(cell(row, columns.members)),
                parse_needs(cell(row, columns.needs)),
                parse_priority(cell(row, columns.priority)),
            )
        })
        .collect()
}

/// Scan rows without relying on a header.
///
/// Per row, left to right: the first proper-name-like cell is the name, the
/// first all-digit cell is the member count, and the first other cell of
/// 3 to 29 characters is the district. Rows with no name are dropped.
pub fn scan_rows_without_headers(rows: &[Vec<String>]) -> Vec<FamilyRecord> {
    rows.iter()
        .filter_map(|row| {
            let mut name: Option<&str> = None;
            let mut members: Option<u32> = None;
            let mut district: Option<&str> = None;

            for value in row.iter().map(|c| c.trim()).filter(|c| !c.is_empty()) {
                if name.is_none() && PROPER_NAME.is_match(value) {
                    name = Some(value);
                } else if members.is_none() && ALL_DIGITS.is_match(value) {
                    members = value.parse().ok();
                } else if district.is_none() && (3..30).contains(&value.chars().count()) {
                    district = Some(value);
                }
            }

            FamilyRecord::new(
                name?,
                district.unwrap_or(UNSPECIFIED_DISTRICT),
                members.unwrap_or(0),
                Vec::new(),
                Priority::Medium,
            )
        })
        .collect()
}
