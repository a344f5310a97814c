//! Parsing of pasted/uploaded delimited text into typed import rows.
//!
//! Everything here is pure: no database access, no clock, no randomness.
//! Resolution against master data and persistence live in
//! [`crate::services::imports`].

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::entities::DeliveryNoteStatus;

/// Number of characters of an offending line echoed in a "row incomplete" message.
const LINE_PREVIEW_CHARS: usize = 30;

/// Delimiter of the delivery-note and realization formats.
pub const FIXED_DELIMITER: char = ';';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ImportError {
    #[error("file is empty or invalid: at least a header and one data row are required")]
    NotEnoughLines,

    #[error("no valid {0} rows found; expected {1}")]
    NoValidRows(&'static str, &'static str),
}

impl From<ImportError> for crate::errors::ServiceError {
    fn from(err: ImportError) -> Self {
        crate::errors::ServiceError::ValidationError(err.to_string())
    }
}

/// How the rows of one file are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportFormat {
    pub delimiter: char,
    pub has_header: bool,
}

/// Header keywords per master-data file, matched against the lowercased first line.
pub mod header_keywords {
    pub const DRIVERS: &[&str] = &["nama"];
    pub const TRUCKS: &[&str] = &["nomor", "polisi", "plat"];
    pub const MATERIALS: &[&str] = &["material", "satuan"];
    pub const ROUTES: &[&str] = &["rute", "uang"];
}

/// Splits raw text into trimmed, non-empty lines. Accepts `\n`, `\r\n` and `\r`.
pub fn split_lines(text: &str) -> Vec<&str> {
    text.split(['\n', '\r'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// `;` only when the line holds strictly more semicolons than commas; ties go to `,`.
pub fn sniff_delimiter(line: &str) -> char {
    let semicolons = line.matches(';').count();
    let commas = line.matches(',').count();
    if semicolons > commas {
        ';'
    } else {
        ','
    }
}

pub fn sniff_format(first_line: &str, header_keywords: &[&str]) -> ImportFormat {
    let lowered = first_line.to_lowercase();
    ImportFormat {
        delimiter: sniff_delimiter(first_line),
        has_header: header_keywords.iter().any(|kw| lowered.contains(kw)),
    }
}

/// A row that could not be turned into a candidate record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// 1-based line number within the non-empty lines of the input
    pub line: usize,
    pub message: String,
}

/// One parsed data row, in file order.
pub type ParsedRow<T> = Result<T, RowError>;

/// Master-data rows remember their line so later validation failures are
/// reported under the same number as parse failures.
pub trait SourceLine {
    fn line(&self) -> usize;
}

macro_rules! impl_source_line {
    ($($row:ty),*) => {
        $(impl SourceLine for $row {
            fn line(&self) -> usize {
                self.line
            }
        })*
    };
}

fn fields(line: &str, delimiter: char) -> Vec<&str> {
    line.split(delimiter).map(str::trim).collect()
}

fn incomplete(line_no: usize, line: &str) -> RowError {
    let preview: String = line.chars().take(LINE_PREVIEW_CHARS).collect();
    RowError {
        line: line_no,
        message: format!("Row incomplete: {}...", preview),
    }
}

fn row_error(line_no: usize, message: impl Into<String>) -> RowError {
    RowError {
        line: line_no,
        message: message.into(),
    }
}

/// Parses a decimal the way the dashboard forms do (`.` as the decimal separator).
pub fn parse_decimal(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Decimal::from_str(raw).ok()
}

/// Accepts ISO `YYYY-MM-DD` and `DD/MM/YYYY`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.contains('/') {
        NaiveDate::parse_from_str(raw, "%d/%m/%Y").ok()
    } else {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
    }
}

fn data_lines<'a>(
    text: &'a str,
    keywords: &[&str],
) -> (ImportFormat, impl Iterator<Item = (usize, &'a str)>) {
    let lines = split_lines(text);
    let format = lines
        .first()
        .map(|first| sniff_format(first, keywords))
        .unwrap_or(ImportFormat {
            delimiter: ',',
            has_header: false,
        });
    let skip = usize::from(format.has_header);
    let rows = lines.into_iter().enumerate().skip(skip).map(|(i, l)| (i + 1, l));
    (format, rows)
}

fn fixed_data_lines(text: &str) -> Result<impl Iterator<Item = (usize, &str)>, ImportError> {
    let lines = split_lines(text);
    if lines.len() < 2 {
        return Err(ImportError::NotEnoughLines);
    }
    Ok(lines.into_iter().enumerate().skip(1).map(|(i, l)| (i + 1, l)))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverRow {
    pub line: usize,
    pub name: String,
    pub company_name: String,
    /// Optional third column; derived from the name when absent
    pub username: Option<String>,
}

/// `name, company[, username]`
pub fn parse_driver_rows(text: &str) -> Result<Vec<ParsedRow<DriverRow>>, ImportError> {
    let (format, lines) = data_lines(text, header_keywords::DRIVERS);
    let rows: Vec<_> = lines
        .map(|(n, line)| {
            let cols = fields(line, format.delimiter);
            if cols.len() < 2 {
                return Err(incomplete(n, line));
            }
            if cols[0].is_empty() || cols[1].is_empty() {
                return Err(row_error(n, format!("Row {}: driver name and company are required", n)));
            }
            Ok(DriverRow {
                line: n,
                name: cols[0].to_string(),
                company_name: cols[1].to_string(),
                username: cols
                    .get(2)
                    .filter(|u| !u.is_empty())
                    .map(|u| u.to_string()),
            })
        })
        .collect();
    non_empty(rows, "driver", "name; company or name, company")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TruckRow {
    pub line: usize,
    pub plate_number: String,
}

/// One plate number per line.
pub fn parse_truck_rows(text: &str) -> Result<Vec<ParsedRow<TruckRow>>, ImportError> {
    let (_, lines) = data_lines(text, header_keywords::TRUCKS);
    let rows: Vec<_> = lines
        .map(|(n, line)| {
            Ok(TruckRow {
                line: n,
                plate_number: line.to_string(),
            })
        })
        .collect();
    non_empty(rows, "truck", "one plate number per line")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialRow {
    pub line: usize,
    pub name: String,
    pub unit: String,
}

/// `name, unit`
pub fn parse_material_rows(text: &str) -> Result<Vec<ParsedRow<MaterialRow>>, ImportError> {
    let (format, lines) = data_lines(text, header_keywords::MATERIALS);
    let rows: Vec<_> = lines
        .map(|(n, line)| {
            let cols = fields(line, format.delimiter);
            if cols.len() < 2 {
                return Err(incomplete(n, line));
            }
            if cols[0].is_empty() || cols[1].is_empty() {
                return Err(row_error(n, format!("Row {}: material name and unit are required", n)));
            }
            Ok(MaterialRow {
                line: n,
                name: cols[0].to_string(),
                unit: cols[1].to_string(),
            })
        })
        .collect();
    non_empty(rows, "material", "name; unit or name, unit")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRow {
    pub line: usize,
    pub name: String,
    pub allowance: Decimal,
}

/// `name, allowance`
pub fn parse_route_rows(text: &str) -> Result<Vec<ParsedRow<RouteRow>>, ImportError> {
    let (format, lines) = data_lines(text, header_keywords::ROUTES);
    let rows: Vec<_> = lines
        .map(|(n, line)| {
            let cols = fields(line, format.delimiter);
            if cols.len() < 2 {
                return Err(incomplete(n, line));
            }
            if cols[0].is_empty() {
                return Err(row_error(n, format!("Row {}: route name is required", n)));
            }
            match parse_decimal(cols[1]) {
                Some(allowance) if allowance >= Decimal::ZERO => Ok(RouteRow {
                    line: n,
                    name: cols[0].to_string(),
                    allowance,
                }),
                _ => Err(row_error(
                    n,
                    format!("Invalid allowance for: {}", cols[0]),
                )),
            }
        })
        .collect();
    non_empty(rows, "route", "name; allowance or name, allowance")
}

impl_source_line!(DriverRow, TruckRow, MaterialRow, RouteRow);

fn non_empty<T>(
    rows: Vec<ParsedRow<T>>,
    entity: &'static str,
    expected: &'static str,
) -> Result<Vec<ParsedRow<T>>, ImportError> {
    if rows.is_empty() {
        Err(ImportError::NoValidRows(entity, expected))
    } else {
        Ok(rows)
    }
}

/// A delivery-note row before its references are resolved.
///
/// The quantity is kept unvalidated here so that an unknown reference is
/// reported ahead of a bad quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryNoteRow {
    pub document_number: String,
    pub document_date: Option<NaiveDate>,
    pub truck_plate: String,
    pub driver_username: String,
    pub route_name: String,
    pub material_name: String,
    pub quantity_loaded: Option<Decimal>,
}

/// `number;date;plate;driver username;route;material;quantity`, header always skipped.
pub fn parse_delivery_note_rows(
    text: &str,
) -> Result<Vec<ParsedRow<DeliveryNoteRow>>, ImportError> {
    Ok(fixed_data_lines(text)?
        .map(|(n, line)| {
            let cols = fields(line, FIXED_DELIMITER);
            if cols.len() < 7 {
                return Err(incomplete(n, line));
            }
            Ok(DeliveryNoteRow {
                document_number: cols[0].to_string(),
                document_date: parse_date(cols[1]),
                truck_plate: cols[2].to_string(),
                driver_username: cols[3].to_string(),
                route_name: cols[4].to_string(),
                material_name: cols[5].to_string(),
                quantity_loaded: parse_decimal(cols[6]),
            })
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RealizationRow {
    pub document_number: String,
    /// Either `Delivered` or `Failed`
    pub outcome: DeliveryNoteStatus,
    pub delivery_date: Option<NaiveDate>,
    pub quantity_delivered: Option<Decimal>,
}

/// `number;status;delivery date;quantity`, header always skipped.
/// Date and quantity may be blank when the status is `gagal`.
pub fn parse_realization_rows(
    text: &str,
) -> Result<Vec<ParsedRow<RealizationRow>>, ImportError> {
    Ok(fixed_data_lines(text)?
        .map(|(n, line)| {
            let cols = fields(line, FIXED_DELIMITER);
            if cols.len() < 4 {
                return Err(incomplete(n, line));
            }
            let outcome = match DeliveryNoteStatus::from_str(cols[1]) {
                Ok(status) if status.is_terminal() => status,
                _ => {
                    return Err(row_error(
                        n,
                        format!("Invalid status for: {}", cols[0]),
                    ))
                }
            };
            Ok(RealizationRow {
                document_number: cols[0].to_string(),
                outcome,
                delivery_date: parse_date(cols[2]),
                quantity_delivered: parse_decimal(cols[3]),
            })
        })
        .collect())
}

/// Outcome of one import run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub succeeded: usize,
    pub failed: usize,
    /// The first few row errors, in file order
    pub errors: Vec<String>,
    pub total_errors: usize,
}

impl ImportReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    pub fn record_successes(&mut self, count: usize) {
        self.succeeded += count;
    }

    pub fn record_failure(&mut self, message: impl Into<String>) {
        self.failed += 1;
        self.total_errors += 1;
        self.errors.push(message.into());
    }

    /// Trims the echoed error list to `preview_limit` entries.
    pub fn finish(mut self, preview_limit: usize) -> Self {
        self.errors.truncate(preview_limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case("a;b;c;d,e", ';')]
    #[case("a,b;c", ',')]
    #[case("Nama Supir,Nama PT", ',')]
    #[case("Budi;PT Aman", ';')]
    #[case("single", ',')]
    fn delimiter_follows_majority(#[case] line: &str, #[case] expected: char) {
        assert_eq!(sniff_delimiter(line), expected);
    }

    #[rstest]
    #[case("Nama Supir;Nama PT", header_keywords::DRIVERS, true)]
    #[case("Budi;PT Aman", header_keywords::DRIVERS, false)]
    #[case("Nomor Polisi", header_keywords::TRUCKS, true)]
    #[case("B 1234 XYZ", header_keywords::TRUCKS, false)]
    #[case("Nama Rute,Uang Jalan", header_keywords::ROUTES, true)]
    #[case("Material;Satuan", header_keywords::MATERIALS, true)]
    fn header_detected_by_keyword(
        #[case] line: &str,
        #[case] keywords: &[&str],
        #[case] expected: bool,
    ) {
        assert_eq!(sniff_format(line, keywords).has_header, expected);
    }

    #[test]
    fn split_lines_handles_crlf_and_blank_lines() {
        let text = "header\r\n\r\n a;b \r\nc;d\n\n";
        assert_eq!(split_lines(text), vec!["header", "a;b", "c;d"]);
    }

    #[test]
    fn dates_accept_iso_and_day_first() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 16);
        assert_eq!(parse_date("2024-01-16"), expected);
        assert_eq!(parse_date("16/01/2024"), expected);
        assert_eq!(parse_date("2024/13/01"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn drivers_with_header_and_optional_username() {
        let rows = parse_driver_rows("Nama Supir;Nama PT;Username\nBudi;PT Aman;budi\nAni;PT Jaya").unwrap();
        assert_eq!(rows.len(), 2);
        let first = rows[0].as_ref().unwrap();
        assert_eq!(first.username.as_deref(), Some("budi"));
        let second = rows[1].as_ref().unwrap();
        assert_eq!(second.company_name, "PT Jaya");
        assert_eq!(second.username, None);
    }

    #[test]
    fn driver_row_missing_company_is_incomplete() {
        let rows = parse_driver_rows("Budi,PT Aman\nAni").unwrap();
        assert!(rows[0].is_ok());
        let err = rows[1].as_ref().unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.message, "Row incomplete: Ani...");
    }

    #[test]
    fn header_only_master_file_is_rejected() {
        assert_matches!(
            parse_material_rows("Material;Satuan"),
            Err(ImportError::NoValidRows("material", _))
        );
        assert_matches!(parse_truck_rows("   \n"), Err(ImportError::NoValidRows(..)));
    }

    #[test]
    fn first_line_fixes_the_delimiter_for_every_row() {
        let rows = parse_material_rows("A;B;c;d,e\nBatu, Split;M3").unwrap();
        assert_eq!(rows.len(), 2);
        let second = rows[1].as_ref().unwrap();
        assert_eq!(second.name, "Batu, Split");
        assert_eq!(second.unit, "M3");
        assert_eq!(second.line, 2);
    }

    #[test]
    fn trucks_one_plate_per_line() {
        let rows = parse_truck_rows("Nomor Polisi\nB 1234 XYZ\nD 9 AB").unwrap();
        let plates: Vec<_> = rows
            .into_iter()
            .map(|r| r.unwrap().plate_number)
            .collect();
        assert_eq!(plates, vec!["B 1234 XYZ", "D 9 AB"]);
    }

    #[test]
    fn route_allowance_must_be_a_non_negative_number() {
        let rows = parse_route_rows("Jakarta-Bandung;500000\nBogor;abc\nDepok;-5\nSolo;0").unwrap();
        assert_eq!(rows[0].as_ref().unwrap().allowance, dec!(500000));
        assert_eq!(
            rows[1].as_ref().unwrap_err().message,
            "Invalid allowance for: Bogor"
        );
        assert!(rows[2].is_err());
        assert_eq!(rows[3].as_ref().unwrap().allowance, Decimal::ZERO);
    }

    #[test]
    fn delivery_note_file_needs_a_data_row() {
        assert_eq!(
            parse_delivery_note_rows("nomor;tanggal;truck;supir;rute;material;qty").unwrap_err(),
            ImportError::NotEnoughLines
        );
    }

    #[test]
    fn delivery_note_rows_are_positional() {
        let text = "header\nSJ/2024/001;2024-01-15;B1234XYZ;budi;Jakarta-Bandung;Pasir;25.5\nSJ/2024/002;2024-01-15;B1234XYZ";
        let rows = parse_delivery_note_rows(text).unwrap();
        let first = rows[0].as_ref().unwrap();
        assert_eq!(first.document_number, "SJ/2024/001");
        assert_eq!(first.document_date, NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(first.quantity_loaded, Some(dec!(25.5)));
        assert!(rows[1]
            .as_ref()
            .unwrap_err()
            .message
            .starts_with("Row incomplete: SJ/2024/002;2024-01-15;B1234X"));
    }

    #[test]
    fn realization_rows_validate_status() {
        let text = "nomor;status;tanggal;qty\nSJ/1;terkirim;2024-01-16;25.5\nSJ/2;gagal;;\nSJ/3;pending;;\nSJ/4;lost;;0";
        let rows = parse_realization_rows(text).unwrap();
        let delivered = rows[0].as_ref().unwrap();
        assert_eq!(delivered.outcome, DeliveryNoteStatus::Delivered);
        assert_eq!(delivered.quantity_delivered, Some(dec!(25.5)));
        let failed = rows[1].as_ref().unwrap();
        assert_eq!(failed.outcome, DeliveryNoteStatus::Failed);
        assert_eq!(failed.delivery_date, None);
        assert_eq!(rows[2].as_ref().unwrap_err().message, "Invalid status for: SJ/3");
        assert_eq!(rows[3].as_ref().unwrap_err().message, "Invalid status for: SJ/4");
    }

    #[test]
    fn report_keeps_count_but_trims_preview() {
        let mut report = ImportReport::new();
        report.record_successes(2);
        for i in 0..5 {
            report.record_failure(format!("e{}", i));
        }
        let report = report.finish(3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 5);
        assert_eq!(report.total_errors, 5);
        assert_eq!(report.errors, vec!["e0", "e1", "e2"]);
    }
}
