use calamine::{Data, DataType, Range};
use chrono::{DateTime, NaiveDate};
use std::collections::HashMap;
use std::io::Read;

use super::RowError;
use crate::workflows::followup::domain::{default_currency, InvoiceFact, RelationshipTier};

/// Raw row keyed by normalised header name, blanks already dropped.
pub(crate) struct LedgerRow {
    values: HashMap<String, String>,
}

impl LedgerRow {
    fn get(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }
}

pub(crate) fn read_rows<R: Read>(reader: R) -> Result<Vec<LedgerRow>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = csv_reader
        .headers()?
        .iter()
        .map(normalize_header)
        .collect();

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        rows.push(ledger_row(&headers, record.iter().map(|value| Some(value.to_string()))));
    }

    Ok(rows)
}

/// First row of the sheet is the header; the rest feed the same coercion as CSV rows.
pub(crate) fn rows_from_range(range: &Range<Data>) -> Vec<LedgerRow> {
    let mut sheet_rows = range.rows();
    let headers: Vec<String> = match sheet_rows.next() {
        Some(header) => header
            .iter()
            .map(|cell| normalize_header(&cell_text(cell).unwrap_or_default()))
            .collect(),
        None => return Vec::new(),
    };

    sheet_rows
        .filter(|cells| cells.iter().any(|cell| cell_text(cell).is_some()))
        .map(|cells| ledger_row(&headers, cells.iter().map(cell_text)))
        .collect()
}

fn ledger_row<I>(headers: &[String], values: I) -> LedgerRow
where
    I: Iterator<Item = Option<String>>,
{
    let values = headers
        .iter()
        .zip(values)
        .filter_map(|(header, value)| {
            let value = value?.trim().to_string();
            (!value.is_empty()).then(|| (header.clone(), value))
        })
        .collect();
    LedgerRow { values }
}

/// Spreadsheet cell as the text a CSV export would carry; date cells become `YYYY-MM-DD`.
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty | Data::Error(_) => None,
        Data::String(value) | Data::DurationIso(value) => Some(value.clone()),
        Data::Int(value) => Some(value.to_string()),
        Data::Float(value) if value.fract() == 0.0 => Some(format!("{value:.0}")),
        Data::Float(value) => Some(value.to_string()),
        Data::Bool(value) => Some(value.to_string()),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_date()
            .map(|date| date.format("%Y-%m-%d").to_string()),
    }
}

/// Coerce a raw row into an invoice, collecting every field problem.
pub(crate) fn invoice_from_row(row: &LedgerRow, row_index: usize) -> Result<InvoiceFact, Vec<RowError>> {
    let mut errors = Vec::new();
    let mut fail = |field: &str, message: &str, value: Option<&str>| {
        errors.push(RowError {
            row_index,
            field_path: field.to_string(),
            message: message.to_string(),
            value: value.unwrap_or("").to_string(),
        });
    };

    let client_name = row.get("client_name").map(str::to_string);
    if client_name.is_none() {
        fail("client_name", "is required", None);
    }

    let invoice_id = row.get("invoice_id").map(str::to_string);
    if invoice_id.is_none() {
        fail("invoice_id", "is required", None);
    }

    let raw_amount = row.get("invoice_amount");
    let invoice_amount = raw_amount.and_then(parse_number);
    match invoice_amount {
        None => fail("invoice_amount", "must be a number", raw_amount),
        Some(amount) if amount < 0.0 => {
            fail("invoice_amount", "must be non-negative", raw_amount)
        }
        Some(_) => {}
    }

    let raw_issue_date = row.get("invoice_issue_date");
    let invoice_issue_date = raw_issue_date.and_then(parse_date);
    if invoice_issue_date.is_none() {
        fail("invoice_issue_date", "must be a date (YYYY-MM-DD)", raw_issue_date);
    }

    let raw_days = row.get("days_overdue");
    let days_overdue = raw_days.and_then(parse_number).map(|value| value.trunc() as i64);
    if days_overdue.is_none() {
        fail("days_overdue", "must be an integer", raw_days);
    }

    let raw_tier = row.get("relationship_tag");
    let relationship_tag = raw_tier.and_then(RelationshipTier::parse);
    if relationship_tag.is_none() {
        fail(
            "relationship_tag",
            "must be one of new, recurring, vip, risky",
            raw_tier,
        );
    }

    let last_followup_date = row.get("last_followup_date").and_then(parse_date);
    let currency = row
        .get("currency")
        .map(str::to_string)
        .unwrap_or_else(default_currency);
    let notes = row.get("notes").unwrap_or_default().to_string();

    match (
        client_name,
        invoice_id,
        invoice_amount,
        invoice_issue_date,
        days_overdue,
        relationship_tag,
    ) {
        (
            Some(client_name),
            Some(invoice_id),
            Some(invoice_amount),
            Some(invoice_issue_date),
            Some(days_overdue),
            Some(relationship_tag),
        ) if errors.is_empty() => Ok(InvoiceFact {
            client_name,
            invoice_id,
            invoice_amount,
            currency,
            invoice_issue_date,
            days_overdue,
            last_followup_date,
            relationship_tag,
            notes,
        }),
        _ => Err(errors),
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}')
        .trim()
        .to_lowercase()
        .replace(' ', "_")
}

/// Strip currency symbols and separators before parsing.
fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|ch| ch.is_ascii_digit() || *ch == '.' || *ch == '-')
        .collect();
    if matches!(cleaned.as_str(), "" | "-" | "." | "-.") {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|value| value.is_finite())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.date_naive());
    }

    NaiveDate::parse_from_str(trimmed, "%m/%d/%Y").ok()
}

#[cfg(test)]
pub(crate) fn parse_number_for_tests(raw: &str) -> Option<f64> {
    parse_number(raw)
}

#[cfg(test)]
pub(crate) fn parse_date_for_tests(raw: &str) -> Option<NaiveDate> {
    parse_date(raw)
}

#[cfg(test)]
pub(crate) fn cell_text_for_tests(cell: &Data) -> Option<String> {
    cell_text(cell)
}
