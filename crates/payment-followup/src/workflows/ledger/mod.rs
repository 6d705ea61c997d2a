mod parser;

use std::fmt;
use std::io::Read;
use std::path::Path;

use calamine::Reader;
use tracing::debug;

use crate::workflows::followup::InvoiceFact;

/// Single field problem found while validating a ledger row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub row_index: usize,
    pub field_path: String,
    pub message: String,
    pub value: String,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Row {} -> {}: {} (got '{}')",
            self.row_index, self.field_path, self.message, self.value
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerImportError {
    #[error("failed to read invoice ledger: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid invoice CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("invalid invoice workbook: {0}")]
    Workbook(#[from] calamine::Error),
    #[error("invoice workbook has no worksheets")]
    EmptyWorkbook,
    #[error("unsupported ledger format '{0}' (expected .csv, .xls or .xlsx)")]
    UnsupportedFormat(String),
    #[error("invoice validation failed:\n{}", render_row_errors(.0))]
    Validation(Vec<RowError>),
}

fn render_row_errors(errors: &[RowError]) -> String {
    errors
        .iter()
        .map(RowError::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Reads invoice ledgers (CSV or Excel exports) into validated [`InvoiceFact`]s.
pub struct InvoiceLedgerImporter;

impl InvoiceLedgerImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<InvoiceFact>, LedgerImportError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "csv" => Self::from_reader(std::fs::File::open(path)?),
            "xls" | "xlsx" => Self::from_workbook_path(path),
            _ => Err(LedgerImportError::UnsupportedFormat(extension)),
        }
    }

    /// Reads the first worksheet of an `.xls`/`.xlsx` workbook.
    pub fn from_workbook_path<P: AsRef<Path>>(
        path: P,
    ) -> Result<Vec<InvoiceFact>, LedgerImportError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("file not found: {}", path.display()),
            )
            .into());
        }

        let mut workbook = calamine::open_workbook_auto(path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(LedgerImportError::EmptyWorkbook)??;
        Self::from_rows(parser::rows_from_range(&range))
    }

    /// All rows are validated before anything is returned; errors are reported together.
    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<InvoiceFact>, LedgerImportError> {
        Self::from_rows(parser::read_rows(reader)?)
    }

    fn from_rows(rows: Vec<parser::LedgerRow>) -> Result<Vec<InvoiceFact>, LedgerImportError> {
        let mut invoices = Vec::with_capacity(rows.len());
        let mut errors = Vec::new();

        for (index, row) in rows.iter().enumerate() {
            match parser::invoice_from_row(row, index + 1) {
                Ok(invoice) => invoices.push(invoice),
                Err(row_errors) => errors.extend(row_errors),
            }
        }

        if !errors.is_empty() {
            return Err(LedgerImportError::Validation(errors));
        }

        debug!(count = invoices.len(), "imported invoice ledger");
        Ok(invoices)
    }
}
