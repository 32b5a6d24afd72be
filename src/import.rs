// Condo Expenses - CSV Import
// Bulk-loads expenses from a spreadsheet export in a single transaction

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::Value;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

use crate::db::{category_exists, find_category_by_name, insert_category, insert_expense};
use crate::error::AppError;
use crate::validation::{validate_new_expense, ExpensePayload};

/// One CSV line: `date,description,amount,category`
#[derive(Debug, Deserialize)]
struct CsvExpenseRow {
    #[serde(default)]
    date: Option<String>,
    description: String,
    amount: String,
    #[serde(default)]
    category: Option<String>,
}

/// A line that failed validation and was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRow {
    /// 1-based line number, header included
    pub line: u64,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub categories_created: usize,
    pub skipped: Vec<SkippedRow>,
}

pub fn import_csv_file(conn: &mut Connection, csv_path: &Path, today: NaiveDate) -> Result<ImportReport> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;
    import_csv(conn, file, today)
}

/// Import every valid row; invalid rows are reported and skipped
///
/// Rows without a date get `today`. Unknown category names are created.
/// Nothing is written if a database error interrupts the import.
pub fn import_csv<R: Read>(conn: &mut Connection, reader: R, today: NaiveDate) -> Result<ImportReport> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let tx = conn.transaction()?;
    let mut report = ImportReport::default();

    for (index, result) in rdr.deserialize::<CsvExpenseRow>().enumerate() {
        let line = index as u64 + 2;

        let row = match result {
            Ok(row) => row,
            Err(e) => {
                warn!(line, error = %e, "unreadable CSV row");
                report.skipped.push(SkippedRow {
                    line,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let payload = ExpensePayload {
            description: Some(Value::String(row.description)),
            amount: Some(Value::String(row.amount)),
            date: row
                .date
                .filter(|d| !d.is_empty())
                .map(Value::String),
            category: None,
        };

        let mut expense = match validate_new_expense(&payload, today, |id| category_exists(&tx, id)) {
            Ok(expense) => expense,
            Err(AppError::Validation(errors)) => {
                warn!(line, %errors, "skipping invalid CSV row");
                report.skipped.push(SkippedRow {
                    line,
                    reason: errors.to_string(),
                });
                continue;
            }
            Err(e) => return Err(anyhow::Error::new(e)),
        };

        if let Some(name) = row.category.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
            let category = match find_category_by_name(&tx, name)? {
                Some(category) => category,
                None => {
                    report.categories_created += 1;
                    insert_category(&tx, name)?
                }
            };
            expense.category = Some(category.id);
        }

        insert_expense(&tx, &expense)?;
        report.imported += 1;
    }

    tx.commit().context("Failed to commit CSV import")?;

    info!(
        imported = report.imported,
        skipped = report.skipped.len(),
        categories_created = report.categories_created,
        "CSV import finished"
    );

    Ok(report)
}
