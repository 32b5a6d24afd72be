// Condo Expenses - Data Access Layer
// SQLite schema, CRUD queries and the grouped sums behind the summaries

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::path::Path;

use crate::models::{
    amount_from_cents, amount_to_cents, Category, CategorySum, Expense, ExpenseChanges,
    ExpenseFilter, MonthCategorySum, MonthSum, NewExpense,
};

/// Open (or create) the database file and make sure the schema exists
pub fn open_database(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database at {}", path.display()))?;
    setup_database(&conn)?;
    Ok(conn)
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    // Needed per connection for ON DELETE SET NULL
    conn.pragma_update(None, "foreign_keys", "ON")?;

    // ==========================================================================
    // Categories Table
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Expenses Table (amounts stored as integer cents)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS expenses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            description TEXT NOT NULL,
            amount_cents INTEGER NOT NULL CHECK (amount_cents >= 0),
            date TEXT NOT NULL,
            category_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses(date)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_expenses_category ON expenses(category_id)",
        [],
    )?;

    Ok(())
}

// ============================================================================
// CATEGORIES
// ============================================================================

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}

pub fn list_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY name")?;

    let categories = stmt
        .query_map([], category_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(categories)
}

pub fn get_category(conn: &Connection, id: i64) -> Result<Option<Category>> {
    let category = conn
        .query_row(
            "SELECT id, name FROM categories WHERE id = ?1",
            [id],
            category_from_row,
        )
        .optional()?;

    Ok(category)
}

pub fn find_category_by_name(conn: &Connection, name: &str) -> Result<Option<Category>> {
    let category = conn
        .query_row(
            "SELECT id, name FROM categories WHERE name = ?1",
            [name],
            category_from_row,
        )
        .optional()?;

    Ok(category)
}

pub fn category_exists(conn: &Connection, id: i64) -> Result<bool> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM categories WHERE id = ?1)",
        [id],
        |row| row.get(0),
    )?;

    Ok(exists)
}

pub fn insert_category(conn: &Connection, name: &str) -> Result<Category> {
    conn.execute("INSERT INTO categories (name) VALUES (?1)", [name])
        .with_context(|| format!("Failed to insert category {:?}", name))?;

    Ok(Category {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
    })
}

/// Rename a category; `None` when the id is unknown
pub fn update_category(conn: &Connection, id: i64, name: &str) -> Result<Option<Category>> {
    let changed = conn
        .execute(
            "UPDATE categories SET name = ?1 WHERE id = ?2",
            params![name, id],
        )
        .with_context(|| format!("Failed to update category {}", id))?;

    if changed == 0 {
        return Ok(None);
    }

    Ok(Some(Category {
        id,
        name: name.to_string(),
    }))
}

/// Delete a category; its expenses keep existing with no category
pub fn delete_category(conn: &Connection, id: i64) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM categories WHERE id = ?1", [id])?;
    Ok(deleted > 0)
}

// ============================================================================
// EXPENSES
// ============================================================================

const EXPENSE_COLUMNS: &str = "id, description, amount_cents, date, category_id";

fn expense_from_row(row: &Row<'_>) -> rusqlite::Result<Expense> {
    let cents: i64 = row.get(2)?;

    Ok(Expense {
        id: row.get(0)?,
        description: row.get(1)?,
        amount: amount_from_cents(cents),
        date: row.get(3)?,
        category: row.get(4)?,
    })
}

fn cents_of(amount: Decimal) -> Result<i64> {
    amount_to_cents(amount)
        .with_context(|| format!("Amount {} cannot be stored as cents", amount))
}

/// WHERE clause plus bound values for an expense filter
///
/// Year and month are matched on the stored `YYYY-MM-DD` text.
fn filter_clause(filter: &ExpenseFilter) -> (String, Vec<Value>) {
    let mut conditions = Vec::new();
    let mut values = Vec::new();

    if let Some(year) = filter.year {
        conditions.push("substr(e.date, 1, 4) = ?");
        values.push(Value::Text(format!("{:04}", year)));
    }

    if let Some(month) = filter.month {
        conditions.push("substr(e.date, 6, 2) = ?");
        values.push(Value::Text(format!("{:02}", month)));
    }

    if let Some(category) = filter.category {
        conditions.push("e.category_id = ?");
        values.push(Value::Integer(category));
    }

    if conditions.is_empty() {
        (String::new(), values)
    } else {
        (format!("WHERE {}", conditions.join(" AND ")), values)
    }
}

/// Expenses matching `filter`, newest date first (ties: highest id first)
pub fn list_expenses(
    conn: &Connection,
    filter: &ExpenseFilter,
    limit: Option<usize>,
    offset: usize,
) -> Result<Vec<Expense>> {
    let (where_clause, mut values) = filter_clause(filter);

    let mut sql = format!(
        "SELECT {} FROM expenses e {} ORDER BY e.date DESC, e.id DESC",
        EXPENSE_COLUMNS, where_clause
    );
    if let Some(limit) = limit {
        sql.push_str(" LIMIT ? OFFSET ?");
        values.push(Value::Integer(limit as i64));
        values.push(Value::Integer(offset as i64));
    }

    let mut stmt = conn.prepare(&sql)?;
    let expenses = stmt
        .query_map(params_from_iter(values), expense_from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(expenses)
}

pub fn count_expenses(conn: &Connection, filter: &ExpenseFilter) -> Result<usize> {
    let (where_clause, values) = filter_clause(filter);

    let count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM expenses e {}", where_clause),
        params_from_iter(values),
        |row| row.get(0),
    )?;

    Ok(count as usize)
}

pub fn get_expense(conn: &Connection, id: i64) -> Result<Option<Expense>> {
    let expense = conn
        .query_row(
            &format!("SELECT {} FROM expenses WHERE id = ?1", EXPENSE_COLUMNS),
            [id],
            expense_from_row,
        )
        .optional()?;

    Ok(expense)
}

pub fn insert_expense(conn: &Connection, expense: &NewExpense) -> Result<Expense> {
    let cents = cents_of(expense.amount)?;
    conn.execute(
        "INSERT INTO expenses (description, amount_cents, date, category_id)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            expense.description,
            cents,
            expense.date,
            expense.category,
        ],
    )
    .context("Failed to insert expense")?;

    Ok(Expense {
        id: conn.last_insert_rowid(),
        description: expense.description.clone(),
        amount: amount_from_cents(cents),
        date: expense.date,
        category: expense.category,
    })
}

/// Apply `changes` to a stored expense; `None` when the id is unknown
pub fn update_expense(
    conn: &Connection,
    id: i64,
    changes: &ExpenseChanges,
) -> Result<Option<Expense>> {
    let Some(current) = get_expense(conn, id)? else {
        return Ok(None);
    };

    if changes.is_empty() {
        return Ok(Some(current));
    }

    let mut updated = changes.apply_to(&current);
    let cents = cents_of(updated.amount)?;
    updated.amount = amount_from_cents(cents);
    conn.execute(
        "UPDATE expenses
         SET description = ?1, amount_cents = ?2, date = ?3, category_id = ?4
         WHERE id = ?5",
        params![
            updated.description,
            cents,
            updated.date,
            updated.category,
            id,
        ],
    )
    .with_context(|| format!("Failed to update expense {}", id))?;

    Ok(Some(updated))
}

pub fn delete_expense(conn: &Connection, id: i64) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM expenses WHERE id = ?1", [id])?;
    Ok(deleted > 0)
}

// ============================================================================
// EXPENSE STORE (repository seen by the summary component)
// ============================================================================

/// Read-side queries the summaries are computed from
///
/// Every total comes back as an exact decimal with two fractional digits;
/// sums are taken over integer cents.
pub trait ExpenseStore {
    /// Totals per truncated month (`YYYY-MM`), in no particular order
    fn sum_by_month(&self, filter: &ExpenseFilter) -> Result<Vec<MonthSum>>;

    /// Totals per category; uncategorized expenses form the `None` group
    fn sum_by_category(&self, filter: &ExpenseFilter) -> Result<Vec<CategorySum>>;

    /// Totals per (month, category) pair present in the data
    fn sum_by_month_and_category(&self, filter: &ExpenseFilter) -> Result<Vec<MonthCategorySum>>;

    /// Total of expenses dated in `[start, end)`
    fn sum_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Decimal>;

    /// Totals per named category for expenses dated in `[start, end)`
    fn category_sums_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<CategorySum>>;

    /// The `limit` most recently dated expenses (ties: highest id first)
    fn recent_expenses(&self, limit: usize) -> Result<Vec<Expense>>;
}

impl ExpenseStore for Connection {
    fn sum_by_month(&self, filter: &ExpenseFilter) -> Result<Vec<MonthSum>> {
        let (where_clause, values) = filter_clause(filter);
        let mut stmt = self.prepare(&format!(
            "SELECT substr(e.date, 1, 7) AS month, SUM(e.amount_cents)
             FROM expenses e {}
             GROUP BY month",
            where_clause
        ))?;

        let rows = stmt
            .query_map(params_from_iter(values), |row| {
                Ok(MonthSum {
                    month: row.get(0)?,
                    total: amount_from_cents(row.get(1)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn sum_by_category(&self, filter: &ExpenseFilter) -> Result<Vec<CategorySum>> {
        let (where_clause, values) = filter_clause(filter);
        let mut stmt = self.prepare(&format!(
            "SELECT c.name, SUM(e.amount_cents)
             FROM expenses e
             LEFT JOIN categories c ON c.id = e.category_id
             {}
             GROUP BY e.category_id",
            where_clause
        ))?;

        let rows = stmt
            .query_map(params_from_iter(values), |row| {
                Ok(CategorySum {
                    category: row.get(0)?,
                    total: amount_from_cents(row.get(1)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn sum_by_month_and_category(&self, filter: &ExpenseFilter) -> Result<Vec<MonthCategorySum>> {
        let (where_clause, values) = filter_clause(filter);
        let mut stmt = self.prepare(&format!(
            "SELECT substr(e.date, 1, 7) AS month, c.name, SUM(e.amount_cents)
             FROM expenses e
             LEFT JOIN categories c ON c.id = e.category_id
             {}
             GROUP BY month, e.category_id",
            where_clause
        ))?;

        let rows = stmt
            .query_map(params_from_iter(values), |row| {
                Ok(MonthCategorySum {
                    month: row.get(0)?,
                    category: row.get(1)?,
                    total: amount_from_cents(row.get(2)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn sum_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Decimal> {
        let cents: i64 = self.query_row(
            "SELECT COALESCE(SUM(amount_cents), 0)
             FROM expenses
             WHERE date >= ?1 AND date < ?2",
            params![start, end],
            |row| row.get(0),
        )?;

        Ok(amount_from_cents(cents))
    }

    fn category_sums_between(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<CategorySum>> {
        let mut stmt = self.prepare(
            "SELECT c.name, SUM(e.amount_cents)
             FROM expenses e
             JOIN categories c ON c.id = e.category_id
             WHERE e.date >= ?1 AND e.date < ?2
             GROUP BY c.id",
        )?;

        let rows = stmt
            .query_map(params![start, end], |row| {
                Ok(CategorySum {
                    category: Some(row.get(0)?),
                    total: amount_from_cents(row.get(1)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    fn recent_expenses(&self, limit: usize) -> Result<Vec<Expense>> {
        list_expenses(self, &ExpenseFilter::default(), Some(limit), 0)
    }
}
