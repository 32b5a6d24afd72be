// Condo Expenses - Domain Models
// Category and Expense records plus the raw aggregate rows returned by the store

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Fractional digits carried by every monetary amount
pub const AMOUNT_SCALE: u32 = 2;

// ============================================================================
// ENTITIES
// ============================================================================

/// Named grouping label for expenses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A single recorded outflow of the condominium
///
/// `amount` always carries two fractional digits, so it serializes as
/// `"103.20"` rather than `"103.2"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub description: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    /// Category id, cleared when the category is deleted
    pub category: Option<i64>,
}

/// Validated input for a new expense
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExpense {
    pub description: String,
    pub amount: Decimal,
    pub date: NaiveDate,
    pub category: Option<i64>,
}

/// Validated changes for an existing expense
///
/// `None` leaves the stored value untouched. For `category`,
/// `Some(None)` clears the reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseChanges {
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub date: Option<NaiveDate>,
    pub category: Option<Option<i64>>,
}

impl ExpenseChanges {
    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.amount.is_none()
            && self.date.is_none()
            && self.category.is_none()
    }

    /// Apply the changes on top of a stored expense
    pub fn apply_to(&self, expense: &Expense) -> Expense {
        Expense {
            id: expense.id,
            description: self
                .description
                .clone()
                .unwrap_or_else(|| expense.description.clone()),
            amount: self.amount.unwrap_or(expense.amount),
            date: self.date.unwrap_or(expense.date),
            category: self.category.unwrap_or(expense.category),
        }
    }
}

/// Listing/aggregation filter on the expense set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpenseFilter {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub category: Option<i64>,
}

// ============================================================================
// RAW AGGREGATE ROWS
// ============================================================================

/// Sum of amounts for one truncated month (`YYYY-MM`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthSum {
    pub month: String,
    pub total: Decimal,
}

/// Sum of amounts for one category; `None` is the uncategorized group
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorySum {
    pub category: Option<String>,
    pub total: Decimal,
}

/// Sum of amounts for one (month, category) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthCategorySum {
    pub month: String,
    pub category: Option<String>,
    pub total: Decimal,
}

// ============================================================================
// MONEY HELPERS
// ============================================================================

/// Zero with the same scale as stored amounts (`"0.00"`)
pub fn zero_amount() -> Decimal {
    Decimal::new(0, AMOUNT_SCALE)
}

/// Amount from the integer cents stored in the database
pub fn amount_from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, AMOUNT_SCALE)
}

/// Integer cents for an amount with at most two fractional digits
///
/// Returns `None` when the amount has more precision than cents or does not
/// fit in an `i64`.
pub fn amount_to_cents(amount: Decimal) -> Option<i64> {
    if amount.normalize().scale() > AMOUNT_SCALE {
        return None;
    }
    let mut scaled = amount;
    scaled.rescale(AMOUNT_SCALE);
    i64::try_from(scaled.mantissa()).ok()
}
