// Condo Expenses - Core Library
// Exposes all modules for use in the CLI, API server, and tests

pub mod config;
pub mod db;
pub mod error;
pub mod import;
pub mod models;
pub mod period;
pub mod summary;
pub mod validation;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use db::{open_database, setup_database, ExpenseStore};
pub use error::{AppError, AppResult, FieldErrors};
pub use import::{import_csv, import_csv_file, ImportReport, SkippedRow};
pub use models::{Category, Expense, ExpenseChanges, ExpenseFilter, NewExpense};
pub use period::YearMonth;
pub use summary::{
    build_summary, home_snapshot, CategoryTotal, ExpenseSummary, HomeSummary, MonthlySeries,
    StackedSeries, UNCATEGORIZED,
};

#[cfg(feature = "server")]
pub use api::{router, AppState};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
