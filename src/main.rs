use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

// Use library instead of local modules
use condo_expenses::config::{init_tracing, DatabaseConfig};
use condo_expenses::{build_summary, home_snapshot, import_csv_file, open_database, ExpenseFilter};

#[derive(Debug, Parser)]
#[command(name = "condo-expenses", version, about = "Condominium expense tracker")]
struct Cli {
    #[command(flatten)]
    database: DatabaseConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load expenses from a CSV file (date,description,amount,category)
    Import {
        csv: PathBuf,
    },
    /// Print monthly and category totals
    Summary {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
    },
    /// Print the home snapshot as JSON
    Home {
        /// Day to treat as today (YYYY-MM-DD)
        #[arg(long)]
        today: Option<NaiveDate>,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Command::Import { csv } => run_import(&cli.database, &csv),
        Command::Summary { year, month } => run_summary(
            &cli.database,
            ExpenseFilter {
                year,
                month,
                category: None,
            },
        ),
        Command::Home { today } => run_home(&cli.database, today),
    }
}

fn run_import(database: &DatabaseConfig, csv_path: &Path) -> Result<()> {
    println!("🗄️  Expense Import - CSV → SQLite");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut conn = open_database(&database.path)?;
    println!("✓ Database ready: {}", database.path.display());

    let report = import_csv_file(&mut conn, csv_path, Local::now().date_naive())?;

    println!("✓ Imported: {} expenses", report.imported);
    println!("✓ New categories: {}", report.categories_created);
    if !report.skipped.is_empty() {
        println!("⚠️  Skipped: {} rows", report.skipped.len());
        for row in &report.skipped {
            println!("   line {}: {}", row.line, row.reason);
        }
    }

    Ok(())
}

fn run_summary(database: &DatabaseConfig, filter: ExpenseFilter) -> Result<()> {
    let conn = open_database(&database.path)?;
    let summary = build_summary(&conn, &filter)?;

    println!("📊 Monthly totals");
    for (month, total) in summary.monthly.labels.iter().zip(&summary.monthly.totals) {
        println!("   {:<10} {:>14}", month, total.to_string());
    }

    println!("\n🏷️  By category");
    for entry in &summary.category_summary {
        println!("   {:<30} {:>14}", entry.category, entry.total.to_string());
    }

    Ok(())
}

fn run_home(database: &DatabaseConfig, today: Option<NaiveDate>) -> Result<()> {
    let conn = open_database(&database.path)?;
    let today = today.unwrap_or_else(|| Local::now().date_naive());

    let home = home_snapshot(&conn, today)?;
    println!("{}", serde_json::to_string_pretty(&home)?);

    Ok(())
}
