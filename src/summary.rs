// Condo Expenses - Summary Aggregation
// Turns grouped sums from the store into chart-ready series and the home snapshot
//
// Everything except `build_summary` and `home_snapshot` is a pure function of
// its input rows, so the grouping/sorting/zero-filling rules are tested
// without a database.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use crate::db::ExpenseStore;
use crate::models::{zero_amount, CategorySum, Expense, ExpenseFilter, MonthCategorySum, MonthSum};
use crate::period::YearMonth;

/// Bucket name for expenses without a category
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Number of expenses listed on the home snapshot
pub const RECENT_EXPENSES_LIMIT: usize = 5;

/// Series colors, assigned by category rank and cycled past the end
pub const PALETTE: [&str; 10] = [
    "rgba(54, 162, 235, 0.6)",
    "rgba(255, 99, 132, 0.6)",
    "rgba(75, 192, 192, 0.6)",
    "rgba(255, 206, 86, 0.6)",
    "rgba(153, 102, 255, 0.6)",
    "rgba(255, 159, 64, 0.6)",
    "rgba(199, 199, 199, 0.6)",
    "rgba(83, 102, 255, 0.6)",
    "rgba(40, 159, 64, 0.6)",
    "rgba(210, 99, 132, 0.6)",
];

// ============================================================================
// OUTPUT TYPES
// ============================================================================

/// Chronological month labels with one total per label
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MonthlySeries {
    pub labels: Vec<String>,
    pub totals: Vec<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Decimal,
}

/// One stacked-chart series: a category's total for every month label
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<Decimal>,
    pub background_color: &'static str,
}

/// Month x category matrix
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StackedSeries {
    pub labels: Vec<String>,
    pub categories: Vec<String>,
    pub datasets: Vec<Dataset>,
}

/// Response of the summary endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpenseSummary {
    #[serde(flatten)]
    pub monthly: MonthlySeries,
    pub category_summary: Vec<CategoryTotal>,
    pub monthly_by_category: StackedSeries,
}

/// Serialized as `{"category__name": ..., "total": ...}`, the keys the web
/// client reads
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopCategory {
    #[serde(rename = "category__name")]
    pub name: String,
    pub total: Decimal,
}

/// Dashboard snapshot: current vs previous month plus latest expenses
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HomeSummary {
    pub summary_period_label: String,
    pub current_month_total: Decimal,
    pub previous_month_total: Decimal,
    pub top_category_current_month: Option<TopCategory>,
    pub recent_expenses: Vec<Expense>,
}

// ============================================================================
// PURE TRANSFORMS
// ============================================================================

fn bucket_name(category: Option<String>) -> String {
    category.unwrap_or_else(|| UNCATEGORIZED.to_string())
}

/// Color for the series at `rank` in the sorted category order
pub fn palette_color(rank: usize) -> &'static str {
    PALETTE[rank % PALETTE.len()]
}

/// Monthly totals sorted chronologically; months without rows stay absent
pub fn monthly_series(rows: Vec<MonthSum>) -> MonthlySeries {
    let mut by_month: BTreeMap<String, Decimal> = BTreeMap::new();
    for row in rows {
        *by_month.entry(row.month).or_insert_with(zero_amount) += row.total;
    }

    let (labels, totals) = by_month.into_iter().unzip();
    MonthlySeries { labels, totals }
}

/// Highest total first; equal totals ordered by category name
fn by_total_desc(a_total: &Decimal, a_name: &str, b_total: &Decimal, b_name: &str) -> Ordering {
    b_total.cmp(a_total).then_with(|| a_name.cmp(b_name))
}

/// Category totals sorted descending, uncategorized rows in the sentinel bucket
///
/// A real category literally named "Uncategorized" shares the bucket.
pub fn category_summary(rows: Vec<CategorySum>) -> Vec<CategoryTotal> {
    let mut by_category: HashMap<String, Decimal> = HashMap::new();
    for row in rows {
        *by_category
            .entry(bucket_name(row.category))
            .or_insert_with(zero_amount) += row.total;
    }

    let mut totals: Vec<CategoryTotal> = by_category
        .into_iter()
        .map(|(category, total)| CategoryTotal { category, total })
        .collect();

    totals.sort_by(|a, b| by_total_desc(&a.total, &a.category, &b.total, &b.category));
    totals
}

/// Cross product of every month and category present, zero-filled
///
/// Labels ascend (`YYYY-MM` sorts lexicographically in date order), categories
/// ascend by name, and each dataset holds one value per label.
pub fn stacked_series(rows: Vec<MonthCategorySum>) -> StackedSeries {
    let mut cells: HashMap<(String, String), Decimal> = HashMap::new();
    let mut months = BTreeSet::new();
    let mut categories = BTreeSet::new();

    for row in rows {
        let category = bucket_name(row.category);
        months.insert(row.month.clone());
        categories.insert(category.clone());
        *cells
            .entry((row.month, category))
            .or_insert_with(zero_amount) += row.total;
    }

    let labels: Vec<String> = months.into_iter().collect();
    let categories: Vec<String> = categories.into_iter().collect();

    let datasets = categories
        .iter()
        .enumerate()
        .map(|(rank, category)| Dataset {
            label: category.clone(),
            data: labels
                .iter()
                .map(|month| {
                    cells
                        .get(&(month.clone(), category.clone()))
                        .copied()
                        .unwrap_or_else(zero_amount)
                })
                .collect(),
            background_color: palette_color(rank),
        })
        .collect();

    StackedSeries {
        labels,
        categories,
        datasets,
    }
}

/// Highest-total named category; ties go to the alphabetically first name
pub fn top_category(rows: Vec<CategorySum>) -> Option<TopCategory> {
    rows.into_iter()
        .filter_map(|row| {
            row.category.map(|name| TopCategory {
                name,
                total: row.total,
            })
        })
        .min_by(|a, b| by_total_desc(&a.total, &a.name, &b.total, &b.name))
}

// ============================================================================
// STORE-BACKED VIEWS
// ============================================================================

/// Monthly, per-category and month x category views over the filtered set
pub fn build_summary<S: ExpenseStore + ?Sized>(
    store: &S,
    filter: &ExpenseFilter,
) -> Result<ExpenseSummary> {
    let monthly = monthly_series(store.sum_by_month(filter)?);
    let category_summary = category_summary(store.sum_by_category(filter)?);
    let monthly_by_category = stacked_series(store.sum_by_month_and_category(filter)?);

    debug!(
        months = monthly.labels.len(),
        categories = category_summary.len(),
        "summary computed"
    );

    Ok(ExpenseSummary {
        monthly,
        category_summary,
        monthly_by_category,
    })
}

/// Home snapshot for the month containing `today`
pub fn home_snapshot<S: ExpenseStore + ?Sized>(store: &S, today: NaiveDate) -> Result<HomeSummary> {
    let current = YearMonth::containing(today);
    let previous = current.previous();

    let (current_start, current_end) = current
        .date_range()
        .with_context(|| format!("Month {} has no valid date range", current))?;
    let (previous_start, previous_end) = previous
        .date_range()
        .with_context(|| format!("Month {} has no valid date range", previous))?;

    let current_month_total = store.sum_between(current_start, current_end)?;
    let previous_month_total = store.sum_between(previous_start, previous_end)?;
    let top_category_current_month =
        top_category(store.category_sums_between(current_start, current_end)?);
    let recent_expenses = store.recent_expenses(RECENT_EXPENSES_LIMIT)?;

    debug!(
        period = %current,
        current = %current_month_total,
        previous = %previous_month_total,
        "home snapshot computed"
    );

    Ok(HomeSummary {
        summary_period_label: current.label(),
        current_month_total,
        previous_month_total,
        top_category_current_month,
        recent_expenses,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn month(m: &str, total: &str) -> MonthSum {
        MonthSum {
            month: m.to_string(),
            total: dec(total),
        }
    }

    fn cat(name: Option<&str>, total: &str) -> CategorySum {
        CategorySum {
            category: name.map(str::to_string),
            total: dec(total),
        }
    }

    fn cell(m: &str, name: Option<&str>, total: &str) -> MonthCategorySum {
        MonthCategorySum {
            month: m.to_string(),
            category: name.map(str::to_string),
            total: dec(total),
        }
    }

    #[test]
    fn test_monthly_series_sorted_and_sparse() {
        let series = monthly_series(vec![
            month("2025-03", "10.00"),
            month("2024-12", "5.50"),
            month("2025-01", "7.25"),
        ]);

        assert_eq!(series.labels, vec!["2024-12", "2025-01", "2025-03"]);
        assert_eq!(series.totals, vec![dec("5.50"), dec("7.25"), dec("10.00")]);

        let grand: Decimal = series.totals.iter().copied().sum();
        assert_eq!(grand, dec("22.75"));
    }

    #[test]
    fn test_category_summary_descending_with_name_tiebreak() {
        let totals = category_summary(vec![
            cat(Some("B"), "30.00"),
            cat(Some("A"), "50.00"),
            cat(Some("Water"), "30.00"),
            cat(Some("Cleaning"), "30.00"),
        ]);

        let order: Vec<&str> = totals.iter().map(|t| t.category.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "Cleaning", "Water"]);
        assert_eq!(totals[0].total, dec("50.00"));
    }

    #[test]
    fn test_uncategorized_bucket() {
        let totals = category_summary(vec![cat(None, "103.20"), cat(Some("Power"), "20.00")]);

        assert_eq!(totals[0].category, UNCATEGORIZED);
        assert_eq!(totals[0].total, dec("103.20"));
        assert_eq!(totals[0].total.to_string(), "103.20");
    }

    #[test]
    fn test_stacked_series_zero_fills_missing_cells() {
        let stacked = stacked_series(vec![
            cell("2025-02", Some("Water"), "100.00"),
            cell("2025-01", Some("Power"), "40.00"),
            cell("2025-02", None, "3.20"),
            cell("2025-01", Some("Water"), "90.00"),
        ]);

        assert_eq!(stacked.labels, vec!["2025-01", "2025-02"]);
        assert_eq!(stacked.categories, vec!["Power", "Uncategorized", "Water"]);

        let power = &stacked.datasets[0];
        assert_eq!(power.label, "Power");
        assert_eq!(power.data, vec![dec("40.00"), Decimal::ZERO]);
        assert_eq!(power.data[1].to_string(), "0.00");

        let uncategorized = &stacked.datasets[1];
        assert_eq!(uncategorized.data, vec![Decimal::ZERO, dec("3.20")]);

        let water = &stacked.datasets[2];
        assert_eq!(water.data, vec![dec("90.00"), dec("100.00")]);

        let grand: Decimal = stacked
            .datasets
            .iter()
            .flat_map(|d| d.data.iter().copied())
            .sum();
        assert_eq!(grand, dec("233.20"));
    }

    #[test]
    fn test_stacked_series_colors_follow_rank() {
        let rows: Vec<MonthCategorySum> = (0..12)
            .map(|i| cell("2025-01", Some(&format!("Cat{:02}", i)), "1.00"))
            .collect();
        let stacked = stacked_series(rows);

        assert_eq!(stacked.datasets[0].background_color, PALETTE[0]);
        assert_eq!(stacked.datasets[9].background_color, PALETTE[9]);
        assert_eq!(stacked.datasets[10].background_color, PALETTE[0]);
        assert_eq!(stacked.datasets[11].background_color, PALETTE[1]);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(monthly_series(vec![]), MonthlySeries::default());
        assert!(category_summary(vec![]).is_empty());
        assert_eq!(stacked_series(vec![]), StackedSeries::default());
        assert!(top_category(vec![]).is_none());
    }

    #[test]
    fn test_top_category_ignores_uncategorized() {
        let top = top_category(vec![
            cat(None, "500.00"),
            cat(Some("Security"), "120.00"),
            cat(Some("Gardening"), "120.00"),
        ])
        .unwrap();

        assert_eq!(top.name, "Gardening");
        assert_eq!(top.total, dec("120.00"));
    }

    // ------------------------------------------------------------------------
    // Store-backed views
    // ------------------------------------------------------------------------

    use crate::db::{insert_category, insert_expense, setup_database};
    use crate::models::NewExpense;
    use rusqlite::Connection;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn test_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        conn
    }

    fn add(conn: &Connection, description: &str, amount: &str, on: NaiveDate, category: Option<i64>) -> Expense {
        insert_expense(
            conn,
            &NewExpense {
                description: description.to_string(),
                amount: dec(amount),
                date: on,
                category,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_build_summary_water_bill() {
        let conn = test_db();
        add(&conn, "Water bill", "103.20", date(2025, 2, 1), None);

        let summary = build_summary(&conn, &ExpenseFilter::default()).unwrap();

        assert_eq!(summary.monthly.labels, vec!["2025-02"]);
        assert_eq!(summary.monthly.totals, vec![dec("103.20")]);
        assert_eq!(summary.category_summary.len(), 1);
        assert_eq!(summary.category_summary[0].category, UNCATEGORIZED);
        assert_eq!(summary.category_summary[0].total, dec("103.20"));

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["labels"][0], "2025-02");
        assert_eq!(json["totals"][0], "103.20");
        assert_eq!(json["category_summary"][0]["category"], "Uncategorized");
        assert_eq!(json["monthly_by_category"]["datasets"][0]["label"], "Uncategorized");
    }

    #[test]
    fn test_build_summary_respects_filter() {
        let conn = test_db();
        let a = insert_category(&conn, "A").unwrap();
        let b = insert_category(&conn, "B").unwrap();
        add(&conn, "First", "50.00", date(2025, 4, 2), Some(a.id));
        add(&conn, "Second", "30.00", date(2025, 4, 9), Some(b.id));
        add(&conn, "Old", "999.00", date(2024, 4, 9), Some(b.id));

        let filter = ExpenseFilter {
            year: Some(2025),
            ..Default::default()
        };
        let summary = build_summary(&conn, &filter).unwrap();

        assert_eq!(
            summary.category_summary,
            vec![
                CategoryTotal {
                    category: "A".to_string(),
                    total: dec("50.00"),
                },
                CategoryTotal {
                    category: "B".to_string(),
                    total: dec("30.00"),
                },
            ]
        );
        assert_eq!(summary.monthly.totals, vec![dec("80.00")]);
    }

    #[test]
    fn test_home_snapshot_previous_month_only() {
        let conn = test_db();
        add(&conn, "Gas", "70.00", date(2025, 2, 3), None);
        add(&conn, "Water", "30.50", date(2025, 2, 27), None);

        let home = home_snapshot(&conn, date(2025, 3, 15)).unwrap();

        assert_eq!(home.summary_period_label, "2025-03");
        assert_eq!(home.current_month_total.to_string(), "0.00");
        assert_eq!(home.previous_month_total, dec("100.50"));
        assert!(home.top_category_current_month.is_none());
        assert_eq!(home.recent_expenses.len(), 2);
    }

    #[test]
    fn test_home_snapshot_january_compares_with_december() {
        let conn = test_db();
        let payroll = insert_category(&conn, "Payroll").unwrap();
        let repairs = insert_category(&conn, "Repairs").unwrap();
        add(&conn, "December wages", "2000.00", date(2024, 12, 20), Some(payroll.id));
        add(&conn, "Janitor", "800.00", date(2025, 1, 5), Some(payroll.id));
        add(&conn, "Roof", "950.00", date(2025, 1, 6), Some(repairs.id));
        add(&conn, "Misc", "5000.00", date(2025, 1, 7), None);

        let home = home_snapshot(&conn, date(2025, 1, 31)).unwrap();

        assert_eq!(home.current_month_total, dec("6750.00"));
        assert_eq!(home.previous_month_total, dec("2000.00"));

        let top = home.top_category_current_month.unwrap();
        assert_eq!(top.name, "Repairs");
        assert_eq!(top.total, dec("950.00"));
    }

    #[test]
    fn test_home_snapshot_recent_expenses_limit_and_order() {
        let conn = test_db();
        let mut ids = Vec::new();
        for day in 1..=7 {
            ids.push(add(&conn, "Daily", "1.00", date(2025, 5, day), None).id);
        }
        // Same date as the newest: the higher id wins
        let tie = add(&conn, "Tie", "1.00", date(2025, 5, 7), None);

        let home = home_snapshot(&conn, date(2025, 5, 31)).unwrap();
        let recent: Vec<i64> = home.recent_expenses.iter().map(|e| e.id).collect();

        assert_eq!(recent.len(), RECENT_EXPENSES_LIMIT);
        assert_eq!(recent[0], tie.id);
        assert_eq!(recent[1], ids[6]);
        assert_eq!(recent[4], ids[3]);
    }
}
