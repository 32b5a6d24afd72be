// Condo Expenses - Month periods
// Truncated-month arithmetic used by the summaries

use chrono::{Datelike, NaiveDate};
use std::fmt;

/// A calendar month, the grouping key of every summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    /// Month containing `date`
    pub fn containing(date: NaiveDate) -> Self {
        YearMonth {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Month immediately before this one (January rolls back to December)
    pub fn previous(&self) -> Self {
        if self.month == 1 {
            YearMonth {
                year: self.year - 1,
                month: 12,
            }
        } else {
            YearMonth {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// Month immediately after this one
    pub fn next(&self) -> Self {
        if self.month == 12 {
            YearMonth {
                year: self.year + 1,
                month: 1,
            }
        } else {
            YearMonth {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// First day of the month
    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Half-open date range `[first day, first day of next month)`
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.first_day()?, self.next().first_day()?))
    }

    /// `YYYY-MM` label, the same text SQLite produces with `substr(date, 1, 7)`
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_previous_month_rolls_over_year() {
        let january = YearMonth { year: 2025, month: 1 };
        assert_eq!(january.previous(), YearMonth { year: 2024, month: 12 });

        let march = YearMonth { year: 2025, month: 3 };
        assert_eq!(march.previous(), YearMonth { year: 2025, month: 2 });
    }

    #[test]
    fn test_date_range_is_half_open() {
        let december = YearMonth { year: 2024, month: 12 };
        let (start, end) = december.date_range().unwrap();

        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }

    #[test]
    fn test_label_and_containing() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let month = YearMonth::containing(date);

        assert_eq!(month.label(), "2025-03");
        assert_eq!(month.next().label(), "2025-04");
        assert_eq!(YearMonth { year: 2024, month: 12 }.next().label(), "2025-01");
    }
}
