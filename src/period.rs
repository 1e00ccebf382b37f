use chrono::{Datelike, Duration, NaiveDate};

use crate::error::{DocketError, Result};
use crate::models::text_enum;

text_enum!(
    /// Symbolic reporting periods accepted in the `period` filter.
    PeriodCode {
        Today => "today",
        Yesterday => "yesterday",
        ThisWeek => "this_week",
        LastWeek => "last_week",
        ThisMonth => "this_month",
        LastMonth => "last_month",
        LastQuarter => "last_quarter",
        ThisYear => "this_year",
        LastYear => "last_year",
        Custom => "custom",
    }
);

/// Inclusive date window. Either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    #[cfg(test)]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }

    /// Both ends, when the window is closed.
    #[cfg(test)]
    pub fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.start?, self.end?))
    }

    pub fn label(&self) -> String {
        match (self.start, self.end) {
            (Some(s), Some(e)) => format!("{} to {}", s.format("%d/%m/%Y"), e.format("%d/%m/%Y")),
            (Some(s), None) => format!("from {}", s.format("%d/%m/%Y")),
            (None, Some(e)) => format!("until {}", e.format("%d/%m/%Y")),
            (None, None) => "all dates".to_string(),
        }
    }
}

/// Turn a period code into concrete bounds relative to `today`.
///
/// Unknown or empty codes resolve to an unbounded window. `last_quarter` is
/// deliberately left unbounded until the quarter boundaries are agreed on.
/// Only `custom` validates its bounds; the computed ranges are ordered by
/// construction.
pub fn resolve(
    code: Option<&str>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<DateWindow> {
    let Some(code) = code.and_then(PeriodCode::parse) else {
        return Ok(DateWindow::unbounded());
    };
    let window = match code {
        PeriodCode::Today => DateWindow::new(Some(today), Some(today)),
        PeriodCode::Yesterday => {
            let y = today - Duration::days(1);
            DateWindow::new(Some(y), Some(y))
        }
        PeriodCode::ThisWeek => DateWindow::new(Some(week_start(today)), Some(today)),
        PeriodCode::LastWeek => {
            let end = week_start(today) - Duration::days(1);
            DateWindow::new(Some(end - Duration::days(6)), Some(end))
        }
        PeriodCode::ThisMonth => DateWindow::new(Some(month_start(today)), Some(today)),
        PeriodCode::LastMonth => {
            let end = month_start(today) - Duration::days(1);
            DateWindow::new(Some(month_start(end)), Some(end))
        }
        PeriodCode::LastQuarter => DateWindow::unbounded(),
        PeriodCode::ThisYear => DateWindow::new(NaiveDate::from_ymd_opt(today.year(), 1, 1), Some(today)),
        PeriodCode::LastYear => {
            let y = today.year() - 1;
            DateWindow::new(NaiveDate::from_ymd_opt(y, 1, 1), NaiveDate::from_ymd_opt(y, 12, 31))
        }
        PeriodCode::Custom => match (start, end) {
            (Some(s), Some(e)) if s > e => {
                return Err(DocketError::Validation(
                    "Start date must not be after end date.".to_string(),
                ));
            }
            (Some(s), Some(e)) => DateWindow::new(Some(s), Some(e)),
            _ => {
                return Err(DocketError::Validation(
                    "A custom period requires both a start and an end date.".to_string(),
                ));
            }
        },
    };
    Ok(window)
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

pub(crate) fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Last day of the month containing `date`.
pub(crate) fn month_end(date: NaiveDate) -> NaiveDate {
    let (y, m) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(y, m, 1)
        .map(|next| next - Duration::days(1))
        .unwrap_or(date)
}
