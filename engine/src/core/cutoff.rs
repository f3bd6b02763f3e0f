//! Weekly cutoff calendar
//!
//! Two independent weekly notions live here:
//! - the cutoff date, the next occurrence of the anchor weekday on or after a
//!   date, used to group pending commissions for display;
//! - the payroll week, a fixed 7-day window counted from a reference epoch,
//!   used to stamp the period of a generated batch.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Offset, Utc, Weekday};
use shared::PayrollPeriod;

use crate::error::{CoreError, CoreResult};

pub const DEFAULT_ANCHOR: Weekday = Weekday::Wed;

/// Reference epoch of payroll week numbering (a Monday)
pub fn default_week_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default()
}

/// Next occurrence of `anchor` on or after `date`
pub fn next_cutoff_for(anchor: Weekday, date: NaiveDate) -> NaiveDate {
    let target = anchor.num_days_from_monday();
    let current = date.weekday().num_days_from_monday();
    let days_ahead = (target + 7 - current) % 7;
    date + Duration::days(i64::from(days_ahead))
}

/// Next cutoff with the default Wednesday anchor
pub fn next_cutoff(date: NaiveDate) -> NaiveDate {
    next_cutoff_for(DEFAULT_ANCHOR, date)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CutoffCalendar {
    anchor: Weekday,
    week_epoch: NaiveDate,
    offset: FixedOffset,
}

impl CutoffCalendar {
    pub fn new(anchor: Weekday, week_epoch: NaiveDate, utc_offset_minutes: i32) -> CoreResult<Self> {
        let offset = FixedOffset::east_opt(utc_offset_minutes * 60).ok_or_else(|| {
            CoreError::config("utc_offset_minutes", format!("{utc_offset_minutes} is out of range"))
        })?;
        Ok(Self {
            anchor,
            week_epoch,
            offset,
        })
    }

    pub fn anchor(&self) -> Weekday {
        self.anchor
    }

    pub fn next_cutoff(&self, date: NaiveDate) -> NaiveDate {
        next_cutoff_for(self.anchor, date)
    }

    /// Calendar date of an instant in the configured business timezone
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// Cutoff that an installation at `instant` belongs to
    pub fn cutoff_for(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.next_cutoff(self.local_date(instant))
    }

    /// Payroll week index of `date`; negative before the epoch
    pub fn week_number(&self, date: NaiveDate) -> i64 {
        (date - self.week_epoch).num_days().div_euclid(7)
    }

    pub fn period_for(&self, date: NaiveDate) -> PayrollPeriod {
        let week_number = self.week_number(date);
        let start = self.week_epoch + Duration::days(week_number * 7);
        PayrollPeriod {
            week_number,
            start,
            end: start + Duration::days(6),
        }
    }

    pub fn batch_name(period: &PayrollPeriod) -> String {
        format!(
            "Payroll week {} ({} to {})",
            period.week_number, period.start, period.end
        )
    }
}

impl Default for CutoffCalendar {
    fn default() -> Self {
        Self {
            anchor: DEFAULT_ANCHOR,
            week_epoch: default_week_epoch(),
            offset: Utc.fix(),
        }
    }
}
