//! Monthly hours ceiling, checked when a lecturer submits a claim.
//!
//! The check runs against whatever snapshot the caller loaded. Two submissions racing in the same
//! month can both pass against a stale total; the ceiling is advisory, so that is accepted rather
//! than serialized.

use chrono::{Datelike, Days, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::claim::Claim;
use crate::domain::profile::LecturerId;
use crate::errors::ValidationFailure;

pub const DEFAULT_MONTHLY_HOURS_CAP: u32 = 300;

/// Inclusive first and last calendar day of a month.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl MonthWindow {
    pub fn containing(date: NaiveDate) -> Self {
        let start = date - Days::new(u64::from(date.day0()));
        let end = start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX);
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoursCapCheck {
    pub window: MonthWindow,
    pub existing_total: Decimal,
    pub projected_total: Decimal,
    pub remaining_after: Decimal,
}

#[derive(Clone, Debug)]
pub struct HoursCapValidator {
    ceiling: Decimal,
}

impl Default for HoursCapValidator {
    fn default() -> Self {
        Self::new(Decimal::from(DEFAULT_MONTHLY_HOURS_CAP))
    }
}

impl HoursCapValidator {
    pub fn new(ceiling: Decimal) -> Self {
        Self { ceiling }
    }

    pub fn ceiling(&self) -> Decimal {
        self.ceiling
    }

    /// Sum of hours on the lecturer's non-rejected claims dated inside the period's month.
    pub fn existing_month_total(
        &self,
        lecturer_id: &LecturerId,
        period: NaiveDate,
        claims: &[Claim],
    ) -> Decimal {
        let window = MonthWindow::containing(period);
        claims
            .iter()
            .filter(|claim| &claim.lecturer_id == lecturer_id)
            .filter(|claim| window.contains(claim.claim_date))
            .filter(|claim| claim.counts_toward_hours_cap())
            .map(|claim| claim.hours_worked)
            .sum()
    }

    /// Landing exactly on the ceiling is allowed; only a strictly greater total is refused.
    pub fn check(
        &self,
        lecturer_id: &LecturerId,
        period: NaiveDate,
        candidate_hours: Decimal,
        claims: &[Claim],
    ) -> Result<HoursCapCheck, ValidationFailure> {
        let existing_total = self.existing_month_total(lecturer_id, period, claims);
        let projected_total = existing_total + candidate_hours;

        if projected_total > self.ceiling {
            return Err(ValidationFailure::HoursCapExceeded {
                projected_total,
                ceiling: self.ceiling,
                remaining: self.ceiling - existing_total,
            });
        }

        Ok(HoursCapCheck {
            window: MonthWindow::containing(period),
            existing_total,
            projected_total,
            remaining_after: self.ceiling - projected_total,
        })
    }
}
