//! Recurrence expansion: turns a recurring request into the ordered list of
//! calendar dates on which a reservation must be attempted.
//!
//! Two strategies exist. [`DailyPlan`] walks every day of the range and keeps
//! the selected weekdays. [`WeeklyPlan`] finds one anchor per selected weekday
//! in the Monday-first week containing the start date, then steps each anchor
//! forward by `stride` weeks. Weekly output is anchor-major: all dates of the
//! first anchor, then all dates of the second, and so on.

use chrono::{Datelike, Days, NaiveDate};

use crate::model::{ReservationRequest, WeekdaySet};

use super::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyPlan {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: WeekdaySet,
}

impl DailyPlan {
    pub fn expand(&self) -> Vec<NaiveDate> {
        self.expand_up_to(usize::MAX)
    }

    /// The first `limit` dates of [`expand`](Self::expand).
    pub fn expand_up_to(&self, limit: usize) -> Vec<NaiveDate> {
        if self.days.is_empty() {
            return Vec::new();
        }
        self.start
            .iter_days()
            .take_while(|date| *date <= self.end)
            .filter(|date| self.days.contains_date(*date))
            .take(limit)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklyPlan {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: WeekdaySet,
    /// Weeks between consecutive occurrences of one anchor. Always >= 1.
    pub stride: u32,
}

impl WeeklyPlan {
    /// One date per selected weekday, walking forward from the Monday of the
    /// week containing `start`. May include dates before `start`.
    pub fn anchors(&self) -> Vec<NaiveDate> {
        let offset = u64::from(self.start.weekday().num_days_from_monday());
        let Some(monday) = self.start.checked_sub_days(Days::new(offset)) else {
            return Vec::new();
        };
        monday
            .iter_days()
            .take(7)
            .filter(|date| self.days.contains_date(*date))
            .collect()
    }

    pub fn expand(&self) -> Vec<NaiveDate> {
        self.expand_up_to(usize::MAX)
    }

    /// The first `limit` dates of [`expand`](Self::expand), in the same order.
    pub fn expand_up_to(&self, limit: usize) -> Vec<NaiveDate> {
        let step = Days::new(7 * u64::from(self.stride));
        let mut dates = Vec::new();
        for anchor in self.anchors() {
            let mut cursor = Some(anchor);
            while let Some(date) = cursor
                && date <= self.end
            {
                if dates.len() == limit {
                    return dates;
                }
                if date >= self.start {
                    dates.push(date);
                }
                cursor = date.checked_add_days(step);
            }
        }
        dates
    }
}

/// Recurrence strategy, selected by request shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecurrencePlan {
    Daily(DailyPlan),
    Weekly(WeeklyPlan),
}

impl RecurrencePlan {
    pub fn from_request(request: &ReservationRequest) -> Result<Self, EngineError> {
        if request.start_date > request.end_date {
            return Err(EngineError::InvalidRequest("start_date is after end_date"));
        }
        let days = WeekdaySet::from_codes(&request.days)
            .map_err(|_| EngineError::InvalidRequest("weekday codes must be within 0..=6"))?;

        Ok(match request.week {
            None => RecurrencePlan::Daily(DailyPlan {
                start: request.start_date,
                end: request.end_date,
                days,
            }),
            Some(0) => return Err(EngineError::InvalidRequest("week stride must be at least 1")),
            Some(stride) => RecurrencePlan::Weekly(WeeklyPlan {
                start: request.start_date,
                end: request.end_date,
                days,
                stride,
            }),
        })
    }

    pub fn expand(&self) -> Vec<NaiveDate> {
        self.expand_up_to(usize::MAX)
    }

    /// Stops once `limit` dates are collected, however wide the range.
    pub fn expand_up_to(&self, limit: usize) -> Vec<NaiveDate> {
        match self {
            RecurrencePlan::Daily(plan) => plan.expand_up_to(limit),
            RecurrencePlan::Weekly(plan) => plan.expand_up_to(limit),
        }
    }

    /// Short label for logs and metrics.
    pub fn mode(&self) -> &'static str {
        match self {
            RecurrencePlan::Daily(_) => "daily",
            RecurrencePlan::Weekly(_) => "weekly",
        }
    }
}
