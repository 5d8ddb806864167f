use chrono::{NaiveDate, NaiveTime};

use crate::model::TimeSlot;

use super::EngineError;

const TIME_FORMATS: [&str; 3] = ["%H:%M", "%H:%M:%S", "%H:%M:%S%.f"];

/// Parse a time-of-day string such as `09:00` or `09:00:30`.
pub fn parse_time_of_day(raw: &str) -> Result<NaiveTime, EngineError> {
    let trimmed = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| EngineError::MalformedTimeOfDay(raw.to_string()))
}

/// Daily time-of-day window shared by every slot of a request. Same-day only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub from: NaiveTime,
    pub to: NaiveTime,
}

impl TimeWindow {
    pub fn parse(from: &str, to: &str) -> Result<Self, EngineError> {
        let from = parse_time_of_day(from)?;
        let to = parse_time_of_day(to)?;
        if from >= to {
            return Err(EngineError::InvalidRequest("time window must end after it starts"));
        }
        Ok(Self { from, to })
    }

    /// Pin the window to a calendar date.
    pub fn on(&self, date: NaiveDate) -> TimeSlot {
        TimeSlot {
            date,
            start: date.and_time(self.from),
            end: date.and_time(self.to),
        }
    }
}

impl TimeSlot {
    /// Combine a date with two time-of-day strings into a concrete slot.
    pub fn build(date: NaiveDate, from: &str, to: &str) -> Result<TimeSlot, EngineError> {
        Ok(TimeWindow::parse(from, to)?.on(date))
    }
}
