use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

pub type AssetId = Ulid;
pub type ReservationId = Ulid;

/// Opaque caller-supplied fields (purpose, title, ...) copied onto every reservation.
pub type Attributes = BTreeMap<String, String>;

/// Concrete reservation slot on one calendar day, half-open `[start, end)`.
///
/// Timestamps are naive: whatever timezone the caller works in is carried
/// through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeSlot {
    pub date: NaiveDate,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeSlot {
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && other.start < self.end
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// Weekday selection. Codes follow `0 = Sunday` .. `6 = Saturday`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const EMPTY: WeekdaySet = WeekdaySet(0);

    /// Build a set from weekday codes. Returns the first out-of-range code on failure.
    pub fn from_codes(codes: &[u8]) -> Result<Self, u8> {
        let mut bits = 0u8;
        for &code in codes {
            if code > 6 {
                return Err(code);
            }
            bits |= 1 << code;
        }
        Ok(Self(bits))
    }

    pub fn from_weekdays(days: impl IntoIterator<Item = Weekday>) -> Self {
        days.into_iter().fold(Self::EMPTY, |set, day| set.with(day))
    }

    pub fn with(self, day: Weekday) -> Self {
        Self(self.0 | 1 << day.num_days_from_sunday())
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_sunday()) != 0
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.contains(date.weekday())
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

/// Identity of whoever places the reservation, snapshotted at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requester {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Inbound recurring reservation request.
///
/// `week` doubles as the mode switch: absent means daily recurrence, present
/// means weekly recurrence with that stride in weeks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationRequest {
    pub asset_id: AssetId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub from: String,
    pub to: String,
    pub days: Vec<u8>,
    #[serde(default)]
    pub week: Option<u32>,
    #[serde(default)]
    pub attributes: Attributes,
}

/// Field set handed to the store for one new row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReservation {
    pub asset_id: AssetId,
    pub asset_name: String,
    pub asset_description: Option<String>,
    pub slot: TimeSlot,
    pub requester: Requester,
    pub approval_status: ApprovalStatus,
    pub attributes: Attributes,
}

impl NewReservation {
    /// An approved reservation of `asset` for `slot`, snapshotting requester and asset.
    pub fn approved(
        request: &ReservationRequest,
        requester: &Requester,
        asset: &Asset,
        slot: TimeSlot,
    ) -> Self {
        Self {
            asset_id: asset.id,
            asset_name: asset.name.clone(),
            asset_description: asset.description.clone(),
            slot,
            requester: requester.clone(),
            approval_status: ApprovalStatus::Approved,
            attributes: request.attributes.clone(),
        }
    }

    pub fn into_reservation(self, id: ReservationId, created_at: DateTime<Utc>) -> Reservation {
        Reservation {
            id,
            asset_id: self.asset_id,
            asset_name: self.asset_name,
            asset_description: self.asset_description,
            slot: self.slot,
            requester: self.requester,
            approval_status: self.approval_status,
            attributes: self.attributes,
            created_at,
        }
    }
}

/// A persisted reservation. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub asset_id: AssetId,
    pub asset_name: String,
    pub asset_description: Option<String>,
    pub slot: TimeSlot,
    pub requester: Requester,
    pub approval_status: ApprovalStatus,
    pub attributes: Attributes,
    pub created_at: DateTime<Utc>,
}

/// WAL record format. One record per committed transaction so replay is all-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    TransactionCommitted {
        tx_id: Ulid,
        reservations: Vec<Reservation>,
    },
}
