//! Recurring reservation core: expands daily and weekly recurrence requests
//! into concrete time slots and commits them all-or-nothing, refusing any
//! slot that overlaps an approved reservation of the same asset.

pub mod config;
pub mod engine;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod response;
pub mod store;
pub mod wal;

pub use engine::{Coordinator, Created, EngineError};
pub use model::{Asset, AssetId, Requester, Reservation, ReservationRequest, TimeSlot};
pub use notify::{NotificationSink, NotifyHub};
pub use response::Response;
pub use store::{AssetCatalog, InMemoryCatalog, InMemoryStore, ReservationStore, StoreError};
