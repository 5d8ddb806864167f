//! Persistence contracts consumed by the coordinator, plus in-memory implementations.
//!
//! A [`ReservationStore`] hands out [`StoreTransaction`]s. Implementations must
//! make the availability check and the writes that follow it atomic with
//! respect to other transactions on the same asset: either serializable
//! isolation or a lock on the asset's reservation set held until commit.
//! Dropping a transaction without committing rolls it back.

mod catalog;
mod memory;

pub use catalog::InMemoryCatalog;
pub use memory::{InMemoryStore, InMemoryTransaction};

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{ApprovalStatus, Asset, AssetId, NewReservation, Reservation, TimeSlot};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("asset not found: {0}")]
    AssetNotFound(AssetId),

    #[error("WAL error: {0}")]
    Wal(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait ReservationStore: Send + Sync {
    type Transaction: StoreTransaction;

    async fn begin(&self) -> Result<Self::Transaction, StoreError>;
}

#[async_trait]
pub trait StoreTransaction: Send {
    /// True if a reservation with `status` on `asset_id` overlaps `slot`.
    /// Sees rows staged earlier in this transaction.
    async fn find_overlapping(
        &mut self,
        asset_id: AssetId,
        slot: &TimeSlot,
        status: ApprovalStatus,
    ) -> Result<bool, StoreError>;

    async fn create(&mut self, reservation: NewReservation) -> Result<Reservation, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}

#[async_trait]
pub trait AssetCatalog: Send + Sync {
    async fn find_by_id(&self, id: AssetId) -> Result<Option<Asset>, StoreError>;
}

#[async_trait]
impl<T: AssetCatalog + ?Sized> AssetCatalog for Arc<T> {
    async fn find_by_id(&self, id: AssetId) -> Result<Option<Asset>, StoreError> {
        (**self).find_by_id(id).await
    }
}
