use std::collections::btree_map::{BTreeMap, Entry};
use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};
use tracing::debug;
use ulid::Ulid;

use crate::model::*;
use crate::wal::{Wal, WalHandle};

use super::{ReservationStore, StoreError, StoreTransaction};

pub type SharedAssetBook = Arc<RwLock<AssetBook>>;

/// All reservations of one asset, sorted by `slot.start`.
#[derive(Debug, Default)]
pub struct AssetBook {
    reservations: Vec<Reservation>,
}

impl AssetBook {
    /// Insert reservation maintaining sort order by slot start.
    fn insert(&mut self, reservation: Reservation) {
        let pos = self
            .reservations
            .partition_point(|r| r.slot.start <= reservation.slot.start);
        self.reservations.insert(pos, reservation);
    }

    /// Reservations whose slot overlaps `query`.
    /// Uses binary search to skip rows starting at or after `query.end`.
    pub fn overlapping(&self, query: TimeSlot) -> impl Iterator<Item = &Reservation> {
        let right_bound = self
            .reservations
            .partition_point(|r| r.slot.start < query.end);
        self.reservations[..right_bound]
            .iter()
            .filter(move |r| r.slot.end > query.start)
    }

    pub fn reservations(&self) -> &[Reservation] {
        &self.reservations
    }
}

/// Reservation store kept in memory, optionally made durable by a WAL.
///
/// A transaction takes an owned write lock on an asset's book the first time
/// it touches that asset and keeps it until commit or drop, so availability
/// checks and the writes based on them cannot interleave with another
/// transaction on the same asset.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    books: Arc<DashMap<AssetId, SharedAssetBook>>,
    wal: Option<WalHandle>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay the WAL at `path` and keep appending commits to it. A torn
    /// tail left by a crash is cut off first.
    /// Spawns the WAL writer, so it must run inside a tokio runtime.
    pub fn open(path: &Path, channel_capacity: usize) -> io::Result<Self> {
        let events = Wal::recover(path)?;
        let wal = Wal::open(path)?;

        let mut books: HashMap<AssetId, AssetBook> = HashMap::new();
        let mut replayed = 0usize;
        for event in events {
            match event {
                Event::TransactionCommitted { reservations, .. } => {
                    for reservation in reservations {
                        books.entry(reservation.asset_id).or_default().insert(reservation);
                        replayed += 1;
                    }
                }
            }
        }
        tracing::info!(path = %path.display(), replayed, "reservation store opened");

        Ok(Self {
            books: Arc::new(
                books
                    .into_iter()
                    .map(|(id, book)| (id, Arc::new(RwLock::new(book))))
                    .collect(),
            ),
            wal: Some(WalHandle::spawn(wal, channel_capacity)),
        })
    }

    /// Store a single row in its own transaction.
    pub async fn insert(&self, reservation: NewReservation) -> Result<Reservation, StoreError> {
        let mut tx = self.begin().await?;
        let created = tx.create(reservation).await?;
        tx.commit().await?;
        Ok(created)
    }

    /// Committed reservations of an asset, ordered by start. Waits for any
    /// open transaction on that asset to finish.
    pub async fn reservations(&self, asset_id: AssetId) -> Vec<Reservation> {
        let Some(book) = self.books.get(&asset_id).map(|e| e.value().clone()) else {
            return Vec::new();
        };
        let guard = book.read().await;
        guard.reservations().to_vec()
    }

    pub fn asset_ids(&self) -> Vec<AssetId> {
        self.books.iter().map(|e| *e.key()).collect()
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<InMemoryTransaction, StoreError> {
        Ok(InMemoryTransaction {
            id: Ulid::new(),
            books: self.books.clone(),
            wal: self.wal.clone(),
            locks: BTreeMap::new(),
            staged: Vec::new(),
            finished: false,
        })
    }
}

pub struct InMemoryTransaction {
    id: Ulid,
    books: Arc<DashMap<AssetId, SharedAssetBook>>,
    wal: Option<WalHandle>,
    locks: BTreeMap<AssetId, OwnedRwLockWriteGuard<AssetBook>>,
    staged: Vec<Reservation>,
    finished: bool,
}

impl InMemoryTransaction {
    /// Lock the asset's book for the rest of the transaction.
    async fn lock(&mut self, asset_id: AssetId) -> &AssetBook {
        let guard = match self.locks.entry(asset_id) {
            Entry::Occupied(e) => e.into_mut(),
            Entry::Vacant(e) => {
                let book = self.books.entry(asset_id).or_default().clone();
                e.insert(book.write_owned().await)
            }
        };
        &**guard
    }
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn find_overlapping(
        &mut self,
        asset_id: AssetId,
        slot: &TimeSlot,
        status: ApprovalStatus,
    ) -> Result<bool, StoreError> {
        let slot = *slot;
        let committed = self
            .lock(asset_id)
            .await
            .overlapping(slot)
            .any(|r| r.approval_status == status);
        let staged = self.staged.iter().any(|r| {
            r.asset_id == asset_id && r.approval_status == status && r.slot.overlaps(&slot)
        });
        Ok(committed || staged)
    }

    async fn create(&mut self, reservation: NewReservation) -> Result<Reservation, StoreError> {
        self.lock(reservation.asset_id).await;
        let created = reservation.into_reservation(Ulid::new(), Utc::now());
        self.staged.push(created.clone());
        Ok(created)
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        self.finished = true;
        let staged = std::mem::take(&mut self.staged);
        if staged.is_empty() {
            return Ok(());
        }

        if let Some(wal) = &self.wal {
            let event = Event::TransactionCommitted {
                tx_id: self.id,
                reservations: staged.clone(),
            };
            wal.append(event)
                .await
                .map_err(|e| StoreError::Wal(e.to_string()))?;
        }

        let count = staged.len();
        for reservation in staged {
            if let Some(book) = self.locks.get_mut(&reservation.asset_id) {
                book.insert(reservation);
            }
        }
        debug!(tx = %self.id, count, "transaction committed");
        Ok(())
    }

    async fn rollback(mut self) -> Result<(), StoreError> {
        self.finished = true;
        debug!(tx = %self.id, discarded = self.staged.len(), "transaction rolled back");
        self.staged.clear();
        Ok(())
    }
}

impl Drop for InMemoryTransaction {
    fn drop(&mut self) {
        if !self.finished {
            debug!(
                tx = %self.id,
                discarded = self.staged.len(),
                "transaction dropped without commit"
            );
        }

        // Release the locks, then forget books that are still empty. A book
        // shared with anyone else (a waiting transaction, a reader) stays, so
        // every holder keeps locking the same book.
        let locked = std::mem::take(&mut self.locks);
        let asset_ids: Vec<AssetId> = locked.keys().copied().collect();
        drop(locked);
        for asset_id in asset_ids {
            self.books.remove_if(&asset_id, |_, book| {
                Arc::strong_count(book) == 1
                    && book.try_read().is_ok_and(|b| b.reservations.is_empty())
            });
        }
    }
}
