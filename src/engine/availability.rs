use crate::model::{ApprovalStatus, AssetId, TimeSlot};
use crate::store::{ReservationStore, StoreError, StoreTransaction};

/// True iff no approved reservation of `asset_id` overlaps `slot`.
///
/// Runs inside the caller's transaction; the store's isolation is what keeps
/// the answer valid until that transaction commits.
pub async fn is_available<T>(
    tx: &mut T,
    asset_id: AssetId,
    slot: &TimeSlot,
) -> Result<bool, StoreError>
where
    T: StoreTransaction + ?Sized,
{
    let taken = tx
        .find_overlapping(asset_id, slot, ApprovalStatus::Approved)
        .await?;
    tracing::debug!(%asset_id, %slot, taken, "availability checked");
    Ok(!taken)
}

/// One-off availability check in its own short transaction.
pub async fn check_availability<S>(
    store: &S,
    asset_id: AssetId,
    slot: &TimeSlot,
) -> Result<bool, StoreError>
where
    S: ReservationStore + ?Sized,
{
    let mut tx = store.begin().await?;
    let available = is_available(&mut tx, asset_id, slot).await?;
    tx.rollback().await?;
    Ok(available)
}
