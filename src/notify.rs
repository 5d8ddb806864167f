use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::model::{Asset, AssetId, Reservation};

const CHANNEL_CAPACITY: usize = 256;

/// Receives one call per reservation that made it into a committed transaction.
/// Called only after the commit succeeds; never for rows that were rolled back.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, reservation: &Reservation, asset: &Asset);
}

impl<F> NotificationSink for F
where
    F: Fn(&Reservation, &Asset) + Send + Sync,
{
    fn notify(&self, reservation: &Reservation, asset: &Asset) {
        self(reservation, asset)
    }
}

/// Payload broadcast to subscribers of an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReservationNotice {
    pub reservation: Reservation,
    pub asset: Asset,
}

/// Broadcast hub for reservation notices, one channel per asset.
/// Clones share the same channels.
#[derive(Clone, Default)]
pub struct NotifyHub {
    channels: Arc<DashMap<AssetId, broadcast::Sender<ReservationNotice>>>,
}

impl NotifyHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to notices for an asset. Creates the channel if needed.
    pub fn subscribe(&self, asset_id: AssetId) -> broadcast::Receiver<ReservationNotice> {
        let sender = self
            .channels
            .entry(asset_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Send a notice. No-op if nobody is listening.
    pub fn send(&self, notice: ReservationNotice) {
        if let Some(sender) = self.channels.get(&notice.asset.id) {
            let _ = sender.send(notice);
        }
    }

    pub fn remove(&self, asset_id: &AssetId) {
        self.channels.remove(asset_id);
    }
}

impl NotificationSink for NotifyHub {
    fn notify(&self, reservation: &Reservation, asset: &Asset) {
        self.send(ReservationNotice {
            reservation: reservation.clone(),
            asset: asset.clone(),
        });
    }
}
