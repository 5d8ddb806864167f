use thiserror::Error;

use crate::model::{AssetId, TimeSlot};
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("malformed time of day: {0:?}")]
    MalformedTimeOfDay(String),

    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),

    #[error("limit exceeded: {0}")]
    LimitExceeded(&'static str),

    #[error("asset already reserved at {slot}")]
    Conflict { asset_id: AssetId, slot: TimeSlot },

    #[error("no reservation created")]
    NoReservationCreated,

    /// The cause stays in the source chain; it is logged, never shown to callers.
    #[error("internal error")]
    Internal(#[from] StoreError),
}

impl EngineError {
    /// True for rejections decided before any transaction was opened.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            EngineError::MalformedTimeOfDay(_)
                | EngineError::InvalidRequest(_)
                | EngineError::LimitExceeded(_)
        )
    }
}
