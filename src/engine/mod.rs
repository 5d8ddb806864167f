mod availability;
mod error;
mod recurrence;
mod slot;

pub use availability::{check_availability, is_available};
pub use error::EngineError;
pub use recurrence::{DailyPlan, RecurrencePlan, WeeklyPlan};
pub use slot::{parse_time_of_day, TimeWindow};

use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::limits::*;
use crate::model::*;
use crate::notify::NotificationSink;
use crate::observability;
use crate::store::{AssetCatalog, ReservationStore, StoreError, StoreTransaction};

/// Result of a committed recurring request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub count: usize,
    pub reservations: Vec<Reservation>,
}

/// Drives one recurring request from expansion to commit.
///
/// Every slot of a request is checked and written inside one store
/// transaction. The first unavailable slot aborts the whole batch; so does any
/// store or catalog failure. Notifications go out only after commit, one per
/// created reservation, in creation order.
pub struct Coordinator<S, C, N> {
    store: S,
    catalog: C,
    sink: N,
}

impl<S, C, N> Coordinator<S, C, N>
where
    S: ReservationStore,
    C: AssetCatalog,
    N: NotificationSink,
{
    pub fn new(store: S, catalog: C, sink: N) -> Self {
        Self {
            store,
            catalog,
            sink,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub async fn submit(
        &self,
        requester: &Requester,
        request: &ReservationRequest,
    ) -> Result<Created, EngineError> {
        let started = Instant::now();
        let result = self.run(requester, request).await;

        let mode = if request.week.is_some() { "weekly" } else { "daily" };
        metrics::counter!(
            observability::REQUESTS_TOTAL,
            "mode" => mode,
            "outcome" => observability::outcome_label(&result)
        )
        .increment(1);
        metrics::histogram!(observability::SUBMIT_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());

        let asset_id = request.asset_id;
        match &result {
            Ok(created) => {
                metrics::counter!(observability::RESERVATIONS_CREATED_TOTAL)
                    .increment(created.count as u64);
                info!(
                    %asset_id,
                    mode,
                    count = created.count,
                    requester = %requester.id,
                    "reservations created"
                );
            }
            Err(EngineError::Internal(cause)) => {
                error!(%asset_id, mode, "reservation batch aborted: {cause}");
            }
            Err(e @ EngineError::Conflict { .. }) => warn!(%asset_id, mode, "{e}"),
            Err(e) => debug!(%asset_id, mode, "request rejected: {e}"),
        }
        result
    }

    async fn run(
        &self,
        requester: &Requester,
        request: &ReservationRequest,
    ) -> Result<Created, EngineError> {
        validate_attributes(&request.attributes)?;
        let window = TimeWindow::parse(&request.from, &request.to)?;
        let plan = RecurrencePlan::from_request(request)?;
        let dates = plan.expand_up_to(MAX_DATES_PER_REQUEST + 1);
        if dates.len() > MAX_DATES_PER_REQUEST {
            return Err(EngineError::LimitExceeded("recurrence expands to too many dates"));
        }

        let mut tx = self.store.begin().await?;
        let mut asset: Option<Asset> = None;
        let mut created = Vec::with_capacity(dates.len());

        for date in dates {
            let slot = window.on(date);
            if !is_available(&mut tx, request.asset_id, &slot).await? {
                tx.rollback().await?;
                return Err(EngineError::Conflict {
                    asset_id: request.asset_id,
                    slot,
                });
            }

            // Looked up on first use; the asset is read-only for the transaction.
            let snapshot = match asset.take() {
                Some(snapshot) => snapshot,
                None => self.find_asset(request.asset_id).await?,
            };
            let reservation = tx
                .create(NewReservation::approved(request, requester, &snapshot, slot))
                .await?;
            created.push(reservation);
            asset = Some(snapshot);
        }

        let Some(asset) = asset else {
            tx.rollback().await?;
            return Err(EngineError::NoReservationCreated);
        };
        tx.commit().await?;

        for reservation in &created {
            self.sink.notify(reservation, &asset);
        }
        Ok(Created {
            count: created.len(),
            reservations: created,
        })
    }

    async fn find_asset(&self, id: AssetId) -> Result<Asset, EngineError> {
        self.catalog
            .find_by_id(id)
            .await?
            .ok_or_else(|| StoreError::AssetNotFound(id).into())
    }
}

fn validate_attributes(attributes: &Attributes) -> Result<(), EngineError> {
    if attributes.len() > MAX_ATTRIBUTES {
        return Err(EngineError::LimitExceeded("too many attributes"));
    }
    let oversized = attributes
        .iter()
        .any(|(k, v)| k.len() > MAX_ATTRIBUTE_LEN || v.len() > MAX_ATTRIBUTE_LEN);
    if oversized {
        return Err(EngineError::LimitExceeded("attribute too long"));
    }
    Ok(())
}
