use serde::Serialize;
use thiserror::Error;

use agritrace_core::BatchId;
use agritrace_crops::Crop;
use agritrace_ledger::{LedgerError, TraceEvent, TraceLedger};
use agritrace_store::{CropStore, StoreError, UserStore};

use crate::display::{step_display, StepDisplay};

/// The farmer fields a consumer-facing journey is allowed to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FarmerProfile {
    pub name: String,
    pub phone: String,
}

/// One annotated timeline entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JourneyStep {
    pub event: TraceEvent,
    pub display: StepDisplay,
}

/// The assembled journey for one batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchJourney {
    pub crop: Crop,
    /// `None` when the owning farmer row is missing (dangling reference);
    /// the journey still renders.
    pub farmer: Option<FarmerProfile>,
    pub steps: Vec<JourneyStep>,
}

#[derive(Debug, Error)]
pub enum JourneyError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Reconstruct the journey for a batch id.
///
/// Returns `Ok(None)` when no crop row matches — the expected path for an
/// unknown or not-yet-registered batch, distinct from a backend failure.
/// Otherwise returns the crop, the farmer's public profile, and every event
/// ever appended for the batch, in ledger order.
pub fn trace_batch<S, L>(
    stores: &S,
    ledger: &L,
    batch_id: &BatchId,
) -> Result<Option<BatchJourney>, JourneyError>
where
    S: CropStore + UserStore,
    L: TraceLedger,
{
    let Some(crop) = stores.find_crop_by_batch(batch_id)? else {
        tracing::debug!(batch_id = %batch_id, "trace lookup for unknown batch");
        return Ok(None);
    };

    let farmer = stores.get_user(&crop.farmer())?.map(|user| FarmerProfile {
        name: user.name().to_string(),
        phone: user.phone().to_string(),
    });

    let steps = ledger
        .list_by_batch(batch_id)?
        .into_iter()
        .map(|event| {
            let display = step_display(&event.step_type);
            JourneyStep { event, display }
        })
        .collect();

    Ok(Some(BatchJourney { crop, farmer, steps }))
}
