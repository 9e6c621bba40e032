//! Trace-quality metrics for the admin reports.

use agritrace_ledger::TraceLedger;
use agritrace_store::{CropFilter, CropStore};

use crate::journey::JourneyError;

/// Share of registered batches with at least `min_steps` recorded events,
/// as a percentage in `0.0..=100.0`. Zero batches counts as 0%.
pub fn completeness<S, L>(stores: &S, ledger: &L, min_steps: usize) -> Result<f64, JourneyError>
where
    S: CropStore,
    L: TraceLedger,
{
    let crops = stores.list_crops(&CropFilter::default())?;
    if crops.is_empty() {
        return Ok(0.0);
    }

    let mut complete = 0usize;
    for crop in &crops {
        let events = ledger.list_by_batch(crop.batch_id())?;
        if events.len() >= min_steps {
            complete += 1;
        }
    }

    Ok(complete as f64 / crops.len() as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agritrace_core::{BatchId, CropId, Money, Quantity, UserId};
    use agritrace_crops::{Crop, NewCrop};
    use agritrace_ledger::{InMemoryTraceLedger, StepType, TraceAppend};
    use agritrace_store::InMemoryStores;
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    fn crop_with_batch(batch: BatchId) -> Crop {
        Crop::register(
            CropId::new(),
            UserId::new(),
            batch,
            NewCrop {
                name: "Rice".to_string(),
                category: "Cereals".to_string(),
                quantity: Quantity::new(Decimal::from(10)).unwrap(),
                unit_price: Money::new(Decimal::from(40)).unwrap(),
                harvest_date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
                photo_url: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn completeness_counts_batches_with_enough_steps() {
        let stores = InMemoryStores::new();
        let ledger = InMemoryTraceLedger::new();

        let traced = BatchId::generate();
        let untraced = BatchId::generate();
        stores.insert_crop(crop_with_batch(traced.clone())).unwrap();
        stores.insert_crop(crop_with_batch(untraced)).unwrap();

        for step in [StepType::Harvest, StepType::Transport] {
            ledger
                .append(TraceAppend {
                    batch_id: traced.clone(),
                    step_type: step,
                    actor: UserId::new(),
                    details: String::new(),
                    location: None,
                })
                .unwrap();
        }

        let pct = completeness(&stores, &ledger, 2).unwrap();
        assert!((pct - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn completeness_of_empty_registry_is_zero() {
        let stores = InMemoryStores::new();
        let ledger = InMemoryTraceLedger::new();
        assert_eq!(completeness(&stores, &ledger, 2).unwrap(), 0.0);
    }
}
