//! Bounded concurrent address resolution.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use tracing::{info, warn};

use super::plan::PlannedAddress;
use super::{FailurePolicy, RowFailure};
use crate::error::{Error, Result, Stage};
use crate::geocode::{resolve_with_retry, ReverseGeocoder, RetryPolicy, Throttled};
use crate::models::AddressRecord;

#[derive(Debug, Clone, Copy)]
pub struct ResolveSettings {
    /// Maximum requests in flight
    pub concurrency: usize,
    pub retry: RetryPolicy,
    /// Minimum gap between request starts across all workers
    pub min_interval: Duration,
}

impl Default for ResolveSettings {
    fn default() -> Self {
        Self {
            concurrency: 4,
            retry: RetryPolicy::default(),
            min_interval: Duration::ZERO,
        }
    }
}

#[derive(Debug, Default)]
pub struct Resolved {
    /// Resolved addresses in row order
    pub records: Vec<AddressRecord>,
    pub failures: Vec<RowFailure>,
}

/// Resolve every planned row with at most `concurrency` lookups in flight,
/// starting them no closer together than `min_interval`.
///
/// Under `Strict` the first failure returns immediately; dropping the stream
/// cancels outstanding lookups and no further ones are started.
pub async fn resolve_all<G: ReverseGeocoder + ?Sized>(
    geocoder: &G,
    rows: Vec<PlannedAddress>,
    settings: &ResolveSettings,
    policy: FailurePolicy,
    progress: Option<&ProgressBar>,
) -> Result<Resolved> {
    let total = rows.len();
    let retry = settings.retry;
    let throttled = Throttled::new(geocoder, settings.min_interval);
    let geocoder = &throttled;

    let mut results = stream::iter(rows.into_iter().enumerate())
        .map(|(position, planned)| async move {
            let outcome = resolve_with_retry(geocoder, planned.point, &retry).await;
            (position, planned, outcome)
        })
        .buffer_unordered(settings.concurrency.max(1));

    let mut slots: Vec<Option<AddressRecord>> = (0..total).map(|_| None).collect();
    let mut failures = Vec::new();

    while let Some((position, planned, outcome)) = results.next().await {
        if let Some(pb) = progress {
            pb.inc(1);
        }
        match outcome {
            Ok(fields) => slots[position] = Some(planned.into_record(fields)),
            Err(e) => {
                let error = Error::from(e).at_row(planned.row, &planned.client_id, Stage::Resolution);
                match policy {
                    FailurePolicy::Strict => return Err(error),
                    FailurePolicy::Lenient => {
                        warn!("Dropping row: {}", error);
                        failures.push(RowFailure {
                            row: planned.row,
                            client_id: planned.client_id,
                            error,
                        });
                    }
                }
            }
        }
    }

    failures.sort_by_key(|f| f.row);
    let records: Vec<AddressRecord> = slots.into_iter().flatten().collect();
    info!(
        "Resolved {}/{} addresses ({} failed)",
        records.len(),
        total,
        failures.len()
    );

    Ok(Resolved { records, failures })
}
