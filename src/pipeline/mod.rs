//! Batch assembly: demand expansion, sampling, resolution and the join.
//!
//! Every row carries its index from expansion through to the output, so
//! results that finish out of order are put back where they belong and the
//! join onto clients never depends on position.

mod demand;
mod generator;
mod join;
mod plan;
mod resolve;

use serde::Deserialize;

use crate::error::Error;

pub use demand::{expand, DemandPolicy, Slot};
pub use generator::{AddressGenerator, Batch, GeneratorSettings, SamplingSettings, DEFAULT_MAX_REDRAWS};
pub use join::join_rows;
pub use plan::{Plan, PlannedAddress, Planner, ADDRESS_ID_PREFIX};
pub use resolve::{resolve_all, ResolveSettings, Resolved};

/// What happens to a row whose sampling or resolution failed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Abort the batch on the first failed row
    #[default]
    Strict,
    /// Drop the row and report it
    Lenient,
}

/// A row dropped under [`FailurePolicy::Lenient`]
#[derive(Debug)]
pub struct RowFailure {
    pub row: usize,
    pub client_id: String,
    pub error: Error,
}
