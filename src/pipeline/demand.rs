//! Per-client address demand and expansion into one slot per address.

use rand::Rng;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::Client;

/// Number of addresses each client receives: uniform over `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawDemand")]
pub struct DemandPolicy {
    min: u32,
    max: u32,
}

#[derive(Deserialize)]
#[serde(default)]
struct RawDemand {
    min: u32,
    max: u32,
}

impl Default for RawDemand {
    fn default() -> Self {
        let policy = DemandPolicy::default();
        Self {
            min: policy.min,
            max: policy.max,
        }
    }
}

impl TryFrom<RawDemand> for DemandPolicy {
    type Error = Error;

    fn try_from(raw: RawDemand) -> Result<Self> {
        DemandPolicy::new(raw.min, raw.max)
    }
}

impl Default for DemandPolicy {
    fn default() -> Self {
        Self { min: 1, max: 3 }
    }
}

impl DemandPolicy {
    /// Inclusive bounds; every client gets at least one address.
    pub fn new(min: u32, max: u32) -> Result<Self> {
        if min == 0 {
            return Err(Error::config("minimum addresses per client must be at least 1"));
        }
        if min > max {
            return Err(Error::config(format!(
                "minimum addresses per client ({}) exceeds maximum ({})",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    /// Same count for every client
    pub fn fixed(count: u32) -> Result<Self> {
        Self::new(count, count)
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        if self.min == self.max {
            return self.min;
        }
        rng.random_range(self.min..=self.max)
    }
}

/// One address to generate. `row` is the ordering and join key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub row: usize,
    pub client_id: String,
}

/// Repeat each client id by its drawn demand, keeping client order.
pub fn expand<R: Rng + ?Sized>(clients: &[Client], demand: &DemandPolicy, rng: &mut R) -> Vec<Slot> {
    let mut slots = Vec::new();
    for client in clients {
        for _ in 0..demand.draw(rng) {
            slots.push(Slot {
                row: slots.len(),
                client_id: client.client_id.clone(),
            });
        }
    }
    slots
}
