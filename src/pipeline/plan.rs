//! Neighborhood draws and point sampling for every expanded row.

use std::collections::BTreeMap;

use rand::Rng;
use tracing::{debug, info, warn};

use super::demand::Slot;
use super::{FailurePolicy, RowFailure};
use crate::error::{Error, Result, Stage};
use crate::geometry::{GeometryStore, PointSampler};
use crate::models::{generate_id, AddressFields, AddressRecord, GeoPoint};
use crate::population::NeighborhoodSampler;

pub const ADDRESS_ID_PREFIX: &str = "adr";

/// A sampled, not yet resolved, address
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedAddress {
    pub row: usize,
    pub client_id: String,
    pub address_id: String,
    pub neighborhood: String,
    pub point: GeoPoint,
}

impl PlannedAddress {
    pub fn into_record(self, fields: AddressFields) -> AddressRecord {
        AddressRecord {
            client_id: self.client_id,
            address_id: self.address_id,
            neighborhood: self.neighborhood,
            coordinates: self.point,
            fields,
        }
    }
}

/// Output of the sampling stage, in row order
#[derive(Debug)]
pub struct Plan {
    pub rows: Vec<PlannedAddress>,
    pub failures: Vec<RowFailure>,
    /// Total rows requested by the demand draw
    pub demanded: usize,
}

/// Sampling stage inputs shared across rows
pub struct Planner<'a> {
    pub neighborhoods: &'a NeighborhoodSampler,
    pub geometry: &'a GeometryStore,
    pub points: PointSampler,
    /// Fresh neighborhood draws allowed after a sampling timeout
    pub max_redraws: usize,
    pub policy: FailurePolicy,
}

impl Planner<'_> {
    /// Draw a neighborhood and a point for every slot.
    ///
    /// Rows are grouped by neighborhood so each boundary is looked up once.
    /// A missing boundary aborts the whole plan; a sampling timeout is
    /// retried in a freshly drawn neighborhood before the row fails.
    pub fn plan<R: Rng + ?Sized>(&self, slots: &[Slot], rng: &mut R) -> Result<Plan> {
        let mut groups: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for index in 0..slots.len() {
            groups
                .entry(self.neighborhoods.sample_neighborhood(rng))
                .or_default()
                .push(index);
        }

        let mut sampled: Vec<Option<(String, GeoPoint)>> = vec![None; slots.len()];
        let mut timed_out: Vec<(usize, Error)> = Vec::new();

        for (name, indices) in &groups {
            let polygon = self.geometry.lookup(name)?;
            debug!("Sampling {} points in {}", indices.len(), name);

            for &index in indices {
                match self.points.sample_point(polygon, rng) {
                    Ok(point) => sampled[index] = Some((name.to_string(), point)),
                    Err(e @ Error::SamplingTimeout { .. }) => {
                        warn!("Sampling in '{}' timed out for row {}", name, slots[index].row);
                        timed_out.push((index, e));
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        let mut failures = Vec::new();
        timed_out.sort_by_key(|(index, _)| *index);
        for (index, first_error) in timed_out {
            match self.redraw(rng)? {
                Ok(found) => sampled[index] = Some(found),
                Err(last_error) => {
                    let slot = &slots[index];
                    let error = last_error
                        .unwrap_or(first_error)
                        .at_row(slot.row, &slot.client_id, Stage::Sampling);
                    match self.policy {
                        FailurePolicy::Strict => return Err(error),
                        FailurePolicy::Lenient => {
                            warn!("Dropping row: {}", error);
                            failures.push(RowFailure {
                                row: slot.row,
                                client_id: slot.client_id.clone(),
                                error,
                            });
                        }
                    }
                }
            }
        }

        let rows: Vec<PlannedAddress> = slots
            .iter()
            .zip(sampled)
            .filter_map(|(slot, found)| {
                found.map(|(neighborhood, point)| (slot, neighborhood, point))
            })
            .map(|(slot, neighborhood, point)| PlannedAddress {
                row: slot.row,
                client_id: slot.client_id.clone(),
                address_id: generate_id(ADDRESS_ID_PREFIX, rng),
                neighborhood,
                point,
            })
            .collect();

        info!(
            "Sampled {} points across {} neighborhoods",
            rows.len(),
            groups.len()
        );

        Ok(Plan {
            rows,
            failures,
            demanded: slots.len(),
        })
    }

    /// Try fresh neighborhoods. The outer error aborts the plan; the inner
    /// one is the last timeout when every redraw failed.
    fn redraw<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<std::result::Result<(String, GeoPoint), Option<Error>>> {
        let mut last_error = None;
        for attempt in 1..=self.max_redraws {
            let name = self.neighborhoods.sample_neighborhood(rng);
            let polygon = self.geometry.lookup(name)?;
            match self.points.sample_point(polygon, rng) {
                Ok(point) => {
                    debug!("Redraw {} succeeded in '{}'", attempt, name);
                    return Ok(Ok((name.to_string(), point)));
                }
                Err(e @ Error::SamplingTimeout { .. }) => {
                    warn!("Redraw {}/{} in '{}' timed out", attempt, self.max_redraws, name);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(Err(last_error))
    }
}
