use std::sync::Arc;

use hashbrown::HashSet;
use indicatif::ProgressBar;
use rand::Rng;
use serde::Deserialize;
use tracing::info;

use super::demand::{expand, DemandPolicy};
use super::join::join_rows;
use super::plan::{Plan, Planner};
use super::resolve::{resolve_all, ResolveSettings};
use super::{FailurePolicy, RowFailure};
use crate::error::{Error, Result};
use crate::geocode::ReverseGeocoder;
use crate::geometry::{GeometryStore, PointSampler, DEFAULT_MAX_ATTEMPTS};
use crate::models::{AddressRecord, Client, OutputRow};
use crate::population::{CityData, NeighborhoodSampler};

pub const DEFAULT_MAX_REDRAWS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SamplingSettings {
    /// Rejection draws per point before giving up
    pub max_attempts: usize,
    /// Fresh neighborhood draws after a sampling timeout
    pub max_redraws: usize,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            max_redraws: DEFAULT_MAX_REDRAWS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GeneratorSettings {
    pub sampling: SamplingSettings,
    pub demand: DemandPolicy,
    pub resolve: ResolveSettings,
    pub failure_policy: FailurePolicy,
}

/// Everything one run produced
#[derive(Debug)]
pub struct Batch {
    /// Resolved addresses in row order
    pub records: Vec<AddressRecord>,
    /// `records` joined onto their clients
    pub rows: Vec<OutputRow>,
    /// Rows dropped under the lenient policy, in row order
    pub failures: Vec<RowFailure>,
    /// Rows requested by the demand draw
    pub demanded: usize,
}

/// Assigns addresses to clients for one city
pub struct AddressGenerator {
    city: CityData,
    neighborhoods: NeighborhoodSampler,
    geometry: Arc<GeometryStore>,
    settings: GeneratorSettings,
    progress: Option<ProgressBar>,
}

impl AddressGenerator {
    /// Fails with `NotFound` if any weighted neighborhood has no boundary.
    pub fn new(city: CityData, geometry: Arc<GeometryStore>, settings: GeneratorSettings) -> Result<Self> {
        geometry.ensure_covers(&city.weights)?;
        let neighborhoods = NeighborhoodSampler::new(&city.weights)?;

        Ok(Self {
            city,
            neighborhoods,
            geometry,
            settings,
            progress: None,
        })
    }

    /// Tick `progress` once per resolved row
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Expand demand and sample a point for every row. No I/O.
    pub fn plan<R: Rng + ?Sized>(&self, clients: &[Client], rng: &mut R) -> Result<Plan> {
        check_unique_ids(clients)?;

        let slots = expand(clients, &self.settings.demand, rng);
        info!(
            "Planning {} addresses for {} clients in {}",
            slots.len(),
            clients.len(),
            self.city.name
        );

        Planner {
            neighborhoods: &self.neighborhoods,
            geometry: self.geometry.as_ref(),
            points: PointSampler::new(self.settings.sampling.max_attempts),
            max_redraws: self.settings.sampling.max_redraws,
            policy: self.settings.failure_policy,
        }
        .plan(&slots, rng)
    }

    /// Plan, resolve and join addresses for `clients`.
    pub async fn generate<G, R>(&self, clients: &[Client], geocoder: &G, rng: &mut R) -> Result<Batch>
    where
        G: ReverseGeocoder + ?Sized,
        R: Rng + ?Sized,
    {
        let plan = self.plan(clients, rng)?;
        let Plan {
            rows: planned,
            mut failures,
            demanded,
        } = plan;

        if let Some(pb) = &self.progress {
            pb.set_length(planned.len() as u64);
        }

        let resolved = resolve_all(
            geocoder,
            planned,
            &self.settings.resolve,
            self.settings.failure_policy,
            self.progress.as_ref(),
        )
        .await?;

        let rows = join_rows(clients, &resolved.records)?;
        failures.extend(resolved.failures);
        failures.sort_by_key(|f| f.row);

        Ok(Batch {
            records: resolved.records,
            rows,
            failures,
            demanded,
        })
    }
}

fn check_unique_ids(clients: &[Client]) -> Result<()> {
    let mut seen = HashSet::with_capacity(clients.len());
    for client in clients {
        if !seen.insert(client.client_id.as_str()) {
            return Err(Error::config(format!(
                "duplicate client id '{}' in roster",
                client.client_id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocode::OfflineGeocoder;
    use crate::population::WeightTable;
    use geo::{polygon, MultiPolygon};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn square(x0: f64, y0: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: x0, y: y0), (x: x0 + 0.01, y: y0), (x: x0 + 0.01, y: y0 + 0.01), (x: x0, y: y0 + 0.01),
        ]])
    }

    fn fixture() -> (CityData, Arc<GeometryStore>) {
        let city = CityData {
            name: "Madrid".into(),
            weights: WeightTable::from_weights([("Centro", 0.6), ("Retiro", 0.4)]).unwrap(),
        };
        let geometry = GeometryStore::from_polygons([
            ("Centro", square(-3.71, 40.41)),
            ("Retiro", square(-3.68, 40.41)),
        ]);
        (city, Arc::new(geometry))
    }

    fn roster(n: usize) -> Vec<Client> {
        (0..n).map(|i| Client::with_id(format!("cus-{}", i))).collect()
    }

    #[tokio::test]
    async fn test_output_matches_demand() {
        let (city, geometry) = fixture();
        let geocoder = OfflineGeocoder::new(&geometry);
        let generator = AddressGenerator::new(city, geometry, GeneratorSettings::default()).unwrap();
        let clients = roster(25);

        let batch = generator
            .generate(&clients, &geocoder, &mut StdRng::seed_from_u64(21))
            .await
            .unwrap();

        assert_eq!(batch.rows.len(), batch.demanded);
        assert!(batch.demanded >= 25 && batch.demanded <= 75);
        assert!(batch.failures.is_empty());

        let input: HashSet<&str> = clients.iter().map(|c| c.client_id.as_str()).collect();
        assert!(batch.rows.iter().all(|r| input.contains(r.client_id.as_str())));
        for row in &batch.rows {
            assert_eq!(row.city_district, row.neighborhood);
        }
    }

    #[tokio::test]
    async fn test_fixed_demand_row_count() {
        let (city, geometry) = fixture();
        let geocoder = OfflineGeocoder::new(&geometry);
        let settings = GeneratorSettings {
            demand: DemandPolicy::fixed(2).unwrap(),
            ..Default::default()
        };
        let generator = AddressGenerator::new(city, geometry, settings).unwrap();

        let batch = generator
            .generate(&roster(7), &geocoder, &mut StdRng::seed_from_u64(22))
            .await
            .unwrap();
        assert_eq!(batch.rows.len(), 14);
        assert_eq!(batch.records.len(), 14);
    }

    #[test]
    fn test_missing_boundary_rejected_up_front() {
        let city = CityData {
            name: "Madrid".into(),
            weights: WeightTable::from_weights([("Centro", 0.5), ("Barajas", 0.5)]).unwrap(),
        };
        let geometry = Arc::new(GeometryStore::from_polygons([("Centro", square(-3.71, 40.41))]));
        let result = AddressGenerator::new(city, geometry, GeneratorSettings::default());
        assert!(matches!(result, Err(Error::NotFound { neighborhood }) if neighborhood == "Barajas"));
    }

    #[test]
    fn test_duplicate_client_ids_rejected() {
        let (city, geometry) = fixture();
        let generator = AddressGenerator::new(city, geometry, GeneratorSettings::default()).unwrap();
        let clients = vec![Client::with_id("cus-1"), Client::with_id("cus-1")];
        let err = generator
            .plan(&clients, &mut StdRng::seed_from_u64(23))
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_plan_is_reproducible() {
        let (city, geometry) = fixture();
        let generator = AddressGenerator::new(city, geometry, GeneratorSettings::default()).unwrap();
        let clients = roster(10);

        let a = generator.plan(&clients, &mut StdRng::seed_from_u64(24)).unwrap();
        let b = generator.plan(&clients, &mut StdRng::seed_from_u64(24)).unwrap();
        assert_eq!(a.rows, b.rows);
    }
}
