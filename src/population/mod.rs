//! Population weight tables and weighted neighborhood selection.
//!
//! A city's raw population counts are normalized into probabilities once at
//! load time; the sampler then draws neighborhoods in proportion to them.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct CityEntry {
    population: BTreeMap<String, u64>,
}

/// A city and its normalized neighborhood weights
#[derive(Debug, Clone)]
pub struct CityData {
    pub name: String,
    pub weights: WeightTable,
}

impl CityData {
    /// Load one city from a population file of the form
    /// `{ "<city>": { "population": { "<neighborhood>": <count> } } }`.
    pub fn load<P: AsRef<Path>>(path: P, city: &str) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "failed to read population file {}: {}",
                path.display(),
                e
            ))
        })?;
        let city_data = Self::from_json(&content, city)?;
        info!(
            "Loaded {} neighborhoods for {} from {}",
            city_data.weights.len(),
            city,
            path.display()
        );
        Ok(city_data)
    }

    pub fn from_json(content: &str, city: &str) -> Result<Self> {
        let mut cities: BTreeMap<String, serde_json::Value> = serde_json::from_str(content)
            .map_err(|e| Error::config(format!("malformed population data: {}", e)))?;

        let entry = cities
            .remove(city)
            .ok_or_else(|| Error::config(format!("city '{}' not found in population data", city)))?;
        let entry: CityEntry = serde_json::from_value(entry)
            .map_err(|e| Error::config(format!("malformed population data for '{}': {}", city, e)))?;

        Ok(Self {
            name: city.to_string(),
            weights: WeightTable::from_counts(&entry.population)?,
        })
    }
}

/// Neighborhood name → probability, summing to 1.0
#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    weights: BTreeMap<String, f64>,
}

impl WeightTable {
    /// Normalize raw population counts into probabilities.
    pub fn from_counts(counts: &BTreeMap<String, u64>) -> Result<Self> {
        let total: u64 = counts.values().sum();
        if total == 0 {
            return Err(Error::config("total population is zero"));
        }

        let mut weights = BTreeMap::new();
        for (name, &count) in counts {
            if count == 0 {
                warn!("Neighborhood '{}' has zero population, skipping", name);
                continue;
            }
            weights.insert(name.clone(), count as f64 / total as f64);
        }

        Ok(Self { weights })
    }

    /// Build from weights that may not be normalized yet.
    pub fn from_weights<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let raw: BTreeMap<String, f64> = entries
            .into_iter()
            .map(|(name, weight)| (name.into(), weight))
            .collect();

        if raw.values().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(Error::config("weights must be finite and non-negative"));
        }
        let total: f64 = raw.values().sum();
        if total <= 0.0 {
            return Err(Error::config("total weight is zero"));
        }

        let weights = raw
            .into_iter()
            .filter(|(_, w)| *w > 0.0)
            .map(|(name, w)| (name, w / total))
            .collect();
        Ok(Self { weights })
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.weights.get(name).copied()
    }

    /// Iterate in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.weights.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Weighted random choice over a city's neighborhoods
#[derive(Debug, Clone)]
pub struct NeighborhoodSampler {
    names: Vec<String>,
    dist: WeightedIndex<f64>,
}

impl NeighborhoodSampler {
    pub fn new(table: &WeightTable) -> Result<Self> {
        let names: Vec<String> = table.names().map(String::from).collect();
        let dist = WeightedIndex::new(table.iter().map(|(_, w)| w))
            .map_err(|e| Error::config(format!("invalid neighborhood weights: {}", e)))?;
        Ok(Self { names, dist })
    }

    /// Draw one neighborhood name.
    pub fn sample_neighborhood<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        &self.names[self.dist.sample(rng)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const POPULATION: &str = r#"{
        "Madrid": {
            "population": { "Centro": 140000, "Retiro": 118000, "Barajas": 49000 }
        },
        "Ghost Town": {
            "population": { "Main Street": 0 }
        }
    }"#;

    #[test]
    fn test_weights_sum_to_one() {
        let city = CityData::from_json(POPULATION, "Madrid").unwrap();
        let total: f64 = city.weights.iter().map(|(_, w)| w).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(city.weights.len(), 3);
        assert!((city.weights.get("Centro").unwrap() - 140.0 / 307.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_city_is_configuration_error() {
        let err = CityData::from_json(POPULATION, "Sevilla").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_zero_population_is_configuration_error() {
        let err = CityData::from_json(POPULATION, "Ghost Town").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_malformed_counts_rejected() {
        let err = CityData::from_json(r#"{"Madrid": {"population": {"A": -3}}}"#, "Madrid")
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_zero_count_neighborhood_dropped() {
        let counts: BTreeMap<String, u64> =
            [("A".to_string(), 10), ("B".to_string(), 0)].into_iter().collect();
        let table = WeightTable::from_counts(&counts).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("A"), Some(1.0));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("city_population.json");
        std::fs::write(&path, POPULATION).unwrap();
        let city = CityData::load(&path, "Madrid").unwrap();
        assert_eq!(city.name, "Madrid");
    }

    #[test]
    fn test_sampling_frequencies_match_weights() {
        let table = WeightTable::from_weights([("A", 0.5), ("B", 0.3), ("C", 0.2)]).unwrap();
        let sampler = NeighborhoodSampler::new(&table).unwrap();
        let mut rng = StdRng::seed_from_u64(7);

        let draws = 10_000;
        let mut observed: BTreeMap<&str, usize> = BTreeMap::new();
        for _ in 0..draws {
            *observed.entry(sampler.sample_neighborhood(&mut rng)).or_default() += 1;
        }

        // Chi-squared goodness of fit, 2 degrees of freedom, p = 0.001
        let chi2: f64 = table
            .iter()
            .map(|(name, w)| {
                let expected = w * draws as f64;
                let seen = *observed.get(name).unwrap_or(&0) as f64;
                (seen - expected).powi(2) / expected
            })
            .sum();
        assert!(chi2 < 13.82, "chi-squared {} too large: {:?}", chi2, observed);
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let table = WeightTable::from_weights([("A", 0.7), ("B", 0.3)]).unwrap();
        let sampler = NeighborhoodSampler::new(&table).unwrap();
        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..50)
                .map(|_| sampler.sample_neighborhood(&mut rng).to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(42), draw(42));
    }
}
