//! Run configuration loaded from TOML. Every field has a default, so an empty
//! file (or no file at all) is a valid configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::geocode::{NominatimConfig, RetryPolicy, DEFAULT_NOMINATIM_URL};
use crate::geometry::BoundarySource;
use crate::pipeline::{DemandPolicy, FailurePolicy, GeneratorSettings, ResolveSettings, SamplingSettings};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub data: DataConfig,
    pub sampling: SamplingSettings,
    pub demand: DemandPolicy,
    pub geocoder: GeocoderConfig,
    pub run: RunConfig,
}

/// Madrid's district boundaries are published in ETRS89 / UTM zone 30N
pub const DEFAULT_SOURCE_CRS: &str = "+proj=utm +zone=30 +ellps=GRS80 +units=m +no_defs";

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DataConfig {
    pub population: PathBuf,
    pub boundaries: PathBuf,
    /// Attribute holding the district name in the boundary file
    pub name_field: String,
    /// PROJ.4 definition of the boundary file's CRS, if projected
    pub source_crs: Option<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            population: PathBuf::from("static_data/city_population.json"),
            boundaries: PathBuf::from("static_data/districts/DISTRITOS.shp"),
            name_field: "NOMBRE".to_string(),
            source_crs: Some(DEFAULT_SOURCE_CRS.to_string()),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_ms: u64,
    pub concurrency: usize,
    /// Minimum milliseconds between request starts; 0 disables
    pub request_interval_ms: u64,
    pub accept_language: Option<String>,
    /// Filled into `state` by the offline geocoder
    pub region_state: String,
    /// Filled into `country` by the offline geocoder
    pub region_country: String,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        let resolve = ResolveSettings::default();
        Self {
            base_url: DEFAULT_NOMINATIM_URL.to_string(),
            user_agent: NominatimConfig::default().user_agent,
            timeout_secs: 5,
            max_attempts: retry.max_attempts,
            backoff_ms: retry.backoff.as_millis() as u64,
            concurrency: resolve.concurrency,
            request_interval_ms: resolve.min_interval.as_millis() as u64,
            accept_language: None,
            region_state: String::new(),
            region_country: String::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RunConfig {
    pub failure_policy: FailurePolicy,
    pub seed: Option<u64>,
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::config(format!("failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        let geocoder = &self.geocoder;
        if !(1..=60).contains(&geocoder.timeout_secs) {
            return Err(Error::config(format!(
                "geocoder.timeout_secs must be between 1 and 60, got {}",
                geocoder.timeout_secs
            )));
        }
        if geocoder.concurrency == 0 {
            return Err(Error::config("geocoder.concurrency must be at least 1"));
        }
        if geocoder.max_attempts == 0 {
            return Err(Error::config("geocoder.max_attempts must be at least 1"));
        }
        if self.sampling.max_attempts == 0 {
            return Err(Error::config("sampling.max_attempts must be at least 1"));
        }
        if self.data.name_field.trim().is_empty() {
            return Err(Error::config("data.name_field must not be empty"));
        }
        if geocoder.user_agent.trim().is_empty() {
            return Err(Error::config("geocoder.user_agent must not be empty"));
        }
        Ok(())
    }

    pub fn boundary_source(&self) -> BoundarySource {
        BoundarySource {
            path: self.data.boundaries.clone(),
            name_field: self.data.name_field.clone(),
            source_crs: self.data.source_crs.clone(),
        }
    }

    pub fn nominatim(&self) -> NominatimConfig {
        NominatimConfig {
            base_url: self.geocoder.base_url.clone(),
            user_agent: self.geocoder.user_agent.clone(),
            timeout: Duration::from_secs(self.geocoder.timeout_secs),
            accept_language: self.geocoder.accept_language.clone(),
        }
    }

    pub fn generator_settings(&self) -> GeneratorSettings {
        GeneratorSettings {
            sampling: self.sampling,
            demand: self.demand,
            resolve: ResolveSettings {
                concurrency: self.geocoder.concurrency,
                retry: RetryPolicy {
                    max_attempts: self.geocoder.max_attempts,
                    backoff: Duration::from_millis(self.geocoder.backoff_ms),
                },
                min_interval: Duration::from_millis(self.geocoder.request_interval_ms),
            },
            failure_policy: self.run.failure_policy,
        }
    }
}
