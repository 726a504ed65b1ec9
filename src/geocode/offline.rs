use async_trait::async_trait;

use super::ReverseGeocoder;
use crate::error::{ResolutionError, ResolutionErrorKind};
use crate::geometry::{DistrictIndex, GeometryStore};
use crate::models::{AddressFields, GeoPoint};

/// Resolves points against the loaded district boundaries only.
///
/// Street-level fields stay empty; `city_district` is the district that
/// contains the point and `lat`/`lon` echo the point itself.
pub struct OfflineGeocoder {
    index: DistrictIndex,
    state: String,
    country: String,
}

impl OfflineGeocoder {
    pub fn new(store: &GeometryStore) -> Self {
        Self {
            index: DistrictIndex::build(store),
            state: String::new(),
            country: String::new(),
        }
    }

    pub fn with_region(mut self, state: impl Into<String>, country: impl Into<String>) -> Self {
        self.state = state.into();
        self.country = country.into();
        self
    }
}

#[async_trait]
impl ReverseGeocoder for OfflineGeocoder {
    async fn reverse(&self, point: GeoPoint) -> Result<AddressFields, ResolutionError> {
        let district = self.index.lookup(point).ok_or_else(|| {
            ResolutionError::new(
                point,
                ResolutionErrorKind::NoResult("point is outside every district".to_string()),
            )
        })?;

        Ok(AddressFields {
            city_district: district.to_string(),
            state: self.state.clone(),
            country: self.country.clone(),
            lat: format!("{:.6}", point.lat),
            lon: format!("{:.6}", point.lon),
            ..Default::default()
        })
    }
}
