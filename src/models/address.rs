//! Address records produced by the pipeline.

use serde::{Deserialize, Serialize};

use super::{Client, GeoPoint};

/// Address components returned by a reverse geocoder.
///
/// Every field is a plain string; absent components are `""` so the schema
/// stays fixed no matter what the service returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressFields {
    pub road: String,
    pub house_number: String,
    pub suburb: String,
    pub city_district: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
    /// Latitude of the matched feature, as reported by the service
    pub lat: String,
    /// Longitude of the matched feature, as reported by the service
    pub lon: String,
}

/// One generated address for one client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressRecord {
    pub client_id: String,
    pub address_id: String,
    pub neighborhood: String,
    /// Sampled point inside the neighborhood boundary
    pub coordinates: GeoPoint,
    #[serde(flatten)]
    pub fields: AddressFields,
}

/// Flat output row: client profile joined with one of its addresses.
///
/// Kept free of nested/flattened members so it serializes to CSV as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRow {
    pub client_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub date_of_birth: String,
    pub gender: String,
    pub occupation: String,
    pub created_at: String,
    pub updated_at: String,
    pub status: String,
    pub address_id: String,
    pub neighborhood: String,
    pub latitude: f64,
    pub longitude: f64,
    pub road: String,
    pub house_number: String,
    pub suburb: String,
    pub city_district: String,
    pub state: String,
    pub postcode: String,
    pub country: String,
    pub lat: String,
    pub lon: String,
}

impl OutputRow {
    pub fn join(client: &Client, address: &AddressRecord) -> Self {
        let fields = &address.fields;
        Self {
            client_id: client.client_id.clone(),
            first_name: client.first_name.clone(),
            last_name: client.last_name.clone(),
            email: client.email.clone(),
            phone_number: client.phone_number.clone(),
            date_of_birth: client.date_of_birth.clone(),
            gender: client.gender.clone(),
            occupation: client.occupation.clone(),
            created_at: client.created_at.clone(),
            updated_at: client.updated_at.clone(),
            status: client.status.clone(),
            address_id: address.address_id.clone(),
            neighborhood: address.neighborhood.clone(),
            latitude: address.coordinates.lat,
            longitude: address.coordinates.lon,
            road: fields.road.clone(),
            house_number: fields.house_number.clone(),
            suburb: fields.suburb.clone(),
            city_district: fields.city_district.clone(),
            state: fields.state.clone(),
            postcode: fields.postcode.clone(),
            country: fields.country.clone(),
            lat: fields.lat.clone(),
            lon: fields.lon.clone(),
        }
    }
}
