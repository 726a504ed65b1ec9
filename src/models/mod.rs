//! Core data models for the address generator.

pub mod address;
pub mod client;
pub mod point;

pub use address::{AddressFields, AddressRecord, OutputRow};
pub use client::Client;
pub use point::GeoPoint;

use rand::Rng;

/// `<prefix>-<uuid v4>`, drawn from the caller's RNG so seeded runs repeat
pub fn generate_id<R: Rng + ?Sized>(prefix: &str, rng: &mut R) -> String {
    let uuid = uuid::Builder::from_random_bytes(rng.random()).into_uuid();
    format!("{}-{}", prefix, uuid)
}
