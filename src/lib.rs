//! Barrio - synthetic client addresses for a real city
//!
//! Clients are assigned population-weighted neighborhoods, a uniformly drawn
//! point inside each neighborhood boundary, and the postal address found by
//! reverse geocoding that point. The `generate` binary drives the pipeline.

pub mod config;
pub mod error;
pub mod geocode;
pub mod geometry;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod population;
pub mod profile;

pub use error::{Error, Result};
pub use models::{AddressRecord, Client, GeoPoint, OutputRow};
