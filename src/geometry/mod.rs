//! District geometry: loading, containment, sampling and point lookup.

mod index;
pub mod ring;
mod sampler;
mod store;

pub use index::DistrictIndex;
pub use sampler::{PointSampler, DEFAULT_MAX_ATTEMPTS};
pub use store::{read_shapefile, BoundarySource, GeometryStore, WGS84_PROJ4};
