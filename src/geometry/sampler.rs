//! Uniform point sampling inside a polygon by bounding-box rejection.

use geo::{BoundingRect, MultiPolygon};
use rand::Rng;
use tracing::debug;

use super::ring::multipolygon_contains;
use crate::error::{Error, Result};
use crate::models::GeoPoint;

pub const DEFAULT_MAX_ATTEMPTS: usize = 10_000;

/// Rejection sampler with a bounded number of draws per point
#[derive(Debug, Clone, Copy)]
pub struct PointSampler {
    max_attempts: usize,
}

impl Default for PointSampler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}

impl PointSampler {
    pub fn new(max_attempts: usize) -> Self {
        Self { max_attempts }
    }

    /// Draw a point uniformly from the interior of `polygon`.
    ///
    /// Fails with `SamplingTimeout` once `max_attempts` draws have all
    /// landed outside, which is what a zero-area polygon does.
    pub fn sample_point<R: Rng + ?Sized>(
        &self,
        polygon: &MultiPolygon<f64>,
        rng: &mut R,
    ) -> Result<GeoPoint> {
        let Some(rect) = polygon.bounding_rect() else {
            return Err(Error::SamplingTimeout { attempts: 0 });
        };
        let (min, max) = (rect.min(), rect.max());
        if ![min.x, min.y, max.x, max.y].iter().all(|v| v.is_finite()) {
            return Err(Error::SamplingTimeout { attempts: 0 });
        }

        for attempt in 1..=self.max_attempts {
            let x = rng.random_range(min.x..=max.x);
            let y = rng.random_range(min.y..=max.y);
            let point = GeoPoint::from_xy(x, y);
            if multipolygon_contains(polygon, point.to_coord()) {
                if attempt > 100 {
                    debug!("Accepted point after {} attempts", attempt);
                }
                return Ok(point);
            }
        }

        Err(Error::SamplingTimeout {
            attempts: self.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Contains, Point};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn l_shape() -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon![
            (x: -3.72, y: 40.40), (x: -3.68, y: 40.40), (x: -3.68, y: 40.41),
            (x: -3.71, y: 40.41), (x: -3.71, y: 40.44), (x: -3.72, y: 40.44),
        ]])
    }

    fn holed_square() -> MultiPolygon<f64> {
        MultiPolygon::new(vec![polygon!(
            exterior: [(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 10.0), (x: 0.0, y: 10.0)],
            interiors: [[(x: 2.0, y: 2.0), (x: 8.0, y: 2.0), (x: 8.0, y: 8.0), (x: 2.0, y: 8.0)]],
        )])
    }

    #[test]
    fn test_samples_inside_concave_polygon() {
        let shape = l_shape();
        let sampler = PointSampler::default();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            let p = sampler.sample_point(&shape, &mut rng).unwrap();
            assert!(multipolygon_contains(&shape, p.to_coord()));
            assert!(shape.contains(&Point::new(p.lon, p.lat)));
        }
    }

    #[test]
    fn test_samples_avoid_holes() {
        let shape = holed_square();
        let sampler = PointSampler::default();
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..1000 {
            let p = sampler.sample_point(&shape, &mut rng).unwrap();
            let in_hole = p.lon > 2.0 && p.lon < 8.0 && p.lat > 2.0 && p.lat < 8.0;
            assert!(!in_hole, "{} landed in the hole", p);
            assert!(shape.contains(&Point::new(p.lon, p.lat)));
        }
    }

    #[test]
    fn test_returns_lat_lon_order() {
        let shape = l_shape();
        let mut rng = StdRng::seed_from_u64(3);
        let p = PointSampler::default().sample_point(&shape, &mut rng).unwrap();
        assert!(p.lat > 40.0 && p.lat < 41.0);
        assert!(p.lon < -3.0 && p.lon > -4.0);
    }

    #[test]
    fn test_zero_area_polygon_times_out() {
        let flat = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0), (x: 1.0, y: 1.0), (x: 2.0, y: 2.0),
        ]]);
        let mut rng = StdRng::seed_from_u64(4);
        let err = PointSampler::new(500).sample_point(&flat, &mut rng).unwrap_err();
        assert!(matches!(err, Error::SamplingTimeout { attempts: 500 }));
    }

    #[test]
    fn test_sliver_polygon_times_out() {
        let sliver = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0), (x: 1000.0, y: 1000.0), (x: 999.999_999, y: 1000.0),
        ]]);
        let mut rng = StdRng::seed_from_u64(5);
        let err = PointSampler::new(200).sample_point(&sliver, &mut rng).unwrap_err();
        assert!(matches!(err, Error::SamplingTimeout { attempts: 200 }));
    }

    #[test]
    fn test_empty_geometry_fails_immediately() {
        let empty = MultiPolygon::<f64>::new(vec![]);
        let mut rng = StdRng::seed_from_u64(6);
        let err = PointSampler::default().sample_point(&empty, &mut rng).unwrap_err();
        assert!(matches!(err, Error::SamplingTimeout { attempts: 0 }));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn sampled_points_are_contained(seed in any::<u64>(), notch in 0.1f64..0.9) {
            // Concave "C" whose opening depth varies per case
            let shape = MultiPolygon::new(vec![polygon![
                (x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 0.3), (x: 1.0 - notch, y: 0.3),
                (x: 1.0 - notch, y: 0.7), (x: 1.0, y: 0.7), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0),
            ]]);
            let mut rng = StdRng::seed_from_u64(seed);
            let p = PointSampler::default().sample_point(&shape, &mut rng).unwrap();
            prop_assert!(multipolygon_contains(&shape, p.to_coord()));
            prop_assert!(shape.contains(&Point::new(p.lon, p.lat)));
        }
    }
}
