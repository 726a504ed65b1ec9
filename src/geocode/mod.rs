//! Reverse geocoding: point → address components.
//!
//! `NominatimClient` talks to a Nominatim-compatible `/reverse` endpoint;
//! `OfflineGeocoder` answers from the loaded district boundaries without any
//! network access. Both are driven through `resolve_with_retry`, optionally
//! behind a `Throttled` wrapper that spaces requests out.

mod nominatim;
mod offline;
mod throttle;

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::ResolutionError;
use crate::models::{AddressFields, GeoPoint};

pub use nominatim::{NominatimClient, NominatimConfig, DEFAULT_NOMINATIM_URL};
pub use offline::OfflineGeocoder;
pub use throttle::Throttled;

/// Upper bound for a single backoff sleep
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// Resolve one point. Absent components come back as `""`.
    async fn reverse(&self, point: GeoPoint) -> Result<AddressFields, ResolutionError>;
}

/// How transient resolution failures are retried
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Sleep before attempt `failures + 1`: base * 2^(failures - 1), capped
    pub fn delay(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(16);
        self.backoff
            .saturating_mul(1u32 << exponent)
            .min(MAX_BACKOFF)
    }
}

/// Resolve a point, retrying transient failures with exponential backoff.
pub async fn resolve_with_retry<G: ReverseGeocoder + ?Sized>(
    geocoder: &G,
    point: GeoPoint,
    policy: &RetryPolicy,
) -> Result<AddressFields, ResolutionError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0;

    loop {
        attempts += 1;
        match geocoder.reverse(point).await {
            Ok(fields) => return Ok(fields),
            Err(e) if e.is_transient() && attempts < max_attempts => {
                let delay = policy.delay(attempts);
                warn!(
                    "Reverse geocoding {} failed (attempt {}/{}): {}; retrying in {:?}",
                    point, attempts, max_attempts, e.kind, delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolutionErrorKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails `failures` times with `kind`, then succeeds
    struct Flaky {
        failures: u32,
        kind: ResolutionErrorKind,
        calls: AtomicU32,
    }

    #[async_trait]
    impl ReverseGeocoder for Flaky {
        async fn reverse(&self, point: GeoPoint) -> Result<AddressFields, ResolutionError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(ResolutionError::new(point, self.kind.clone()));
            }
            Ok(AddressFields {
                road: "Calle Mayor".into(),
                ..Default::default()
            })
        }
    }

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            backoff: Duration::from_millis(500),
        };
        assert_eq!(policy.delay(1), Duration::from_millis(500));
        assert_eq!(policy.delay(2), Duration::from_millis(1000));
        assert_eq!(policy.delay(3), Duration::from_millis(2000));
        assert_eq!(policy.delay(40), MAX_BACKOFF);
    }

    #[tokio::test]
    async fn test_transient_failure_retried() {
        let geocoder = Flaky {
            failures: 2,
            kind: ResolutionErrorKind::Timeout,
            calls: AtomicU32::new(0),
        };
        let fields = resolve_with_retry(&geocoder, GeoPoint::new(40.4, -3.7), &fast_policy(3))
            .await
            .unwrap();
        assert_eq!(fields.road, "Calle Mayor");
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let geocoder = Flaky {
            failures: 10,
            kind: ResolutionErrorKind::Status(503),
            calls: AtomicU32::new(0),
        };
        let err = resolve_with_retry(&geocoder, GeoPoint::new(40.4, -3.7), &fast_policy(3))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ResolutionErrorKind::Status(503));
        assert_eq!(err.point, GeoPoint::new(40.4, -3.7));
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let geocoder = Flaky {
            failures: 10,
            kind: ResolutionErrorKind::Malformed("not json".into()),
            calls: AtomicU32::new(0),
        };
        let err = resolve_with_retry(&geocoder, GeoPoint::new(40.4, -3.7), &fast_policy(3))
            .await
            .unwrap_err();
        assert!(!err.is_transient());
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
    }
}
