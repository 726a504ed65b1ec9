//! Minimum spacing between lookups, shared by every in-flight task.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::ReverseGeocoder;
use crate::error::ResolutionError;
use crate::models::{AddressFields, GeoPoint};

/// Wraps a geocoder so consecutive requests start at least `interval` apart,
/// retries included. A zero interval passes straight through.
pub struct Throttled<'a, G: ?Sized> {
    inner: &'a G,
    interval: Duration,
    next_slot: Mutex<Instant>,
}

impl<'a, G: ReverseGeocoder + ?Sized> Throttled<'a, G> {
    pub fn new(inner: &'a G, interval: Duration) -> Self {
        Self {
            inner,
            interval,
            next_slot: Mutex::new(Instant::now()),
        }
    }

    async fn wait_turn(&self) {
        if self.interval.is_zero() {
            return;
        }
        let start = {
            let mut next_slot = self.next_slot.lock().await;
            let start = (*next_slot).max(Instant::now());
            *next_slot = start + self.interval;
            start
        };
        tokio::time::sleep_until(start).await;
    }
}

#[async_trait]
impl<'a, G: ReverseGeocoder + ?Sized> ReverseGeocoder for Throttled<'a, G> {
    async fn reverse(&self, point: GeoPoint) -> Result<AddressFields, ResolutionError> {
        self.wait_turn().await;
        self.inner.reverse(point).await
    }
}
