//! Driving distance between consecutive activities

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, instrument, warn};

use crate::models::{DistanceToNext, GeoPoint, Itinerary, ItineraryDay};
use crate::retry::RetryPolicy;
use crate::routing::RoutingProvider;

/// Fills `distance_to_next` on every activity
pub struct DistanceEnricher {
    routing: Arc<dyn RoutingProvider>,
    retry: RetryPolicy,
    concurrency: usize,
}

impl DistanceEnricher {
    pub fn new(routing: Arc<dyn RoutingProvider>, retry: RetryPolicy, concurrency: usize) -> Self {
        Self {
            routing,
            retry,
            concurrency: concurrency.max(1),
        }
    }

    /// Days are processed concurrently, activities within a day in order
    pub async fn enrich(&self, itinerary: Itinerary) -> Itinerary {
        let days: Vec<ItineraryDay> = stream::iter(itinerary.into_days())
            .map(|day| self.enrich_day(day))
            .buffered(self.concurrency)
            .collect()
            .await;
        Itinerary::new(days)
    }

    #[instrument(skip(self, day), fields(day = %day.label, activities = day.activities.len()))]
    pub async fn enrich_day(&self, mut day: ItineraryDay) -> ItineraryDay {
        let count = day.activities.len();

        for i in 0..count {
            let distance = if i + 1 == count {
                DistanceToNext::NotApplicable
            } else {
                match (day.activities[i].location, day.activities[i + 1].location) {
                    (Some(origin), Some(destination)) => self.distance(origin, destination).await,
                    _ => {
                        debug!(index = i, "Missing coordinates, skipping routing");
                        DistanceToNext::LocationUnavailable
                    }
                }
            };
            day.activities[i].distance_to_next = Some(distance);
        }

        day
    }

    async fn distance(&self, origin: GeoPoint, destination: GeoPoint) -> DistanceToNext {
        let routing = self.routing.as_ref();

        match self
            .retry
            .run("route_distance", move || routing.route(origin, destination))
            .await
        {
            Ok(meters) => DistanceToNext::Driving { meters },
            Err(err) => {
                warn!(%origin, %destination, error = %err, "Distance calculation failed");
                DistanceToNext::CalculationFailed
            }
        }
    }
}
