use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, instrument, warn};

use super::PlaceSearchProvider;
use crate::models::{Place, PlaceDetails};
use crate::retry::RetryPolicy;

/// Adds phone, website, map URL and a review to search results
pub struct PlaceDetailEnricher {
    provider: Arc<dyn PlaceSearchProvider>,
    retry: RetryPolicy,
    concurrency: usize,
}

impl PlaceDetailEnricher {
    pub fn new(provider: Arc<dyn PlaceSearchProvider>, retry: RetryPolicy, concurrency: usize) -> Self {
        Self {
            provider,
            retry,
            concurrency: concurrency.max(1),
        }
    }

    /// Details for one place, or `None` once retries are exhausted
    #[instrument(skip(self))]
    pub async fn enrich(&self, place_id: &str) -> Option<PlaceDetails> {
        let provider = self.provider.as_ref();

        match self
            .retry
            .run("place_details", move || provider.details(place_id))
            .await
        {
            Ok(details) => Some(details),
            Err(err) => {
                warn!(place_id, error = %err, "Place details unavailable, keeping search data");
                None
            }
        }
    }

    /// Enrich a batch with bounded concurrency, keeping input order
    pub async fn enrich_places(&self, places: Vec<Place>) -> Vec<Place> {
        let total = places.len();
        let enriched: Vec<Place> = stream::iter(places)
            .map(|mut place| async move {
                if let Some(details) = self.enrich(&place.place_id).await {
                    place.apply_details(details);
                }
                place
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        debug!(
            total,
            enriched = enriched.iter().filter(|p| p.is_enriched()).count(),
            "Place enrichment complete"
        );
        enriched
    }
}
