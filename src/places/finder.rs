use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::PlaceSearchProvider;
use crate::models::{Place, PlaceCategory};
use crate::retry::RetryPolicy;

/// Category search against the place provider.
///
/// Search failures never abort a generation request: once retries are used
/// up the category simply has no candidates.
pub struct PlaceFinder {
    provider: Arc<dyn PlaceSearchProvider>,
    retry: RetryPolicy,
    max_results: usize,
}

impl PlaceFinder {
    pub fn new(provider: Arc<dyn PlaceSearchProvider>, retry: RetryPolicy, max_results: usize) -> Self {
        Self {
            provider,
            retry,
            max_results,
        }
    }

    /// Top candidates for `category` at `destination`, in provider rank order
    #[instrument(skip(self))]
    pub async fn find(
        &self,
        category: PlaceCategory,
        destination: &str,
        food_preference: Option<&str>,
    ) -> Vec<Place> {
        let query = category.query(destination, food_preference);
        let provider = self.provider.as_ref();
        let search_query = query.as_str();

        match self
            .retry
            .run("place_search", move || provider.search(search_query))
            .await
        {
            Ok(mut places) => {
                places.truncate(self.max_results);
                info!(%category, query = %query, found = places.len(), "Place search complete");
                places
            }
            Err(err) => {
                warn!(
                    %category,
                    query = %query,
                    error = %err,
                    "Place search failed, continuing without candidates"
                );
                Vec::new()
            }
        }
    }
}
