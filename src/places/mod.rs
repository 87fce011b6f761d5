//! Place search: provider boundary, category search and detail enrichment

pub mod enricher;
pub mod finder;
pub mod google;

use async_trait::async_trait;

use crate::error::CollaboratorError;
use crate::models::{Place, PlaceDetails};

pub use enricher::PlaceDetailEnricher;
pub use finder::PlaceFinder;
pub use google::GooglePlacesClient;

/// A place search and details service
#[async_trait]
pub trait PlaceSearchProvider: Send + Sync {
    /// Free-text search. Results keep the provider's rank order; an empty
    /// list is a successful answer.
    async fn search(&self, query: &str) -> Result<Vec<Place>, CollaboratorError>;

    /// Detail record for one place
    async fn details(&self, place_id: &str) -> Result<PlaceDetails, CollaboratorError>;
}
