use std::time::Duration;

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::PlaceSearchProvider;
use crate::ItineraryError;
use crate::config::PlacesConfig;
use crate::error::CollaboratorError;
use crate::http;
use crate::models::{GeoPoint, NO_REVIEW, Place, PlaceDetails};

const DETAIL_FIELDS: &str = "name,rating,formatted_phone_number,website,review,url";

/// Google Places web service client
pub struct GooglePlacesClient {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<SearchResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    name: Option<String>,
    rating: Option<f64>,
    formatted_address: Option<String>,
    place_id: Option<String>,
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: Option<LatLng>,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    result: Option<DetailsResult>,
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailsResult {
    name: Option<String>,
    rating: Option<f64>,
    formatted_phone_number: Option<String>,
    website: Option<String>,
    url: Option<String>,
    reviews: Option<Vec<Review>>,
}

#[derive(Debug, Deserialize)]
struct Review {
    text: Option<String>,
}

impl SearchResult {
    fn into_place(self) -> Option<Place> {
        let location = self
            .geometry
            .and_then(|g| g.location)
            .and_then(|l| GeoPoint::new(l.lat, l.lng));

        match (self.name, self.place_id, location) {
            (Some(name), Some(place_id), Some(location)) => Some(Place::new(
                name,
                place_id,
                location,
                self.rating,
                self.formatted_address,
            )),
            (name, place_id, _) => {
                warn!(
                    name = name.as_deref().unwrap_or("<unnamed>"),
                    place_id = place_id.as_deref().unwrap_or("<none>"),
                    "Skipping search result without name, id or usable location"
                );
                None
            }
        }
    }
}

impl From<DetailsResult> for PlaceDetails {
    fn from(result: DetailsResult) -> Self {
        let review = result
            .reviews
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|r| r.text)
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| NO_REVIEW.to_string());

        PlaceDetails {
            name: result.name,
            rating: result.rating,
            phone: result.formatted_phone_number,
            website: result.website,
            google_maps_url: result.url,
            review,
        }
    }
}

fn status_error(status: String, message: Option<String>) -> CollaboratorError {
    CollaboratorError::status(status, message.unwrap_or_default())
}

impl GooglePlacesClient {
    /// Build the live client from configuration
    pub fn from_config(config: &PlacesConfig) -> crate::Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ItineraryError::config("places.api_key is not set"))?;

        Self::with_base_url(
            api_key,
            &config.base_url,
            Duration::from_secs(u64::from(config.timeout_seconds)),
        )
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: &str,
        timeout: Duration,
    ) -> crate::Result<Self> {
        Ok(Self {
            client: http::build_client(timeout)?,
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PlaceSearchProvider for GooglePlacesClient {
    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<Place>, CollaboratorError> {
        let url = format!(
            "{}/textsearch/json?query={}&key={}",
            self.base_url,
            urlencoding::encode(query),
            urlencoding::encode(&self.api_key)
        );

        let response = http::send(self.client.get(url)).await?;
        let body: SearchResponse = http::read_json(response).await?;

        match body.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => {
                debug!("Place search returned no results");
                return Ok(Vec::new());
            }
            _ => return Err(status_error(body.status, body.error_message)),
        }

        debug!(results = body.results.len(), "Place search response received");
        Ok(body
            .results
            .into_iter()
            .filter_map(SearchResult::into_place)
            .collect())
    }

    #[instrument(skip(self))]
    async fn details(&self, place_id: &str) -> Result<PlaceDetails, CollaboratorError> {
        let url = format!(
            "{}/details/json?place_id={}&fields={}&key={}",
            self.base_url,
            urlencoding::encode(place_id),
            DETAIL_FIELDS,
            urlencoding::encode(&self.api_key)
        );

        let response = http::send(self.client.get(url)).await?;
        let body: DetailsResponse = http::read_json(response).await?;

        if body.status != "OK" {
            return Err(status_error(body.status, body.error_message));
        }

        body.result
            .map(PlaceDetails::from)
            .ok_or_else(|| CollaboratorError::InvalidResponse("details response has no result".into()))
    }
}
