//! Test doubles for the collaborator traits.
//!
//! The stubs return pre-configured responses without touching the network and
//! count how often they are called, so tests can check retry and skip
//! behaviour of the pipeline.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

use crate::error::CollaboratorError;
use crate::generation::TextGenerator;
use crate::models::{Activity, GeoPoint, NO_REVIEW, Place, PlaceDetails, day_label};
use crate::places::PlaceSearchProvider;
use crate::routing::RoutingProvider;

/// A search result at the given coordinates
#[must_use]
pub fn place(name: &str, place_id: &str, lat: f64, lng: f64) -> Place {
    Place::new(
        name.to_string(),
        place_id.to_string(),
        GeoPoint { lat, lng },
        Some(4.5),
        Some(format!("1 Example Street, {name}")),
    )
}

/// A detail record carrying `review`
#[must_use]
pub fn details(review: &str) -> PlaceDetails {
    PlaceDetails {
        name: None,
        rating: None,
        phone: Some("+33 1 23 45 67 89".to_string()),
        website: Some("https://example.com".to_string()),
        google_maps_url: Some("https://maps.google.com/?cid=1".to_string()),
        review: review.to_string(),
    }
}

/// A parsed activity, before distance enrichment
#[must_use]
pub fn activity(place_name: &str, location: Option<(f64, f64)>) -> Activity {
    Activity {
        time: "10:00 AM".to_string(),
        activity: "Visit Attraction".to_string(),
        place_name: place_name.to_string(),
        description: String::new(),
        rating: Some(4.5),
        review: NO_REVIEW.to_string(),
        google_maps_url: String::new(),
        website_url: None,
        estimated_travel_time: "N/A".to_string(),
        location: location.map(|(lat, lng)| GeoPoint { lat, lng }),
        distance_to_next: None,
    }
}

/// Model reply text with `days` days, each visiting `stops` in order.
///
/// The JSON is wrapped in prose the way chat models tend to answer.
#[must_use]
pub fn itinerary_reply(days: u32, stops: &[(&str, Option<(f64, f64)>)]) -> String {
    let body: Map<String, Value> = (1..=days)
        .map(|n| {
            let activities = stops
                .iter()
                .map(|(name, location)| {
                    let mut entry = json!({
                        "time": "9:00 AM",
                        "activity": "Visit Attraction",
                        "place_name": name,
                        "description": "Generated",
                        "rating": 4.4,
                        "review": "Nice",
                        "google_maps_url": "https://maps.google.com/?cid=7",
                        "website_url": "https://example.com",
                        "estimated_travel_time": "10 minutes"
                    });
                    if let Some((lat, lng)) = location {
                        entry["location"] = json!({ "lat": lat, "lng": lng });
                    }
                    entry
                })
                .collect();
            (day_label(n), Value::Array(activities))
        })
        .collect();

    format!("Here is your itinerary:\n```json\n{}\n```", Value::Object(body))
}

/// Stub place search keyed by query substring
#[derive(Debug, Default)]
pub struct StubPlaceSearch {
    results: Vec<(String, Vec<Place>)>,
    details: HashMap<String, PlaceDetails>,
    search_error: Option<CollaboratorError>,
    details_error: Option<CollaboratorError>,
    search_calls: AtomicU32,
    details_calls: AtomicU32,
}

impl StubPlaceSearch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `places` for any query containing `needle`
    #[must_use]
    pub fn with_results(mut self, needle: &str, places: Vec<Place>) -> Self {
        self.results.push((needle.to_string(), places));
        self
    }

    #[must_use]
    pub fn with_details(mut self, place_id: &str, details: PlaceDetails) -> Self {
        self.details.insert(place_id.to_string(), details);
        self
    }

    /// Fail every search with `error`
    #[must_use]
    pub fn failing_search(mut self, error: CollaboratorError) -> Self {
        self.search_error = Some(error);
        self
    }

    /// Fail every detail lookup with `error`
    #[must_use]
    pub fn failing_details(mut self, error: CollaboratorError) -> Self {
        self.details_error = Some(error);
        self
    }

    pub fn search_calls(&self) -> u32 {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn details_calls(&self) -> u32 {
        self.details_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlaceSearchProvider for StubPlaceSearch {
    async fn search(&self, query: &str) -> Result<Vec<Place>, CollaboratorError> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.search_error {
            return Err(error.clone());
        }
        Ok(self
            .results
            .iter()
            .find(|(needle, _)| query.contains(needle.as_str()))
            .map(|(_, places)| places.clone())
            .unwrap_or_default())
    }

    async fn details(&self, place_id: &str) -> Result<PlaceDetails, CollaboratorError> {
        self.details_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.details_error {
            return Err(error.clone());
        }
        self.details
            .get(place_id)
            .cloned()
            .ok_or_else(|| CollaboratorError::status("NOT_FOUND", place_id))
    }
}

/// Stub text generator with a fixed reply or a fixed error
#[derive(Debug)]
pub struct StubGenerator {
    reply: Result<String, CollaboratorError>,
    delay: Option<Duration>,
    calls: AtomicU32,
    prompts: Mutex<Vec<String>>,
}

impl StubGenerator {
    #[must_use]
    pub fn replying(text: impl Into<String>) -> Self {
        Self::with_reply(Ok(text.into()))
    }

    #[must_use]
    pub fn failing(error: CollaboratorError) -> Self {
        Self::with_reply(Err(error))
    }

    fn with_reply(reply: Result<String, CollaboratorError>) -> Self {
        Self {
            reply,
            delay: None,
            calls: AtomicU32::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Sleep before answering
    #[must_use]
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for StubGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone()
    }
}

/// Stub routing returning the same distance for every pair
#[derive(Debug)]
pub struct StubRouting {
    reply: Result<f64, CollaboratorError>,
    calls: AtomicU32,
}

impl StubRouting {
    #[must_use]
    pub fn new(meters: f64) -> Self {
        Self {
            reply: Ok(meters),
            calls: AtomicU32::new(0),
        }
    }

    #[must_use]
    pub fn failing(error: CollaboratorError) -> Self {
        Self {
            reply: Err(error),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoutingProvider for StubRouting {
    async fn route(&self, _origin: GeoPoint, _destination: GeoPoint) -> Result<f64, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone()
    }
}
