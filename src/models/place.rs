//! Candidate places returned by place search

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ItineraryError;

/// Review text used when a place has none
pub const NO_REVIEW: &str = "No review available";

/// Geographic coordinate in decimal degrees
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    /// Returns `None` unless both values are finite and within range
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        valid.then_some(Self { lat, lng })
    }

    /// Format as `lat, lng` with four decimals
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.lat, self.lng)
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lat, self.lng)
    }
}

impl FromStr for GeoPoint {
    type Err = ItineraryError;

    /// Parse `"48.8584,2.2945"` or `"48.8584 2.2945"`
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = input
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();

        let [lat, lng] = parts.as_slice() else {
            return Err(ItineraryError::validation(
                "Coordinates must be in format 'lat,lng'",
            ));
        };

        let lat = lat
            .parse::<f64>()
            .map_err(|_| ItineraryError::validation(format!("Invalid latitude: {lat}")))?;
        let lng = lng
            .parse::<f64>()
            .map_err(|_| ItineraryError::validation(format!("Invalid longitude: {lng}")))?;

        Self::new(lat, lng).ok_or_else(|| {
            ItineraryError::validation(format!(
                "Coordinates out of range: latitude must be between -90 and 90, longitude between -180 and 180, got: {lat}, {lng}"
            ))
        })
    }
}

/// The three kinds of place the pipeline searches for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceCategory {
    Attraction,
    Restaurant,
    Accommodation,
}

impl PlaceCategory {
    /// Term used in the free-text search query
    #[must_use]
    pub fn search_term(&self) -> &'static str {
        match self {
            PlaceCategory::Attraction => "tourist attraction",
            PlaceCategory::Restaurant => "restaurant",
            PlaceCategory::Accommodation => "hotel",
        }
    }

    /// Build the provider query for this category.
    ///
    /// The food preference only narrows restaurant searches.
    #[must_use]
    pub fn query(&self, destination: &str, food_preference: Option<&str>) -> String {
        let preference = food_preference.map(str::trim).filter(|p| !p.is_empty());
        match (self, preference) {
            (PlaceCategory::Restaurant, Some(food)) => {
                format!("{food} {} in {destination}", self.search_term())
            }
            _ => format!("{} in {destination}", self.search_term()),
        }
    }
}

impl fmt::Display for PlaceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.search_term())
    }
}

/// A place found by search, optionally enriched with details
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Place {
    pub name: String,
    pub rating: Option<f64>,
    pub address: Option<String>,
    pub place_id: String,
    pub location: GeoPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_maps_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
}

impl Place {
    /// A place as returned by search, before enrichment
    #[must_use]
    pub fn new(
        name: String,
        place_id: String,
        location: GeoPoint,
        rating: Option<f64>,
        address: Option<String>,
    ) -> Self {
        Self {
            name,
            rating,
            address,
            place_id,
            location,
            phone: None,
            website: None,
            google_maps_url: None,
            review: None,
        }
    }

    /// Merge detail fields; values missing from the details keep what search returned
    pub fn apply_details(&mut self, details: PlaceDetails) {
        if let Some(name) = details.name {
            self.name = name;
        }
        if details.rating.is_some() {
            self.rating = details.rating;
        }
        self.phone = details.phone;
        self.website = details.website;
        self.google_maps_url = details.google_maps_url;
        self.review = Some(details.review);
    }

    #[must_use]
    pub fn is_enriched(&self) -> bool {
        self.review.is_some()
    }
}

/// Detail record for one place
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PlaceDetails {
    pub name: Option<String>,
    pub rating: Option<f64>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub google_maps_url: Option<String>,
    /// First review, or [`NO_REVIEW`]
    pub review: String,
}
