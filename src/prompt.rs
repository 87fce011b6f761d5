//! Prompt construction for the generative model

use serde::Serialize;
use serde_json::json;

use crate::ItineraryError;
use crate::models::{GeoPoint, ItineraryRequest, NO_REVIEW, Place};

/// Place fields shown to the model
#[derive(Serialize)]
struct PromptPlace<'a> {
    name: &'a str,
    rating: Option<f64>,
    address: Option<&'a str>,
    location: GeoPoint,
    phone: Option<&'a str>,
    website: Option<&'a str>,
    google_maps_url: Option<&'a str>,
    review: &'a str,
}

impl<'a> From<&'a Place> for PromptPlace<'a> {
    fn from(place: &'a Place) -> Self {
        Self {
            name: &place.name,
            rating: place.rating,
            address: place.address.as_deref(),
            location: place.location,
            phone: place.phone.as_deref(),
            website: place.website.as_deref(),
            google_maps_url: place.google_maps_url.as_deref(),
            review: place.review.as_deref().unwrap_or(NO_REVIEW),
        }
    }
}

/// Builds the generation prompt. Output depends only on the inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    pub fn build(
        &self,
        request: &ItineraryRequest,
        attractions: &[Place],
        restaurants: &[Place],
        accommodations: &[Place],
    ) -> crate::Result<String> {
        let labels = request.day_labels();
        let quoted_labels = labels
            .iter()
            .map(|label| format!("\"{label}\""))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!(
            "Create a day-by-day travel itinerary for a {days}-day trip to {destination}.\n\
             The traveler prefers {food} food.\n\
             \n\
             Choose places from these candidates:\n\
             Tourist attractions: {attractions}\n\
             Restaurants: {restaurants}\n\
             Accommodations: {accommodations}\n\
             \n\
             Planning rules:\n\
             - Each day has breakfast, two or three attractions, lunch, dinner and the accommodation, in chronological order.\n\
             - Group places that are close to each other on the same day.\n\
             - Copy rating, review, google_maps_url, website_url and location from the candidate data.\n\
             \n\
             Output format:\n\
             Reply with a single JSON object and nothing else.\n\
             It must have exactly {count} keys, in this order: {quoted_labels}.\n\
             Each key maps to a non-empty list of activities shaped like this:\n\
             {example}\n\
             Write out every day in full. Do not skip or abbreviate days, do not use comments, placeholders or ellipses, and do not add a distance_to_next field.\n",
            days = request.days,
            destination = request.destination,
            food = request.food_preference,
            attractions = place_list(attractions)?,
            restaurants = place_list(restaurants)?,
            accommodations = place_list(accommodations)?,
            count = labels.len(),
            example = example_shape()?,
        ))
    }
}

fn place_list(places: &[Place]) -> crate::Result<String> {
    let view: Vec<PromptPlace<'_>> = places.iter().map(PromptPlace::from).collect();
    serde_json::to_string(&view)
        .map_err(|e| ItineraryError::internal(format!("Failed to serialize places: {e}")))
}

fn example_shape() -> crate::Result<String> {
    let example = json!({
        "Day 1": [{
            "time": "8:00 AM",
            "activity": "Breakfast",
            "place_name": "Restaurant Name",
            "description": "Brief description",
            "rating": 4.5,
            "review": "Short review",
            "google_maps_url": "https://maps.google.com/...",
            "website_url": "https://example.com",
            "estimated_travel_time": "15 minutes",
            "location": { "lat": 12.3456, "lng": 78.9012 }
        }]
    });
    serde_json::to_string_pretty(&example)
        .map_err(|e| ItineraryError::internal(format!("Failed to serialize example: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::place;

    fn request(days: u32) -> ItineraryRequest {
        ItineraryRequest::new("Paris", days, "French").unwrap()
    }

    #[test]
    fn test_prompt_lists_exact_day_labels() {
        let prompt = PromptBuilder::new().build(&request(3), &[], &[], &[]).unwrap();
        assert!(prompt.contains("exactly 3 keys, in this order: \"Day 1\", \"Day 2\", \"Day 3\"."));
        assert!(prompt.contains("3-day trip to Paris"));
        assert!(prompt.contains("prefers French food"));
    }

    #[test]
    fn test_prompt_embeds_candidates() {
        let mut louvre = place("Louvre", "louvre", 48.8606, 2.3376);
        louvre.review = Some("Huge collection".to_string());
        let hotel = place("Hotel Lutetia", "lutetia", 48.8511, 2.3273);

        let prompt = PromptBuilder::new()
            .build(&request(2), &[louvre], &[], &[hotel])
            .unwrap();

        assert!(prompt.contains("\"name\":\"Louvre\""));
        assert!(prompt.contains("Huge collection"));
        assert!(prompt.contains("Restaurants: []"));
        assert!(prompt.contains("\"name\":\"Hotel Lutetia\""));
        assert!(prompt.contains(NO_REVIEW));
    }

    #[test]
    fn test_prompt_describes_parser_fields() {
        let prompt = PromptBuilder::new().build(&request(1), &[], &[], &[]).unwrap();
        for field in ["\"time\"", "\"activity\"", "\"place_name\"", "\"location\"", "\"estimated_travel_time\""] {
            assert!(prompt.contains(field), "missing {field}");
        }
        assert!(prompt.contains("do not use comments"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let places = vec![place("Louvre", "louvre", 48.8606, 2.3376)];
        let builder = PromptBuilder::new();
        assert_eq!(
            builder.build(&request(2), &places, &places, &places).unwrap(),
            builder.build(&request(2), &places, &places, &places).unwrap()
        );
    }
}
