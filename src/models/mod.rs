//! Data models for itinerary generation
//!
//! - Place: search candidates, coordinates and detail records
//! - Itinerary: the request and the day-by-day document returned to callers

pub mod itinerary;
pub mod place;

pub use itinerary::{
    Activity, DistanceToNext, Itinerary, ItineraryDay, ItineraryRequest, MAX_TRIP_DAYS, day_label,
    day_number,
};
pub use place::{GeoPoint, NO_REVIEW, Place, PlaceCategory, PlaceDetails};
