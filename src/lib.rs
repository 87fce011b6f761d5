//! `itinerai` - day-by-day travel itineraries from place search, routing and
//! a generative text model
//!
//! The library finds candidate places for a destination, asks the model to
//! arrange them into days, validates the reply and annotates every activity
//! with the driving distance to the next one.

pub mod config;
pub mod distance;
pub mod error;
pub mod generation;
pub mod http;
pub mod logging;
pub mod models;
pub mod parser;
pub mod places;
pub mod planner;
pub mod prompt;
pub mod retry;
pub mod routing;

#[doc(hidden)]
pub mod test_support;

// Re-export core types for public API
pub use config::ItineraryConfig;
pub use error::{CollaboratorError, ItineraryError};
pub use models::{Activity, DistanceToNext, GeoPoint, Itinerary, ItineraryDay, ItineraryRequest, Place};
pub use parser::{DayCountPolicy, ItineraryParser, ParseError};
pub use planner::{Collaborators, ItineraryPlanner};
pub use retry::RetryPolicy;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, ItineraryError>;
