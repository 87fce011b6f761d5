//! Error types for itinerary generation
//!
//! [`ItineraryError`] is what callers of the planner see. [`CollaboratorError`]
//! describes a single failed call to one of the external services and only
//! escapes the pipeline when the failing step cannot degrade.

use std::time::Duration;

use thiserror::Error;

use crate::parser::ParseError;
use crate::retry::Retryable;

/// Terminal error for an itinerary generation request
#[derive(Error, Debug)]
pub enum ItineraryError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Rejected request parameters
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// A collaborator that cannot degrade failed after retries
    #[error("Network failure: {message}")]
    Network { message: String },

    /// The generative model's reply could not be turned into an itinerary
    #[error("Generated itinerary is invalid: {0}")]
    GenerationOutputInvalid(#[from] ParseError),

    /// The overall deadline expired
    #[error("Itinerary generation timed out after {0:?}")]
    Timeout(Duration),

    /// Anything else
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ItineraryError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new network failure
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable identifier for monitoring and alerting
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            ItineraryError::Config { .. } => "config",
            ItineraryError::Validation { .. } => "invalid_request",
            ItineraryError::Network { .. } => "network_failure",
            ItineraryError::GenerationOutputInvalid(_) => "generation_output_invalid",
            ItineraryError::Timeout(_) => "timeout",
            ItineraryError::Internal { .. } => "internal_error",
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            ItineraryError::Config { .. } => {
                "Configuration error. Please check your config file and API keys.".to_string()
            }
            ItineraryError::Validation { message } => format!("Invalid input: {message}"),
            ItineraryError::Network { .. } => {
                "Unable to reach the itinerary generation service. Please try again later."
                    .to_string()
            }
            ItineraryError::GenerationOutputInvalid(_) => {
                "The generated itinerary was incomplete or unreadable. Please try again."
                    .to_string()
            }
            ItineraryError::Timeout(_) => {
                "Itinerary generation took too long. Please try again.".to_string()
            }
            ItineraryError::Internal { .. } => "Failed to generate itinerary.".to_string(),
        }
    }
}

/// Failure of one call to an external collaborator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollaboratorError {
    /// The request never produced an HTTP response
    #[error("Network error: {message}")]
    Network { message: String, transient: bool },

    /// Non-success HTTP status
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        transient: bool,
    },

    /// The provider answered but reported a non-OK business status
    #[error("Service status {status}: {message}")]
    ServiceStatus { status: String, message: String },

    /// The response body did not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl CollaboratorError {
    /// Transport failure that is worth retrying
    pub fn transient<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
            transient: true,
        }
    }

    /// Provider-reported status other than OK
    pub fn status<S: Into<String>, M: Into<String>>(status: S, message: M) -> Self {
        Self::ServiceStatus {
            status: status.into(),
            message: message.into(),
        }
    }
}

impl Retryable for CollaboratorError {
    fn is_retryable(&self) -> bool {
        match self {
            CollaboratorError::Network { transient, .. } => *transient,
            CollaboratorError::Http {
                status, transient, ..
            } => *transient || matches!(status, 408 | 429 | 500..=599),
            CollaboratorError::ServiceStatus { status, .. } => {
                matches!(status.as_str(), "OVER_QUERY_LIMIT" | "UNKNOWN_ERROR")
            }
            CollaboratorError::InvalidResponse(_) => false,
        }
    }
}
