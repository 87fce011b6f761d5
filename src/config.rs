//! Configuration management for itinerary generation
//!
//! Handles loading configuration from files and environment variables and
//! validates every setting before the collaborator clients are built.

use crate::ItineraryError;
use crate::parser::DayCountPolicy;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItineraryConfig {
    /// Place search and details API
    #[serde(default)]
    pub places: PlacesConfig,
    /// Driving distance API
    #[serde(default)]
    pub routing: RoutingConfig,
    /// Generative text API
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Retry behaviour shared by every collaborator call
    #[serde(default)]
    pub retry: RetryConfig,
    /// Pipeline concurrency, deadline and validation policy
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Google Places API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlacesConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_places_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_places_timeout")]
    pub timeout_seconds: u32,
    /// Number of search results kept per category
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

/// OpenRouteService settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_routing_base_url")]
    pub base_url: String,
    /// Directions profile, e.g. `driving-car`
    #[serde(default = "default_routing_profile")]
    pub profile: String,
    #[serde(default = "default_routing_timeout")]
    pub timeout_seconds: u32,
}

/// Gemini API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_generation_base_url")]
    pub base_url: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_generation_timeout")]
    pub timeout_seconds: u32,
    /// Ask the model for a JSON response body instead of free text
    #[serde(default = "default_json_mode")]
    pub json_mode: bool,
}

/// Retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per call, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Fixed delay between attempts in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub delay_ms: u64,
}

/// Pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Concurrent place detail lookups
    #[serde(default = "default_detail_concurrency")]
    pub detail_concurrency: usize,
    /// Days whose distances are computed concurrently
    #[serde(default = "default_routing_concurrency")]
    pub routing_concurrency: usize,
    /// Deadline for one whole generation request
    #[serde(default = "default_deadline_seconds")]
    pub deadline_seconds: u64,
    /// How to treat a model reply with the wrong number of days
    #[serde(default)]
    pub day_count_policy: DayCountPolicy,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_places_base_url() -> String {
    "https://maps.googleapis.com/maps/api/place".to_string()
}

fn default_places_timeout() -> u32 {
    30
}

fn default_max_results() -> usize {
    5
}

fn default_routing_base_url() -> String {
    "https://api.openrouteservice.org".to_string()
}

fn default_routing_profile() -> String {
    "driving-car".to_string()
}

fn default_routing_timeout() -> u32 {
    30
}

fn default_generation_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_generation_model() -> String {
    "gemini-1.5-pro-002".to_string()
}

fn default_generation_timeout() -> u32 {
    120
}

fn default_json_mode() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    2000
}

fn default_detail_concurrency() -> usize {
    4
}

fn default_routing_concurrency() -> usize {
    2
}

fn default_deadline_seconds() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_places_base_url(),
            timeout_seconds: default_places_timeout(),
            max_results: default_max_results(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_routing_base_url(),
            profile: default_routing_profile(),
            timeout_seconds: default_routing_timeout(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_generation_base_url(),
            model: default_generation_model(),
            timeout_seconds: default_generation_timeout(),
            json_mode: default_json_mode(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_retry_delay_ms(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            detail_concurrency: default_detail_concurrency(),
            routing_concurrency: default_routing_concurrency(),
            deadline_seconds: default_deadline_seconds(),
            day_count_policy: DayCountPolicy::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Environment variables read when the matching key is not configured
const LEGACY_KEY_VARS: [&str; 3] = ["GOOGLE_MAPS_API_KEY", "GOOGLE_AI_API_KEY", "ORS_API_KEY"];

impl ItineraryConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // ITINERAI_PLACES__API_KEY, ITINERAI_RETRY__MAX_ATTEMPTS, ...
        builder = builder.add_source(
            Environment::with_prefix("ITINERAI")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: ItineraryConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_legacy_keys(|name| std::env::var(name).ok());
        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("itinerai").join("config.toml"))
    }

    /// Fill unset API keys from the variables the service has always used
    pub fn apply_legacy_keys<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let [places_var, generation_var, routing_var] = LEGACY_KEY_VARS;
        if self.places.api_key.is_none() {
            self.places.api_key = lookup(places_var);
        }
        if self.generation.api_key.is_none() {
            self.generation.api_key = lookup(generation_var);
        }
        if self.routing.api_key.is_none() {
            self.routing.api_key = lookup(routing_var);
        }
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.places.base_url.is_empty() {
            self.places.base_url = default_places_base_url();
        }
        if self.places.timeout_seconds == 0 {
            self.places.timeout_seconds = default_places_timeout();
        }
        if self.places.max_results == 0 {
            self.places.max_results = default_max_results();
        }
        if self.routing.base_url.is_empty() {
            self.routing.base_url = default_routing_base_url();
        }
        if self.routing.profile.is_empty() {
            self.routing.profile = default_routing_profile();
        }
        if self.routing.timeout_seconds == 0 {
            self.routing.timeout_seconds = default_routing_timeout();
        }
        if self.generation.base_url.is_empty() {
            self.generation.base_url = default_generation_base_url();
        }
        if self.generation.model.is_empty() {
            self.generation.model = default_generation_model();
        }
        if self.generation.timeout_seconds == 0 {
            self.generation.timeout_seconds = default_generation_timeout();
        }
        if self.retry.max_attempts == 0 {
            self.retry.max_attempts = default_max_attempts();
        }
        if self.pipeline.detail_concurrency == 0 {
            self.pipeline.detail_concurrency = default_detail_concurrency();
        }
        if self.pipeline.routing_concurrency == 0 {
            self.pipeline.routing_concurrency = default_routing_concurrency();
        }
        if self.pipeline.deadline_seconds == 0 {
            self.pipeline.deadline_seconds = default_deadline_seconds();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Keys are optional here; a configured key must not be blank
    pub fn validate_api_keys(&self) -> Result<()> {
        let keys = [
            ("places.api_key", &self.places.api_key),
            ("routing.api_key", &self.routing.api_key),
            ("generation.api_key", &self.generation.api_key),
        ];

        for (name, key) in keys {
            if key.as_deref().is_some_and(|k| k.trim().is_empty()) {
                return Err(ItineraryError::config(format!(
                    "{name} cannot be empty if provided. Either remove it or provide a valid key."
                ))
                .into());
            }
        }

        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        let timeouts = [
            ("places", self.places.timeout_seconds),
            ("routing", self.routing.timeout_seconds),
            ("generation", self.generation.timeout_seconds),
        ];
        for (name, timeout) in timeouts {
            if timeout > 600 {
                return Err(ItineraryError::config(format!(
                    "{name} timeout cannot exceed 600 seconds"
                ))
                .into());
            }
        }

        if self.places.max_results > 20 {
            return Err(ItineraryError::config(
                "places.max_results cannot exceed 20 (one page of search results)",
            )
            .into());
        }

        if self.retry.max_attempts > 10 {
            return Err(ItineraryError::config("retry.max_attempts cannot exceed 10").into());
        }

        if self.retry.delay_ms > 60_000 {
            return Err(ItineraryError::config("retry.delay_ms cannot exceed 60000").into());
        }

        if self.pipeline.detail_concurrency > 32 || self.pipeline.routing_concurrency > 32 {
            return Err(
                ItineraryError::config("pipeline concurrency limits cannot exceed 32").into(),
            );
        }

        if self.pipeline.deadline_seconds > 3600 {
            return Err(ItineraryError::config(
                "pipeline.deadline_seconds cannot exceed 3600 (1 hour)",
            )
            .into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(ItineraryError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(ItineraryError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        let urls = [
            ("places", &self.places.base_url),
            ("routing", &self.routing.base_url),
            ("generation", &self.generation.base_url),
        ];
        for (name, url) in urls {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ItineraryError::config(format!(
                    "{name} base URL must be a valid HTTP or HTTPS URL"
                ))
                .into());
            }
        }

        Ok(())
    }
}
