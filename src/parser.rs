//! Extraction and validation of the model's itinerary JSON
//!
//! The generative model answers in free text that usually, but not always,
//! contains a single JSON object. [`extract_json_object`] isolates the
//! candidate span and [`ItineraryParser`] validates it into an [`Itinerary`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{Activity, GeoPoint, Itinerary, ItineraryDay, NO_REVIEW, day_label, day_number};

/// Wrapper key some replies nest the days under
const WRAPPER_KEY: &str = "itinerary";

/// How to treat a reply whose day labels differ from the requested trip
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayCountPolicy {
    /// Require exactly `Day 1` .. `Day N`
    #[default]
    Strict,
    /// Accept whatever days came back, with a warning
    Lenient,
}

/// Why generated text could not be turned into an itinerary
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("no JSON object found in generated text")]
    NoJsonFound,

    #[error("generated JSON is malformed: {source}")]
    MalformedJson {
        source: serde_json::Error,
        payload: String,
    },

    #[error("generated JSON is not an object")]
    NotAnObject,

    #[error("generated itinerary contains no days")]
    NoDays,

    #[error("expected {expected} days, found {found}")]
    DayCountMismatch { expected: usize, found: usize },

    #[error("invalid day entry \"{day}\"")]
    InvalidDay { day: String },

    #[error("activity {index} of \"{day}\" is not an object")]
    InvalidActivity { day: String, index: usize },

    #[error("activity {index} of \"{day}\" has no string field \"{field}\"")]
    MissingField {
        day: String,
        index: usize,
        field: &'static str,
    },
}

/// Span from the first `{` to the last `}`, if there is one
#[must_use]
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    text.get(start..=end)
}

/// Validates generated text into an [`Itinerary`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ItineraryParser {
    policy: DayCountPolicy,
}

impl ItineraryParser {
    #[must_use]
    pub fn new(policy: DayCountPolicy) -> Self {
        Self { policy }
    }

    /// Parse `raw` as an itinerary of `expected_days` days.
    ///
    /// Distances are never taken from the model; every activity comes back
    /// with `distance_to_next` unset.
    pub fn parse(&self, raw: &str, expected_days: u32) -> Result<Itinerary, ParseError> {
        let payload = extract_json_object(raw).ok_or(ParseError::NoJsonFound)?;
        debug!(bytes = payload.len(), "Extracted JSON span from generated text");

        let value: Value =
            serde_json::from_str(payload).map_err(|source| ParseError::MalformedJson {
                source,
                payload: payload.to_string(),
            })?;

        let mut root = unwrap_days(value)?;
        if root.is_empty() {
            return Err(ParseError::NoDays);
        }

        let labels = self.day_labels(&root, expected_days)?;
        let days = labels
            .into_iter()
            .map(|label| {
                let value = root.remove(&label).unwrap_or(Value::Null);
                parse_day(label, value)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Itinerary::new(days))
    }

    /// Labels to read, in calendar order
    fn day_labels(
        &self,
        root: &Map<String, Value>,
        expected_days: u32,
    ) -> Result<Vec<String>, ParseError> {
        let expected: Vec<String> = (1..=expected_days).map(day_label).collect();

        match self.policy {
            DayCountPolicy::Strict => {
                if root.len() != expected.len() {
                    return Err(ParseError::DayCountMismatch {
                        expected: expected.len(),
                        found: root.len(),
                    });
                }
                if let Some(unexpected) = root.keys().find(|key| !expected.contains(key)) {
                    return Err(ParseError::InvalidDay {
                        day: unexpected.clone(),
                    });
                }
                Ok(expected)
            }
            DayCountPolicy::Lenient => {
                let (mut labels, skipped): (Vec<String>, Vec<String>) = root
                    .keys()
                    .cloned()
                    .partition(|label| day_number(label).is_some());
                if !skipped.is_empty() {
                    warn!(skipped = ?skipped, "Ignoring keys that are not day labels");
                }
                if labels.is_empty() {
                    return Err(ParseError::NoDays);
                }
                labels.sort_by_key(|label| (day_number(label), label.clone()));
                if labels != expected {
                    warn!(
                        expected = expected.len(),
                        found = labels.len(),
                        labels = ?labels,
                        "Generated itinerary does not match the requested days"
                    );
                }
                Ok(labels)
            }
        }
    }
}

fn unwrap_days(value: Value) -> Result<Map<String, Value>, ParseError> {
    let Value::Object(mut root) = value else {
        return Err(ParseError::NotAnObject);
    };

    if root.len() == 1 && root.contains_key(WRAPPER_KEY) {
        return match root.remove(WRAPPER_KEY) {
            Some(Value::Object(inner)) => Ok(inner),
            _ => Err(ParseError::NotAnObject),
        };
    }

    Ok(root)
}

fn parse_day(label: String, value: Value) -> Result<ItineraryDay, ParseError> {
    let entries = match value {
        Value::Array(entries) if !entries.is_empty() => entries,
        _ => return Err(ParseError::InvalidDay { day: label }),
    };

    let activities = entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| parse_activity(&label, index, entry))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ItineraryDay::new(label, activities))
}

fn parse_activity(day: &str, index: usize, entry: Value) -> Result<Activity, ParseError> {
    let Value::Object(fields) = entry else {
        return Err(ParseError::InvalidActivity {
            day: day.to_string(),
            index,
        });
    };

    let required = |field: &'static str| {
        optional_text(&fields, field).ok_or_else(|| ParseError::MissingField {
            day: day.to_string(),
            index,
            field,
        })
    };

    Ok(Activity {
        time: required("time")?,
        activity: required("activity")?,
        place_name: required("place_name")?,
        description: optional_text(&fields, "description").unwrap_or_default(),
        rating: fields.get("rating").and_then(number),
        review: optional_text(&fields, "review").unwrap_or_else(|| NO_REVIEW.to_string()),
        google_maps_url: optional_text(&fields, "google_maps_url").unwrap_or_default(),
        website_url: optional_text(&fields, "website_url"),
        estimated_travel_time: optional_text(&fields, "estimated_travel_time")
            .unwrap_or_else(|| "N/A".to_string()),
        location: fields.get("location").and_then(location),
        distance_to_next: None,
    })
}

/// Non-blank string field
fn optional_text(fields: &Map<String, Value>, field: &str) -> Option<String> {
    fields
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Number, or a string holding one
fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

fn location(value: &Value) -> Option<GeoPoint> {
    let lat = value.get("lat").and_then(number)?;
    let lng = value.get("lng").and_then(number)?;
    GeoPoint::new(lat, lng)
}
