//! Itinerary request and the day-by-day itinerary document

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use super::place::GeoPoint;
use crate::ItineraryError;

/// Longest trip that can be planned in one request
pub const MAX_TRIP_DAYS: u32 = 14;

const MAX_TEXT_LEN: usize = 100;

/// Label of the n-th day, starting at 1
#[must_use]
pub fn day_label(day: u32) -> String {
    format!("Day {day}")
}

/// Day number of a `"Day N"` label
#[must_use]
pub fn day_number(label: &str) -> Option<u32> {
    label.trim().strip_prefix("Day ")?.trim().parse().ok()
}

/// Parameters of one generation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItineraryRequest {
    pub destination: String,
    pub days: u32,
    pub food_preference: String,
}

impl ItineraryRequest {
    /// Build a validated request
    pub fn new(
        destination: impl Into<String>,
        days: u32,
        food_preference: impl Into<String>,
    ) -> crate::Result<Self> {
        let request = Self {
            destination: destination.into().trim().to_string(),
            days,
            food_preference: food_preference.into().trim().to_string(),
        };
        request.validate()?;
        Ok(request)
    }

    /// Check the limits the service accepts
    pub fn validate(&self) -> crate::Result<()> {
        validate_text("Destination", &self.destination)?;
        validate_text("Food preference", &self.food_preference)?;

        if !(1..=MAX_TRIP_DAYS).contains(&self.days) {
            return Err(ItineraryError::validation(format!(
                "Number of days must be between 1 and {MAX_TRIP_DAYS}, got: {}",
                self.days
            )));
        }

        Ok(())
    }

    /// The labels a complete itinerary for this request carries, in order
    #[must_use]
    pub fn day_labels(&self) -> Vec<String> {
        (1..=self.days).map(day_label).collect()
    }
}

fn validate_text(field: &str, value: &str) -> crate::Result<()> {
    if value.trim().is_empty() {
        return Err(ItineraryError::validation(format!("{field} cannot be empty")));
    }
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(ItineraryError::validation(format!(
            "{field} cannot be longer than {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(())
}

/// Travel distance from an activity to the one after it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DistanceToNext {
    /// Driving distance reported by the routing service
    Driving { meters: f64 },
    /// One of the two activities has no coordinates
    LocationUnavailable,
    /// The routing service could not produce a distance
    CalculationFailed,
    /// Last activity of the day
    NotApplicable,
}

impl DistanceToNext {
    pub const LOCATION_UNAVAILABLE: &'static str = "Location data unavailable";
    pub const CALCULATION_FAILED: &'static str = "Distance calculation failed";
    pub const NOT_APPLICABLE: &'static str = "N/A";
}

impl fmt::Display for DistanceToNext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceToNext::Driving { meters } => write!(f, "{:.2} km", meters / 1000.0),
            DistanceToNext::LocationUnavailable => f.write_str(Self::LOCATION_UNAVAILABLE),
            DistanceToNext::CalculationFailed => f.write_str(Self::CALCULATION_FAILED),
            DistanceToNext::NotApplicable => f.write_str(Self::NOT_APPLICABLE),
        }
    }
}

impl FromStr for DistanceToNext {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            Self::LOCATION_UNAVAILABLE => Ok(DistanceToNext::LocationUnavailable),
            Self::CALCULATION_FAILED => Ok(DistanceToNext::CalculationFailed),
            Self::NOT_APPLICABLE => Ok(DistanceToNext::NotApplicable),
            other => other
                .strip_suffix("km")
                .and_then(|km| km.trim().parse::<f64>().ok())
                .filter(|km| km.is_finite() && *km >= 0.0)
                .map(|km| DistanceToNext::Driving { meters: km * 1000.0 })
                .ok_or_else(|| format!("unrecognised distance: {other}")),
        }
    }
}

impl TryFrom<String> for DistanceToNext {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DistanceToNext> for String {
    fn from(value: DistanceToNext) -> Self {
        value.to_string()
    }
}

/// One scheduled slot in a day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub time: String,
    pub activity: String,
    pub place_name: String,
    pub description: String,
    pub rating: Option<f64>,
    pub review: String,
    pub google_maps_url: String,
    pub website_url: Option<String>,
    pub estimated_travel_time: String,
    pub location: Option<GeoPoint>,
    /// Filled in by distance enrichment
    #[serde(default)]
    pub distance_to_next: Option<DistanceToNext>,
}

/// Ordered activities of one day
#[derive(Debug, Clone, PartialEq)]
pub struct ItineraryDay {
    pub label: String,
    pub activities: Vec<Activity>,
}

impl ItineraryDay {
    #[must_use]
    pub fn new(label: impl Into<String>, activities: Vec<Activity>) -> Self {
        Self {
            label: label.into(),
            activities,
        }
    }
}

/// Day-by-day itinerary, days in calendar order.
///
/// Serialises as a JSON object keyed by day label.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(try_from = "BTreeMap<String, Vec<Activity>>")]
pub struct Itinerary {
    days: Vec<ItineraryDay>,
}

impl Itinerary {
    #[must_use]
    pub fn new(days: Vec<ItineraryDay>) -> Self {
        Self { days }
    }

    #[must_use]
    pub fn days(&self) -> &[ItineraryDay] {
        &self.days
    }

    #[must_use]
    pub fn into_days(self) -> Vec<ItineraryDay> {
        self.days
    }

    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        self.days.iter().map(|day| day.label.as_str()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.days.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    /// Total number of activities across all days
    #[must_use]
    pub fn activity_count(&self) -> usize {
        self.days.iter().map(|day| day.activities.len()).sum()
    }
}

impl Serialize for Itinerary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.days.len()))?;
        for day in &self.days {
            map.serialize_entry(&day.label, &day.activities)?;
        }
        map.end()
    }
}

impl TryFrom<BTreeMap<String, Vec<Activity>>> for Itinerary {
    type Error = String;

    fn try_from(map: BTreeMap<String, Vec<Activity>>) -> Result<Self, Self::Error> {
        let mut days = map
            .into_iter()
            .map(|(label, activities)| {
                day_number(&label)
                    .map(|n| (n, ItineraryDay::new(label.clone(), activities)))
                    .ok_or_else(|| format!("invalid day label: {label}"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        days.sort_by_key(|(n, _)| *n);
        Ok(Self::new(days.into_iter().map(|(_, day)| day).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn activity(name: &str) -> Activity {
        Activity {
            time: "9:00 AM".to_string(),
            activity: "Visit Attraction".to_string(),
            place_name: name.to_string(),
            description: String::new(),
            rating: Some(4.5),
            review: "Lovely".to_string(),
            google_maps_url: String::new(),
            website_url: None,
            estimated_travel_time: "N/A".to_string(),
            location: GeoPoint::new(48.86, 2.33),
            distance_to_next: Some(DistanceToNext::NotApplicable),
        }
    }

    #[rstest]
    #[case("Paris", 3, "French", true)]
    #[case("  ", 3, "French", false)]
    #[case("Paris", 0, "French", false)]
    #[case("Paris", 14, "French", true)]
    #[case("Paris", 15, "French", false)]
    #[case("Paris", 3, "", false)]
    fn test_request_validation(
        #[case] destination: &str,
        #[case] days: u32,
        #[case] food: &str,
        #[case] valid: bool,
    ) {
        assert_eq!(ItineraryRequest::new(destination, days, food).is_ok(), valid);
    }

    #[test]
    fn test_request_rejects_long_destination() {
        let err = ItineraryRequest::new("x".repeat(101), 2, "Any").unwrap_err();
        assert!(err.to_string().contains("100 characters"));
    }

    #[test]
    fn test_day_labels() {
        let request = ItineraryRequest::new("Rome", 3, "Italian").unwrap();
        assert_eq!(request.day_labels(), vec!["Day 1", "Day 2", "Day 3"]);
        assert_eq!(day_number("Day 12"), Some(12));
        assert_eq!(day_number("Tag 1"), None);
    }

    #[rstest]
    #[case(DistanceToNext::Driving { meters: 4320.0 }, "4.32 km")]
    #[case(DistanceToNext::Driving { meters: 250.0 }, "0.25 km")]
    #[case(DistanceToNext::LocationUnavailable, "Location data unavailable")]
    #[case(DistanceToNext::CalculationFailed, "Distance calculation failed")]
    #[case(DistanceToNext::NotApplicable, "N/A")]
    fn test_distance_formatting(#[case] distance: DistanceToNext, #[case] expected: &str) {
        assert_eq!(distance.to_string(), expected);
        assert_eq!(serde_json::to_value(&distance).unwrap(), expected);
        assert_eq!(expected.parse::<DistanceToNext>().unwrap().to_string(), expected);
    }

    #[test]
    fn test_distance_rejects_garbage() {
        assert!("far away".parse::<DistanceToNext>().is_err());
        assert!("-3 km".parse::<DistanceToNext>().is_err());
    }

    #[test]
    fn test_itinerary_serializes_in_calendar_order() {
        let itinerary = Itinerary::new(
            (1..=11)
                .map(|n| ItineraryDay::new(day_label(n), vec![activity("Louvre")]))
                .collect(),
        );

        let json = serde_json::to_string(&itinerary).unwrap();
        let day2 = json.find("\"Day 2\"").unwrap();
        let day10 = json.find("\"Day 10\"").unwrap();
        assert!(day2 < day10);

        let back: Itinerary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, itinerary);
        assert_eq!(back.activity_count(), 11);
    }

    #[test]
    fn test_itinerary_deserialize_rejects_unknown_labels() {
        let json = serde_json::json!({ "Monday": [] }).to_string();
        assert!(serde_json::from_str::<Itinerary>(&json).is_err());
    }
}
