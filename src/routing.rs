//! Driving distance between two coordinates

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest_middleware::ClientWithMiddleware;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::ItineraryError;
use crate::config::RoutingConfig;
use crate::error::CollaboratorError;
use crate::http;
use crate::models::GeoPoint;

/// A directions service
#[async_trait]
pub trait RoutingProvider: Send + Sync {
    /// Driving distance in meters along the best route
    async fn route(&self, origin: GeoPoint, destination: GeoPoint) -> Result<f64, CollaboratorError>;
}

/// OpenRouteService directions client
pub struct OpenRouteServiceClient {
    client: ClientWithMiddleware,
    api_key: String,
    base_url: String,
    profile: String,
}

#[derive(Debug, Serialize)]
struct DirectionsRequest {
    /// `[lng, lat]` pairs
    coordinates: [[f64; 2]; 2],
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    routes: Option<Vec<Route>>,
}

#[derive(Debug, Deserialize)]
struct Route {
    summary: Option<Summary>,
}

#[derive(Debug, Deserialize)]
struct Summary {
    distance: Option<f64>,
}

impl DirectionsResponse {
    fn distance(self) -> Option<f64> {
        self.routes?
            .into_iter()
            .next()?
            .summary?
            .distance
            .filter(|meters| meters.is_finite() && *meters >= 0.0)
    }
}

impl OpenRouteServiceClient {
    pub fn from_config(config: &RoutingConfig) -> crate::Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| ItineraryError::config("routing.api_key is not set"))?;

        Self::with_base_url(
            api_key,
            &config.base_url,
            &config.profile,
            Duration::from_secs(u64::from(config.timeout_seconds)),
        )
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: &str,
        profile: &str,
        timeout: Duration,
    ) -> crate::Result<Self> {
        Ok(Self {
            client: http::build_client(timeout)?,
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            profile: profile.to_string(),
        })
    }
}

#[async_trait]
impl RoutingProvider for OpenRouteServiceClient {
    #[instrument(skip(self))]
    async fn route(&self, origin: GeoPoint, destination: GeoPoint) -> Result<f64, CollaboratorError> {
        tracing::debug!("Calling the directions API");
        let url = format!("{}/v2/directions/{}", self.base_url, self.profile);
        let body = serde_json::to_vec(&DirectionsRequest {
            coordinates: [[origin.lng, origin.lat], [destination.lng, destination.lat]],
        })
        .map_err(|e| CollaboratorError::InvalidResponse(format!("Failed to encode request: {e}")))?;

        let request = self
            .client
            .post(url)
            .header(AUTHORIZATION, self.api_key.as_str())
            .header(CONTENT_TYPE, "application/json")
            .body(body);

        let response = http::send(request).await?;
        let directions: DirectionsResponse = http::read_json(response).await?;

        directions
            .distance()
            .ok_or_else(|| CollaboratorError::InvalidResponse("No route distance in response".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> OpenRouteServiceClient {
        OpenRouteServiceClient::with_base_url(
            "ors-key",
            &server.base_url(),
            "driving-car",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn louvre() -> GeoPoint {
        GeoPoint::new(48.8606, 2.3376).unwrap()
    }

    fn eiffel() -> GeoPoint {
        GeoPoint::new(48.8584, 2.2945).unwrap()
    }

    #[tokio::test]
    async fn test_route_posts_lng_lat_pairs() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v2/directions/driving-car")
                    .header("authorization", "ors-key")
                    .json_body(json!({ "coordinates": [[2.3376, 48.8606], [2.2945, 48.8584]] }));
                then.status(200)
                    .json_body(json!({ "routes": [{ "summary": { "distance": 4320.0, "duration": 780.0 } }] }));
            })
            .await;

        let meters = client(&server).route(louvre(), eiffel()).await.unwrap();

        mock.assert_async().await;
        assert_eq!(meters, 4320.0);
    }

    #[tokio::test]
    async fn test_missing_routes_is_invalid_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v2/directions/driving-car");
                then.status(200).json_body(json!({ "routes": [] }));
            })
            .await;

        let err = client(&server).route(louvre(), eiffel()).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_rate_limit_is_http_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v2/directions/driving-car");
                then.status(429).body("Rate Limit Exceeded");
            })
            .await;

        let err = client(&server).route(louvre(), eiffel()).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Http { status: 429, .. }));
    }

    #[test]
    fn test_from_config_requires_key() {
        assert!(OpenRouteServiceClient::from_config(&RoutingConfig::default()).is_err());
    }
}
