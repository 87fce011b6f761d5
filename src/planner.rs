//! The itinerary generation pipeline
//!
//! search (three categories concurrently) → detail enrichment → prompt →
//! generation → parsing → distance enrichment.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, instrument};

use crate::ItineraryError;
use crate::config::ItineraryConfig;
use crate::distance::DistanceEnricher;
use crate::generation::{GeminiClient, TextGenerator};
use crate::models::{Itinerary, ItineraryRequest, PlaceCategory};
use crate::parser::ItineraryParser;
use crate::places::{GooglePlacesClient, PlaceDetailEnricher, PlaceFinder, PlaceSearchProvider};
use crate::prompt::PromptBuilder;
use crate::retry::RetryPolicy;
use crate::routing::{OpenRouteServiceClient, RoutingProvider};

/// The external services the pipeline talks to
#[derive(Clone)]
pub struct Collaborators {
    pub places: Arc<dyn PlaceSearchProvider>,
    pub generator: Arc<dyn TextGenerator>,
    pub routing: Arc<dyn RoutingProvider>,
}

impl Collaborators {
    /// Build the live Google Places, Gemini and OpenRouteService clients
    pub fn from_config(config: &ItineraryConfig) -> crate::Result<Self> {
        Ok(Self {
            places: Arc::new(GooglePlacesClient::from_config(&config.places)?),
            generator: Arc::new(GeminiClient::from_config(&config.generation)?),
            routing: Arc::new(OpenRouteServiceClient::from_config(&config.routing)?),
        })
    }
}

/// Turns a request into a distance-annotated itinerary
pub struct ItineraryPlanner {
    finder: PlaceFinder,
    enricher: PlaceDetailEnricher,
    prompt: PromptBuilder,
    generator: Arc<dyn TextGenerator>,
    parser: ItineraryParser,
    distances: DistanceEnricher,
    retry: RetryPolicy,
    deadline: Duration,
}

impl ItineraryPlanner {
    pub fn new(config: &ItineraryConfig, collaborators: Collaborators) -> Self {
        let retry = RetryPolicy::from_config(&config.retry);
        let pipeline = &config.pipeline;

        Self {
            finder: PlaceFinder::new(
                collaborators.places.clone(),
                retry,
                config.places.max_results,
            ),
            enricher: PlaceDetailEnricher::new(
                collaborators.places,
                retry,
                pipeline.detail_concurrency,
            ),
            prompt: PromptBuilder::new(),
            generator: collaborators.generator,
            parser: ItineraryParser::new(pipeline.day_count_policy),
            distances: DistanceEnricher::new(
                collaborators.routing,
                retry,
                pipeline.routing_concurrency,
            ),
            retry,
            deadline: Duration::from_secs(pipeline.deadline_seconds),
        }
    }

    /// Run the pipeline under the configured deadline
    pub async fn generate_itinerary(&self, request: &ItineraryRequest) -> crate::Result<Itinerary> {
        self.generate_itinerary_with_deadline(request, self.deadline)
            .await
    }

    /// Run the pipeline, abandoning in-flight calls once `deadline` passes
    pub async fn generate_itinerary_with_deadline(
        &self,
        request: &ItineraryRequest,
        deadline: Duration,
    ) -> crate::Result<Itinerary> {
        request.validate()?;

        match tokio::time::timeout(deadline, self.run(request)).await {
            Ok(result) => result,
            Err(_) => {
                error!(?deadline, destination = %request.destination, "Itinerary generation timed out");
                Err(ItineraryError::Timeout(deadline))
            }
        }
    }

    #[instrument(skip(self, request), fields(destination = %request.destination, days = request.days))]
    async fn run(&self, request: &ItineraryRequest) -> crate::Result<Itinerary> {
        info!("Generating itinerary");
        let destination = request.destination.as_str();
        let food = Some(request.food_preference.as_str());

        let (attractions, restaurants, accommodations) = tokio::join!(
            self.finder.find(PlaceCategory::Attraction, destination, None),
            self.finder.find(PlaceCategory::Restaurant, destination, food),
            self.finder.find(PlaceCategory::Accommodation, destination, None),
        );
        info!(
            attractions = attractions.len(),
            restaurants = restaurants.len(),
            accommodations = accommodations.len(),
            "Candidate places found"
        );

        // One pool across all categories, split back afterwards.
        let (attraction_count, restaurant_count) = (attractions.len(), restaurants.len());
        let mut enriched = self
            .enricher
            .enrich_places([attractions, restaurants, accommodations].concat())
            .await;
        let accommodations = enriched.split_off(attraction_count + restaurant_count);
        let restaurants = enriched.split_off(attraction_count);
        let attractions = enriched;

        let prompt = self
            .prompt
            .build(request, &attractions, &restaurants, &accommodations)?;
        debug!(prompt_len = prompt.len(), "Prompt built");

        let raw = self.generate(&prompt).await?;

        let itinerary = self.parser.parse(&raw, request.days).map_err(|err| {
            error!(error = %err, "Generated itinerary rejected");
            ItineraryError::from(err)
        })?;
        info!(
            days = itinerary.len(),
            activities = itinerary.activity_count(),
            "Itinerary parsed"
        );

        let itinerary = self.distances.enrich(itinerary).await;
        info!("Itinerary generation completed");
        Ok(itinerary)
    }

    async fn generate(&self, prompt: &str) -> crate::Result<String> {
        let generator = self.generator.as_ref();

        self.retry
            .run("generate_itinerary", move || generator.generate(prompt))
            .await
            .map_err(|err| {
                error!(error = %err, "Generation failed");
                ItineraryError::network(format!("Itinerary generation failed: {err}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ItineraryConfig;
    use crate::error::CollaboratorError;
    use crate::parser::ParseError;
    use crate::test_support::{StubGenerator, StubPlaceSearch, StubRouting, details, itinerary_reply, place};

    fn config() -> ItineraryConfig {
        let mut config = ItineraryConfig::default();
        config.retry.delay_ms = 0;
        config
    }

    fn planner(places: StubPlaceSearch, generator: StubGenerator) -> (ItineraryPlanner, Arc<StubGenerator>) {
        let generator = Arc::new(generator);
        let collaborators = Collaborators {
            places: Arc::new(places),
            generator: generator.clone(),
            routing: Arc::new(StubRouting::new(1200.0)),
        };
        (ItineraryPlanner::new(&config(), collaborators), generator)
    }

    fn paris() -> ItineraryRequest {
        ItineraryRequest::new("Paris", 2, "French").unwrap()
    }

    #[tokio::test]
    async fn test_prompt_carries_enriched_places() {
        let places = StubPlaceSearch::new()
            .with_results("tourist attraction in Paris", vec![place("Louvre", "louvre", 48.8606, 2.3376)])
            .with_results("French restaurant in Paris", vec![place("Le Procope", "procope", 48.853, 2.3388)])
            .with_details("louvre", details("Endless galleries"));
        let reply = itinerary_reply(2, &[("Louvre", Some((48.8606, 2.3376)))]);
        let (planner, generator) = planner(places, StubGenerator::replying(reply));

        planner.generate_itinerary(&paris()).await.unwrap();

        let prompts = generator.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Endless galleries"));
        assert!(prompts[0].contains("Le Procope"));
    }

    #[tokio::test]
    async fn test_unreadable_reply_is_terminal() {
        let (planner, generator) = planner(
            StubPlaceSearch::new(),
            StubGenerator::replying("Sorry, I can't plan that trip."),
        );

        let err = planner.generate_itinerary(&paris()).await.unwrap_err();

        assert!(matches!(err, ItineraryError::GenerationOutputInvalid(ParseError::NoJsonFound)));
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_request_makes_no_calls() {
        let (planner, generator) = planner(
            StubPlaceSearch::new(),
            StubGenerator::failing(CollaboratorError::transient("unused")),
        );
        let request = ItineraryRequest {
            destination: "Paris".to_string(),
            days: 0,
            food_preference: "French".to_string(),
        };

        let err = planner.generate_itinerary(&request).await.unwrap_err();

        assert!(matches!(err, ItineraryError::Validation { .. }));
        assert_eq!(generator.calls(), 0);
    }

    #[test]
    fn test_live_collaborators_need_keys() {
        assert!(matches!(
            Collaborators::from_config(&ItineraryConfig::default()),
            Err(ItineraryError::Config { .. })
        ));
    }
}
