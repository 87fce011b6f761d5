//! End-to-end pipeline tests against stub collaborators

use std::sync::Arc;
use std::time::Duration;

use itinerai::error::CollaboratorError;
use itinerai::models::{DistanceToNext, ItineraryRequest};
use itinerai::parser::ParseError;
use itinerai::test_support::{
    StubGenerator, StubPlaceSearch, StubRouting, details, itinerary_reply, place,
};
use itinerai::{Collaborators, DayCountPolicy, ItineraryConfig, ItineraryError, ItineraryPlanner};
use rstest::{fixture, rstest};

#[fixture]
fn config() -> ItineraryConfig {
    let mut config = ItineraryConfig::default();
    config.retry.delay_ms = 0;
    config
}

#[fixture]
fn paris_places() -> StubPlaceSearch {
    StubPlaceSearch::new()
        .with_results(
            "tourist attraction in Paris",
            vec![
                place("Louvre", "louvre", 48.8606, 2.3376),
                place("Eiffel Tower", "eiffel", 48.8584, 2.2945),
            ],
        )
        .with_results(
            "French restaurant in Paris",
            vec![
                place("Le Procope", "procope", 48.853, 2.3388),
                place("Chez Janou", "janou", 48.8578, 2.3665),
            ],
        )
        .with_results("hotel in Paris", vec![place("Hotel Lutetia", "lutetia", 48.8511, 2.3273)])
        .with_details("louvre", details("Endless galleries"))
        .with_details("lutetia", details("Quiet rooms"))
}

fn paris(days: u32) -> ItineraryRequest {
    ItineraryRequest::new("Paris", days, "French").unwrap()
}

struct Harness {
    planner: ItineraryPlanner,
    places: Arc<StubPlaceSearch>,
    generator: Arc<StubGenerator>,
    routing: Arc<StubRouting>,
}

fn harness(
    config: &ItineraryConfig,
    places: StubPlaceSearch,
    generator: StubGenerator,
    routing: StubRouting,
) -> Harness {
    let places = Arc::new(places);
    let generator = Arc::new(generator);
    let routing = Arc::new(routing);
    let collaborators = Collaborators {
        places: places.clone(),
        generator: generator.clone(),
        routing: routing.clone(),
    };

    Harness {
        planner: ItineraryPlanner::new(config, collaborators),
        places,
        generator,
        routing,
    }
}

const FULL_DAY: [(&str, Option<(f64, f64)>); 3] = [
    ("Louvre", Some((48.8606, 2.3376))),
    ("Le Procope", Some((48.853, 2.3388))),
    ("Hotel Lutetia", Some((48.8511, 2.3273))),
];

#[rstest]
#[tokio::test]
async fn test_three_day_trip_gets_distances(config: ItineraryConfig, paris_places: StubPlaceSearch) {
    let h = harness(
        &config,
        paris_places,
        StubGenerator::replying(itinerary_reply(3, &FULL_DAY)),
        StubRouting::new(4320.0),
    );

    let itinerary = h.planner.generate_itinerary(&paris(3)).await.unwrap();

    assert_eq!(itinerary.labels(), ["Day 1", "Day 2", "Day 3"]);
    for day in itinerary.days() {
        let distances: Vec<_> = day
            .activities
            .iter()
            .map(|a| a.distance_to_next.clone())
            .collect();
        assert_eq!(
            distances,
            [
                Some(DistanceToNext::Driving { meters: 4320.0 }),
                Some(DistanceToNext::Driving { meters: 4320.0 }),
                Some(DistanceToNext::NotApplicable),
            ]
        );
    }
    assert_eq!(h.routing.calls(), 6);
    assert_eq!(h.places.search_calls(), 3);
    assert_eq!(h.places.details_calls(), 5);

    let json = serde_json::to_value(&itinerary).unwrap();
    assert_eq!(json["Day 1"][0]["distance_to_next"], "4.32 km");
    assert_eq!(json["Day 3"][2]["distance_to_next"], "N/A");
}

#[rstest]
#[tokio::test]
async fn test_missing_coordinate_skips_routing(config: ItineraryConfig, paris_places: StubPlaceSearch) {
    let stops = [
        ("Louvre", Some((48.8606, 2.3376))),
        ("Picnic by the Seine", None),
        ("Le Procope", Some((48.853, 2.3388))),
        ("Hotel Lutetia", Some((48.8511, 2.3273))),
    ];
    let h = harness(
        &config,
        paris_places,
        StubGenerator::replying(itinerary_reply(1, &stops)),
        StubRouting::new(900.0),
    );

    let itinerary = h.planner.generate_itinerary(&paris(1)).await.unwrap();

    let rendered: Vec<String> = itinerary.days()[0]
        .activities
        .iter()
        .map(|a| a.distance_to_next.as_ref().map(ToString::to_string).unwrap_or_default())
        .collect();
    assert_eq!(
        rendered,
        [
            "Location data unavailable",
            "Location data unavailable",
            "0.90 km",
            "N/A"
        ]
    );
    assert_eq!(h.routing.calls(), 1);
}

#[rstest]
#[tokio::test]
async fn test_generation_exhausting_retries_is_network_failure(
    config: ItineraryConfig,
    paris_places: StubPlaceSearch,
) {
    let h = harness(
        &config,
        paris_places,
        StubGenerator::failing(CollaboratorError::Http {
            status: 503,
            message: "overloaded".to_string(),
            transient: true,
        }),
        StubRouting::new(1000.0),
    );

    let err = h.planner.generate_itinerary(&paris(3)).await.unwrap_err();

    assert!(matches!(err, ItineraryError::Network { .. }));
    assert_eq!(err.code(), "network_failure");
    assert_eq!(h.generator.calls(), 3);
    assert_eq!(h.routing.calls(), 0);
}

#[rstest]
#[tokio::test]
async fn test_rejected_generation_is_not_retried(config: ItineraryConfig) {
    let h = harness(
        &config,
        StubPlaceSearch::new(),
        StubGenerator::failing(CollaboratorError::Http {
            status: 400,
            message: "API key not valid".to_string(),
            transient: false,
        }),
        StubRouting::new(1000.0),
    );

    let err = h.planner.generate_itinerary(&paris(2)).await.unwrap_err();

    assert!(matches!(err, ItineraryError::Network { .. }));
    assert_eq!(h.generator.calls(), 1);
}

#[rstest]
#[tokio::test]
async fn test_strict_policy_rejects_short_itinerary(config: ItineraryConfig, paris_places: StubPlaceSearch) {
    let h = harness(
        &config,
        paris_places,
        StubGenerator::replying(itinerary_reply(2, &FULL_DAY)),
        StubRouting::new(1000.0),
    );

    let err = h.planner.generate_itinerary(&paris(3)).await.unwrap_err();

    assert!(matches!(
        err,
        ItineraryError::GenerationOutputInvalid(ParseError::DayCountMismatch {
            expected: 3,
            found: 2
        })
    ));
    assert_eq!(h.routing.calls(), 0);
}

#[rstest]
#[tokio::test]
async fn test_lenient_policy_accepts_short_itinerary(
    mut config: ItineraryConfig,
    paris_places: StubPlaceSearch,
) {
    config.pipeline.day_count_policy = DayCountPolicy::Lenient;
    let h = harness(
        &config,
        paris_places,
        StubGenerator::replying(itinerary_reply(2, &FULL_DAY)),
        StubRouting::new(1000.0),
    );

    let itinerary = h.planner.generate_itinerary(&paris(3)).await.unwrap();
    assert_eq!(itinerary.len(), 2);
}

#[rstest]
#[tokio::test]
async fn test_failed_searches_degrade_to_empty_candidates(config: ItineraryConfig) {
    let h = harness(
        &config,
        StubPlaceSearch::new().failing_search(CollaboratorError::transient("connection reset")),
        StubGenerator::replying(itinerary_reply(1, &FULL_DAY)),
        StubRouting::new(1000.0),
    );

    let itinerary = h.planner.generate_itinerary(&paris(1)).await.unwrap();

    assert_eq!(itinerary.len(), 1);
    assert_eq!(h.places.search_calls(), 9);
    assert_eq!(h.places.details_calls(), 0);
    assert!(h.generator.prompts()[0].contains("Tourist attractions: []"));
}

#[rstest]
#[tokio::test]
async fn test_same_reply_gives_same_itinerary(config: ItineraryConfig) {
    let h = harness(
        &config,
        StubPlaceSearch::new(),
        StubGenerator::replying(itinerary_reply(2, &FULL_DAY)),
        StubRouting::new(2000.0),
    );

    let first = h.planner.generate_itinerary(&paris(2)).await.unwrap();
    let second = h.planner.generate_itinerary(&paris(2)).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_expiry_is_timeout() {
    let mut config = ItineraryConfig::default();
    config.retry.delay_ms = 0;
    let h = harness(
        &config,
        StubPlaceSearch::new(),
        StubGenerator::replying(itinerary_reply(1, &FULL_DAY)).delayed(Duration::from_secs(60)),
        StubRouting::new(1000.0),
    );

    let err = h
        .planner
        .generate_itinerary_with_deadline(&paris(1), Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(matches!(err, ItineraryError::Timeout(d) if d == Duration::from_secs(5)));
    assert_eq!(err.code(), "timeout");
}
