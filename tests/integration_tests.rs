use std::env;
use std::fs;
use std::path::PathBuf;

use taxi_query::analyzers::AggregationResult;
use taxi_query::error::LoadError;
use taxi_query::infra::store::{LocalStore, MemoryStore};
use taxi_query::loader::{self, LoaderConfig};
use taxi_query::pipeline::{QueryContext, Reply, handle_query};
use taxi_query::router::Intent;
use taxi_query::session::Session;
use taxi_query::source::{SourceFile, TaxiClass};

const YELLOW: &str = "VendorID,tpep_pickup_datetime,PULocationID,fare_amount\n\
                      1,2023-01-01 08:10:00,132,10\n\
                      1,2023-01-01 08:40:00,48,20\n\
                      1,2023-01-01 17:00:00,132,30\n";

const GREEN: &str = "VendorID,lpep_pickup_datetime,PULocationID,fare_amount\n\
                     2,2023-01-01 17:15:00,74,5\n\
                     2,2023-01-01 17:45:00,74,5\n\
                     2,2023-01-01 08:05:00,41,5\n";

fn temp_root(name: &str) -> PathBuf {
    let dir = env::temp_dir().join(name);
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(dir.join("trips")).unwrap();
    fs::write(dir.join("trips/yellow_tripdata_2023-01.csv"), YELLOW).unwrap();
    fs::write(dir.join("trips/green_tripdata_2023-01.csv"), GREEN).unwrap();
    dir
}

async fn ask(ctx: &QueryContext<'_>, question: &str) -> Reply {
    handle_query(Session::default(), ctx, question).await.1.reply
}

fn answer(intent: Intent, result: AggregationResult) -> Reply {
    Reply::Answer { intent, result }
}

#[tokio::test]
async fn test_two_source_scenario() {
    let root = temp_root("taxi_query_it_scenario");
    let store = LocalStore::new(&root);
    let sources = loader::discover(&store, "trips").await.unwrap();
    assert_eq!(sources.len(), 2);

    let config = LoaderConfig {
        chunk_size: 2,
        ..LoaderConfig::default()
    };
    let ctx = QueryContext {
        store: &store,
        sources: &sources,
        loader: &config,
    };

    assert_eq!(
        ask(&ctx, "average fare").await,
        answer(
            Intent::AverageFare,
            AggregationResult::Scalar {
                value: 12.5,
                unit: "$".into()
            }
        )
    );
    assert_eq!(
        ask(&ctx, "yellow taxi").await,
        answer(
            Intent::FilterByClass(TaxiClass::Yellow),
            AggregationResult::count(3)
        )
    );
    assert_eq!(
        ask(&ctx, "green taxi").await,
        answer(
            Intent::FilterByClass(TaxiClass::Green),
            AggregationResult::count(3)
        )
    );
    assert_eq!(
        ask(&ctx, "how many taxi rides").await,
        answer(Intent::TotalRides, AggregationResult::count(6))
    );
    assert_eq!(
        ask(&ctx, "which are the busiest locations?").await,
        answer(
            Intent::TopPickupLocations,
            AggregationResult::Ranking {
                entries: vec![(74, 2), (132, 2), (41, 1), (48, 1)]
            }
        )
    );
    assert_eq!(
        ask(&ctx, "peak hours").await,
        answer(
            Intent::PeakHours,
            AggregationResult::GroupedRanking {
                entries: vec![(8, 3), (17, 3)]
            }
        )
    );

    fs::remove_dir_all(&root).unwrap();
}

#[tokio::test]
async fn test_partial_source_failure() {
    let mut store = MemoryStore::new();
    store.insert("/trips/yellow_tripdata_2023-01.csv", YELLOW);
    store.insert("/trips/green_tripdata_2023-01.csv", GREEN);
    store.insert("/trips/fhv_tripdata_2023-01.csv", "pickup_datetime\n2023-01-01 03:00:00\n");
    store.mark_unreachable("/trips/green_tripdata_2023-01.csv");

    let sources = loader::discover(&store, "/trips").await.unwrap();
    let config = LoaderConfig {
        retry_backoff: std::time::Duration::from_millis(1),
        ..LoaderConfig::default()
    };
    let report = loader::load(&store, &sources, &config).await;

    assert_eq!(report.loaded, 2);
    assert_eq!(report.table.len(), 4);
    assert_eq!(report.failures.len(), 1);
    assert!(matches!(
        &report.failures[0],
        LoadError::SourceUnavailable { path, .. } if path.contains("green")
    ));

    let ctx = QueryContext {
        store: &store,
        sources: &sources,
        loader: &config,
    };
    let (_, response) = handle_query(Session::default(), &ctx, "how many taxi rides").await;
    assert_eq!(
        response.reply,
        answer(Intent::TotalRides, AggregationResult::count(4))
    );
    assert_eq!(response.warnings.len(), 1);
}

#[tokio::test]
async fn test_peak_hours_reads_every_pickup_column() {
    let mut store = MemoryStore::new();
    store.insert(
        "/trips/fhvhv_tripdata_2023-01.csv",
        "request_datetime,pickup_datetime\n\
         2023-01-01 07:50:00,2023-01-01 08:00:00\n\
         2023-01-01 08:55:00,2023-01-01 09:00:00\n",
    );
    store.insert(
        "/trips/trips_2023.csv",
        "tpep_pickup_datetime,fare_amount\n2023-01-01 17:00:00,9\n",
    );
    let sources = vec![
        SourceFile::from_path("/trips/fhvhv_tripdata_2023-01.csv", Some("request_datetime"))
            .unwrap(),
        SourceFile::from_path("/trips/trips_2023.csv", None).unwrap(),
    ];
    let config = LoaderConfig::default();
    let ctx = QueryContext {
        store: &store,
        sources: &sources,
        loader: &config,
    };

    assert_eq!(
        ask(&ctx, "peak hours").await,
        answer(
            Intent::PeakHours,
            AggregationResult::GroupedRanking {
                entries: vec![(8, 1), (9, 1), (17, 1)]
            }
        )
    );
}

#[tokio::test]
async fn test_blank_queries_never_load() {
    let mut store = MemoryStore::new();
    store.insert("/trips/yellow_tripdata_2023-01.csv", YELLOW);
    // Any load attempt would surface as a warning.
    store.mark_unreachable("/trips/yellow_tripdata_2023-01.csv");
    let sources = vec![SourceFile::from_path("/trips/yellow_tripdata_2023-01.csv", None).unwrap()];
    let config = LoaderConfig::default();
    let ctx = QueryContext {
        store: &store,
        sources: &sources,
        loader: &config,
    };

    for blank in ["", "   "] {
        let (session, response) = handle_query(Session::default(), &ctx, blank).await;
        assert_eq!(response.reply, Reply::EmptyQuery);
        assert!(response.warnings.is_empty());
        assert!(session.active.is_empty());
    }
}

#[tokio::test]
async fn test_session_round_trip_through_queries() {
    let root = temp_root("taxi_query_it_session");
    let store = LocalStore::new(&root);
    let sources = loader::discover(&store, "trips").await.unwrap();
    let config = LoaderConfig::default();
    let ctx = QueryContext {
        store: &store,
        sources: &sources,
        loader: &config,
    };
    let history = root.join("chat_history.json");

    let session = Session::load(&history).unwrap();
    let (session, _) = handle_query(session, &ctx, "How many taxi rides happened in January 2023?").await;
    let (mut session, _) = handle_query(session, &ctx, "average fare").await;
    session.new_chat();
    session.save(&history).unwrap();

    let restored = Session::load(&history).unwrap();
    assert_eq!(restored.history.len(), 1);
    assert_eq!(restored.history[0].title, "How many taxi rides happened i...");
    assert_eq!(restored.history[0].messages.len(), 4);
    assert_eq!(restored.history[0].messages[1].content, "6 rides");

    fs::remove_dir_all(&root).unwrap();
}
