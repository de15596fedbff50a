use std::time::Duration;

use ladle_core::output::write_results;
use ladle_core::{
    FailurePolicy, ItemError, Pipeline, PipelineConfig, PipelineError, PipelineState, Recipe,
};
use tokio_util::sync::CancellationToken;

use crate::common::{BodyParser, FakeSite, LineListing, SEED, item_url};

fn pipeline(site: &FakeSite, config: PipelineConfig) -> Pipeline<FakeSite, LineListing, BodyParser> {
    Pipeline::new(site.clone(), LineListing, BodyParser, config).unwrap()
}

#[tokio::test]
async fn one_failing_item_is_recorded_not_fatal() {
    let site = FakeSite::with_recipes(3).failing(1);
    let config = PipelineConfig::default().with_max_workers(2);

    let report = pipeline(&site, config).run(SEED).await.unwrap();

    assert_eq!(report.state, PipelineState::Completed);
    assert_eq!(report.results.len(), 3);
    assert_eq!(report.stats.completed, 2);
    assert_eq!(report.stats.failed, 1);
    assert_eq!(report.stats.dropped, 0);
    assert_eq!(report.stats.requests, 4);
    assert!(report.stats.is_balanced());

    let (failed_item, error) = report.results.failures().next().unwrap();
    assert_eq!(failed_item.url, item_url(1));
    assert!(matches!(error, ItemError::Fetch(msg) if msg.contains("HTTP 500")));
}

#[tokio::test]
async fn small_queue_drops_overflow_and_still_completes() {
    let site = FakeSite::with_recipes(5).with_delay(Duration::from_millis(5));
    let config = PipelineConfig::default()
        .with_max_workers(1)
        .with_queue_capacity(2);

    let report = tokio::time::timeout(Duration::from_secs(10), pipeline(&site, config).run(SEED))
        .await
        .expect("pipeline should not livelock")
        .unwrap();

    assert_eq!(report.state, PipelineState::Completed);
    assert!(report.stats.dropped > 0);
    assert!(report.stats.admitted <= 5);
    assert_eq!(report.stats.admitted + report.stats.dropped, 5);
    assert_eq!(report.results.len() as u64, report.stats.admitted);
    assert!(report.stats.is_balanced());
}

#[tokio::test]
async fn unreachable_seed_fails_without_starting_tasks() {
    let site = FakeSite::unreachable_seed();
    let pipeline = pipeline(&site, PipelineConfig::default());
    let stats = pipeline.stats();
    let state = pipeline.subscribe();

    let err = pipeline.run(SEED).await.unwrap_err();

    assert!(matches!(err, PipelineError::SeedFetch { ref url, .. } if url == SEED));
    assert_eq!(*state.borrow(), PipelineState::Failed);
    let snap = stats.snapshot();
    assert_eq!(snap.requests, 1);
    assert_eq!(snap.tasks_started, 0);
    assert_eq!(snap.completed + snap.failed, 0);
}

#[tokio::test]
async fn parser_panic_is_contained_and_workers_are_released() {
    let site = FakeSite::with_recipes(6).panicking(2).panicking(4);
    let config = PipelineConfig::default().with_max_workers(2);

    let report = pipeline(&site, config).run(SEED).await.unwrap();

    assert_eq!(report.results.len(), 6);
    assert_eq!(report.stats.failures_by_kind["panicked"], 2);
    assert_eq!(report.stats.in_flight, 0);
    assert!(report.stats.workers.values().all(|w| !w.busy));
    assert!(report.stats.is_balanced());
}

#[tokio::test]
async fn cancellation_turns_pending_items_into_failures() {
    let token = CancellationToken::new();
    let site = FakeSite::with_recipes(5).cancelling_at(0, token.clone());
    let config = PipelineConfig::default().with_max_workers(1);

    let report = pipeline(&site, config)
        .with_cancellation(token)
        .run(SEED)
        .await
        .unwrap();

    assert_eq!(report.state, PipelineState::Completed);
    assert_eq!(report.stats.admitted, 5);
    assert_eq!(report.stats.completed, 1);
    assert_eq!(report.stats.failures_by_kind["cancelled"], 4);
    assert!(report.stats.is_balanced());
}

#[tokio::test]
async fn cancelled_before_start_discovers_nothing() {
    let token = CancellationToken::new();
    token.cancel();
    let site = FakeSite::with_recipes(3);

    let report = pipeline(&site, PipelineConfig::default())
        .with_cancellation(token)
        .run(SEED)
        .await
        .unwrap();

    assert_eq!(report.state, PipelineState::Completed);
    assert_eq!(report.stats.discovered, 0);
    assert!(report.results.is_empty());
}

#[tokio::test]
async fn slow_item_times_out() {
    let site = FakeSite::with_recipes(2).with_delay(Duration::from_millis(200));
    let config = PipelineConfig::default()
        .with_max_workers(2)
        .with_item_timeout(Some(Duration::from_millis(20)));

    // The seed fetch is slow too, but only extraction tasks are bounded.
    let report = pipeline(&site, config).run(SEED).await.unwrap();

    assert_eq!(report.stats.failures_by_kind["timeout"], 2);
    assert!(report.stats.is_balanced());
}

#[tokio::test]
async fn finished_run_writes_artifact() {
    let site = FakeSite::with_recipes(3).failing(0);
    let report = pipeline(&site, PipelineConfig::default())
        .run(SEED)
        .await
        .unwrap();
    let dir = tempfile::tempdir().unwrap();

    let excluded = dir.path().join("excluded.json");
    assert_eq!(
        write_results(&excluded, &report.results, FailurePolicy::Exclude).unwrap(),
        2
    );
    let included = dir.path().join("included.json");
    assert_eq!(
        write_results(&included, &report.results, FailurePolicy::IncludeEmpty).unwrap(),
        3
    );

    let recipes: Vec<Recipe> =
        serde_json::from_str(&std::fs::read_to_string(&included).unwrap()).unwrap();
    let empty = recipes.iter().find(|r| r.page == item_url(0)).unwrap();
    assert!(empty.ingredients.is_empty());
    assert!(empty.instructions.is_empty());
}
