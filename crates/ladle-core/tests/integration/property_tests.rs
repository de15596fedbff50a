use std::time::Duration;

use ladle_core::{Pipeline, PipelineConfig, PipelineState};
use proptest::prelude::*;

use crate::common::{BodyParser, FakeSite, LineListing, SEED};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn concurrency_stays_within_worker_limit(
        workers in 1usize..6,
        items in 0usize..30,
        capacity in 1usize..40,
        failing in proptest::option::of(0usize..30),
    ) {
        let mut site = FakeSite::with_recipes(items).with_delay(Duration::from_millis(1));
        if let Some(i) = failing.filter(|i| *i < items) {
            site = site.failing(i);
        }
        let config = PipelineConfig::default()
            .with_max_workers(workers)
            .with_queue_capacity(capacity);
        let pipeline = Pipeline::new(site.clone(), LineListing, BodyParser, config).unwrap();

        let report = runtime().block_on(pipeline.run(SEED)).unwrap();

        // The seed fetch runs alone, so the bound holds for it as well.
        prop_assert!(site.peak_load() <= workers);
        prop_assert!(report.stats.peak_in_flight <= workers as u64);
        prop_assert_eq!(report.state, PipelineState::Completed);
        prop_assert_eq!(report.stats.discovered, items as u64);
        prop_assert_eq!(report.stats.admitted + report.stats.dropped, items as u64);
        prop_assert_eq!(report.stats.completed + report.stats.failed, report.stats.admitted);
        prop_assert_eq!(report.results.len() as u64, report.stats.admitted);
        prop_assert_eq!(report.stats.in_flight, 0);
    }
}
