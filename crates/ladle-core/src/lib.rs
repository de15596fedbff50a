pub mod aggregate;
pub mod config;
pub mod discover;
pub mod dispatch;
pub mod error;
pub mod models;
pub mod output;
pub mod permit;
pub mod pipeline;
pub mod queue;
pub mod stats;
pub mod task;
pub mod throttle;
pub mod traits;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{FailurePolicy, PipelineConfig};
pub use error::{AppError, ItemError, PipelineError};
pub use models::{ExtractionResult, Ingredient, Instruction, Recipe, ResultSet, WorkItem};
pub use pipeline::{
    Pipeline, PipelineEvent, PipelineReport, PipelineReporter, PipelineState,
    TracingPipelineReporter,
};
pub use queue::PushOutcome;
pub use stats::{StatsRegistry, StatsSnapshot};
pub use traits::{Fetcher, ItemParser, ListingParser};
