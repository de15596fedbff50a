//! Serialization of a finished result set into the JSON artifact.

use std::borrow::Cow;
use std::path::Path;

use crate::config::FailurePolicy;
use crate::error::PipelineError;
use crate::models::{ExtractionResult, Recipe, ResultSet};

/// Recipes to write, in result order, with failed items handled by `policy`.
pub fn artifact_records(results: &ResultSet, policy: FailurePolicy) -> Vec<Cow<'_, Recipe>> {
    results
        .iter()
        .filter_map(|result| match result {
            ExtractionResult::Success { recipe, .. } => Some(Cow::Borrowed(recipe)),
            ExtractionResult::Failed { item, .. } => match policy {
                FailurePolicy::Exclude => None,
                FailurePolicy::IncludeEmpty => Some(Cow::Owned(Recipe::from_item(item))),
            },
        })
        .collect()
}

/// Render the artifact as a pretty-printed JSON array.
pub fn render(results: &ResultSet, policy: FailurePolicy) -> Result<String, PipelineError> {
    let records = artifact_records(results, policy);
    Ok(serde_json::to_string_pretty(&records)?)
}

/// Write the artifact to `path`, returning the number of records written.
///
/// The result set is only borrowed, so it stays usable when this fails.
pub fn write_results(
    path: &Path,
    results: &ResultSet,
    policy: FailurePolicy,
) -> Result<usize, PipelineError> {
    let records = artifact_records(results, policy);
    let json = serde_json::to_string_pretty(&records)?;
    std::fs::write(path, json).map_err(|source| PipelineError::Output {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), records = records.len(), "Wrote results");
    Ok(records.len())
}
