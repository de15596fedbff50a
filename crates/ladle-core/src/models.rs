use serde::{Deserialize, Serialize};

use crate::error::ItemError;

/// One unit of discovered work: where the recipe lives plus what the
/// listing page already told us about it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    /// Absolute location of the recipe page.
    pub url: String,
    pub title: String,
    /// Thumbnail reference captured from the listing card, if any.
    pub image: Option<String>,
}

impl WorkItem {
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    pub quantity: String,
    pub unit: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    /// 1-based step position.
    pub number: String,
    pub description: String,
}

/// Structured content extracted from one recipe page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    /// Source location of the recipe.
    pub page: String,
    /// Thumbnail reference, empty when the listing card had none.
    pub image: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<Instruction>,
}

impl Recipe {
    /// A recipe carrying only the discovery-time metadata of `item`.
    pub fn from_item(item: &WorkItem) -> Self {
        Self {
            name: item.title.clone(),
            page: item.url.clone(),
            image: item.image.clone().unwrap_or_default(),
            ingredients: Vec::new(),
            instructions: Vec::new(),
        }
    }
}

/// Outcome of processing one `WorkItem`.
///
/// The payload exists only on success and the error only on failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExtractionResult {
    Success { item: WorkItem, recipe: Recipe },
    Failed { item: WorkItem, error: ItemError },
}

impl ExtractionResult {
    pub fn success(item: WorkItem, recipe: Recipe) -> Self {
        ExtractionResult::Success { item, recipe }
    }

    pub fn failed(item: WorkItem, error: ItemError) -> Self {
        ExtractionResult::Failed { item, error }
    }

    pub fn item(&self) -> &WorkItem {
        match self {
            ExtractionResult::Success { item, .. } | ExtractionResult::Failed { item, .. } => item,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExtractionResult::Success { .. })
    }

    pub fn recipe(&self) -> Option<&Recipe> {
        match self {
            ExtractionResult::Success { recipe, .. } => Some(recipe),
            ExtractionResult::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ItemError> {
        match self {
            ExtractionResult::Success { .. } => None,
            ExtractionResult::Failed { error, .. } => Some(error),
        }
    }
}

/// Append-only collection of results in completion order.
///
/// Only the aggregator holds a mutable `ResultSet`; callers receive the
/// finished set once the pipeline has drained.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResultSet {
    results: Vec<ExtractionResult>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, result: ExtractionResult) {
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExtractionResult> {
        self.results.iter()
    }

    pub fn successes(&self) -> impl Iterator<Item = &Recipe> {
        self.results.iter().filter_map(ExtractionResult::recipe)
    }

    pub fn failures(&self) -> impl Iterator<Item = (&WorkItem, &ItemError)> {
        self.results.iter().filter_map(|r| match r {
            ExtractionResult::Failed { item, error } => Some((item, error)),
            ExtractionResult::Success { .. } => None,
        })
    }

    pub fn into_vec(self) -> Vec<ExtractionResult> {
        self.results
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a ExtractionResult;
    type IntoIter = std::slice::Iter<'a, ExtractionResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}
