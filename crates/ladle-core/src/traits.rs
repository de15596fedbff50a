use std::future::Future;

use crate::error::AppError;
use crate::models::{Recipe, WorkItem};

/// Fetches raw HTML content from a URL.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Selects the work units listed on a seed page.
///
/// Implementations resolve relative locations against `seed_url` and skip
/// units without a location or a title.
pub trait ListingParser: Send + Sync + Clone {
    fn parse_listing(&self, seed_url: &str, html: &str) -> Result<Vec<WorkItem>, AppError>;
}

/// Turns the HTML of one discovered page into a structured recipe.
pub trait ItemParser: Send + Sync + Clone {
    fn parse_item(&self, item: &WorkItem, html: &str) -> Result<Recipe, AppError>;
}
