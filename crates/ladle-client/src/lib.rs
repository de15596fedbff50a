pub mod detail;
pub mod fetcher;
pub mod listing;
mod selectors;

pub use detail::RecipeDetailParser;
pub use fetcher::ReqwestFetcher;
pub use listing::RecipeListingParser;
