use std::sync::Arc;

use ladle_core::error::AppError;
use ladle_core::models::WorkItem;
use ladle_core::traits::ListingParser;
use scraper::{Html, Selector};
use url::Url;

use crate::selectors::{child_attr, child_text, compile};

pub const CARD_SELECTOR: &str = "div.mntl-taxonomysc-article-list-group .mntl-card";
pub const TITLE_SELECTOR: &str = "span.card__title-text";
pub const IMAGE_SELECTOR: &str = "img";
pub const IMAGE_ATTR: &str = "data-src";

struct Selectors {
    card: Selector,
    title: Selector,
    image: Selector,
}

/// Selects recipe cards from a category listing page.
///
/// Each card yields a [`WorkItem`] with the card's link resolved against the
/// seed URL, the card title and the lazy-loaded thumbnail. Cards without a
/// link or a title are skipped.
#[derive(Clone)]
pub struct RecipeListingParser {
    selectors: Arc<Selectors>,
}

impl RecipeListingParser {
    pub fn new() -> Result<Self, AppError> {
        Ok(Self {
            selectors: Arc::new(Selectors {
                card: compile(CARD_SELECTOR)?,
                title: compile(TITLE_SELECTOR)?,
                image: compile(IMAGE_SELECTOR)?,
            }),
        })
    }
}

impl ListingParser for RecipeListingParser {
    fn parse_listing(&self, seed_url: &str, html: &str) -> Result<Vec<WorkItem>, AppError> {
        let base = Url::parse(seed_url)
            .map_err(|e| AppError::ParseError(format!("Invalid seed URL {seed_url}: {e}")))?;
        let document = Html::parse_document(html);
        let s = &self.selectors;

        let mut items = Vec::new();
        for card in document.select(&s.card) {
            let Some(href) = card.value().attr("href").map(str::trim).filter(|h| !h.is_empty())
            else {
                continue;
            };
            let url = match base.join(href) {
                Ok(url) => url,
                Err(e) => {
                    tracing::debug!(%href, error = %e, "Skipping card with unusable link");
                    continue;
                }
            };
            let title = child_text(card, &s.title);
            if title.is_empty() {
                continue;
            }

            let mut item = WorkItem::new(url.as_str(), title);
            if let Some(image) = child_attr(card, &s.image, IMAGE_ATTR) {
                item = item.with_image(image);
            }
            items.push(item);
        }

        if items.is_empty() {
            tracing::warn!(%seed_url, "No recipe cards found on listing page");
        }
        Ok(items)
    }
}
