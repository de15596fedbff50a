use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ladle_core::{
    AppError, Fetcher, Ingredient, Instruction, ItemParser, ListingParser, Recipe, WorkItem,
};
use tokio_util::sync::CancellationToken;

pub const SEED: &str = "https://recipes.test/soup";

pub fn item_url(i: usize) -> String {
    format!("https://recipes.test/recipe/{i}")
}

#[derive(Default)]
struct Load {
    active: usize,
    peak: usize,
}

/// In-memory site: serves the seed listing and one page per recipe.
///
/// The listing "HTML" is one recipe URL per line, which `LineListing`
/// turns back into work items.
#[derive(Clone, Default)]
pub struct FakeSite {
    pages: Arc<Mutex<HashMap<String, Result<String, AppError>>>>,
    cancel_on: Arc<Mutex<Option<(String, CancellationToken)>>>,
    load: Arc<Mutex<Load>>,
    delay: Duration,
}

impl FakeSite {
    /// A site listing `n` recipes, all of which load.
    pub fn with_recipes(n: usize) -> Self {
        let site = Self::default();
        let listing = (0..n).map(item_url).collect::<Vec<_>>().join("\n");
        site.page(SEED, Ok(listing));
        for i in 0..n {
            site.page(&item_url(i), Ok(format!("Recipe {i}")));
        }
        site
    }

    pub fn unreachable_seed() -> Self {
        let site = Self::default();
        site.page(SEED, Err(AppError::NetworkError("connection refused".into())));
        site
    }

    pub fn failing(self, i: usize) -> Self {
        self.page(&item_url(i), Err(AppError::HttpError("HTTP 500".into())));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Cancel `token` as soon as recipe `i` is requested.
    pub fn cancelling_at(self, i: usize, token: CancellationToken) -> Self {
        *self.cancel_on.lock().unwrap() = Some((item_url(i), token));
        self
    }

    pub fn peak_load(&self) -> usize {
        self.load.lock().unwrap().peak
    }

    fn page(&self, url: &str, body: Result<String, AppError>) {
        self.pages.lock().unwrap().insert(url.to_string(), body);
    }
}

impl Fetcher for FakeSite {
    async fn fetch(&self, url: &str) -> Result<String, AppError> {
        if let Some((trigger, token)) = self.cancel_on.lock().unwrap().as_ref() {
            if trigger == url {
                token.cancel();
            }
        }
        {
            let mut load = self.load.lock().unwrap();
            load.active += 1;
            load.peak = load.peak.max(load.active);
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let body = self
            .pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err(AppError::HttpError(format!("HTTP 404 for {url}"))));
        self.load.lock().unwrap().active -= 1;
        body
    }
}

#[derive(Clone)]
pub struct LineListing;

impl ListingParser for LineListing {
    fn parse_listing(&self, _seed_url: &str, html: &str) -> Result<Vec<WorkItem>, AppError> {
        Ok(html
            .lines()
            .filter(|l| !l.is_empty())
            .enumerate()
            .map(|(i, url)| WorkItem::new(url, format!("Recipe {i}")))
            .collect())
    }
}

/// Parses the page body as the recipe name, with a single fixed step.
#[derive(Clone)]
pub struct BodyParser;

impl ItemParser for BodyParser {
    fn parse_item(&self, item: &WorkItem, html: &str) -> Result<Recipe, AppError> {
        if html == "PANIC" {
            panic!("cannot parse {}", item.url);
        }
        Ok(Recipe {
            name: html.to_string(),
            page: item.url.clone(),
            image: String::new(),
            ingredients: vec![Ingredient {
                quantity: "1".into(),
                unit: "pot".into(),
            }],
            instructions: vec![Instruction {
                number: "1".into(),
                description: "Cook.".into(),
            }],
        })
    }
}

impl FakeSite {
    /// Make the parser panic on recipe `i`.
    pub fn panicking(self, i: usize) -> Self {
        self.page(&item_url(i), Ok("PANIC".into()));
        self
    }
}
