use std::sync::Arc;

use ladle_core::error::AppError;
use ladle_core::models::{Ingredient, Instruction, Recipe, WorkItem};
use ladle_core::traits::ItemParser;
use scraper::{Html, Selector};

use crate::selectors::{child_text, compile};

pub const INGREDIENT_SELECTOR: &str =
    "div.mntl-structured-ingredients li.mntl-structured-ingredients__list-item";
pub const QUANTITY_SELECTOR: &str = "span[data-ingredient-quantity=true]";
pub const UNIT_SELECTOR: &str = "span[data-ingredient-unit=true]";
pub const STEPS_SELECTOR: &str = "div.recipe__steps";
pub const STEP_SELECTOR: &str = "li";
pub const STEP_TEXT_SELECTOR: &str = "p.mntl-sc-block";

struct Selectors {
    ingredient: Selector,
    quantity: Selector,
    unit: Selector,
    steps: Selector,
    step: Selector,
    step_text: Selector,
}

/// Extracts ingredients and numbered steps from a recipe page.
///
/// Name, page and image come from the work item found on the listing.
#[derive(Clone)]
pub struct RecipeDetailParser {
    selectors: Arc<Selectors>,
    require_content: bool,
}

impl RecipeDetailParser {
    pub fn new() -> Result<Self, AppError> {
        Ok(Self {
            selectors: Arc::new(Selectors {
                ingredient: compile(INGREDIENT_SELECTOR)?,
                quantity: compile(QUANTITY_SELECTOR)?,
                unit: compile(UNIT_SELECTOR)?,
                steps: compile(STEPS_SELECTOR)?,
                step: compile(STEP_SELECTOR)?,
                step_text: compile(STEP_TEXT_SELECTOR)?,
            }),
            require_content: false,
        })
    }

    /// Treat a page with neither ingredients nor steps as a parse failure.
    pub fn require_content(mut self, require: bool) -> Self {
        self.require_content = require;
        self
    }
}

impl ItemParser for RecipeDetailParser {
    fn parse_item(&self, item: &WorkItem, html: &str) -> Result<Recipe, AppError> {
        let document = Html::parse_document(html);
        let s = &self.selectors;

        let ingredients: Vec<Ingredient> = document
            .select(&s.ingredient)
            .map(|li| Ingredient {
                quantity: child_text(li, &s.quantity),
                unit: child_text(li, &s.unit),
            })
            .collect();

        // Numbering restarts for each steps block; the last block wins.
        let instructions: Vec<Instruction> = document
            .select(&s.steps)
            .last()
            .map(|steps| {
                steps
                    .select(&s.step)
                    .enumerate()
                    .map(|(i, li)| Instruction {
                        number: (i + 1).to_string(),
                        description: child_text(li, &s.step_text),
                    })
                    .collect()
            })
            .unwrap_or_default();

        if self.require_content && ingredients.is_empty() && instructions.is_empty() {
            return Err(AppError::ParseError(format!(
                "No ingredients or steps found at {}",
                item.url
            )));
        }

        let mut recipe = Recipe::from_item(item);
        recipe.ingredients = ingredients;
        recipe.instructions = instructions;
        Ok(recipe)
    }
}
