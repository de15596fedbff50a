//! Small helpers over `scraper` shared by the page parsers.

use ladle_core::error::AppError;
use scraper::{ElementRef, Selector};

pub(crate) fn compile(selector: &str) -> Result<Selector, AppError> {
    Selector::parse(selector).map_err(|e| AppError::SelectorError {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// Text of every element under `el` matching `selector`, concatenated and
/// trimmed. Empty when nothing matches.
pub(crate) fn child_text(el: ElementRef<'_>, selector: &Selector) -> String {
    el.select(selector)
        .flat_map(|child| child.text())
        .collect::<String>()
        .trim()
        .to_string()
}

/// `attr` of the first element under `el` matching `selector`.
pub(crate) fn child_attr(el: ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    el.select(selector)
        .find_map(|child| child.value().attr(attr))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
