use scraper::Selector;
use thiserror::Error;

/// A CSS selector from configuration failed to compile.
#[derive(Debug, Error)]
#[error("Invalid CSS selector '{selector}': {message}")]
pub struct SelectorError {
    pub selector: String,
    pub message: String,
}

/// Compiles a CSS selector, keeping the offending text in the error.
pub fn compile_selector(css: &str) -> Result<Selector, SelectorError> {
    Selector::parse(css).map_err(|e| SelectorError {
        selector: css.to_string(),
        message: e.to_string(),
    })
}
