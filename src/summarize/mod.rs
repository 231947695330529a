//! Optional AI summaries of scraped article text.
//!
//! Long texts are cut by [`TextSplitter`] and reduced to a bullet-point
//! summary through a [`LanguageModel`], normally a local Ollama server.

mod ollama;
mod splitter;
mod summarizer;

pub use ollama::{LanguageModel, ModelError, OllamaClient};
pub use splitter::{SplitterError, TextSplitter};
pub use summarizer::{SummaryMethod, Summarizer};
