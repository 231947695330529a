//! Government RSS harvester.
//!
//! Walks RSS directory pages, loads every linked feed, scrapes the article
//! behind each entry, optionally summarizes it with a local Ollama model, and
//! keeps one row per article URL in SQLite.

pub mod config;
pub mod content;
pub mod feed;
pub mod pipeline;
pub mod storage;
pub mod summarize;
pub mod util;
