use super::ollama::{LanguageModel, ModelError};
use super::splitter::TextSplitter;
use crate::content::MAIN_CONTENT_NOT_FOUND;
use crate::storage::FeedRecord;
use serde::Deserialize;
use std::time::Instant;

/// How long documents are reduced to a single summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryMethod {
    /// Whole text in one prompt.
    Stuff,
    /// Summarize each chunk, then merge the partial summaries.
    #[default]
    MapReduce,
    /// Summarize the first chunk, then fold in each following chunk.
    Refine,
}

fn bullet_prompt(text: &str) -> String {
    format!(
        "Please summarize the following text as a list of key bullet points. \
         Each bullet point should capture an important idea or fact:\n\n{text}"
    )
}

fn combine_prompt(partials: &str) -> String {
    format!(
        "The following bullet-point lists summarize consecutive parts of one document. \
         Merge them into a single list of key bullet points without repetition:\n\n{partials}"
    )
}

fn refine_prompt(summary: &str, text: &str) -> String {
    format!(
        "Here is a bullet-point summary of the beginning of a document:\n\n{summary}\n\n\
         Refine it using the next part of the document below, adding or updating bullet \
         points where needed. Reply with the bullet list only:\n\n{text}"
    )
}

pub struct Summarizer<M> {
    model: M,
    splitter: TextSplitter,
    method: SummaryMethod,
}

impl<M: LanguageModel> Summarizer<M> {
    pub fn new(model: M, splitter: TextSplitter, method: SummaryMethod) -> Self {
        Self {
            model,
            splitter,
            method,
        }
    }

    /// Produces a bullet-point summary of `text`.
    ///
    /// Returns `Ok(None)` without calling the model when the text is blank or
    /// is the scraper's "main content not found" sentinel.
    pub async fn summarize(&self, text: &str) -> Result<Option<String>, ModelError> {
        if text == MAIN_CONTENT_NOT_FOUND || text.trim().is_empty() {
            return Ok(None);
        }

        let started = Instant::now();
        let summary = match self.method {
            SummaryMethod::Stuff => self.model.generate(&bullet_prompt(text.trim())).await?,
            SummaryMethod::MapReduce => {
                let chunks = self.splitter.split(text);
                tracing::debug!(chunks = chunks.len(), "map-reduce summary");
                match chunks.as_slice() {
                    [] => return Ok(None),
                    [only] => self.model.generate(&bullet_prompt(only)).await?,
                    _ => {
                        let mut partials = Vec::with_capacity(chunks.len());
                        for chunk in &chunks {
                            partials.push(self.model.generate(&bullet_prompt(chunk)).await?);
                        }
                        self.model
                            .generate(&combine_prompt(&partials.join("\n\n")))
                            .await?
                    }
                }
            }
            SummaryMethod::Refine => {
                let mut chunks = self.splitter.split(text).into_iter();
                let Some(first) = chunks.next() else {
                    return Ok(None);
                };
                let mut summary = self.model.generate(&bullet_prompt(&first)).await?;
                for chunk in chunks {
                    summary = self.model.generate(&refine_prompt(&summary, &chunk)).await?;
                }
                summary
            }
        };

        tracing::debug!(
            method = ?self.method,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "summary generated"
        );
        Ok(Some(summary))
    }

    /// Fills `record.ai_summary` from `record.content`. Returns whether a
    /// summary was written; records without usable content are left untouched.
    pub async fn summarize_record(&self, record: &mut FeedRecord) -> Result<bool, ModelError> {
        let Some(content) = record.content.as_deref() else {
            return Ok(false);
        };
        match self.summarize(content).await? {
            Some(summary) => {
                record.ai_summary = Some(summary);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
