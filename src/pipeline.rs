//! Harvest orchestration.
//!
//! One run walks every directory page, loads each linked feed, scrapes the
//! article behind every entry, optionally summarizes it, and stores the
//! records. Everything is awaited in order; there is no fan-out and no retry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::MissedTickBehavior;

use crate::content::{ContentScraper, MAIN_CONTENT_NOT_FOUND};
use crate::feed::{load_feed, LinkExtractor};
use crate::storage::{Database, DatabaseError, FeedRecord};
use crate::summarize::{LanguageModel, ModelError, OllamaClient, Summarizer};
use crate::util::FetchError;

/// When collected records are written to the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum InsertMode {
    /// After each feed has been enriched; a failure loses only that feed.
    #[default]
    PerFeed,
    /// Once, after the last feed.
    EndOfRun,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },
    #[error("summarization failed: {0}")]
    Model(#[from] ModelError),
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Counters for one harvest run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub directories_visited: usize,
    pub feed_links_found: usize,
    pub feeds_failed: usize,
    /// Entries dropped because they had no link.
    pub entries_skipped: usize,
    pub records_collected: usize,
    pub records_inserted: usize,
    pub pages_without_content: usize,
    pub summaries_produced: usize,
}

pub struct Pipeline<M = OllamaClient> {
    db: Database,
    client: reqwest::Client,
    directories: Vec<String>,
    links: LinkExtractor,
    scraper: ContentScraper,
    summarizer: Option<Summarizer<M>>,
    insert_mode: InsertMode,
}

impl<M: LanguageModel> Pipeline<M> {
    pub fn new(
        db: Database,
        client: reqwest::Client,
        directories: Vec<String>,
        links: LinkExtractor,
        scraper: ContentScraper,
    ) -> Self {
        Self {
            db,
            client,
            directories,
            links,
            scraper,
            summarizer: None,
            insert_mode: InsertMode::default(),
        }
    }

    pub fn with_summarizer(mut self, summarizer: Summarizer<M>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn with_insert_mode(mut self, mode: InsertMode) -> Self {
        self.insert_mode = mode;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn into_database(self) -> Database {
        self.db
    }

    /// Runs one full harvest.
    ///
    /// Feeds that cannot be loaded are counted and skipped. Any other fetch,
    /// model or database failure ends the run; records already inserted in
    /// `per-feed` mode stay stored.
    pub async fn run_once(&self) -> Result<RunReport, PipelineError> {
        let mut report = RunReport {
            started_at: Utc::now(),
            ..RunReport::default()
        };
        let mut collected: Vec<FeedRecord> = Vec::new();

        for directory in &self.directories {
            let feed_urls = self
                .links
                .extract(&self.client, directory)
                .await
                .map_err(|source| PipelineError::Fetch {
                    url: directory.clone(),
                    source,
                })?;
            report.directories_visited += 1;
            report.feed_links_found += feed_urls.len();

            for feed_url in &feed_urls {
                let loaded = load_feed(&self.client, feed_url).await;
                report.entries_skipped += loaded.skipped_entries;
                if loaded.failed() {
                    report.feeds_failed += 1;
                    continue;
                }

                let mut records = loaded.records;
                for record in &mut records {
                    self.enrich(record, &mut report).await?;
                }
                report.records_collected += records.len();

                match self.insert_mode {
                    InsertMode::PerFeed => {
                        let inserted = self.db.insert_records(&records).await?;
                        tracing::debug!(feed = %feed_url, inserted, "Stored feed records");
                        report.records_inserted += inserted;
                    }
                    InsertMode::EndOfRun => collected.extend(records),
                }
            }
        }

        if self.insert_mode == InsertMode::EndOfRun {
            report.records_inserted += self.db.insert_records(&collected).await?;
        }

        report.finished_at = Utc::now();
        tracing::info!(
            directories = report.directories_visited,
            feeds = report.feed_links_found,
            feeds_failed = report.feeds_failed,
            collected = report.records_collected,
            inserted = report.records_inserted,
            no_content = report.pages_without_content,
            summaries = report.summaries_produced,
            elapsed_ms = (report.finished_at - report.started_at).num_milliseconds(),
            "Harvest run complete"
        );
        Ok(report)
    }

    /// Fills in scraped content and, when enabled, the AI summary.
    async fn enrich(
        &self,
        record: &mut FeedRecord,
        report: &mut RunReport,
    ) -> Result<(), PipelineError> {
        let content = self
            .scraper
            .scrape(&self.client, &record.feed_url)
            .await
            .map_err(|source| PipelineError::Fetch {
                url: record.feed_url.clone(),
                source,
            })?;
        if content == MAIN_CONTENT_NOT_FOUND {
            tracing::debug!(url = %record.feed_url, "Main content not found");
            report.pages_without_content += 1;
        }
        record.content = Some(content);

        if let Some(summarizer) = &self.summarizer {
            if summarizer.summarize_record(record).await? {
                report.summaries_produced += 1;
            }
        }
        Ok(())
    }

    /// Runs a harvest every `period` until Ctrl-C.
    pub async fn run_every(&self, period: Duration) -> u64 {
        self.run_every_until(period, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Runs a harvest every `period` until `shutdown` resolves, returning the
    /// number of cycles started.
    ///
    /// Cycles never overlap: a slow cycle delays the next tick instead of
    /// queueing extra ones. A failed cycle is logged and the schedule goes on.
    pub async fn run_every_until(&self, period: Duration, shutdown: impl Future<Output = ()>) -> u64 {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        let mut cycles = 0u64;
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {}
            }
            cycles += 1;
            tracing::info!(cycle = cycles, "Starting harvest cycle");

            tokio::select! {
                _ = &mut shutdown => break,
                result = self.run_once() => match result {
                    Ok(report) => tracing::debug!(cycle = cycles, inserted = report.records_inserted, "Cycle finished"),
                    Err(e) => tracing::error!(cycle = cycles, error = %e, "Harvest cycle failed"),
                },
            }
        }

        tracing::info!(cycles, "Scheduler stopped");
        cycles
    }
}
