//! Feed discovery and loading.
//!
//! - [`directory`] - pulls feed links out of an HTML directory page
//! - [`loader`] - fetches a feed and maps its entries to records
//! - [`parser`] - best-effort RSS/RDF/Atom reader that keeps dates verbatim,
//!   with `feed-rs` handling JSON Feed
//!
//! # Example
//!
//! ```ignore
//! use govfeeds::feed::{load_feed, LinkExtractor};
//!
//! let extractor = LinkExtractor::new("contentLink", "rss.xml", vec![])?;
//! for feed_url in extractor.extract(&client, "https://www.gov.hk/en/about/rss.htm").await? {
//!     let loaded = load_feed(&client, &feed_url).await;
//!     println!("{}: {} records", feed_url, loaded.records.len());
//! }
//! ```

mod directory;
mod loader;
mod parser;

pub use directory::LinkExtractor;
pub use loader::{load_feed, records_from_bytes, LoadedFeed};
pub use parser::{parse_feed, FeedParseError, ParseResult, ParsedEntry};
