//! SQLite persistence for harvested feed records.
//!
//! A single `rss_feed` table holds one row per article URL. Records are
//! written once and never updated.

mod records;
mod schema;
mod types;

pub use schema::Database;
pub use types::{
    Column, DatabaseError, FeedRecord, Filter, FilterParseError, StoredRecord, UnknownColumn,
    Value,
};
