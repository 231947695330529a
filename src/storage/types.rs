use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds a lock on the database file
    #[error("Database is locked by another govfeeds process. Wait for it to finish and try again.")]
    Locked,

    /// Schema creation failed
    #[error("Database schema creation failed: {0}")]
    Schema(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        let error_string = err.to_string().to_lowercase();

        // SQLITE_BUSY (5): database is locked
        // SQLITE_LOCKED (6): database table is locked
        if error_string.contains("database is locked")
            || error_string.contains("database table is locked")
            || error_string.contains("sqlite_busy")
            || error_string.contains("sqlite_locked")
        {
            return DatabaseError::Locked;
        }

        DatabaseError::Other(err)
    }
}

// ============================================================================
// Data Structures
// ============================================================================

/// One article harvested from a feed.
///
/// Created by the feed loader, enriched in place with scraped `content` and
/// an optional `ai_summary`, then written once. `feed_url` is the identity
/// key: a record whose URL is already stored is discarded whole.
///
/// Serialized field names match the SQL column names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct FeedRecord {
    /// Title of the feed the entry came from
    #[serde(rename = "Category")]
    #[sqlx(rename = "Category")]
    pub category: String,
    #[serde(rename = "Title")]
    #[sqlx(rename = "Title")]
    pub title: String,
    /// Publication date exactly as the feed wrote it
    #[serde(rename = "Publish_Date")]
    #[sqlx(rename = "Publish_Date")]
    pub publish_date: String,
    /// Article link; unique across the store
    #[serde(rename = "Feed_URL")]
    #[sqlx(rename = "Feed_URL")]
    pub feed_url: String,
    /// Short summary supplied by the feed itself
    #[serde(rename = "Summary")]
    #[sqlx(rename = "Summary")]
    pub summary: Option<String>,
    /// Scraped body text, or [`crate::content::MAIN_CONTENT_NOT_FOUND`]
    #[serde(rename = "Content")]
    #[sqlx(rename = "Content")]
    pub content: Option<String>,
    #[serde(rename = "AI_Summary")]
    #[sqlx(rename = "AI_Summary")]
    pub ai_summary: Option<String>,
}

/// A record as read back from the store, with its row id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct StoredRecord {
    pub id: i64,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub record: FeedRecord,
}

// ============================================================================
// Column Projection
// ============================================================================

/// Columns of the `rss_feed` table.
///
/// Each variant maps to its SQL name and to an accessor on [`StoredRecord`],
/// so projections and filters never interpolate caller-supplied identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Id,
    Category,
    Title,
    PublishDate,
    FeedUrl,
    Summary,
    Content,
    AiSummary,
}

impl Column {
    pub const ALL: [Column; 8] = [
        Column::Id,
        Column::Category,
        Column::Title,
        Column::PublishDate,
        Column::FeedUrl,
        Column::Summary,
        Column::Content,
        Column::AiSummary,
    ];

    /// Column name as it appears in the schema.
    pub const fn sql_name(self) -> &'static str {
        match self {
            Column::Id => "id",
            Column::Category => "Category",
            Column::Title => "Title",
            Column::PublishDate => "Publish_Date",
            Column::FeedUrl => "Feed_URL",
            Column::Summary => "Summary",
            Column::Content => "Content",
            Column::AiSummary => "AI_Summary",
        }
    }

    /// Reads this column's value out of a stored row.
    pub fn value_of(self, row: &StoredRecord) -> Value {
        let r = &row.record;
        match self {
            Column::Id => Value::Integer(row.id),
            Column::Category => Value::Text(r.category.clone()),
            Column::Title => Value::Text(r.title.clone()),
            Column::PublishDate => Value::Text(r.publish_date.clone()),
            Column::FeedUrl => Value::Text(r.feed_url.clone()),
            Column::Summary => Value::from(r.summary.clone()),
            Column::Content => Value::from(r.content.clone()),
            Column::AiSummary => Value::from(r.ai_summary.clone()),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sql_name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown column '{0}' (expected one of: id, Category, Title, Publish_Date, Feed_URL, Summary, Content, AI_Summary)")]
pub struct UnknownColumn(pub String);

impl FromStr for Column {
    type Err = UnknownColumn;

    /// Accepts the SQL name or its snake_case form, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Column::ALL
            .into_iter()
            .find(|c| {
                let sql = c.sql_name();
                sql.eq_ignore_ascii_case(wanted) || sql.replace('_', "").eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| UnknownColumn(s.to_string()))
    }
}

/// A single projected cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Integer(i64),
    Text(String),
    Null,
}

impl From<Option<String>> for Value {
    fn from(value: Option<String>) -> Self {
        value.map(Value::Text).unwrap_or(Value::Null)
    }
}

/// Exact-match equality filter on one column. A `Null` value matches SQL NULL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub column: Column,
    pub value: Value,
}

impl Filter {
    pub fn new(column: Column, value: Value) -> Self {
        Self { column, value }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterParseError {
    #[error("Filter '{0}' must have the form COLUMN=VALUE")]
    MissingEquals(String),
    #[error(transparent)]
    Column(#[from] UnknownColumn),
    #[error("Column id expects an integer, got '{0}'")]
    NotAnInteger(String),
}

impl FromStr for Filter {
    type Err = FilterParseError;

    /// Parses `COLUMN=VALUE`. The id column takes an integer; other columns
    /// take the remainder of the string verbatim.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, raw) = s
            .split_once('=')
            .ok_or_else(|| FilterParseError::MissingEquals(s.to_string()))?;
        let column: Column = name.parse()?;
        let value = match column {
            Column::Id => Value::Integer(
                raw.trim()
                    .parse()
                    .map_err(|_| FilterParseError::NotAnInteger(raw.to_string()))?,
            ),
            _ => Value::Text(raw.to_string()),
        };
        Ok(Filter { column, value })
    }
}
