use sqlx::{QueryBuilder, Sqlite};

use super::schema::Database;
use super::types::{Column, DatabaseError, FeedRecord, Filter, StoredRecord, Value};

/// Rows per multi-value INSERT (7 binds each keeps us far below SQLite's 999 limit).
const BATCH_SIZE: usize = 50;

const SELECT_ALL: &str = "SELECT id, Category, Title, Publish_Date, Feed_URL, Summary, Content, AI_Summary FROM rss_feed";

impl Database {
    // ========================================================================
    // Record Mutations
    // ========================================================================

    /// Insert records whose `feed_url` is not yet stored; returns how many were written.
    ///
    /// An incoming record whose URL already exists (in the table or earlier in
    /// the same slice) is discarded whole: stored rows are never updated.
    /// All batches run in one transaction committed at the end of the call.
    pub async fn insert_records(&self, records: &[FeedRecord]) -> Result<usize, DatabaseError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await.map_err(DatabaseError::from_sqlx)?;
        let mut inserted: usize = 0;

        for chunk in records.chunks(BATCH_SIZE) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                "INSERT INTO rss_feed (Category, Title, Publish_Date, Feed_URL, Summary, Content, AI_Summary) ",
            );
            builder.push_values(chunk, |mut b, record| {
                b.push_bind(&record.category)
                    .push_bind(&record.title)
                    .push_bind(&record.publish_date)
                    .push_bind(&record.feed_url)
                    .push_bind(&record.summary)
                    .push_bind(&record.content)
                    .push_bind(&record.ai_summary);
            });
            builder.push(" ON CONFLICT(Feed_URL) DO NOTHING");

            let result = builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(DatabaseError::from_sqlx)?;
            inserted += result.rows_affected() as usize;
        }

        tx.commit().await.map_err(DatabaseError::from_sqlx)?;

        let discarded = records.len() - inserted;
        if discarded > 0 {
            tracing::debug!(inserted, discarded, "Skipped records with already-stored URLs");
        }
        Ok(inserted)
    }

    // ========================================================================
    // Record Queries
    // ========================================================================

    /// Every stored record, oldest first.
    pub async fn query_all(&self) -> Result<Vec<StoredRecord>, DatabaseError> {
        let rows = sqlx::query_as::<_, StoredRecord>(&format!("{SELECT_ALL} ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        Ok(rows)
    }

    /// Project `columns` from every row matching all `filters`, oldest first.
    ///
    /// An empty `columns` slice projects every column. Filters are exact-match
    /// equality; a [`Value::Null`] filter matches NULL.
    pub async fn query_columns(
        &self,
        columns: &[Column],
        filters: &[Filter],
    ) -> Result<Vec<Vec<Value>>, DatabaseError> {
        let columns: &[Column] = if columns.is_empty() {
            &Column::ALL
        } else {
            columns
        };

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_ALL);
        for (i, filter) in filters.iter().enumerate() {
            builder.push(if i == 0 { " WHERE " } else { " AND " });
            builder.push(filter.column.sql_name());
            match &filter.value {
                Value::Null => {
                    builder.push(" IS NULL");
                }
                Value::Integer(n) => {
                    builder.push(" = ").push_bind(*n);
                }
                Value::Text(s) => {
                    builder.push(" = ").push_bind(s.clone());
                }
            }
        }
        builder.push(" ORDER BY id");

        let rows: Vec<StoredRecord> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;

        Ok(rows
            .iter()
            .map(|row| columns.iter().map(|c| c.value_of(row)).collect())
            .collect())
    }

    /// Number of stored records.
    pub async fn count(&self) -> Result<i64, DatabaseError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM rss_feed")
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_sqlx)?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(url: &str, title: &str) -> FeedRecord {
        FeedRecord {
            category: "Press Releases".into(),
            title: title.into(),
            publish_date: "Tue, 02 Jan 2024 09:30:00 +0800".into(),
            feed_url: url.into(),
            summary: Some("feed summary".into()),
            content: Some("body".into()),
            ai_summary: None,
        }
    }

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_insert_empty_is_noop() {
        let db = test_db().await;
        assert_eq!(db.insert_records(&[]).await.unwrap(), 0);
        assert_eq!(db.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_same_url_twice_keeps_first() {
        let db = test_db().await;
        assert_eq!(db.insert_records(&[record("https://a/1", "First")]).await.unwrap(), 1);

        let mut changed = record("https://a/1", "Second");
        changed.ai_summary = Some("- new".into());
        assert_eq!(db.insert_records(&[changed]).await.unwrap(), 0);

        let all = db.query_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].record.title, "First");
        assert_eq!(all[0].record.ai_summary, None);
    }

    #[tokio::test]
    async fn test_duplicates_within_one_call() {
        let db = test_db().await;
        let inserted = db
            .insert_records(&[
                record("https://a/1", "One"),
                record("https://a/2", "Two"),
                record("https://a/1", "One again"),
            ])
            .await
            .unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(db.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_insert_more_than_one_batch() {
        let db = test_db().await;
        let records: Vec<_> = (0..(BATCH_SIZE * 2 + 7))
            .map(|i| record(&format!("https://a/{i}"), "t"))
            .collect();
        assert_eq!(db.insert_records(&records).await.unwrap(), records.len());
        assert_eq!(db.count().await.unwrap(), records.len() as i64);
    }

    #[tokio::test]
    async fn test_query_all_preserves_fields_and_order() {
        let db = test_db().await;
        let first = record("https://a/1", "One");
        let mut second = record("https://a/2", "Two");
        second.summary = None;
        second.content = None;
        db.insert_records(&[first.clone(), second.clone()]).await.unwrap();

        let all = db.query_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].id < all[1].id);
        assert_eq!(all[0].record, first);
        assert_eq!(all[1].record, second);
    }

    #[tokio::test]
    async fn test_query_columns_projection_and_filter() {
        let db = test_db().await;
        let mut other = record("https://b/1", "Other");
        other.category = "Weather".into();
        db.insert_records(&[record("https://a/1", "One"), other, record("https://a/2", "Two")])
            .await
            .unwrap();

        let rows = db
            .query_columns(
                &[Column::Title, Column::FeedUrl],
                &[Filter::new(Column::Category, Value::Text("Press Releases".into()))],
            )
            .await
            .unwrap();
        assert_eq!(
            rows,
            vec![
                vec![Value::Text("One".into()), Value::Text("https://a/1".into())],
                vec![Value::Text("Two".into()), Value::Text("https://a/2".into())],
            ]
        );
    }

    #[tokio::test]
    async fn test_query_columns_multiple_filters_and_null() {
        let db = test_db().await;
        let mut no_summary = record("https://a/2", "Two");
        no_summary.ai_summary = None;
        let mut summarized = record("https://a/1", "One");
        summarized.ai_summary = Some("- point".into());
        db.insert_records(&[summarized, no_summary]).await.unwrap();

        let rows = db
            .query_columns(
                &[Column::FeedUrl],
                &[
                    Filter::new(Column::Category, Value::Text("Press Releases".into())),
                    Filter::new(Column::AiSummary, Value::Null),
                ],
            )
            .await
            .unwrap();
        assert_eq!(rows, vec![vec![Value::Text("https://a/2".into())]]);
    }

    #[tokio::test]
    async fn test_query_columns_by_id_and_empty_projection() {
        let db = test_db().await;
        db.insert_records(&[record("https://a/1", "One")]).await.unwrap();

        let rows = db
            .query_columns(&[], &[Filter::new(Column::Id, Value::Integer(1))])
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), Column::ALL.len());
        assert_eq!(rows[0][0], Value::Integer(1));

        let none = db
            .query_columns(&[Column::Title], &[Filter::new(Column::Id, Value::Integer(99))])
            .await
            .unwrap();
        assert!(none.is_empty());
    }
}
