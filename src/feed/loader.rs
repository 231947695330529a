use url::Url;

use crate::feed::parser::{parse_feed, ParseResult};
use crate::storage::FeedRecord;
use crate::util::{decode_body, fetch_bytes, validate_url};

/// Records read from one feed, plus what went wrong if anything.
///
/// Loading never fails outright: a feed that cannot be fetched or parsed
/// yields zero records and a `failure` description, so the caller can count
/// it instead of aborting the run.
#[derive(Debug, Clone, Default)]
pub struct LoadedFeed {
    pub url: String,
    pub records: Vec<FeedRecord>,
    /// Entries dropped for lack of a usable link
    pub skipped_entries: usize,
    /// Why the feed produced no (or only partial) records
    pub failure: Option<String>,
}

impl LoadedFeed {
    /// True when the feed could not be fetched or parsed at all.
    pub fn failed(&self) -> bool {
        self.failure.is_some() && self.records.is_empty()
    }
}

/// Fetches one feed and turns every linked entry into a [`FeedRecord`].
///
/// `content` and `ai_summary` are left unset for the later stages.
pub async fn load_feed(client: &reqwest::Client, url: &str) -> LoadedFeed {
    let loaded = match fetch_bytes(client, url).await {
        Ok(bytes) => records_from_bytes(url, &bytes),
        Err(e) => LoadedFeed {
            url: url.to_string(),
            failure: Some(e.to_string()),
            ..LoadedFeed::default()
        },
    };

    if let Some(reason) = &loaded.failure {
        tracing::warn!(
            feed = %url,
            records = loaded.records.len(),
            error = %reason,
            "Feed could not be fully loaded"
        );
    }
    if loaded.skipped_entries > 0 {
        tracing::warn!(
            feed = %url,
            skipped = loaded.skipped_entries,
            "Entries without a usable link skipped"
        );
    }
    tracing::info!(feed = %url, records = loaded.records.len(), "Loaded feed");

    loaded
}

/// Parses an already-fetched feed body.
///
/// Entry links are resolved against `url`; entries whose link does not
/// resolve to an http(s) URL are skipped and counted.
pub fn records_from_bytes(url: &str, bytes: &[u8]) -> LoadedFeed {
    let text = decode_body(bytes);
    match parse_feed(&text) {
        Ok(ParseResult {
            title,
            entries,
            skipped,
            truncated,
        }) => {
            let base = Url::parse(url).ok();
            let mut skipped_entries = skipped;
            let mut records = Vec::with_capacity(entries.len());

            for entry in entries {
                let Some(link) = resolve_link(base.as_ref(), &entry.link) else {
                    tracing::debug!(feed = %url, link = %entry.link, "Entry link does not resolve");
                    skipped_entries += 1;
                    continue;
                };
                records.push(FeedRecord {
                    category: title.clone(),
                    title: entry.title,
                    publish_date: entry.published,
                    feed_url: link,
                    summary: entry.summary,
                    content: None,
                    ai_summary: None,
                });
            }

            LoadedFeed {
                url: url.to_string(),
                records,
                skipped_entries,
                failure: truncated,
            }
        }
        Err(e) => LoadedFeed {
            url: url.to_string(),
            failure: Some(e.to_string()),
            ..LoadedFeed::default()
        },
    }
}

/// Resolves an entry link against the feed URL; `None` unless the result is http(s).
fn resolve_link(base: Option<&Url>, link: &str) -> Option<String> {
    let link = link.trim();
    let resolved = match base {
        Some(base) => base.join(link).ok()?,
        None => Url::parse(link).ok()?,
    };
    validate_url(resolved.as_str()).ok().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VALID_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Transport</title>
    <item><title>A</title><link>https://td.gov.hk/a</link><pubDate>Mon, 01 Jan 2024</pubDate></item>
    <item><title>B</title><link>https://td.gov.hk/b</link><description>short</description></item>
    <item><title>C</title><link>https://td.gov.hk/c</link></item>
</channel></rss>"#;

    #[test]
    fn test_n_entries_give_n_records_with_shared_category() {
        let loaded = records_from_bytes("https://td.gov.hk/rss.xml", VALID_RSS.as_bytes());
        assert_eq!(loaded.records.len(), 3);
        assert!(loaded.records.iter().all(|r| r.category == "Transport"));
        assert_eq!(loaded.records[0].publish_date, "Mon, 01 Jan 2024");
        assert_eq!(loaded.records[1].summary.as_deref(), Some("short"));
        assert!(loaded.records.iter().all(|r| r.content.is_none() && r.ai_summary.is_none()));
        assert!(!loaded.failed());
    }

    #[test]
    fn test_relative_links_resolve_against_feed_url() {
        let rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
    <title>Press</title>
    <item><title>Root</title><link>/gia/general/1.htm</link></item>
    <item><title>Sibling</title><link>2.htm</link></item>
    <item><title>Mail</title><link>mailto:press@info.gov.hk</link></item>
</channel></rss>"#;

        let loaded = records_from_bytes("https://www.info.gov.hk/gia/rss/rss.xml", rss.as_bytes());
        let urls: Vec<&str> = loaded.records.iter().map(|r| r.feed_url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://www.info.gov.hk/gia/general/1.htm",
                "https://www.info.gov.hk/gia/rss/2.htm",
            ]
        );
        assert_eq!(loaded.skipped_entries, 1);
    }

    #[test]
    fn test_relative_link_without_usable_base_is_skipped() {
        let rss = r#"<rss version="2.0"><channel><title>T</title>
    <item><title>A</title><link>/a.htm</link></item>
    <item><title>B</title><link>https://td.gov.hk/b</link></item>
</channel></rss>"#;

        let loaded = records_from_bytes("not a url", rss.as_bytes());
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.records[0].feed_url, "https://td.gov.hk/b");
        assert_eq!(loaded.skipped_entries, 1);
    }

    #[test]
    fn test_garbage_yields_zero_records() {
        let loaded = records_from_bytes("https://x/rss.xml", b"<not valid xml");
        assert!(loaded.records.is_empty());
        assert!(loaded.failed());
    }

    #[tokio::test]
    async fn test_load_feed_success() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_RSS)
                    .insert_header("Content-Type", "application/xml"),
            )
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let loaded = load_feed(&client, &format!("{}/rss.xml", mock_server.uri())).await;
        assert_eq!(loaded.records.len(), 3);
        assert!(loaded.failure.is_none());
    }

    #[tokio::test]
    async fn test_load_feed_404_is_not_an_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let loaded = load_feed(&client, &format!("{}/rss.xml", mock_server.uri())).await;
        assert!(loaded.records.is_empty());
        assert!(loaded.failed());
        assert!(loaded.failure.unwrap().contains("404"));
    }

    #[tokio::test]
    async fn test_empty_feed_success() {
        let empty_rss = r#"<?xml version="1.0"?>
<rss version="2.0"><channel></channel></rss>"#;

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(empty_rss))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let loaded = load_feed(&client, &format!("{}/feed", mock_server.uri())).await;
        assert!(loaded.records.is_empty());
        assert!(!loaded.failed());
    }
}
