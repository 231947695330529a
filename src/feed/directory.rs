use scraper::{Html, Selector};
use url::Url;

use crate::util::{
    compile_selector, decode_body, fetch_bytes, is_excluded_host, validate_url, FetchError,
    SelectorError,
};

/// Finds feed links on a directory page.
///
/// A link qualifies when its anchor carries the marker class, its resolved
/// path ends with the feed suffix, and its host is not excluded.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    anchors: Selector,
    marker_class: String,
    suffix: String,
    excluded_hosts: Vec<String>,
}

impl LinkExtractor {
    pub fn new(
        marker_class: impl Into<String>,
        suffix: impl Into<String>,
        excluded_hosts: Vec<String>,
    ) -> Result<Self, SelectorError> {
        Ok(Self {
            anchors: compile_selector("a[href]")?,
            marker_class: marker_class.into(),
            suffix: suffix.into(),
            excluded_hosts,
        })
    }

    /// Fetches `page_url` and returns its feed links in document order.
    ///
    /// Duplicates are kept. A page with no qualifying links gives an empty
    /// list, not an error.
    ///
    /// # Errors
    ///
    /// [`FetchError`] when the page cannot be retrieved.
    pub async fn extract(
        &self,
        client: &reqwest::Client,
        page_url: &str,
    ) -> Result<Vec<String>, FetchError> {
        let bytes = fetch_bytes(client, page_url).await?;
        let html = decode_body(&bytes);
        let base = Url::parse(page_url).ok();

        let links = self.links_in(&html, base.as_ref());
        tracing::info!(page = %page_url, count = links.len(), "Extracted feed links");
        tracing::debug!(links = ?links, "Feed links");
        Ok(links)
    }

    /// Applies the link filter to an HTML document.
    ///
    /// Relative hrefs are resolved against `base`; without a base only
    /// absolute hrefs can qualify.
    pub fn links_in(&self, html: &str, base: Option<&Url>) -> Vec<String> {
        let document = Html::parse_document(html);

        document
            .select(&self.anchors)
            .filter(|a| a.value().classes().any(|c| c == self.marker_class))
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| {
                let href = href.trim();
                let resolved = match base {
                    Some(base) => base.join(href).ok()?,
                    None => Url::parse(href).ok()?,
                };
                validate_url(resolved.as_str()).ok()
            })
            .filter(|url| url.path().ends_with(&self.suffix))
            .filter(|url| {
                let excluded = is_excluded_host(url, &self.excluded_hosts);
                if excluded {
                    tracing::debug!(url = %url, "Skipping feed on excluded host");
                }
                !excluded
            })
            .map(String::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn extractor() -> LinkExtractor {
        LinkExtractor::new(
            "contentLink",
            "rss.xml",
            vec!["www.lcsd.gov.hk".into(), "www.edb.gov.hk".into()],
        )
        .unwrap()
    }

    const DIRECTORY: &str = r#"<html><body><table>
<tr><td><a class="contentLink" href="https://www.info.gov.hk/gia/rss/general_en.xml">XML</a></td></tr>
<tr><td><a class="contentLink" href="https://www.news.gov.hk/en/rss.xml">News</a></td></tr>
<tr><td><a class="contentLink other" href="/tc/feeds/rss.xml">Relative</a></td></tr>
<tr><td><a href="https://www.td.gov.hk/rss.xml">No class</a></td></tr>
<tr><td><a class="contentLink" href="https://www.lcsd.gov.hk/en/rss.xml">Excluded</a></td></tr>
<tr><td><a class="contentLink" href="https://www.edb.gov.hk/rss.xml">Excluded</a></td></tr>
<tr><td><a class="contentLink" href="mailto:rss.xml">Mail</a></td></tr>
<tr><td><a class="contentLink" href="https://www.news.gov.hk/en/rss.xml">Duplicate</a></td></tr>
</table></body></html>"#;

    #[test]
    fn test_filters_by_class_suffix_and_host() {
        let base = Url::parse("https://www.gov.hk/en/about/rss.htm").unwrap();
        let links = extractor().links_in(DIRECTORY, Some(&base));
        assert_eq!(
            links,
            vec![
                "https://www.news.gov.hk/en/rss.xml".to_string(),
                "https://www.gov.hk/tc/feeds/rss.xml".to_string(),
                "https://www.news.gov.hk/en/rss.xml".to_string(),
            ]
        );
    }

    #[test]
    fn test_suffix_checked_on_path_not_query() {
        let html = r#"<a class="contentLink" href="https://a.gov.hk/rss.xml?lang=en">x</a>
<a class="contentLink" href="https://a.gov.hk/feed?f=rss.xml">y</a>"#;
        let links = extractor().links_in(html, None);
        assert_eq!(links, vec!["https://a.gov.hk/rss.xml?lang=en".to_string()]);
    }

    #[test]
    fn test_relative_without_base_dropped() {
        let html = r#"<a class="contentLink" href="/rss.xml">x</a>"#;
        assert!(extractor().links_in(html, None).is_empty());
    }

    #[test]
    fn test_no_matching_links_is_empty() {
        let html = "<html><body><p>No feeds today</p><a href='/x'>x</a></body></html>";
        assert!(extractor().links_in(html, None).is_empty());
    }

    #[tokio::test]
    async fn test_extract_from_server() {
        let mock_server = MockServer::start().await;
        let page = format!(
            r#"<a class="contentLink" href="{0}/dept/rss.xml">one</a><a class="contentLink" href="rss.xml">two</a>"#,
            mock_server.uri()
        );
        Mock::given(method("GET"))
            .and(path("/en/about/rss.htm"))
            .respond_with(ResponseTemplate::new(200).set_body_string(page))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let links = extractor()
            .extract(&client, &format!("{}/en/about/rss.htm", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(
            links,
            vec![
                format!("{}/dept/rss.xml", mock_server.uri()),
                format!("{}/en/about/rss.xml", mock_server.uri()),
            ]
        );
    }

    #[tokio::test]
    async fn test_extract_non_2xx_is_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let result = extractor()
            .extract(&client, &format!("{}/dir", mock_server.uri()))
            .await;
        assert!(matches!(result, Err(FetchError::HttpStatus(503))));
    }
}
