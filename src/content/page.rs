use scraper::{Html, Selector};

use crate::util::{compile_selector, decode_body, fetch_bytes, FetchError, SelectorError};

/// Returned in place of body text when a page has no main-content container.
///
/// The summarizer compares against this exact string to skip such pages.
pub const MAIN_CONTENT_NOT_FOUND: &str = "Main content not found.";

/// Elements whose text never counts as article content.
const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Pulls plain text out of article pages.
#[derive(Debug, Clone)]
pub struct ContentScraper {
    container: Selector,
}

impl ContentScraper {
    /// `container` is a CSS selector for the main-content element; the first
    /// match in document order is used.
    pub fn new(container: &str) -> Result<Self, SelectorError> {
        Ok(Self {
            container: compile_selector(container)?,
        })
    }

    /// Fetches an article and extracts its body text.
    ///
    /// # Errors
    ///
    /// [`FetchError`] when the page cannot be retrieved. A page without a
    /// container is not an error; it yields [`MAIN_CONTENT_NOT_FOUND`].
    pub async fn scrape(&self, client: &reqwest::Client, url: &str) -> Result<String, FetchError> {
        let bytes = fetch_bytes(client, url).await?;
        let html = decode_body(&bytes);
        let content = self.extract(&html);

        if content == MAIN_CONTENT_NOT_FOUND {
            tracing::warn!(url = %url, "No main content container");
        } else {
            tracing::debug!(url = %url, bytes = content.len(), "Scraped article");
        }
        Ok(content)
    }

    /// Joins the trimmed, non-empty text nodes under the container with `\n`.
    pub fn extract(&self, html: &str) -> String {
        let document = Html::parse_document(html);
        let Some(container) = document.select(&self.container).next() else {
            return MAIN_CONTENT_NOT_FOUND.to_string();
        };
        let container_id = container.id();

        let mut lines: Vec<&str> = Vec::new();
        for node in container.descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let hidden = node
                .ancestors()
                .take_while(|a| a.id() != container_id)
                .filter_map(|a| a.value().as_element())
                .any(|el| SKIPPED_ELEMENTS.contains(&el.name()));
            if hidden {
                continue;
            }
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                lines.push(trimmed);
            }
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn scraper() -> ContentScraper {
        ContentScraper::new("main").unwrap()
    }

    #[test]
    fn test_extract_joins_text_nodes() {
        let html = r#"<html><body>
<nav>Menu</nav>
<main>
  <h1>  Press release  </h1>
  <p>First <b>bold</b> paragraph.</p>
  <script>var tracking = 1;</script>
  <style>p { color: red }</style>
  <p>   </p>
  <div><span>Ends here</span></div>
</main>
<footer>Footer</footer>
</body></html>"#;
        assert_eq!(
            scraper().extract(html),
            "Press release\nFirst\nbold\nparagraph.\nEnds here"
        );
    }

    #[test]
    fn test_first_container_wins() {
        let html = "<main><p>one</p></main><main><p>two</p></main>";
        assert_eq!(scraper().extract(html), "one");
    }

    #[test]
    fn test_missing_container_returns_sentinel_exactly() {
        let html = "<html><body><div id='content'>Text</div></body></html>";
        assert_eq!(scraper().extract(html), "Main content not found.");
        assert_eq!(scraper().extract(html).as_bytes(), MAIN_CONTENT_NOT_FOUND.as_bytes());
    }

    #[test]
    fn test_empty_container_is_empty_string() {
        assert_eq!(scraper().extract("<main>   </main>"), "");
    }

    #[test]
    fn test_custom_selector() {
        let scraper = ContentScraper::new("div#pressrelease").unwrap();
        let html = "<main>skip</main><div id='pressrelease'>keep</div>";
        assert_eq!(scraper.extract(html), "keep");
    }

    #[test]
    fn test_invalid_selector_rejected() {
        assert!(ContentScraper::new("main[").is_err());
    }

    #[tokio::test]
    async fn test_scrape_decodes_and_extracts() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article.htm"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes("<html><main><p>政府公告</p></main></html>".as_bytes())
                    .insert_header("Content-Type", "text/html; charset=ISO-8859-1"),
            )
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let content = scraper()
            .scrape(&client, &format!("{}/article.htm", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(content, "政府公告");
    }

    #[tokio::test]
    async fn test_scrape_404_is_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let client = reqwest::Client::new();
        let result = scraper()
            .scrape(&client, &format!("{}/gone.htm", mock_server.uri()))
            .await;
        assert!(matches!(result, Err(FetchError::HttpStatus(404))));
    }
}
