use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::Reader;
use thiserror::Error;

use crate::util::validate_url;

/// One entry as written in the feed, with no normalization applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEntry {
    pub title: String,
    pub link: String,
    /// Publication date text exactly as the feed wrote it (empty if absent)
    pub published: String,
    pub summary: Option<String>,
}

/// Outcome of a best-effort feed parse.
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    /// Feed-level title (empty if the feed has none)
    pub title: String,
    pub entries: Vec<ParsedEntry>,
    /// Entries dropped because they carried no usable link
    pub skipped: usize,
    /// Set when a syntax error cut the document short; `entries` holds
    /// everything completed before that point.
    pub truncated: Option<String>,
}

/// Errors for documents that yield nothing usable.
#[derive(Debug, Error)]
pub enum FeedParseError {
    /// The document's root element is not a known feed format
    #[error("not a feed: root element <{0}>")]
    NotAFeed(String),
    /// The document contains no elements at all
    #[error("empty document")]
    Empty,
    /// The document is broken before the feed root was reached
    #[error("XML parse error: {0}")]
    Xml(String),
    /// A non-XML format was rejected by feed-rs
    #[error("feed-rs: {0}")]
    FeedRs(String),
}

/// Parses a syndication document.
///
/// RSS 2.0, RSS 1.0 (RDF) and Atom are read with an event reader so that
/// dates survive byte-for-byte. JSON Feed goes through `feed-rs`.
pub fn parse_feed(text: &str) -> Result<ParseResult, FeedParseError> {
    if text.trim_start().starts_with('{') {
        return parse_with_feed_rs(text.as_bytes());
    }
    parse_xml_feed(text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    FeedTitle,
    Title,
    Link,
    Published,
    Updated,
    Summary,
    Content,
    Guid,
}

#[derive(Debug, Default)]
struct EntryBuilder {
    title: Option<String>,
    link: Option<String>,
    alternate_href: Option<String>,
    any_href: Option<String>,
    guid_link: Option<String>,
    guid_is_permalink: bool,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<String>,
    content: Option<String>,
}

impl EntryBuilder {
    fn take_link_attrs(&mut self, e: &BytesStart<'_>) {
        let Some(href) = attr(e, b"href") else {
            return;
        };
        let rel = attr(e, b"rel");
        if matches!(rel.as_deref(), None | Some("alternate")) {
            self.alternate_href.get_or_insert(href);
        } else {
            self.any_href.get_or_insert(href);
        }
    }

    fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Published => &mut self.published,
            Field::Updated => &mut self.updated,
            Field::Summary => &mut self.summary,
            Field::Content => &mut self.content,
            Field::Guid => &mut self.guid_link,
            Field::FeedTitle => return,
        };
        // <atom:link> inside an RSS item shares the local name and carries no text
        if field == Field::Link && value.is_empty() {
            return;
        }
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    /// Returns `None` when no link can be found for the entry.
    fn finish(self) -> Option<ParsedEntry> {
        let guid_link = self
            .guid_link
            .filter(|_| self.guid_is_permalink)
            .filter(|g| validate_url(g).is_ok());
        let link = self
            .link
            .filter(|l| !l.is_empty())
            .or(self.alternate_href)
            .or(guid_link)
            .or(self.any_href)?;

        Some(ParsedEntry {
            title: self.title.unwrap_or_default(),
            link,
            published: self.published.or(self.updated).unwrap_or_default(),
            summary: self.summary.or(self.content),
        })
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    let attr = e.try_get_attribute(key).ok().flatten()?;
    match attr.unescape_value() {
        Ok(v) => Some(v.into_owned()),
        Err(_) => Some(String::from_utf8_lossy(&attr.value).into_owned()),
    }
}

/// Unescapes text, keeping the raw bytes when an unknown entity (e.g. `&nbsp;`) appears.
fn text_of(t: &BytesText<'_>) -> String {
    match t.unescape() {
        Ok(s) => s.into_owned(),
        Err(_) => String::from_utf8_lossy(t).into_owned(),
    }
}

fn classify_entry_child(name: &str) -> Option<Field> {
    match name {
        "title" => Some(Field::Title),
        "link" => Some(Field::Link),
        "pubDate" | "published" | "date" | "issued" => Some(Field::Published),
        "updated" | "modified" => Some(Field::Updated),
        "description" | "summary" => Some(Field::Summary),
        "content" => Some(Field::Content),
        "guid" => Some(Field::Guid),
        _ => None,
    }
}

fn parse_xml_feed(text: &str) -> Result<ParseResult, FeedParseError> {
    let mut reader = Reader::from_str(text);

    let mut result = ParseResult::default();
    let mut feed_title: Option<String> = None;
    let mut root_seen = false;
    // Local names of the currently open elements
    let mut stack: Vec<String> = Vec::new();
    let mut entry: Option<(EntryBuilder, usize)> = None;
    // Field being captured and the stack depth of its element
    let mut field: Option<(Field, usize)> = None;
    let mut value = String::new();

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) if !root_seen => return Err(FeedParseError::Xml(e.to_string())),
            Err(e) => {
                result.truncated = Some(format!(
                    "{} (at byte {})",
                    e,
                    reader.error_position()
                ));
                break;
            }
        };

        match event {
            Event::Start(e) if !root_seen => {
                let name = check_root(&e)?;
                root_seen = true;
                stack.push(name);
            }
            Event::Empty(e) if !root_seen => {
                check_root(&e)?;
                root_seen = true;
            }
            Event::Start(e) => {
                let name = local_name(&e);
                if field.is_none() {
                    match entry.as_mut() {
                        None if name == "item" || name == "entry" => {
                            entry = Some((EntryBuilder::default(), stack.len()));
                        }
                        None => {
                            let parent = stack.last().map(String::as_str);
                            if name == "title"
                                && feed_title.is_none()
                                && matches!(parent, Some("channel") | Some("feed"))
                            {
                                field = Some((Field::FeedTitle, stack.len()));
                                value.clear();
                            }
                        }
                        Some((builder, depth)) if stack.len() == *depth + 1 => {
                            if let Some(f) = classify_entry_child(&name) {
                                match f {
                                    Field::Link => builder.take_link_attrs(&e),
                                    Field::Guid => {
                                        builder.guid_is_permalink =
                                            attr(&e, b"isPermaLink").as_deref() != Some("false");
                                    }
                                    _ => {}
                                }
                                field = Some((f, stack.len()));
                                value.clear();
                            }
                        }
                        Some(_) => {}
                    }
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                if let Some((builder, depth)) = entry.as_mut() {
                    if field.is_none() && stack.len() == *depth + 1 && local_name(&e) == "link" {
                        builder.take_link_attrs(&e);
                    }
                }
            }
            Event::Text(t) => {
                if field.is_some() {
                    value.push_str(&text_of(&t));
                }
            }
            Event::CData(c) => {
                if field.is_some() {
                    value.push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(_) => {
                stack.pop();
                let depth = stack.len();

                if let Some((f, field_depth)) = field {
                    if field_depth == depth {
                        let captured = value.trim().to_string();
                        value.clear();
                        field = None;
                        match f {
                            Field::FeedTitle => feed_title = Some(captured),
                            _ => {
                                if let Some((builder, _)) = entry.as_mut() {
                                    builder.set(f, captured);
                                }
                            }
                        }
                    }
                    continue;
                }

                if matches!(entry, Some((_, entry_depth)) if entry_depth == depth) {
                    if let Some((builder, _)) = entry.take() {
                        match builder.finish() {
                            Some(parsed) => result.entries.push(parsed),
                            None => result.skipped += 1,
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !root_seen {
        return Err(FeedParseError::Empty);
    }

    result.title = feed_title.unwrap_or_default();
    Ok(result)
}

fn check_root(e: &BytesStart<'_>) -> Result<String, FeedParseError> {
    let name = local_name(e);
    match name.as_str() {
        "rss" | "RDF" | "feed" => Ok(name),
        _ => Err(FeedParseError::NotAFeed(name)),
    }
}

fn parse_with_feed_rs(bytes: &[u8]) -> Result<ParseResult, FeedParseError> {
    let feed = feed_rs::parser::parse(bytes).map_err(|e| FeedParseError::FeedRs(e.to_string()))?;

    let mut result = ParseResult {
        title: feed.title.map(|t| t.content).unwrap_or_default(),
        ..ParseResult::default()
    };

    for entry in feed.entries {
        let Some(link) = entry.links.first().map(|l| l.href.clone()) else {
            result.skipped += 1;
            continue;
        };
        result.entries.push(ParsedEntry {
            title: entry.title.map(|t| t.content).unwrap_or_default(),
            link,
            // Raw date text is not retained by feed-rs
            published: entry
                .published
                .or(entry.updated)
                .map(|dt| dt.to_rfc3339())
                .unwrap_or_default(),
            summary: entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body)),
        });
    }

    Ok(result)
}
