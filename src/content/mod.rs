//! Article body extraction.

mod page;

pub use page::{ContentScraper, MAIN_CONTENT_NOT_FOUND};
