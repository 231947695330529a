//! Utility functions shared by the scraping stages.
//!
//! This module provides reusable utilities for:
//!
//! - **HTTP bodies**: bounded GET requests with status checking
//! - **Text decoding**: charset detection for fetched documents
//! - **HTML**: CSS selector compilation
//! - **URL validation**: scheme checks and host exclusion
//!
//! # Examples
//!
//! ```
//! use govfeeds::util::{decode_body, validate_url};
//!
//! let url = validate_url("https://www.gov.hk/en/about/rss.htm").unwrap();
//! assert_eq!(url.host_str(), Some("www.gov.hk"));
//!
//! assert_eq!(decode_body(b"plain ascii"), "plain ascii");
//! ```

mod html;
mod http;
mod text;
mod url_validator;

pub use html::{compile_selector, SelectorError};
pub use http::{build_client, fetch_bytes, FetchError, MAX_BODY_SIZE};
pub use text::decode_body;
pub use url_validator::{is_excluded_host, validate_url, UrlValidationError};
