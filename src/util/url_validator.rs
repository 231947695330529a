use thiserror::Error;
use url::Url;

/// Errors that can occur during URL validation.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
}

/// Validates a URL string for use as a fetch target.
///
/// Rejects anything that is not an absolute `http`/`https` URL with a host,
/// which filters out `mailto:`, `javascript:` and similar hrefs found on
/// directory pages.
///
/// # Examples
///
/// ```
/// use govfeeds::util::validate_url;
///
/// assert!(validate_url("https://www.info.gov.hk/gia/rss/general_en.xml").is_ok());
/// assert!(validate_url("mailto:webmaster@gov.hk").is_err());
/// assert!(validate_url("/relative/path").is_err());
/// ```
pub fn validate_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(url)
}

/// Returns true when the URL's host matches one of `excluded` (case-insensitive).
pub fn is_excluded_host(url: &Url, excluded: &[String]) -> bool {
    match url.host_str() {
        Some(host) => excluded.iter().any(|h| h.eq_ignore_ascii_case(host)),
        None => false,
    }
}
