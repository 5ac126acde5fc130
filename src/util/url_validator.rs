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
    /// A credential-bearing base URL uses plain HTTP on a non-local host.
    #[error("Insecure base URL: HTTPS required (except localhost for testing)")]
    InsecureBaseUrl,
}

/// Validates a URL string for use as a feed source.
///
/// Rejects anything that is not an absolute `http`/`https` URL with a host.
///
/// # Examples
///
/// ```
/// use feedcast::util::validate_feed_url;
///
/// assert!(validate_feed_url("https://example.com/feed.xml").is_ok());
/// assert!(validate_feed_url("file:///etc/passwd").is_err());
/// assert!(validate_feed_url("not a url").is_err());
/// ```
pub fn validate_feed_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str)?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    if !matches!(url.host_str(), Some(host) if !host.is_empty()) {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(url)
}

/// Checks that an API base URL is safe to send credentials to.
///
/// HTTPS is required; plain HTTP is allowed only for `localhost` and
/// `127.0.0.1`, which is what mock servers bind to in tests.
pub fn require_secure_base(base: &str) -> Result<(), UrlValidationError> {
    let url = Url::parse(base).map_err(|_| UrlValidationError::InsecureBaseUrl)?;

    match (url.scheme(), url.host_str()) {
        ("https", Some(_)) => Ok(()),
        ("http", Some("localhost" | "127.0.0.1")) => {
            tracing::warn!(base_url = %base, "Using non-HTTPS base URL (localhost only)");
            Ok(())
        }
        _ => {
            tracing::error!(
                base_url = %base,
                "Rejecting non-HTTPS base URL (HTTPS required except for localhost)"
            );
            Err(UrlValidationError::InsecureBaseUrl)
        }
    }
}
