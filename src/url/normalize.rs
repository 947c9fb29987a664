use url::Url;

/// Normalizes a configured or requested site URL
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Lowercase the host and remove a leading `www.`
/// 3. Remove the fragment
/// 4. Remove trailing slashes
///
/// # Examples
///
/// ```
/// use lexicrawl::url::normalize_site_url;
///
/// let url = normalize_site_url("https://WWW.Example.com/").unwrap();
/// assert_eq!(url, "https://example.com");
/// ```
pub fn normalize_site_url(url_str: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(url_str.trim())?;

    if let Some(host) = url.host_str() {
        let mut normalized_host = host.to_lowercase();
        if let Some(stripped) = normalized_host.strip_prefix("www.") {
            normalized_host = stripped.to_string();
        }
        url.set_host(Some(&normalized_host))?;
    }

    url.set_fragment(None);

    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Canonicalizes a page URL for matching against site URLs
///
/// Applies the host rules of [`normalize_site_url`] but keeps the path as
/// is, trailing slash included.
pub fn canonical_page_url(url_str: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(url_str.trim())?;

    if let Some(host) = url.host_str() {
        let lowered = host.to_lowercase();
        let normalized_host = lowered.strip_prefix("www.").unwrap_or(&lowered).to_string();
        url.set_host(Some(&normalized_host))?;
    }

    url.set_fragment(None);

    Ok(url.to_string())
}

/// Serializes a normalized site URL the way links resolved against its
/// pages are serialized
///
/// `https://example.com` becomes `https://example.com/`, so the root page
/// and an `href="/"` link share one key.
pub fn root_page_url(site_url: &str) -> Result<String, url::ParseError> {
    Ok(Url::parse(site_url)?.to_string())
}

/// Returns the site-relative path of `full_url`
///
/// The bare site URL maps to `/`. A URL outside the site yields `None`.
pub fn extract_path(full_url: &str, site_url: &str) -> Option<String> {
    let rest = full_url.strip_prefix(site_url)?;
    if rest.is_empty() {
        return Some("/".to_string());
    }
    if !rest.starts_with('/') && !rest.starts_with('?') {
        // "https://example.com" must not claim "https://example.community"
        return None;
    }
    Some(rest.to_string())
}
