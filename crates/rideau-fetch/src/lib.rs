//! Open Graph / Twitter-card preview image lookup.
//!
//! The only outbound enrichment the ingestion pipeline performs: given an
//! occurrence's public page, find a usable preview image in its meta tags.
//! Strictly best-effort — the public surface returns `Option` and every
//! failure mode (timeout, DNS, non-HTML, oversized body) degrades to
//! `None`.

use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use url::Url;

use rideau_core::connector::PreviewFetcher;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = concat!("rideau/", env!("CARGO_PKG_VERSION"));

/// Pages are scanned for meta tags only; anything past this much HTML is
/// not worth downloading.
const MAX_BODY_BYTES: usize = 512 * 1024;

#[derive(Debug, Error)]
enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {0}")]
    Status(u16),
}

/// reqwest-backed [`PreviewFetcher`].
pub struct PreviewClient {
    http: reqwest::Client,
}

impl PreviewClient {
    pub fn new() -> Self {
        let http = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();
        Self { http }
    }

    async fn fetch(&self, page_url: &str) -> Result<Option<String>, FetchError> {
        let resp = self.http.get(page_url).send().await?;
        if !resp.status().is_success() {
            return Err(FetchError::Status(resp.status().as_u16()));
        }
        let body = resp.text().await?;
        let mut end = body.len().min(MAX_BODY_BYTES);
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        Ok(extract_preview_image(&body[..end], page_url))
    }
}

impl Default for PreviewClient {
    fn default() -> Self {
        Self::new()
    }
}

impl PreviewFetcher for PreviewClient {
    async fn fetch_preview_image(&self, page_url: &str) -> Option<String> {
        match self.fetch(page_url).await {
            Ok(image) => image,
            Err(e) => {
                debug!(url = page_url, error = %e, "preview lookup failed");
                None
            }
        }
    }
}

/// Meta-tag keys carrying a preview image, in preference order.
const IMAGE_META_KEYS: &[&str] = &["og:image:secure_url", "og:image", "twitter:image"];

/// Scan HTML for a preview-image meta tag and resolve it against the page
/// URL. Plain string scanning: the tags live in `<head>` and the corpus of
/// real listing pages does not warrant an HTML parser.
fn extract_preview_image(html: &str, page_url: &str) -> Option<String> {
    for key in IMAGE_META_KEYS {
        if let Some(content) = meta_content(html, key) {
            return resolve(&content, page_url);
        }
    }
    None
}

/// Find `<meta ... property|name="<key>" ... content="...">` and return the
/// content value.
fn meta_content(html: &str, key: &str) -> Option<String> {
    let mut rest = html;
    while let Some(pos) = find_ci(rest, "<meta") {
        let tag_start = &rest[pos..];
        let end = tag_start.find('>').unwrap_or(tag_start.len());
        let tag = &tag_start[..end];
        if attr_value(tag, "property").as_deref() == Some(key)
            || attr_value(tag, "name").as_deref() == Some(key)
        {
            if let Some(content) = attr_value(tag, "content") {
                if !content.trim().is_empty() {
                    return Some(content.trim().to_string());
                }
            }
        }
        rest = &tag_start[end.min(tag_start.len() - 1) + 1..];
    }
    None
}

/// Extract `name="value"` or `name='value'` from inside a tag.
fn attr_value(tag: &str, name: &str) -> Option<String> {
    // ASCII-lowercase keeps byte offsets aligned with the original tag.
    let lower = tag.to_ascii_lowercase();
    let needle = format!("{name}=");
    let mut search_from = 0;
    while let Some(found) = lower[search_from..].find(&needle) {
        let at = search_from + found;
        // Must be attribute position: preceded by whitespace.
        let valid = at > 0 && lower.as_bytes()[at - 1].is_ascii_whitespace();
        let value_at = at + needle.len();
        if valid && value_at < tag.len() {
            let quote = tag.as_bytes()[value_at];
            if quote == b'"' || quote == b'\'' {
                let value = &tag[value_at + 1..];
                if let Some(close) = value.find(quote as char) {
                    return Some(value[..close].to_string());
                }
            }
        }
        search_from = value_at;
    }
    None
}

/// ASCII-case-insensitive substring search; offsets index the haystack.
fn find_ci(haystack: &str, needle: &str) -> Option<usize> {
    haystack
        .to_ascii_lowercase()
        .find(&needle.to_ascii_lowercase())
}

/// Resolve a possibly relative image URL against the page it came from.
fn resolve(image: &str, page_url: &str) -> Option<String> {
    if image.starts_with("http://") || image.starts_with("https://") {
        return Some(image.to_string());
    }
    let base = Url::parse(page_url).ok()?;
    base.join(image).ok().map(|u| u.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "https://x.be/spectacles/hamlet";

    #[test]
    fn extracts_og_image() {
        let html = r#"<html><head>
            <meta property="og:title" content="Hamlet" />
            <meta property="og:image" content="https://cdn.x.be/hamlet.jpg" />
        </head></html>"#;
        assert_eq!(
            extract_preview_image(html, PAGE).as_deref(),
            Some("https://cdn.x.be/hamlet.jpg")
        );
    }

    #[test]
    fn prefers_secure_url() {
        let html = r#"
            <meta property="og:image" content="http://cdn.x.be/a.jpg">
            <meta property="og:image:secure_url" content="https://cdn.x.be/a.jpg">
        "#;
        assert_eq!(
            extract_preview_image(html, PAGE).as_deref(),
            Some("https://cdn.x.be/a.jpg")
        );
    }

    #[test]
    fn falls_back_to_twitter_card() {
        let html = r#"<meta name="twitter:image" content="https://cdn.x.be/t.jpg">"#;
        assert_eq!(
            extract_preview_image(html, PAGE).as_deref(),
            Some("https://cdn.x.be/t.jpg")
        );
    }

    #[test]
    fn resolves_relative_urls() {
        let html = r#"<meta property="og:image" content="/img/affiche.jpg">"#;
        assert_eq!(
            extract_preview_image(html, PAGE).as_deref(),
            Some("https://x.be/img/affiche.jpg")
        );
    }

    #[test]
    fn single_quotes_and_attribute_order() {
        let html = r#"<meta content='https://cdn.x.be/q.jpg' property='og:image'>"#;
        assert_eq!(
            extract_preview_image(html, PAGE).as_deref(),
            Some("https://cdn.x.be/q.jpg")
        );
    }

    #[test]
    fn empty_or_missing_tags_yield_none() {
        assert_eq!(extract_preview_image("", PAGE), None);
        assert_eq!(
            extract_preview_image(r#"<meta property="og:image" content="">"#, PAGE),
            None
        );
        assert_eq!(
            extract_preview_image("<html><body>no meta</body></html>", PAGE),
            None
        );
    }
}
