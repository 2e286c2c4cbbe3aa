//! Boundary traits for the collaborators the core consumes but does not
//! own: record producers and the preview-image lookup.

use std::future::Future;

use crate::error::RideauError;
use crate::models::CandidateRecord;

/// A producer of candidate records. How a connector obtains them — HTTP
/// scraping, static data, file import — is its own business; the core only
/// relies on the output shape and on batch order being the yield order.
pub trait Connector: Send + Sync {
    /// Identifier recorded as the `source` of produced records.
    fn source(&self) -> &str;

    /// Produce one batch of candidate records.
    fn produce(&self) -> impl Future<Output = Result<Vec<CandidateRecord>, RideauError>> + Send;
}

/// Best-effort Open Graph / Twitter-card preview image lookup.
///
/// Must not fail: any error — timeout, DNS, non-HTML page — is `None`.
pub trait PreviewFetcher: Send + Sync {
    fn fetch_preview_image(&self, page_url: &str) -> impl Future<Output = Option<String>> + Send;
}

/// Fetcher that never finds anything, for tests and offline runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPreviewFetcher;

impl PreviewFetcher for NoopPreviewFetcher {
    async fn fetch_preview_image(&self, _page_url: &str) -> Option<String> {
        None
    }
}
