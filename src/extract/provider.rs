use super::types::MediaItem;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Timeout for backend metadata lookups. The relay proxy has its own, longer
/// budget; this one only covers the JSON round-trip.
pub const LOOKUP_TIMEOUT: Duration = Duration::from_secs(15);

/// Several backends refuse requests without a browser-looking user agent.
pub const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// The canonical public page URL third-party backends expect as input.
pub fn post_page_url(post_id: &str) -> String {
    format!("https://www.instagram.com/p/{}/", post_id)
}

#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable name of the backend, for diagnostics.
    fn name(&self) -> &'static str;

    /// Resolve a post ID into its ordered media items. Every failure mode
    /// (network, non-2xx, parse, not-found) comes back as an `Err` with a
    /// reason; a provider must never panic across this boundary.
    async fn resolve(&self, post_id: &str) -> Result<Vec<MediaItem>>;
}
