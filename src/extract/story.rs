use super::{
    probe,
    provider::{BROWSER_UA, LOOKUP_TIMEOUT},
    types::{quote_plus, MediaItem, MediaKind},
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Story lookups go through a single dedicated backend with no fallback
/// chain. A miss here usually means the story expired or is private, not that
/// the backend hiccuped, so retrying elsewhere would not help.
pub struct StoryResolver {
    client: Client,
    endpoint: String,
}

/// Seam for tests; production code only ever uses [`StoryResolver`].
#[async_trait]
pub trait ResolveStory: Send + Sync {
    async fn resolve(&self, story_url: &str) -> Result<Vec<MediaItem>>;
}

impl StoryResolver {
    pub fn new(client: Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl ResolveStory for StoryResolver {
    async fn resolve(&self, story_url: &str) -> Result<Vec<MediaItem>> {
        debug!("Trying story backend for URL: {}", story_url);

        let url = format!("{}?url={}", self.endpoint, quote_plus(story_url));
        let resp = self
            .client
            .get(&url)
            .timeout(LOOKUP_TIMEOUT)
            .header(reqwest::header::USER_AGENT, BROWSER_UA)
            .send()
            .await
            .context("Story backend request failed")?
            .error_for_status()
            .context("Story backend returned an error status")?;

        let data: Value = resp.json().await.context("Story backend sent malformed JSON")?;

        if !data["status"].as_bool().unwrap_or(false) {
            return Err(anyhow::anyhow!("Story not found or private"));
        }
        let media = data["data"]
            .as_array()
            .and_then(|a| a.first())
            .ok_or_else(|| anyhow::anyhow!("Story not found or private"))?;

        let dlink = media["url"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("No download URL"))?
            .to_string();

        let kind = MediaKind::from_label(media["type"].as_str().unwrap_or("image"));
        let thumbnail = media["thumbnail"].as_str().map(|s| s.to_string());

        // Stories have no stable post ID to name the file after.
        let mut items = vec![MediaItem::new(
            story_filename(kind),
            kind,
            dlink,
            thumbnail,
        )];
        probe::attach_sizes(&self.client, &mut items).await;

        info!("Success with story backend");
        Ok(items)
    }
}

fn story_filename(kind: MediaKind) -> String {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("instagram_story_{}.{}", ts, kind.extension())
}
