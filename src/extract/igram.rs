use super::{
    probe,
    provider::{Provider, BROWSER_UA, LOOKUP_TIMEOUT},
    types::{post_filename, MediaItem, MediaKind},
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

/// iGram.world API. Takes the shortcode in the path and reports media kind
/// explicitly, so no URL guessing is needed here.
pub struct IgramProvider {
    client: Client,
    endpoint: String,
}

impl IgramProvider {
    pub fn new(client: Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl Provider for IgramProvider {
    fn name(&self) -> &'static str {
        "igram"
    }

    async fn resolve(&self, post_id: &str) -> Result<Vec<MediaItem>> {
        debug!("Trying iGram for post ID: {}", post_id);

        let url = format!("{}/{}", self.endpoint.trim_end_matches('/'), post_id);
        let resp = self
            .client
            .get(&url)
            .timeout(LOOKUP_TIMEOUT)
            .header(reqwest::header::USER_AGENT, BROWSER_UA)
            .send()
            .await
            .context("iGram request failed")?
            .error_for_status()
            .context("iGram returned an error status")?;

        let data: Value = resp.json().await.context("iGram sent malformed JSON")?;

        if !data["status"].as_bool().unwrap_or(false) {
            return Err(anyhow::anyhow!("Post not found"));
        }
        let media = data["data"]
            .as_array()
            .and_then(|a| a.first())
            .ok_or_else(|| anyhow::anyhow!("Post not found"))?;

        let dlink = media["url"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("No download URL"))?
            .to_string();

        let kind = MediaKind::from_label(media["type"].as_str().unwrap_or("image"));
        let thumbnail = media["thumbnail"].as_str().map(|s| s.to_string());

        let mut items = vec![MediaItem::new(
            post_filename(post_id, None, kind),
            kind,
            dlink,
            thumbnail,
        )];
        probe::attach_sizes(&self.client, &mut items).await;

        info!("Success with iGram");
        Ok(items)
    }
}
