use super::{
    probe,
    provider::{post_page_url, Provider, BROWSER_UA, LOOKUP_TIMEOUT},
    types::{post_filename, MediaItem, MediaKind},
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

/// InstaSocial download API. Form-encoded POST, works for public posts only.
pub struct InstasocialProvider {
    client: Client,
    endpoint: String,
}

impl InstasocialProvider {
    pub fn new(client: Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl Provider for InstasocialProvider {
    fn name(&self) -> &'static str {
        "instasocial"
    }

    async fn resolve(&self, post_id: &str) -> Result<Vec<MediaItem>> {
        debug!("Trying InstaSocial for post ID: {}", post_id);

        let resp = self
            .client
            .post(&self.endpoint)
            .timeout(LOOKUP_TIMEOUT)
            .header(reqwest::header::USER_AGENT, BROWSER_UA)
            .form(&[("url", post_page_url(post_id))])
            .send()
            .await
            .context("InstaSocial request failed")?
            .error_for_status()
            .context("InstaSocial returned an error status")?;

        let data: Value = resp.json().await.context("InstaSocial sent malformed JSON")?;

        if !data["status"].as_bool().unwrap_or(false) {
            return Err(anyhow::anyhow!("Post not found"));
        }

        let dlink = data["url"]
            .as_str()
            .or_else(|| data["download_url"].as_str())
            .ok_or_else(|| anyhow::anyhow!("No download URL"))?
            .to_string();

        let kind = MediaKind::guess(&dlink);
        let thumbnail = data["thumbnail"].as_str().map(|s| s.to_string());

        let mut items = vec![MediaItem::new(
            post_filename(post_id, None, kind),
            kind,
            dlink,
            thumbnail,
        )];
        probe::attach_sizes(&self.client, &mut items).await;

        info!("Success with InstaSocial");
        Ok(items)
    }
}
