use super::{
    probe,
    provider::{post_page_url, Provider, BROWSER_UA, LOOKUP_TIMEOUT},
    types::{post_filename, quote_plus, MediaItem, MediaKind},
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

/// DLPanda download API. Plain GET with the post URL as a query parameter.
pub struct DlpandaProvider {
    client: Client,
    endpoint: String,
}

impl DlpandaProvider {
    pub fn new(client: Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl Provider for DlpandaProvider {
    fn name(&self) -> &'static str {
        "dlpanda"
    }

    async fn resolve(&self, post_id: &str) -> Result<Vec<MediaItem>> {
        debug!("Trying DLPanda for post ID: {}", post_id);

        let url = format!("{}?url={}", self.endpoint, quote_plus(&post_page_url(post_id)));
        let resp = self
            .client
            .get(&url)
            .timeout(LOOKUP_TIMEOUT)
            .header(reqwest::header::USER_AGENT, BROWSER_UA)
            .send()
            .await
            .context("DLPanda request failed")?
            .error_for_status()
            .context("DLPanda returned an error status")?;

        let data: Value = resp.json().await.context("DLPanda sent malformed JSON")?;

        if !data["success"].as_bool().unwrap_or(false) {
            return Err(anyhow::anyhow!("Failed to fetch"));
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

        info!("Success with DLPanda");
        Ok(items)
    }
}
