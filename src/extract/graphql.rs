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

/// Instagram's own web JSON endpoint. Highest priority because it is the only
/// backend that reports carousel posts item-by-item instead of collapsing
/// them to the first entry.
pub struct GraphqlProvider {
    client: Client,
    base_url: String,
}

impl GraphqlProvider {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    async fn fetch_post(&self, post_id: &str) -> Result<Value> {
        let url = format!("{}/p/{}/?__a=1&__d=dis", self.base_url, post_id);
        debug!("Fetching post JSON: {}", url);

        let resp = self
            .client
            .get(&url)
            .timeout(LOOKUP_TIMEOUT)
            .header(reqwest::header::USER_AGENT, BROWSER_UA)
            .send()
            .await
            .context("Failed to reach Instagram")?
            .error_for_status()
            .context("Instagram rejected the post lookup")?;

        resp.json().await.context("Failed to parse post JSON")
    }
}

/// Pull the media node out of a response and normalize it into descriptors.
/// Sidecar posts yield one item per child in backend order with a 1-based
/// filename suffix; single posts get no suffix.
fn normalize_post(post_id: &str, payload: &Value) -> Result<Vec<MediaItem>> {
    let media = payload
        .pointer("/graphql/shortcode_media")
        .ok_or_else(|| anyhow::anyhow!("Post not found"))?;

    let items = if media["__typename"].as_str() == Some("GraphSidecar") {
        let edges = media
            .pointer("/edge_sidecar_to_children/edges")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow::anyhow!("Sidecar post has no children"))?;

        let mut items = Vec::with_capacity(edges.len());
        for (i, edge) in edges.iter().enumerate() {
            items.push(node_to_item(post_id, &edge["node"], Some(i + 1))?);
        }
        items
    } else {
        vec![node_to_item(post_id, media, None)?]
    };

    if items.is_empty() {
        return Err(anyhow::anyhow!("No media found in post"));
    }
    Ok(items)
}

fn node_to_item(post_id: &str, node: &Value, index: Option<usize>) -> Result<MediaItem> {
    let is_video = node["is_video"].as_bool().unwrap_or(false);
    let kind = if is_video { MediaKind::Video } else { MediaKind::Image };

    let dlink = if is_video {
        node["video_url"].as_str()
    } else {
        node["display_url"].as_str()
    }
    .ok_or_else(|| anyhow::anyhow!("Media node has no download URL"))?
    .to_string();

    let thumbnail = node["display_url"].as_str().map(|s| s.to_string());

    Ok(MediaItem::new(
        post_filename(post_id, index, kind),
        kind,
        dlink,
        thumbnail,
    ))
}

#[async_trait]
impl Provider for GraphqlProvider {
    fn name(&self) -> &'static str {
        "instagram-graphql"
    }

    async fn resolve(&self, post_id: &str) -> Result<Vec<MediaItem>> {
        let payload = self.fetch_post(post_id).await?;
        let mut items = normalize_post(post_id, &payload)?;
        probe::attach_sizes(&self.client, &mut items).await;

        info!("instagram-graphql resolved {} media item(s)", items.len());
        Ok(items)
    }
}
