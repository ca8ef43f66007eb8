use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::types::MediaItem;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Format a byte count as the "X.XX MB" string the frontend displays.
pub fn format_size(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

/// Best-effort remote size lookup via HEAD. Failures are expected (many CDNs
/// reject HEAD or omit content-length) and are discarded, not logged as
/// errors; the caller simply reports an unknown size.
pub async fn remote_size(client: &Client, url: &str) -> Option<String> {
    let resp = client
        .head(url)
        .timeout(PROBE_TIMEOUT)
        .header(reqwest::header::USER_AGENT, "Mozilla/5.0")
        .send()
        .await
        .ok()?;

    let size = resp
        .headers()
        .get(reqwest::header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()?;

    if size == 0 {
        return None;
    }
    Some(format_size(size))
}

/// Fill in the `size` field of freshly normalized items. Items keep their
/// "0 MB" placeholder when the probe comes up empty.
pub async fn attach_sizes(client: &Client, items: &mut [MediaItem]) {
    for item in items.iter_mut() {
        if let Some(size) = remote_size(client, &item.dlink).await {
            item.size = size;
        } else {
            debug!("No size available for {}", item.dlink);
        }
    }
}
