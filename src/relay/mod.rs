use anyhow::{Context, Result};
use axum::http::{header, HeaderMap, HeaderValue};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Budget for connecting and receiving response headers. The body transfer
/// itself is not bounded: media files run to tens of megabytes and a healthy
/// slow transfer must be allowed to finish.
const RELAY_TIMEOUT: Duration = Duration::from_secs(25);

/// Maximum length of a client-visible download filename.
const MAX_FILENAME_LEN: usize = 100;

/// Fetches resolved remote media on behalf of the browser. Instagram's CDN
/// gates on browser-looking headers, and the browser itself cannot fetch
/// cross-origin, hence the same-origin relay.
#[derive(Clone)]
pub struct Relay {
    client: Client,
    referer: String,
    timeout: Duration,
}

impl Relay {
    pub fn new(client: Client, referer: String) -> Self {
        Self {
            client,
            referer,
            timeout: RELAY_TIMEOUT,
        }
    }

    #[cfg(test)]
    fn with_timeout(client: Client, referer: String, timeout: Duration) -> Self {
        Self {
            client,
            referer,
            timeout,
        }
    }

    /// Open the remote stream. Non-2xx fails the whole relay; the response is
    /// handed back still unread so the caller can forward bytes as they
    /// arrive instead of buffering the body. The deadline applies to `send()`
    /// only, which resolves once headers are in; reading the body afterwards
    /// can take as long as the remote needs.
    pub async fn open(&self, remote_url: &str) -> Result<reqwest::Response> {
        debug!("Opening relay fetch: {}", remote_url);

        let send = self
            .client
            .get(remote_url)
            .header(header::USER_AGENT, "Mozilla/5.0")
            .header(header::REFERER, &self.referer)
            .send();

        tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| anyhow::anyhow!("Remote did not respond in time"))?
            .context("Remote fetch failed")?
            .error_for_status()
            .context("Remote returned an error status")
    }
}

/// Copy only `content-type` and `content-length` from the remote response.
/// Everything else (cookies, caching, CDN internals) is dropped so nothing
/// from the remote origin leaks to our caller.
pub fn passthrough_headers(resp: &reqwest::Response) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for name in [header::CONTENT_TYPE, header::CONTENT_LENGTH] {
        if let Some(value) = resp.headers().get(&name) {
            headers.insert(name, value.clone());
        }
    }
    headers
}

/// Strip a caller-supplied filename down to characters that are safe both in
/// a Content-Disposition header and on disk, and cap its length.
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | ' '))
        .take(MAX_FILENAME_LEN)
        .collect()
}

/// Attachment disposition for forced downloads. The sanitized name contains
/// no quotes or control characters, so plain quoting is enough.
pub fn attachment_disposition(filename: &str) -> HeaderValue {
    let safe = sanitize_filename(filename);
    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", safe))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, response::IntoResponse, routing::get, Router};
    use std::net::SocketAddr;
    use tokio::net::TcpListener;

    async fn spawn(app: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    /// Headers go out immediately; the body dribbles in over well past the
    /// relay deadline.
    async fn dribble() -> impl IntoResponse {
        let chunks = futures::stream::unfold(0u8, |i| async move {
            if i >= 3 {
                return None;
            }
            tokio::time::sleep(Duration::from_millis(300)).await;
            Some((Ok::<_, std::io::Error>("0123456789".to_string()), i + 1))
        });
        Body::from_stream(chunks)
    }

    async fn stall() -> impl IntoResponse {
        tokio::time::sleep(Duration::from_secs(2)).await;
        "late"
    }

    #[tokio::test]
    async fn test_deadline_does_not_truncate_a_slow_body() {
        let addr = spawn(Router::new().route("/media.mp4", get(dribble))).await;
        let relay = Relay::with_timeout(
            reqwest::Client::new(),
            "https://www.instagram.com/".to_string(),
            Duration::from_millis(250),
        );

        // Three 300 ms gaps put the transfer well past the 250 ms deadline;
        // only the time to headers counts against it.
        let resp = relay
            .open(&format!("http://{}/media.mp4", addr))
            .await
            .unwrap();
        let body = resp.bytes().await.unwrap();
        assert_eq!(body.len(), 30);
    }

    #[tokio::test]
    async fn test_deadline_covers_time_to_headers() {
        let addr = spawn(Router::new().route("/media.mp4", get(stall))).await;
        let relay = Relay::with_timeout(
            reqwest::Client::new(),
            "https://www.instagram.com/".to_string(),
            Duration::from_millis(250),
        );

        let err = relay
            .open(&format!("http://{}/media.mp4", addr))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("did not respond in time"));
    }

    #[test]
    fn test_sanitize_strips_disallowed_characters() {
        assert_eq!(sanitize_filename("a/b<>c"), "abc");
        assert_eq!(sanitize_filename("video 1.mp4"), "video 1.mp4");
        assert_eq!(sanitize_filename("..\\evil\"name\r\n"), "..evilname");
    }

    #[test]
    fn test_sanitize_truncates_to_100_chars() {
        let hostile: String = "a/b<>c".repeat(40);
        assert_eq!(hostile.len(), 240);

        let safe = sanitize_filename(&hostile);
        assert_eq!(safe.len(), 100);
        assert!(safe
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | ' ')));
    }

    #[test]
    fn test_attachment_disposition() {
        let value = attachment_disposition("instagram_AbC123.mp4");
        assert_eq!(
            value.to_str().unwrap(),
            "attachment; filename=\"instagram_AbC123.mp4\""
        );

        let injected = attachment_disposition("x\"; filename=evil");
        assert_eq!(
            injected.to_str().unwrap(),
            "attachment; filename=\"x filenameevil\""
        );
    }
}
