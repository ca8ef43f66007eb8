use serde::Serialize;

/// Media kind, derived from URL heuristics or an explicit backend field.
/// Backends lie; a wrong guess here must never break anything downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Guess the kind from a media URL. Signed CDN URLs rarely end in a clean
    /// extension, so this is a substring match rather than a suffix match.
    pub fn guess(url: &str) -> Self {
        let u = url.to_ascii_lowercase();
        if u.contains("mp4") || u.contains("video") {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }

    pub fn from_label(label: &str) -> Self {
        if label.eq_ignore_ascii_case("video") {
            MediaKind::Video
        } else {
            MediaKind::Image
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            MediaKind::Video => "mp4",
            MediaKind::Image => "jpg",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Image => "image",
        }
    }
}

impl Serialize for MediaKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// One resolved media item, in the shape the frontend consumes.
/// Built fresh per resolution request and never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct MediaItem {
    pub filename: String,
    pub size: String,
    pub thumbnail: String,
    pub dlink: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
    pub proxy_download: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
}

impl MediaItem {
    /// Build a descriptor around a resolved remote URL. The proxy URLs are a
    /// pure function of `dlink` and `filename`; `stream_url` only exists for
    /// video since images are rendered from `thumbnail` directly.
    pub fn new(filename: String, kind: MediaKind, dlink: String, thumbnail: Option<String>) -> Self {
        let thumbnail = thumbnail.unwrap_or_else(|| dlink.clone());
        let stream_url = match kind {
            MediaKind::Video => Some(format!("/api/stream?url={}", quote_plus(&dlink))),
            MediaKind::Image => None,
        };
        let proxy_download = format!(
            "/api/download?url={}&filename={}",
            quote_plus(&dlink),
            quote_plus(&filename)
        );

        Self {
            filename,
            size: "0 MB".to_string(),
            thumbnail,
            dlink,
            stream_url,
            proxy_download,
            kind,
        }
    }
}

/// Synthesize a filename for a post's media. `index` is the 1-based position
/// within a carousel; single-item posts pass `None` and get no suffix.
pub fn post_filename(post_id: &str, index: Option<usize>, kind: MediaKind) -> String {
    match index {
        Some(i) => format!("instagram_{}_{}.{}", post_id, i, kind.extension()),
        None => format!("instagram_{}.{}", post_id, kind.extension()),
    }
}

/// Percent-encode a query parameter value, form-urlencoded style (space
/// becomes '+', matching what the frontend decodes).
pub fn quote_plus(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
