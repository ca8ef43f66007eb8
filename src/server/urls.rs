use once_cell::sync::Lazy;
use regex::Regex;

static URL_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"instagram\.com/p/[a-z0-9_-]+",
        r"instagram\.com/reel/[a-z0-9_-]+",
        r"instagram\.com/tv/[a-z0-9_-]+",
        r"instagram\.com/stories/[a-z0-9_.]+/?[a-z0-9_-]*/?",
        r"ig\.me/[a-z0-9_-]+",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

static POST_ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"instagram\.com/(?:p|reel|tv)/([a-zA-Z0-9_-]+)",
        r"ig\.me/([a-zA-Z0-9_-]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static pattern"))
    .collect()
});

/// A bare shortcode is accepted as well as a full URL.
static BARE_SHORTCODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]{10,}$").expect("static pattern"));

/// Cheap shape check before any resolution work happens. Matching is done on
/// the lowercased input; shortcodes are case-sensitive but the host and path
/// prefixes are not.
pub fn validate_instagram_url(url: &str) -> bool {
    let u = url.trim().to_ascii_lowercase();
    URL_PATTERNS.iter().any(|p| p.is_match(&u)) || BARE_SHORTCODE.is_match(&u)
}

/// Pull the shortcode out of a post/reel/tv URL, preserving its case.
pub fn extract_post_id(url: &str) -> Option<String> {
    let u = url.trim();
    for pattern in POST_ID_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(u) {
            return Some(caps[1].to_string());
        }
    }
    if BARE_SHORTCODE.is_match(u) {
        return Some(u.to_string());
    }
    None
}

/// Story URLs take the single-backend story path instead of the post chain.
pub fn is_story_url(url: &str) -> bool {
    url.to_ascii_lowercase().contains("stories")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_known_shapes() {
        assert!(validate_instagram_url("https://www.instagram.com/p/AbC123xyz_-/"));
        assert!(validate_instagram_url("https://instagram.com/reel/AbC123xyz/"));
        assert!(validate_instagram_url("https://www.instagram.com/tv/AbC123xyz/"));
        assert!(validate_instagram_url("https://www.instagram.com/stories/some.user/123456/"));
        assert!(validate_instagram_url("https://ig.me/AbC123xyz"));
        assert!(validate_instagram_url("AbC123xyz_-"));
    }

    #[test]
    fn test_validate_rejects_garbage() {
        assert!(!validate_instagram_url("https://example.com/p/AbC123xyz/"));
        assert!(!validate_instagram_url("not a url"));
        assert!(!validate_instagram_url("short"));
        assert!(!validate_instagram_url(""));
    }

    #[test]
    fn test_extract_post_id() {
        assert_eq!(
            extract_post_id("https://www.instagram.com/p/AbC123xyz/").as_deref(),
            Some("AbC123xyz")
        );
        assert_eq!(
            extract_post_id("https://www.instagram.com/reel/AbC123xyz?igsh=1").as_deref(),
            Some("AbC123xyz")
        );
        assert_eq!(extract_post_id("https://ig.me/AbC123xyz").as_deref(), Some("AbC123xyz"));
        assert_eq!(extract_post_id("AbC123xyz_-").as_deref(), Some("AbC123xyz_-"));
        assert_eq!(extract_post_id("https://www.instagram.com/someuser/"), None);
    }

    #[test]
    fn test_post_id_preserves_case() {
        assert_eq!(
            extract_post_id("https://www.instagram.com/p/aBcDeF/").as_deref(),
            Some("aBcDeF")
        );
    }

    #[test]
    fn test_is_story_url() {
        assert!(is_story_url("https://www.instagram.com/stories/user/123/"));
        assert!(is_story_url("https://www.instagram.com/STORIES/user/123/"));
        assert!(!is_story_url("https://www.instagram.com/p/AbC123xyz/"));
    }
}
