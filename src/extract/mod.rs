mod dlpanda;
mod graphql;
mod igram;
mod imgdownloader;
mod instasocial;
mod instavery;
mod probe;
mod provider;
mod story;
mod types;

pub use provider::Provider;
pub use types::{quote_plus, MediaItem, MediaKind};

use crate::config::BackendConfig;
use anyhow::Result;
use dlpanda::DlpandaProvider;
use futures::FutureExt;
use graphql::GraphqlProvider;
use igram::IgramProvider;
use imgdownloader::ImgdownloaderProvider;
use instasocial::InstasocialProvider;
use instavery::InstaveryProvider;
use reqwest::Client;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use story::{ResolveStory, StoryResolver};
use tracing::{info, warn};

/// The only resolution failure message callers ever see for posts. Individual
/// backend reasons stay in the logs.
pub const POST_FAILURE_MESSAGE: &str =
    "Unable to download. Ensure the post is public and try again.";

/// Caller-facing message for story misses. Stories expire, so a single
/// backend failure is treated as definitive.
pub const STORY_FAILURE_MESSAGE: &str =
    "Unable to download story. Ensure the story is public and not expired.";

/// Pause between adapter attempts. These backends are free, shared services;
/// hammering them back-to-back gets the whole deployment rate limited.
const ATTEMPT_BACKOFF: Duration = Duration::from_millis(500);

pub struct Resolver {
    providers: Vec<Box<dyn Provider>>,
    story: Box<dyn ResolveStory>,
    backoff: Duration,
}

impl Resolver {
    /// Build the chain in priority order. The Instagram web endpoint comes
    /// first because it is the only backend that handles carousels; the rest
    /// are ordered by observed reliability.
    pub fn new(client: Client, backends: &BackendConfig) -> Self {
        let providers: Vec<Box<dyn Provider>> = vec![
            Box::new(GraphqlProvider::new(client.clone(), backends.instagram.clone())),
            Box::new(InstasocialProvider::new(client.clone(), backends.instasocial.clone())),
            Box::new(DlpandaProvider::new(client.clone(), backends.dlpanda.clone())),
            Box::new(InstaveryProvider::new(client.clone(), backends.instavery.clone())),
            Box::new(ImgdownloaderProvider::new(client.clone(), backends.imgdownloader.clone())),
            Box::new(IgramProvider::new(client.clone(), backends.igram.clone())),
        ];

        let story = Box::new(StoryResolver::new(client, backends.storiesig.clone()));

        Self {
            providers,
            story,
            backoff: ATTEMPT_BACKOFF,
        }
    }

    #[cfg(test)]
    fn with_providers(providers: Vec<Box<dyn Provider>>, story: Box<dyn ResolveStory>) -> Self {
        Self {
            providers,
            story,
            backoff: Duration::ZERO,
        }
    }

    /// Try each provider in order and return the first success. A provider
    /// that errors, or panics, counts as a miss and the chain moves on; once
    /// the chain is exhausted the caller gets one generic message.
    pub async fn resolve_post(&self, post_id: &str) -> Result<Vec<MediaItem>> {
        info!("Resolving post ID: {}", post_id);

        for (i, provider) in self.providers.iter().enumerate() {
            let attempt = AssertUnwindSafe(provider.resolve(post_id))
                .catch_unwind()
                .await;

            match attempt {
                Ok(Ok(items)) if !items.is_empty() => {
                    info!(
                        "Resolved {} media item(s) with {}",
                        items.len(),
                        provider.name()
                    );
                    return Ok(items);
                }
                Ok(Ok(_)) => {
                    warn!("{} returned no media items", provider.name());
                }
                Ok(Err(e)) => {
                    warn!("{} failed: {:#}", provider.name(), e);
                }
                Err(_) => {
                    warn!("{} panicked during resolution", provider.name());
                }
            }

            if i + 1 < self.providers.len() {
                tokio::time::sleep(self.backoff).await;
            }
        }

        Err(anyhow::anyhow!(POST_FAILURE_MESSAGE))
    }

    /// Stories go through one dedicated backend; failure is terminal.
    pub async fn resolve_story(&self, story_url: &str) -> Result<Vec<MediaItem>> {
        info!("Resolving story URL: {}", story_url);

        match self.story.resolve(story_url).await {
            Ok(items) if !items.is_empty() => {
                info!("Resolved story media");
                Ok(items)
            }
            Ok(_) => Err(anyhow::anyhow!(STORY_FAILURE_MESSAGE)),
            Err(e) => {
                warn!("Story resolution failed: {:#}", e);
                Err(anyhow::anyhow!(STORY_FAILURE_MESSAGE))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::types::post_filename;
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct ScriptedProvider {
        name: &'static str,
        outcome: Outcome,
        calls: Arc<AtomicUsize>,
        order: Arc<std::sync::Mutex<Vec<&'static str>>>,
    }

    enum Outcome {
        Succeed(&'static str),
        Fail(&'static str),
        Panic,
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn resolve(&self, post_id: &str) -> Result<Vec<MediaItem>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.order.lock().unwrap().push(self.name);
            match &self.outcome {
                Outcome::Succeed(url) => Ok(vec![MediaItem::new(
                    post_filename(post_id, None, MediaKind::Video),
                    MediaKind::Video,
                    url.to_string(),
                    None,
                )]),
                Outcome::Fail(reason) => Err(anyhow::anyhow!(*reason)),
                Outcome::Panic => panic!("backend blew up"),
            }
        }
    }

    struct NoStory;

    #[async_trait]
    impl ResolveStory for NoStory {
        async fn resolve(&self, _story_url: &str) -> Result<Vec<MediaItem>> {
            Err(anyhow::anyhow!("expired"))
        }
    }

    fn scripted(
        outcomes: Vec<(&'static str, Outcome)>,
    ) -> (Resolver, Vec<Arc<AtomicUsize>>, Arc<std::sync::Mutex<Vec<&'static str>>>) {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let mut counters = Vec::new();
        let providers: Vec<Box<dyn Provider>> = outcomes
            .into_iter()
            .map(|(name, outcome)| {
                let calls = Arc::new(AtomicUsize::new(0));
                counters.push(calls.clone());
                Box::new(ScriptedProvider {
                    name,
                    outcome,
                    calls,
                    order: order.clone(),
                }) as Box<dyn Provider>
            })
            .collect();
        (
            Resolver::with_providers(providers, Box::new(NoStory)),
            counters,
            order,
        )
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let (resolver, counters, order) = scripted(vec![
            ("a", Outcome::Fail("down")),
            ("b", Outcome::Succeed("https://cdn.example.com/b.mp4")),
            ("c", Outcome::Succeed("https://cdn.example.com/c.mp4")),
        ]);

        let items = resolver.resolve_post("AbC123").await.unwrap();
        assert_eq!(items[0].dlink, "https://cdn.example.com/b.mp4");

        assert_eq!(*order.lock().unwrap(), vec!["a", "b"]);
        assert_eq!(counters[2].load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_all_failures_collapse_to_generic_message() {
        let (resolver, _, _) = scripted(vec![
            ("a", Outcome::Fail("timeout talking to a")),
            ("b", Outcome::Fail("b said not found")),
            ("c", Outcome::Fail("c sent garbage")),
        ]);

        let err = resolver.resolve_post("AbC123").await.unwrap_err();
        let msg = err.to_string();
        assert_eq!(msg, POST_FAILURE_MESSAGE);
        assert!(!msg.contains("timeout"));
        assert!(!msg.contains("not found"));
        assert!(!msg.contains("garbage"));
    }

    #[tokio::test]
    async fn test_panicking_provider_is_treated_as_failure() {
        let (resolver, counters, _) = scripted(vec![
            ("a", Outcome::Panic),
            ("b", Outcome::Succeed("https://cdn.example.com/b.mp4")),
        ]);

        let items = resolver.resolve_post("AbC123").await.unwrap();
        assert_eq!(items[0].dlink, "https://cdn.example.com/b.mp4");
        assert_eq!(counters[0].load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_story_failure_uses_story_message() {
        let (resolver, _, _) = scripted(vec![]);
        let err = resolver
            .resolve_story("https://www.instagram.com/stories/user/123/")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), STORY_FAILURE_MESSAGE);
    }
}
