//! Video identifier resolution.
//!
//! Turns whatever the user pasted (full page URL, bare identifier, mobile
//! link, `b23.tv` short link) into a canonical `BV` identifier. Offline
//! strategies are tried in order and the first hit wins; short links are
//! followed over the network once, as a last resort.

use async_trait::async_trait;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

pub mod strategies;

pub use strategies::{
    default_strategies, IdStrategy, PathSegmentStrategy, PatternStrategy, QueryParamStrategy,
};

use crate::Result;

static CANONICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^BV[0-9A-Za-z]{10}$").expect("valid identifier regex"));

static SHORT_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"b23\.tv/[a-zA-Z0-9]+").expect("valid short link regex"));

/// Canonical video identifier: `BV` followed by exactly 10 alphanumerics.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bvid(String);

impl Bvid {
    /// Accepts only values in canonical form.
    pub fn parse(value: &str) -> Option<Self> {
        CANONICAL.is_match(value).then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Bvid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// User input paired with whatever identifier was resolved from it
#[derive(Debug, Clone)]
pub struct VideoRef {
    pub raw_url: String,
    pub bvid: Option<Bvid>,
}

impl VideoRef {
    pub fn is_resolved(&self) -> bool {
        self.bvid.is_some()
    }
}

/// Follows HTTP redirects and reports the final URL
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RedirectFollower: Send + Sync {
    async fn follow(&self, url: &str) -> Result<String>;
}

/// Redirect follower backed by reqwest
pub struct HttpRedirectFollower {
    client: reqwest::Client,
}

impl HttpRedirectFollower {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl RedirectFollower for HttpRedirectFollower {
    async fn follow(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;

        if response.status() != reqwest::StatusCode::OK {
            anyhow::bail!("Short link answered HTTP {}", response.status());
        }

        Ok(response.url().to_string())
    }
}

/// Ordered strategy chain plus the short-link fallback
pub struct Resolver {
    strategies: Vec<Box<dyn IdStrategy>>,
    redirects: Box<dyn RedirectFollower>,
}

impl Resolver {
    /// Create a resolver with the default offline strategies
    pub fn new(redirects: Box<dyn RedirectFollower>) -> Self {
        Self {
            strategies: default_strategies(),
            redirects,
        }
    }

    /// Run only the offline strategies; never touches the network
    pub fn resolve_offline(&self, input: &str) -> Option<Bvid> {
        self.strategies.iter().find_map(|strategy| {
            let found = strategy.extract(input);
            if let Some(bvid) = &found {
                tracing::debug!("Strategy '{}' resolved {}", strategy.name(), bvid);
            }
            found
        })
    }

    /// Resolve an identifier, following a short link at most once
    pub async fn resolve(&self, input: &str) -> Option<Bvid> {
        if let Some(bvid) = self.resolve_offline(input) {
            return Some(bvid);
        }

        let short_url = short_link(input)?;
        tracing::info!("Following short link: {}", short_url);

        match self.redirects.follow(&short_url).await {
            Ok(target) => {
                tracing::debug!("Short link redirected to {}", target);
                self.resolve_offline(&target)
            }
            Err(e) => {
                tracing::warn!("Short link resolution failed: {}", e);
                None
            }
        }
    }

    pub async fn resolve_ref(&self, input: &str) -> VideoRef {
        VideoRef {
            raw_url: input.to_string(),
            bvid: self.resolve(input).await,
        }
    }
}

/// Extract a short link from the input as an absolute https URL
pub fn short_link(input: &str) -> Option<String> {
    SHORT_LINK
        .find(input)
        .map(|m| format!("https://{}", m.as_str()))
}
