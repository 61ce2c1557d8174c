//! Reddit tool - hot posts for a topic, via a keyword to subreddit table

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use crate::config::{RedditConfig, MAX_POSTS_PER_SUBREDDIT};
use crate::error::Error;
use crate::gateway::error_for_status;
use crate::Result;
use super::{ParamKind, ParamSpec, Tool, ToolArgs};

pub const REDDIT_API_BASE: &str = "https://www.reddit.com";

const MAX_POSTS: i64 = MAX_POSTS_PER_SUBREDDIT as i64;

/// Topic keywords and the subreddits that cover them, most specific first
pub const TOPIC_TABLE: &[(&str, &[&str])] = &[
    ("rust", &["rust", "learnrust"]),
    ("python", &["python", "learnpython"]),
    ("programming", &["programming", "coding", "compsci"]),
    ("ai", &["artificial", "MachineLearning", "singularity"]),
    ("machine learning", &["MachineLearning", "learnmachinelearning"]),
    ("technology", &["technology", "tech", "gadgets"]),
    ("gaming", &["gaming", "pcgaming", "Games"]),
    ("science", &["science", "askscience"]),
    ("space", &["space", "spacex", "astronomy"]),
    ("news", &["news", "worldnews"]),
    ("politics", &["politics", "PoliticalDiscussion"]),
    ("finance", &["personalfinance", "investing", "stocks"]),
    ("crypto", &["CryptoCurrency", "Bitcoin", "ethereum"]),
    ("sports", &["sports", "nba", "soccer"]),
    ("football", &["soccer", "nfl"]),
    ("movies", &["movies", "MovieSuggestions"]),
    ("music", &["Music", "listentothis"]),
    ("books", &["books", "suggestmeabook"]),
    ("food", &["food", "Cooking", "recipes"]),
    ("travel", &["travel", "solotravel"]),
    ("fitness", &["Fitness", "bodyweightfitness"]),
    ("health", &["health", "nutrition"]),
    ("funny", &["funny", "memes", "Jokes"]),
];

/// A subreddit name is 3-21 characters of letters, digits and underscores
fn is_subreddit_name(name: &str) -> bool {
    (3..=21).contains(&name.len()) && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Map a topic onto subreddits.
///
/// Table keywords found in the topic are taken in table order, at most
/// `max_keywords` of them, and their subreddits are merged without repeats
/// up to `max_subreddits`. A topic matching nothing is used as a subreddit
/// name itself when it is a valid one.
pub fn resolve_subreddits(topic: &str, limits: &RedditConfig) -> Vec<String> {
    let normalized = topic.trim().to_lowercase();
    let words: Vec<&str> = normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let matches_topic = |keyword: &str| {
        if keyword.contains(' ') {
            normalized.contains(keyword)
        } else {
            words.contains(&keyword)
        }
    };

    let mut subreddits: Vec<String> = Vec::new();
    for (_, subs) in TOPIC_TABLE.iter().filter(|(k, _)| matches_topic(*k)).take(limits.max_keywords) {
        for sub in subs.iter() {
            if subreddits.len() >= limits.max_subreddits {
                return subreddits;
            }
            if !subreddits.iter().any(|s| s.eq_ignore_ascii_case(sub)) {
                subreddits.push(sub.to_string());
            }
        }
    }

    if subreddits.is_empty() && limits.max_subreddits > 0 {
        let candidate: String = topic.trim().trim_start_matches("r/").split_whitespace().collect();
        if is_subreddit_name(&candidate) {
            subreddits.push(candidate);
        }
    }
    subreddits
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Post {
    pub subreddit: String,
    pub title: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default)]
    pub num_comments: i64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub stickied: bool,
}

pub struct RedditTool {
    client: Client,
    base_url: String,
    limits: RedditConfig,
}

impl RedditTool {
    pub fn new(client: Client, limits: RedditConfig) -> Self {
        Self {
            client,
            base_url: REDDIT_API_BASE.to_string(),
            limits,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn hot_posts(&self, subreddit: &str, limit: i64) -> Result<Vec<Post>> {
        let url = format!("{}/r/{}/hot.json", self.base_url.trim_end_matches('/'), subreddit);
        let response = self.client
            .get(url)
            .query(&[("limit", limit.to_string())])
            .send()
            .await?;
        let listing: Listing = error_for_status(response).await?.json().await?;

        Ok(listing.data.children
            .into_iter()
            .map(|c| c.data)
            .filter(|p| !p.stickied)
            .take(limit as usize)
            .collect())
    }
}

#[async_trait]
impl Tool for RedditTool {
    fn name(&self) -> &str { "fetch_reddit_posts" }
    fn description(&self) -> &str {
        "Fetch hot posts from the subreddits that best match a topic"
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        let default_limit = self.limits.posts_per_subreddit as i64;
        vec![
            ParamSpec::required("topic", ParamKind::String, "Topic to look up, e.g. \"space\" or \"rust programming\""),
            ParamSpec::optional("limit", ParamKind::Integer, "Posts per subreddit", json!(default_limit))
                .with_range(1, MAX_POSTS),
        ]
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value> {
        let topic = args.str("topic")?;
        let limit = args.int("limit")?;

        let subreddits = resolve_subreddits(topic, &self.limits);
        if subreddits.is_empty() {
            return Err(Error::NotFound(format!("No subreddit matches the topic '{}'", topic)));
        }
        tracing::debug!("Topic '{}' resolved to {:?}", topic, subreddits);

        let mut posts = Vec::new();
        let mut failures = Vec::new();
        for subreddit in &subreddits {
            match self.hot_posts(subreddit, limit).await {
                Ok(found) => posts.extend(found),
                Err(e) => {
                    tracing::warn!("Skipping r/{}: {}", subreddit, e);
                    failures.push(e);
                }
            }
        }

        // Every subreddit failed: report the first cause
        if posts.is_empty() && failures.len() == subreddits.len() {
            if let Some(first) = failures.into_iter().next() {
                return Err(first);
            }
        }

        Ok(json!({
            "subreddits": subreddits,
            "posts": posts,
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use httpmock::prelude::*;
    use crate::gateway::build_client;
    use crate::tools::ToolRegistry;
    use super::*;

    fn limits(max_keywords: usize, max_subreddits: usize) -> RedditConfig {
        RedditConfig { max_keywords, max_subreddits, posts_per_subreddit: 2 }
    }

    fn listing(sub: &str, titles: &[&str]) -> Value {
        json!({
            "kind": "Listing",
            "data": {
                "children": titles.iter().map(|t| json!({
                    "kind": "t3",
                    "data": {"subreddit": sub, "title": t, "score": 10, "num_comments": 1, "url": "https://x", "permalink": "/r/x"}
                })).collect::<Vec<_>>()
            }
        })
    }

    #[test]
    fn test_resolve_caps_subreddits() {
        assert_eq!(resolve_subreddits("space", &limits(5, 3)), vec!["space", "spacex", "astronomy"]);
        assert_eq!(resolve_subreddits("space and science", &limits(5, 3)), vec!["science", "askscience", "space"]);
        assert_eq!(resolve_subreddits("Space", &limits(5, 1)), vec!["space"]);
    }

    #[test]
    fn test_resolve_caps_keywords() {
        // "science" and "space" both match; one keyword allowed
        assert_eq!(resolve_subreddits("space science", &limits(1, 10)), vec!["science", "askscience"]);
    }

    #[test]
    fn test_resolve_merges_repeats_and_phrases() {
        assert_eq!(
            resolve_subreddits("machine learning and ai", &limits(5, 10)),
            vec!["artificial", "MachineLearning", "singularity", "learnmachinelearning"]
        );
    }

    #[test]
    fn test_resolve_falls_back_to_topic() {
        assert_eq!(resolve_subreddits("r/rustjerk", &limits(5, 3)), vec!["rustjerk"]);
        assert_eq!(resolve_subreddits("home lab", &limits(5, 3)), vec!["homelab"]);
        assert!(resolve_subreddits("?!", &limits(5, 3)).is_empty());
        assert!(resolve_subreddits("space", &limits(5, 0)).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_posts_skips_failing_subreddit() {
        let server = MockServer::start_async().await;
        let space = server.mock_async(|when, then| {
            when.method(GET).path("/r/space/hot.json").query_param("limit", "2");
            then.status(200).json_body(listing("space", &["Launch today", "Nebula"]));
        }).await;
        server.mock_async(|when, then| {
            when.method(GET).path("/r/spacex/hot.json");
            then.status(403).json_body(json!({"reason": "private", "message": "Forbidden", "error": 403}));
        }).await;

        let client = build_client(Duration::from_secs(5)).unwrap();
        let mut registry = ToolRegistry::new();
        registry.register(RedditTool::new(client, limits(5, 2)).with_base_url(server.base_url()));

        let outcome = registry.invoke("fetch_reddit_posts", json!({"topic": "space"})).await.to_json();

        space.assert_async().await;
        assert_eq!(outcome["subreddits"], json!(["space", "spacex"]));
        assert_eq!(outcome["posts"].as_array().unwrap().len(), 2);
        assert_eq!(outcome["posts"][0]["title"], "Launch today");
    }

    #[tokio::test]
    async fn test_all_subreddits_failing_is_an_error() {
        let server = MockServer::start_async().await;
        server.mock_async(|when, then| {
            when.method(GET).path("/r/nosuchplace/hot.json");
            then.status(404).json_body(json!({"message": "Not Found", "error": 404}));
        }).await;

        let client = build_client(Duration::from_secs(5)).unwrap();
        let mut registry = ToolRegistry::new();
        registry.register(RedditTool::new(client, limits(5, 3)).with_base_url(server.base_url()));

        let outcome = registry.invoke("fetch_reddit_posts", json!({"topic": "nosuchplace", "limit": 3})).await.to_json();
        assert_eq!(outcome["error_kind"], "not_found");
    }
}
