use anyhow::{Context, Result};
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::error::{BotError, BotResult};

pub const NEWS_API_BASE: &str = "https://newsapi.org";
pub const RSS_FEED_URL: &str = "https://news.google.com/rss?hl=en-US&gl=US&ceid=US:en";
pub const MAX_HEADLINES: usize = 5;
pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "Mozilla/5.0 (compatible; HeadlinePoster/1.0)";

#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    status: String,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
}

#[derive(Debug, Clone)]
struct HeadlineCache {
    headlines: Vec<String>,
    fetched_at: Instant,
}

/// Fetches current headlines from NewsAPI, falling back to the Google News
/// RSS feed, and keeps the last result around for [`CACHE_TTL`].
pub struct HeadlineSource {
    client: Client,
    news_api_key: Option<String>,
    news_api_base: String,
    rss_url: String,
    cache_ttl: Duration,
    cache: Mutex<Option<HeadlineCache>>,
}

impl HeadlineSource {
    pub fn new(news_api_key: Option<String>) -> BotResult<Self> {
        let client = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            news_api_key,
            news_api_base: NEWS_API_BASE.to_string(),
            rss_url: RSS_FEED_URL.to_string(),
            cache_ttl: CACHE_TTL,
            cache: Mutex::new(None),
        })
    }

    pub fn with_news_api_base(mut self, base: impl Into<String>) -> Self {
        self.news_api_base = base.into();
        self
    }

    pub fn with_rss_url(mut self, url: impl Into<String>) -> Self {
        self.rss_url = url.into();
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    fn cached(&self) -> Option<Vec<String>> {
        let cache = self.cache.lock().ok()?;
        cache
            .as_ref()
            .filter(|entry| entry.fetched_at.elapsed() < self.cache_ttl)
            .map(|entry| entry.headlines.clone())
    }

    fn store(&self, headlines: &[String]) {
        if let Ok(mut cache) = self.cache.lock() {
            *cache = Some(HeadlineCache {
                headlines: headlines.to_vec(),
                fetched_at: Instant::now(),
            });
        }
    }

    /// Up to [`MAX_HEADLINES`] non-empty headlines from the first source that
    /// produces any.
    pub async fn get_headlines(&self) -> BotResult<Vec<String>> {
        if let Some(headlines) = self.cached() {
            tracing::info!("Using cached headlines");
            return Ok(headlines);
        }

        let primary = match &self.news_api_key {
            Some(key) => match self.fetch_from_news_api(key).await {
                Ok(headlines) => Some(headlines),
                Err(e) => {
                    tracing::warn!(error = ?e, "NewsAPI failed, falling back to RSS");
                    None
                }
            },
            None => None,
        };

        let headlines = match primary {
            Some(headlines) => headlines,
            None => self.fetch_from_rss().await.unwrap_or_else(|e| {
                tracing::error!(error = ?e, "Failed to fetch from RSS");
                Vec::new()
            }),
        };

        if headlines.is_empty() {
            return Err(BotError::NoHeadlines);
        }

        self.store(&headlines);
        Ok(headlines)
    }

    /// Headlines as a numbered list, one per line.
    pub async fn get_formatted_headlines(&self) -> BotResult<String> {
        let headlines = self.get_headlines().await?;
        Ok(format_headlines(&headlines))
    }

    async fn fetch_from_news_api(&self, api_key: &str) -> Result<Vec<String>> {
        tracing::info!("Fetching headlines from NewsAPI");

        let url = format!(
            "{}/v2/top-headlines?country=us&category=general&pageSize=10",
            self.news_api_base.trim_end_matches('/')
        );

        let response = self
            .client
            .get(&url)
            .header("X-Api-Key", api_key)
            .send()
            .await
            .context("Failed to send request to NewsAPI")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!("NewsAPI returned error: {} - {}", status, error_text);
        }

        let body = response
            .json::<NewsApiResponse>()
            .await
            .context("Failed to parse NewsAPI response")?;

        if body.status != "ok" {
            anyhow::bail!("NewsAPI returned non-ok status: {}", body.status);
        }

        let headlines: Vec<String> = body
            .articles
            .into_iter()
            .take(MAX_HEADLINES)
            .filter_map(|article| article.title)
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty() && !title.contains("[Removed]"))
            .collect();

        if headlines.is_empty() {
            anyhow::bail!("NewsAPI returned no usable headlines");
        }

        tracing::info!(count = headlines.len(), "Fetched headlines from NewsAPI");
        Ok(headlines)
    }

    async fn fetch_from_rss(&self) -> Result<Vec<String>> {
        tracing::info!("Fetching headlines from Google News RSS");

        let response = self
            .client
            .get(&self.rss_url)
            .send()
            .await
            .context("Failed to fetch RSS feed")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("RSS feed returned error: {}", status);
        }

        let xml = response.text().await.context("Failed to read RSS body")?;
        let headlines = parse_rss_titles(&xml)?;

        tracing::info!(count = headlines.len(), "Fetched headlines from RSS");

        if headlines.is_empty() {
            anyhow::bail!("No headlines extracted from RSS feed");
        }

        Ok(headlines)
    }
}

/// Pull item titles out of an RSS document.
///
/// CDATA-wrapped titles are preferred; plain `<title>` elements are only
/// used when there are none. The first match is the feed's own title and is
/// skipped.
pub fn parse_rss_titles(xml: &str) -> Result<Vec<String>> {
    let cdata = Regex::new(r"<title><!\[CDATA\[(.*?)\]\]></title>")?;
    let plain = Regex::new(r"<title>(.*?)</title>")?;

    let mut titles: Vec<String> = cdata
        .captures_iter(xml)
        .map(|c| c[1].to_string())
        .collect();

    if titles.is_empty() {
        titles = plain
            .captures_iter(xml)
            .map(|c| decode_entities(&c[1]))
            .collect();
    }

    Ok(titles
        .into_iter()
        .skip(1)
        .take(MAX_HEADLINES)
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty() && !title.contains("Google News"))
        .collect())
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

pub fn format_headlines(headlines: &[String]) -> String {
    headlines
        .iter()
        .enumerate()
        .map(|(i, headline)| format!("{}. {}", i + 1, headline))
        .collect::<Vec<_>>()
        .join("\n")
}
