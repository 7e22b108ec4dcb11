use std::path::PathBuf;

use crate::config::Config;
use crate::error::BotResult;
use crate::generator::TextGenerator;
use crate::headlines::HeadlineSource;
use crate::publisher::Publisher;
use crate::state::{PostRecord, StateStore};
use crate::variety;

/// Outcome of one successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub content: String,
    pub topics: Vec<String>,
    /// `None` when the post was not actually sent (dry run).
    pub url: Option<String>,
    pub too_similar: bool,
}

/// One bot run: headlines in, post out, history updated.
pub struct Bot {
    headlines: HeadlineSource,
    generator: TextGenerator,
    publisher: Publisher,
    store: StateStore,
}

impl Bot {
    pub fn new(
        headlines: HeadlineSource,
        generator: TextGenerator,
        publisher: Publisher,
        store: StateStore,
    ) -> Self {
        Self {
            headlines,
            generator,
            publisher,
            store,
        }
    }

    pub fn from_config(config: &Config, state_path: impl Into<PathBuf>) -> BotResult<Self> {
        Ok(Self::new(
            HeadlineSource::new(config.news_api_key.clone())?,
            TextGenerator::new(config.openai_api_key.clone())?.with_model(&config.openai_model),
            Publisher::new(config.twitter.clone(), config.dry_run)?,
            StateStore::new(state_path),
        ))
    }

    /// Run the whole pipeline once. Any error aborts the run; there is no
    /// partial checkpointing.
    pub async fn run(&self, dry_run: bool) -> BotResult<RunReport> {
        tracing::info!("Loading bot state");
        let state = self.store.read_state();
        tracing::info!(
            last_run = %state.last_run,
            history_size = state.tweet_history.len(),
            "Current state loaded"
        );

        tracing::info!("Fetching current news headlines");
        let headlines = self.headlines.get_formatted_headlines().await?;
        tracing::info!(count = headlines.lines().count(), "Headlines fetched");

        tracing::info!("Generating post");
        let content = self.generator.generate_post(&headlines).await?;
        tracing::info!(length = content.chars().count(), content = %content, "Post generated");

        tracing::info!("Extracting topics from post");
        let topics = self.generator.extract_topics(&content).await;

        // Advisory only: a similar post is still published.
        let too_similar = !variety::check_variety(&topics, &state.recent_topics());
        if too_similar {
            tracing::warn!("Post is too similar to recent posts, but posting anyway");
        }

        tracing::info!("Publishing post");
        let url = self.publisher.publish(&content, dry_run).await?;
        match &url {
            Some(url) => tracing::info!(url = %url, "Post published"),
            None => tracing::info!("Dry run completed - nothing posted"),
        }

        let updated = state.add_tweet(PostRecord::new(content.clone(), topics.clone()));
        self.store.write_state(&updated)?;
        tracing::info!("State updated successfully");

        Ok(RunReport {
            content,
            topics,
            url,
            too_similar,
        })
    }
}
