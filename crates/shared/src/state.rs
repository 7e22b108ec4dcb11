use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{BotError, BotResult};

pub const DEFAULT_STATE_PATH: &str = "data/state.json";
pub const MAX_HISTORY_SIZE: usize = 10;

/// A post as it was published (or would have been, in a dry run)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostRecord {
    pub content: String,
    pub topics: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl PostRecord {
    pub fn new(content: impl Into<String>, topics: Vec<String>) -> Self {
        Self {
            content: content.into(),
            topics,
            timestamp: Utc::now(),
        }
    }
}

/// Everything the bot remembers between runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotState {
    pub last_run: DateTime<Utc>,
    pub tweet_history: Vec<PostRecord>,
}

impl Default for BotState {
    fn default() -> Self {
        Self {
            last_run: Utc::now(),
            tweet_history: Vec::new(),
        }
    }
}

impl BotState {
    /// Return a new state with `record` appended and `last_run` refreshed.
    pub fn add_tweet(&self, record: PostRecord) -> BotState {
        let mut tweet_history = Vec::with_capacity(self.tweet_history.len() + 1);
        tweet_history.extend(self.tweet_history.iter().cloned());
        tweet_history.push(record);

        BotState {
            last_run: Utc::now(),
            tweet_history,
        }
    }

    /// Topic lists of the stored posts, oldest first.
    pub fn recent_topics(&self) -> Vec<&[String]> {
        self.tweet_history
            .iter()
            .map(|record| record.topics.as_slice())
            .collect()
    }
}

/// File-backed store for [`BotState`].
///
/// The canonical file is only ever replaced by renaming a fully written
/// sibling `.tmp` file over it.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(DEFAULT_STATE_PATH)
    }
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn ensure_data_directory(&self) -> std::io::Result<()> {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => {
                fs::create_dir_all(dir)?;
                tracing::info!(dir = %dir.display(), "Created data directory");
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Load the state, falling back to an empty one on any problem.
    pub fn read_state(&self) -> BotState {
        if let Err(e) = self.ensure_data_directory() {
            tracing::warn!(error = %e, "Could not create data directory");
        }

        if !self.path.exists() {
            tracing::info!("No state file found, initializing empty state");
            return BotState::default();
        }

        let parsed = fs::read_to_string(&self.path)
            .map_err(|e| e.to_string())
            .and_then(|data| serde_json::from_str::<BotState>(&data).map_err(|e| e.to_string()));

        match parsed {
            Ok(state) => {
                tracing::info!(
                    last_run = %state.last_run,
                    history_size = state.tweet_history.len(),
                    "Loaded state from file"
                );
                state
            }
            Err(e) => {
                tracing::error!(
                    path = %self.path.display(),
                    error = %e,
                    "Failed to read state file, initializing empty state"
                );
                BotState::default()
            }
        }
    }

    /// Persist the state, keeping only the most recent
    /// [`MAX_HISTORY_SIZE`] records.
    pub fn write_state(&self, state: &BotState) -> BotResult<()> {
        let persistence = |source: std::io::Error| BotError::Persistence {
            path: self.path.display().to_string(),
            source,
        };

        self.ensure_data_directory().map_err(persistence)?;

        let skip = state.tweet_history.len().saturating_sub(MAX_HISTORY_SIZE);
        let trimmed = BotState {
            last_run: state.last_run,
            tweet_history: state.tweet_history[skip..].to_vec(),
        };

        let json = serde_json::to_string_pretty(&trimmed)
            .map_err(|e| persistence(std::io::Error::other(e)))?;

        let temp_path = self.temp_path();
        let written = File::create(&temp_path).and_then(|mut file| {
            file.write_all(json.as_bytes())?;
            file.sync_all()
        });
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            tracing::error!(error = %e, "Failed to write state file");
            return Err(persistence(e));
        }

        // The rename is the commit point.
        fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            tracing::error!(error = %e, "Failed to replace state file");
            persistence(e)
        })?;

        tracing::info!(
            history_size = trimmed.tweet_history.len(),
            "Saved state to file"
        );

        Ok(())
    }
}
