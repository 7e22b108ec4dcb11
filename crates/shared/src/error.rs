//! Error taxonomy for a single bot run.

/// Everything that can abort a run.
///
/// Topic extraction failures are deliberately absent: they degrade to an
/// empty topic list instead of surfacing here.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    /// Required settings were missing or malformed. Every problem found is
    /// listed, not just the first.
    #[error("Missing required environment variables:\n{}", .0.join("\n"))]
    Configuration(Vec<String>),

    /// Neither the news API nor the RSS fallback produced a headline.
    #[error("No headlines fetched from any source")]
    NoHeadlines,

    /// The language model never produced a usable post.
    #[error("Failed to generate post after {attempts} attempts: {reason}")]
    GenerationExhausted { attempts: u32, reason: String },

    /// Post content failed validation before reaching the network.
    #[error("Invalid post content: {0}")]
    InvalidContent(String),

    /// The social platform rejected the post or could not be reached.
    #[error("Failed to publish post: {0}")]
    Publish(String),

    /// The state file could not be written.
    #[error("Failed to persist state to {path}: {source}")]
    Persistence {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// An HTTP client could not be constructed.
    #[error("Failed to create HTTP client: {0}")]
    Http(#[from] reqwest::Error),
}

pub type BotResult<T> = std::result::Result<T, BotError>;
