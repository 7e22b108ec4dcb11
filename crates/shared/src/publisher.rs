use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::TwitterCredentials;
use crate::error::{BotError, BotResult};
use crate::generator::MAX_POST_LENGTH;
use crate::oauth;

pub const TWITTER_API_BASE: &str = "https://api.twitter.com";

#[derive(Serialize)]
struct CreateTweetRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct CreateTweetResponse {
    data: CreatedTweet,
}

#[derive(Deserialize)]
struct CreatedTweet {
    id: String,
}

#[derive(Deserialize)]
struct MeResponse {
    data: User,
}

#[derive(Deserialize)]
struct User {
    id: String,
    username: String,
}

/// Known ways a post can be rejected. Only used to make the log useful;
/// nothing is retried based on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishFailure {
    Unauthorized,
    RateLimited,
    Duplicate,
    Other,
}

impl PublishFailure {
    pub fn classify(status: Option<StatusCode>, body: &str) -> Self {
        if body.to_lowercase().contains("duplicate") {
            return PublishFailure::Duplicate;
        }
        match status {
            Some(s) if s == StatusCode::UNAUTHORIZED || s == StatusCode::FORBIDDEN => {
                PublishFailure::Unauthorized
            }
            Some(s) if s == StatusCode::TOO_MANY_REQUESTS => PublishFailure::RateLimited,
            _ => PublishFailure::Other,
        }
    }

    fn hint(&self) -> &'static str {
        match self {
            PublishFailure::Unauthorized => "Twitter authentication failed - check API credentials",
            PublishFailure::RateLimited => "Twitter rate limit exceeded - wait before posting again",
            PublishFailure::Duplicate => "Duplicate post detected - content already posted",
            PublishFailure::Other => "Unexpected Twitter API failure",
        }
    }
}

/// Posts to X (Twitter) through the v2 API with OAuth 1.0a user context.
pub struct Publisher {
    client: Client,
    credentials: TwitterCredentials,
    api_base: String,
    dry_run: bool,
}

impl Publisher {
    /// `dry_run` is the global setting; [`Publisher::publish`] can also
    /// request a dry run per call.
    pub fn new(credentials: TwitterCredentials, dry_run: bool) -> BotResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            client,
            credentials,
            api_base: TWITTER_API_BASE.to_string(),
            dry_run,
        })
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base.trim_end_matches('/'), path)
    }

    /// Publish `content` and return the post URL, or `None` for a dry run.
    ///
    /// Validation and the dry-run check both happen before any request is
    /// made.
    pub async fn publish(&self, content: &str, dry_run: bool) -> BotResult<Option<String>> {
        let length = content.chars().count();
        if length > MAX_POST_LENGTH {
            return Err(BotError::InvalidContent(format!(
                "post too long: {} characters (max {})",
                length, MAX_POST_LENGTH
            )));
        }
        if content.trim().is_empty() {
            return Err(BotError::InvalidContent(
                "post content cannot be empty".to_string(),
            ));
        }

        if dry_run || self.dry_run {
            tracing::info!(content, length, "DRY RUN - would have posted");
            return Ok(None);
        }

        tracing::info!(length, "Posting to Twitter");

        let url = self.endpoint("/2/tweets");
        let auth = oauth::authorization_header("POST", &url, &self.credentials);

        let response = self
            .client
            .post(&url)
            .header("Authorization", auth)
            .json(&CreateTweetRequest { text: content })
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => return Err(self.failure(None, &e.to_string())),
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(self.failure(Some(status), &body));
        }

        let created = response
            .json::<CreateTweetResponse>()
            .await
            .map_err(|e| self.failure(Some(status), &e.to_string()))?;

        let post_url = format!("https://twitter.com/i/web/status/{}", created.data.id);
        tracing::info!(id = %created.data.id, url = %post_url, "Successfully posted");

        Ok(Some(post_url))
    }

    fn failure(&self, status: Option<StatusCode>, detail: &str) -> BotError {
        let kind = PublishFailure::classify(status, detail);
        tracing::error!(
            kind = ?kind,
            status = ?status,
            detail,
            "{}",
            kind.hint()
        );

        match status {
            Some(status) => BotError::Publish(format!("{}: {}", status, detail)),
            None => BotError::Publish(detail.to_string()),
        }
    }

    /// Read-only check that the configured credentials are accepted.
    pub async fn verify_credentials(&self) -> bool {
        tracing::info!("Verifying Twitter API credentials");

        let url = self.endpoint("/2/users/me");
        let auth = oauth::authorization_header("GET", &url, &self.credentials);

        let result = async {
            let response = self
                .client
                .get(&url)
                .header("Authorization", auth)
                .send()
                .await?
                .error_for_status()?;
            response.json::<MeResponse>().await
        }
        .await;

        match result {
            Ok(me) => {
                tracing::info!(
                    username = %me.data.username,
                    user_id = %me.data.id,
                    "Twitter credentials verified"
                );
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "Twitter credentials verification failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_duplicate_wins_over_status() {
        let body = r#"{"detail":"You are not allowed to create a Tweet with duplicate content.","status":403}"#;
        assert_eq!(
            PublishFailure::classify(Some(StatusCode::FORBIDDEN), body),
            PublishFailure::Duplicate
        );
    }

    #[test]
    fn test_classify_auth_and_rate_limit() {
        assert_eq!(
            PublishFailure::classify(Some(StatusCode::UNAUTHORIZED), ""),
            PublishFailure::Unauthorized
        );
        assert_eq!(
            PublishFailure::classify(Some(StatusCode::FORBIDDEN), "Forbidden"),
            PublishFailure::Unauthorized
        );
        assert_eq!(
            PublishFailure::classify(Some(StatusCode::TOO_MANY_REQUESTS), "Too Many Requests"),
            PublishFailure::RateLimited
        );
        assert_eq!(
            PublishFailure::classify(None, "connection refused"),
            PublishFailure::Other
        );
    }
}
