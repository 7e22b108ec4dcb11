use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::DEFAULT_MODEL;
use crate::error::{BotError, BotResult};

pub const OPENAI_API_BASE: &str = "https://api.openai.com";
pub const MAX_POST_LENGTH: usize = 280;
pub const MAX_ATTEMPTS: u32 = 3;
pub const MAX_TOPICS: usize = 3;

const SYSTEM_PROMPT: &str = r#"You are a brash, opinionated political news commentator writing short social media posts. Use this style:
- Confident and assertive tone
- Short, punchy sentences
- Occasional use of caps for EMPHASIS
- Strong opinions and reactions
- Sometimes uses "!" for excitement
- Never claims to be a real person

Keep posts under 280 characters. Make them bold, opinionated, and engaging."#;

const TOPICS_PROMPT: &str =
    "Extract 2-3 key topics or subjects from the post. Return only the topics as a comma-separated list.";

const GENERIC_PHRASES: [&str; 4] = ["i cannot", "i apologize", "as an ai", "i'm sorry"];

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    temperature: f64,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f64>,
}

#[derive(Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

impl Message {
    fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Drafts posts and extracts their topics through an OpenAI-compatible
/// chat-completions endpoint.
pub struct TextGenerator {
    client: Client,
    api_key: String,
    model: String,
    api_base: String,
    backoff_base: Duration,
}

impl TextGenerator {
    pub fn new(api_key: String) -> BotResult<Self> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;

        Ok(Self {
            client,
            api_key,
            model: DEFAULT_MODEL.to_string(),
            api_base: OPENAI_API_BASE.to_string(),
            backoff_base: Duration::from_millis(1000),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    /// Delay unit for retries after a failed request; attempt `n` waits
    /// `n * backoff_base`.
    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    /// Draft one post reacting to `headlines`.
    ///
    /// Responses that are empty, too long or read like a refusal use up an attempt
    /// and are retried immediately. Failed requests are retried with linear
    /// backoff.
    pub async fn generate_post(&self, headlines: &str) -> BotResult<String> {
        let user_prompt = format!(
            "Based on these current news headlines:\n\n{}\n\n\
            Write ONE post reacting to the most interesting or important story. \
            Make it engaging and true to your style.",
            headlines
        );

        let mut last_problem = String::from("no valid response");

        for attempt in 1..=MAX_ATTEMPTS {
            tracing::info!(attempt, max_attempts = MAX_ATTEMPTS, "Generating post");

            let request = ChatRequest {
                model: &self.model,
                messages: vec![Message::system(SYSTEM_PROMPT), Message::user(&user_prompt)],
                temperature: 0.85,
                max_tokens: 100,
                top_p: Some(0.95),
            };

            let raw = match self.complete(&request).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(attempt, error = ?e, "Failed to generate post");
                    last_problem = format!("{:#}", e);

                    if attempt >= MAX_ATTEMPTS {
                        return Err(BotError::GenerationExhausted {
                            attempts: attempt,
                            reason: last_problem,
                        });
                    }

                    tokio::time::sleep(self.backoff_base * attempt).await;
                    continue;
                }
            };

            let post = strip_wrapping_quotes(&raw).trim();
            let length = post.chars().count();

            if post.is_empty() {
                tracing::warn!("Generated post empty after cleanup, retrying");
                last_problem = "post was empty".to_string();
                continue;
            }

            if length > MAX_POST_LENGTH {
                tracing::warn!(length, "Generated post too long, retrying");
                last_problem = format!("post too long ({} chars)", length);
                continue;
            }

            if is_too_generic(post) {
                tracing::warn!("Generated post too generic, retrying");
                last_problem = "post read like a refusal".to_string();
                continue;
            }

            tracing::info!(length, "Successfully generated post");
            return Ok(post.to_string());
        }

        Err(BotError::GenerationExhausted {
            attempts: MAX_ATTEMPTS,
            reason: last_problem,
        })
    }

    /// Extract up to three lowercase topics from `post`. Never fails: any
    /// problem yields an empty list.
    pub async fn extract_topics(&self, post: &str) -> Vec<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message::system(TOPICS_PROMPT),
                Message::user(format!("Post: \"{}\"\n\nTopics:", post)),
            ],
            temperature: 0.3,
            max_tokens: 50,
            top_p: None,
        };

        match self.complete(&request).await {
            Ok(text) => {
                let topics = parse_topics(&text);
                tracing::info!(topics = ?topics, "Extracted topics");
                topics
            }
            Err(e) => {
                tracing::warn!(error = ?e, "Failed to extract topics, using empty list");
                Vec::new()
            }
        }
    }

    async fn complete(&self, request: &ChatRequest<'_>) -> Result<String> {
        let url = format!(
            "{}/v1/chat/completions",
            self.api_base.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .context("Failed to send request to OpenAI API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            anyhow::bail!("OpenAI API error: {} - {}", status, error_text);
        }

        let chat_response = response
            .json::<ChatResponse>()
            .await
            .context("Failed to parse OpenAI API response")?;

        let text = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            anyhow::bail!("OpenAI returned empty response");
        }

        Ok(text)
    }
}

/// Remove a single quote character from each end, if present.
fn strip_wrapping_quotes(text: &str) -> &str {
    let is_quote = |c: char| c == '"' || c == '\'';
    let text = text.strip_prefix(is_quote).unwrap_or(text);
    text.strip_suffix(is_quote).unwrap_or(text)
}

fn is_too_generic(post: &str) -> bool {
    let lower = post.to_lowercase();
    GENERIC_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

fn parse_topics(text: &str) -> Vec<String> {
    let mut topics: Vec<String> = Vec::new();

    for raw in text.split(',') {
        let topic = raw
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '.')
            .trim()
            .to_lowercase();

        if !topic.is_empty() && !topics.contains(&topic) {
            topics.push(topic);
        }
    }

    topics.truncate(MAX_TOPICS);
    topics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_wrapping_quotes() {
        assert_eq!(strip_wrapping_quotes("\"Hello there!\""), "Hello there!");
        assert_eq!(strip_wrapping_quotes("'single'"), "single");
        assert_eq!(strip_wrapping_quotes("no quotes"), "no quotes");
        assert_eq!(strip_wrapping_quotes("\"\"double\"\""), "\"double\"");
    }

    #[test]
    fn test_generic_phrases_are_case_insensitive() {
        assert!(is_too_generic("I'm sorry, but I can't help with that."));
        assert!(is_too_generic("As an AI language model..."));
        assert!(is_too_generic("I CANNOT do this"));
        assert!(!is_too_generic("TREMENDOUS news on the economy today!"));
    }

    #[test]
    fn test_parse_topics_lowercases_and_trims() {
        assert_eq!(
            parse_topics(" Climate Policy, Economy , \"NASA\"."),
            vec!["climate policy", "economy", "nasa"]
        );
    }

    #[test]
    fn test_parse_topics_drops_empty_and_duplicates() {
        assert_eq!(parse_topics("economy,, Economy ,jobs"), vec!["economy", "jobs"]);
    }

    #[test]
    fn test_parse_topics_keeps_at_most_three() {
        assert_eq!(parse_topics("a, b, c, d, e").len(), MAX_TOPICS);
    }

    #[test]
    fn test_chat_request_omits_missing_top_p() {
        let request = ChatRequest {
            model: "gpt-test",
            messages: vec![Message::user("hi")],
            temperature: 0.3,
            max_tokens: 50,
            top_p: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("top_p").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }
}
