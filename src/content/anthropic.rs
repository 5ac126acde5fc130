use crate::content::{ContentTransformer, TransformError, Verdict};
use crate::util::{require_secure_base, truncate_chars};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Body characters sent with each prompt.
const TRANSFORM_BODY_CHARS: usize = 1500;
const VALIDATE_BODY_CHARS: usize = 500;

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Anthropic Messages API client.
#[derive(Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

impl AnthropicClient {
    pub fn new(client: reqwest::Client, api_key: SecretString) -> Self {
        Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Points the client at another endpoint (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends a single-turn prompt and returns the trimmed text reply.
    async fn complete(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, TransformError> {
        require_secure_base(&self.base_url).map_err(|_| TransformError::InsecureBaseUrl)?;

        let request = MessagesRequest {
            model: &self.model,
            max_tokens,
            temperature,
            messages: [Message {
                role: "user",
                content: prompt,
            }],
        };

        let send = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send();

        let response = tokio::time::timeout(REQUEST_TIMEOUT, send)
            .await
            .map_err(|_| TransformError::Timeout)?
            .map_err(TransformError::Network)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransformError::HttpStatus {
                status: status.as_u16(),
                body: truncate_chars(&body, 200).to_string(),
            });
        }

        let reply: MessagesResponse = response
            .json()
            .await
            .map_err(|e| TransformError::Malformed(e.to_string()))?;

        let text = reply
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| TransformError::Malformed("reply has no text block".into()))?;

        Ok(text)
    }
}

#[async_trait]
impl ContentTransformer for AnthropicClient {
    async fn transform(
        &self,
        title: &str,
        body: &str,
        link: &str,
    ) -> Result<String, TransformError> {
        let prompt = transform_prompt(title, body, link);
        self.complete(&prompt, 600, 0.7).await
    }

    async fn validate(
        &self,
        title: &str,
        body: &str,
        link: &str,
    ) -> Result<Verdict, TransformError> {
        let prompt = validate_prompt(title, body, link);
        let reply = self.complete(&prompt, 50, 0.1).await?;
        Ok(Verdict::from_reply(&reply))
    }
}

fn transform_prompt(title: &str, body: &str, link: &str) -> String {
    format!(
        "Rewrite this RSS article as an engaging Discord post that gives readers real value. \
Use this structure:

🎯 **HEADLINE**: a punchy, benefit-focused headline (max 60 chars)

🧠 **SIMPLE EXPLANATION**: explain the main idea the way you would to a smart 12-year-old.

⚡ **QUICK WINS**: 2-3 practical tips readers can act on right away, each starting with a verb.

📝 **TL;DR**: a single sentence with the key takeaway.

Rules:
- Stay under 1500 characters in total
- Use emojis sparingly
- Keep the tone conversational
- Prefer practical value over theory
- Finish with the link

Article Title: {title}
Article Content: {content}
Link: {link}",
        content = truncate_chars(body, TRANSFORM_BODY_CHARS),
    )
}

fn validate_prompt(title: &str, body: &str, link: &str) -> String {
    format!(
        "Decide whether this RSS article can be turned into a Discord post.

Reply with ONLY one of:
- \"VALID\" if it has real content that can be processed
- \"SKIP_FUTURE_DATE\" if it is dated in the future
- \"SKIP_NO_CONTENT\" if there is no meaningful content
- \"SKIP_BROKEN_LINK\" if the link looks broken or inaccessible
- \"SKIP_INVALID\" if the content is malformed or otherwise unusable

Article Title: {title}
Article Content: {content}
Link: {link}",
        content = truncate_chars(body, VALIDATE_BODY_CHARS),
    )
}
