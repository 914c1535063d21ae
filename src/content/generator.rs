//! Review generation via the Anthropic Messages API.
//!
//! Generation is a collaborator at the pipeline boundary: the
//! [`ReviewGenerator`] trait is all the pipeline sees, and a failed
//! generation is fatal for the cycle (the item stays pending and is retried
//! on the next trigger).

use crate::config::GeneratorConfig;
use crate::queue::PaperMeta;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Generation calls wait considerably longer than publish calls; a full
/// review takes the model a minute or two.
const GENERATION_TIMEOUT: Duration = Duration::from_secs(180);

const API_VERSION: &str = "2023-06-01";

const SYSTEM_PROMPT: &str = "You are an AI researcher writing approachable deep-learning paper \
     reviews in Korean for a technical blog. Write in markdown. Structure \
     the review as: 핵심 요약, 연구 배경, 제안 방법, 실험 결과, 의의와 한계. \
     Explain intuitively, define jargon on first use, and keep a friendly \
     tone. Do not fabricate numbers; if a detail is uncertain, say so.";

/// Why a generation attempt failed.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// The generation API call failed (network, status, or response shape).
    #[error("generation API error: {0}")]
    Api(String),

    /// The API answered but produced no usable document.
    #[error("generation returned an empty document")]
    Empty,
}

/// A generated review document.
#[derive(Debug, Clone)]
pub struct GeneratedReview {
    /// Paper title the review is about.
    pub title: String,
    /// Review body in markdown.
    pub markdown: String,
    /// Short plain-text summary (first paragraph of the body).
    pub summary: String,
}

/// Capability to produce a review document for a queued paper.
#[async_trait]
pub trait ReviewGenerator: Send + Sync {
    /// Generate a review for `paper`, the `ordinal`-th post of the blog.
    async fn generate(
        &self,
        paper: &PaperMeta,
        ordinal: u64,
    ) -> Result<GeneratedReview, GenerateError>;
}

/// [`ReviewGenerator`] backed by the Anthropic Messages API.
pub struct AnthropicGenerator {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: usize,
}

impl AnthropicGenerator {
    /// Create a generator from the configuration.
    pub fn new(config: &GeneratorConfig) -> crate::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(GENERATION_TIMEOUT)
            .build()
            .map_err(|e| {
                crate::PosterError::Content(format!("cannot build HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            model: config.api_model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    fn build_prompt(paper: &PaperMeta, ordinal: u64) -> String {
        let mut prompt = format!(
            "리뷰 #{ordinal}: 다음 논문의 리뷰를 작성해주세요.\n\n제목: {}\n",
            paper.title
        );
        if !paper.authors.is_empty() {
            prompt.push_str(&format!("저자: {}\n", paper.authors.join(", ")));
        }
        if let Some(year) = paper.year {
            prompt.push_str(&format!("발행년도: {year}\n"));
        }
        if let Some(arxiv_id) = &paper.arxiv_id {
            prompt.push_str(&format!("arXiv: {arxiv_id}\n"));
        }
        prompt
    }
}

#[async_trait]
impl ReviewGenerator for AnthropicGenerator {
    async fn generate(
        &self,
        paper: &PaperMeta,
        ordinal: u64,
    ) -> Result<GeneratedReview, GenerateError> {
        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": SYSTEM_PROMPT,
            "messages": [{
                "role": "user",
                "content": Self::build_prompt(paper, ordinal),
            }],
        });

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerateError::Api(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(GenerateError::Api(format!(
                "status {status}: {}",
                text.chars().take(200).collect::<String>()
            )));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| GenerateError::Api(format!("invalid response body: {e}")))?;

        let markdown = extract_text(&value);
        if markdown.trim().is_empty() {
            return Err(GenerateError::Empty);
        }

        debug!(chars = markdown.len(), "review generated");
        Ok(GeneratedReview {
            title: paper.title.clone(),
            summary: first_paragraph(&markdown),
            markdown,
        })
    }
}

/// Concatenate the text blocks of a Messages API response.
fn extract_text(value: &Value) -> String {
    value
        .get("content")
        .and_then(Value::as_array)
        .map(|blocks| {
            blocks
                .iter()
                .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|block| block.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

/// First non-heading paragraph, clipped for use as a summary.
fn first_paragraph(markdown: &str) -> String {
    markdown
        .split("\n\n")
        .map(str::trim)
        .find(|block| !block.is_empty() && !block.starts_with('#'))
        .unwrap_or_default()
        .chars()
        .take(200)
        .collect()
}
