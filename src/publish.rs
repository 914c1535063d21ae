//! Authenticated HTTP client for the Tistory manage surface.
//!
//! Tistory has no public posting API for Kakao-login accounts; posts go
//! through the same JSON endpoint the manage editor uses, authenticated by
//! the browser-derived session cookie. The endpoint is an unversioned,
//! drifting contract, so anything shaped unexpectedly is surfaced as
//! [`PublishError::EndpointChanged`] rather than guessed at.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Request timeout for every call to the publish surface.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connect timeout for every call to the publish surface.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Immediate retries allowed for connection-level failures.
const MAX_TRANSIENT_RETRIES: u32 = 2;

/// Base backoff between transient retries, scaled by attempt number.
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

static CATEGORY_SELECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<select[^>]*(?:id|name)\s*=\s*["']?category(?:Id)?["']?[^>]*>(.*?)</select>"#)
        .expect("category select pattern")
});

static CATEGORY_OPTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<option[^>]*value\s*=\s*["']?(\d+)["']?[^>]*>\s*([^<]*?)\s*</option>"#)
        .expect("category option pattern")
});

/// Why a publish-surface call failed.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    /// The session was rejected (login redirect or authentication status).
    /// Triggers the reactive refresh path.
    #[error("session rejected by the publish surface")]
    AuthExpired,

    /// The submission itself was rejected. Not retried this cycle.
    #[error("submission rejected: {0}")]
    ValidationRejected(String),

    /// Connection-level failure or server error; eligible for immediate
    /// bounded retries before the cycle is abandoned.
    #[error("network failure: {0}")]
    TransientNetwork(String),

    /// The response shape no longer matches the known contract. Requires
    /// operator attention.
    #[error("publish surface contract drift: {0}")]
    EndpointChanged(String),
}

/// Post visibility on the remote surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Published publicly.
    Public,
    /// Saved as a private post.
    Private,
}

impl Visibility {
    /// Wire code used by the manage endpoint (20 public, 10 private).
    #[must_use]
    pub fn wire_code(self) -> u8 {
        match self {
            Self::Public => 20,
            Self::Private => 10,
        }
    }

    fn published_flag(self) -> u8 {
        match self {
            Self::Public => 1,
            Self::Private => 0,
        }
    }
}

/// A category identifier on the remote surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryId(pub String);

impl CategoryId {
    /// The "uncategorized" default every blog has.
    #[must_use]
    pub fn uncategorized() -> Self {
        Self("0".to_owned())
    }
}

/// A fully rendered post ready for submission.
#[derive(Debug, Clone)]
pub struct PostDraft {
    /// Post title.
    pub title: String,
    /// Post body as HTML.
    pub html: String,
    /// Category to file under.
    pub category: CategoryId,
    /// Comma-joined on the wire.
    pub tags: Vec<String>,
    /// Requested visibility.
    pub visibility: Visibility,
}

/// Identifiers read back from an accepted submission.
#[derive(Debug, Clone, Default)]
pub struct PostReceipt {
    /// Assigned post id, when the response carried one.
    pub post_id: Option<String>,
    /// Public URL of the post, when the response carried one.
    pub url: Option<String>,
}

/// HTTP client for one blog's manage surface.
pub struct TistoryClient {
    http: reqwest::Client,
    blog_base: String,
    blog_id: Option<String>,
}

impl TistoryClient {
    /// Create a client for `{blog_name}.tistory.com`.
    pub fn new(blog_name: &str, blog_id: Option<&str>) -> crate::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| crate::PosterError::Publish(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            http,
            blog_base: format!("https://{blog_name}.tistory.com"),
            blog_id: blog_id.map(str::to_owned),
        })
    }

    /// Point the client at a different origin (mock servers in tests).
    #[must_use]
    pub fn with_blog_base(mut self, base: impl Into<String>) -> Self {
        self.blog_base = base.into();
        self
    }

    fn editor_url(&self) -> String {
        match &self.blog_id {
            Some(id) => format!(
                "{}/manage/newpost/{id}?type=post&returnURL=ENTRY",
                self.blog_base
            ),
            None => format!(
                "{}/manage/newpost/?type=post&returnURL=%2Fmanage%2Fposts%2F",
                self.blog_base
            ),
        }
    }

    /// Look up a category id by name on the manage editor page.
    ///
    /// `Ok(None)` means the name is unknown to the blog (including a blog
    /// with no categories at all); the caller decides the fallback.
    pub async fn resolve_category(
        &self,
        name: &str,
        cookie: &str,
    ) -> Result<Option<CategoryId>, PublishError> {
        let response = self
            .http
            .get(self.editor_url())
            .header(reqwest::header::COOKIE, cookie)
            .send()
            .await
            .map_err(|e| PublishError::TransientNetwork(e.to_string()))?;

        if is_login_redirect(response.url()) {
            return Err(PublishError::AuthExpired);
        }
        match response.status().as_u16() {
            200 => {}
            401 | 403 => return Err(PublishError::AuthExpired),
            other => {
                return Err(PublishError::EndpointChanged(format!(
                    "editor page returned status {other}"
                )));
            }
        }

        let body = response
            .text()
            .await
            .map_err(|e| PublishError::TransientNetwork(e.to_string()))?;

        let categories = parse_category_options(&body);
        debug!(count = categories.len(), "categories parsed from editor page");
        Ok(categories
            .into_iter()
            .find(|(_, cat_name)| cat_name == name)
            .map(|(id, _)| CategoryId(id)))
    }

    /// Submit a post and read back the assigned identifiers.
    ///
    /// Connection-level failures and 5xx responses are retried a small,
    /// bounded number of times with backoff. When the site rejects a public
    /// post for its daily publish limit, the same submission is retried once
    /// as a private post before giving up.
    pub async fn submit_post(
        &self,
        draft: &PostDraft,
        cookie: &str,
    ) -> Result<PostReceipt, PublishError> {
        let url = format!("{}/manage/post.json", self.blog_base);
        let mut visibility = draft.visibility;
        let mut retried_private = false;
        let mut transient_attempts: u32 = 0;

        loop {
            let body = submission_body(draft, visibility);
            let result = self
                .http
                .post(&url)
                .header(reqwest::header::COOKIE, cookie)
                .header(reqwest::header::REFERER, self.editor_url())
                .header(reqwest::header::ORIGIN, self.blog_base.clone())
                .header(reqwest::header::ACCEPT, "application/json, text/plain, */*")
                .json(&body)
                .send()
                .await;

            let response = match result {
                Ok(response) => response,
                Err(e) if transient_attempts < MAX_TRANSIENT_RETRIES => {
                    transient_attempts += 1;
                    warn!(attempt = transient_attempts, error = %e, "transient failure, retrying submission");
                    tokio::time::sleep(RETRY_BACKOFF * transient_attempts).await;
                    continue;
                }
                Err(e) => return Err(PublishError::TransientNetwork(e.to_string())),
            };

            if is_login_redirect(response.url()) {
                return Err(PublishError::AuthExpired);
            }

            let status = response.status().as_u16();
            match status {
                200 => return parse_receipt(response).await,
                401 => return Err(PublishError::AuthExpired),
                403 => {
                    let text = response.text().await.unwrap_or_default();
                    if daily_limit_hit(&text)
                        && visibility == Visibility::Public
                        && !retried_private
                    {
                        warn!("daily publish limit reached; retrying as a private post");
                        visibility = Visibility::Private;
                        retried_private = true;
                        continue;
                    }
                    return Err(PublishError::AuthExpired);
                }
                400 | 409 | 422 => {
                    let text = response.text().await.unwrap_or_default();
                    return Err(PublishError::ValidationRejected(snippet(&text)));
                }
                500..=599 if transient_attempts < MAX_TRANSIENT_RETRIES => {
                    transient_attempts += 1;
                    warn!(attempt = transient_attempts, status, "server error, retrying submission");
                    tokio::time::sleep(RETRY_BACKOFF * transient_attempts).await;
                }
                500..=599 => {
                    return Err(PublishError::TransientNetwork(format!(
                        "server error {status} after {transient_attempts} retries"
                    )));
                }
                other => {
                    return Err(PublishError::EndpointChanged(format!(
                        "unexpected status {other} from post endpoint"
                    )));
                }
            }
        }
    }
}

fn submission_body(draft: &PostDraft, visibility: Visibility) -> Value {
    let category: i64 = draft.category.0.parse().unwrap_or(0);
    serde_json::json!({
        // A new post is always id "0"; the server assigns the real one.
        "id": "0",
        "title": draft.title,
        "content": draft.html,
        "slogan": draft.title,
        "category": category,
        "tag": draft.tags.join(","),
        "visibility": visibility.wire_code(),
        "published": visibility.published_flag(),
        "type": "post",
        "uselessMarginForEntry": 1,
        "attachments": [],
        "cclCommercial": 0,
        "cclDerive": 0,
        "daumLike": "401",
        "password": "",
        "recaptchaValue": "",
        "draftSequence": null,
    })
}

async fn parse_receipt(response: reqwest::Response) -> Result<PostReceipt, PublishError> {
    let text = response
        .text()
        .await
        .map_err(|e| PublishError::TransientNetwork(e.to_string()))?;

    let value: Value = serde_json::from_str(&text).map_err(|_| {
        PublishError::EndpointChanged(format!(
            "submission accepted but response was not JSON: {}",
            snippet(&text)
        ))
    })?;

    Ok(receipt_from_value(&value))
}

fn receipt_from_value(value: &Value) -> PostReceipt {
    let post_id = match value.get("id") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    let url = ["entryUrl", "permalink", "url"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .filter(|s| !s.is_empty())
        .map(str::to_owned);

    PostReceipt { post_id, url }
}

/// Parse `(id, name)` pairs out of the editor page's category `<select>`.
fn parse_category_options(html: &str) -> Vec<(String, String)> {
    let Some(select) = CATEGORY_SELECT_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
    else {
        return Vec::new();
    };

    CATEGORY_OPTION_RE
        .captures_iter(select.as_str())
        .filter_map(|caps| {
            let id = caps.get(1)?.as_str().to_owned();
            let name = caps.get(2)?.as_str().trim().to_owned();
            // The empty/zero option is the implicit "uncategorized" entry.
            (id != "0" && !name.is_empty()).then_some((id, name))
        })
        .collect()
}

fn is_login_redirect(url: &Url) -> bool {
    url.path().contains("/login")
}

fn daily_limit_hit(body: &str) -> bool {
    body.contains("15개") || body.contains("발행")
}

fn snippet(text: &str) -> String {
    text.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    const EDITOR_PAGE: &str = r#"
<html><body>
<select id="categoryId" name="categoryId">
  <option value="">카테고리</option>
  <option value="0">미분류</option>
  <option value="1187390">PaperReview</option>
  <option value="1187391">DevLog</option>
</select>
</body></html>
"#;

    #[test]
    fn category_options_are_parsed() {
        let options = parse_category_options(EDITOR_PAGE);
        assert_eq!(
            options,
            vec![
                ("1187390".to_owned(), "PaperReview".to_owned()),
                ("1187391".to_owned(), "DevLog".to_owned()),
            ]
        );
    }

    #[test]
    fn page_without_select_yields_no_categories() {
        assert!(parse_category_options("<html><body>hello</body></html>").is_empty());
    }

    #[test]
    fn visibility_wire_codes_match_surface() {
        assert_eq!(Visibility::Public.wire_code(), 20);
        assert_eq!(Visibility::Private.wire_code(), 10);
        assert_eq!(Visibility::Public.published_flag(), 1);
        assert_eq!(Visibility::Private.published_flag(), 0);
    }

    #[test]
    fn submission_body_carries_draft_fields() {
        let draft = PostDraft {
            title: "[ViT] An Image is Worth 16x16 Words".to_owned(),
            html: "<p>review</p>".to_owned(),
            category: CategoryId("1187390".to_owned()),
            tags: vec!["ai".to_owned(), "paper".to_owned()],
            visibility: Visibility::Public,
        };

        let body = submission_body(&draft, Visibility::Public);
        assert_eq!(body["id"], "0");
        assert_eq!(body["category"], 1187390);
        assert_eq!(body["tag"], "ai,paper");
        assert_eq!(body["visibility"], 20);
        assert_eq!(body["published"], 1);
        assert_eq!(body["slogan"], body["title"]);
    }

    #[test]
    fn non_numeric_category_falls_back_to_zero() {
        let draft = PostDraft {
            title: "t".to_owned(),
            html: "h".to_owned(),
            category: CategoryId("garbage".to_owned()),
            tags: Vec::new(),
            visibility: Visibility::Public,
        };
        let body = submission_body(&draft, Visibility::Public);
        assert_eq!(body["category"], 0);
    }

    #[test]
    fn receipt_reads_id_and_url_variants() {
        let receipt = receipt_from_value(&serde_json::json!({
            "id": 12345,
            "entryUrl": "https://example.tistory.com/42",
        }));
        assert_eq!(receipt.post_id.as_deref(), Some("12345"));
        assert_eq!(receipt.url.as_deref(), Some("https://example.tistory.com/42"));

        let receipt = receipt_from_value(&serde_json::json!({ "id": "77", "url": "u" }));
        assert_eq!(receipt.post_id.as_deref(), Some("77"));

        let receipt = receipt_from_value(&serde_json::json!({}));
        assert!(receipt.post_id.is_none());
        assert!(receipt.url.is_none());
    }

    #[test]
    fn daily_limit_marker_is_detected() {
        assert!(daily_limit_hit("하루에 발행 가능한 글은 15개입니다"));
        assert!(!daily_limit_hit("forbidden"));
    }

    #[test]
    fn login_paths_are_recognized() {
        let url = Url::parse("https://www.tistory.com/auth/login?next=x").unwrap();
        assert!(is_login_redirect(&url));

        let url = Url::parse("https://example.tistory.com/manage/post.json").unwrap();
        assert!(!is_login_redirect(&url));
    }
}
