//! Browser-driven session refresh.
//!
//! Tistory sessions ride on Kakao-login cookies that the site never exposes
//! through an API, so minting new material means driving a real browser
//! through the identity-provider flow and harvesting the resulting cookies.
//! The automation engine sits behind the [`SessionRefresher`] trait; the
//! pipeline is tested against a mock and never touches a browser.

use crate::credentials::SessionCredentials;
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder, Locator};
use std::time::Duration;
use tracing::{debug, info};

/// Tistory login entry point.
const LOGIN_URL: &str = "https://www.tistory.com/auth/login";

/// Tistory origin the harvested cookies must belong to.
const BASE_URL: &str = "https://www.tistory.com";

/// Cookie names (matched case-insensitively, as substrings) that carry the
/// session.
const SESSION_COOKIE_NAMES: [&str; 5] =
    ["TSSESSION", "_T_ANO", "TOP-XSRF-TOKEN", "JSESSIONID", "TISTORY"];

/// Why a refresh attempt failed.
#[derive(Debug, thiserror::Error)]
pub enum RefreshError {
    /// The identity provider demanded an out-of-band step (two-factor
    /// prompt, captcha, OAuth consent) the automation cannot satisfy
    /// unattended. Resolve it once with a non-headless interactive run.
    #[error("identity provider requires out-of-band verification; run `autopress refresh-session --interactive`")]
    ChallengeRequired,

    /// The identity provider rejected the configured credentials.
    #[error("identity provider rejected the configured credentials")]
    LoginRejected,

    /// The page structure did not match expectations, or the WebDriver
    /// session itself failed.
    #[error("browser automation fault: {0}")]
    AutomationFault(String),
}

/// Capability to mint fresh session material.
#[async_trait]
pub trait SessionRefresher: Send + Sync {
    /// Drive the identity-provider login flow and harvest session cookies.
    ///
    /// `interactive` relaxes timeouts and shows the browser window so a human
    /// can resolve verification steps.
    async fn refresh(
        &self,
        identity: &str,
        secret: &str,
        interactive: bool,
    ) -> Result<SessionCredentials, RefreshError>;
}

/// [`SessionRefresher`] backed by a chromedriver-compatible WebDriver
/// endpoint.
pub struct WebDriverRefresher {
    webdriver_url: String,
    headless: bool,
}

impl WebDriverRefresher {
    /// Create a refresher talking to the given WebDriver endpoint.
    #[must_use]
    pub fn new(webdriver_url: impl Into<String>, headless: bool) -> Self {
        Self {
            webdriver_url: webdriver_url.into(),
            headless,
        }
    }

    async fn connect(&self, interactive: bool) -> Result<Client, RefreshError> {
        let mut args = vec![
            "--no-sandbox".to_owned(),
            "--disable-dev-shm-usage".to_owned(),
            "--window-size=1280,1024".to_owned(),
        ];
        if self.headless && !interactive {
            args.push("--headless=new".to_owned());
        }

        let mut caps = serde_json::map::Map::new();
        caps.insert(
            "goog:chromeOptions".to_owned(),
            serde_json::json!({ "args": args }),
        );

        let mut builder = ClientBuilder::rustls().map_err(fault)?;
        builder.capabilities(caps);
        builder.connect(&self.webdriver_url).await.map_err(fault)
    }

    async fn drive_login(
        &self,
        c: &Client,
        identity: &str,
        secret: &str,
        interactive: bool,
    ) -> Result<SessionCredentials, RefreshError> {
        c.goto(LOGIN_URL).await.map_err(fault)?;

        // The login page links out to the Kakao identity provider. Navigating
        // to the link target directly is more reliable than clicking through
        // page scripts.
        let entry = c
            .wait()
            .at_most(Duration::from_secs(10))
            .for_element(Locator::Css("a[href*='kakao'], button[class*='kakao']"))
            .await
            .map_err(|_| {
                RefreshError::AutomationFault("kakao login entry not found on login page".to_owned())
            })?;
        match entry.attr("href").await.map_err(fault)? {
            Some(href) => c.goto(&href).await.map_err(fault)?,
            None => {
                entry.click().await.map_err(fault)?;
            }
        }

        let identity_field = c
            .wait()
            .at_most(Duration::from_secs(15))
            .for_element(Locator::Css(
                "input[name='loginKey'], input[id*='loginKey'], input[type='email']",
            ))
            .await
            .map_err(|_| {
                RefreshError::AutomationFault("identity field not found on provider page".to_owned())
            })?;
        identity_field.send_keys(identity).await.map_err(fault)?;

        // Some provider variants reveal the password field only after a
        // "next" step.
        let password_locator =
            Locator::Css("input[name='password'], input[type='password']");
        let password_field = match c.find(password_locator).await {
            Ok(field) => field,
            Err(_) => {
                if let Ok(next) = c.find(Locator::Css("button[type='submit']")).await {
                    let _ = next.click().await;
                }
                c.wait()
                    .at_most(Duration::from_secs(10))
                    .for_element(password_locator)
                    .await
                    .map_err(|_| {
                        RefreshError::AutomationFault(
                            "password field not found on provider page".to_owned(),
                        )
                    })?
            }
        };
        password_field.send_keys(secret).await.map_err(fault)?;

        c.find(Locator::Css("button[type='submit'], input[type='submit']"))
            .await
            .map_err(|_| RefreshError::AutomationFault("submit button not found".to_owned()))?
            .click()
            .await
            .map_err(fault)?;

        // The flow ends in one of three places: back on tistory.com
        // (success), a visible provider error (rejected credentials), or
        // stuck on the provider (verification challenge).
        let deadline = if interactive {
            Duration::from_secs(180)
        } else {
            Duration::from_secs(30)
        };
        let started = tokio::time::Instant::now();
        loop {
            tokio::time::sleep(Duration::from_secs(2)).await;

            let url = c.current_url().await.map_err(fault)?;
            let host = url.host_str().unwrap_or_default();
            if host.ends_with("tistory.com") && !url.path().contains("login") {
                debug!(%url, "identity provider redirected back to the blog host");
                break;
            }

            if let Ok(error_el) = c
                .find(Locator::Css(".error_txt, .desc_error, p[class*='error']"))
                .await
                && let Ok(text) = error_el.text().await
                && !text.trim().is_empty()
            {
                debug!(error = %text.trim(), "provider rejected the login");
                return Err(RefreshError::LoginRejected);
            }

            if started.elapsed() >= deadline {
                return Err(RefreshError::ChallengeRequired);
            }
        }

        // Harvest from the blog origin so domain-scoped cookies are visible.
        c.goto(BASE_URL).await.map_err(fault)?;
        let cookies = c.get_all_cookies().await.map_err(fault)?;
        let pairs: Vec<(String, String)> = cookies
            .iter()
            .map(|cookie| (cookie.name().to_owned(), cookie.value().to_owned()))
            .collect();
        let header = session_cookie_header(&pairs);
        if header.is_empty() {
            return Err(RefreshError::AutomationFault(
                "login completed but no session cookies were present".to_owned(),
            ));
        }

        info!(cookies = pairs.len(), "session cookies harvested");
        Ok(SessionCredentials::automated(header))
    }
}

#[async_trait]
impl SessionRefresher for WebDriverRefresher {
    async fn refresh(
        &self,
        identity: &str,
        secret: &str,
        interactive: bool,
    ) -> Result<SessionCredentials, RefreshError> {
        info!(interactive, "starting browser-driven session refresh");
        let client = self.connect(interactive).await?;
        let result = self.drive_login(&client, identity, secret, interactive).await;
        // Best effort: an unreachable driver should not mask the login outcome.
        let _ = client.close().await;
        result
    }
}

/// Build a cookie header from the session-relevant subset of cookies.
fn session_cookie_header(cookies: &[(String, String)]) -> String {
    cookies
        .iter()
        .filter(|(name, _)| is_session_cookie(name))
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ")
}

fn is_session_cookie(name: &str) -> bool {
    let upper = name.to_uppercase();
    SESSION_COOKIE_NAMES.iter().any(|n| upper.contains(n))
}

fn fault(e: impl std::fmt::Display) -> RefreshError {
    RefreshError::AutomationFault(e.to_string())
}
