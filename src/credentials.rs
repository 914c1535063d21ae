//! Session credential state and freshness tracking.
//!
//! The credential store is pure state: it holds the current session cookie
//! header and the instant it was last refreshed, and answers whether that
//! material is still worth trying. Freshness is a time-based heuristic, not a
//! guarantee of server-side validity: the remote session may be revoked
//! earlier, which the publish client surfaces as an authentication failure.
//!
//! The store never performs network I/O. Minting new material is the
//! [`crate::session`] module's job; the store only records the result.

use crate::error::{PosterError, Result};
use crate::storage;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the current session material came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    /// Pasted into the config by the operator.
    Manual,
    /// Minted by the browser-driven refresher.
    Automated,
}

/// Opaque session material for the publish surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCredentials {
    /// Cookie header value (`"TSSESSION=...; _T_ANO=..."`).
    pub cookie_header: String,
    /// When this material was obtained.
    pub last_refreshed_at: DateTime<Utc>,
    /// How this material was obtained.
    pub source: CredentialSource,
}

impl SessionCredentials {
    /// Session material freshly minted by the automated refresher.
    #[must_use]
    pub fn automated(cookie_header: String) -> Self {
        Self {
            cookie_header,
            last_refreshed_at: Utc::now(),
            source: CredentialSource::Automated,
        }
    }
}

/// Persistent store for the daemon's session material.
///
/// Mutated only through [`CredentialStore::replace`]; the replacement is
/// persisted atomically before the call returns.
pub struct CredentialStore {
    current: SessionCredentials,
    path: PathBuf,
    max_age: Duration,
}

impl CredentialStore {
    /// Open the store, reconciling the persisted state with the cookie from
    /// the configuration document.
    ///
    /// A config cookie that differs from the persisted one means the operator
    /// pasted fresh material; it is adopted with a fresh timestamp and
    /// persisted. An empty config cookie with no persisted state yields an
    /// empty store (`is_usable()` is `false` until a refresh succeeds).
    pub fn open(path: PathBuf, config_cookie: &str, max_age_days: u32) -> Result<Self> {
        let persisted: Option<SessionCredentials> =
            storage::load_json(&path).map_err(|e| PosterError::Credentials(e.to_string()))?;
        let config_cookie = config_cookie.trim();

        let current = match persisted {
            Some(state) if config_cookie.is_empty() || state.cookie_header == config_cookie => {
                state
            }
            _ => {
                let state = SessionCredentials {
                    cookie_header: config_cookie.to_owned(),
                    last_refreshed_at: Utc::now(),
                    source: CredentialSource::Manual,
                };
                storage::save_json(&path, &state)
                    .map_err(|e| PosterError::Credentials(e.to_string()))?;
                state
            }
        };

        Ok(Self {
            current,
            path,
            max_age: Duration::days(i64::from(max_age_days)),
        })
    }

    /// Returns `true` when session material is present and not older than the
    /// configured maximum age.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        !self.current.cookie_header.is_empty()
            && Utc::now() - self.current.last_refreshed_at <= self.max_age
    }

    /// Current cookie header value.
    #[must_use]
    pub fn cookie_header(&self) -> &str {
        &self.current.cookie_header
    }

    /// When the current material was obtained.
    #[must_use]
    pub fn last_refreshed_at(&self) -> DateTime<Utc> {
        self.current.last_refreshed_at
    }

    /// Atomically replace the stored material, persisting before returning.
    ///
    /// The refresh timestamp only moves forward: a replacement carrying an
    /// older instant is clamped to the stored one.
    pub fn replace(&mut self, mut material: SessionCredentials) -> Result<()> {
        material.last_refreshed_at = material
            .last_refreshed_at
            .max(self.current.last_refreshed_at);
        storage::save_json(&self.path, &material)
            .map_err(|e| PosterError::Credentials(e.to_string()))?;
        self.current = material;
        Ok(())
    }

    #[cfg(test)]
    fn backdate(&mut self, days: i64) {
        self.current.last_refreshed_at = Utc::now() - Duration::days(days);
    }
}
