//! One publish cycle, start to finish.
//!
//! The pipeline owns the persisted stores and the collaborator boundaries
//! and runs exactly one cycle per invocation: pick the next pending item,
//! make sure the session is worth trying, generate and render the review,
//! submit it, and only then commit progress. A failed cycle leaves every
//! store untouched: the item stays pending and is retried on the next
//! scheduled trigger (at-least-once, never at-most-zero).

use crate::config::AppConfig;
use crate::content::{self, ReviewGenerator};
use crate::counter::PostCounter;
use crate::credentials::{CredentialStore, SessionCredentials};
use crate::error::{PosterError, Result};
use crate::publish::{CategoryId, PostDraft, PostReceipt, PublishError, TistoryClient, Visibility};
use crate::queue::{QueueItem, WorkQueue};
use crate::session::SessionRefresher;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Per-cycle settings distilled from the configuration document.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Category name to resolve on the editor page.
    pub category_name: String,
    /// Pinned category id; skips resolution when set.
    pub category_id: Option<String>,
    /// Tags attached to every post.
    pub tags: Vec<String>,
    /// Refresh proactively when the stored cookie goes stale.
    pub auto_refresh: bool,
    /// Identity-provider account for refreshes.
    pub refresh_identity: String,
    /// Identity-provider password for refreshes.
    pub refresh_secret: String,
    /// Directory for markdown backups.
    pub output_dir: PathBuf,
    /// Config document to write refreshed cookies back into.
    pub config_path: Option<PathBuf>,
}

impl PipelineSettings {
    /// Distill pipeline settings from the loaded configuration.
    #[must_use]
    pub fn from_config(config: &AppConfig, config_path: Option<PathBuf>) -> Self {
        Self {
            category_name: config.category.name.clone(),
            category_id: config.category.id.clone(),
            tags: config.post.tags.clone(),
            auto_refresh: config.refresh.auto,
            refresh_identity: config.refresh.identity.clone(),
            refresh_secret: config.refresh.secret.clone(),
            output_dir: config
                .post
                .output_dir
                .clone()
                .unwrap_or_else(crate::app_dirs::output_dir),
            config_path,
        }
    }

    fn has_refresh_credentials(&self) -> bool {
        !self.refresh_identity.trim().is_empty() && !self.refresh_secret.trim().is_empty()
    }
}

/// How a cycle ended, short of an error.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    /// One item was published and committed.
    Published {
        /// Queue item that was published.
        item_id: String,
        /// Ordinal consumed from the post counter.
        ordinal: u64,
        /// Public URL read back from the surface, when available.
        url: Option<String>,
    },
    /// The backlog is exhausted; nothing to do.
    NothingPending,
}

/// The publish pipeline with injected stores and collaborators.
pub struct PublishPipeline {
    credentials: CredentialStore,
    queue: WorkQueue,
    counter: PostCounter,
    client: TistoryClient,
    refresher: Arc<dyn SessionRefresher>,
    generator: Arc<dyn ReviewGenerator>,
    settings: PipelineSettings,
}

impl PublishPipeline {
    /// Assemble a pipeline from its parts.
    #[must_use]
    pub fn new(
        credentials: CredentialStore,
        queue: WorkQueue,
        counter: PostCounter,
        client: TistoryClient,
        refresher: Arc<dyn SessionRefresher>,
        generator: Arc<dyn ReviewGenerator>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            credentials,
            queue,
            counter,
            client,
            refresher,
            generator,
            settings,
        }
    }

    /// Run exactly one publish cycle.
    ///
    /// On any fatal-this-cycle error the queue, counter, and credential
    /// stores are left exactly as they were.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
        let Some(item) = self.queue.next_pending().cloned() else {
            info!("work queue exhausted; nothing to publish");
            return Ok(CycleOutcome::NothingPending);
        };
        info!(item = %item.id, rank = item.rank, title = %item.paper.title, "starting publish cycle");

        self.ensure_fresh_session().await;

        let ordinal = self.counter.peek_next();
        let review = self
            .generator
            .generate(&item.paper, ordinal)
            .await
            .map_err(|e| PosterError::Content(e.to_string()))?;

        let title = content::title::post_title(&item.paper.title);
        let markdown = content::compose_document(&item.paper, &review.markdown);
        self.back_up_markdown(&item, &markdown);
        let html = content::render::markdown_to_html(&markdown);

        let receipt = match self.resolve_and_submit(&title, &html).await {
            Ok(receipt) => receipt,
            Err(PublishError::AuthExpired) => {
                warn!("publish surface rejected the session; attempting one reactive refresh");
                self.reactive_refresh().await?;
                self.resolve_and_submit(&title, &html)
                    .await
                    .map_err(map_publish)?
            }
            Err(e) => return Err(map_publish(e)),
        };

        // Commit order: counter first, then the completion mark. A crash
        // between the two leaves the counter advanced and the item pending,
        // which the next cycle resolves by republishing (accepted
        // at-least-once window).
        let ordinal = self.counter.commit()?;
        self.queue.mark_completed(&item.id)?;

        info!(
            item = %item.id,
            ordinal,
            url = receipt.url.as_deref().unwrap_or("n/a"),
            "publish cycle committed"
        );
        Ok(CycleOutcome::Published {
            item_id: item.id,
            ordinal,
            url: receipt.url,
        })
    }

    /// Proactive freshness check before the cycle does real work.
    ///
    /// A stale cookie with no way to refresh is not fatal here: freshness is
    /// a heuristic, and the reactive path still covers an actual expiry.
    async fn ensure_fresh_session(&mut self) {
        if self.credentials.is_usable() {
            return;
        }

        if !(self.settings.auto_refresh && self.settings.has_refresh_credentials()) {
            warn!(
                last_refreshed = %self.credentials.last_refreshed_at(),
                "session material is stale and automatic refresh is disabled; trying it anyway"
            );
            return;
        }

        info!("session material is stale; refreshing proactively");
        match self
            .refresher
            .refresh(
                &self.settings.refresh_identity,
                &self.settings.refresh_secret,
                false,
            )
            .await
        {
            Ok(material) => {
                if let Err(e) = self.adopt_session(material) {
                    warn!(error = %e, "cannot persist refreshed session; keeping previous material");
                }
            }
            Err(e) => {
                warn!(error = %e, "proactive session refresh failed; trying the stored cookie");
            }
        }
    }

    /// Exactly-once reactive refresh after an authentication failure.
    async fn reactive_refresh(&mut self) -> Result<()> {
        if !self.settings.has_refresh_credentials() {
            return Err(PosterError::Refresh(
                "session expired and no refresh credentials are configured".to_owned(),
            ));
        }

        let material = self
            .refresher
            .refresh(
                &self.settings.refresh_identity,
                &self.settings.refresh_secret,
                false,
            )
            .await
            .map_err(|e| PosterError::Refresh(e.to_string()))?;
        self.adopt_session(material)
    }

    fn adopt_session(&mut self, material: SessionCredentials) -> Result<()> {
        let cookie = material.cookie_header.clone();
        self.credentials.replace(material)?;

        // The config document mirrors the cookie so the operator (and the
        // next process start) sees current material. The store is already
        // persisted, so a write-back failure is only worth a warning.
        if let Some(path) = &self.settings.config_path
            && let Err(e) = crate::config::write_back_cookie(path, &cookie)
        {
            warn!(error = %e, "cannot write refreshed cookie back to config");
        }
        Ok(())
    }

    async fn resolve_and_submit(
        &self,
        title: &str,
        html: &str,
    ) -> std::result::Result<PostReceipt, PublishError> {
        let cookie = self.credentials.cookie_header();

        let category = match &self.settings.category_id {
            Some(id) => CategoryId(id.clone()),
            None => match self
                .client
                .resolve_category(&self.settings.category_name, cookie)
                .await?
            {
                Some(id) => id,
                None => {
                    warn!(
                        category = %self.settings.category_name,
                        "category not found on the blog; filing as uncategorized"
                    );
                    CategoryId::uncategorized()
                }
            },
        };

        let draft = PostDraft {
            title: title.to_owned(),
            html: html.to_owned(),
            category,
            tags: self.settings.tags.clone(),
            visibility: Visibility::Public,
        };
        self.client.submit_post(&draft, cookie).await
    }

    fn back_up_markdown(&self, item: &QueueItem, markdown: &str) {
        let dir = &self.settings.output_dir;
        let path = dir.join(content::backup_filename(&item.paper));
        let result = std::fs::create_dir_all(dir).and_then(|()| std::fs::write(&path, markdown));
        match result {
            Ok(()) => info!(path = %path.display(), "markdown backup written"),
            Err(e) => warn!(error = %e, path = %path.display(), "cannot write markdown backup"),
        }
    }
}

fn map_publish(e: PublishError) -> PosterError {
    if let PublishError::EndpointChanged(_) = &e {
        error!(error = %e, "publish surface contract drift; operator intervention required");
    }
    PosterError::Publish(e.to_string())
}
