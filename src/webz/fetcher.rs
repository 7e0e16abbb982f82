use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};
use url::Url;

use super::models::WebzResponse;
use super::query::WebzQueryBuilder;
use crate::config::Config;
use crate::constants::{INITIAL_PAGE_SIZE, USER_AGENT};
use crate::db::PostRepository;

/// Outcome of a completed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchSummary {
    /// Posts newly saved across every page.
    pub retrieved: u64,
    /// Total results the API reported, or `retrieved` when the fetch stopped early.
    pub total: u64,
}

/// Fetches every page of a search and stores the posts.
pub struct WebzService<R> {
    client: reqwest::Client,
    token: String,
    base_url: String,
    request_delay: Duration,
    repository: R,
}

impl<R: PostRepository> WebzService<R> {
    /// Create a service with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &Config, repository: R) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self::with_client(client, config, repository))
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client, config: &Config, repository: R) -> Self {
        Self {
            client,
            token: config.api_token.clone(),
            base_url: config.api_base_url.clone(),
            request_delay: config.request_delay,
            repository,
        }
    }

    #[must_use]
    pub const fn repository(&self) -> &R {
        &self.repository
    }

    /// Fetch all posts matching `query`, saving each page as it arrives.
    ///
    /// `on_complete` is called with `(retrieved, total)` once pagination
    /// ends. If a page fails after earlier pages saved posts, the fetch
    /// stops there and reports the saved count as both numbers.
    ///
    /// # Errors
    ///
    /// Returns an error if the tables cannot be created, or if a request
    /// or save fails before any post was saved. `on_complete` is not called
    /// in that case.
    pub async fn fetch_posts<F>(&self, query: &str, on_complete: F) -> Result<FetchSummary>
    where
        F: FnOnce(u64, u64),
    {
        match self.run(query).await {
            Ok(summary) => {
                on_complete(summary.retrieved, summary.total);
                Ok(summary)
            }
            Err(e) => {
                error!("Error fetching posts from Webz.io API: {e:#}");
                Err(e)
            }
        }
    }

    async fn run(&self, query: &str) -> Result<FetchSummary> {
        self.repository.create_tables_if_not_exist().await?;

        let url = WebzQueryBuilder::new(&self.token, &self.base_url)?
            .with_query(query)
            .with_size(INITIAL_PAGE_SIZE)
            .with_highlight(true)
            .build();

        self.paginate(url).await
    }

    async fn paginate(&self, mut url: Url) -> Result<FetchSummary> {
        let mut retrieved = 0u64;

        loop {
            let page = match self.fetch_page(&url).await {
                Ok(page) => page,
                Err(e) => return stop_early(retrieved, e),
            };

            info!(
                posts = page.posts.len(),
                more_available = page.more_results_available,
                "Received page"
            );
            if let Some(requests_left) = page.requests_left {
                debug!(requests_left, "API quota");
            }
            if let Some(warnings) = page.warnings.as_deref().filter(|w| !w.is_empty()) {
                warn!(warnings = %warnings, "API returned warnings");
            }

            if !page.posts.is_empty() {
                match self.repository.save_posts(&page.posts).await {
                    Ok(saved) => {
                        info!(saved, "Saved posts to the database");
                        retrieved += saved;
                    }
                    Err(e) => return stop_early(retrieved, e),
                }
            }

            let Some(next) = page.next_page() else {
                info!(retrieved, total = page.total_results, "Finished retrieving posts");
                return Ok(FetchSummary {
                    retrieved,
                    total: page.total_results,
                });
            };

            url = match self.next_page_url(next) {
                Ok(next_url) => next_url,
                Err(e) => return stop_early(retrieved, e),
            };

            info!(retrieved, "Continuing to next page");
            tokio::time::sleep(self.request_delay).await;
        }
    }

    async fn fetch_page(&self, url: &Url) -> Result<WebzResponse> {
        info!(url = %redact_token(url), "Fetching posts");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .context("Failed to fetch posts from Webz.io API")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Webz.io API request failed with status {status}");
        }

        response
            .json()
            .await
            .context("Failed to decode Webz.io API response")
    }

    fn next_page_url(&self, next: &str) -> Result<Url> {
        let url = WebzQueryBuilder::new(&self.token, &self.base_url)?
            .with_endpoint(next)?
            .build();
        Ok(url)
    }
}

/// Turn a mid-fetch failure into a partial result once something was saved.
fn stop_early(retrieved: u64, e: anyhow::Error) -> Result<FetchSummary> {
    if retrieved == 0 {
        return Err(e);
    }
    warn!(retrieved, "Stopping early after error: {e:#}");
    Ok(FetchSummary {
        retrieved,
        total: retrieved,
    })
}

/// Render `url` with the `token` parameter masked, for logging.
fn redact_token(url: &Url) -> String {
    let mut redacted = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "token" { "***".into() } else { v };
            (k.into_owned(), v.into_owned())
        })
        .collect();

    if !pairs.is_empty() {
        redacted.query_pairs_mut().clear().extend_pairs(pairs);
    }
    redacted.to_string()
}
