//! Race-safe synchronization of the displayed product page.
//!
//! Every fetch mints a [`RequestToken`] and records it as the latest one.
//! A response is applied only if its token is still the latest when it
//! arrives; anything older is dropped without touching the view, raising a
//! notification, or tearing down the session. Superseded requests keep
//! running on the wire, their results simply never land.

use std::sync::Arc;

use shared::protocol::{PageResult, PageShape, Product};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    classifier::{ClassifiedError, ErrorClassifier, Operation},
    notify::Reporter,
    query::{QueryAction, QueryState},
    transport::ProductApi,
};

/// Sequence number of an issued list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// What the list currently shows.
#[derive(Debug, Clone, Default)]
pub struct ListView {
    pub query: QueryState,
    /// Last accepted page; `None` until a fetch succeeds.
    pub page: Option<PageResult>,
    /// Failure of the latest fetch, cleared by the next accepted page.
    pub error: Option<ClassifiedError>,
    pub loading: bool,
    pub latest: Option<RequestToken>,
}

impl ListView {
    pub fn products(&self) -> &[Product] {
        self.page
            .as_ref()
            .map(|page| page.content.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied(PageResult),
    /// A newer request was issued before this one answered.
    Stale(RequestToken),
}

struct ListState {
    view: ListView,
    issued: u64,
}

impl ListState {
    /// Mints the next token and makes `query` the one the view follows.
    fn issue(&mut self, query: &QueryState) -> RequestToken {
        self.issued += 1;
        let token = RequestToken(self.issued);
        self.view.latest = Some(token);
        self.view.query = query.clone();
        self.view.loading = true;
        token
    }
}

pub struct ListFetcher {
    api: Arc<dyn ProductApi>,
    classifier: ErrorClassifier,
    reporter: Reporter,
    state: Mutex<ListState>,
}

impl ListFetcher {
    pub fn new(api: Arc<dyn ProductApi>, reporter: Reporter, initial: QueryState) -> Self {
        Self {
            api,
            classifier: ErrorClassifier,
            reporter,
            state: Mutex::new(ListState {
                view: ListView {
                    query: initial,
                    ..ListView::default()
                },
                issued: 0,
            }),
        }
    }

    pub async fn snapshot(&self) -> ListView {
        self.state.lock().await.view.clone()
    }

    pub async fn current_query(&self) -> QueryState {
        self.state.lock().await.view.query.clone()
    }

    /// Runs `action` through the query transition table, then fetches.
    pub async fn apply(&self, action: QueryAction) -> Result<FetchOutcome, ClassifiedError> {
        let next = self.current_query().await.apply(action);
        self.fetch(next).await
    }

    /// Re-issues the current query at `page_index`. Repeating it is harmless:
    /// each call supersedes the previous one.
    pub async fn refresh(&self, page_index: u32) -> Result<FetchOutcome, ClassifiedError> {
        let query = self.current_query().await.set_page(page_index as i64);
        self.fetch(query).await
    }

    pub async fn refresh_current(&self) -> Result<FetchOutcome, ClassifiedError> {
        let page_index = self.current_query().await.page_index();
        self.refresh(page_index).await
    }

    pub async fn fetch(&self, query: QueryState) -> Result<FetchOutcome, ClassifiedError> {
        let mut query = query;
        let mut clamped = false;
        let mut token = self.state.lock().await.issue(&query);

        loop {
            debug!(
                token = token.value(),
                page = query.page_index(),
                size = query.page_size(),
                sort_by = query.sort_field().as_param(),
                sort_dir = query.sort_direction().as_param(),
                "list: fetch issued"
            );

            let result = self.api.list(&query).await;

            let mut guard = self.state.lock().await;
            if guard.view.latest != Some(token) {
                debug!(
                    token = token.value(),
                    latest = guard.view.latest.map(RequestToken::value),
                    "list: discarding stale response"
                );
                return Ok(FetchOutcome::Stale(token));
            }

            let page = match result {
                Ok(page) => page,
                Err(failure) => {
                    let error = self.classifier.classify(Operation::List, &failure);
                    warn!(token = token.value(), "list: fetch failed: {failure}");
                    return Err(self.fail(guard, error));
                }
            };

            match page.shape() {
                PageShape::Consistent => {
                    info!(
                        token = token.value(),
                        page = page.page_number,
                        total_pages = page.total_pages,
                        total_elements = page.total_elements,
                        "list: page applied"
                    );
                    guard.view.page = Some(page.clone());
                    guard.view.error = None;
                    guard.view.loading = false;
                    return Ok(FetchOutcome::Applied(page));
                }
                PageShape::OutOfRange { last_page } if !clamped => {
                    info!(
                        requested = query.page_index(),
                        last_page, "list: page no longer exists, clamping"
                    );
                    clamped = true;
                    query = query.set_page(last_page as i64);
                    // Minted before the guard drops; fetches queued behind us stay newer.
                    token = guard.issue(&query);
                }
                PageShape::OutOfRange { last_page } => {
                    warn!(last_page, "list: clamped page still out of range");
                    let error = self.classifier.malformed(Operation::List);
                    return Err(self.fail(guard, error));
                }
                PageShape::Malformed(reason) => {
                    warn!(token = token.value(), "list: rejecting page: {reason}");
                    let error = self.classifier.malformed(Operation::List);
                    return Err(self.fail(guard, error));
                }
            }
        }
    }

    /// Records a failure of the latest request. The displayed page stays.
    fn fail(
        &self,
        mut guard: tokio::sync::MutexGuard<'_, ListState>,
        error: ClassifiedError,
    ) -> ClassifiedError {
        guard.view.error = Some(error.clone());
        guard.view.loading = false;
        drop(guard);
        self.reporter.failure(&error);
        error
    }
}

#[cfg(test)]
#[path = "tests/fetcher_tests.rs"]
mod tests;
