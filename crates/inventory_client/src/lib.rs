//! List synchronization and mutation controller for the inventory service.
//!
//! [`ListFetcher`] owns the displayed page and the query that produced it,
//! [`MutationController`] validates and submits changes and asks the fetcher
//! to refresh afterwards. Both talk to the service through [`ProductApi`] and
//! report to a [`NotificationSink`]; credentials come from a
//! [`SessionContext`] supplied by the host.

use std::sync::Arc;

pub mod classifier;
pub mod config;
pub mod fetcher;
pub mod mutation;
pub mod notify;
pub mod query;
pub mod session;
pub mod transport;

pub use classifier::{ClassifiedError, ErrorClassifier, FieldError, Operation};
pub use config::{load_settings, Settings};
pub use fetcher::{FetchOutcome, ListFetcher, ListView, RequestToken};
pub use mutation::{DeleteOutcome, EditorMode, EditorState, MutationController, ProductDraft};
pub use notify::{
    BroadcastNotifier, Notification, NotificationDurations, NotificationKind, NotificationSink,
    Reporter,
};
pub use query::{QueryAction, QueryState};
pub use session::{AnonymousSession, InMemorySession, SessionContext};
pub use transport::{ApiFailure, HttpProductApi, ProductApi};

/// Fetcher and mutation controller wired to the same service and session.
pub struct InventoryClient {
    pub list: Arc<ListFetcher>,
    pub mutations: MutationController,
}

impl InventoryClient {
    pub fn new(
        api: Arc<dyn ProductApi>,
        session: Arc<dyn SessionContext>,
        notifier: Arc<dyn NotificationSink>,
        settings: &Settings,
    ) -> Self {
        let reporter = Reporter::new(notifier, session, settings.notifications);
        let list = Arc::new(ListFetcher::new(
            Arc::clone(&api),
            reporter.clone(),
            QueryState::with_page_size(settings.page_size as i64),
        ));
        let mutations = MutationController::new(api, Arc::clone(&list), reporter);
        Self { list, mutations }
    }

    /// Builds the HTTP transport from `settings` and wires everything to it.
    pub fn connect(
        settings: &Settings,
        session: Arc<dyn SessionContext>,
        notifier: Arc<dyn NotificationSink>,
    ) -> anyhow::Result<Self> {
        let api = HttpProductApi::new(
            &settings.server_url,
            settings.request_timeout,
            Arc::clone(&session),
        )?;
        Ok(Self::new(Arc::new(api), session, notifier, settings))
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
