//! In-memory product service and recording collaborators for controller tests.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex as StdMutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::NaiveDate;
use shared::{
    domain::ProductId,
    protocol::{PageResult, Product, ProductPayload},
};
use tokio::sync::{oneshot, Mutex};

use crate::{
    notify::{Notification, NotificationDurations, NotificationKind, NotificationSink, Reporter},
    query::QueryState,
    session::InMemorySession,
    transport::{ApiFailure, ProductApi},
};

pub(crate) type ListReplyResult = Result<PageResult, ApiFailure>;

pub(crate) enum ListReply {
    Now(ListReplyResult),
    Gated(oneshot::Receiver<ListReplyResult>),
}

/// Paginates an in-memory catalogue the way the service does, unless a
/// scripted reply is queued for the next list call.
#[derive(Default)]
pub(crate) struct FakeProductApi {
    catalogue: Mutex<Vec<Product>>,
    list_requests: Mutex<Vec<QueryState>>,
    list_replies: Mutex<VecDeque<ListReply>>,
    created: Mutex<Vec<ProductPayload>>,
    updated: Mutex<Vec<(ProductId, ProductPayload)>>,
    deleted: Mutex<Vec<ProductId>>,
    next_mutation_failure: Mutex<Option<ApiFailure>>,
}

impl FakeProductApi {
    pub(crate) fn with_products(count: i64) -> Arc<Self> {
        let api = Self::default();
        api.catalogue
            .try_lock()
            .expect("fresh catalogue")
            .extend((1..=count).map(product));
        Arc::new(api)
    }

    pub(crate) async fn queue_list_reply(&self, reply: ListReply) {
        self.list_replies.lock().await.push_back(reply);
    }

    pub(crate) async fn gate_next_list(&self) -> oneshot::Sender<ListReplyResult> {
        let (tx, rx) = oneshot::channel();
        self.queue_list_reply(ListReply::Gated(rx)).await;
        tx
    }

    pub(crate) async fn fail_next_mutation(&self, failure: ApiFailure) {
        *self.next_mutation_failure.lock().await = Some(failure);
    }

    pub(crate) async fn list_requests(&self) -> Vec<QueryState> {
        self.list_requests.lock().await.clone()
    }

    pub(crate) async fn requested_pages(&self) -> Vec<u32> {
        self.list_requests
            .lock()
            .await
            .iter()
            .map(QueryState::page_index)
            .collect()
    }

    pub(crate) async fn clear_requests(&self) {
        self.list_requests.lock().await.clear();
    }

    pub(crate) async fn created(&self) -> Vec<ProductPayload> {
        self.created.lock().await.clone()
    }

    pub(crate) async fn updated(&self) -> Vec<(ProductId, ProductPayload)> {
        self.updated.lock().await.clone()
    }

    pub(crate) async fn deleted(&self) -> Vec<ProductId> {
        self.deleted.lock().await.clone()
    }

    /// Waits until `count` list requests have reached the service.
    pub(crate) async fn wait_for_list_requests(&self, count: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while self.list_requests.lock().await.len() < count {
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
        })
        .await
        .expect("list requests never arrived");
    }

    async fn take_mutation_failure(&self) -> Result<(), ApiFailure> {
        match self.next_mutation_failure.lock().await.take() {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }

    async fn paginate(&self, query: &QueryState) -> PageResult {
        let catalogue = self.catalogue.lock().await;
        let term = query.search_term().trim().to_ascii_lowercase();
        let matching: Vec<&Product> = catalogue
            .iter()
            .filter(|product| term.is_empty() || product.name.to_ascii_lowercase().contains(&term))
            .collect();

        let size = query.page_size() as usize;
        let total_elements = matching.len();
        let total_pages = total_elements.div_ceil(size);
        let content = matching
            .into_iter()
            .skip(query.page_index() as usize * size)
            .take(size)
            .cloned()
            .collect();

        PageResult {
            content,
            page_number: query.page_index(),
            total_pages: total_pages as u32,
            total_elements: total_elements as u64,
        }
    }
}

#[async_trait]
impl ProductApi for FakeProductApi {
    async fn list(&self, query: &QueryState) -> Result<PageResult, ApiFailure> {
        let scripted = {
            let mut requests = self.list_requests.lock().await;
            requests.push(query.clone());
            self.list_replies.lock().await.pop_front()
        };
        match scripted {
            Some(ListReply::Now(reply)) => reply,
            Some(ListReply::Gated(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(ApiFailure::Network("gate dropped".into()))),
            None => Ok(self.paginate(query).await),
        }
    }

    async fn get(&self, id: ProductId) -> Result<Product, ApiFailure> {
        self.catalogue
            .lock()
            .await
            .iter()
            .find(|product| product.id == id)
            .cloned()
            .ok_or_else(|| ApiFailure::status(404, format!("Product not found with ID: {id}")))
    }

    async fn create(&self, payload: &ProductPayload) -> Result<Product, ApiFailure> {
        self.created.lock().await.push(payload.clone());
        self.take_mutation_failure().await?;

        let mut catalogue = self.catalogue.lock().await;
        let next_id = catalogue.iter().map(|product| product.id.0).max().unwrap_or(0) + 1;
        let created = Product {
            id: ProductId(next_id),
            name: payload.name.clone(),
            description: payload.description.clone(),
            price: payload.price,
            quantity: payload.quantity,
            created_at: timestamp(),
            updated_at: None,
        };
        catalogue.push(created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        id: ProductId,
        payload: &ProductPayload,
    ) -> Result<Product, ApiFailure> {
        self.updated.lock().await.push((id, payload.clone()));
        self.take_mutation_failure().await?;

        let mut catalogue = self.catalogue.lock().await;
        let existing = catalogue
            .iter_mut()
            .find(|product| product.id == id)
            .ok_or_else(|| ApiFailure::status(404, format!("Product not found with ID: {id}")))?;
        existing.name = payload.name.clone();
        existing.description = payload.description.clone();
        existing.price = payload.price;
        existing.quantity = payload.quantity;
        existing.updated_at = Some(timestamp());
        Ok(existing.clone())
    }

    async fn delete(&self, id: ProductId) -> Result<(), ApiFailure> {
        self.deleted.lock().await.push(id);
        self.take_mutation_failure().await?;

        let mut catalogue = self.catalogue.lock().await;
        let before = catalogue.len();
        catalogue.retain(|product| product.id != id);
        if catalogue.len() == before {
            return Err(ApiFailure::status(404, format!("Product not found with id: {id}")));
        }
        Ok(())
    }

    async fn check_stock(&self, id: ProductId, quantity: u32) -> Result<bool, ApiFailure> {
        Ok(self.get(id).await?.quantity >= quantity)
    }
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    received: StdMutex<Vec<Notification>>,
}

impl RecordingSink {
    pub(crate) fn all(&self) -> Vec<Notification> {
        self.received.lock().expect("sink lock").clone()
    }

    pub(crate) fn errors(&self) -> Vec<String> {
        self.messages(NotificationKind::Error)
    }

    pub(crate) fn successes(&self) -> Vec<String> {
        self.messages(NotificationKind::Success)
    }

    fn messages(&self, kind: NotificationKind) -> Vec<String> {
        self.all()
            .into_iter()
            .filter(|notification| notification.kind == kind)
            .map(|notification| notification.message)
            .collect()
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: Notification) {
        self.received.lock().expect("sink lock").push(notification);
    }
}

pub(crate) struct Harness {
    pub(crate) sink: Arc<RecordingSink>,
    pub(crate) session: Arc<InMemorySession>,
    pub(crate) reporter: Reporter,
}

pub(crate) fn harness() -> Harness {
    let sink = Arc::new(RecordingSink::default());
    let session = Arc::new(InMemorySession::new(Some("mock-token-1".into())));
    let reporter = Reporter::new(
        sink.clone(),
        session.clone(),
        NotificationDurations::default(),
    );
    Harness {
        sink,
        session,
        reporter,
    }
}

pub(crate) fn timestamp() -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 1)
        .and_then(|date| date.and_hms_opt(10, 15, 30))
        .expect("valid timestamp")
}

pub(crate) fn product(id: i64) -> Product {
    Product {
        id: ProductId(id),
        name: format!("Product {id:03}"),
        description: format!("Stock item number {id}"),
        price: "4.50".parse().expect("decimal"),
        quantity: 5,
        created_at: timestamp(),
        updated_at: None,
    }
}

pub(crate) fn page_of(ids: &[i64], page_number: u32, total_pages: u32, total_elements: u64) -> PageResult {
    PageResult {
        content: ids.iter().copied().map(product).collect(),
        page_number,
        total_pages,
        total_elements,
    }
}
