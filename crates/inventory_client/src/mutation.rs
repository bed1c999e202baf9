//! Create, update and delete, coordinated with the displayed list.

use std::{str::FromStr, sync::Arc};

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use shared::{
    domain::ProductId,
    protocol::{Product, ProductPayload},
};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    classifier::{ClassifiedError, ErrorClassifier, FieldError, Operation},
    fetcher::{ListFetcher, ListView},
    notify::Reporter,
    transport::ProductApi,
};

const NAME_MIN_CHARS: usize = 2;
const NAME_MAX_CHARS: usize = 100;
const DESCRIPTION_MAX_CHARS: usize = 500;
const PRICE_MAX_SCALE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Name,
    Description,
    Price,
    Quantity,
}

impl DraftField {
    pub fn as_str(self) -> &'static str {
        match self {
            DraftField::Name => "name",
            DraftField::Description => "description",
            DraftField::Price => "price",
            DraftField::Quantity => "quantity",
        }
    }
}

/// Form contents as typed by the operator, not yet validated.
///
/// Numbers stay text until validation so that "abc" in the price box is a
/// field error rather than a parse failure somewhere upstream. Server-owned
/// fields (`id`, `createdAt`) are ignored when a draft is deserialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProductDraft {
    #[serde(default, deserialize_with = "form_text")]
    pub name: String,
    #[serde(default, deserialize_with = "form_text")]
    pub description: String,
    #[serde(default, deserialize_with = "form_text")]
    pub price: String,
    #[serde(default, deserialize_with = "form_text")]
    pub quantity: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FormValue {
    Text(String),
    Number(serde_json::Number),
}

fn form_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<FormValue>::deserialize(deserializer)? {
        Some(FormValue::Text(text)) => text,
        Some(FormValue::Number(number)) => number.to_string(),
        None => String::new(),
    })
}

impl ProductDraft {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        price: impl Into<String>,
        quantity: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            price: price.into(),
            quantity: quantity.into(),
        }
    }

    pub fn from_product(product: &Product) -> Self {
        Self::new(
            product.name.clone(),
            product.description.clone(),
            product.price.to_string(),
            product.quantity.to_string(),
        )
    }

    /// Checks every field and returns either the wire payload or all field errors.
    pub fn validate(&self) -> Result<ProductPayload, Vec<FieldError>> {
        let mut errors = Vec::new();

        let name = self.name.trim();
        let name_len = name.chars().count();
        if name.is_empty() {
            errors.push(field_error(DraftField::Name, "Product name is required"));
        } else if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&name_len) {
            errors.push(field_error(
                DraftField::Name,
                "Product name must be between 2 and 100 characters",
            ));
        }

        let description = self.description.trim();
        if description.is_empty() {
            errors.push(field_error(
                DraftField::Description,
                "Product description is required",
            ));
        } else if description.chars().count() > DESCRIPTION_MAX_CHARS {
            errors.push(field_error(
                DraftField::Description,
                "Product description must be at most 500 characters",
            ));
        }

        let price = match parse_price(self.price.trim()) {
            Ok(price) => Some(price),
            Err(message) => {
                errors.push(field_error(DraftField::Price, message));
                None
            }
        };

        let quantity = match parse_quantity(self.quantity.trim()) {
            Ok(quantity) => Some(quantity),
            Err(message) => {
                errors.push(field_error(DraftField::Quantity, message));
                None
            }
        };

        match (price, quantity) {
            (Some(price), Some(quantity)) if errors.is_empty() => Ok(ProductPayload {
                name: name.to_string(),
                description: description.to_string(),
                price,
                quantity,
            }),
            _ => Err(errors),
        }
    }
}

fn field_error(field: DraftField, message: &str) -> FieldError {
    FieldError::new(field.as_str(), message)
}

fn parse_price(raw: &str) -> Result<Decimal, &'static str> {
    if raw.is_empty() {
        return Err("Product price is required");
    }
    let price = Decimal::from_str(raw).map_err(|_| "Price must be a valid number")?;
    if price <= Decimal::ZERO {
        return Err("Price must be greater than 0");
    }
    let price = price.normalize();
    if price.scale() > PRICE_MAX_SCALE {
        return Err("Invalid price format. Use up to 2 decimal places");
    }
    Ok(price)
}

fn parse_quantity(raw: &str) -> Result<u32, &'static str> {
    if raw.is_empty() {
        return Err("Product quantity is required");
    }
    let quantity = raw
        .parse::<i64>()
        .map_err(|_| "Quantity must be a whole number")?;
    if quantity < 0 {
        return Err("Quantity cannot be negative");
    }
    u32::try_from(quantity).map_err(|_| "Quantity is too large")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorMode {
    Create,
    Edit(ProductId),
}

impl EditorMode {
    fn operation(self) -> Operation {
        match self {
            EditorMode::Create => Operation::Create,
            EditorMode::Edit(_) => Operation::Update,
        }
    }

    fn success_message(self) -> &'static str {
        match self {
            EditorMode::Create => "Product created successfully",
            EditorMode::Edit(_) => "Product updated successfully",
        }
    }
}

/// Open create/edit form. Survives failed submissions so they can be corrected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorState {
    pub mode: EditorMode,
    pub draft: ProductDraft,
    pub field_errors: Vec<FieldError>,
    pub submitting: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted { refreshed_page: u32 },
    Cancelled,
}

pub struct MutationController {
    api: Arc<dyn ProductApi>,
    fetcher: Arc<ListFetcher>,
    classifier: ErrorClassifier,
    reporter: Reporter,
    editor: Mutex<Option<EditorState>>,
}

impl MutationController {
    pub fn new(api: Arc<dyn ProductApi>, fetcher: Arc<ListFetcher>, reporter: Reporter) -> Self {
        Self {
            api,
            fetcher,
            classifier: ErrorClassifier,
            reporter,
            editor: Mutex::new(None),
        }
    }

    pub async fn editor(&self) -> Option<EditorState> {
        self.editor.lock().await.clone()
    }

    pub async fn open_create(&self) {
        self.set_editor(EditorMode::Create, ProductDraft::default(), Vec::new(), false)
            .await;
    }

    pub async fn open_edit(&self, product: &Product) {
        self.set_editor(
            EditorMode::Edit(product.id),
            ProductDraft::from_product(product),
            Vec::new(),
            false,
        )
        .await;
    }

    pub async fn close_editor(&self) {
        *self.editor.lock().await = None;
    }

    /// Submits `draft` as a create or an update, depending on the open editor.
    pub async fn submit(&self, draft: ProductDraft) -> Result<Product, ClassifiedError> {
        let mode = self
            .editor
            .lock()
            .await
            .as_ref()
            .map(|editor| editor.mode)
            .unwrap_or(EditorMode::Create);
        self.save(mode, draft).await
    }

    pub async fn create(&self, draft: ProductDraft) -> Result<Product, ClassifiedError> {
        self.save(EditorMode::Create, draft).await
    }

    pub async fn update(
        &self,
        id: ProductId,
        draft: ProductDraft,
    ) -> Result<Product, ClassifiedError> {
        self.save(EditorMode::Edit(id), draft).await
    }

    /// Deletes `id` once `confirm` agrees, then refreshes the visible page.
    ///
    /// Removing the only product on the last page would leave the view on a
    /// page that no longer exists, so the refresh goes to the previous one.
    pub async fn delete<F>(&self, id: ProductId, confirm: F) -> Result<DeleteOutcome, ClassifiedError>
    where
        F: FnOnce(ProductId) -> bool,
    {
        if !confirm(id) {
            info!(product_id = id.0, "mutation: delete cancelled");
            return Ok(DeleteOutcome::Cancelled);
        }

        let target = page_after_delete(&self.fetcher.snapshot().await, id);

        if let Err(failure) = self.api.delete(id).await {
            let error = self.classifier.classify(Operation::Delete, &failure);
            self.reporter.failure(&error);
            return Err(error);
        }

        info!(product_id = id.0, refresh_page = target, "mutation: product deleted");
        self.reporter.success("Product deleted successfully");
        self.refresh(target).await;
        Ok(DeleteOutcome::Deleted {
            refreshed_page: target,
        })
    }

    pub async fn get(&self, id: ProductId) -> Result<Product, ClassifiedError> {
        self.api.get(id).await.map_err(|failure| {
            let error = self.classifier.classify(Operation::Get, &failure);
            self.reporter.failure(&error);
            error
        })
    }

    pub async fn check_stock(&self, id: ProductId, quantity: u32) -> Result<bool, ClassifiedError> {
        self.api.check_stock(id, quantity).await.map_err(|failure| {
            let error = self.classifier.classify(Operation::CheckStock, &failure);
            self.reporter.failure(&error);
            error
        })
    }

    async fn save(&self, mode: EditorMode, draft: ProductDraft) -> Result<Product, ClassifiedError> {
        let operation = mode.operation();
        let payload = match draft.validate() {
            Ok(payload) => payload,
            Err(field_errors) => {
                debug!(operation = %operation, errors = field_errors.len(), "mutation: draft rejected locally");
                let error = self.classifier.validation(operation, field_errors);
                self.set_editor(mode, draft, error.field_errors().to_vec(), false)
                    .await;
                return Err(error);
            }
        };

        self.set_editor(mode, draft.clone(), Vec::new(), true).await;
        let result = match mode {
            EditorMode::Create => self.api.create(&payload).await,
            EditorMode::Edit(id) => self.api.update(id, &payload).await,
        };

        match result {
            Ok(product) => {
                info!(product_id = product.id.0, operation = %operation, "mutation: saved");
                self.close_editor().await;
                self.reporter.success(mode.success_message());
                let page = self.fetcher.current_query().await.page_index();
                self.refresh(page).await;
                Ok(product)
            }
            Err(failure) => {
                let error = self.classifier.classify(operation, &failure);
                self.set_editor(mode, draft, error.field_errors().to_vec(), false)
                    .await;
                self.reporter.failure(&error);
                Err(error)
            }
        }
    }

    async fn refresh(&self, page_index: u32) {
        // Failures are already surfaced by the fetcher.
        if let Err(err) = self.fetcher.refresh(page_index).await {
            debug!("mutation: refresh after change failed: {err}");
        }
    }

    async fn set_editor(
        &self,
        mode: EditorMode,
        draft: ProductDraft,
        field_errors: Vec<FieldError>,
        submitting: bool,
    ) {
        *self.editor.lock().await = Some(EditorState {
            mode,
            draft,
            field_errors,
            submitting,
        });
    }
}

/// Page to show once `deleted` is gone from the collection behind `view`.
fn page_after_delete(view: &ListView, deleted: ProductId) -> u32 {
    let current = view.query.page_index();
    let Some(page) = view.page.as_ref() else {
        return current;
    };

    let empties_last_page = page.page_number == current
        && page.is_last_page()
        && page.content.len() == 1
        && page.content[0].id == deleted;
    if !empties_last_page {
        return current;
    }

    let remaining_pages = page.total_pages.saturating_sub(1);
    remaining_pages.saturating_sub(1)
}

#[cfg(test)]
#[path = "tests/mutation_tests.rs"]
mod tests;
