use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::ProductId;

/// Read-through copy of a product owned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub quantity: u32,
    pub created_at: NaiveDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDateTime>,
}

/// Body of create and update requests. Server-assigned fields have no place here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPayload {
    pub name: String,
    pub description: String,
    /// Sent as a decimal string; the service checks it against `^\d+\.?\d{0,2}$`.
    pub price: Decimal,
    pub quantity: u32,
}

/// One page of the product listing, as returned by `GET /products`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResult {
    #[serde(default)]
    pub content: Vec<Product>,
    #[serde(rename = "number")]
    pub page_number: u32,
    pub total_pages: u32,
    pub total_elements: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageShape {
    Consistent,
    /// The requested page lies past the end of the collection.
    OutOfRange { last_page: u32 },
    Malformed(&'static str),
}

impl PageResult {
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn is_last_page(&self) -> bool {
        self.page_number.saturating_add(1) >= self.total_pages
    }

    /// Index of the last page that exists, never below zero.
    pub fn last_page_index(&self) -> u32 {
        self.total_pages.saturating_sub(1)
    }

    pub fn shape(&self) -> PageShape {
        if self.total_elements == 0 {
            if !self.content.is_empty() {
                return PageShape::Malformed("empty collection returned products");
            }
            if self.total_pages > 1 {
                return PageShape::Malformed("empty collection reported more than one page");
            }
            if self.page_number > 0 {
                return PageShape::OutOfRange { last_page: 0 };
            }
            return PageShape::Consistent;
        }

        if self.total_pages == 0 {
            return PageShape::Malformed("non-empty collection reported zero pages");
        }
        if self.page_number >= self.total_pages {
            return PageShape::OutOfRange {
                last_page: self.last_page_index(),
            };
        }
        if self.content.len() as u64 > self.total_elements {
            return PageShape::Malformed("page holds more products than the collection");
        }
        PageShape::Consistent
    }
}
