//! Listing parameters and the single transition table that changes them.

use serde::Serialize;
use shared::domain::{SortDirection, SortField};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Every way the listing parameters can change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryAction {
    SetPage(i64),
    SetPageSize(i64),
    SetSort {
        field: SortField,
        direction: SortDirection,
    },
    SetSearchTerm(String),
    ToggleSortDirection,
}

/// Current page, page size, ordering and search term of the listing.
///
/// Fields are private so that a filter, sort or size change can never be
/// applied without also returning to the first page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    page_index: u32,
    page_size: u32,
    sort_field: SortField,
    sort_direction: SortDirection,
    search_term: String,
}

impl Default for QueryState {
    fn default() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE as i64)
    }
}

impl QueryState {
    pub fn with_page_size(page_size: i64) -> Self {
        Self {
            page_index: 0,
            page_size: clamp_page_size(page_size),
            sort_field: SortField::Id,
            sort_direction: SortDirection::Asc,
            search_term: String::new(),
        }
    }

    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn sort_field(&self) -> SortField {
        self.sort_field
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.sort_direction
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn apply(&self, action: QueryAction) -> Self {
        let mut next = self.clone();
        match action {
            QueryAction::SetPage(page) => {
                next.page_index = clamp_page_index(page);
                return next;
            }
            QueryAction::SetPageSize(size) => next.page_size = clamp_page_size(size),
            QueryAction::SetSort { field, direction } => {
                next.sort_field = field;
                next.sort_direction = direction;
            }
            QueryAction::SetSearchTerm(term) => next.search_term = term,
            QueryAction::ToggleSortDirection => {
                next.sort_direction = next.sort_direction.toggled()
            }
        }
        next.page_index = 0;
        next
    }

    pub fn set_page(&self, page: i64) -> Self {
        self.apply(QueryAction::SetPage(page))
    }

    pub fn set_page_size(&self, size: i64) -> Self {
        self.apply(QueryAction::SetPageSize(size))
    }

    pub fn set_sort(&self, field: SortField, direction: SortDirection) -> Self {
        self.apply(QueryAction::SetSort { field, direction })
    }

    pub fn set_search_term(&self, term: impl Into<String>) -> Self {
        self.apply(QueryAction::SetSearchTerm(term.into()))
    }

    pub fn toggle_sort_direction(&self) -> Self {
        self.apply(QueryAction::ToggleSortDirection)
    }

    /// Query string parameters for `GET /products`.
    pub fn to_params(&self) -> ListParams<'_> {
        let search = self.search_term.trim();
        ListParams {
            page: self.page_index,
            size: self.page_size,
            sort_by: self.sort_field.as_param(),
            sort_dir: self.sort_direction.as_param(),
            search: (!search.is_empty()).then_some(search),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams<'a> {
    pub page: u32,
    pub size: u32,
    pub sort_by: &'static str,
    pub sort_dir: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<&'a str>,
}

fn clamp_page_index(page: i64) -> u32 {
    page.clamp(0, u32::MAX as i64) as u32
}

fn clamp_page_size(size: i64) -> u32 {
    size.clamp(1, MAX_PAGE_SIZE as i64) as u32
}

#[cfg(test)]
#[path = "tests/query_tests.rs"]
mod tests;
