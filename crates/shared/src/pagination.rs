//! Offset pagination utilities.
//!
//! Listing pages have a fixed size; clients only choose the zero-based page
//! index.

use serde::Serialize;

/// Number of rows per listing page.
pub const PAGE_SIZE: u32 = 10;

/// A zero-based page request with a fixed page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    size: u32,
}

impl PageRequest {
    /// Creates a request for `page` using [`PAGE_SIZE`].
    pub fn of(page: u32) -> Self {
        Self {
            page,
            size: PAGE_SIZE,
        }
    }

    /// Creates a request with an explicit page size (minimum 1).
    pub fn with_size(page: u32, size: u32) -> Self {
        Self {
            page,
            size: size.max(1),
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// Row offset of the first element, as a SQL-friendly integer.
    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.size)
    }

    /// Page size as a SQL-friendly integer.
    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::of(0)
    }
}

/// A page of results.
///
/// `count` is the number of items in this page, not a total across pages.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub count: usize,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: u32) -> Self {
        let count = items.len();
        Self { items, page, count }
    }
}
