//! Pagination envelope for search results.

use serde::{Deserialize, Serialize};

/// One page of results plus the counters clients page with.
///
/// `page` is zero-based. `total_elements` counts every match of the
/// underlying filter, not just the slice carried here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// The records on this page.
    pub content: Vec<T>,
    /// Zero-based page number.
    pub page: u32,
    /// Requested page size.
    pub size: u32,
    /// Total matching records across all pages.
    pub total_elements: u64,
    /// Total number of pages at this size.
    pub total_pages: u64,
    /// Whether this is the first page.
    pub first: bool,
    /// Whether this is the last page.
    pub last: bool,
}

impl<T> Page<T> {
    /// Assembles a page from a result slice and the overall match
    /// count. `size` must be non-zero; the repository clamps it before
    /// calling.
    pub fn new(content: Vec<T>, page: u32, size: u32, total_elements: u64) -> Self {
        let total_pages = total_elements.div_ceil(u64::from(size));
        let last = total_pages == 0 || u64::from(page) >= total_pages - 1;
        Page {
            content,
            page,
            size,
            total_elements,
            total_pages,
            first: page == 0,
            last,
        }
    }

    /// Returns `true` when this page carries no records.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Number of records on this page.
    pub fn len(&self) -> usize {
        self.content.len()
    }

    /// Maps the records while keeping the paging counters.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page: self.page,
            size: self.size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            first: self.first,
            last: self.last,
        }
    }
}
