//! Fixed-size, 1-indexed pagination.

use serde::Serialize;

/// Rows per page on the roster screens.
pub const PAGE_SIZE: usize = 10;

/// One page of a filtered list.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub page_size: usize,
}

/// `max(1, ceil(len / page_size))`
pub fn total_pages(len: usize, page_size: usize) -> usize {
    len.div_ceil(page_size).max(1)
}

/// Slice out `requested`, clamped into `[1, total_pages]`.
pub fn paginate<T>(items: Vec<T>, requested: usize, page_size: usize) -> Page<T> {
    let total_items = items.len();
    let total_pages = total_pages(total_items, page_size);
    let page = requested.clamp(1, total_pages);

    let items = items
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();

    Page {
        items,
        page,
        total_pages,
        total_items,
        page_size,
    }
}
