// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};

/// Number of submissions shown per page.
pub const PAGE_SIZE: usize = 10;

/// Window into a filtered and sorted result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageView<T> {
    pub items: Vec<T>,
    /// One-based number of this page.
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
    pub page_size: usize,
}

impl<T> PageView<T> {
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Number of pages needed for `total_items`, zero for an empty result.
pub fn total_pages(total_items: usize, page_size: usize) -> usize {
    total_items.div_ceil(page_size.max(1))
}

/// Moves a requested page into `[1, max(total_pages, 1)]`.
pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

/// Cuts the requested page out of `items`, out-of-range pages are clamped.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> PageView<T> {
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = total_pages(total_items, page_size);
    let page = clamp_page(page, total_pages);

    let items = items
        .iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .cloned()
        .collect();

    PageView {
        items,
        page,
        total_pages,
        total_items,
        page_size,
    }
}
