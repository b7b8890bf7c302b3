//! Page windows over query results

use serde::Serialize;

/// Records shown per page when the caller does not say
pub const DEFAULT_PER_PAGE: usize = 20;

/// One page of a larger result
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based, clamped into `1..=total_pages`
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    /// Never less than one, even for an empty result
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    /// 1-based position of the first item on this page, 0 when empty
    pub fn first_index(&self) -> usize {
        if self.items.is_empty() {
            0
        } else {
            (self.page - 1) * self.per_page + 1
        }
    }
}

/// Cut `items` into the requested page
pub fn paginate<T>(items: Vec<T>, page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(per_page).max(1);
    let page = page.clamp(1, total_pages);

    let items = items
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();

    Page {
        items,
        page,
        per_page,
        total_items,
        total_pages,
    }
}
