use serde::{Deserialize, Serialize};

pub const MAX_PAGE_SIZE: i64 = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_pages: i64,
}

/// Slices an already filtered and ordered collection. A missing page size
/// returns everything on a single page.
pub fn paginate<T>(items: Vec<T>, page: Option<i64>, page_size: Option<i64>) -> Page<T> {
    let total = items.len() as i64;
    let page = page.unwrap_or(1).max(1);
    let page_size = match page_size {
        Some(size) => size.clamp(1, MAX_PAGE_SIZE),
        None => total.max(1),
    };
    let offset = usize::try_from((page - 1).saturating_mul(page_size)).unwrap_or(usize::MAX);
    let total_pages = ((total as f64) / (page_size as f64)).ceil() as i64;

    let items = items
        .into_iter()
        .skip(offset)
        .take(page_size as usize)
        .collect();

    Page {
        items,
        total,
        page,
        page_size,
        total_pages,
    }
}
