use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// One page of a filtered listing. Pages are 1-based and there is always at
/// least one page, even when it is empty.
#[derive(Debug, Serialize)]
pub struct PaginationResponse<T> {
    pub content: Vec<T>,
    pub page: u64,
    pub size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
    pub is_first: bool,
    pub is_last: bool,
}

impl<T> PaginationResponse<T> {
    pub fn new(content: Vec<T>, page: u64, size: u64, total_elements: u64) -> Self {
        let total_pages = total_pages(total_elements, size);
        Self {
            content,
            page,
            size,
            total_elements,
            total_pages,
            is_first: page <= 1,
            is_last: page >= total_pages,
        }
    }

    pub fn previous_page(&self) -> u64 {
        self.page.saturating_sub(1).max(1)
    }

    pub fn next_page(&self) -> u64 {
        (self.page + 1).min(self.total_pages)
    }
}

pub fn total_pages(total_elements: u64, size: u64) -> u64 {
    if size == 0 {
        return 1;
    }
    total_elements.div_ceil(size).max(1)
}

/// Clamps a requested page into `1..=total_pages`.
pub fn clamp_page(requested: Option<u64>, total_elements: u64, size: u64) -> u64 {
    requested.unwrap_or(1).clamp(1, total_pages(total_elements, size))
}
