use schemars::JsonSchema;
use serde::Serialize;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// One page of a listing, zero-based.
#[derive(Debug, Serialize, JsonSchema)]
pub struct PageResponse<T> {
    pub page: u32,
    pub size: u32,
    pub total_pages: u32,
    pub total_elements: u64,
    pub content: Vec<T>,
}

impl<T> PageResponse<T> {
    pub fn new(page: u32, size: u32, total_elements: u64, content: Vec<T>) -> Self {
        let total_pages = if size == 0 {
            0
        } else {
            total_elements.div_ceil(size as u64) as u32
        };
        PageResponse {
            page,
            size,
            total_pages,
            total_elements,
            content,
        }
    }
}

/// Normalizes raw page/size query values: absent page means the first
/// page, size is clamped to [1, MAX_PAGE_SIZE].
pub fn page_params(page: Option<u32>, size: Option<u32>) -> (u32, u32) {
    let page = page.unwrap_or(0);
    let size = size.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    (page, size)
}

pub fn offset(page: u32, size: u32) -> u64 {
    page as u64 * size as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        let p = PageResponse::new(0, 20, 41, vec![1, 2, 3]);
        assert_eq!(p.total_pages, 3);
    }

    #[test]
    fn size_is_clamped() {
        assert_eq!(page_params(None, Some(0)), (0, 1));
        assert_eq!(page_params(Some(2), Some(1000)), (2, MAX_PAGE_SIZE));
        assert_eq!(page_params(None, None), (0, DEFAULT_PAGE_SIZE));
    }
}
