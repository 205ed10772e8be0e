use crate::error::{Error, Result};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageWindow<T> {
    pub items: Vec<T>,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_rows: usize,
    pub page_size: usize,
}

pub fn total_pages(total_rows: usize, page_size: usize) -> usize {
    let size = page_size.max(1);
    total_rows.div_ceil(size).max(1)
}

/// Slices one page out of `results`. An empty result still has one (empty)
/// page, and out-of-range page numbers clamp instead of failing.
pub fn paginate<T: Clone>(results: &[T], page: i64, page_size: usize) -> PageWindow<T> {
    let page_size = page_size.max(1);
    let total_pages = total_pages(results.len(), page_size);
    let current_page = page.clamp(1, total_pages as i64) as usize;
    let start = (current_page - 1) * page_size;
    let end = std::cmp::min(start + page_size, results.len());
    let items = if start < end {
        results[start..end].to_vec()
    } else {
        Vec::new()
    };
    PageWindow {
        items,
        current_page,
        total_pages,
        total_rows: results.len(),
        page_size,
    }
}

pub fn check_page_size(size: usize, allowed: &[usize]) -> Result<usize> {
    if allowed.contains(&size) {
        Ok(size)
    } else {
        let list = allowed
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        Err(Error::invalid(format!("pageSize must be one of: {}", list)))
    }
}
