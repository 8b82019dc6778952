//! Page windowing over an ordered list

/// Return the `page`-th window of `page_size` items (pages start at 1).
///
/// A page past the end of the list is an empty window, not an error.
pub fn paginate<T>(items: &[T], page: u32, page_size: u32) -> &[T] {
    let start = offset(page, page_size);
    if start >= items.len() {
        return &[];
    }
    let end = start.saturating_add(page_size as usize).min(items.len());
    &items[start..end]
}

/// Zero-based offset of the first item on `page`
pub fn offset(page: u32, page_size: u32) -> usize {
    (page.max(1) as usize - 1).saturating_mul(page_size as usize)
}
