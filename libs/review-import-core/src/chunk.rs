//! Fixed-size chunking used by the batch processors.

/// Split `items` into consecutive chunks of at most `size` elements,
/// preserving order. A `size` of zero is treated as one.
pub fn chunk<T>(items: Vec<T>, size: usize) -> Vec<Vec<T>> {
    let size = size.max(1);
    let mut chunks = Vec::with_capacity(items.len().div_ceil(size));
    let mut current = Vec::with_capacity(size.min(items.len()));

    for item in items {
        current.push(item);
        if current.len() == size {
            chunks.push(std::mem::replace(&mut current, Vec::with_capacity(size)));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
