//! Order-preserving deduplication.

use std::collections::HashSet;
use std::hash::Hash;

/// Drop items whose key has already been seen, keeping the first occurrence
/// and the original order.
pub fn dedup_by_key<T, K, F>(items: impl IntoIterator<Item = T>, mut key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: FnMut(&T) -> K,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(key(item)))
        .collect()
}
