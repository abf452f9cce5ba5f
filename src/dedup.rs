use std::collections::HashSet;
use std::hash::Hash;

/// A record type with a declared unique key.
pub trait UniqueKey {
    type Key: Eq + Hash + Clone;

    fn unique_key(&self) -> &Self::Key;
}

/// Removes records whose key was already seen, keeping the first occurrence.
///
/// Order of the surviving records is preserved. Duplicates are dropped
/// silently; this normalizes, it does not validate.
pub fn dedup_first<T: UniqueKey>(records: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut seen: HashSet<T::Key> = HashSet::new();
    records
        .into_iter()
        .filter(|record| seen.insert(record.unique_key().clone()))
        .collect()
}

/// Concatenates a base and an extra record set (base first) and deduplicates
/// the union.
pub fn union_dedup<T: UniqueKey>(base: Vec<T>, extra: Vec<T>) -> Vec<T> {
    dedup_first(base.into_iter().chain(extra))
}
