//! Insertion-ordered map for node and mark specs.
//!
//! Spec order matters: the first node type in a group is its default type,
//! mark order is mark rank, and parse rules are gathered in spec order.

/// A small persistent-style ordered map keyed by name.
///
/// Operations return new maps rather than mutating, so a base table can be
/// extended (for example by [`add_list_nodes`](crate::list::add_list_nodes))
/// without touching the original.
#[derive(Debug, Clone)]
pub struct OrderedMap<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for OrderedMap<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T: Clone> OrderedMap<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|(k, _)| k == key)
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.position(key).map(|i| &self.entries[i].1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    /// Replace the value under `key`, or append it when absent. With
    /// `new_key`, the entry is also renamed in place.
    pub fn update(&self, key: &str, value: T, new_key: Option<&str>) -> Self {
        let name = new_key.unwrap_or(key);
        let mut entries: Vec<_> = self
            .entries
            .iter()
            .filter(|(k, _)| k == key || k != name)
            .cloned()
            .collect();
        match entries.iter().position(|(k, _)| k == key) {
            Some(at) => entries[at] = (name.to_string(), value),
            None => entries.push((name.to_string(), value)),
        }
        Self { entries }
    }

    pub fn remove(&self, key: &str) -> Self {
        let mut entries = self.entries.clone();
        entries.retain(|(k, _)| k != key);
        Self { entries }
    }

    pub fn add_to_start(&self, key: &str, value: T) -> Self {
        let mut entries = self.remove(key).entries;
        entries.insert(0, (key.to_string(), value));
        Self { entries }
    }

    pub fn add_to_end(&self, key: &str, value: T) -> Self {
        let mut entries = self.remove(key).entries;
        entries.push((key.to_string(), value));
        Self { entries }
    }

    /// Insert before `place`, or at the end when `place` is absent.
    pub fn add_before(&self, place: &str, key: &str, value: T) -> Self {
        let mut entries = self.remove(key).entries;
        let at = entries
            .iter()
            .position(|(k, _)| k == place)
            .unwrap_or(entries.len());
        entries.insert(at, (key.to_string(), value));
        Self { entries }
    }

    /// Add every entry of `other` to the end, replacing same-named ones.
    pub fn append(&self, other: &OrderedMap<T>) -> Self {
        let mut entries = self.entries.clone();
        entries.retain(|(k, _)| !other.contains_key(k));
        entries.extend(other.entries.iter().cloned());
        Self { entries }
    }

    /// Add every entry of `other` to the start, replacing same-named ones.
    pub fn prepend(&self, other: &OrderedMap<T>) -> Self {
        let mut entries = other.entries.clone();
        entries.extend(
            self.entries
                .iter()
                .filter(|(k, _)| !other.contains_key(k))
                .cloned(),
        );
        Self { entries }
    }

    /// Remove every key present in `other`.
    pub fn subtract(&self, other: &OrderedMap<T>) -> Self {
        let mut entries = self.entries.clone();
        entries.retain(|(k, _)| !other.contains_key(k));
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl<T: Clone, K: Into<String>> FromIterator<(K, T)> for OrderedMap<T> {
    fn from_iter<I: IntoIterator<Item = (K, T)>>(iter: I) -> Self {
        let mut map = OrderedMap::new();
        for (key, value) in iter {
            let key = key.into();
            map = map.add_to_end(&key, value);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> OrderedMap<u32> {
        [("a", 1), ("b", 2), ("c", 3)].into_iter().collect()
    }

    fn keys(m: &OrderedMap<u32>) -> Vec<&str> {
        m.keys().collect()
    }

    #[test]
    fn test_from_iter_keeps_order() {
        assert_eq!(keys(&map()), vec!["a", "b", "c"]);
        assert_eq!(map().get("b"), Some(&2));
    }

    #[test]
    fn test_update_in_place_and_rename() {
        let m = map().update("b", 20, None);
        assert_eq!(keys(&m), vec!["a", "b", "c"]);
        assert_eq!(m.get("b"), Some(&20));

        let renamed = map().update("b", 5, Some("z"));
        assert_eq!(keys(&renamed), vec!["a", "z", "c"]);
        assert_eq!(renamed.get("b"), None);
    }

    #[test]
    fn test_update_missing_appends() {
        let m = map().update("d", 4, None);
        assert_eq!(keys(&m), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_add_before_and_start() {
        let m = map().add_before("b", "x", 9).add_to_start("c", 0);
        assert_eq!(keys(&m), vec!["c", "a", "x", "b"]);
    }

    #[test]
    fn test_append_replaces_duplicates() {
        let other: OrderedMap<u32> = [("b", 7), ("d", 4)].into_iter().collect();
        let m = map().append(&other);
        assert_eq!(keys(&m), vec!["a", "c", "b", "d"]);
        assert_eq!(m.get("b"), Some(&7));
    }

    #[test]
    fn test_prepend_and_subtract() {
        let other: OrderedMap<u32> = [("c", 30)].into_iter().collect();
        assert_eq!(keys(&map().prepend(&other)), vec!["c", "a", "b"]);
        assert_eq!(keys(&map().subtract(&other)), vec!["a", "b"]);
    }

    #[test]
    fn test_original_is_untouched() {
        let base = map();
        let _ = base.remove("a");
        assert_eq!(base.len(), 3);
    }
}
