//! Priority-ordered registration list

/// List ordered by descending priority; among equal priorities the most
/// recently added entry comes first.
#[derive(Debug, Clone)]
pub struct PrioritizedList<T> {
    entries: Vec<(i32, T)>,
}

impl<T> Default for PrioritizedList<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T> PrioritizedList<T> {
    /// Empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `item` ahead of every entry with a lower or equal priority.
    pub fn add(&mut self, item: T, priority: i32) {
        let position = self
            .entries
            .iter()
            .position(|(existing, _)| *existing <= priority)
            .unwrap_or(self.entries.len());
        self.entries.insert(position, (priority, item));
    }

    /// Entries in lookup order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.entries.iter().map(|(_, item)| item)
    }

    /// Entries with their priorities, in lookup order.
    pub fn iter_with_priority(&self) -> impl Iterator<Item = (i32, &T)> + '_ {
        self.entries.iter().map(|(priority, item)| (*priority, item))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> IntoIterator for PrioritizedList<T> {
    type Item = T;
    type IntoIter = std::iter::Map<std::vec::IntoIter<(i32, T)>, fn((i32, T)) -> T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter().map(take_item as fn((i32, T)) -> T)
    }
}

fn take_item<T>((_, item): (i32, T)) -> T {
    item
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_then_recency() {
        let mut list = PrioritizedList::new();
        list.add("low", -10);
        list.add("first", 0);
        list.add("high", 100);
        list.add("second", 0);

        let order: Vec<_> = list.iter().copied().collect();
        assert_eq!(order, vec!["high", "second", "first", "low"]);
        assert_eq!(list.into_iter().collect::<Vec<_>>(), order);
    }

    #[test]
    fn test_empty() {
        let list: PrioritizedList<u8> = PrioritizedList::new();
        assert!(list.is_empty());
        assert_eq!(list.iter().count(), 0);
    }
}
