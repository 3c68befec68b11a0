//! Ordered, id-indexed collections
//!
//! `IdentifiedCollection<T>` keeps entities in insertion order and maintains
//! an id -> position table for O(1) expected lookup. Entities are stored
//! behind `Arc`, so `copy` is shallow: both collections share the same
//! entities until one side mutates through `get_by_id_mut`, which clones
//! the entity on write.

use crate::error::{SffError, SffResult};
use crate::index::IndexAllocator;
use crate::types::Id;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// An entity that lives in an `IdentifiedCollection`
pub trait Identified: Clone {
    /// Entity kind used in errors and persisted group names
    const KIND: &'static str;

    /// First id issued by a fresh collection of this kind
    const ID_START: Id = 0;

    /// Current id, if one has been assigned
    fn id(&self) -> Option<Id>;

    /// Assign an id
    fn set_id(&mut self, id: Id);
}

/// Implements `Identified` for a struct with an `id: Option<Id>` field.
macro_rules! identified {
    ($ty:ty, $kind:expr) => {
        identified!($ty, $kind, 0);
    };
    ($ty:ty, $kind:expr, $start:expr) => {
        impl $crate::collection::Identified for $ty {
            const KIND: &'static str = $kind;
            const ID_START: $crate::types::Id = $start;

            fn id(&self) -> Option<$crate::types::Id> {
                self.id
            }

            fn set_id(&mut self, id: $crate::types::Id) {
                self.id = Some(id);
            }
        }
    };
}
pub(crate) use identified;

/// Ordered sequence of entities sharing one identifier space
#[derive(Debug, Clone)]
pub struct IdentifiedCollection<T: Identified> {
    items: Vec<Arc<T>>,
    positions: FxHashMap<Id, usize>,
    allocator: IndexAllocator,
}

impl<T: Identified> Default for IdentifiedCollection<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Identified> IdentifiedCollection<T> {
    /// Create an empty collection whose allocator starts at `T::ID_START`
    pub fn new() -> Self {
        Self::with_allocator(IndexAllocator::new(T::ID_START, 1))
    }

    /// Create an empty collection with a custom allocator
    pub fn with_allocator(allocator: IndexAllocator) -> Self {
        Self {
            items: Vec::new(),
            positions: FxHashMap::default(),
            allocator,
        }
    }

    /// Build a collection from persisted entities, keeping their stored ids
    pub fn from_items<I>(items: I) -> SffResult<Self>
    where
        I: IntoIterator<Item = T>,
    {
        let mut collection = Self::new();
        for item in items {
            collection.append(item)?;
        }
        Ok(collection)
    }

    /// Append to the end, assigning an id if the entity has none.
    ///
    /// Returns the entity's id.
    pub fn append(&mut self, item: T) -> SffResult<Id> {
        let len = self.items.len();
        self.insert(len, item)
    }

    /// Insert at `position`, shifting later entities right.
    ///
    /// Same id rule as `append`. Fails with `IndexOutOfRange` if
    /// `position > len()`.
    pub fn insert(&mut self, position: usize, mut item: T) -> SffResult<Id> {
        if position > self.items.len() {
            return Err(SffError::IndexOutOfRange {
                index: position,
                len: self.items.len(),
            });
        }
        let id = self.claim_id(&mut item)?;
        self.items.insert(position, Arc::new(item));
        if position + 1 == self.items.len() {
            self.positions.insert(id, position);
        } else {
            self.reindex_from(position);
        }
        Ok(id)
    }

    fn claim_id(&mut self, item: &mut T) -> SffResult<Id> {
        match item.id() {
            Some(id) => {
                if self.positions.contains_key(&id) {
                    return Err(SffError::DuplicateIdentifier { kind: T::KIND, id });
                }
                self.allocator.observe(id);
                Ok(id)
            }
            None => {
                let id = self.allocator.next_id();
                item.set_id(id);
                Ok(id)
            }
        }
    }

    fn reindex_from(&mut self, position: usize) {
        for (offset, item) in self.items[position..].iter().enumerate() {
            if let Some(id) = item.id() {
                self.positions.insert(id, position + offset);
            }
        }
    }

    /// Look up an entity by id
    pub fn get_by_id(&self, id: Id) -> SffResult<&T> {
        self.positions
            .get(&id)
            .map(|&pos| self.items[pos].as_ref())
            .ok_or(SffError::NotFound { kind: T::KIND, id })
    }

    /// Mutable lookup by id. Clones the entity first if it is shared with a copy.
    pub fn get_by_id_mut(&mut self, id: Id) -> SffResult<&mut T> {
        match self.positions.get(&id) {
            Some(&pos) => Ok(Arc::make_mut(&mut self.items[pos])),
            None => Err(SffError::NotFound { kind: T::KIND, id }),
        }
    }

    /// Entity at an ordinal position
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index).map(|item| item.as_ref())
    }

    /// True if an entity with `id` is live
    pub fn contains_id(&self, id: Id) -> bool {
        self.positions.contains_key(&id)
    }

    /// Remove and return the entity with `id`
    pub fn remove_by_id(&mut self, id: Id) -> SffResult<T> {
        let pos = self
            .positions
            .remove(&id)
            .ok_or(SffError::NotFound { kind: T::KIND, id })?;
        let item = self.items.remove(pos);
        self.reindex_from(pos);
        Ok(unwrap_shared(item))
    }

    /// Remove and return the last entity
    pub fn pop(&mut self) -> SffResult<T> {
        let item = self
            .items
            .pop()
            .ok_or(SffError::EmptyCollection { kind: T::KIND })?;
        if let Some(id) = item.id() {
            self.positions.remove(&id);
        }
        Ok(unwrap_shared(item))
    }

    /// Remove every entity and rewind the allocator to its original start
    pub fn clear(&mut self) {
        self.items.clear();
        self.positions.clear();
        self.allocator.rewind();
    }

    /// Reverse iteration order in place
    pub fn reverse(&mut self) {
        self.items.reverse();
        self.reindex_from(0);
    }

    /// Shallow copy: entities are shared, not cloned
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Append every entity of `other`, sharing them.
    ///
    /// All-or-nothing: if any id of `other` is already live here, nothing is
    /// appended and `DuplicateIdentifier` names the first collision.
    pub fn extend(&mut self, other: &IdentifiedCollection<T>) -> SffResult<()> {
        if let Some(id) = other.ids().find(|id| self.contains_id(*id)) {
            return Err(SffError::DuplicateIdentifier { kind: T::KIND, id });
        }
        for item in &other.items {
            if let Some(id) = item.id() {
                self.allocator.observe(id);
                self.positions.insert(id, self.items.len());
            }
            self.items.push(Arc::clone(item));
        }
        Ok(())
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            inner: self.items.iter(),
        }
    }

    /// Ids in insertion order
    pub fn ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.items.iter().filter_map(|item| item.id())
    }

    /// Number of entities
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if empty
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The collection's allocator
    pub fn allocator(&self) -> &IndexAllocator {
        &self.allocator
    }

    /// The id the next anonymous append would receive
    pub fn next_id(&self) -> Id {
        self.allocator.peek()
    }

    /// True if both collections share the same entity allocation at every position
    pub fn shares_entities_with(&self, other: &Self) -> bool {
        self.items.len() == other.items.len()
            && self
                .items
                .iter()
                .zip(&other.items)
                .all(|(a, b)| Arc::ptr_eq(a, b))
    }
}

fn unwrap_shared<T: Clone>(item: Arc<T>) -> T {
    Arc::try_unwrap(item).unwrap_or_else(|shared| (*shared).clone())
}

impl<T: Identified + PartialEq> PartialEq for IdentifiedCollection<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a == b)
    }
}

/// Borrowing iterator over an `IdentifiedCollection`
pub struct Iter<'a, T> {
    inner: std::slice::Iter<'a, Arc<T>>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|item| item.as_ref())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.inner.next_back().map(|item| item.as_ref())
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {}

impl<'a, T: Identified> IntoIterator for &'a IdentifiedCollection<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: Option<Id>,
        label: &'static str,
    }

    identified!(Item, "item");

    fn item(label: &'static str) -> Item {
        Item { id: None, label }
    }

    fn with_id(id: Id, label: &'static str) -> Item {
        Item { id: Some(id), label }
    }

    fn labels(c: &IdentifiedCollection<Item>) -> Vec<&'static str> {
        c.iter().map(|i| i.label).collect()
    }

    #[test]
    fn test_append_assigns_sequential_ids() {
        let mut c = IdentifiedCollection::new();
        assert_eq!(c.append(item("a")).unwrap(), 0);
        assert_eq!(c.append(item("b")).unwrap(), 1);
        assert_eq!(c.get_by_id(1).unwrap().label, "b");
        assert_eq!(c.get_by_id(0).unwrap().id, Some(0));
    }

    #[test]
    fn test_append_explicit_id_advances_allocator() {
        let mut c = IdentifiedCollection::new();
        c.append(with_id(5, "five")).unwrap();
        assert_eq!(c.append(item("next")).unwrap(), 6);
    }

    #[test]
    fn test_append_duplicate_rejected() {
        let mut c = IdentifiedCollection::new();
        c.append(with_id(3, "a")).unwrap();
        let err = c.append(with_id(3, "b")).unwrap_err();
        assert!(matches!(
            err,
            SffError::DuplicateIdentifier { kind: "item", id: 3 }
        ));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn test_explicit_ids_after_clear_drive_counter() {
        let mut c = IdentifiedCollection::new();
        c.append(item("a")).unwrap(); // 0
        c.append(with_id(1, "b")).unwrap();
        c.clear();
        c.append(with_id(0, "c")).unwrap();
        c.append(with_id(2, "d")).unwrap();
        // counter is at 3 after observing 2
        assert_eq!(c.append(item("e")).unwrap(), 3);
    }

    #[test]
    fn test_insert_shifts_and_reindexes() {
        let mut c = IdentifiedCollection::new();
        c.append(item("a")).unwrap();
        c.append(item("c")).unwrap();
        let id = c.insert(1, item("b")).unwrap();
        assert_eq!(labels(&c), vec!["a", "b", "c"]);
        assert_eq!(c.get_by_id(id).unwrap().label, "b");
        assert_eq!(c.get_by_id(1).unwrap().label, "c");
    }

    #[test]
    fn test_insert_out_of_range() {
        let mut c = IdentifiedCollection::new();
        c.append(item("a")).unwrap();
        let err = c.insert(2, item("b")).unwrap_err();
        assert!(matches!(err, SffError::IndexOutOfRange { index: 2, len: 1 }));
        assert!(c.insert(1, item("b")).is_ok());
    }

    #[test]
    fn test_get_missing() {
        let c: IdentifiedCollection<Item> = IdentifiedCollection::new();
        assert!(matches!(
            c.get_by_id(4),
            Err(SffError::NotFound { kind: "item", id: 4 })
        ));
    }

    #[test]
    fn test_remove_by_id_reindexes() {
        let mut c = IdentifiedCollection::new();
        for l in ["a", "b", "c"] {
            c.append(item(l)).unwrap();
        }
        let removed = c.remove_by_id(0).unwrap();
        assert_eq!(removed.label, "a");
        assert_eq!(c.get_by_id(2).unwrap().label, "c");
        assert_eq!(c.get(0).unwrap().label, "b");
        assert!(c.remove_by_id(0).unwrap_err().is_not_found());
    }

    #[test]
    fn test_pop() {
        let mut c = IdentifiedCollection::new();
        c.append(item("a")).unwrap();
        c.append(item("b")).unwrap();
        assert_eq!(c.pop().unwrap().label, "b");
        assert!(!c.contains_id(1));
        c.pop().unwrap();
        assert!(matches!(
            c.pop(),
            Err(SffError::EmptyCollection { kind: "item" })
        ));
    }

    #[test]
    fn test_clear_resets_allocator() {
        let mut c = IdentifiedCollection::new();
        c.append(item("a")).unwrap();
        c.append(item("b")).unwrap();
        c.clear();
        assert!(c.is_empty());
        assert_eq!(c.append(item("again")).unwrap(), 0);
    }

    #[test]
    fn test_reverse_keeps_lookup() {
        let mut c = IdentifiedCollection::new();
        for l in ["a", "b", "c"] {
            c.append(item(l)).unwrap();
        }
        c.reverse();
        assert_eq!(labels(&c), vec!["c", "b", "a"]);
        assert_eq!(c.get_by_id(0).unwrap().label, "a");
        assert_eq!(c.ids().collect::<Vec<_>>(), vec![2, 1, 0]);
    }

    #[test]
    fn test_copy_is_shallow_until_write() {
        let mut c = IdentifiedCollection::new();
        c.append(item("a")).unwrap();
        let mut copy = c.copy();
        assert!(copy.shares_entities_with(&c));

        copy.get_by_id_mut(0).unwrap().label = "changed";
        assert_eq!(c.get_by_id(0).unwrap().label, "a");
        assert_eq!(copy.get_by_id(0).unwrap().label, "changed");
        assert!(!copy.shares_entities_with(&c));
    }

    #[test]
    fn test_extend_all_or_nothing() {
        let mut a = IdentifiedCollection::new();
        a.append(with_id(1, "a1")).unwrap();

        let mut b = IdentifiedCollection::new();
        b.append(with_id(2, "b2")).unwrap();
        b.append(with_id(1, "b1")).unwrap();

        assert!(matches!(
            a.extend(&b),
            Err(SffError::DuplicateIdentifier { id: 1, .. })
        ));
        assert_eq!(a.len(), 1);

        let mut c = IdentifiedCollection::new();
        c.append(with_id(4, "c4")).unwrap();
        a.extend(&c).unwrap();
        assert_eq!(labels(&a), vec!["a1", "c4"]);
        assert_eq!(a.get_by_id(4).unwrap().label, "c4");
        assert_eq!(a.next_id(), 5);
    }

    #[test]
    fn test_equality_ignores_allocator_state() {
        let mut a = IdentifiedCollection::new();
        a.append(with_id(0, "x")).unwrap();
        let mut b = IdentifiedCollection::new();
        b.append(item("y")).unwrap();
        b.clear();
        b.append(with_id(0, "x")).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_from_items_keeps_stored_ids() {
        let c = IdentifiedCollection::from_items(vec![with_id(9, "a"), with_id(4, "b")]).unwrap();
        assert_eq!(c.ids().collect::<Vec<_>>(), vec![9, 4]);
        assert_eq!(c.next_id(), 10);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Append,
        Remove(usize),
        Pop,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            3 => Just(Op::Append),
            1 => (0usize..16).prop_map(Op::Remove),
            1 => Just(Op::Pop),
        ]
    }

    proptest! {
        #[test]
        fn prop_anonymous_ids_increase_and_stay_unique(ops in proptest::collection::vec(op_strategy(), 1..64)) {
            let mut c = IdentifiedCollection::new();
            let mut issued: Vec<Id> = Vec::new();
            for op in ops {
                match op {
                    Op::Append => issued.push(c.append(item("x")).unwrap()),
                    Op::Remove(n) => {
                        let nth = c.ids().nth(n);
                        if let Some(id) = nth {
                            c.remove_by_id(id).unwrap();
                        }
                    }
                    Op::Pop => {
                        let _ = c.pop();
                    }
                }
                let mut live: Vec<Id> = c.ids().collect();
                let count = live.len();
                live.sort_unstable();
                live.dedup();
                prop_assert_eq!(live.len(), count);
                for id in c.ids() {
                    prop_assert_eq!(c.get_by_id(id).unwrap().id, Some(id));
                }
            }
            for pair in issued.windows(2) {
                prop_assert_eq!(pair[1], pair[0] + 1);
            }
        }
    }
}
