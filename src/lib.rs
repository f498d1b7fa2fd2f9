//! # skipkv
//!
//! An ordered in-memory map backed by a probabilistic skip list.
//!
//! Every entry owns a tower of successor links, one per level it takes part
//! in. Level 0 links every entry in key order; each higher level links a
//! random subset, so a top-down search skips most of the list and runs in
//! expected `O(log n)`.
//!
//! ## Example
//!
//! ```rust
//! use skipkv::SkipList;
//!
//! let mut list: SkipList<&str, u64> = SkipList::new();
//! assert!(list.insert("hello", 1));
//! assert!(list.insert("world", 2));
//! assert!(!list.insert("hello", 3)); // duplicate keys are rejected
//!
//! assert_eq!(list.get("hello"), Some(&1));
//! assert!(list.contains_key("world"));
//! assert_eq!(list.remove("world"), Some(2));
//! assert_eq!(list.len(), 1);
//! ```

#![deny(unsafe_code)]

mod entry;
mod level;

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::iter::FusedIterator;

use entry::{Entry, Link};
use level::LevelGenerator;

// =============================================================================
// Configuration
// =============================================================================

/// Number of levels in the head tower. No entry is taller than this.
pub const MAX_LEVEL: usize = 20;

// =============================================================================
// Arena slots
// =============================================================================

#[derive(Clone)]
enum Slot<K, V> {
    Occupied(Entry<K, V>),
    /// Free slot; holds the next free slot (or NULL).
    Vacant(Link),
}

// =============================================================================
// SkipList
// =============================================================================

/// An ordered map from `K` to `V` backed by a skip list.
///
/// Entries live in an index arena; tower slots hold arena indices rather
/// than references, and removed slots are recycled through a free list.
///
/// Keys are unique: [`insert`](Self::insert) rejects a key that is already
/// present instead of overwriting it.
#[derive(Clone)]
pub struct SkipList<K, V> {
    /// Sentinel head tower, spanning every level.
    head: [Link; MAX_LEVEL],
    slots: Vec<Slot<K, V>>,
    /// Head of the free-slot chain.
    free: Link,
    /// Highest level currently holding a real entry (0-based).
    level: usize,
    count: usize,
    heights: LevelGenerator,
}

impl<K, V> SkipList<K, V> {
    /// Create an empty list whose tower heights are seeded from OS entropy.
    pub fn new() -> Self {
        Self::with_generator(LevelGenerator::from_entropy())
    }

    /// Create an empty list with a deterministic height sequence.
    ///
    /// Two lists built with the same seed and the same operations have
    /// identical towers.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_generator(LevelGenerator::with_seed(seed))
    }

    fn with_generator(heights: LevelGenerator) -> Self {
        Self {
            head: [Link::NULL; MAX_LEVEL],
            slots: Vec::new(),
            free: Link::NULL,
            level: 0,
            count: 0,
            heights,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Highest level that currently links at least one entry (0 when empty).
    #[inline]
    pub fn top_level(&self) -> usize {
        self.level
    }

    /// Iterate over all entries in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            list: self,
            cursor: self.head[0],
            remaining: self.count,
        }
    }

    /// A [`Display`](fmt::Display) view listing every level from the top down.
    pub fn levels(&self) -> Levels<'_, K, V> {
        Levels { list: self }
    }

    // === Arena access ===

    #[inline]
    fn entry(&self, link: Link) -> &Entry<K, V> {
        match &self.slots[link.index()] {
            Slot::Occupied(entry) => entry,
            Slot::Vacant(_) => unreachable!("link points at a vacant slot"),
        }
    }

    #[inline]
    fn entry_mut(&mut self, link: Link) -> &mut Entry<K, V> {
        match &mut self.slots[link.index()] {
            Slot::Occupied(entry) => entry,
            Slot::Vacant(_) => unreachable!("link points at a vacant slot"),
        }
    }

    /// Successor of `at` (an entry or HEAD) on `level`.
    #[inline]
    fn next(&self, at: Link, level: usize) -> Link {
        if at.is_head() {
            self.head[level]
        } else {
            self.entry(at).next(level)
        }
    }

    #[inline]
    fn set_next(&mut self, at: Link, level: usize, to: Link) {
        if at.is_head() {
            self.head[level] = to;
        } else {
            self.entry_mut(at).set_next(level, to);
        }
    }

    fn alloc(&mut self, entry: Entry<K, V>) -> Link {
        if self.free.is_null() {
            let link = Link::slot(self.slots.len());
            self.slots.push(Slot::Occupied(entry));
            return link;
        }

        let link = self.free;
        match std::mem::replace(&mut self.slots[link.index()], Slot::Occupied(entry)) {
            Slot::Vacant(next_free) => self.free = next_free,
            Slot::Occupied(_) => unreachable!("free chain points at an occupied slot"),
        }
        link
    }

    fn release(&mut self, link: Link) -> Entry<K, V> {
        let slot = std::mem::replace(&mut self.slots[link.index()], Slot::Vacant(self.free));
        self.free = link;
        match slot {
            Slot::Occupied(entry) => entry,
            Slot::Vacant(_) => unreachable!("released a vacant slot"),
        }
    }
}

impl<K: Ord, V> SkipList<K, V> {
    #[inline]
    fn key_at<Q>(&self, link: Link) -> &Q
    where
        K: Borrow<Q>,
        Q: ?Sized,
    {
        self.entry(link).key().borrow()
    }

    /// Top-down search recording, per level, the last link whose key is
    /// below `key`. Levels above `self.level` stay at HEAD.
    fn find_predecessors<Q>(&self, key: &Q) -> [Link; MAX_LEVEL]
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut preds = [Link::HEAD; MAX_LEVEL];
        let mut cursor = Link::HEAD;
        for level in (0..=self.level).rev() {
            loop {
                let next = self.next(cursor, level);
                if next.is_null() || self.key_at::<Q>(next) >= key {
                    break;
                }
                cursor = next;
            }
            preds[level] = cursor;
        }
        preds
    }

    /// Read-only top-down search; stops at the first level where the key
    /// shows up.
    fn find<Q>(&self, key: &Q) -> Option<Link>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut cursor = Link::HEAD;
        for level in (0..=self.level).rev() {
            loop {
                let next = self.next(cursor, level);
                if next.is_null() {
                    break;
                }
                match self.key_at::<Q>(next).cmp(key) {
                    Ordering::Less => cursor = next,
                    Ordering::Equal => return Some(next),
                    Ordering::Greater => break,
                }
            }
        }
        None
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).map(|link| self.entry(link).value())
    }

    /// Mutable access to a stored value. The key and tower are untouched.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let link = self.find(key)?;
        Some(self.entry_mut(link).value_mut())
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.find(key).is_some()
    }

    /// Insert a new entry.
    ///
    /// Returns `false` without touching the list if `key` is already
    /// present; the stored value is kept.
    pub fn insert(&mut self, key: K, value: V) -> bool {
        let preds = self.find_predecessors(&key);

        let candidate = self.next(preds[0], 0);
        if !candidate.is_null() && *self.entry(candidate).key() == key {
            return false;
        }

        let height = self.heights.next_height();
        // New levels above the current top already have HEAD as predecessor.
        if height - 1 > self.level {
            self.level = height - 1;
        }

        let link = self.alloc(Entry::new(key, value, height));
        for level in (0..height).rev() {
            let next = self.next(preds[level], level);
            self.entry_mut(link).set_next(level, next);
            self.set_next(preds[level], level, link);
        }

        self.count += 1;
        true
    }

    /// Remove `key`, returning its value, or `None` if it was absent.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let preds = self.find_predecessors(key);

        let target = self.next(preds[0], 0);
        if target.is_null() || self.key_at::<Q>(target) != key {
            return None;
        }

        for level in (0..self.entry(target).level_count()).rev() {
            debug_assert_eq!(self.next(preds[level], level), target);
            let next = self.entry(target).next(level);
            self.set_next(preds[level], level, next);
        }

        let entry = self.release(target);
        self.count -= 1;

        while self.level > 0 && self.head[self.level].is_null() {
            self.level -= 1;
        }

        Some(entry.into_parts().1)
    }
}

impl<K, V> Default for SkipList<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for SkipList<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<'a, K, V> IntoIterator for &'a SkipList<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// =============================================================================
// Iteration
// =============================================================================

/// Ordered iterator over a [`SkipList`], walking level 0.
pub struct Iter<'a, K, V> {
    list: &'a SkipList<K, V>,
    cursor: Link,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor.is_null() {
            return None;
        }
        let entry = self.list.entry(self.cursor);
        self.cursor = entry.next(0);
        self.remaining -= 1;
        Some((entry.key(), entry.value()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Level-by-level rendering returned by [`SkipList::levels`].
///
/// ```text
/// Level 1: {3:b} --> {9:xiu} -->
/// Level 0: {1:a} --> {3:b} --> {7:c} --> {9:xiu} -->
/// ```
pub struct Levels<'a, K, V> {
    list: &'a SkipList<K, V>,
}

impl<K: fmt::Display, V: fmt::Display> fmt::Display for Levels<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = self.list;
        for level in (0..=list.level).rev() {
            write!(f, "Level {level}:")?;
            let mut cursor = list.head[level];
            while !cursor.is_null() {
                let entry = list.entry(cursor);
                write!(f, " {{{}:{}}} -->", entry.key(), entry.value())?;
                cursor = entry.next(level);
            }
            writeln!(f)?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod proptests;
