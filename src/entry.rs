//! Entries and the slot links that connect their towers.

/// Link: 32-bit slot index into the entry arena.
///
/// Two values are reserved:
/// - `u32::MAX` = NULL (end of a level's chain)
/// - `u32::MAX - 1` = HEAD (the sentinel tower owned by the list itself)
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct Link(u32);

impl Link {
    pub(crate) const NULL: Link = Link(u32::MAX);
    pub(crate) const HEAD: Link = Link(u32::MAX - 1);

    #[inline]
    pub(crate) fn slot(idx: usize) -> Self {
        assert!(
            idx < Self::HEAD.0 as usize,
            "entry arena exhausted the 32-bit slot space"
        );
        Self(idx as u32)
    }

    #[inline]
    pub(crate) fn is_null(self) -> bool {
        self == Self::NULL
    }

    #[inline]
    pub(crate) fn is_head(self) -> bool {
        self == Self::HEAD
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        debug_assert!(!self.is_null() && !self.is_head());
        self.0 as usize
    }
}

/// One key/value record plus its tower of successor links.
///
/// `tower[i]` is the next entry whose tower also reaches level `i`. The
/// tower height is fixed when the entry is created.
#[derive(Clone)]
pub(crate) struct Entry<K, V> {
    key: K,
    value: V,
    tower: Box<[Link]>,
}

impl<K, V> Entry<K, V> {
    pub(crate) fn new(key: K, value: V, level_count: usize) -> Self {
        debug_assert!(level_count >= 1);
        Self {
            key,
            value,
            tower: vec![Link::NULL; level_count].into_boxed_slice(),
        }
    }

    #[inline]
    pub(crate) fn key(&self) -> &K {
        &self.key
    }

    #[inline]
    pub(crate) fn value(&self) -> &V {
        &self.value
    }

    #[inline]
    pub(crate) fn value_mut(&mut self) -> &mut V {
        &mut self.value
    }

    #[inline]
    pub(crate) fn level_count(&self) -> usize {
        self.tower.len()
    }

    #[inline]
    pub(crate) fn next(&self, level: usize) -> Link {
        self.tower[level]
    }

    #[inline]
    pub(crate) fn set_next(&mut self, level: usize, link: Link) {
        self.tower[level] = link;
    }

    pub(crate) fn into_parts(self) -> (K, V) {
        (self.key, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tower_is_unlinked() {
        let e = Entry::new("k", 1u32, 3);
        assert_eq!(e.level_count(), 3);
        for level in 0..3 {
            assert!(e.next(level).is_null());
        }
    }

    #[test]
    fn test_value_mut_keeps_tower() {
        let mut e = Entry::new(7u64, "old", 2);
        e.set_next(1, Link::slot(4));
        *e.value_mut() = "new";
        assert_eq!(*e.value(), "new");
        assert_eq!(e.next(1), Link::slot(4));
        assert_eq!(e.into_parts(), (7, "new"));
    }

    #[test]
    fn test_reserved_links() {
        assert!(Link::NULL.is_null());
        assert!(!Link::NULL.is_head());
        assert!(Link::HEAD.is_head());
        assert_eq!(Link::slot(12).index(), 12);
    }
}
