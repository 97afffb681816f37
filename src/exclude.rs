//! Exclusion table.
//!
//! Remembers pairs of sequence terms that branching has already committed
//! *against* equating, so that later branching never re-proposes a
//! unification the search has refuted. Pairs are canonicalized by uid, so
//! `(l, r)` and `(r, l)` are the same entry.

use crate::common::*;

/// The table. Scope restoration replays an insertion trail.
#[derive(Debug, Default)]
pub struct ExcludeTable {
    /// Canonicalized excluded pairs.
    set: HashSet<(Term, Term)>,
    /// Insertion trail, for pops.
    trail: Vec<(Term, Term)>,
    /// Scope marks: trail length at each push.
    limit: Vec<usize>,
}

impl ExcludeTable {
    /// Constructor.
    pub fn new() -> Self {
        Self::default()
    }

    fn key(l: &Term, r: &Term) -> (Term, Term) {
        if l.uid() <= r.uid() {
            (l.clone(), r.clone())
        } else {
            (r.clone(), l.clone())
        }
    }

    /// Excludes a pair. No-op if already excluded.
    pub fn update(&mut self, l: &Term, r: &Term) {
        let key = Self::key(l, r);
        if self.set.insert(key.clone()) {
            self.trail.push(key)
        }
    }

    /// True if the pair is excluded, in either orientation.
    pub fn contains(&self, l: &Term, r: &Term) -> bool {
        self.set.contains(&Self::key(l, r))
    }

    /// Number of excluded pairs.
    pub fn len(&self) -> usize {
        self.set.len()
    }
    /// True if nothing is excluded.
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Opens a scope.
    pub fn push_scope(&mut self) {
        self.limit.push(self.trail.len())
    }

    /// Closes `n` scopes.
    pub fn pop_scope(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        debug_assert!(n <= self.limit.len());
        let start = self.limit[self.limit.len() - n];
        self.limit.truncate(self.limit.len() - n);
        while self.trail.len() > start {
            let key = self.trail.pop().expect("trail is non-empty");
            let was_there = self.set.remove(&key);
            debug_assert!(was_there)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn symmetric_lookup() {
        let mut table = ExcludeTable::new();
        let (x, y) = (term::var(0), term::var(1));
        table.update(&x, &y);
        assert!(table.contains(&x, &y));
        assert!(table.contains(&y, &x));
        assert_eq!(table.len(), 1);
        // Re-inserting the flipped pair changes nothing.
        table.update(&y, &x);
        assert_eq!(table.len(), 1)
    }

    #[test]
    fn pop_forgets_scoped_entries() {
        let mut table = ExcludeTable::new();
        let (x, y, z) = (term::var(0), term::var(1), term::var(2));
        table.update(&x, &y);
        table.push_scope();
        table.update(&x, &z);
        table.pop_scope(1);
        assert!(table.contains(&x, &y));
        assert!(!table.contains(&x, &z))
    }
}
