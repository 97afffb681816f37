//! Dependency (justification) ledger.
//!
//! Every fact this theory derives carries a *dependency*: the set of
//! externally-asserted boolean literals and term equalities sufficient to
//! explain it. Dependencies form a DAG of immutable nodes, stored in an
//! arena addressed by [`DepIdx`](../common/struct.DepIdx.html) rather than
//! as language-level recursive pointers: sharing is free, merging two
//! dependencies is O(1) (a join node), and linearization is iterative so
//! deep graphs cannot blow the stack.
//!
//! Nodes are created during constraint processing and die with their scope;
//! [`pop_scope`](struct.DepLedger.html#method.pop_scope) truncates the arena
//! back to the matching mark. Nothing outside the popped scopes can refer to
//! a popped node, because every structure holding a `DepIdx` is itself
//! scope-trailed.

use crate::common::*;

/// A possibly-absent dependency. `None` is the empty justification.
pub type Dep = Option<DepIdx>;

/// A real dependency node.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RDep {
    /// One asserted boolean literal.
    Lit(Lit),
    /// One externally-known equality between two terms.
    TermEq(Term, Term),
    /// Binary join of two dependencies.
    Join(DepIdx, DepIdx),
}

/// The ledger: an arena of immutable leaf/join nodes.
#[derive(Debug, Default)]
pub struct DepLedger {
    /// Arena.
    nodes: Vec<RDep>,
    /// Canonical cache for joins: `join` returns an existing node on a hit.
    joins: HashMap<(DepIdx, DepIdx), DepIdx>,
    /// Dedup cache for literal leaves.
    lit_leaves: HashMap<Lit, DepIdx>,
    /// Dedup cache for equality leaves.
    eq_leaves: HashMap<(Term, Term), DepIdx>,
    /// Scope marks: arena length at each push.
    limit: Vec<usize>,
}

impl DepLedger {
    /// Constructor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    /// True if no node is live.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push_node(&mut self, node: RDep) -> DepIdx {
        let idx: DepIdx = self.nodes.len().into();
        self.nodes.push(node);
        idx
    }

    /// Leaf node for an asserted literal.
    pub fn lit(&mut self, lit: Lit) -> DepIdx {
        if let Some(idx) = self.lit_leaves.get(&lit) {
            return *idx;
        }
        let idx = self.push_node(RDep::Lit(lit));
        self.lit_leaves.insert(lit, idx);
        idx
    }

    /// Leaf node for an externally-known equality. Symmetric.
    pub fn term_eq(&mut self, l: &Term, r: &Term) -> DepIdx {
        let (l, r) = if l.uid() <= r.uid() {
            (l.clone(), r.clone())
        } else {
            (r.clone(), l.clone())
        };
        let key = (l.clone(), r.clone());
        if let Some(idx) = self.eq_leaves.get(&key) {
            return *idx;
        }
        let idx = self.push_node(RDep::TermEq(l, r));
        self.eq_leaves.insert(key, idx);
        idx
    }

    /// Joins two dependencies.
    ///
    /// Nullable-safe: joining with `None` returns the other operand.
    /// Idempotent on identical nodes. Returns an existing node on a
    /// canonical cache hit.
    pub fn join(&mut self, d1: Dep, d2: Dep) -> Dep {
        match (d1, d2) {
            (None, d) | (d, None) => d,
            (Some(i1), Some(i2)) => {
                if i1 == i2 {
                    return Some(i1);
                }
                let key = if i1 <= i2 { (i1, i2) } else { (i2, i1) };
                if let Some(idx) = self.joins.get(&key) {
                    return Some(*idx);
                }
                let idx = self.push_node(RDep::Join(key.0, key.1));
                self.joins.insert(key, idx);
                Some(idx)
            }
        }
    }

    /// Flattens a dependency into its literal set and equality set.
    ///
    /// Precondition: every literal extracted must currently be assigned true
    /// by the external search. A violation is a soundness bug and fails
    /// loudly; it is never ignored.
    pub fn linearize<E: Engine>(
        &self,
        dep: Dep,
        engine: &E,
    ) -> Res<(Vec<Lit>, Vec<(Term, Term)>)> {
        let mut lits = Vec::new();
        let mut eqs = Vec::new();
        let mut seen = DepSet::new();
        let mut to_do = Vec::new();
        if let Some(idx) = dep {
            to_do.push(idx)
        }
        while let Some(idx) = to_do.pop() {
            if !seen.insert(idx) {
                continue;
            }
            match &self.nodes[*idx] {
                RDep::Lit(lit) => {
                    if !engine.assignment_of(*lit).is_true() {
                        bail!(ErrorKind::Internal(format!(
                            "dependency literal {} is not currently true",
                            lit
                        )))
                    }
                    lits.push(*lit)
                }
                RDep::TermEq(l, r) => eqs.push((l.clone(), r.clone())),
                RDep::Join(d1, d2) => {
                    to_do.push(*d1);
                    to_do.push(*d2)
                }
            }
        }
        lits.sort_unstable();
        lits.dedup();
        Ok((lits, eqs))
    }

    /// Opens a scope.
    pub fn push_scope(&mut self) {
        self.limit.push(self.nodes.len())
    }

    /// Closes `n` scopes, discarding every node created since the matching
    /// push.
    pub fn pop_scope(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        debug_assert!(n <= self.limit.len());
        let start = self.limit[self.limit.len() - n];
        self.limit.truncate(self.limit.len() - n);
        self.nodes.truncate(start);
        let bound: DepIdx = start.into();
        self.joins.retain(|_, idx| *idx < bound);
        self.lit_leaves.retain(|_, idx| *idx < bound);
        self.eq_leaves.retain(|_, idx| *idx < bound)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::harness::ScriptedEngine;

    #[test]
    fn join_is_nullable_safe_and_idempotent() {
        let mut ledger = DepLedger::new();
        let l = ledger.lit(Lit::new(0, true));
        assert_eq!(ledger.join(None, None), None);
        assert_eq!(ledger.join(Some(l), None), Some(l));
        assert_eq!(ledger.join(None, Some(l)), Some(l));
        assert_eq!(ledger.join(Some(l), Some(l)), Some(l))
    }

    #[test]
    fn join_canonical_cache() {
        let mut ledger = DepLedger::new();
        let l1 = ledger.lit(Lit::new(0, true));
        let l2 = ledger.lit(Lit::new(1, true));
        let j1 = ledger.join(Some(l1), Some(l2));
        let j2 = ledger.join(Some(l2), Some(l1));
        assert_eq!(j1, j2)
    }

    #[test]
    fn linearize_flattens_shared_graphs() {
        let mut engine = ScriptedEngine::new();
        let a1 = term::le(term::len(term::var(0)), term::int(3));
        let a2 = term::le(term::len(term::var(1)), term::int(4));
        let l1 = engine.literal_for(&a1);
        let l2 = engine.literal_for(&a2);
        engine.assign(&a1, true);
        engine.assign(&a2, true);

        let mut ledger = DepLedger::new();
        let d1 = ledger.lit(l1);
        let d2 = ledger.lit(l2);
        let j = ledger.join(Some(d1), Some(d2));
        // Join the join with one of its own leaves: must stay flat.
        let j = ledger.join(j, Some(d1));

        let (lits, eqs) = ledger.linearize(j, &engine).unwrap();
        assert_eq!(lits.len(), 2);
        assert!(lits.contains(&l1) && lits.contains(&l2));
        assert!(eqs.is_empty())
    }

    #[test]
    #[should_panic(expected = "not currently true")]
    fn linearize_rejects_stale_literals() {
        let mut engine = ScriptedEngine::new();
        let atom = term::prefix(term::var(0), term::var(1));
        let lit = engine.literal_for(&atom);
        // Atom left unassigned: linearization must fail loudly.
        let mut ledger = DepLedger::new();
        let leaf = ledger.lit(lit);
        ledger.linearize(Some(leaf), &engine).unwrap();
    }

    #[test]
    fn pop_scope_discards_nodes() {
        let mut ledger = DepLedger::new();
        let l1 = ledger.lit(Lit::new(0, true));
        ledger.push_scope();
        let l2 = ledger.lit(Lit::new(1, true));
        let _ = ledger.join(Some(l1), Some(l2));
        assert_eq!(ledger.len(), 3);
        ledger.pop_scope(1);
        assert_eq!(ledger.len(), 1);
        // The surviving leaf is still cached.
        assert_eq!(ledger.lit(Lit::new(0, true)), l1);
        assert_eq!(ledger.len(), 1)
    }
}
