//! Substitution store: the current solved form.
//!
//! Maps sequence terms (mostly variables) to their solved definition, each
//! binding carrying the [`Dep`](../dep/type.Dep.html) that justifies it.
//! Resolution is transitive: binding `x -> y` then `y -> z` makes `x`
//! resolve to `z`, with the joined dependency.
//!
//! Restoration is op-granular. Every mutation pushes an inverse operation on
//! a trail; popping a scope replays the trail backwards. This is what keeps
//! bindings made *below* a scope alive across pops while undoing
//! overwrites exactly.
//!
//! Resolution results are memoized per decision level; the cache is flushed
//! on every update and every pop since any cached normal form may be stale
//! after either.

use std::cell::RefCell;

use crate::common::*;
use crate::dep::DepLedger;

/// Inverse operations, recorded at update time.
#[derive(Debug, Clone)]
enum TrailOp {
    /// The key was freshly inserted: undo by removing it.
    Ins(Term),
    /// The key was overwritten: undo by restoring the previous binding.
    Del(Term, Term, Dep),
}

/// The substitution store.
#[derive(Debug, Default)]
pub struct SubstStore {
    /// Current bindings.
    map: HashMap<Term, (Term, Dep)>,
    /// Memoized resolutions, flushed on update and pop.
    cache: RefCell<HashMap<Term, (Term, Dep)>>,
    /// Inverse-operation trail.
    trail: Vec<TrailOp>,
    /// Scope marks: trail length at each push.
    limit: Vec<usize>,
}

impl SubstStore {
    /// Constructor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live bindings.
    pub fn len(&self) -> usize {
        self.map.len()
    }
    /// True if there is no binding.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// True if the term has no binding of its own.
    ///
    /// Roots are the terms the cascade works on; bound terms are always
    /// resolved away first.
    pub fn is_root(&self, t: &Term) -> bool {
        !self.map.contains_key(t)
    }

    /// Binds `key` to `def` under dependency `dep`.
    ///
    /// `key` must not occur in `def`, resolution would otherwise diverge.
    /// The one exception is the nth-decomposition of `key` itself, where
    /// the occurrences sit below element accessors resolution never
    /// chases.
    pub fn update(&mut self, key: Term, def: Term, dep: Dep) {
        debug_assert_eq!(key.typ(), term::Typ::Seq);
        debug_assert!(
            !term::occurs(&key, &def) || term::is_nth_expansion(&key, &term::flatten(&def)),
            "cyclic binding {} -> {}",
            key,
            def
        );
        self.cache.borrow_mut().clear();
        match self.map.insert(key.clone(), (def, dep)) {
            None => self.trail.push(TrailOp::Ins(key)),
            Some((old_def, old_dep)) => self.trail.push(TrailOp::Del(key, old_def, old_dep)),
        }
    }

    /// Resolves a term through the store, without the dependency.
    pub fn find(&self, t: &Term, ledger: &mut DepLedger) -> Term {
        self.find_with_dep(t, ledger).0
    }

    /// Resolves a term through the store.
    ///
    /// Bindings are chased transitively; composite sequence terms are
    /// rebuilt from their resolved segments. The returned dependency joins
    /// the dependencies of every binding used.
    pub fn find_with_dep(&self, t: &Term, ledger: &mut DepLedger) -> (Term, Dep) {
        if let Some(res) = self.cache.borrow().get(t) {
            return res.clone();
        }
        let res = self.resolve(t, ledger);
        self.cache.borrow_mut().insert(t.clone(), res.clone());
        res
    }

    fn resolve(&self, t: &Term, ledger: &mut DepLedger) -> (Term, Dep) {
        use crate::term::RTerm;

        // Chase direct bindings first. The occurs check in `update` only
        // sees one binding at a time, so a cyclic chain means a broken
        // caller: abort loudly instead of spinning.
        let mut current = t.clone();
        let mut dep = None;
        let mut chain = Vec::new();
        while let Some((def, bnd_dep)) = self.map.get(&current) {
            assert!(
                !chain.contains(&current),
                "cyclic substitution chain through {}",
                current
            );
            chain.push(current.clone());
            dep = ledger.join(dep, *bnd_dep);
            current = def.clone()
        }

        // Then resolve inside composite sequence terms.
        match current.get() {
            RTerm::Cat(l, r) => {
                let (l2, l_dep) = self.find_with_dep(l, ledger);
                let (r2, r_dep) = self.find_with_dep(r, ledger);
                let inner = ledger.join(l_dep, r_dep);
                let dep = ledger.join(dep, inner);
                let rebuilt = term::cat(l2, r2);
                if rebuilt != current {
                    // The rebuilt term may itself be bound.
                    let (fin, fin_dep) = self.find_with_dep(&rebuilt, ledger);
                    (fin, ledger.join(dep, fin_dep))
                } else {
                    (rebuilt, dep)
                }
            }
            RTerm::Unit(e) => {
                let (e2, e_dep) = self.find_with_dep(e, ledger);
                let dep = ledger.join(dep, e_dep);
                (term::unit(e2), dep)
            }
            _ => (current, dep),
        }
    }

    /// Iterates over the current bindings.
    pub fn bindings(&self) -> impl Iterator<Item = (&Term, &Term, Dep)> {
        self.map.iter().map(|(k, (d, dep))| (k, d, *dep))
    }

    /// Opens a scope.
    pub fn push_scope(&mut self) {
        self.limit.push(self.trail.len())
    }

    /// Closes `n` scopes, replaying the trail backwards.
    pub fn pop_scope(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        debug_assert!(n <= self.limit.len());
        let start = self.limit[self.limit.len() - n];
        self.limit.truncate(self.limit.len() - n);
        while self.trail.len() > start {
            match self.trail.pop().expect("trail is non-empty") {
                TrailOp::Ins(key) => {
                    let prev = self.map.remove(&key);
                    debug_assert!(prev.is_some())
                }
                TrailOp::Del(key, def, dep) => {
                    self.map.insert(key, (def, dep));
                }
            }
        }
        self.cache.borrow_mut().clear()
    }
}

impl_fmt! {
    SubstStore(self, fmt) {
        writeln!(fmt, "subst {{")?;
        for (key, def, dep) in self.bindings() {
            writeln!(
                fmt, "  {} -> {}{}", key, def,
                if dep.is_some() { " (dep)" } else { "" }
            )?
        }
        write!(fmt, "}}")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn resolution_is_transitive() {
        let mut ledger = DepLedger::new();
        let mut store = SubstStore::new();
        let (x, y, z) = (term::var(0), term::var(1), term::var(2));
        store.update(x.clone(), y.clone(), None);
        store.update(y.clone(), z.clone(), None);
        assert_eq!(store.find(&x, &mut ledger), z);
        assert!(store.is_root(&z));
        assert!(!store.is_root(&x))
    }

    #[test]
    fn resolution_joins_dependencies() {
        let mut engine = crate::harness::ScriptedEngine::new();
        let a1 = term::prefix(term::var(10), term::var(0));
        let a2 = term::prefix(term::var(11), term::var(1));
        let l1 = engine.literal_for(&a1);
        let l2 = engine.literal_for(&a2);
        engine.assign(&a1, true);
        engine.assign(&a2, true);

        let mut ledger = DepLedger::new();
        let d1 = ledger.lit(l1);
        let d2 = ledger.lit(l2);

        let mut store = SubstStore::new();
        let (x, y, z) = (term::var(0), term::var(1), term::var(2));
        store.update(x.clone(), y.clone(), Some(d1));
        store.update(y, z, Some(d2));

        let (_, dep) = store.find_with_dep(&x, &mut ledger);
        let (lits, _) = ledger.linearize(dep, &engine).unwrap();
        assert_eq!(lits.len(), 2)
    }

    #[test]
    fn composite_terms_resolve_inside() {
        let mut ledger = DepLedger::new();
        let mut store = SubstStore::new();
        let (x, y) = (term::var(0), term::var(1));
        store.update(x.clone(), term::str_lit("ab"), None);
        let t = term::cat(x, y.clone());
        let resolved = store.find(&t, &mut ledger);
        assert_eq!(resolved, term::cat(term::str_lit("ab"), y))
    }

    #[test]
    fn pop_restores_overwrites_and_keeps_older_bindings() {
        let mut ledger = DepLedger::new();
        let mut store = SubstStore::new();
        let (x, y, z) = (term::var(0), term::var(1), term::var(2));

        store.update(x.clone(), y.clone(), None);
        store.push_scope();
        store.update(x.clone(), z.clone(), None);
        store.update(y.clone(), z.clone(), None);
        assert_eq!(store.find(&x, &mut ledger), z);

        store.pop_scope(1);
        // The overwrite of `x` is undone, the pre-scope binding survives.
        assert_eq!(store.find(&x, &mut ledger), y);
        assert!(store.is_root(&y))
    }

    #[test]
    #[should_panic(expected = "cyclic substitution chain")]
    fn cyclic_chains_abort_loudly() {
        let mut ledger = DepLedger::new();
        let mut store = SubstStore::new();
        let (x, y) = (term::var(0), term::var(1));
        // Each binding passes the local occurs check; the pair is cyclic.
        store.update(x.clone(), y.clone(), None);
        store.update(y, x.clone(), None);
        let _ = store.find(&x, &mut ledger);
    }

    #[test]
    fn shuffled_elimination_orders_stay_acyclic() {
        use rand::seq::SliceRandom;
        use rand::SeedableRng;

        let mut rng = rand_xorshift::XorShiftRng::from_seed([7; 16]);
        for _ in 0..20 {
            let mut ledger = DepLedger::new();
            let mut store = SubstStore::new();
            let mut order: Vec<usize> = (0..9).collect();
            order.shuffle(&mut rng);
            // Eliminate a chain of variables in a random order; whatever
            // the order, every chase terminates at the last variable.
            for i in order {
                store.update(term::var(i), term::var(i + 1), None)
            }
            for i in 0..10usize {
                assert_eq!(store.find(&term::var(i), &mut ledger), term::var(9))
            }
            assert!(store.is_root(&term::var(9)))
        }
    }

    #[test]
    fn cache_is_flushed_on_update() {
        let mut ledger = DepLedger::new();
        let mut store = SubstStore::new();
        let (x, y, z) = (term::var(0), term::var(1), term::var(2));
        store.update(x.clone(), y.clone(), None);
        assert_eq!(store.find(&x, &mut ledger), y);
        store.update(y.clone(), z.clone(), None);
        assert_eq!(store.find(&x, &mut ledger), z)
    }
}
