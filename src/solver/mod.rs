//! Central solver state and the branch cascade.
//!
//! The cascade is a priority-ordered list of [`Tactic`](trait.Tactic.html)s.
//! Each final check runs them in order against the shared
//! [`Core`](struct.Core.html); the first tactic that makes progress (emits
//! an axiom, a propagation or a conflict) ends the round, and the external
//! search runs again before the next round. When no tactic fires the round
//! reports either consistency (all registries empty) or *undecided*.
//!
//! The `Core` owns every scope-trailed structure: the substitution store,
//! the dependency ledger, the exclusion table, the equation, disequation,
//! non-containment, membership and lexicographic registries, the deferred
//! axiom queue and the length-limit table. Tactics only ever mutate state
//! through it, so scope push/pop stays in one place.

use rand::SeedableRng;

use crate::automaton::Automaton;
use crate::common::*;
use crate::exclude::ExcludeTable;
use crate::subst::SubstStore;

pub mod branching;
pub mod contains;
pub mod eqs;
pub mod ext;
pub mod int_str;
pub mod lengths;
pub mod lex;
pub mod nqs;

/// What a tactic did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Emitted something: the round ends, the search re-runs.
    Fired,
    /// Nothing to do.
    Quiet,
}
impl Outcome {
    /// True on [`Fired`](enum.Outcome.html#variant.Fired).
    pub fn fired(self) -> bool {
        self == Outcome::Fired
    }
}

/// A branch-cascade tactic.
pub trait Tactic<E: Engine> {
    /// Tactic name, for logging and stats.
    fn name(&self) -> &'static str;
    /// Runs the tactic on the current state.
    fn apply(&mut self, core: &mut Core, engine: &mut E) -> Res<Outcome>;
}

/// The cascade, in priority order.
pub fn cascade<E: Engine>() -> Vec<Box<dyn Tactic<E>>> {
    vec![
        Box::new(eqs::SolveEqs::new()),
        Box::new(lex::CheckLts::new()),
        Box::new(nqs::SolveNqs::new()),
        Box::new(contains::CheckContains::new()),
        Box::new(lengths::ZeroLength::new()),
        Box::new(lengths::LenBasedSplit::new()),
        Box::new(lengths::FixedLength::new()),
        Box::new(int_str::CheckIntString::new()),
        Box::new(lengths::ReduceLengthEq::new()),
        Box::new(branching::BranchUnitVariable::new()),
        Box::new(branching::BranchBinaryVariable::new()),
        Box::new(branching::BranchVariable::new()),
        Box::new(lengths::CheckLengthCoherence::new()),
        Box::new(ext::CheckExtensionality::new()),
        Box::new(nqs::BranchNqs::new()),
    ]
}

/// A registry restored on pop by snapshot at push.
///
/// Items are hash-consed handles and small structs, so the clone at push is
/// cheap; restoration is trivially byte-for-byte.
#[derive(Debug, Clone)]
pub struct ScopedVec<T: Clone> {
    items: Vec<T>,
    snaps: Vec<Vec<T>>,
}
impl<T: Clone> Default for ScopedVec<T> {
    fn default() -> Self {
        ScopedVec { items: Vec::new(), snaps: Vec::new() }
    }
}
impl<T: Clone> ScopedVec<T> {
    /// Constructor.
    pub fn new() -> Self {
        Self::default()
    }
    /// Live items.
    pub fn items(&self) -> &[T] {
        &self.items
    }
    /// Mutable live items. Replacing the vector wholesale is fine, the
    /// snapshot was taken at push.
    pub fn items_mut(&mut self) -> &mut Vec<T> {
        &mut self.items
    }
    /// Adds an item.
    pub fn push(&mut self, item: T) {
        self.items.push(item)
    }
    /// Number of live items.
    pub fn len(&self) -> usize {
        self.items.len()
    }
    /// True if there is no live item.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
    /// Opens a scope.
    pub fn push_scope(&mut self) {
        self.snaps.push(self.items.clone())
    }
    /// Closes `n` scopes.
    pub fn pop_scope(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        debug_assert!(n <= self.snaps.len());
        let keep = self.snaps.len() - n;
        self.items = self.snaps[keep].clone();
        self.snaps.truncate(keep)
    }
}

/// A pending word equation: flattened sides and a justification.
#[derive(Debug, Clone)]
pub struct Eqn {
    /// Identifier, for logging.
    pub id: usize,
    /// Flattened left side.
    pub lhs: Vec<Term>,
    /// Flattened right side.
    pub rhs: Vec<Term>,
    /// Justification.
    pub dep: Dep,
}
impl Eqn {
    /// True if both sides are empty. Never stored in the registry.
    pub fn is_trivial(&self) -> bool {
        self.lhs.is_empty() && self.rhs.is_empty()
    }
}

/// A pending disequation with its residual case list.
#[derive(Debug, Clone)]
pub struct Diseq {
    /// Left term.
    pub lhs: Term,
    /// Right term.
    pub rhs: Term,
    /// Guard literals accumulated by decomposition. The disequation holds
    /// as long as one guard can still be false or one residual case is
    /// open.
    pub lits: Vec<Lit>,
    /// Residual cases: pairs of flattened sides one of which must differ.
    pub cases: Vec<(Vec<Term>, Vec<Term>)>,
    /// Justification.
    pub dep: Dep,
}

/// A negated containment obligation.
#[derive(Debug, Clone)]
pub struct NonCon {
    /// The container.
    pub a: Term,
    /// The would-be content.
    pub b: Term,
    /// Guard `len(a) < len(b)`. True discharges the obligation for free.
    pub guard: Lit,
    /// Positions of `a` already consumed by unrolling.
    pub consumed: usize,
    /// Justification, the `not contains` literal included.
    pub dep: Dep,
}

/// An assigned lexicographic atom over sequences.
#[derive(Debug, Clone)]
pub struct LexRel {
    /// Strict (`<`) or not (`<=`).
    pub strict: bool,
    /// Left side.
    pub lhs: Term,
    /// Right side.
    pub rhs: Term,
    /// The literal carrying the atom.
    pub lit: Lit,
}

/// A regex membership constraint on a sequence.
#[derive(Debug, Clone)]
pub struct Membership {
    /// The constrained sequence.
    pub seq: Term,
    /// The regex term, the automaton cache key.
    pub regex: Term,
    /// Compiled automaton (already complemented for negative memberships).
    pub auto: Arc<Automaton>,
    /// The membership literal.
    pub lit: Lit,
}

/// A pending acceptance obligation from unfolding.
#[derive(Debug, Clone)]
pub struct AcceptOb {
    /// The constrained sequence.
    pub seq: Term,
    /// Offset into the sequence.
    pub idx: usize,
    /// The regex term.
    pub regex: Term,
    /// Automaton state.
    pub state: StIdx,
    /// The automaton.
    pub auto: Arc<Automaton>,
    /// The acceptance literal guarding this obligation.
    pub lit: Lit,
}

/// Deferred axiom queue.
///
/// Axioms created inside event callbacks are queued and flushed later by
/// `do_deferred_work`; the head index is trailed so replay on backtracking
/// is exact.
#[derive(Debug, Default)]
pub struct AxiomQueue {
    axioms: Vec<Vec<Lit>>,
    head: usize,
    snaps: Vec<(usize, usize)>,
}
impl AxiomQueue {
    /// Queues a clause.
    pub fn push(&mut self, clause: Vec<Lit>) {
        self.axioms.push(clause)
    }
    /// True if clauses await flushing.
    pub fn has_pending(&self) -> bool {
        self.head < self.axioms.len()
    }
    /// Flushes pending clauses to the engine. Returns how many went out.
    pub fn flush<E: Engine>(&mut self, engine: &mut E) -> usize {
        let mut count = 0;
        while self.head < self.axioms.len() {
            engine.assert_axiom(&self.axioms[self.head]);
            self.head += 1;
            count += 1
        }
        count
    }
    /// Opens a scope.
    pub fn push_scope(&mut self) {
        self.snaps.push((self.axioms.len(), self.head))
    }
    /// Closes `n` scopes.
    pub fn pop_scope(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        debug_assert!(n <= self.snaps.len());
        let keep = self.snaps.len() - n;
        let (len, head) = self.snaps[keep];
        self.snaps.truncate(keep);
        self.axioms.truncate(len);
        self.head = head
    }
}

/// The shared solver state.
pub struct Core {
    /// Substitution store.
    pub subst: SubstStore,
    /// Dependency ledger.
    pub ledger: DepLedger,
    /// Exclusion table.
    pub exclude: ExcludeTable,
    /// Equation registry, FIFO within a round.
    pub eqs: ScopedVec<Eqn>,
    /// Disequation registry.
    pub nqs: ScopedVec<Diseq>,
    /// Non-containment registry.
    pub ncs: ScopedVec<NonCon>,
    /// Lexicographic atoms seen so far.
    pub lts: ScopedVec<LexRel>,
    /// Lexicographic pairs already closed, avoids re-deriving.
    pub lts_done: ScopedVec<(Lit, Lit)>,
    /// Regex memberships by sequence.
    pub members: ScopedVec<Membership>,
    /// Pending acceptance obligations.
    pub accepts: ScopedVec<AcceptOb>,
    /// Sequences already given a fixed-length or zero-length expansion.
    pub expanded: ScopedVec<Term>,
    /// Sequences already given a length-coherence branch.
    pub coherenced: ScopedVec<Term>,
    /// Int-string terms already given their base axioms.
    pub bridged: ScopedVec<Term>,
    /// Length terms already given their non-negativity axiom.
    pub len_grounded: ScopedVec<Term>,
    /// Deferred axiom queue.
    pub axioms: AxiomQueue,
    /// Per-sequence length limits, latest entry wins.
    pub limits: ScopedVec<(Term, usize)>,
    /// Adaptive unfolding depth. Tuning state, survives pops.
    pub depth: usize,
    /// Next equation id.
    pub next_eq_id: usize,
    /// RNG for the retry tie-break.
    pub rng: ::rand_xorshift::XorShiftRng,
    /// Profiler.
    pub _profiler: Profiler,
}

impl Core {
    /// Constructor.
    pub fn new() -> Self {
        let mut seed = [0u8; 16];
        seed[..8].copy_from_slice(&conf.cascade.seed.to_le_bytes());
        Core {
            subst: SubstStore::new(),
            ledger: DepLedger::new(),
            exclude: ExcludeTable::new(),
            eqs: ScopedVec::new(),
            nqs: ScopedVec::new(),
            ncs: ScopedVec::new(),
            lts: ScopedVec::new(),
            lts_done: ScopedVec::new(),
            members: ScopedVec::new(),
            accepts: ScopedVec::new(),
            expanded: ScopedVec::new(),
            coherenced: ScopedVec::new(),
            bridged: ScopedVec::new(),
            len_grounded: ScopedVec::new(),
            axioms: AxiomQueue::default(),
            limits: ScopedVec::new(),
            depth: conf.cascade.init_depth,
            next_eq_id: 0,
            rng: ::rand_xorshift::XorShiftRng::from_seed(seed),
            _profiler: Profiler::new(),
        }
    }

    /// Opens a scope on every trailed structure.
    pub fn push_scope(&mut self) {
        self.subst.push_scope();
        self.ledger.push_scope();
        self.exclude.push_scope();
        self.eqs.push_scope();
        self.nqs.push_scope();
        self.ncs.push_scope();
        self.lts.push_scope();
        self.lts_done.push_scope();
        self.members.push_scope();
        self.accepts.push_scope();
        self.expanded.push_scope();
        self.coherenced.push_scope();
        self.bridged.push_scope();
        self.len_grounded.push_scope();
        self.axioms.push_scope();
        self.limits.push_scope()
    }

    /// Closes `n` scopes on every trailed structure.
    pub fn pop_scope(&mut self, n: usize) {
        self.subst.pop_scope(n);
        self.ledger.pop_scope(n);
        self.exclude.pop_scope(n);
        self.eqs.pop_scope(n);
        self.nqs.pop_scope(n);
        self.ncs.pop_scope(n);
        self.lts.pop_scope(n);
        self.lts_done.pop_scope(n);
        self.members.pop_scope(n);
        self.accepts.pop_scope(n);
        self.expanded.pop_scope(n);
        self.coherenced.pop_scope(n);
        self.bridged.pop_scope(n);
        self.len_grounded.pop_scope(n);
        self.axioms.pop_scope(n);
        self.limits.pop_scope(n)
    }

    /// True if no obligation remains anywhere.
    pub fn is_solved(&self) -> bool {
        self.eqs.is_empty()
            && self.nqs.is_empty()
            && self.ncs.is_empty()
            && self.accepts.is_empty()
            && !self.axioms.has_pending()
    }

    // |===| Registration.

    /// Registers a sequence equation, flattening both sides.
    ///
    /// Zero-length equations are discharged immediately (both sides flatten
    /// to nothing); incompatible constant sides go straight to conflict.
    pub fn add_eq<E: Engine>(
        &mut self,
        engine: &mut E,
        lhs: &Term,
        rhs: &Term,
        dep: Dep,
    ) -> Res<()> {
        let ls = term::flatten(lhs);
        let rs = term::flatten(rhs);
        if ls == rs {
            return Ok(());
        }
        // Two distinct fully-constant words can never be reconciled.
        let all_cst = |side: &[Term]| {
            side.iter().all(|seg| {
                seg.unit_inspect()
                    .map(|e| matches!(e.get(), RTerm::CstChar(_)))
                    .unwrap_or(false)
            })
        };
        if all_cst(&ls) && all_cst(&rs) {
            log! { @debug "constant clash: {} = {}", lhs, rhs }
            return self.conflict(engine, dep);
        }
        let id = self.next_eq_id;
        self.next_eq_id += 1;
        log! { @debug "eq #{}: {} = {}", id, lhs, rhs }
        self.eqs.push(Eqn { id, lhs: ls, rhs: rs, dep });
        Ok(())
    }

    /// Registers a sequence disequation.
    pub fn add_diseq(&mut self, lhs: &Term, rhs: &Term, dep: Dep) {
        let case = (term::flatten(lhs), term::flatten(rhs));
        log! { @debug "diseq: {} != {}", lhs, rhs }
        self.nqs.push(Diseq {
            lhs: lhs.clone(),
            rhs: rhs.clone(),
            lits: Vec::new(),
            cases: vec![case],
            dep,
        })
    }

    /// Registers a negated containment, creating its length guard.
    pub fn add_non_containment<E: Engine>(
        &mut self,
        engine: &mut E,
        a: &Term,
        b: &Term,
        dep: Dep,
    ) {
        let guard_atom = term::lt(term::len(a.clone()), term::len(b.clone()));
        let guard = engine.literal_for(&guard_atom);
        log! { @debug "non-containment: !contains({}, {})", a, b }
        self.ncs.push(NonCon { a: a.clone(), b: b.clone(), guard, consumed: 0, dep })
    }

    /// Registers a membership and seeds its initial acceptance obligation.
    pub fn add_membership<E: Engine>(
        &mut self,
        engine: &mut E,
        seq: &Term,
        regex: &Term,
        auto: Arc<Automaton>,
        lit: Lit,
    ) -> Res<()> {
        self.members.push(Membership {
            seq: seq.clone(),
            regex: regex.clone(),
            auto: auto.clone(),
            lit,
        });
        let init = auto.init();
        let acc = term::accept(seq.clone(), 0, regex.clone(), init);
        let acc_lit = engine.literal_for(&acc);
        self.axioms.push(vec![!lit, acc_lit]);
        self.accepts.push(AcceptOb {
            seq: seq.clone(),
            idx: 0,
            regex: regex.clone(),
            state: init,
            auto,
            lit: acc_lit,
        });
        Ok(())
    }

    // |===| Canonization.

    /// Canonizes a term: resolves through the substitution store, then the
    /// external rewriter, to a fixpoint.
    pub fn canon<E: Engine>(&mut self, engine: &E, trm: &Term) -> (Term, Dep) {
        let mut dep = None;
        let mut current = trm.clone();
        // Two structures ping-pong; bounded since both shrink or fix.
        for _ in 0..8 {
            let (resolved, res_dep) = self.subst.find_with_dep(&current, &mut self.ledger);
            dep = self.ledger.join(dep, res_dep);
            let rewritten = engine.rewrite(&resolved);
            if rewritten == current {
                return (rewritten, dep);
            }
            current = rewritten
        }
        (current, dep)
    }

    // |===| Length oracle helpers.

    /// Exact known length of a sequence term, when the arithmetic oracle
    /// pins it.
    pub fn exact_len<E: Engine>(&self, engine: &E, seq: &Term) -> Option<Int> {
        engine.exact_value(&term::len(seq.clone()))
    }

    /// Per-sequence length limit, latest entry wins.
    pub fn length_limit(&self, seq: &Term) -> Option<usize> {
        self.limits
            .items()
            .iter()
            .rev()
            .find(|(s, _)| s == seq)
            .map(|(_, k)| *k)
    }

    /// Installs or raises a length limit.
    pub fn add_length_limit(&mut self, seq: &Term, k: usize) {
        log! { @verb "length limit: |{}| <= {}", seq, k }
        self.limits.push((seq.clone(), k))
    }

    // |===| Emission.

    /// Validation mode: re-checks an emitted implication on a disposable
    /// oracle. `implied: None` validates a conflict.
    fn validate<E: Engine>(
        &mut self,
        engine: &mut E,
        lits: &[Lit],
        eqs: &[(Term, Term)],
        implied: Option<&Term>,
    ) -> Res<()> {
        let mut conj = Vec::with_capacity(lits.len() + eqs.len() + 1);
        for lit in lits {
            let atom = engine.atom_of(*lit);
            conj.push(if lit.is_pos() { atom } else { term::not(atom) })
        }
        for (l, r) in eqs {
            conj.push(term::eq(l.clone(), r.clone()))
        }
        if let Some(implied) = implied {
            conj.push(term::not(implied.clone()))
        }
        if engine.nested_check(&conj)?.is_true() {
            bail!(ErrorKind::Internal(format!(
                "validation failed for emitted {}",
                match implied {
                    Some(t) => format!("implication of {}", t),
                    None => "conflict".into(),
                }
            )))
        }
        Ok(())
    }

    /// Emits a justified contradiction.
    pub fn conflict<E: Engine>(&mut self, engine: &mut E, dep: Dep) -> Res<()> {
        let (lits, eqs) = self.ledger.linearize(dep, engine)?;
        log! { @verb "conflict on {} literal(s), {} equalit(ies)", lits.len(), eqs.len() }
        profile! { self "conflicts" => add 1 }
        if conf.cascade.validate {
            self.validate(engine, &lits, &eqs, None)?
        }
        engine.conflict(&lits, &eqs);
        Ok(())
    }

    /// Emits a justified implication of a boolean term.
    ///
    /// Vacuous if the term is already true; a refuted term raises a
    /// conflict on the joined justification. Returns true on progress.
    pub fn propagate<E: Engine>(
        &mut self,
        engine: &mut E,
        dep: Dep,
        implied: &Term,
    ) -> Res<bool> {
        match implied.bool_cst() {
            Some(true) => return Ok(false),
            Some(false) => {
                self.conflict(engine, dep)?;
                return Ok(true);
            }
            None => (),
        }
        let lit = engine.literal_for(implied);
        match engine.assignment_of(lit) {
            Truth::True => Ok(false),
            Truth::False => {
                let neg = self.ledger.lit(!lit);
                let dep = self.ledger.join(dep, Some(neg));
                self.conflict(engine, dep)?;
                Ok(true)
            }
            Truth::Unknown => {
                let (lits, eqs) = self.ledger.linearize(dep, engine)?;
                log! { @debug "propagate {}", implied }
                profile! { self "propagations" => add 1 }
                if conf.cascade.validate {
                    self.validate(engine, &lits, &eqs, Some(implied))?
                }
                engine.propagate(&lits, &eqs, lit);
                Ok(true)
            }
        }
    }

    /// Emits a justified equality between two sequence terms.
    pub fn propagate_eq<E: Engine>(
        &mut self,
        engine: &mut E,
        dep: Dep,
        lhs: &Term,
        rhs: &Term,
    ) -> Res<bool> {
        if lhs == rhs {
            return Ok(false);
        }
        let (lits, eqs) = self.ledger.linearize(dep, engine)?;
        log! { @debug "propagate {} = {}", lhs, rhs }
        profile! { self "eq propagations" => add 1 }
        if conf.cascade.validate {
            let eq = term::eq(lhs.clone(), rhs.clone());
            self.validate(engine, &lits, &eqs, Some(&eq))?
        }
        engine.propagate_eq(&lits, &eqs, lhs, rhs);
        Ok(true)
    }

    /// Queues an axiom clause built from boolean terms.
    pub fn add_axiom<E: Engine>(&mut self, engine: &mut E, clause: &[Term]) {
        let mut lits = Vec::with_capacity(clause.len());
        for trm in clause {
            match trm.bool_cst() {
                // A true disjunct makes the clause vacuous.
                Some(true) => return,
                Some(false) => continue,
                None => {
                    let lit = engine.literal_for(trm);
                    engine.mark_relevant(lit);
                    lits.push(lit)
                }
            }
        }
        profile! { self "axioms" => add 1 }
        self.axioms.push(lits)
    }
}

impl Default for Core {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn scoped_vec_restores_snapshots() {
        let mut reg = ScopedVec::new();
        reg.push(1);
        reg.push_scope();
        reg.push(2);
        reg.items_mut().remove(0);
        assert_eq!(reg.items(), &[2]);
        reg.pop_scope(1);
        assert_eq!(reg.items(), &[1])
    }

    #[test]
    fn constant_clash_conflicts_at_registration() {
        let mut engine = crate::harness::ScriptedEngine::new();
        let mut core = Core::new();
        core.add_eq(&mut engine, &term::str_lit("ab"), &term::str_lit("ba"), None)
            .unwrap();
        assert!(engine.in_conflict());
        assert!(core.eqs.is_empty())
    }

    #[test]
    fn axiom_queue_trails_its_head() {
        let mut engine = crate::harness::ScriptedEngine::new();
        let mut queue = AxiomQueue::default();
        queue.push(vec![Lit::new(0, true)]);
        assert_eq!(queue.flush(&mut engine), 1);
        queue.push_scope();
        queue.push(vec![Lit::new(1, true)]);
        queue.pop_scope(1);
        assert!(!queue.has_pending());
        assert_eq!(queue.flush(&mut engine), 0)
    }
}
