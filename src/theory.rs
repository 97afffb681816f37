//! The theory plug-in: callback surface and cascade driver.
//!
//! [`TheorySeq`](struct.TheorySeq.html) is what the surrounding engine
//! talks to. Event callbacks (`on_literal_assigned`, `on_equivalence_merge`
//! and friends) register obligations; `on_final_check` runs the branch
//! cascade until a tactic fires or everything is quiet;
//! `should_research` implements the adaptive retry that keeps unfolding
//! depth unbounded across retries.

use rand::Rng;

use crate::common::*;
use crate::solver::{self, Core, LexRel, Outcome, Tactic};

/// The sequence theory.
pub struct TheorySeq<E: Engine> {
    /// The surrounding engine.
    engine: E,
    /// Shared solver state.
    core: Core,
    /// The branch cascade, in priority order.
    tactics: Vec<Box<dyn Tactic<E>>>,
}

impl<E: Engine> TheorySeq<E> {
    /// Constructor.
    pub fn new(engine: E) -> Self {
        TheorySeq { engine, core: Core::new(), tactics: solver::cascade() }
    }

    /// The surrounding engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }
    /// The surrounding engine, mutably.
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }
    /// The solver state. Test and diagnostics access.
    pub fn core(&self) -> &Core {
        &self.core
    }
    /// Current adaptive unfolding depth.
    pub fn depth(&self) -> usize {
        self.core.depth
    }

    // |===| Event callbacks.

    /// A literal owned by this theory was assigned.
    pub fn on_literal_assigned(&mut self, lit: Lit) -> Res<()> {
        let atom = self.engine.atom_of(lit);
        let pos = lit.is_pos();
        let leaf = self.core.ledger.lit(lit);
        let dep = Some(leaf);

        if let Some(args) = atom.app_inspect(term::Op::Eql) {
            if args[0].typ() == Typ::Seq {
                if pos {
                    self.core.add_eq(&mut self.engine, &args[0], &args[1], dep)?
                } else {
                    self.core.add_diseq(&args[0], &args[1], dep)
                }
            }
            return Ok(());
        }
        if let Some(args) = atom.app_inspect(term::Op::Contains) {
            if !pos {
                self.core.add_non_containment(&mut self.engine, &args[0], &args[1], dep)
            }
            return Ok(());
        }
        if let Some(args) = atom.app_inspect(term::Op::Prefix) {
            let (a, b) = (args[0].clone(), args[1].clone());
            if pos {
                // a is a prefix of b: b is a followed by its own tail.
                let rest = term::sk_tail(b.clone(), term::len(a.clone()));
                self.core.add_eq(&mut self.engine, &b, &term::cat(a, rest), dep)?
            } else {
                self.not_prefix(lit, &a, &b, dep)?
            }
            return Ok(());
        }
        if let Some(args) = atom.app_inspect(term::Op::Suffix) {
            let (a, b) = (args[0].clone(), args[1].clone());
            if pos {
                let cut = term::sub(term::len(b.clone()), term::len(a.clone()));
                let front = term::sk_pre(b.clone(), cut);
                self.core.add_eq(&mut self.engine, &b, &term::cat(front, a), dep)?
            } else {
                self.not_suffix(lit, &a, &b, dep)?
            }
            return Ok(());
        }
        if let Some(args) = atom.app_inspect(term::Op::SLt) {
            self.on_lex(true, &args[0], &args[1], lit, pos);
            return Ok(());
        }
        if let Some(args) = atom.app_inspect(term::Op::SLe) {
            self.on_lex(false, &args[0], &args[1], lit, pos);
            return Ok(());
        }
        if let Some(args) = atom.app_inspect(term::Op::InRe) {
            let (seq, regex) = (args[0].clone(), args[1].clone());
            let auto = self.engine.build_automaton(&regex, !pos)?;
            if auto.is_empty_lang() {
                // The (complemented) language is empty: the literal alone
                // is contradictory.
                self.core.conflict(&mut self.engine, dep)?;
                return Ok(());
            }
            self.core.add_membership(&mut self.engine, &seq, &regex, auto, lit)?;
            return Ok(());
        }
        Ok(())
    }

    /// Records an assigned lexicographic atom. A negated atom flips into
    /// its converse relation.
    fn on_lex(&mut self, strict: bool, lhs: &Term, rhs: &Term, lit: Lit, pos: bool) {
        // not (l < r) is r <= l; not (l <= r) is r < l.
        let rel = if pos {
            LexRel { strict, lhs: lhs.clone(), rhs: rhs.clone(), lit }
        } else {
            LexRel { strict: !strict, lhs: rhs.clone(), rhs: lhs.clone(), lit }
        };
        self.core.lts.push(rel)
    }

    /// Negative prefix: the would-be prefix is non-empty, and a mismatch
    /// witness exists.
    fn not_prefix(&mut self, lit: Lit, a: &Term, b: &Term, dep: Dep) -> Res<()> {
        self.core.propagate(
            &mut self.engine,
            dep,
            &term::not(term::eq(a.clone(), term::empty())),
        )?;
        // not prefix(a, b): a is longer than b, or a differs from the
        // aligned front of b.
        let longer = term::gt(term::len(a.clone()), term::len(b.clone()));
        let differs = term::not(term::eq(
            a.clone(),
            term::sk_pre(b.clone(), term::len(a.clone())),
        ));
        let pos_atom = self.engine.atom_of(lit);
        self.core
            .add_axiom(&mut self.engine, &[pos_atom, longer, differs]);
        Ok(())
    }

    /// Negative suffix, the mirror image.
    fn not_suffix(&mut self, lit: Lit, a: &Term, b: &Term, dep: Dep) -> Res<()> {
        self.core.propagate(
            &mut self.engine,
            dep,
            &term::not(term::eq(a.clone(), term::empty())),
        )?;
        let longer = term::gt(term::len(a.clone()), term::len(b.clone()));
        let cut = term::sub(term::len(b.clone()), term::len(a.clone()));
        let differs = term::not(term::eq(a.clone(), term::sk_post(b.clone(), cut)));
        let pos_atom = self.engine.atom_of(lit);
        self.core
            .add_axiom(&mut self.engine, &[pos_atom, longer, differs]);
        Ok(())
    }

    /// Two equivalence classes merged.
    pub fn on_equivalence_merge(&mut self, lhs: &Term, rhs: &Term) -> Res<()> {
        if lhs.typ() != Typ::Seq {
            return Ok(());
        }
        let leaf = self.core.ledger.term_eq(lhs, rhs);
        self.core.add_eq(&mut self.engine, lhs, rhs, Some(leaf))
    }

    /// Two classes separated.
    pub fn on_disequality(&mut self, lhs: &Term, rhs: &Term) -> Res<()> {
        if lhs.typ() != Typ::Seq {
            return Ok(());
        }
        let eq_atom = term::eq(lhs.clone(), rhs.clone());
        let neq_lit = !self.engine.literal_for(&eq_atom);
        let leaf = self.core.ledger.lit(neq_lit);
        self.core.add_diseq(lhs, rhs, Some(leaf));
        Ok(())
    }

    /// A term became relevant to the search.
    pub fn on_relevance_notify(&mut self, trm: &Term) {
        // Ground every relevant length term with its non-negativity.
        for sub in term::subterms(trm) {
            if sub.app_inspect(term::Op::Len).is_some()
                && !self.core.len_grounded.items().contains(&sub)
            {
                self.core.len_grounded.push(sub.clone());
                let clause = [term::ge(sub.clone(), term::zero())];
                self.core.add_axiom(&mut self.engine, &clause)
            }
        }
    }

    /// Scope push.
    pub fn on_push_scope(&mut self) {
        self.core.push_scope()
    }

    /// Scope pop.
    pub fn on_pop_scope(&mut self, n: usize) {
        self.core.pop_scope(n)
    }

    // |===| Deferred work.

    /// True if queued clauses await flushing.
    pub fn can_make_progress(&self) -> bool {
        self.core.axioms.has_pending()
    }

    /// Flushes the deferred axiom queue. Returns how many clauses went
    /// out.
    pub fn do_deferred_work(&mut self) -> usize {
        self.core.axioms.flush(&mut self.engine)
    }

    // |===| Final check.

    /// Runs the cascade once.
    ///
    /// Stops at the first tactic that fires and asks for another search
    /// round; reports consistency only when nothing fires and every
    /// registry is empty.
    pub fn on_final_check(&mut self) -> Res<FinalCheck> {
        let core = &mut self.core;
        let engine = &mut self.engine;
        if_log! { @debug
            log! { @debug "{}", core.subst }
        }
        let mut fired = None;
        for tactic in &mut self.tactics {
            conf.check_timeout()?;
            profile! { core tick "cascade", tactic.name() }
            let outcome = tactic.apply(&mut *core, &mut *engine)?;
            profile! { core mark "cascade", tactic.name() }
            if outcome.fired() {
                log! { @verb "tactic {} fired", tactic.name() }
                fired = Some(tactic.name());
                break;
            }
        }
        core.axioms.flush(engine);
        match fired {
            Some(_) => Ok(FinalCheck::Continue),
            None if self.core.is_solved() => {
                log! { @verb "{}", conf.happy("consistent") }
                Ok(FinalCheck::Done)
            }
            None => {
                log! { @verb "{}", conf.sad("give up: obligations remain but no tactic fires") }
                Ok(FinalCheck::Undecided)
            }
        }
    }

    // |===| Adaptive retry.

    /// Assumptions this theory wants active during the next check: the
    /// depth bound plus the current per-sequence length limits.
    pub fn add_theory_assumptions(&mut self) -> Vec<Term> {
        let mut assumptions = vec![term::max_depth(self.core.depth)];
        let mut seen = HConSet::<Term>::new();
        for (seq, k) in self.core.limits.items().iter().rev() {
            // Latest entry per sequence wins.
            if seen.insert(seq.clone()) {
                assumptions.push(term::len_limit(seq.clone(), *k))
            }
        }
        assumptions
    }

    /// Reacts to an unsat core over the theory assumptions.
    ///
    /// A blamed length limit (smallest bound, random tie-break) doubles
    /// and bumps the depth; a blamed depth bound grows by
    /// `depth <- (1 + 3 depth) / 2`. Returns true if a retry makes sense.
    pub fn should_research(&mut self, unsat_core: &[Term]) -> bool {
        let mut blamed_limits = Vec::new();
        let mut depth_blamed = false;
        for assumption in unsat_core {
            if let Some((seq, k)) = term::len_limit_inspect(assumption) {
                blamed_limits.push((seq, k))
            } else if term::max_depth_inspect(assumption).is_some() {
                depth_blamed = true
            }
        }

        if !blamed_limits.is_empty() {
            let min = blamed_limits.iter().map(|(_, k)| *k).min().expect("non-empty");
            let ties: Vec<_> =
                blamed_limits.into_iter().filter(|(_, k)| *k == min).collect();
            let pick = self.core.rng.gen_range(0..ties.len());
            let (seq, k) = &ties[pick];
            log! { @info "retry: raising length limit of {} to {}", seq, 2 * k }
            self.core.add_length_limit(seq, 2 * k);
            self.core.depth += 1;
            let core = &self.core;
            profile! { core "retries (limit)" => add 1 }
            return true;
        }
        if depth_blamed {
            let next = std::cmp::max(self.core.depth + 1, (1 + 3 * self.core.depth) / 2);
            log! { @info "retry: raising unfolding depth {} -> {}", self.core.depth, next }
            debug_assert!(next > self.core.depth);
            self.core.depth = next;
            let core = &self.core;
            profile! { core "retries (depth)" => add 1 }
            return true;
        }
        false
    }

    /// Prints the profiling stats if enabled.
    pub fn print_stats(&self) {
        print_stats("sequin", &self.core._profiler)
    }
}
