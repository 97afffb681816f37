//! Variable branching: the case-split tactics.
//!
//! These fire only when no deterministic rewrite applies. Each emits a
//! finite disjunction of hypotheses as theory lemmas and lets the external
//! search pick a branch; the equation solver then reduces under whatever
//! the search commits to.

use crate::common::*;
use crate::solver::{Core, Eqn, Outcome, Tactic};

/// Negated linearization of a dependency, the antecedent part of a lemma
/// clause.
fn negated_deps<E: Engine>(core: &mut Core, engine: &mut E, dep: Dep) -> Res<Vec<Lit>> {
    let (lits, eqs) = core.ledger.linearize(dep, engine)?;
    let mut clause = Vec::with_capacity(lits.len() + eqs.len());
    for lit in lits {
        clause.push(!lit)
    }
    for (l, r) in eqs {
        let eq_lit = engine.literal_for(&term::eq(l, r));
        clause.push(!eq_lit)
    }
    Ok(clause)
}

/// Tactic 10: unit-variable branching.
///
/// `x = u_1 ... u_p rest` with `x` a bare variable and a non-empty unit
/// run: branch `x` over the unit-run prefixes, up to the configured bound,
/// with "longer than the bound" as the escape disjunct.
pub struct BranchUnitVariable {
    /// Equation ids already branched.
    done: Vec<usize>,
}

impl BranchUnitVariable {
    /// Constructor.
    pub fn new() -> Self {
        BranchUnitVariable { done: Vec::new() }
    }

    /// Matches `[x] = units ++ rest` in either orientation.
    fn matches(eqn: &Eqn) -> Option<(Term, Vec<Term>)> {
        for (var_side, other) in [(&eqn.lhs, &eqn.rhs), (&eqn.rhs, &eqn.lhs)] {
            if var_side.len() == 1
                && var_side[0].is_var()
                && term::unit_prefix_len(other) > 0
            {
                return Some((var_side[0].clone(), other.clone()));
            }
        }
        None
    }
}

impl<E: Engine> Tactic<E> for BranchUnitVariable {
    fn name(&self) -> &'static str {
        "branch_unit_variable"
    }

    fn apply(&mut self, core: &mut Core, engine: &mut E) -> Res<Outcome> {
        let eqns = core.eqs.items().to_vec();
        for eqn in &eqns {
            if self.done.contains(&eqn.id) {
                continue;
            }
            let (var, other) = match Self::matches(eqn) {
                Some(found) => found,
                None => continue,
            };
            self.done.push(eqn.id);
            let run = term::unit_prefix_len(&other).min(conf.cascade.branch_unit_max);
            let mut clause = negated_deps(core, engine, eqn.dep)?;
            for i in 0..=run {
                let case = term::eq(var.clone(), term::unflatten(&other[..i]));
                let lit = engine.literal_for(&case);
                engine.mark_relevant(lit);
                clause.push(lit)
            }
            let longer = term::gt(term::len(var.clone()), term::int(run));
            let longer_lit = engine.literal_for(&longer);
            engine.mark_relevant(longer_lit);
            clause.push(longer_lit);
            core.axioms.push(clause);
            log! { @verb "unit branching on {} over {} case(s)", var, run + 1 }
            profile! { core "unit branches" => add 1 }
            return Ok(Outcome::Fired);
        }
        Ok(Outcome::Quiet)
    }
}

/// Tactic 11: binary-variable branching.
///
/// `x u_run ... = u_run' y`: either `x` is a prefix of the leading unit
/// run of the other side, or that run is a prefix of `x`. The second case
/// rewrites `x` as the run plus its own tail, which re-enables the
/// equation solver.
pub struct BranchBinaryVariable {
    /// Equation ids already branched.
    done: Vec<usize>,
}

impl BranchBinaryVariable {
    /// Constructor.
    pub fn new() -> Self {
        BranchBinaryVariable { done: Vec::new() }
    }

    /// Matches `x ... = u_1 ... u_p y` in either orientation, returning
    /// the variable and the facing unit run.
    fn matches(eqn: &Eqn) -> Option<(Term, Vec<Term>)> {
        for (fst, snd) in [(&eqn.lhs, &eqn.rhs), (&eqn.rhs, &eqn.lhs)] {
            if fst.len() < 2 || snd.len() < 2 {
                continue;
            }
            let p = term::unit_prefix_len(snd);
            if fst[0].is_var()
                && p > 0
                && snd.last().map(|t| t.is_var()).unwrap_or(false)
            {
                return Some((fst[0].clone(), snd[..p].to_vec()));
            }
        }
        None
    }
}

impl<E: Engine> Tactic<E> for BranchBinaryVariable {
    fn name(&self) -> &'static str {
        "branch_binary_variable"
    }

    fn apply(&mut self, core: &mut Core, engine: &mut E) -> Res<Outcome> {
        let eqns = core.eqs.items().to_vec();
        for eqn in &eqns {
            if self.done.contains(&eqn.id) {
                continue;
            }
            let (var, run) = match Self::matches(eqn) {
                Some(found) => found,
                None => continue,
            };
            self.done.push(eqn.id);
            let p = run.len();
            let deps = negated_deps(core, engine, eqn.dep)?;

            // Case split on the variable reaching past the unit run.
            let longer = term::gt(term::len(var.clone()), term::int(p));
            let longer_lit = engine.literal_for(&longer);
            engine.mark_relevant(longer_lit);

            // Shorter or equal: the variable is a prefix of the run.
            let mut clause = deps.clone();
            clause.push(longer_lit);
            for i in 0..=p {
                let case = term::eq(var.clone(), term::unflatten(&run[..i]));
                let lit = engine.literal_for(&case);
                engine.mark_relevant(lit);
                clause.push(lit)
            }
            core.axioms.push(clause);

            // Longer: the run is a prefix of the variable.
            let rewrite = term::eq(
                var.clone(),
                term::cat(
                    term::unflatten(&run),
                    term::sk_tail(var.clone(), term::int(p)),
                ),
            );
            let rewrite_lit = engine.literal_for(&rewrite);
            let mut clause = deps;
            clause.push(!longer_lit);
            clause.push(rewrite_lit);
            core.axioms.push(clause);

            log! { @verb "binary branching on {} against a {}-unit run", var, p }
            profile! { core "binary branches" => add 1 }
            return Ok(Outcome::Fired);
        }
        Ok(Outcome::Quiet)
    }
}

/// Tactic 12: general variable branching, the Nielsen-style fallback.
///
/// Compares the leading segments of the first open equation by length and
/// decomposes the longer one with aligned prefix/suffix helpers. When the
/// relative order is unknown the comparison literal is surfaced for the
/// search to decide.
pub struct BranchVariable {
    /// Equation ids already branched.
    done: Vec<usize>,
}

impl BranchVariable {
    /// Constructor.
    pub fn new() -> Self {
        BranchVariable { done: Vec::new() }
    }

    /// Emits the decomposition lemmas for `shorter` aligned inside
    /// `longer` under `cond`.
    fn decompose<E: Engine>(
        core: &mut Core,
        engine: &mut E,
        deps: &[Lit],
        cond: Lit,
        shorter: &Term,
        longer: &Term,
    ) -> Res<()> {
        let cut = term::len(shorter.clone());
        let pre = term::sk_pre(longer.clone(), cut.clone());
        let post = term::sk_post(longer.clone(), cut);

        let align = term::eq(shorter.clone(), pre.clone());
        let split = term::eq(longer.clone(), term::cat(pre, post));
        for implied in [align, split] {
            let lit = engine.literal_for(&implied);
            engine.mark_relevant(lit);
            let mut clause = deps.to_vec();
            clause.push(!cond);
            clause.push(lit);
            core.axioms.push(clause)
        }
        Ok(())
    }
}

impl<E: Engine> Tactic<E> for BranchVariable {
    fn name(&self) -> &'static str {
        "branch_variable"
    }

    fn apply(&mut self, core: &mut Core, engine: &mut E) -> Res<Outcome> {
        let eqns = core.eqs.items().to_vec();
        for eqn in &eqns {
            if self.done.contains(&eqn.id) || eqn.lhs.is_empty() || eqn.rhs.is_empty() {
                continue;
            }
            let (l0, r0) = (eqn.lhs[0].clone(), eqn.rhs[0].clone());
            let cmp = term::le(term::len(l0.clone()), term::len(r0.clone()));
            let cmp_lit = engine.literal_for(&cmp);
            match engine.assignment_of(cmp_lit) {
                Truth::Unknown => {
                    // Surface the comparison and let the search decide.
                    engine.mark_relevant(cmp_lit);
                    log! { @debug "surfacing length comparison for eq #{}", eqn.id }
                    return Ok(Outcome::Fired);
                }
                Truth::True => {
                    self.done.push(eqn.id);
                    let deps = negated_deps(core, engine, eqn.dep)?;
                    Self::decompose(core, engine, &deps, cmp_lit, &l0, &r0)?
                }
                Truth::False => {
                    self.done.push(eqn.id);
                    let deps = negated_deps(core, engine, eqn.dep)?;
                    Self::decompose(core, engine, &deps, !cmp_lit, &r0, &l0)?
                }
            }
            log! { @verb "general branching on eq #{}", eqn.id }
            profile! { core "general branches" => add 1 }
            return Ok(Outcome::Fired);
        }
        Ok(Outcome::Quiet)
    }
}
