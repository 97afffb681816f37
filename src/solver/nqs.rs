//! Disequation solving and witness branching.
//!
//! A disequation `l != r` is tracked as guard literals (element equalities
//! the search has committed to) plus residual cases (pairs of flattened
//! sides). The disequation is violated exactly when every guard is true and
//! every residual case has collapsed to equal sides; a single refuted guard
//! or a structurally incompatible case satisfies it and drops it from the
//! registry.

use crate::common::*;
use crate::solver::eqs::unit_elem;
use crate::solver::{Core, Diseq, Outcome, Tactic};

/// What one solving pass decided about a disequation.
enum Solved {
    /// A difference is established, the disequation holds.
    Holds,
    /// Still open.
    Open(Diseq),
    /// All guards true and no residual case left: violated.
    Violated(Diseq),
}

/// Tactic 3: disequation solving.
pub struct SolveNqs;

impl SolveNqs {
    /// Constructor.
    pub fn new() -> Self {
        SolveNqs
    }

    fn canon_case<E: Engine>(
        core: &mut Core,
        engine: &E,
        case: &(Vec<Term>, Vec<Term>),
        dep: &mut Dep,
    ) -> (Vec<Term>, Vec<Term>) {
        let mut canon = |side: &[Term]| {
            let mut out = Vec::with_capacity(side.len());
            for seg in side {
                let (c, seg_dep) = core.canon(engine, seg);
                *dep = core.ledger.join(*dep, seg_dep);
                term::flatten_into(&c, &mut out)
            }
            out
        };
        let lhs = canon(&case.0);
        let rhs = canon(&case.1);
        (lhs, rhs)
    }

    /// One pass over one disequation.
    fn solve<E: Engine>(
        core: &mut Core,
        engine: &mut E,
        mut diseq: Diseq,
        changed: &mut bool,
    ) -> Res<Solved> {
        // A refuted guard discharges the whole disequation.
        for lit in &diseq.lits {
            if engine.assignment_of(*lit).is_false() {
                *changed = true;
                return Ok(Solved::Holds);
            }
        }

        let mut dep = diseq.dep;
        let cases = std::mem::take(&mut diseq.cases);
        let mut kept = Vec::with_capacity(cases.len());
        for case in &cases {
            let (mut lhs, mut rhs) = Self::canon_case(core, engine, case, &mut dep);
            loop {
                // Strip leading equal segments.
                while !lhs.is_empty() && lhs.first() == rhs.first() {
                    lhs.remove(0);
                    rhs.remove(0);
                }
                if lhs.is_empty() && rhs.is_empty() {
                    // This case can no longer witness a difference.
                    break;
                }
                // Length mismatch with a unit against nothing: the sides
                // differ, the disequation holds.
                if (lhs.is_empty() && rhs.iter().all(|s| s.is_unit()))
                    || (rhs.is_empty() && lhs.iter().all(|s| s.is_unit()))
                {
                    *changed = true;
                    return Ok(Solved::Holds);
                }
                match (
                    lhs.first().and_then(|s| unit_elem(s)),
                    rhs.first().and_then(|s| unit_elem(s)),
                ) {
                    (Some(le), Some(re)) => {
                        let guard_atom = term::eq(le, re);
                        if guard_atom.bool_cst() == Some(false) {
                            // Incompatible constants: a difference exists.
                            *changed = true;
                            return Ok(Solved::Holds);
                        }
                        let guard = engine.literal_for(&guard_atom);
                        match engine.assignment_of(guard) {
                            Truth::False => {
                                *changed = true;
                                return Ok(Solved::Holds);
                            }
                            Truth::True => {
                                // Committed equal here, the difference must
                                // come from the remainders.
                                if !diseq.lits.contains(&guard) {
                                    diseq.lits.push(guard);
                                    *changed = true
                                }
                                lhs.remove(0);
                                rhs.remove(0);
                            }
                            Truth::Unknown => {
                                engine.mark_relevant(guard);
                                kept.push((lhs, rhs));
                                break;
                            }
                        }
                    }
                    _ => {
                        // Opaque front, nothing structural to do.
                        kept.push((lhs, rhs));
                        break;
                    }
                }
            }
        }
        if kept != cases {
            *changed = true
        }
        diseq.cases = kept;
        diseq.dep = dep;

        if diseq.cases.is_empty() {
            // Every case collapsed and every guard is true.
            *changed = true;
            return Ok(Solved::Violated(diseq));
        }
        Ok(Solved::Open(diseq))
    }
}

impl Default for SolveNqs {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Engine> Tactic<E> for SolveNqs {
    fn name(&self) -> &'static str {
        "solve_nqs"
    }

    fn apply(&mut self, core: &mut Core, engine: &mut E) -> Res<Outcome> {
        let mut fired = false;
        let pending = std::mem::take(core.nqs.items_mut());
        let mut kept = Vec::with_capacity(pending.len());
        for diseq in pending {
            let mut changed = false;
            match Self::solve(core, engine, diseq, &mut changed)? {
                Solved::Holds => {
                    profile! { core "nqs discharged" => add 1 }
                }
                Solved::Open(diseq) => kept.push(diseq),
                Solved::Violated(diseq) => {
                    let mut dep = diseq.dep;
                    for lit in &diseq.lits {
                        let leaf = core.ledger.lit(*lit);
                        dep = core.ledger.join(dep, Some(leaf))
                    }
                    core.conflict(engine, dep)?;
                    fired = true
                }
            }
            fired = fired || changed
        }
        let mut fresh = std::mem::take(core.nqs.items_mut());
        kept.append(&mut fresh);
        *core.nqs.items_mut() = kept;
        Ok(if fired { Outcome::Fired } else { Outcome::Quiet })
    }
}

/// Tactic 15: disequation branching.
///
/// Last resort for a disequation no structural rule touches: emit the
/// theory lemma forcing the external search to pick a concrete difference,
/// either refuting one committed guard or refuting one residual case
/// equality.
pub struct BranchNqs {
    /// Pairs already branched on, the lemma is asserted once.
    done: Vec<(Term, Term)>,
}

impl BranchNqs {
    /// Constructor.
    pub fn new() -> Self {
        BranchNqs { done: Vec::new() }
    }
}

impl<E: Engine> Tactic<E> for BranchNqs {
    fn name(&self) -> &'static str {
        "branch_nqs"
    }

    fn apply(&mut self, core: &mut Core, engine: &mut E) -> Res<Outcome> {
        let diseq = match core
            .nqs
            .items()
            .iter()
            .find(|d| !self.done.contains(&(d.lhs.clone(), d.rhs.clone())))
        {
            Some(diseq) => diseq.clone(),
            None => return Ok(Outcome::Quiet),
        };
        self.done.push((diseq.lhs.clone(), diseq.rhs.clone()));
        let (dep_lits, _) = core.ledger.linearize(diseq.dep, engine)?;
        let mut clause = Vec::with_capacity(dep_lits.len() + diseq.lits.len() + diseq.cases.len());
        for lit in dep_lits {
            clause.push(!lit)
        }
        for guard in &diseq.lits {
            clause.push(!*guard)
        }
        for (lhs, rhs) in &diseq.cases {
            let case_eq = term::eq(term::unflatten(lhs), term::unflatten(rhs));
            let lit = engine.literal_for(&case_eq);
            engine.mark_relevant(lit);
            clause.push(!lit)
        }
        log! { @verb "branching on diseq {} != {}", diseq.lhs, diseq.rhs }
        profile! { core "nqs branched" => add 1 }
        core.axioms.push(clause);
        Ok(Outcome::Fired)
    }
}
