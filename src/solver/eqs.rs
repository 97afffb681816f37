//! Equation simplification loop.
//!
//! Drains the equation registry to a fixpoint. Each pass canonizes both
//! sides of every pending equation through the substitution store and the
//! external rewriter, then tries the structural rules: common-segment
//! stripping, empty-side discharge, unit solving, binary solving,
//! nth-decomposition solving and the int-string bridge. Equations no rule
//! touches stay registered for the branch cascade.

use crate::common::*;
use crate::solver::{Core, Eqn, Outcome, Tactic};

/// What happened to one equation in one pass.
enum Reduced {
    /// Fully discharged.
    Gone,
    /// Still open, possibly rewritten.
    Open(Eqn),
}

/// Tactic 1: equation simplification to fixpoint.
pub struct SolveEqs {
    /// Binary-solve pairs already expanded, avoids re-queueing `a = b`
    /// from `x a = b x` forever.
    expanded: Vec<usize>,
}

impl SolveEqs {
    /// Constructor.
    pub fn new() -> Self {
        SolveEqs { expanded: Vec::new() }
    }

    /// Canonizes every segment of a flattened side, re-flattening the
    /// results.
    fn canon_side<E: Engine>(
        core: &mut Core,
        engine: &E,
        side: &[Term],
        dep: &mut Dep,
    ) -> Vec<Term> {
        let mut out = Vec::with_capacity(side.len());
        for seg in side {
            let (canon, seg_dep) = core.canon(engine, seg);
            *dep = core.ledger.join(*dep, seg_dep);
            term::flatten_into(&canon, &mut out)
        }
        out
    }

    /// Strips structurally equal segments from both ends.
    fn strip(lhs: &mut Vec<Term>, rhs: &mut Vec<Term>) -> bool {
        let mut changed = false;
        while let (Some(l), Some(r)) = (lhs.first(), rhs.first()) {
            if l != r {
                break;
            }
            lhs.remove(0);
            rhs.remove(0);
            changed = true
        }
        while let (Some(l), Some(r)) = (lhs.last(), rhs.last()) {
            if l != r {
                break;
            }
            lhs.pop();
            rhs.pop();
            changed = true
        }
        changed
    }

    /// One reduction pass over a single equation. `changed` is set whenever
    /// the equation or any store mutates.
    fn reduce<E: Engine>(
        &mut self,
        core: &mut Core,
        engine: &mut E,
        mut eqn: Eqn,
        changed: &mut bool,
    ) -> Res<Reduced> {
        let mut dep = eqn.dep;
        let mut lhs = Self::canon_side(core, engine, &eqn.lhs, &mut dep);
        let mut rhs = Self::canon_side(core, engine, &eqn.rhs, &mut dep);
        if Self::strip(&mut lhs, &mut rhs) || lhs != eqn.lhs || rhs != eqn.rhs {
            *changed = true
        }

        // Both sides gone: discharged.
        if lhs.is_empty() && rhs.is_empty() {
            *changed = true;
            return Ok(Reduced::Gone);
        }

        // One side empty: the other must vanish too.
        if lhs.is_empty() || rhs.is_empty() {
            let side = if lhs.is_empty() { &rhs } else { &lhs };
            for seg in side {
                if seg.is_unit() {
                    // A unit can never be empty.
                    core.conflict(engine, dep)?;
                    *changed = true;
                    return Ok(Reduced::Gone);
                }
                if let Some(args) = seg.app_inspect(term::Op::IntToStr) {
                    // int-string bridge: itos(i) = "" means i < 0.
                    let neg = term::lt(args[0].clone(), term::zero());
                    if core.propagate(engine, dep, &neg)? {
                        *changed = true
                    }
                }
            }
            if side.iter().all(|seg| seg.is_var()) {
                for seg in side.clone() {
                    core.subst.update(seg, term::empty(), dep)
                }
                *changed = true;
                return Ok(Reduced::Gone);
            }
            eqn.lhs = lhs;
            eqn.rhs = rhs;
            eqn.dep = dep;
            return Ok(Reduced::Open(eqn));
        }

        // Leading units: element equality plus the remainders.
        if let (Some(le), Some(re)) = (unit_elem(&lhs[0]), unit_elem(&rhs[0])) {
            let elem_eq = term::eq(le.clone(), re.clone());
            match elem_eq.bool_cst() {
                Some(false) => {
                    core.conflict(engine, dep)?;
                    *changed = true;
                    return Ok(Reduced::Gone);
                }
                Some(true) => unreachable!("equal fronts survived stripping"),
                None => {
                    core.propagate_eq(engine, dep, &le, &re)?;
                    lhs.remove(0);
                    rhs.remove(0);
                    *changed = true;
                    if lhs.is_empty() && rhs.is_empty() {
                        return Ok(Reduced::Gone);
                    }
                    eqn.lhs = lhs;
                    eqn.rhs = rhs;
                    eqn.dep = dep;
                    return Ok(Reduced::Open(eqn));
                }
            }
        }

        // Unit solve: a bare variable against a side it does not occur in,
        // or its own nth-decomposition.
        for (var_side, other) in [(&lhs, &rhs), (&rhs, &lhs)] {
            if var_side.len() == 1 && var_side[0].is_var() {
                let var = &var_side[0];
                let def = term::unflatten(other);
                if !term::occurs(var, &def) || term::is_nth_expansion(var, other) {
                    log! { @debug "solved eq #{}: {} -> {}", eqn.id, var, def }
                    core.subst.update(var.clone(), def, dep);
                    profile! { core "eqs solved" => add 1 }
                    *changed = true;
                    return Ok(Reduced::Gone);
                }
            }
        }

        // Binary solve: `x a = b x` reduces to `a = b`, keeping the
        // original around. Done once per equation id.
        if lhs.len() > 1
            && rhs.len() > 1
            && lhs.first() == rhs.last()
            && lhs[0].is_var()
            && !self.expanded.contains(&eqn.id)
        {
            self.expanded.push(eqn.id);
            let inner_l = term::unflatten(&lhs[1..]);
            let inner_r = term::unflatten(&rhs[..rhs.len() - 1]);
            core.add_eq(engine, &inner_l, &inner_r, dep)?;
            *changed = true
        }

        eqn.lhs = lhs;
        eqn.rhs = rhs;
        eqn.dep = dep;
        Ok(Reduced::Open(eqn))
    }
}

/// Element of a unit segment, turning one-character literals into their
/// element constant.
pub fn unit_elem(seg: &Term) -> Option<Term> {
    if let Some(elem) = seg.unit_inspect() {
        return Some(elem.clone());
    }
    if let RTerm::CstStr(s) = seg.get() {
        let mut chars = s.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Some(term::chr(c));
        }
    }
    None
}

impl Default for SolveEqs {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Engine> Tactic<E> for SolveEqs {
    fn name(&self) -> &'static str {
        "solve_eqs"
    }

    fn apply(&mut self, core: &mut Core, engine: &mut E) -> Res<Outcome> {
        let mut fired = false;
        loop {
            conf.check_timeout()?;
            let mut changed = false;
            let pending = std::mem::take(core.eqs.items_mut());
            let mut kept = Vec::with_capacity(pending.len());
            for eqn in pending {
                match self.reduce(core, engine, eqn, &mut changed)? {
                    Reduced::Gone => (),
                    Reduced::Open(eqn) => {
                        debug_assert!(!eqn.is_trivial());
                        kept.push(eqn)
                    }
                }
            }
            // Equations registered during the pass land behind the kept
            // ones, FIFO order within the round.
            let mut fresh = std::mem::take(core.eqs.items_mut());
            kept.append(&mut fresh);
            *core.eqs.items_mut() = kept;
            if !changed {
                break;
            }
            fired = true
        }
        Ok(if fired { Outcome::Fired } else { Outcome::Quiet })
    }
}
