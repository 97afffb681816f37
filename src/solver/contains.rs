//! Non-containment propagation and regex-membership unfolding.
//!
//! Negated containment first tries its length guard (`len(a) < len(b)`
//! discharges for free), then unrolls the containment axiom one position at
//! a time. Regex memberships unfold automaton acceptance obligations:
//! each true acceptance atom emits its state's length facts and one
//! transition clause; sink states conflict immediately. Two memberships on
//! the same sequence root are merged by product construction, moves gated
//! through the nested oracle.

use crate::common::*;
use crate::solver::{AcceptOb, Core, NonCon, Outcome, Tactic};

/// Tactic 4: (non-)containment and membership unfolding.
pub struct CheckContains {
    /// Membership literal pairs already merged.
    merged: Vec<(Lit, Lit)>,
    /// Product regex ids handed out so far. Product ids live in a reserved
    /// band counting down from the top, builder ids count up from zero.
    products: usize,
}

impl CheckContains {
    /// Constructor.
    pub fn new() -> Self {
        CheckContains { merged: Vec::new(), products: 0 }
    }

    fn fresh_product_re(&mut self) -> Term {
        self.products += 1;
        term::re(usize::MAX - self.products)
    }

    /// One pass over the non-containment registry.
    fn solve_ncs<E: Engine>(core: &mut Core, engine: &mut E) -> Res<bool> {
        let mut fired = false;
        let pending = std::mem::take(core.ncs.items_mut());
        let mut kept = Vec::with_capacity(pending.len());
        for mut nc in pending {
            match engine.assignment_of(nc.guard) {
                // Containment is impossible by length, discharged for free.
                Truth::True => {
                    profile! { core "ncs by length" => add 1 }
                    fired = true
                }
                Truth::Unknown => {
                    engine.mark_relevant(nc.guard);
                    kept.push(nc)
                }
                Truth::False => {
                    if nc.consumed >= core.depth {
                        // Out of budget: blame the depth assumption.
                        let blame = term::not(term::max_depth(core.depth));
                        if core.propagate(engine, nc.dep, &blame)? {
                            fired = true
                        }
                        kept.push(nc);
                        continue;
                    }
                    // One unrolling step: the remaining suffix of `a` does
                    // not start with `b`, and the next suffix still avoids
                    // `b`.
                    let guard_leaf = core.ledger.lit(!nc.guard);
                    let dep = core.ledger.join(nc.dep, Some(guard_leaf));
                    let suffix = if nc.consumed == 0 {
                        nc.a.clone()
                    } else {
                        term::sk_tail(nc.a.clone(), term::int(nc.consumed))
                    };
                    let no_prefix = term::not(term::prefix(nc.b.clone(), suffix));
                    if core.propagate(engine, dep, &no_prefix)? {
                        fired = true
                    }
                    nc.consumed += 1;
                    let rest_len =
                        term::sub(term::len(nc.a.clone()), term::int(nc.consumed));
                    let guard_atom = term::lt(rest_len, term::len(nc.b.clone()));
                    nc.guard = engine.literal_for(&guard_atom);
                    engine.mark_relevant(nc.guard);
                    profile! { core "ncs unrolled" => add 1 }
                    fired = true;
                    kept.push(nc)
                }
            }
        }
        let mut fresh = std::mem::take(core.ncs.items_mut());
        kept.append(&mut fresh);
        *core.ncs.items_mut() = kept;
        Ok(fired)
    }

    /// Merges two memberships constraining the same sequence root into one
    /// product membership.
    fn merge_memberships<E: Engine>(
        &mut self,
        core: &mut Core,
        engine: &mut E,
    ) -> Res<bool> {
        let members = core.members.items().to_vec();
        for (i, fst) in members.iter().enumerate() {
            for snd in &members[i + 1..] {
                if engine.root_of(&fst.seq) != engine.root_of(&snd.seq) {
                    continue;
                }
                let key = if fst.lit <= snd.lit {
                    (fst.lit, snd.lit)
                } else {
                    (snd.lit, fst.lit)
                };
                if self.merged.contains(&key) {
                    continue;
                }
                self.merged.push(key);

                let elem = term::sk_head(fst.seq.clone());
                let product = fst.auto.intersect(&snd.auto, |guard| {
                    let cond = guard.to_term(&elem);
                    // Unknown keeps the move, dropping is only sound when
                    // the guard is definitely unsatisfiable.
                    Ok(!engine.nested_check(&[cond])?.is_false())
                })?;
                let d1 = core.ledger.lit(fst.lit);
                let d2 = core.ledger.lit(snd.lit);
                let dep = core.ledger.join(Some(d1), Some(d2));
                if product.is_empty_lang() {
                    log! { @verb "membership product on {} is empty", fst.seq }
                    core.conflict(engine, dep)?;
                    return Ok(true);
                }
                // Replace both memberships by the product. Obligations are
                // pruned per owning membership: the same regex constraining
                // a sequence in another class keeps its obligations.
                let product_re = self.fresh_product_re();
                let product_atom = term::in_re(fst.seq.clone(), product_re.clone());
                let product_lit = engine.literal_for(&product_atom);
                core.axioms.push(vec![!fst.lit, !snd.lit, product_lit]);
                core.members
                    .items_mut()
                    .retain(|m| m.lit != fst.lit && m.lit != snd.lit);
                let root = engine.root_of(&fst.seq);
                core.accepts.items_mut().retain(|ob| {
                    (ob.regex != fst.regex && ob.regex != snd.regex)
                        || engine.root_of(&ob.seq) != root
                });
                core.add_membership(
                    engine,
                    &fst.seq,
                    &product_re,
                    Arc::new(product),
                    product_lit,
                )?;
                profile! { core "memberships merged" => add 1 }
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Expands one round of pending acceptance obligations.
    fn unfold_accepts<E: Engine>(core: &mut Core, engine: &mut E) -> Res<bool> {
        let mut fired = false;
        let pending = std::mem::take(core.accepts.items_mut());
        let mut kept = Vec::with_capacity(pending.len());
        for ob in pending {
            conf.check_timeout()?;
            match engine.assignment_of(ob.lit) {
                Truth::Unknown => {
                    engine.mark_relevant(ob.lit);
                    kept.push(ob);
                    continue;
                }
                // The search went the other way, nothing to unfold.
                Truth::False => {
                    fired = true;
                    continue;
                }
                Truth::True => (),
            }
            let leaf = core.ledger.lit(ob.lit);
            let dep = Some(leaf);

            if ob.auto.is_sink(ob.state) {
                log! { @verb "sink state {} for {} at {}", ob.state, ob.seq, ob.idx }
                core.conflict(engine, dep)?;
                fired = true;
                continue;
            }
            if ob.idx >= core.depth {
                let blame = term::not(term::max_depth(core.depth));
                if core.propagate(engine, dep, &blame)? {
                    fired = true
                }
                kept.push(ob);
                continue;
            }

            let s_len = term::len(ob.seq.clone());
            let idx = term::int(ob.idx);
            if ob.auto.is_final(ob.state) {
                // May stop here, may also go on: propagate the lower
                // bound, offer the stop as a branch.
                if core.propagate(engine, dep, &term::ge(s_len.clone(), idx.clone()))? {
                    fired = true
                }
                let stop = term::le(s_len.clone(), idx.clone());
                let stop_lit = engine.literal_for(&stop);
                engine.mark_relevant(stop_lit)
            } else if core.propagate(engine, dep, &term::gt(s_len.clone(), idx.clone()))? {
                fired = true
            }

            // Transition clause: continuing past `idx` takes one of the
            // moves.
            let mut clause = vec![!ob.lit, engine.literal_for(&term::le(s_len, idx))];
            let mut successors = Vec::new();
            for mv in ob.auto.moves_from(ob.state) {
                let elem = term::nth(ob.seq.clone(), term::int(ob.idx));
                let guard_term = mv.guard.to_term(&elem);
                let step = term::step(
                    ob.seq.clone(),
                    ob.idx,
                    ob.regex.clone(),
                    ob.state,
                    mv.dst,
                    guard_term.clone(),
                );
                let step_lit = engine.literal_for(&step);
                engine.mark_relevant(step_lit);
                clause.push(step_lit);
                // Taking the step commits to its element guard.
                if guard_term.bool_cst() != Some(true) {
                    let guard_lit = engine.literal_for(&guard_term);
                    core.axioms.push(vec![!step_lit, guard_lit])
                }
                successors.push((mv.dst, step_lit))
            }
            if successors.is_empty() && !ob.auto.is_final(ob.state) {
                // Dead end that the sink analysis missed only if the
                // automaton has no moves at all here.
                core.conflict(engine, dep)?;
                fired = true;
                continue;
            }
            core.axioms.push(clause);

            // Each taken step owes its guard and the successor acceptance.
            for (dst, step_lit) in successors {
                let next = term::accept(
                    ob.seq.clone(),
                    ob.idx + 1,
                    ob.regex.clone(),
                    dst,
                );
                let next_lit = engine.literal_for(&next);
                core.axioms.push(vec![!step_lit, next_lit]);
                kept.push(AcceptOb {
                    seq: ob.seq.clone(),
                    idx: ob.idx + 1,
                    regex: ob.regex.clone(),
                    state: dst,
                    auto: ob.auto.clone(),
                    lit: next_lit,
                })
            }
            profile! { core "accepts unfolded" => add 1 }
            fired = true
        }
        let mut fresh = std::mem::take(core.accepts.items_mut());
        kept.append(&mut fresh);
        *core.accepts.items_mut() = kept;
        Ok(fired)
    }
}

impl Default for CheckContains {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Engine> Tactic<E> for CheckContains {
    fn name(&self) -> &'static str {
        "check_contains"
    }

    fn apply(&mut self, core: &mut Core, engine: &mut E) -> Res<Outcome> {
        if Self::solve_ncs(core, engine)? {
            return Ok(Outcome::Fired);
        }
        if self.merge_memberships(core, engine)? {
            return Ok(Outcome::Fired);
        }
        if Self::unfold_accepts(core, engine)? {
            return Ok(Outcome::Fired);
        }
        Ok(Outcome::Quiet)
    }
}
