//! Length-driven tactics.
//!
//! All of these trade on the arithmetic oracle's knowledge about `len`
//! terms: a pinned zero length collapses a sequence, a pinned exact length
//! expands it into unit accesses, provably aligned prefixes split an
//! equation without branching, and length coherence forces a branch for
//! length-bounded sequences no equation constrains.

use crate::common::*;
use crate::solver::{Core, Eqn, Outcome, Tactic};

/// Sequence terms the tactics below range over: everything the external
/// search deems relevant that is still a substitution root.
fn candidate_seqs<E: Engine>(core: &Core, engine: &E) -> Vec<Term> {
    engine
        .relevant_seq_terms()
        .into_iter()
        .filter(|s| core.subst.is_root(s))
        .collect()
}

/// The `k`-unit decomposition `unit(nth(s,0)) ... unit(nth(s,k-1))`.
fn nth_decomposition(seq: &Term, k: usize) -> Term {
    let units = (0..k)
        .map(|i| term::unit(term::nth(seq.clone(), term::int(i))))
        .collect::<Vec<_>>();
    term::cat_all(units)
}

/// Tactic 5: zero-length saturation.
///
/// Any sequence whose length is pinned to exactly 0 becomes the empty
/// sequence.
pub struct ZeroLength;

impl ZeroLength {
    /// Constructor.
    pub fn new() -> Self {
        ZeroLength
    }
}

impl<E: Engine> Tactic<E> for ZeroLength {
    fn name(&self) -> &'static str {
        "zero_length"
    }

    fn apply(&mut self, core: &mut Core, engine: &mut E) -> Res<Outcome> {
        for seq in candidate_seqs(core, engine) {
            if seq.is_empty_seq() || core.expanded.items().contains(&seq) {
                continue;
            }
            match core.exact_len(engine, &seq) {
                Some(len) if len.is_zero() => (),
                _ => continue,
            }
            log! { @debug "zero length: {}", seq }
            let leaf = core.ledger.term_eq(&term::len(seq.clone()), &term::zero());
            let dep = Some(leaf);
            core.expanded.push(seq.clone());
            if seq.is_var() {
                core.subst.update(seq.clone(), term::empty(), dep);
            }
            core.propagate_eq(engine, dep, &seq, &term::empty())?;
            profile! { core "zero lengths" => add 1 }
            return Ok(Outcome::Fired);
        }
        Ok(Outcome::Quiet)
    }
}

/// Tactic 7: fixed-length saturation.
///
/// A sequence with known exact length `k > 0` expands into `k` chained
/// unit accesses.
pub struct FixedLength;

impl FixedLength {
    /// Constructor.
    pub fn new() -> Self {
        FixedLength
    }
}

impl<E: Engine> Tactic<E> for FixedLength {
    fn name(&self) -> &'static str {
        "fixed_length"
    }

    fn apply(&mut self, core: &mut Core, engine: &mut E) -> Res<Outcome> {
        for seq in candidate_seqs(core, engine) {
            if !seq.is_var() || core.expanded.items().contains(&seq) {
                continue;
            }
            let k = match core.exact_len(engine, &seq).and_then(|i| i.to_usize()) {
                Some(k) if k > 0 => k,
                _ => continue,
            };
            let decomp = nth_decomposition(&seq, k);
            log! { @debug "fixed length {}: {} = {}", k, seq, decomp }
            let leaf = core.ledger.term_eq(&term::len(seq.clone()), &term::int(k));
            let dep = Some(leaf);
            core.expanded.push(seq.clone());
            core.subst.update(seq.clone(), decomp.clone(), dep);
            core.propagate_eq(engine, dep, &seq, &decomp)?;
            profile! { core "fixed lengths" => add 1 }
            return Ok(Outcome::Fired);
        }
        Ok(Outcome::Quiet)
    }
}

/// Looks for indices `(i, j)` such that the first `i` segments of `lhs`
/// and the first `j` segments of `rhs` have provably equal total length.
///
/// `min` excludes the trivial head-to-head alignment so two tactics do not
/// overlap.
fn aligned_split<E: Engine>(
    engine: &E,
    lhs: &[Term],
    rhs: &[Term],
    min: usize,
) -> Option<(usize, usize)> {
    for i in 1..lhs.len() {
        for j in 1..rhs.len() {
            if i + j <= min {
                continue;
            }
            let l_len = term::add(lhs[..i].iter().map(|s| term::len(s.clone())).collect());
            let r_len = term::add(rhs[..j].iter().map(|s| term::len(s.clone())).collect());
            let diff = term::sub(l_len, r_len);
            match engine.exact_value(&diff) {
                Some(d) if d.is_zero() => return Some((i, j)),
                _ => (),
            }
        }
    }
    None
}

/// Splits an equation at an alignment point, pushing the two halves.
fn split_eqn(core: &mut Core, eqn: &Eqn, i: usize, j: usize, dep: Dep) {
    let prefix = Eqn {
        id: core.next_eq_id,
        lhs: eqn.lhs[..i].to_vec(),
        rhs: eqn.rhs[..j].to_vec(),
        dep,
    };
    let suffix = Eqn {
        id: core.next_eq_id + 1,
        lhs: eqn.lhs[i..].to_vec(),
        rhs: eqn.rhs[j..].to_vec(),
        dep,
    };
    core.next_eq_id += 2;
    if !prefix.is_trivial() {
        core.eqs.push(prefix)
    }
    if !suffix.is_trivial() {
        core.eqs.push(suffix)
    }
}

/// Tactic 6: length-based splitting.
///
/// When a non-trivial prefix of one side provably matches a prefix of the
/// other in total length, the equation splits into aligned halves instead
/// of going to the combinatorial branching below.
pub struct LenBasedSplit;

impl LenBasedSplit {
    /// Constructor.
    pub fn new() -> Self {
        LenBasedSplit
    }
}

impl<E: Engine> Tactic<E> for LenBasedSplit {
    fn name(&self) -> &'static str {
        "len_based_split"
    }

    fn apply(&mut self, core: &mut Core, engine: &mut E) -> Res<Outcome> {
        if !conf.cascade.split_on_len {
            return Ok(Outcome::Quiet);
        }
        let eqns = core.eqs.items().to_vec();
        for (pos, eqn) in eqns.iter().enumerate() {
            // Head-to-head alignment belongs to reduce_length_eq.
            if let Some((i, j)) = aligned_split(engine, &eqn.lhs, &eqn.rhs, 2) {
                log! { @debug "length split eq #{} at ({}, {})", eqn.id, i, j }
                let l_pre = term::unflatten(&eqn.lhs[..i]);
                let r_pre = term::unflatten(&eqn.rhs[..j]);
                let leaf = core
                    .ledger
                    .term_eq(&term::len(l_pre), &term::len(r_pre));
                let dep = core.ledger.join(eqn.dep, Some(leaf));
                core.eqs.items_mut().remove(pos);
                split_eqn(core, eqn, i, j, dep);
                profile! { core "length splits" => add 1 }
                return Ok(Outcome::Fired);
            }
        }
        Ok(Outcome::Quiet)
    }
}

/// Tactic 9: length-guided reduction.
///
/// The head segments of both sides are provably length-equal: split them
/// off as their own equation, no fresh variable needed.
pub struct ReduceLengthEq;

impl ReduceLengthEq {
    /// Constructor.
    pub fn new() -> Self {
        ReduceLengthEq
    }
}

impl<E: Engine> Tactic<E> for ReduceLengthEq {
    fn name(&self) -> &'static str {
        "reduce_length_eq"
    }

    fn apply(&mut self, core: &mut Core, engine: &mut E) -> Res<Outcome> {
        let eqns = core.eqs.items().to_vec();
        for (pos, eqn) in eqns.iter().enumerate() {
            if eqn.lhs.len() < 2 && eqn.rhs.len() < 2 {
                continue;
            }
            let diff = term::sub(
                term::len(eqn.lhs[0].clone()),
                term::len(eqn.rhs[0].clone()),
            );
            match engine.exact_value(&diff) {
                Some(d) if d.is_zero() => (),
                _ => continue,
            }
            log! { @debug "head reduction on eq #{}", eqn.id }
            let leaf = core.ledger.term_eq(
                &term::len(eqn.lhs[0].clone()),
                &term::len(eqn.rhs[0].clone()),
            );
            let dep = core.ledger.join(eqn.dep, Some(leaf));
            core.eqs.items_mut().remove(pos);
            split_eqn(core, eqn, 1, 1, dep);
            profile! { core "head reductions" => add 1 }
            return Ok(Outcome::Fired);
        }
        Ok(Outcome::Quiet)
    }
}

/// Tactic 13: length coherence.
///
/// A relevant sequence variable nothing else constrains still needs a
/// consistent story between its length bounds and its structure: branch on
/// "empty or head plus tail", and blame the active length limit when the
/// lower bound already exceeds it.
pub struct CheckLengthCoherence;

impl CheckLengthCoherence {
    /// Constructor.
    pub fn new() -> Self {
        CheckLengthCoherence
    }
}

impl<E: Engine> Tactic<E> for CheckLengthCoherence {
    fn name(&self) -> &'static str {
        "check_length_coherence"
    }

    fn apply(&mut self, core: &mut Core, engine: &mut E) -> Res<Outcome> {
        for seq in candidate_seqs(core, engine) {
            if !seq.is_var() {
                continue;
            }
            let len = term::len(seq.clone());
            // A lower bound past the active limit blames the limit
            // assumption, feeding the adaptive retry.
            if let (Some(limit), Some(lo)) =
                (core.length_limit(&seq), engine.lower_bound(&len))
            {
                if lo > Int::from(limit) {
                    let blame = term::not(term::len_limit(seq.clone(), limit));
                    if core.propagate(engine, None, &blame)? {
                        profile! { core "limits blamed" => add 1 }
                        return Ok(Outcome::Fired);
                    }
                }
            }
            if core.exact_len(engine, &seq).is_some()
                || core.coherenced.items().contains(&seq)
            {
                continue;
            }
            // Branch: empty, or one head element and a shorter tail.
            let head_tail = term::cat(
                term::unit(term::sk_head(seq.clone())),
                term::sk_tail(seq.clone(), term::one()),
            );
            let clause = [
                term::eq(seq.clone(), term::empty()),
                term::eq(seq.clone(), head_tail),
            ];
            core.coherenced.push(seq.clone());
            core.add_axiom(engine, &clause);
            log! { @debug "length coherence branch on {}", seq }
            profile! { core "coherence branches" => add 1 }
            return Ok(Outcome::Fired);
        }
        Ok(Outcome::Quiet)
    }
}
