//! Int/string coherence.
//!
//! Keeps `int_to_str` / `str_to_int` terms consistent with the arithmetic
//! side: sign axioms, round-tripping, digit predicates per position, and
//! the magnitude/length correlation `10^(k-1) <= n < 10^k` for a `k`-digit
//! rendering.

use crate::common::*;
use crate::solver::{Core, Outcome, Tactic};

/// All int-string applications reachable from the current state.
fn bridge_terms<E: Engine>(core: &Core, engine: &E) -> Vec<Term> {
    let mut seen = HConSet::<Term>::new();
    let mut out = Vec::new();
    let mut visit = |trm: &Term| {
        for sub in term::subterms(trm) {
            if (sub.app_inspect(term::Op::IntToStr).is_some()
                || sub.app_inspect(term::Op::StrToInt).is_some())
                && seen.insert(sub.clone())
            {
                out.push(sub)
            }
        }
    };
    for trm in engine.relevant_seq_terms() {
        visit(&trm)
    }
    for eqn in core.eqs.items() {
        for seg in eqn.lhs.iter().chain(eqn.rhs.iter()) {
            visit(seg)
        }
    }
    out
}

/// `10^k` as an integer constant term.
fn pow10(k: usize) -> Term {
    let mut n = Int::one();
    for _ in 0..k {
        n *= 10
    }
    term::int(n)
}

/// A clause requiring `elem` to be a decimal digit, split over the two
/// bounds. `unless` is the escape disjunct.
fn digit_clauses(elem: &Term, unless: &Term) -> [[Term; 2]; 2] {
    let e = term::unit(elem.clone());
    [
        [unless.clone(), term::sle(term::unit(term::chr('0')), e.clone())],
        [unless.clone(), term::sle(e, term::unit(term::chr('9')))],
    ]
}

/// Tactic 8: int/string coherence.
pub struct CheckIntString;

impl CheckIntString {
    /// Constructor.
    pub fn new() -> Self {
        CheckIntString
    }

    fn on_itos<E: Engine>(core: &mut Core, engine: &mut E, trm: &Term, arg: &Term) -> Res<bool> {
        let negative = term::lt(arg.clone(), term::zero());

        if !core.bridged.items().contains(trm) {
            core.bridged.push(trm.clone());
            // Sign: a negative integer renders empty, a non-negative one
            // round-trips.
            core.add_axiom(engine, &[negative.clone(), term::not(term::eq(trm.clone(), term::empty()))]);
            core.add_axiom(
                engine,
                &[negative.clone(), term::eq(term::stoi(trm.clone()), arg.clone())],
            );
            return Ok(true);
        }

        // Value known: the rendering is a literal.
        if let Some(n) = engine.exact_value(arg) {
            let rendering = if n.is_negative() {
                term::empty()
            } else {
                term::str_lit(n.to_string())
            };
            let (canon, _) = core.canon(engine, trm);
            if canon != rendering {
                let leaf = core.ledger.term_eq(arg, &term::int(n));
                core.propagate_eq(engine, Some(leaf), trm, &rendering)?;
                return Ok(true);
            }
            return Ok(false);
        }

        // Length known: magnitude correlation and digit predicates.
        if let Some(k) = core.exact_len(engine, trm).and_then(|i| i.to_usize()) {
            if k == 0 || core.bridged.items().contains(&term::len(trm.clone())) {
                return Ok(false);
            }
            core.bridged.push(term::len(trm.clone()));
            let leaf = core.ledger.term_eq(&term::len(trm.clone()), &term::int(k));
            let dep = Some(leaf);
            let bounds = term::or(vec![
                negative.clone(),
                term::and(vec![
                    term::ge(arg.clone(), pow10(k - 1)),
                    term::lt(arg.clone(), pow10(k)),
                ]),
            ]);
            let mut fired = core.propagate(engine, dep, &bounds)?;
            for pos in 0..k {
                let elem = term::nth(trm.clone(), term::int(pos));
                for clause in digit_clauses(&elem, &negative) {
                    core.add_axiom(engine, &clause)
                }
                fired = true
            }
            profile! { core "int-str lengths" => add 1 }
            return Ok(fired);
        }
        Ok(false)
    }

    fn on_stoi<E: Engine>(core: &mut Core, engine: &mut E, trm: &Term, arg: &Term) -> Res<bool> {
        if core.bridged.items().contains(trm) {
            return Ok(false);
        }
        core.bridged.push(trm.clone());
        // A parse either fails to -1 or yields a non-negative value whose
        // rendering is the digits themselves.
        let failed = term::eq(trm.clone(), term::int(-Int::one()));
        core.add_axiom(engine, &[failed.clone(), term::ge(trm.clone(), term::zero())]);
        core.add_axiom(
            engine,
            &[failed, term::eq(term::itos(trm.clone()), arg.clone())],
        );
        profile! { core "int-str bridges" => add 1 }
        Ok(true)
    }
}

impl<E: Engine> Tactic<E> for CheckIntString {
    fn name(&self) -> &'static str {
        "check_int_string"
    }

    fn apply(&mut self, core: &mut Core, engine: &mut E) -> Res<Outcome> {
        for trm in bridge_terms(core, engine) {
            let fired = if let Some(args) = trm.app_inspect(term::Op::IntToStr) {
                let arg = args[0].clone();
                Self::on_itos(core, engine, &trm, &arg)?
            } else if let Some(args) = trm.app_inspect(term::Op::StrToInt) {
                let arg = args[0].clone();
                Self::on_stoi(core, engine, &trm, &arg)?
            } else {
                false
            };
            if fired {
                return Ok(Outcome::Fired);
            }
        }
        Ok(Outcome::Quiet)
    }
}
