//! Top-level scenarios driving the theory through its public surface.

use sequin::automaton::{Automaton, Guard, Move};
use sequin::common::*;
use sequin::harness::ScriptedEngine;
use sequin::theory::TheorySeq;

fn theory() -> TheorySeq<ScriptedEngine> {
    TheorySeq::new(ScriptedEngine::new())
}

fn assign(theory: &mut TheorySeq<ScriptedEngine>, atom: &Term, value: bool) -> Lit {
    let lit = theory.engine_mut().literal_for(atom);
    theory.engine_mut().assign(atom, value);
    let lit = if value { lit } else { !lit };
    theory.on_literal_assigned(lit).unwrap();
    lit
}

/// A word equation with pinned head length reduces without branching, and
/// the disequation the bindings contradict blames everything involved.
#[test]
fn length_guided_reduction_feeds_disequations() {
    let mut theory = theory();
    let x = term::var(0);
    let y = term::var(1);

    // x ++ "b" = "ab" ++ y, with |x| = 1.
    let lhs = term::cat(x.clone(), term::str_lit("b"));
    let rhs = term::cat(term::str_lit("ab"), y.clone());
    let eq_lit = assign(&mut theory, &term::eq(lhs, rhs), true);
    theory.engine_mut().set_exact(&term::len(x.clone()), 1);

    // x != "a" must now collapse.
    let neq_lit = assign(&mut theory, &term::eq(x, term::str_lit("a")), false);

    let mut rounds = 0;
    while !theory.engine().in_conflict() {
        assert_eq!(theory.on_final_check().unwrap(), FinalCheck::Continue);
        rounds += 1;
        assert!(rounds < 10, "no conflict after {} rounds", rounds)
    }
    let (lits, _) = &theory.engine().conflicts[0];
    assert!(lits.contains(&eq_lit));
    assert!(lits.contains(&neq_lit))
}

/// Two memberships on the same sequence whose product is empty (the nested
/// oracle refutes every conjoined guard) conflict on both literals.
#[test]
fn empty_membership_product_conflicts() {
    let mut theory = theory();
    let x = term::var(0);

    let single = |c: char| {
        let mut finals = StSet::new();
        finals.insert(1.into());
        Automaton::new(
            2,
            0.into(),
            finals,
            vec![Move { src: 0.into(), dst: 1.into(), guard: Guard::Is(c) }],
        )
        .unwrap()
    };
    theory.engine_mut().add_automaton(1, false, single('a'));
    theory.engine_mut().add_automaton(2, false, single('b'));
    // The conjoined element guards are unsatisfiable.
    theory.engine_mut().nested_verdict = Truth::False;

    let l1 = assign(&mut theory, &term::in_re(x.clone(), term::re(1)), true);
    let l2 = assign(&mut theory, &term::in_re(x, term::re(2)), true);

    assert_eq!(theory.on_final_check().unwrap(), FinalCheck::Continue);
    assert!(theory.engine().in_conflict());
    let (lits, _) = &theory.engine().conflicts[0];
    assert!(lits.contains(&l1));
    assert!(lits.contains(&l2))
}

/// Compatible memberships merge into a single product membership.
#[test]
fn memberships_on_one_root_merge_into_a_product() {
    let mut theory = theory();
    let x = term::var(0);

    let range = |lo: char, hi: char| {
        let mut finals = StSet::new();
        finals.insert(1.into());
        Automaton::new(
            2,
            0.into(),
            finals,
            vec![Move { src: 0.into(), dst: 1.into(), guard: Guard::Range(lo, hi) }],
        )
        .unwrap()
    };
    theory.engine_mut().add_automaton(1, false, range('a', 'm'));
    theory.engine_mut().add_automaton(2, false, range('g', 'z'));

    let l1 = assign(&mut theory, &term::in_re(x.clone(), term::re(1)), true);
    let l2 = assign(&mut theory, &term::in_re(x, term::re(2)), true);

    assert_eq!(theory.on_final_check().unwrap(), FinalCheck::Continue);
    assert!(!theory.engine().in_conflict());
    // One product membership replaces the pair, linked by a lemma.
    assert_eq!(theory.core().members.len(), 1);
    let product_lit = theory.core().members.items()[0].lit;
    assert!(theory.engine().has_asserted(&[!l1, !l2, product_lit]))
}

/// Merging the memberships of one sequence must not touch another
/// sequence constrained by the same regex: its membership and its pending
/// obligation both survive.
#[test]
fn merging_keeps_other_sequences_in_the_same_regex() {
    let mut theory = theory();
    let x = term::var(0);
    let y = term::var(1);

    let range = |lo: char, hi: char| {
        let mut finals = StSet::new();
        finals.insert(1.into());
        Automaton::new(
            2,
            0.into(),
            finals,
            vec![Move { src: 0.into(), dst: 1.into(), guard: Guard::Range(lo, hi) }],
        )
        .unwrap()
    };
    theory.engine_mut().add_automaton(1, false, range('a', 'm'));
    theory.engine_mut().add_automaton(2, false, range('g', 'z'));

    // `y` shares regex 1 with `x` but lives in its own class.
    assign(&mut theory, &term::in_re(y.clone(), term::re(1)), true);
    assign(&mut theory, &term::in_re(x.clone(), term::re(1)), true);
    assign(&mut theory, &term::in_re(x, term::re(2)), true);

    assert_eq!(theory.on_final_check().unwrap(), FinalCheck::Continue);
    assert!(!theory.engine().in_conflict());

    // `x`'s pair merged into one product, `y`'s membership is untouched.
    assert_eq!(theory.core().members.len(), 2);
    assert!(theory
        .core()
        .members
        .items()
        .iter()
        .any(|m| m.seq == y && m.regex == term::re(1)));
    // `y`'s initial acceptance obligation is still pending.
    assert!(theory
        .core()
        .accepts
        .items()
        .iter()
        .any(|ob| ob.seq == y && ob.regex == term::re(1)))
}

/// A full run on `x in "a"` with the length pinned: unfolding terminates
/// once the retry has raised the depth, and the state ends up solved.
#[test]
fn single_character_membership_runs_to_done() {
    let mut theory = theory();
    let x = term::var(0);
    let regex = term::re(5);
    let mut finals = StSet::new();
    finals.insert(1.into());
    let auto = Automaton::new(
        2,
        0.into(),
        finals,
        vec![Move { src: 0.into(), dst: 1.into(), guard: Guard::Is('a') }],
    )
    .unwrap();
    theory.engine_mut().add_automaton(5, false, auto);

    assign(&mut theory, &term::in_re(x.clone(), regex.clone()), true);
    theory.engine_mut().set_exact(&term::len(x.clone()), 1);

    // Depth 1 cannot finish a one-character word; the retry raises it.
    let depth = theory.depth();
    assert!(theory.should_research(&[term::max_depth(depth)]));
    assert!(theory.depth() > depth);

    // The search commits to the initial acceptance.
    let acc0 = term::accept(x.clone(), 0, regex.clone(), 0.into());
    theory.engine_mut().assign(&acc0, true);
    assert_eq!(theory.on_final_check().unwrap(), FinalCheck::Continue);

    // And to the single transition's successor.
    let acc1 = term::accept(x.clone(), 1, regex, 1.into());
    theory.engine_mut().assign(&acc1, true);
    assert_eq!(theory.on_final_check().unwrap(), FinalCheck::Continue);
    assert!(!theory.engine().in_conflict());

    // The final state discharged its obligation; everything is quiet.
    let mut rounds = 0;
    loop {
        match theory.on_final_check().unwrap() {
            FinalCheck::Done => break,
            FinalCheck::Continue => {
                rounds += 1;
                assert!(rounds < 10, "no fixpoint after {} rounds", rounds)
            }
            FinalCheck::Undecided => panic!("run should close out"),
        }
    }
    assert!(theory.core().accepts.is_empty());
    // No-op unless `--stats` is up, exercises the reporting path.
    theory.print_stats()
}
