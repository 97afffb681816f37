//! End-to-end scenarios driven through the theory surface.
//!
//! Each test plays the surrounding engine using the scripted harness:
//! assign literals, run final checks, inspect what came out.

use crate::automaton::{Automaton, Guard, Move};
use crate::common::*;
use crate::harness::ScriptedEngine;
use crate::theory::TheorySeq;

fn theory() -> TheorySeq<ScriptedEngine> {
    TheorySeq::new(ScriptedEngine::new())
}

/// Assigns a boolean term and notifies the theory. Returns the
/// (sign-adjusted) literal.
fn assign(theory: &mut TheorySeq<ScriptedEngine>, atom: &Term, value: bool) -> Lit {
    let lit = theory.engine_mut().literal_for(atom);
    theory.engine_mut().assign(atom, value);
    let lit = if value { lit } else { !lit };
    theory.on_literal_assigned(lit).unwrap();
    lit
}

#[test]
fn conflicting_constant_bindings_conflict() {
    let mut theory = theory();
    let x = term::var(0);
    let l1 = assign(&mut theory, &term::eq(x.clone(), term::str_lit("a")), true);
    let l2 = assign(&mut theory, &term::eq(x.clone(), term::str_lit("b")), true);

    let check = theory.on_final_check().unwrap();
    assert_eq!(check, FinalCheck::Continue);
    assert!(theory.engine().in_conflict());
    let (lits, _) = &theory.engine().conflicts[0];
    assert!(lits.contains(&l1));
    assert!(lits.contains(&l2))
}

#[test]
fn merged_classes_justify_conflicts_with_equalities() {
    let mut theory = theory();
    let x = term::var(0);
    let y = term::var(1);
    theory.on_equivalence_merge(&x, &y).unwrap();
    let l1 = assign(&mut theory, &term::eq(x.clone(), term::str_lit("a")), true);
    let l2 = assign(&mut theory, &term::eq(y.clone(), term::str_lit("b")), true);

    assert_eq!(theory.on_final_check().unwrap(), FinalCheck::Continue);
    let (lits, eqs) = &theory.engine().conflicts[0];
    assert!(lits.contains(&l1));
    assert!(lits.contains(&l2));
    assert!(
        eqs.contains(&(x.clone(), y.clone())) || eqs.contains(&(y.clone(), x.clone()))
    )
}

#[test]
fn zero_length_collapses_in_one_round() {
    let mut theory = theory();
    let x = term::var(0);
    theory.engine_mut().add_seq_term(&x);
    theory.engine_mut().set_exact(&term::len(x.clone()), 0);

    assert_eq!(theory.on_final_check().unwrap(), FinalCheck::Continue);
    assert!(theory
        .engine()
        .propagated_eqs
        .contains(&(x.clone(), term::empty())));

    // Second round: the binding holds, nothing left to do.
    assert_eq!(theory.on_final_check().unwrap(), FinalCheck::Done);
    assert_eq!(theory.engine().propagated_eqs.len(), 1)
}

#[test]
fn fixed_length_expands_into_unit_accesses() {
    let mut theory = theory();
    let x = term::var(0);
    theory.engine_mut().add_seq_term(&x);
    theory.engine_mut().set_exact(&term::len(x.clone()), 3);

    assert_eq!(theory.on_final_check().unwrap(), FinalCheck::Continue);
    let expected = term::cat_all(
        (0..3).map(|i| term::unit(term::nth(x.clone(), term::int(i)))).collect::<Vec<_>>(),
    );
    assert!(theory.engine().propagated_eqs.contains(&(x, expected)))
}

#[test]
fn containment_guard_short_circuits_unrolling() {
    let mut theory = theory();
    let a = term::var(0);
    let b = term::var(1);
    assign(&mut theory, &term::contains(a.clone(), b.clone()), false);
    let guard = term::lt(term::len(a.clone()), term::len(b.clone()));
    theory.engine_mut().assign(&guard, true);

    assert_eq!(theory.on_final_check().unwrap(), FinalCheck::Continue);
    assert!(theory.core().ncs.is_empty());
    assert!(theory.engine().propagated.is_empty())
}

#[test]
fn non_containment_unrolls_when_guard_fails() {
    let mut theory = theory();
    let a = term::var(0);
    let b = term::var(1);
    assign(&mut theory, &term::contains(a.clone(), b.clone()), false);
    let guard = term::lt(term::len(a.clone()), term::len(b.clone()));
    theory.engine_mut().assign(&guard, false);

    assert_eq!(theory.on_final_check().unwrap(), FinalCheck::Continue);
    let no_prefix = term::not(term::prefix(b.clone(), a.clone()));
    let lit = theory.engine_mut().literal_for(&no_prefix);
    assert!(theory.engine().propagated.contains(&lit));
    assert_eq!(theory.core().ncs.items()[0].consumed, 1)
}

#[test]
fn empty_language_membership_conflicts_immediately() {
    let mut theory = theory();
    let x = term::var(0);
    let regex = term::re(7);
    // One non-accepting state: the language is empty.
    let auto = Automaton::new(1, 0.into(), StSet::new(), vec![]).unwrap();
    theory.engine_mut().add_automaton(7, false, auto);
    let lit = assign(&mut theory, &term::in_re(x, regex), true);

    assert!(theory.engine().in_conflict());
    assert_eq!(theory.engine().conflicts[0].0, vec![lit])
}

#[test]
fn unfolding_reaches_a_sink_and_conflicts() {
    let mut theory = theory();
    let x = term::var(0);
    let regex = term::re(9);
    // 'b' accepts, 'a' leads to a dead end.
    let mut finals = StSet::new();
    finals.insert(2.into());
    let auto = Automaton::new(
        3,
        0.into(),
        finals,
        vec![
            Move { src: 0.into(), dst: 1.into(), guard: Guard::Is('a') },
            Move { src: 0.into(), dst: 2.into(), guard: Guard::Is('b') },
        ],
    )
    .unwrap();
    theory.engine_mut().add_automaton(9, false, auto);
    assign(&mut theory, &term::in_re(x.clone(), regex.clone()), true);

    let acc0 = term::accept(x.clone(), 0, regex.clone(), 0.into());
    theory.engine_mut().assign(&acc0, true);
    assert_eq!(theory.on_final_check().unwrap(), FinalCheck::Continue);
    assert!(!theory.engine().in_conflict());

    // The search takes the 'a' branch, whose target is dead.
    let acc1 = term::accept(x, 1, regex, 1.into());
    let acc1_lit = theory.engine_mut().literal_for(&acc1);
    theory.engine_mut().assign(&acc1, true);
    assert_eq!(theory.on_final_check().unwrap(), FinalCheck::Continue);
    assert!(theory.engine().in_conflict());
    assert!(theory.engine().conflicts[0].0.contains(&acc1_lit))
}

#[test]
fn unfolding_past_the_depth_budget_blames_the_assumption() {
    let mut theory = theory();
    let x = term::var(0);
    let regex = term::re(3);
    let mut finals = StSet::new();
    finals.insert(1.into());
    let auto = Automaton::new(
        2,
        0.into(),
        finals,
        vec![Move { src: 0.into(), dst: 1.into(), guard: Guard::Top }],
    )
    .unwrap();
    theory.engine_mut().add_automaton(3, false, auto);
    assign(&mut theory, &term::in_re(x.clone(), regex.clone()), true);

    let depth = theory.depth();
    theory
        .engine_mut()
        .assign(&term::accept(x.clone(), 0, regex.clone(), 0.into()), true);
    assert_eq!(theory.on_final_check().unwrap(), FinalCheck::Continue);

    // The obligation at the budget boundary blames the depth assumption.
    theory.engine_mut().assign(&term::accept(x, depth, regex, 1.into()), true);
    assert_eq!(theory.on_final_check().unwrap(), FinalCheck::Continue);
    let blame = term::not(term::max_depth(depth));
    let blame_lit = theory.engine_mut().literal_for(&blame);
    assert!(theory.engine().propagated.contains(&blame_lit))
}

#[test]
fn depth_retry_grows_strictly() {
    let mut theory = theory();
    let mut depth = theory.depth();
    let mut seen = vec![depth];
    for _ in 0..4 {
        assert!(theory.should_research(&[term::max_depth(depth)]));
        assert!(theory.depth() > depth);
        depth = theory.depth();
        seen.push(depth)
    }
    // With an initial depth of 1: 1, 2, 3, 5, 8.
    if seen[0] == 1 {
        assert_eq!(seen, vec![1, 2, 3, 5, 8])
    }
    assert!(!theory.should_research(&[]))
}

#[test]
fn limit_retry_doubles_one_of_the_smallest() {
    let mut theory = theory();
    let x = term::var(0);
    let y = term::var(1);
    let depth = theory.depth();
    let core = [
        term::len_limit(x.clone(), 4),
        term::len_limit(y.clone(), 4),
        term::max_depth(depth),
    ];
    assert!(theory.should_research(&core));
    // The blamed limit doubles, exactly one of the tied pair.
    let x_limit = theory.core().length_limit(&x);
    let y_limit = theory.core().length_limit(&y);
    assert!(matches!(
        (x_limit, y_limit),
        (Some(8), None) | (None, Some(8))
    ));
    // A blamed limit takes precedence over the depth growth.
    assert_eq!(theory.depth(), depth + 1)
}

#[test]
fn length_limit_violations_blame_the_limit() {
    let mut theory = theory();
    let x = term::var(0);
    theory.engine_mut().add_seq_term(&x);
    // Install a limit of 2 through the retry path.
    assert!(theory.should_research(&[term::len_limit(x.clone(), 1)]));
    assert_eq!(theory.core().length_limit(&x), Some(2));
    theory
        .engine_mut()
        .set_bounds(&term::len(x.clone()), Some(Int::from(3)), None);

    assert_eq!(theory.on_final_check().unwrap(), FinalCheck::Continue);
    let blame = term::not(term::len_limit(x, 2));
    let blame_lit = theory.engine_mut().literal_for(&blame);
    assert!(theory.engine().propagated.contains(&blame_lit))
}

#[test]
fn theory_assumptions_carry_depth_and_latest_limits() {
    let mut theory = theory();
    let x = term::var(0);
    assert!(theory.should_research(&[term::len_limit(x.clone(), 1)]));
    assert!(theory.should_research(&[term::len_limit(x.clone(), 2)]));
    let assumptions = theory.add_theory_assumptions();
    assert!(assumptions.contains(&term::max_depth(theory.depth())));
    // Only the latest limit per sequence is assumed.
    assert!(assumptions.contains(&term::len_limit(x.clone(), 4)));
    assert!(!assumptions.contains(&term::len_limit(x, 2)));
    assert_eq!(assumptions.len(), 2)
}

#[test]
fn lexicographic_chains_compose_strictness() {
    let mut theory = theory();
    let a = term::var(0);
    let b = term::var(1);
    let c = term::var(2);
    assign(&mut theory, &term::slt(a.clone(), b.clone()), true);
    assign(&mut theory, &term::sle(b, c.clone()), true);

    assert_eq!(theory.on_final_check().unwrap(), FinalCheck::Continue);
    let implied = term::slt(a, c);
    let lit = theory.engine_mut().literal_for(&implied);
    assert!(theory.engine().propagated.contains(&lit))
}

#[test]
fn negated_lexicographic_atoms_flip_into_the_converse() {
    let mut theory = theory();
    let a = term::var(0);
    let b = term::var(1);
    assign(&mut theory, &term::slt(a.clone(), b.clone()), false);

    let rels = theory.core().lts.items();
    assert_eq!(rels.len(), 1);
    assert!(!rels[0].strict);
    assert_eq!(rels[0].lhs, b);
    assert_eq!(rels[0].rhs, a)
}

#[test]
fn collapsed_disequation_conflicts_on_its_full_story() {
    let mut theory = theory();
    let x = term::var(0);
    let y = term::var(1);
    let neq = assign(&mut theory, &term::eq(x.clone(), y.clone()), false);
    let l1 = assign(&mut theory, &term::eq(x.clone(), term::str_lit("ab")), true);
    let l2 = assign(&mut theory, &term::eq(y.clone(), term::str_lit("ab")), true);

    // Round one binds both variables; round two collapses the diseq.
    assert_eq!(theory.on_final_check().unwrap(), FinalCheck::Continue);
    if !theory.engine().in_conflict() {
        assert_eq!(theory.on_final_check().unwrap(), FinalCheck::Continue)
    }
    assert!(theory.engine().in_conflict());
    let (lits, _) = &theory.engine().conflicts[0];
    assert!(lits.contains(&neq));
    assert!(lits.contains(&l1));
    assert!(lits.contains(&l2))
}

#[test]
fn incompatible_constants_discharge_a_disequation() {
    let mut theory = theory();
    let x = term::var(0);
    let y = term::var(1);
    assign(&mut theory, &term::eq(x.clone(), y.clone()), false);
    assign(&mut theory, &term::eq(x, term::str_lit("a")), true);
    assign(&mut theory, &term::eq(y, term::str_lit("b")), true);

    // The bindings make the sides differ structurally: no conflict, and
    // the disequation disappears.
    loop {
        match theory.on_final_check().unwrap() {
            FinalCheck::Continue => assert!(!theory.engine().in_conflict()),
            _ => break,
        }
    }
    assert!(theory.core().nqs.is_empty())
}

#[test]
fn unit_run_equations_branch_over_prefixes() {
    let mut theory = theory();
    let x = term::var(0);
    // The occurrence inside the tail helper blocks every structural rule,
    // branching must fire.
    let rhs = term::cat(term::str_lit("ab"), term::sk_tail(x.clone(), term::one()));
    assign(&mut theory, &term::eq(x.clone(), rhs), true);

    assert_eq!(theory.on_final_check().unwrap(), FinalCheck::Continue);
    let case_a = term::eq(x.clone(), term::unit(term::chr('a')));
    let lit_a = theory.engine_mut().literal_for(&case_a);
    let asserted = &theory.engine().asserted;
    assert!(asserted.iter().any(|clause| clause.contains(&lit_a)))
}

#[test]
fn unconstrained_variables_get_a_coherence_branch() {
    let mut theory = theory();
    let x = term::var(0);
    theory.engine_mut().add_seq_term(&x);

    assert_eq!(theory.on_final_check().unwrap(), FinalCheck::Continue);
    let empty_case = term::eq(x.clone(), term::empty());
    let head_tail = term::cat(
        term::unit(term::sk_head(x.clone())),
        term::sk_tail(x.clone(), term::one()),
    );
    let head_case = term::eq(x, head_tail);
    let engine = theory.engine_mut();
    let l_empty = engine.literal_for(&empty_case);
    let l_head = engine.literal_for(&head_case);
    assert!(engine.has_asserted(&[l_empty, l_head]))
}

#[test]
fn extensionality_surfaces_a_split_once() {
    let mut theory = theory();
    let a = term::cat(term::var(0), term::var(1));
    let b = term::cat(term::var(1), term::var(0));
    theory.engine_mut().add_seq_term(&a);
    theory.engine_mut().add_seq_term(&b);

    assert_eq!(theory.on_final_check().unwrap(), FinalCheck::Continue);
    let hyp = term::eq(a.clone(), b.clone());
    let lit = theory.engine_mut().literal_for(&hyp);
    assert!(theory.engine().relevant.contains(&lit));
    assert!(theory.core().exclude.contains(&a, &b))
}

#[test]
fn int_rendering_follows_the_pinned_value() {
    let mut theory = theory();
    let y = term::var(0);
    let arg = term::len(y);
    let rendering = term::itos(arg.clone());
    theory.engine_mut().add_seq_term(&rendering);
    theory.engine_mut().set_exact(&arg, 5);

    // First round emits the sign axioms, second round the rendering.
    assert_eq!(theory.on_final_check().unwrap(), FinalCheck::Continue);
    assert_eq!(theory.on_final_check().unwrap(), FinalCheck::Continue);
    assert!(theory
        .engine()
        .propagated_eqs
        .contains(&(rendering, term::str_lit("5"))))
}

#[test]
fn relevant_lengths_are_grounded_non_negative() {
    let mut theory = theory();
    let x = term::var(0);
    let len = term::len(x);
    theory.on_relevance_notify(&len);
    assert!(theory.can_make_progress());
    assert_eq!(theory.do_deferred_work(), 1);
    let lit = theory.engine_mut().literal_for(&term::ge(len, term::zero()));
    assert!(theory.engine().has_asserted(&[lit]))
}

#[test]
fn negative_prefix_emits_a_mismatch_witness() {
    let mut theory = theory();
    let a = term::var(0);
    let b = term::var(1);
    let atom = term::prefix(a.clone(), b.clone());
    assign(&mut theory, &atom, false);

    // The would-be prefix cannot be empty.
    let non_empty = term::not(term::eq(a.clone(), term::empty()));
    let lit = theory.engine_mut().literal_for(&non_empty);
    assert!(theory.engine().propagated.contains(&lit));

    theory.do_deferred_work();
    let engine = theory.engine_mut();
    let pos = engine.literal_for(&atom);
    let longer = engine.literal_for(&term::gt(term::len(a.clone()), term::len(b.clone())));
    let differs = engine.literal_for(&term::not(term::eq(
        a.clone(),
        term::sk_pre(b, term::len(a)),
    )));
    assert!(engine.has_asserted(&[pos, longer, differs]))
}

#[test]
fn scopes_restore_the_registries() {
    let mut theory = theory();
    let x = term::var(0);
    let y = term::var(1);
    theory.on_push_scope();
    assign(&mut theory, &term::eq(x.clone(), y.clone()), false);
    assign(&mut theory, &term::slt(x, y), true);
    assert_eq!(theory.core().nqs.len(), 1);
    assert_eq!(theory.core().lts.len(), 1);
    theory.on_pop_scope(1);
    assert!(theory.core().nqs.is_empty());
    assert!(theory.core().lts.is_empty())
}

#[test]
fn quiet_checks_with_no_obligations_report_done() {
    let mut theory = theory();
    assert_eq!(theory.on_final_check().unwrap(), FinalCheck::Done)
}
