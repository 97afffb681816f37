//! The surface of the surrounding engine, as seen from this theory.
//!
//! The boolean search, congruence closure, arithmetic bounds, rewriting and
//! automaton construction all live outside this crate. The
//! [`Engine`](trait.Engine.html) trait is the contract with them; the
//! [`harness`](../harness/index.html) module provides a scripted
//! implementation for tests.

use std::fmt;
use std::ops;

use crate::automaton::Automaton;
use crate::common::*;

/// A boolean literal of the external search: an atom index and a sign.
///
/// Encoded SAT-style, sign in the least significant bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Lit(usize);
impl Lit {
    /// Constructor.
    #[inline]
    pub fn new(atom: usize, pos: bool) -> Self {
        Lit(2 * atom + if pos { 0 } else { 1 })
    }
    /// Index of the underlying atom.
    #[inline]
    pub fn atom(self) -> usize {
        self.0 / 2
    }
    /// True if the literal is the positive phase of its atom.
    #[inline]
    pub fn is_pos(self) -> bool {
        self.0 % 2 == 0
    }
}
impl ops::Not for Lit {
    type Output = Lit;
    fn not(self) -> Lit {
        Lit(self.0 ^ 1)
    }
}
impl fmt::Display for Lit {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        if self.is_pos() {
            write!(fmt, "l{}", self.atom())
        } else {
            write!(fmt, "~l{}", self.atom())
        }
    }
}

/// Three-valued truth assignment of the external search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truth {
    /// Assigned true.
    True,
    /// Assigned false.
    False,
    /// Not assigned.
    Unknown,
}
impl Truth {
    /// True if assigned true.
    #[inline]
    pub fn is_true(self) -> bool {
        self == Truth::True
    }
    /// True if assigned false.
    #[inline]
    pub fn is_false(self) -> bool {
        self == Truth::False
    }
    /// True if not assigned.
    #[inline]
    pub fn is_unknown(self) -> bool {
        self == Truth::Unknown
    }
}
impl From<bool> for Truth {
    fn from(b: bool) -> Self {
        if b {
            Truth::True
        } else {
            Truth::False
        }
    }
}
impl ops::Not for Truth {
    type Output = Truth;
    fn not(self) -> Truth {
        match self {
            Truth::True => Truth::False,
            Truth::False => Truth::True,
            Truth::Unknown => Truth::Unknown,
        }
    }
}

/// The external collaborators of the theory, bundled.
///
/// One implementor stands for the whole surrounding engine: boolean search
/// (literals, assignments, clause sink), congruence closure, the arithmetic
/// oracle for lengths, the term rewriter, the automaton builder, and the
/// disposable nested oracle.
///
/// Everything this theory derives leaves through [`assert_axiom`][ax],
/// [`propagate`][prop] and [`conflict`][conf]; the justification attached to
/// the latter two is already linearized, so the engine never needs to
/// re-derive *why*.
///
/// [ax]: trait.Engine.html#tymethod.assert_axiom (assert_axiom method)
/// [prop]: trait.Engine.html#tymethod.propagate (propagate method)
/// [conf]: trait.Engine.html#tymethod.conflict (conflict method)
pub trait Engine {
    // |===| Boolean search.

    /// The (positive) literal standing for a boolean term.
    fn literal_for(&mut self, atom: &Term) -> Lit;
    /// The boolean term a literal stands for (its atom).
    fn atom_of(&self, lit: Lit) -> Term;
    /// Current assignment of a literal, sign-adjusted.
    fn assignment_of(&self, lit: Lit) -> Truth;
    /// Marks a literal as relevant so the search decides it eventually.
    fn mark_relevant(&mut self, lit: Lit);

    // |===| Clause-level output sink.

    /// Asserts a clause (a disjunction of literals).
    fn assert_axiom(&mut self, lits: &[Lit]);
    /// Emits a justified unit implication: the `lits` (all currently true)
    /// and the `eqs` (all currently holding) imply `implied`.
    fn propagate(&mut self, lits: &[Lit], eqs: &[(Term, Term)], implied: Lit);
    /// Emits a justified equality between two terms.
    fn propagate_eq(&mut self, lits: &[Lit], eqs: &[(Term, Term)], lhs: &Term, rhs: &Term);
    /// Emits a justified contradiction.
    fn conflict(&mut self, lits: &[Lit], eqs: &[(Term, Term)]);

    // |===| Congruence oracle.

    /// Equivalence class of a term.
    fn root_of(&self, trm: &Term) -> ClassIdx;

    // |===| Arithmetic oracle, for lengths.

    /// Known lower bound of an int-sorted term.
    fn lower_bound(&self, trm: &Term) -> Option<Int>;
    /// Known upper bound of an int-sorted term.
    fn upper_bound(&self, trm: &Term) -> Option<Int>;
    /// Exact known value of an int-sorted term.
    fn exact_value(&self, trm: &Term) -> Option<Int> {
        let lo = self.lower_bound(trm)?;
        let hi = self.upper_bound(trm)?;
        if lo == hi {
            Some(lo)
        } else {
            None
        }
    }

    // |===| Normalizer.

    /// External rewriter/simplifier. Must be a no-op on normal forms.
    fn rewrite(&self, trm: &Term) -> Term;

    // |===| Regular expressions.

    /// Compiles a regex term to an automaton, complemented when the
    /// membership is negative.
    ///
    /// Fails with [`ErrorKind::Unsupported`][unsup] on constructs the
    /// builder cannot compile; this aborts the whole run.
    ///
    /// [unsup]: ../errors/enum.ErrorKind.html#variant.Unsupported
    /// (Unsupported error kind)
    fn build_automaton(&mut self, regex: &Term, complement: bool) -> Res<Arc<Automaton>>;

    // |===| Disposable nested oracle.

    /// Checks the satisfiability of a conjunction on a fresh, disposable
    /// solver instance. Helper functions are treated as opaque constants.
    fn nested_check(&mut self, conj: &[Term]) -> Res<Truth>;

    // |===| Relevancy.

    /// Sequence-sorted terms currently relevant to the search, used by
    /// extensionality.
    fn relevant_seq_terms(&self) -> Vec<Term>;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn lit_encoding() {
        let l = Lit::new(7, true);
        assert_eq!(l.atom(), 7);
        assert!(l.is_pos());
        let n = !l;
        assert_eq!(n.atom(), 7);
        assert!(!n.is_pos());
        assert_eq!(!n, l)
    }
}
