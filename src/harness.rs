//! A scripted stand-in for the surrounding engine.
//!
//! Implements [`Engine`](../oracle/trait.Engine.html) over plain tables so
//! cascade behavior can be exercised without a boolean search or an
//! arithmetic solver: tests script assignments, bounds and automata, run
//! the theory, and inspect what was asserted, propagated or refuted.
//!
//! Propagated literals are assigned true and propagated equalities merge
//! their classes, mimicking how the real engine absorbs theory output.

use std::cell::{Cell, RefCell};

use crate::automaton::Automaton;
use crate::common::*;

/// The scripted engine.
pub struct ScriptedEngine {
    /// Atom interner.
    atoms: HConMap<Term, usize>,
    /// Atom terms by index.
    atom_terms: Vec<Term>,
    /// Truth of each atom's positive phase.
    assignment: HashMap<usize, Truth>,
    /// Scripted `(lower, upper)` bounds on int terms.
    bounds: HConMap<Term, (Option<Int>, Option<Int>)>,
    /// Equivalence classes. Interned on lookup, hence the cell.
    roots: RefCell<HConMap<Term, ClassIdx>>,
    /// Next fresh class.
    next_class: Cell<usize>,
    /// Scripted automata, keyed by regex id and complement flag.
    automata: HashMap<(usize, bool), Arc<Automaton>>,
    /// Scripted nested-oracle verdict.
    pub nested_verdict: Truth,
    /// Sequence terms reported relevant.
    seq_terms: Vec<Term>,
    /// Clauses asserted by the theory.
    pub asserted: Vec<Vec<Lit>>,
    /// Literals propagated by the theory.
    pub propagated: Vec<Lit>,
    /// Equalities propagated by the theory.
    pub propagated_eqs: Vec<(Term, Term)>,
    /// Conflicts emitted by the theory.
    pub conflicts: Vec<(Vec<Lit>, Vec<(Term, Term)>)>,
    /// Literals marked relevant.
    pub relevant: Vec<Lit>,
}

impl ScriptedEngine {
    /// Constructor.
    pub fn new() -> Self {
        ScriptedEngine {
            atoms: HConMap::new(),
            atom_terms: Vec::new(),
            assignment: HashMap::new(),
            bounds: HConMap::new(),
            roots: RefCell::new(HConMap::new()),
            next_class: Cell::new(0),
            automata: HashMap::new(),
            nested_verdict: Truth::Unknown,
            seq_terms: Vec::new(),
            asserted: Vec::new(),
            propagated: Vec::new(),
            propagated_eqs: Vec::new(),
            conflicts: Vec::new(),
            relevant: Vec::new(),
        }
    }

    fn intern(&mut self, atom: &Term) -> usize {
        if let Some(idx) = self.atoms.get(atom) {
            return *idx;
        }
        let idx = self.atom_terms.len();
        self.atoms.insert(atom.clone(), idx);
        self.atom_terms.push(atom.clone());
        idx
    }

    // |===| Scripting surface.

    /// Scripts the truth of an atom.
    pub fn assign(&mut self, atom: &Term, value: bool) {
        let idx = self.intern(atom);
        self.assignment.insert(idx, value.into());
    }

    /// Scripts both bounds of an int term.
    pub fn set_bounds(&mut self, trm: &Term, lo: Option<Int>, hi: Option<Int>) {
        self.bounds.insert(trm.clone(), (lo, hi));
    }

    /// Pins an int term to an exact value.
    pub fn set_exact<I: Into<Int>>(&mut self, trm: &Term, value: I) {
        let value = value.into();
        self.set_bounds(trm, Some(value.clone()), Some(value))
    }

    /// Declares a sequence term relevant.
    pub fn add_seq_term(&mut self, trm: &Term) {
        if !self.seq_terms.contains(trm) {
            self.seq_terms.push(trm.clone())
        }
    }

    /// Scripts the automaton for a regex id.
    pub fn add_automaton(&mut self, re_id: usize, complement: bool, auto: Automaton) {
        self.automata.insert((re_id, complement), Arc::new(auto));
    }

    /// Merges the classes of two terms.
    pub fn union(&mut self, lhs: &Term, rhs: &Term) {
        let root = self.root_of(lhs);
        let prev = self.root_of(rhs);
        for (_, class) in self.roots.borrow_mut().iter_mut() {
            if *class == prev {
                *class = root
            }
        }
    }

    /// True if a conflict was emitted.
    pub fn in_conflict(&self) -> bool {
        !self.conflicts.is_empty()
    }

    /// True if the clause was asserted, up to literal order.
    pub fn has_asserted(&self, clause: &[Lit]) -> bool {
        self.asserted.iter().any(|c| {
            c.len() == clause.len() && clause.iter().all(|lit| c.contains(lit))
        })
    }

    /// One bound of an int term: scripted table first, then interval
    /// arithmetic over sums and differences, the way a linear-arithmetic
    /// oracle would answer.
    fn bound_of(&self, trm: &Term, lower: bool) -> Option<Int> {
        if let Some(cst) = trm.int_cst() {
            return Some(cst.clone());
        }
        if let Some((lo, hi)) = self.bounds.get(trm) {
            return if lower { lo.clone() } else { hi.clone() };
        }
        if let Some(args) = trm.app_inspect(term::Op::Add) {
            let mut sum = Int::zero();
            for arg in args {
                sum += self.bound_of(arg, lower)?
            }
            return Some(sum);
        }
        if let Some(args) = trm.app_inspect(term::Op::Sub) {
            return Some(self.bound_of(&args[0], lower)? - self.bound_of(&args[1], !lower)?);
        }
        None
    }
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine for ScriptedEngine {
    fn literal_for(&mut self, atom: &Term) -> Lit {
        let idx = self.intern(atom);
        Lit::new(idx, true)
    }

    fn atom_of(&self, lit: Lit) -> Term {
        self.atom_terms[lit.atom()].clone()
    }

    fn assignment_of(&self, lit: Lit) -> Truth {
        let truth = self
            .assignment
            .get(&lit.atom())
            .copied()
            .unwrap_or(Truth::Unknown);
        if lit.is_pos() {
            truth
        } else {
            !truth
        }
    }

    fn mark_relevant(&mut self, lit: Lit) {
        if !self.relevant.contains(&lit) {
            self.relevant.push(lit)
        }
    }

    fn assert_axiom(&mut self, lits: &[Lit]) {
        self.asserted.push(lits.to_vec())
    }

    fn propagate(&mut self, _lits: &[Lit], _eqs: &[(Term, Term)], implied: Lit) {
        self.propagated.push(implied);
        let value = if implied.is_pos() { Truth::True } else { Truth::False };
        self.assignment.insert(implied.atom(), value);
    }

    fn propagate_eq(&mut self, _lits: &[Lit], _eqs: &[(Term, Term)], lhs: &Term, rhs: &Term) {
        self.propagated_eqs.push((lhs.clone(), rhs.clone()));
        self.union(lhs, rhs)
    }

    fn conflict(&mut self, lits: &[Lit], eqs: &[(Term, Term)]) {
        self.conflicts.push((lits.to_vec(), eqs.to_vec()))
    }

    fn root_of(&self, trm: &Term) -> ClassIdx {
        let mut roots = self.roots.borrow_mut();
        if let Some(class) = roots.get(trm) {
            return *class;
        }
        let class: ClassIdx = self.next_class.get().into();
        self.next_class.set(self.next_class.get() + 1);
        roots.insert(trm.clone(), class);
        class
    }

    fn lower_bound(&self, trm: &Term) -> Option<Int> {
        self.bound_of(trm, true)
    }

    fn upper_bound(&self, trm: &Term) -> Option<Int> {
        self.bound_of(trm, false)
    }

    fn rewrite(&self, trm: &Term) -> Term {
        trm.clone()
    }

    fn build_automaton(&mut self, regex: &Term, complement: bool) -> Res<Arc<Automaton>> {
        let id = match regex.get() {
            RTerm::Re(id) => *id,
            _ => bail!(ErrorKind::Unsupported(format!("not a regex term: {}", regex))),
        };
        match self.automata.get(&(id, complement)) {
            Some(auto) => Ok(auto.clone()),
            None => bail!(ErrorKind::Unsupported(format!(
                "no scripted automaton for regex {} (complement: {})",
                id, complement
            ))),
        }
    }

    fn nested_check(&mut self, _conj: &[Term]) -> Res<Truth> {
        Ok(self.nested_verdict)
    }

    fn relevant_seq_terms(&self) -> Vec<Term> {
        self.seq_terms.clone()
    }
}
