//! Symbolic finite automata over sequence elements.
//!
//! Moves carry a [`Guard`](enum.Guard.html), a symbolic predicate over the
//! element consumed, instead of a concrete alphabet letter. Regex membership
//! is unfolded against these automata one position at a time; the product
//! construction intersects the automata of all memberships constraining the
//! same sequence.
//!
//! Automata are compiled outside this crate
//! ([`Engine::build_automaton`](../oracle/trait.Engine.html#tymethod.build_automaton))
//! and shared behind `Arc`: unfolding never mutates them.

use std::fmt;

use crate::common::*;

/// Symbolic predicate over one element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Guard {
    /// Accepts any element.
    Top,
    /// Accepts exactly one character.
    Is(char),
    /// Accepts an inclusive character range.
    Range(char, char),
    /// Complement.
    Not(Box<Guard>),
    /// Conjunction, produced by intersection.
    And(Box<Guard>, Box<Guard>),
}

impl Guard {
    /// Negation, without stacking double complements.
    pub fn negate(self) -> Guard {
        match self {
            Guard::Not(inner) => *inner,
            guard => Guard::Not(Box::new(guard)),
        }
    }

    /// Conjunction, with cheap unit folding.
    pub fn conj(self, other: Guard) -> Guard {
        match (self, other) {
            (Guard::Top, guard) | (guard, Guard::Top) => guard,
            (l, r) if l == r => l,
            (l, r) => Guard::And(Box::new(l), Box::new(r)),
        }
    }

    /// Concrete evaluation on a character.
    pub fn accepts(&self, c: char) -> bool {
        match self {
            Guard::Top => true,
            Guard::Is(cst) => c == *cst,
            Guard::Range(lo, hi) => *lo <= c && c <= *hi,
            Guard::Not(inner) => !inner.accepts(c),
            Guard::And(l, r) => l.accepts(c) && r.accepts(c),
        }
    }

    /// Syntactic unsatisfiability check. Sound but incomplete: `false` only
    /// means the cheap check could not decide, the full decision goes
    /// through the nested oracle.
    pub fn trivially_empty(&self) -> bool {
        match self {
            Guard::Top | Guard::Is(_) => false,
            Guard::Range(lo, hi) => lo > hi,
            Guard::Not(inner) => matches!(**inner, Guard::Top),
            Guard::And(l, r) => {
                if l.trivially_empty() || r.trivially_empty() {
                    return true;
                }
                match (&**l, &**r) {
                    (Guard::Is(a), Guard::Is(b)) => a != b,
                    (Guard::Is(c), Guard::Range(lo, hi))
                    | (Guard::Range(lo, hi), Guard::Is(c)) => c < lo || c > hi,
                    (Guard::Is(a), Guard::Not(n)) | (Guard::Not(n), Guard::Is(a)) => {
                        matches!(&**n, Guard::Is(b) if a == b)
                    }
                    _ => false,
                }
            }
        }
    }

    /// The boolean term this guard denotes over an element term.
    pub fn to_term(&self, elem: &Term) -> Term {
        match self {
            Guard::Top => term::tru(),
            Guard::Is(c) => term::eq(elem.clone(), term::chr(*c)),
            Guard::Range(lo, hi) => {
                // Encoded through unit sequences, lexicographic order on
                // units is element order.
                let e = term::unit(elem.clone());
                term::and(vec![
                    term::sle(term::unit(term::chr(*lo)), e.clone()),
                    term::sle(e, term::unit(term::chr(*hi))),
                ])
            }
            Guard::Not(inner) => term::not(inner.to_term(elem)),
            Guard::And(l, r) => term::and(vec![l.to_term(elem), r.to_term(elem)]),
        }
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Guard::Top => write!(fmt, "."),
            Guard::Is(c) => write!(fmt, "{:?}", c),
            Guard::Range(lo, hi) => write!(fmt, "[{:?}-{:?}]", lo, hi),
            Guard::Not(inner) => write!(fmt, "!{}", inner),
            Guard::And(l, r) => write!(fmt, "({} & {})", l, r),
        }
    }
}

/// A guarded transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Move {
    /// Source state.
    pub src: StIdx,
    /// Destination state.
    pub dst: StIdx,
    /// Element predicate.
    pub guard: Guard,
}

/// A symbolic automaton. Immutable once built.
#[derive(Debug, Clone)]
pub struct Automaton {
    /// Number of states.
    state_count: usize,
    /// Initial state.
    init: StIdx,
    /// Accepting states.
    finals: StSet,
    /// All moves.
    moves: Vec<Move>,
    /// Move indices by source state.
    outgoing: StMap<Vec<usize>>,
    /// States with no path to an accepting state.
    dead: StSet,
}

impl Automaton {
    /// Constructor. Computes dead states once.
    pub fn new(state_count: usize, init: StIdx, finals: StSet, moves: Vec<Move>) -> Res<Self> {
        if *init >= state_count {
            bail!(ErrorKind::Internal(format!(
                "automaton initial state {} out of range ({} states)",
                init, state_count
            )))
        }
        for mv in &moves {
            if *mv.src >= state_count || *mv.dst >= state_count {
                bail!(ErrorKind::Internal(format!(
                    "automaton move {} -> {} out of range ({} states)",
                    mv.src, mv.dst, state_count
                )))
            }
        }
        let mut outgoing = StMap::with_capacity(state_count);
        for _ in 0..state_count {
            outgoing.push(Vec::new())
        }
        for (mv_idx, mv) in moves.iter().enumerate() {
            outgoing[mv.src].push(mv_idx)
        }
        let dead = Self::compute_dead(state_count, &finals, &moves);
        Ok(Automaton { state_count, init, finals, moves, outgoing, dead })
    }

    /// Backward reachability from the accepting states. Moves with
    /// trivially empty guards do not count.
    fn compute_dead(state_count: usize, finals: &StSet, moves: &[Move]) -> StSet {
        let mut alive = finals.clone();
        let mut changed = true;
        while changed {
            changed = false;
            for mv in moves {
                if !mv.guard.trivially_empty()
                    && alive.contains(&mv.dst)
                    && alive.insert(mv.src)
                {
                    changed = true
                }
            }
        }
        let mut dead = StSet::new();
        for st in StRange::zero_to(state_count) {
            if !alive.contains(&st) {
                dead.insert(st);
            }
        }
        dead
    }

    /// Number of states.
    pub fn state_count(&self) -> usize {
        self.state_count
    }
    /// Initial state.
    pub fn init(&self) -> StIdx {
        self.init
    }
    /// True if the state accepts.
    pub fn is_final(&self, st: StIdx) -> bool {
        self.finals.contains(&st)
    }
    /// True if no accepting state is reachable from `st`. Reaching a sink
    /// while unfolding is an immediate conflict.
    pub fn is_sink(&self, st: StIdx) -> bool {
        self.dead.contains(&st)
    }
    /// True if the whole language is empty.
    pub fn is_empty_lang(&self) -> bool {
        self.is_sink(self.init)
    }

    /// Moves out of a state.
    pub fn moves_from(&self, st: StIdx) -> impl Iterator<Item = &Move> {
        self.outgoing[st].iter().map(move |idx| &self.moves[*idx])
    }

    /// Concrete membership run (NFA subset simulation). Used by validation
    /// and tests, never by unfolding.
    pub fn accepts(&self, word: &str) -> bool {
        let mut current = StSet::new();
        current.insert(self.init);
        for c in word.chars() {
            let mut next = StSet::new();
            for st in &current {
                for mv in self.moves_from(*st) {
                    if mv.guard.accepts(c) {
                        next.insert(mv.dst);
                    }
                }
            }
            if next.is_empty() {
                return false;
            }
            current = next
        }
        current.iter().any(|st| self.finals.contains(st))
    }

    /// Product intersection.
    ///
    /// `sat` decides guard satisfiability for the conjoined guards the
    /// product creates; unsatisfiable moves are dropped so the product's
    /// dead-state analysis stays accurate.
    pub fn intersect<F>(&self, other: &Automaton, mut sat: F) -> Res<Automaton>
    where
        F: FnMut(&Guard) -> Res<bool>,
    {
        let mut index_of = HashMap::<(StIdx, StIdx), StIdx>::new();
        let mut pairs = Vec::<(StIdx, StIdx)>::new();
        let mut moves = Vec::new();
        let mut finals = StSet::new();

        macro_rules! state_of {
            ($pair:expr) => {{
                let pair = $pair;
                match index_of.get(&pair) {
                    Some(idx) => *idx,
                    None => {
                        let idx: StIdx = pairs.len().into();
                        index_of.insert(pair, idx);
                        pairs.push(pair);
                        if self.is_final(pair.0) && other.is_final(pair.1) {
                            finals.insert(idx);
                        }
                        idx
                    }
                }
            }};
        }

        let init = state_of!((self.init, other.init));
        let mut next = 0;
        while next < pairs.len() {
            let src: StIdx = next.into();
            let (s1, s2) = pairs[next];
            next += 1;
            for mv1 in self.moves_from(s1) {
                for mv2 in other.moves_from(s2) {
                    let guard = mv1.guard.clone().conj(mv2.guard.clone());
                    if guard.trivially_empty() || !sat(&guard)? {
                        continue;
                    }
                    let dst = state_of!((mv1.dst, mv2.dst));
                    moves.push(Move { src, dst, guard })
                }
            }
        }

        Automaton::new(pairs.len(), init, finals, moves)
    }
}

impl fmt::Display for Automaton {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        writeln!(fmt, "automaton ({} states, init {}) {{", self.state_count, self.init)?;
        for mv in &self.moves {
            writeln!(fmt, "  {} -[{}]-> {}", mv.src, mv.guard, mv.dst)?
        }
        write!(fmt, "}} finals:")?;
        for st in &self.finals {
            write!(fmt, " {}", st)?
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    /// `a b*` over two states.
    fn a_then_bs() -> Automaton {
        let mut finals = StSet::new();
        finals.insert(1.into());
        Automaton::new(
            2,
            0.into(),
            finals,
            vec![
                Move { src: 0.into(), dst: 1.into(), guard: Guard::Is('a') },
                Move { src: 1.into(), dst: 1.into(), guard: Guard::Is('b') },
            ],
        )
        .unwrap()
    }

    #[test]
    fn concrete_runs() {
        let auto = a_then_bs();
        assert!(auto.accepts("a"));
        assert!(auto.accepts("abbb"));
        assert!(!auto.accepts(""));
        assert!(!auto.accepts("ba"));
        assert!(!auto.accepts("ab a"))
    }

    #[test]
    fn dead_state_detection() {
        // State 2 is a trap reachable on 'z'.
        let mut finals = StSet::new();
        finals.insert(1.into());
        let auto = Automaton::new(
            3,
            0.into(),
            finals,
            vec![
                Move { src: 0.into(), dst: 1.into(), guard: Guard::Is('a') },
                Move { src: 0.into(), dst: 2.into(), guard: Guard::Is('z') },
                Move { src: 2.into(), dst: 2.into(), guard: Guard::Top },
            ],
        )
        .unwrap();
        assert!(!auto.is_sink(0.into()));
        assert!(!auto.is_sink(1.into()));
        assert!(auto.is_sink(2.into()));
        assert!(!auto.is_empty_lang())
    }

    #[test]
    fn intersection_is_conjunction() {
        // `a b*` with `[a-c]*`: only `a` then nothing, since the second
        // automaton also accepts `b`.
        let mut finals = StSet::new();
        finals.insert(0.into());
        let any_abc = Automaton::new(
            1,
            0.into(),
            finals,
            vec![Move { src: 0.into(), dst: 0.into(), guard: Guard::Range('a', 'c') }],
        )
        .unwrap();
        let product = a_then_bs().intersect(&any_abc, |_| Ok(true)).unwrap();
        assert!(product.accepts("a"));
        assert!(product.accepts("abb"));
        assert!(!product.accepts("ad"))
    }

    #[test]
    fn intersection_drops_unsat_guards() {
        // `a` with `b`: empty language.
        let mut f1 = StSet::new();
        f1.insert(1.into());
        let just_a = Automaton::new(
            2,
            0.into(),
            f1.clone(),
            vec![Move { src: 0.into(), dst: 1.into(), guard: Guard::Is('a') }],
        )
        .unwrap();
        let just_b = Automaton::new(
            2,
            0.into(),
            f1,
            vec![Move { src: 0.into(), dst: 1.into(), guard: Guard::Is('b') }],
        )
        .unwrap();
        let product = just_a.intersect(&just_b, |_| Ok(true)).unwrap();
        assert!(product.is_empty_lang())
    }

    #[test]
    fn guard_evaluation() {
        let g = Guard::Range('a', 'f').conj(Guard::Is('q').negate());
        assert!(g.accepts('c'));
        assert!(!g.accepts('z'));
        assert!(Guard::Is('a').conj(Guard::Is('b')).trivially_empty());
        assert!(!Guard::Top.trivially_empty())
    }
}
