//! Term creation functions.
//!
//! Normalization here is deliberately light: just enough that equation sides
//! do not accumulate trivial noise (empty segments, right-leaning
//! concatenations, foldable constants). Everything else is delegated to the
//! external rewriter.

use crate::common::*;
use crate::term::{Op, RTerm, Sk, Term, Typ};

hashconsing::consign! {
    /// Term factory.
    let factory = consign(1_000) for RTerm;
}

/// Creates a sequence variable.
#[inline]
pub fn var<V: Into<VarIdx>>(v: V) -> Term {
    factory.mk(RTerm::Var(v.into()))
}

/// The empty sequence.
#[inline]
pub fn empty() -> Term {
    factory.mk(RTerm::Empty)
}

/// A singleton sequence.
#[inline]
pub fn unit(e: Term) -> Term {
    debug_assert_eq!(e.typ(), Typ::Elem);
    factory.mk(RTerm::Unit(e))
}

/// An element constant.
#[inline]
pub fn chr(c: char) -> Term {
    factory.mk(RTerm::CstChar(c))
}

/// A sequence literal. The empty literal is the empty sequence.
pub fn str_lit<S: AsRef<str>>(s: S) -> Term {
    let s = s.as_ref();
    if s.is_empty() {
        empty()
    } else {
        factory.mk(RTerm::CstStr(s.to_string()))
    }
}

/// An integer constant.
#[inline]
pub fn int<I: Into<Int>>(i: I) -> Term {
    factory.mk(RTerm::CstInt(i.into()))
}
/// The constant `0`.
#[inline]
pub fn zero() -> Term {
    int(Int::zero())
}
/// The constant `1`.
#[inline]
pub fn one() -> Term {
    int(Int::one())
}

/// A boolean constant.
#[inline]
pub fn bool(b: bool) -> Term {
    factory.mk(RTerm::CstBool(b))
}
/// The constant `true`.
#[inline]
pub fn tru() -> Term {
    bool(true)
}
/// The constant `false`.
#[inline]
pub fn fls() -> Term {
    bool(false)
}

/// An opaque regular-expression term, identified by the external builder's
/// id for it.
#[inline]
pub fn re(id: usize) -> Term {
    factory.mk(RTerm::Re(id))
}

/// Concatenation.
///
/// Absorbs the empty sequence and re-associates to the right, so that
/// syntactically equal concatenations are hashconsed to the same term.
pub fn cat(l: Term, r: Term) -> Term {
    if l.is_empty_seq() {
        return r;
    }
    if r.is_empty_seq() {
        return l;
    }
    if let RTerm::Cat(ll, lr) = l.get() {
        return cat(ll.clone(), cat(lr.clone(), r));
    }
    factory.mk(RTerm::Cat(l, r))
}

/// Concatenation of an arbitrary number of sequences.
pub fn cat_all<I>(terms: I) -> Term
where
    I: IntoIterator<Item = Term>,
    I::IntoIter: DoubleEndedIterator,
{
    let mut res = empty();
    for t in terms.into_iter().rev() {
        res = cat(t, res)
    }
    res
}

/// Length of a sequence.
///
/// Folds structurally known lengths (empty, units, literals).
pub fn len(s: Term) -> Term {
    match s.get() {
        RTerm::Empty => zero(),
        RTerm::Unit(_) => one(),
        RTerm::CstStr(cst) => int(cst.chars().count()),
        _ => factory.mk(RTerm::App { op: Op::Len, args: vec![s] }),
    }
}

/// Element of a sequence at a position.
pub fn nth(s: Term, i: Term) -> Term {
    factory.mk(RTerm::App { op: Op::Nth, args: vec![s, i] })
}

/// Decimal rendering of an integer.
///
/// Negative constants render as the empty sequence.
pub fn itos(i: Term) -> Term {
    if let Some(cst) = i.int_cst() {
        return if cst.is_negative() {
            empty()
        } else {
            str_lit(cst.to_string())
        };
    }
    factory.mk(RTerm::App { op: Op::IntToStr, args: vec![i] })
}

/// Integer denoted by a sequence of digits.
pub fn stoi(s: Term) -> Term {
    if let RTerm::CstStr(cst) = s.get() {
        if let Ok(n) = cst.parse::<Int>() {
            if !n.is_negative() {
                return int(n);
            }
        }
        return int(-Int::one());
    }
    if s.is_empty_seq() {
        return int(-Int::one());
    }
    factory.mk(RTerm::App { op: Op::StrToInt, args: vec![s] })
}

/// Equality. Arguments are ordered by uid so that `eq(a, b)` and `eq(b, a)`
/// are the same term.
pub fn eq(l: Term, r: Term) -> Term {
    debug_assert_eq!(l.typ(), r.typ());
    if l == r {
        return tru();
    }
    // Distinct constants of the same sort can never be equal.
    let clash = matches!(
        (l.get(), r.get()),
        (RTerm::CstChar(_), RTerm::CstChar(_))
            | (RTerm::CstInt(_), RTerm::CstInt(_))
            | (RTerm::CstBool(_), RTerm::CstBool(_))
            | (RTerm::CstStr(_), RTerm::CstStr(_))
    );
    if clash {
        return fls();
    }
    let (l, r) = if l.uid() <= r.uid() { (l, r) } else { (r, l) };
    factory.mk(RTerm::App { op: Op::Eql, args: vec![l, r] })
}

/// Negation.
///
/// Cancels double negations and turns negated integer comparisons around.
pub fn not(t: Term) -> Term {
    match t.get() {
        RTerm::CstBool(b) => return bool(!*b),
        RTerm::App { op: Op::Not, args } => return args[0].clone(),
        RTerm::App { op: Op::Le, args } => return lt(args[1].clone(), args[0].clone()),
        RTerm::App { op: Op::Lt, args } => return le(args[1].clone(), args[0].clone()),
        _ => (),
    }
    factory.mk(RTerm::App { op: Op::Not, args: vec![t] })
}

/// Integer `<=`.
pub fn le(l: Term, r: Term) -> Term {
    if l == r {
        return tru();
    }
    if let (Some(lc), Some(rc)) = (l.int_cst(), r.int_cst()) {
        return bool(lc <= rc);
    }
    factory.mk(RTerm::App { op: Op::Le, args: vec![l, r] })
}
/// Integer `<`.
pub fn lt(l: Term, r: Term) -> Term {
    if l == r {
        return fls();
    }
    if let (Some(lc), Some(rc)) = (l.int_cst(), r.int_cst()) {
        return bool(lc < rc);
    }
    factory.mk(RTerm::App { op: Op::Lt, args: vec![l, r] })
}
/// Integer `>=`.
#[inline]
pub fn ge(l: Term, r: Term) -> Term {
    le(r, l)
}
/// Integer `>`.
#[inline]
pub fn gt(l: Term, r: Term) -> Term {
    lt(r, l)
}

/// Addition. Folds constants and drops zeros.
pub fn add(args: Vec<Term>) -> Term {
    let mut cst = Int::zero();
    let mut rest = Vec::with_capacity(args.len());
    for arg in args {
        match arg.int_cst() {
            Some(c) => cst += c,
            None => rest.push(arg),
        }
    }
    if rest.is_empty() {
        return int(cst);
    }
    if !cst.is_zero() {
        rest.push(int(cst))
    }
    if rest.len() == 1 {
        return rest.pop().expect("len is 1");
    }
    factory.mk(RTerm::App { op: Op::Add, args: rest })
}
/// Subtraction (binary).
pub fn sub(l: Term, r: Term) -> Term {
    if let (Some(lc), Some(rc)) = (l.int_cst(), r.int_cst()) {
        return int(lc - rc);
    }
    if r.int_cst().map(Int::is_zero).unwrap_or(false) {
        return l;
    }
    factory.mk(RTerm::App { op: Op::Sub, args: vec![l, r] })
}
/// Conjunction.
pub fn and(args: Vec<Term>) -> Term {
    let mut rest = Vec::with_capacity(args.len());
    for arg in args {
        match arg.bool_cst() {
            Some(true) => (),
            Some(false) => return fls(),
            None => rest.push(arg),
        }
    }
    match rest.len() {
        0 => tru(),
        1 => rest.pop().expect("len is 1"),
        _ => factory.mk(RTerm::App { op: Op::And, args: rest }),
    }
}
/// Disjunction.
pub fn or(args: Vec<Term>) -> Term {
    let mut rest = Vec::with_capacity(args.len());
    for arg in args {
        match arg.bool_cst() {
            Some(false) => (),
            Some(true) => return tru(),
            None => rest.push(arg),
        }
    }
    match rest.len() {
        0 => fls(),
        1 => rest.pop().expect("len is 1"),
        _ => factory.mk(RTerm::App { op: Op::Or, args: rest }),
    }
}

/// Containment: `b` occurs in `a`.
pub fn contains(a: Term, b: Term) -> Term {
    if b.is_empty_seq() || a == b {
        return tru();
    }
    if let (RTerm::CstStr(ac), RTerm::CstStr(bc)) = (a.get(), b.get()) {
        return bool(ac.contains(bc.as_str()));
    }
    factory.mk(RTerm::App { op: Op::Contains, args: vec![a, b] })
}

/// Prefix predicate: `a` is a prefix of `b`.
pub fn prefix(a: Term, b: Term) -> Term {
    if a.is_empty_seq() || a == b {
        return tru();
    }
    if let (RTerm::CstStr(ac), RTerm::CstStr(bc)) = (a.get(), b.get()) {
        return bool(bc.starts_with(ac.as_str()));
    }
    factory.mk(RTerm::App { op: Op::Prefix, args: vec![a, b] })
}

/// Suffix predicate: `a` is a suffix of `b`.
pub fn suffix(a: Term, b: Term) -> Term {
    if a.is_empty_seq() || a == b {
        return tru();
    }
    if let (RTerm::CstStr(ac), RTerm::CstStr(bc)) = (a.get(), b.get()) {
        return bool(bc.ends_with(ac.as_str()));
    }
    factory.mk(RTerm::App { op: Op::Suffix, args: vec![a, b] })
}

/// Regular-expression membership.
pub fn in_re(s: Term, regex: Term) -> Term {
    debug_assert_eq!(regex.typ(), Typ::Re);
    factory.mk(RTerm::App { op: Op::InRe, args: vec![s, regex] })
}

/// Lexicographic strict order.
pub fn slt(l: Term, r: Term) -> Term {
    if l == r {
        return fls();
    }
    factory.mk(RTerm::App { op: Op::SLt, args: vec![l, r] })
}
/// Lexicographic order.
pub fn sle(l: Term, r: Term) -> Term {
    if l == r {
        return tru();
    }
    factory.mk(RTerm::App { op: Op::SLe, args: vec![l, r] })
}

// |===| Helper (skolem) terms.

/// First element of a non-empty sequence.
pub fn sk_head(s: Term) -> Term {
    factory.mk(RTerm::Skolem { sk: Sk::Head, args: vec![s] })
}
/// Unconsumed suffix of `s` past position `i`.
pub fn sk_tail(s: Term, i: Term) -> Term {
    factory.mk(RTerm::Skolem { sk: Sk::Tail, args: vec![s, i] })
}
/// Aligned prefix of `s` of length `k`.
pub fn sk_pre(s: Term, k: Term) -> Term {
    factory.mk(RTerm::Skolem { sk: Sk::Pre, args: vec![s, k] })
}
/// Aligned suffix of `s` from position `k`.
pub fn sk_post(s: Term, k: Term) -> Term {
    factory.mk(RTerm::Skolem { sk: Sk::Post, args: vec![s, k] })
}

/// Acceptance atom: suffix of `s` from `idx` accepted from `state`.
pub fn accept(s: Term, idx: usize, regex: Term, state: StIdx) -> Term {
    factory.mk(RTerm::Skolem {
        sk: Sk::Accept,
        args: vec![s, int(idx), regex, int(*state)],
    })
}
/// Transition atom for a move `src -> dst` consuming `elem`.
pub fn step(s: Term, idx: usize, regex: Term, src: StIdx, dst: StIdx, elem: Term) -> Term {
    factory.mk(RTerm::Skolem {
        sk: Sk::Step,
        args: vec![s, int(idx), regex, int(*src), int(*dst), elem],
    })
}

/// Adaptive unfolding-depth assumption.
pub fn max_depth(k: usize) -> Term {
    factory.mk(RTerm::Skolem { sk: Sk::MaxDepth, args: vec![int(k)] })
}
/// Destructures a depth assumption.
pub fn max_depth_inspect(t: &Term) -> Option<usize> {
    let args = t.skolem_inspect(Sk::MaxDepth)?;
    args[0].int_cst()?.to_usize()
}

/// Per-sequence length-limit assumption.
pub fn len_limit(s: Term, k: usize) -> Term {
    factory.mk(RTerm::Skolem { sk: Sk::LenLimit, args: vec![s, int(k)] })
}
/// Destructures a length-limit assumption.
pub fn len_limit_inspect(t: &Term) -> Option<(Term, usize)> {
    let args = t.skolem_inspect(Sk::LenLimit)?;
    let k = args[1].int_cst()?.to_usize()?;
    Some((args[0].clone(), k))
}
