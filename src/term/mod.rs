//! Hashconsed sequence terms.
//!
//! # Terms
//!
//! The factory is a lazy static for easy creation. The `R`eal term structure
//! is [`RTerm`](enum.RTerm.html) which is hashconsed into
//! [`Term`](type.Term.html). The factory
//! ([`HashConsign`](https://crates.io/crates/hashconsing)) is not directly
//! accessible. Terms are created *via* the functions in this module, such as
//! [var](fn.var.html), [cat](fn.cat.html), [len](fn.len.html), *etc.*
//!
//! In the full system terms are owned by the external engine's term store;
//! here the consign plays that role, and the solver only ever holds
//! hashconsed references.
//!
//! Terms are lightly normalized at creation: concatenations lean right and
//! absorb the empty sequence, double negations cancel, comparisons between
//! integer constants fold, equalities order their arguments. Anything beyond
//! that is the external rewriter's job
//! ([`Engine::rewrite`](../oracle/trait.Engine.html#tymethod.rewrite)).
//!
//! # Sorts
//!
//! Terms are typed by [`Typ`](enum.Typ.html): sequences, elements
//! (characters), integers, booleans, and opaque regular expressions. The
//! vocabulary is closed on purpose; each tactic is a match over this enum
//! and the compiler flags unhandled cases.

use std::fmt;

use crate::common::*;

mod factory;

pub use self::factory::*;

#[cfg(test)]
mod test;

/// Hash consed term.
pub type Term = hashconsing::HConsed<RTerm>;

/// Sort of a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Typ {
    /// Sequences.
    Seq,
    /// Sequence elements (characters).
    Elem,
    /// Integers.
    Int,
    /// Booleans.
    Bool,
    /// Opaque regular expressions, only meaningful to the external builder.
    Re,
}
impl fmt::Display for Typ {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Typ::Seq => write!(fmt, "Seq"),
            Typ::Elem => write!(fmt, "Elem"),
            Typ::Int => write!(fmt, "Int"),
            Typ::Bool => write!(fmt, "Bool"),
            Typ::Re => write!(fmt, "Re"),
        }
    }
}

/// Operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Length of a sequence (int-sorted).
    Len,
    /// `nth(s, i)`, the element of `s` at position `i` (elem-sorted).
    Nth,
    /// Decimal rendering of an integer (seq-sorted).
    IntToStr,
    /// Integer denoted by a sequence of digits, `-1` otherwise (int-sorted).
    StrToInt,
    /// If-then-else, sort of its branches.
    Ite,
    /// Equality, over any one sort.
    Eql,
    /// Negation.
    Not,
    /// Conjunction.
    And,
    /// Disjunction.
    Or,
    /// Integer `<=`.
    Le,
    /// Integer `<`.
    Lt,
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// `contains(a, b)`: `b` occurs in `a`.
    Contains,
    /// `prefix(a, b)`: `a` is a prefix of `b`.
    Prefix,
    /// `suffix(a, b)`: `a` is a suffix of `b`.
    Suffix,
    /// Regular-expression membership.
    InRe,
    /// Lexicographic strict order over sequences.
    SLt,
    /// Lexicographic order over sequences.
    SLe,
}
impl Op {
    /// String representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Op::Len => "len",
            Op::Nth => "nth",
            Op::IntToStr => "int_to_str",
            Op::StrToInt => "str_to_int",
            Op::Ite => "ite",
            Op::Eql => "=",
            Op::Not => "not",
            Op::And => "and",
            Op::Or => "or",
            Op::Le => "<=",
            Op::Lt => "<",
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
            Op::Contains => "contains",
            Op::Prefix => "prefix",
            Op::Suffix => "suffix",
            Op::InRe => "in_re",
            Op::SLt => "str<",
            Op::SLe => "str<=",
        }
    }
}
impl fmt::Display for Op {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.as_str())
    }
}

/// Internally-introduced helper (skolem) functions.
///
/// These are not visible to the external model; the nested oracle treats
/// them as opaque constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sk {
    /// First element of a non-empty sequence (elem-sorted).
    Head,
    /// `tail(s, i)`: the unconsumed suffix of `s` past position `i`.
    Tail,
    /// Aligned prefix of a sequence, up to a known length.
    Pre,
    /// Aligned suffix of a sequence, from a known length.
    Post,
    /// Acceptance atom `acc(s, idx, re, state)`: the suffix of `s` starting
    /// at `idx` is accepted from `state` (bool-sorted).
    Accept,
    /// Transition atom `step(s, idx, re, src, dst, elem)` (bool-sorted).
    Step,
    /// Adaptive unfolding-depth assumption (bool-sorted).
    MaxDepth,
    /// Per-sequence length-limit assumption `len_limit(s, k)` (bool-sorted).
    LenLimit,
}
impl Sk {
    /// String representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Sk::Head => "sk_head",
            Sk::Tail => "sk_tail",
            Sk::Pre => "sk_pre",
            Sk::Post => "sk_post",
            Sk::Accept => "sk_acc",
            Sk::Step => "sk_step",
            Sk::MaxDepth => "sk_max_depth",
            Sk::LenLimit => "sk_len_limit",
        }
    }

    /// Sort of an application of this skolem.
    pub fn typ(self) -> Typ {
        match self {
            Sk::Head => Typ::Elem,
            Sk::Tail | Sk::Pre | Sk::Post => Typ::Seq,
            Sk::Accept | Sk::Step | Sk::MaxDepth | Sk::LenLimit => Typ::Bool,
        }
    }
}
impl fmt::Display for Sk {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.as_str())
    }
}

/// A real term.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum RTerm {
    /// A sequence variable.
    Var(VarIdx),
    /// The empty sequence.
    Empty,
    /// A singleton sequence holding one element term.
    Unit(Term),
    /// Concatenation. Normalized to lean right.
    Cat(Term, Term),
    /// A sequence literal. Never empty (the empty literal is `Empty`).
    CstStr(String),
    /// An element constant.
    CstChar(char),
    /// An integer constant.
    CstInt(Int),
    /// A boolean constant.
    CstBool(bool),
    /// An opaque regular-expression term, owned by the external builder.
    Re(usize),
    /// An operator application.
    App {
        /// The operator.
        op: Op,
        /// The arguments.
        args: Vec<Term>,
    },
    /// A helper-function application.
    Skolem {
        /// The helper.
        sk: Sk,
        /// The arguments.
        args: Vec<Term>,
    },
}

impl RTerm {
    /// Sort of the term.
    pub fn typ(&self) -> Typ {
        match self {
            RTerm::Var(_) | RTerm::Empty | RTerm::Unit(_) | RTerm::Cat(..) | RTerm::CstStr(_) => {
                Typ::Seq
            }
            RTerm::CstChar(_) => Typ::Elem,
            RTerm::CstInt(_) => Typ::Int,
            RTerm::CstBool(_) => Typ::Bool,
            RTerm::Re(_) => Typ::Re,
            RTerm::App { op, args } => match op {
                Op::Len | Op::StrToInt | Op::Add | Op::Sub | Op::Mul => Typ::Int,
                Op::Nth => Typ::Elem,
                Op::IntToStr => Typ::Seq,
                Op::Ite => args[1].typ(),
                Op::Eql
                | Op::Not
                | Op::And
                | Op::Or
                | Op::Le
                | Op::Lt
                | Op::Contains
                | Op::Prefix
                | Op::Suffix
                | Op::InRe
                | Op::SLt
                | Op::SLe => Typ::Bool,
            },
            RTerm::Skolem { sk, .. } => sk.typ(),
        }
    }

    /// True if the term is a sequence variable.
    pub fn is_var(&self) -> bool {
        matches!(self, RTerm::Var(_))
    }
    /// True if the term is the empty sequence.
    pub fn is_empty_seq(&self) -> bool {
        matches!(self, RTerm::Empty)
    }
    /// True if the term is a boolean constant.
    pub fn bool_cst(&self) -> Option<bool> {
        match self {
            RTerm::CstBool(b) => Some(*b),
            _ => None,
        }
    }
    /// True if the term is an integer constant.
    pub fn int_cst(&self) -> Option<&Int> {
        match self {
            RTerm::CstInt(i) => Some(i),
            _ => None,
        }
    }

    /// Inspects a unit term.
    pub fn unit_inspect(&self) -> Option<&Term> {
        match self {
            RTerm::Unit(e) => Some(e),
            _ => None,
        }
    }

    /// Inspects an application of `op`.
    pub fn app_inspect(&self, op: Op) -> Option<&[Term]> {
        match self {
            RTerm::App { op: o, args } if *o == op => Some(args),
            _ => None,
        }
    }

    /// Inspects a skolem application.
    pub fn skolem_inspect(&self, sk: Sk) -> Option<&[Term]> {
        match self {
            RTerm::Skolem { sk: s, args } if *s == sk => Some(args),
            _ => None,
        }
    }

    /// True if the term is elementary: a unit, an element constant wrapped
    /// by a unit, or a one-character literal.
    pub fn is_unit(&self) -> bool {
        match self {
            RTerm::Unit(_) => true,
            RTerm::CstStr(s) => s.chars().count() == 1,
            _ => false,
        }
    }
}

/// Iterates over all subterms of a term, depth-first, including the term
/// itself.
pub fn subterms(t: &Term) -> SubtermIter {
    SubtermIter { stack: vec![t.clone()] }
}

/// Iterator over subterms. See [`subterms`](fn.subterms.html).
pub struct SubtermIter {
    stack: Vec<Term>,
}
impl Iterator for SubtermIter {
    type Item = Term;
    fn next(&mut self) -> Option<Term> {
        let next = self.stack.pop()?;
        match next.get() {
            RTerm::Unit(e) => self.stack.push(e.clone()),
            RTerm::Cat(l, r) => {
                self.stack.push(r.clone());
                self.stack.push(l.clone())
            }
            RTerm::App { args, .. } | RTerm::Skolem { args, .. } => {
                for arg in args.iter().rev() {
                    self.stack.push(arg.clone())
                }
            }
            RTerm::Var(_)
            | RTerm::Empty
            | RTerm::CstStr(_)
            | RTerm::CstChar(_)
            | RTerm::CstInt(_)
            | RTerm::CstBool(_)
            | RTerm::Re(_) => (),
        }
        Some(next)
    }
}

/// True if `needle` occurs in `hay` (as a subterm, syntactically).
pub fn occurs(needle: &Term, hay: &Term) -> bool {
    subterms(hay).any(|sub| &sub == needle)
}

/// Flattens a sequence term into a vector of atomic segments.
///
/// Concatenations are exploded, empty sequences dropped, and sequence
/// literals split into per-character units, so that equation sides only ever
/// hold variables, units, skolem sequences and unreduced applications.
pub fn flatten_into(t: &Term, out: &mut Vec<Term>) {
    match t.get() {
        RTerm::Empty => (),
        RTerm::Cat(l, r) => {
            flatten_into(l, out);
            flatten_into(r, out)
        }
        RTerm::CstStr(s) => {
            for c in s.chars() {
                out.push(unit(chr(c)))
            }
        }
        _ => out.push(t.clone()),
    }
}

/// Flattens a sequence term into a fresh vector of atomic segments.
pub fn flatten(t: &Term) -> Vec<Term> {
    let mut out = Vec::with_capacity(4);
    flatten_into(t, &mut out);
    out
}

/// Rebuilds a sequence term from flattened segments.
pub fn unflatten(segs: &[Term]) -> Term {
    let mut res = empty();
    for seg in segs.iter().rev() {
        res = cat(seg.clone(), res)
    }
    res
}

/// Total length of the literal/unit prefix of some segments.
///
/// Stops at the first segment whose length is not structurally `1`.
pub fn unit_prefix_len(segs: &[Term]) -> usize {
    segs.iter().take_while(|seg| seg.is_unit()).count()
}

/// True if `segs` is the full nth-decomposition of `var`:
/// `unit(nth(var, 0)) ... unit(nth(var, n-1))`.
///
/// The only shape a sequence variable may legally be bound to while still
/// occurring in its own definition.
pub fn is_nth_expansion(var: &Term, segs: &[Term]) -> bool {
    !segs.is_empty()
        && segs.iter().enumerate().all(|(pos, seg)| {
            seg.unit_inspect()
                .and_then(|e| e.app_inspect(Op::Nth))
                .map(|args| {
                    args[0] == *var
                        && args[1].int_cst().and_then(|i| i.to_usize()) == Some(pos)
                })
                .unwrap_or(false)
        })
}

impl fmt::Display for RTerm {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RTerm::Var(idx) => write!(fmt, "{}", idx.default_str()),
            RTerm::Empty => write!(fmt, "\"\""),
            RTerm::Unit(e) => write!(fmt, "(unit {})", e),
            RTerm::Cat(l, r) => write!(fmt, "(++ {} {})", l, r),
            RTerm::CstStr(s) => write!(fmt, "{:?}", s),
            RTerm::CstChar(c) => write!(fmt, "{:?}", c),
            RTerm::CstInt(i) => {
                if i.is_negative() {
                    write!(fmt, "(- {})", -i)
                } else {
                    write!(fmt, "{}", i)
                }
            }
            RTerm::CstBool(b) => write!(fmt, "{}", b),
            RTerm::Re(id) => write!(fmt, "re!{}", id),
            RTerm::App { op, args } => {
                write!(fmt, "({}", op)?;
                for arg in args {
                    write!(fmt, " {}", arg)?
                }
                write!(fmt, ")")
            }
            RTerm::Skolem { sk, args } => {
                write!(fmt, "({}", sk)?;
                for arg in args {
                    write!(fmt, " {}", arg)?
                }
                write!(fmt, ")")
            }
        }
    }
}
