//! SMT-related zero-cost wrappers.
//!
//! Used by the nested oracle: conjunctions of side conditions are shipped to
//! a fresh z3 instance over the SMT-LIB string theory. Helper (skolem)
//! applications and regex membership atoms are printed as opaque constants,
//! their uid making the name unique, so the nested check never tries to
//! reason about unfolding internals.

use rsmt2::print::{Expr2Smt, Sym2Smt};

use crate::common::*;

/// Spawns a fresh z3 instance from the configuration.
pub fn mk_solver() -> Res<Solver<()>> {
    Solver::new(conf.solver.conf(), ()).chain_err(|| ErrorKind::Z3SpawnError)
}

/// The SMT sort a term prints at.
///
/// Sequences and elements both go to `String`; units print as their element.
fn sort_str(typ: Typ) -> &'static str {
    match typ {
        Typ::Seq | Typ::Elem => "String",
        Typ::Int => "Int",
        Typ::Bool => "Bool",
        // Regexes never reach the solver, they hide inside opaque atoms.
        Typ::Re => "Bool",
    }
}

/// True if the term prints as an opaque constant.
fn is_opaque(trm: &Term) -> bool {
    match trm.get() {
        RTerm::Skolem { .. } => true,
        RTerm::App { op, .. } => *op == term::Op::InRe,
        _ => false,
    }
}

fn write_opaque<W: Write>(w: &mut W, trm: &Term) -> IoRes<()> {
    match trm.get() {
        RTerm::Skolem { sk, .. } => write!(w, "|{} {}|", sk, trm.uid()),
        _ => write!(w, "|in_re {}|", trm.uid()),
    }
}

fn write_term<W: Write>(w: &mut W, trm: &Term) -> IoRes<()> {
    use crate::term::Op;
    if is_opaque(trm) {
        return write_opaque(w, trm);
    }
    match trm.get() {
        RTerm::Var(idx) => idx.default_write(w),
        RTerm::Empty => write!(w, "\"\""),
        RTerm::Unit(e) => write_term(w, e),
        RTerm::Cat(l, r) => {
            write!(w, "(str.++ ")?;
            write_term(w, l)?;
            write!(w, " ")?;
            write_term(w, r)?;
            write!(w, ")")
        }
        RTerm::CstStr(s) => write!(w, "{:?}", s),
        RTerm::CstChar(c) => write!(w, "\"{}\"", c),
        RTerm::CstInt(i) => {
            if i.is_negative() {
                write!(w, "(- {})", -i)
            } else {
                write!(w, "{}", i)
            }
        }
        RTerm::CstBool(b) => write!(w, "{}", b),
        RTerm::Re(id) => write!(w, "|re {}|", id),
        RTerm::App { op, args } => {
            let smt_op = match op {
                Op::Len => "str.len",
                Op::Nth => "str.at",
                Op::IntToStr => "str.from_int",
                Op::StrToInt => "str.to_int",
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
                Op::Contains => "str.contains",
                Op::Prefix => "str.prefixof",
                Op::Suffix => "str.suffixof",
                Op::SLt => "str.<",
                Op::SLe => "str.<=",
                // Handled by `is_opaque`.
                Op::InRe => unreachable!("in_re atoms print as opaque constants"),
            };
            write!(w, "({}", smt_op)?;
            for arg in args {
                write!(w, " ")?;
                write_term(w, arg)?
            }
            write!(w, ")")
        }
        RTerm::Skolem { .. } => unreachable!("skolems print as opaque constants"),
    }
}

/// SMT-prints a term using the default var writer.
pub struct SmtTerm<'a> {
    /// The term.
    pub term: &'a Term,
}
impl<'a> SmtTerm<'a> {
    /// Constructor.
    pub fn new(term: &'a Term) -> Self {
        SmtTerm { term }
    }
}
impl<'a> Expr2Smt<()> for SmtTerm<'a> {
    fn expr_to_smt2<Writer: Write>(&self, w: &mut Writer, _: ()) -> SmtRes<()> {
        write_term(w, self.term)?;
        Ok(())
    }
}

/// An opaque symbol: a sequence variable or an opaque atom.
pub struct SmtSym<'a> {
    /// The term the symbol stands for.
    pub term: &'a Term,
}
impl<'a> Sym2Smt<()> for SmtSym<'a> {
    fn sym_to_smt2<Writer: Write>(&self, w: &mut Writer, _: ()) -> SmtRes<()> {
        if is_opaque(self.term) {
            write_opaque(w, self.term)?
        } else {
            write_term(w, self.term)?
        }
        Ok(())
    }
}

/// SMT-prints a collection of terms as a conjunction.
pub struct SmtConj<'a> {
    /// Conjunction.
    terms: &'a [Term],
}
impl<'a> SmtConj<'a> {
    /// Constructor.
    pub fn new(terms: &'a [Term]) -> Self {
        SmtConj { terms }
    }

    /// Free symbols of the conjunction: sequence variables plus opaque
    /// atoms, each with its sort.
    fn free_syms(&self) -> Vec<(Term, Typ)> {
        let mut seen = HConSet::<Term>::new();
        let mut syms = Vec::new();
        for trm in self.terms {
            let mut todo = vec![trm.clone()];
            while let Some(current) = todo.pop() {
                if !seen.insert(current.clone()) {
                    continue;
                }
                if current.is_var() || is_opaque(&current) {
                    syms.push((current.clone(), current.typ()));
                    continue;
                }
                match current.get() {
                    RTerm::Unit(e) => todo.push(e.clone()),
                    RTerm::Cat(l, r) => {
                        todo.push(l.clone());
                        todo.push(r.clone())
                    }
                    RTerm::App { args, .. } | RTerm::Skolem { args, .. } => {
                        todo.extend(args.iter().cloned())
                    }
                    _ => (),
                }
            }
        }
        syms
    }

    /// Checks the satisfiability of this conjunction on a fresh scope of
    /// `solver`, declaring the free symbols first.
    pub fn check_sat<Parser: Copy>(&self, solver: &mut Solver<Parser>) -> Res<bool> {
        if self.terms.is_empty() {
            return Ok(true);
        }
        solver.push(1)?;
        for (sym, typ) in self.free_syms() {
            solver.declare_const(&SmtSym { term: &sym }, sort_str(typ))?
        }
        solver.assert(self)?;
        let sat = solver.check_sat()?;
        solver.pop(1)?;
        Ok(sat)
    }

    /// Checks if this conjunction is unsatisfiable.
    pub fn is_unsat<Parser: Copy>(&self, solver: &mut Solver<Parser>) -> Res<bool> {
        Ok(!self.check_sat(solver)?)
    }
}
impl<'a> Expr2Smt<()> for SmtConj<'a> {
    fn expr_to_smt2<Writer: Write>(&self, w: &mut Writer, _: ()) -> SmtRes<()> {
        if self.terms.is_empty() {
            write!(w, "true")?
        } else {
            write!(w, "(and")?;
            for term in self.terms {
                write!(w, " ")?;
                write_term(w, term)?
            }
            write!(w, ")")?
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn smt_string(trm: &Term) -> String {
        let mut buf = vec![];
        write_term(&mut buf, trm).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn terms_print_in_string_theory() {
        let t = term::cat(term::var(0), term::str_lit("ab"));
        assert_eq!(smt_string(&t), "(str.++ s_0 \"ab\")");
        let t = term::le(term::len(term::var(1)), term::int(3));
        assert_eq!(smt_string(&t), "(<= (str.len s_1) 3)");
        let t = term::unit(term::chr('x'));
        assert_eq!(smt_string(&t), "\"x\"")
    }

    #[test]
    fn skolems_print_opaque() {
        let t = term::sk_head(term::var(0));
        let s = smt_string(&t);
        assert!(s.starts_with("|sk_head "));
        assert!(s.ends_with('|'))
    }

    #[test]
    fn free_syms_are_collected_once() {
        let x = term::var(0);
        let conj = vec![
            term::eq(x.clone(), term::str_lit("a")),
            term::le(term::len(x), term::int(1)),
        ];
        let conj = SmtConj::new(&conj);
        let syms = conj.free_syms();
        assert_eq!(syms.len(), 1);
        assert_eq!(syms[0].1, Typ::Seq)
    }
}
