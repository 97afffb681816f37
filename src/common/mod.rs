//! Base types and functions.

pub use std::io::Result as IoRes;
pub use std::io::Write;
pub use std::sync::Arc;

pub use mylib::common::hash::*;

pub use hashconsing::coll::*;
pub use hashconsing::HashConsign;

pub use rsmt2::{SmtRes, Solver};

pub use num::{One, Signed, ToPrimitive, Zero};

pub use crate::errors::*;

pub use crate::term;
pub use crate::term::{RTerm, Sk, Term, Typ};

pub use crate::dep::{Dep, DepLedger};
pub use crate::oracle::{Engine, Lit, Truth};

#[macro_use]
pub mod macros;
pub mod config;
pub mod profiling;
pub mod smt;
mod wrappers;

pub use self::config::*;
pub use self::profiling::{CanPrint, Profiler};
pub use self::wrappers::*;

lazy_static! {
    /// Configuration from clap.
    pub static ref conf: Config = Config::clap();
}

// |===| Type and traits aliases.

/// Integers, used for all length arithmetic.
pub type Int = ::num::BigInt;

/// Stdout.
pub use ::std::io::stdout;

/// Result of a final check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalCheck {
    /// The theory is consistent with the current assignment.
    Done,
    /// Progress was made (axiom, propagation or conflict emitted), the
    /// external search must run another round.
    Continue,
    /// No tactic fired but obligations remain. The external search must
    /// branch elsewhere or deepen unfolding; this does *not* mean unsat.
    Undecided,
}

/// Prints the stats if asked. Does nothing in bench mode.
#[cfg(feature = "bench")]
pub fn print_stats(_: &'static str, _: &Profiler) {}
/// Prints the stats if asked. Does nothing in bench mode.
#[cfg(not(feature = "bench"))]
pub fn print_stats(name: &'static str, profiler: &Profiler) {
    if conf.stats {
        println!();
        profiler.print(name);
        println!()
    }
}
