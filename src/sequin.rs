//! Sequin is a decision procedure for constraints over sequences (strings):
//! word equations and disequations, length relationships, containment and
//! prefix/suffix predicates, and regular-expression membership.
//!
//! It is designed to run as a plug-in theory inside a lazy SMT engine that
//! owns boolean search, congruence closure and linear arithmetic. That engine
//! is abstracted by the [`Engine`](oracle/trait.Engine.html) trait; the
//! [`harness`](harness/index.html) module provides a scripted implementation
//! for tests.
//!
//! The heart of the crate is a cascade of tactics (see
//! [`theory`](theory/index.html)): pending equations are simplified to a
//! fixpoint, then case-split tactics are tried in priority order until one
//! makes progress. Every derived fact carries a justification built in the
//! [dependency ledger](dep/index.html), so conflicts and propagations can be
//! explained to the surrounding search and undone on backtracking.

#![doc(test(attr(deny(warnings))))]

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate mylib;
#[macro_use]
extern crate error_chain;

pub mod errors;
#[macro_use]
pub mod common;
pub mod term;

pub mod automaton;
pub mod dep;
pub mod exclude;
pub mod harness;
pub mod oracle;
pub mod solver;
pub mod subst;
pub mod theory;

#[cfg(test)]
mod tests;
