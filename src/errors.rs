//! Error types.
//!
//! Logical conflicts and "undecided" outcomes are *not* errors: they are
//! ordinary values flowing through the conflict/propagation sinks and the
//! final-check result. The error types here cover everything else:
//!
//! - [`ErrorKind::Unsupported`][unsupported], an input construct the
//!   procedure cannot handle (a regex the automaton builder rejected, an
//!   arithmetic backend mismatch). Fatal for the whole run, and crucially
//!   *not* an unsat result;
//! - [`ErrorKind::Timeout`][timeout], the cooperative resource-limit trip;
//! - [`ErrorKind::Internal`][internal], invariant violations (substitution
//!   cycles, stale dependency literals). Programming-error class, never
//!   expected in a correct implementation.
//!
//! [unsupported]: enum.ErrorKind.html#variant.Unsupported
//! (Unsupported variant of the ErrorKind enum)
//! [timeout]: enum.ErrorKind.html#variant.Timeout
//! (Timeout variant of the ErrorKind enum)
//! [internal]: enum.ErrorKind.html#variant.Internal
//! (Internal variant of the ErrorKind enum)

use crate::common::conf;

error_chain! {
    types {
        Error, ErrorKind, ResultExt, Res;
    }

    links {
        SmtError(
            ::rsmt2::errors::Error, ::rsmt2::errors::ErrorKind
        ) #[doc = "Error at SMT level (nested oracle)."];
    }

    foreign_links {
        Io(::std::io::Error) #[doc = "IO error."];
    }

    errors {
        #[doc = "Could not spawn z3 for a nested check."]
        Z3SpawnError {
            description("could not spawn z3")
            display("could not spawn z3")
        }
        #[doc = "Unsupported input construct. Fatal, does not imply unsat."]
        Unsupported(blah: String) {
            description("unsupported input")
            display("unsupported: {}", blah)
        }
        #[doc = "Timeout reached."]
        Timeout {
            description("timeout")
            display("timeout")
        }
        #[doc = "Internal invariant violation, there is a bug somewhere."]
        Internal(blah: String) {
            description("internal invariant violation")
            display("[bug] {}", blah)
        }
    }
}

impl Error {
    /// True if the kind of the error is [`ErrorKind::Timeout`][timeout].
    ///
    /// [timeout]: enum.ErrorKind.html#variant.Timeout
    /// (ErrorKind's Timeout variant)
    pub fn is_timeout(&self) -> bool {
        matches!(*self.kind(), ErrorKind::Timeout)
    }

    /// True if the kind of the error is [`ErrorKind::Unsupported`][unsup].
    ///
    /// [unsup]: enum.ErrorKind.html#variant.Unsupported
    /// (ErrorKind's Unsupported variant)
    pub fn is_unsupported(&self) -> bool {
        matches!(*self.kind(), ErrorKind::Unsupported(_))
    }
}

/// Prints an error.
pub fn print_err(errs: &Error) {
    println!("({} \"", conf.bad("error"));
    for err in errs.iter() {
        for line in format!("{}", err).lines() {
            println!("  {}", line)
        }
    }
    println!("\")")
}
