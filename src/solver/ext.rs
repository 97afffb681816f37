//! Extensionality over relevant sequence terms.
//!
//! Sequences have no constructors the congruence closure could compare, so
//! two relevant sequence terms in different classes need an explicit
//! nudge: if their canonical forms coincide they are equal outright;
//! otherwise the equality is surfaced as a case split and the pair is
//! excluded from further attempts.

use crate::common::*;
use crate::solver::{Core, Outcome, Tactic};

/// Tactic 14: extensionality.
pub struct CheckExtensionality;

impl CheckExtensionality {
    /// Constructor.
    pub fn new() -> Self {
        CheckExtensionality
    }
}

impl<E: Engine> Tactic<E> for CheckExtensionality {
    fn name(&self) -> &'static str {
        "check_extensionality"
    }

    fn apply(&mut self, core: &mut Core, engine: &mut E) -> Res<Outcome> {
        let terms = engine.relevant_seq_terms();
        for (i, fst) in terms.iter().enumerate() {
            conf.check_timeout()?;
            for snd in &terms[i + 1..] {
                if engine.root_of(fst) == engine.root_of(snd) {
                    continue;
                }
                if core.exclude.contains(fst, snd) {
                    continue;
                }
                let (c1, d1) = core.canon(engine, fst);
                let (c2, d2) = core.canon(engine, snd);
                if c1 == c2 {
                    // Same canonical form in different classes: equate.
                    let dep = core.ledger.join(d1, d2);
                    if core.propagate_eq(engine, dep, fst, snd)? {
                        profile! { core "ext equalities" => add 1 }
                        return Ok(Outcome::Fired);
                    }
                    continue;
                }
                // Residual difference: offer "assume equal" to the outer
                // search, once per pair.
                core.exclude.update(fst, snd);
                let hyp = term::eq(fst.clone(), snd.clone());
                if hyp.bool_cst().is_some() {
                    continue;
                }
                let lit = engine.literal_for(&hyp);
                if engine.assignment_of(lit).is_unknown() {
                    engine.mark_relevant(lit);
                    log! { @debug "extensionality split: {} = {}", fst, snd }
                    profile! { core "ext splits" => add 1 }
                    return Ok(Outcome::Fired);
                }
            }
        }
        Ok(Outcome::Quiet)
    }
}
