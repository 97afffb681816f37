//! Ordering-consistency propagation over lexicographic atoms.
//!
//! Assigned `str<` / `str<=` atoms are recorded in the core's ordering
//! registry as they arrive. This tactic closes the registry under
//! transitivity: two relations chaining through endpoints in the same
//! equivalence class yield the relation between the outer endpoints, strict
//! whenever either input is strict.

use crate::common::*;
use crate::solver::{Core, Outcome, Tactic};

/// Tactic 2: transitive closure of the ordering registry.
pub struct CheckLts;

impl CheckLts {
    /// Constructor.
    pub fn new() -> Self {
        CheckLts
    }
}

impl<E: Engine> Tactic<E> for CheckLts {
    fn name(&self) -> &'static str {
        "check_lts"
    }

    fn apply(&mut self, core: &mut Core, engine: &mut E) -> Res<Outcome> {
        let rels = core.lts.items().to_vec();
        for (i, fst) in rels.iter().enumerate() {
            for snd in &rels[i + 1..] {
                // Orient the chain: fst.rhs joins snd.lhs, or the converse.
                let (first, second) =
                    if engine.root_of(&fst.rhs) == engine.root_of(&snd.lhs) {
                        (fst, snd)
                    } else if engine.root_of(&snd.rhs) == engine.root_of(&fst.lhs) {
                        (snd, fst)
                    } else {
                        continue;
                    };
                let key = (first.lit, second.lit);
                if core.lts_done.items().contains(&key) {
                    continue;
                }
                core.lts_done.push(key);

                let strict = first.strict || second.strict;
                let outer = if strict {
                    term::slt(first.lhs.clone(), second.rhs.clone())
                } else {
                    term::sle(first.lhs.clone(), second.rhs.clone())
                };
                let d1 = core.ledger.lit(first.lit);
                let d2 = core.ledger.lit(second.lit);
                let mut dep = core.ledger.join(Some(d1), Some(d2));
                if first.rhs != second.lhs {
                    let link = core.ledger.term_eq(&first.rhs, &second.lhs);
                    dep = core.ledger.join(dep, Some(link))
                }
                if core.propagate(engine, dep, &outer)? {
                    profile! { core "lts closures" => add 1 }
                    return Ok(Outcome::Fired);
                }
            }
        }
        Ok(Outcome::Quiet)
    }
}
