//! Zero-cost wrappers for safe indexing.

use std::fmt;
use std::io::Write;

wrap_usize! {
    #[doc = "Sequence variable indices."]
    VarIdx
    #[doc = "Range over sequence variables."]
    range: VarRange
    #[doc = "Set of sequence variables."]
    set: VarSet
    #[doc = "Hash map from sequence variables to something."]
    hash map: VarHMap
    #[doc = "Total map from sequence variables to something."]
    map: VarMap with iter: VarMapIter
}
impl VarIdx {
    /// Default way to write sequence variables: `s_<idx>`.
    pub fn default_write<W>(&self, w: &mut W) -> ::std::io::Result<()>
    where
        W: Write,
    {
        write!(w, "s_{}", self)
    }
    /// Default string representation of a sequence variable.
    pub fn default_str(&self) -> String {
        let mut s = vec![];
        self.default_write(&mut s).unwrap();
        ::std::str::from_utf8(&s).unwrap().into()
    }
}

impl<T: fmt::Display> fmt::Display for VarMap<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "(")?;
        for_first! {
          self.iter() => {
            |fst| write!(fmt, "{}", fst) ?,
            then |nxt| write!(fmt, ",{}", nxt)?
          }
        }
        write!(fmt, ")")
    }
}

wrap_usize! {
    #[doc = "Dependency node indices, into the ledger's arena."]
    DepIdx
    #[doc = "Range over dependency nodes."]
    range: DepRange
    #[doc = "Set of dependency nodes."]
    set: DepSet
    #[doc = "Hash map from dependency nodes to something."]
    hash map: DepHMap
    #[doc = "Total map from dependency nodes to something."]
    map: DepMap with iter: DepMapIter
}

wrap_usize! {
    #[doc = "Automaton state indices."]
    StIdx
    #[doc = "Range over automaton states."]
    range: StRange
    #[doc = "Set of automaton states."]
    set: StSet
    #[doc = "Hash map from automaton states to something."]
    hash map: StHMap
    #[doc = "Total map from automaton states to something."]
    map: StMap with iter: StMapIter
}

wrap_usize! {
    #[doc = "Equivalence class identifiers, owned by the external engine."]
    ClassIdx
    #[doc = "Set of equivalence classes."]
    set: ClassSet
    #[doc = "Hash map from equivalence classes to something."]
    hash map: ClassHMap
}
