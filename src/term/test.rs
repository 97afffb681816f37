//! Tests for the term factory.

use crate::common::*;

#[test]
fn cat_normalization() {
    let x = term::var(0);
    let y = term::var(1);
    let z = term::var(2);

    assert_eq!(term::cat(term::empty(), x.clone()), x);
    assert_eq!(term::cat(x.clone(), term::empty()), x);

    // Right-leaning: `(x ++ y) ++ z` and `x ++ (y ++ z)` are the same term.
    let left = term::cat(term::cat(x.clone(), y.clone()), z.clone());
    let right = term::cat(x, term::cat(y, z));
    assert_eq!(left, right)
}

#[test]
fn len_folding() {
    assert_eq!(term::len(term::empty()), term::zero());
    assert_eq!(term::len(term::unit(term::chr('a'))), term::one());
    assert_eq!(term::len(term::str_lit("abc")), term::int(3));

    let x = term::var(0);
    let len_x = term::len(x);
    assert!(len_x.app_inspect(term::Op::Len).is_some())
}

#[test]
fn eq_ordering() {
    let x = term::var(0);
    let y = term::var(1);
    assert_eq!(term::eq(x.clone(), y.clone()), term::eq(y.clone(), x.clone()));
    assert_eq!(term::eq(x.clone(), x), term::tru());
    assert_eq!(term::eq(term::chr('a'), term::chr('b')), term::fls())
}

#[test]
fn not_turns_comparisons() {
    let l = term::len(term::var(0));
    let r = term::int(3);
    // not(l <= r) is r < l.
    assert_eq!(
        term::not(term::le(l.clone(), r.clone())),
        term::lt(r.clone(), l.clone())
    );
    assert_eq!(term::not(term::not(term::prefix(term::var(1), term::var(2)))), {
        term::prefix(term::var(1), term::var(2))
    })
}

#[test]
fn itos_folding() {
    assert_eq!(term::itos(term::int(42)), term::str_lit("42"));
    assert_eq!(term::itos(term::int(-3)), term::empty());
    assert_eq!(term::stoi(term::str_lit("017")), term::int(17));
    assert_eq!(term::stoi(term::str_lit("a1")), term::int(-1));
}

#[test]
fn flatten_explodes_literals() {
    let x = term::var(0);
    let t = term::cat(term::str_lit("ab"), term::cat(x.clone(), term::empty()));
    let segs = term::flatten(&t);
    assert_eq!(segs.len(), 3);
    assert_eq!(segs[0], term::unit(term::chr('a')));
    assert_eq!(segs[1], term::unit(term::chr('b')));
    assert_eq!(segs[2], x);
    assert_eq!(term::unit_prefix_len(&segs), 2)
}
