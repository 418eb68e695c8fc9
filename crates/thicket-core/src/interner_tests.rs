use crate::{Interner, StringId};

#[test]
fn intern_deduplicates() {
    let mut interner = Interner::new();

    let a = interner.intern("left");
    let b = interner.intern("left");
    let c = interner.intern("right");

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(interner.len(), 2);
}

#[test]
fn ids_are_dense_in_insertion_order() {
    let mut interner = Interner::new();

    let a = interner.intern("eq?");
    let b = interner.intern("match?");

    assert_eq!(a.index(), 0);
    assert_eq!(b.index(), 1);
    assert_eq!(StringId::from_index(1), b);
}

#[test]
fn get_does_not_intern() {
    let mut interner = Interner::new();
    interner.intern("x");

    assert!(interner.get("x").is_some());
    assert!(interner.get("y").is_none());
    assert_eq!(interner.len(), 1);
}

#[test]
fn resolve_and_iterate() {
    let mut interner = Interner::new();
    let id = interner.intern("hello");
    interner.intern("world");

    assert_eq!(interner.resolve(id), "hello");
    assert_eq!(interner.try_resolve(StringId::from_index(9)), None);

    let all: Vec<_> = interner.iter().map(|(_, s)| s).collect();
    assert_eq!(all, ["hello", "world"]);
    assert_eq!(interner.as_slice(), ["hello", "world"]);
}
