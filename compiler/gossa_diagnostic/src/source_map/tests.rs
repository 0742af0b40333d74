use pretty_assertions::assert_eq;

use crate::SourceMap;

#[test]
fn files_get_disjoint_bases() {
    let mut map = SourceMap::new();
    let a = map.add("a.go", "package a\n");
    let b = map.add("b.go", "package a\nvar x int\n");
    assert_eq!(a, 0);
    assert_eq!(b, 11);

    let pos = map.position(b + 14).map(|p| p.to_string());
    assert_eq!(pos.as_deref(), Some("b.go:2:5"));
    let pos = map.position(a + 8).map(|p| p.to_string());
    assert_eq!(pos.as_deref(), Some("a.go:1:9"));
}

#[test]
fn end_of_file_offset_stays_in_file() {
    let mut map = SourceMap::new();
    map.add("a.go", "x");
    let b = map.add("b.go", "y");
    assert_eq!(map.file(1).map(|f| f.name.as_str()), Some("a.go"));
    assert_eq!(map.file(b).map(|f| f.name.as_str()), Some("b.go"));
}

#[test]
fn empty_map_resolves_nothing() {
    let map = SourceMap::new();
    assert!(map.position(0).is_none());
}
