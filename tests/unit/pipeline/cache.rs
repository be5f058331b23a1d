use super::*;

#[test]
fn evicts_oldest_inserted_first() {
    let mut c = BoundedCache::new(2);
    assert!(c.insert("a", 1).is_empty());
    assert!(c.insert("b", 2).is_empty());
    assert_eq!(c.insert("c", 3), vec![("a", 1)]);
    assert_eq!(c.len(), 2);
    assert_eq!(c.get("a"), None);
    assert_eq!(c.get("c"), Some(&3));
}

#[test]
fn reinsert_refreshes_age() {
    let mut c = BoundedCache::new(2);
    c.insert("a", 1);
    c.insert("b", 2);
    assert!(c.insert("a", 10).is_empty());
    assert_eq!(c.insert("c", 3), vec![("b", 2)]);
    let order: Vec<_> = c.iter().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(order, vec![("a", 10), ("c", 3)]);
}

#[test]
fn zero_capacity_keeps_nothing() {
    let mut c = BoundedCache::new(0);
    assert_eq!(c.insert(1u32, "x"), vec![(1, "x")]);
    assert_eq!(c.len(), 0);
    assert_eq!(c.capacity(), 0);
}

#[test]
fn clear_empties_everything() {
    let mut c = BoundedCache::new(4);
    c.insert(String::from("k"), 1);
    c.clear();
    assert_eq!(c.len(), 0);
    assert_eq!(c.get("k"), None);
    assert!(c.insert(String::from("k"), 2).is_empty());
}
