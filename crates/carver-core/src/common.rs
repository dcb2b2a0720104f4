//! Structural intersection of documents.
//!
//! The pairwise analogue of `normalize`: keep only the keys present in both
//! documents, recursing where both sides hold a document. Provenance is not
//! tracked; where the values differ the second document's value is kept.

use serde_json::Value;

use crate::Tree;

/// Sorted intersection of two key lists, independent of input order
pub fn intersect_sorted<S: AsRef<str>>(a: &[S], b: &[S]) -> Vec<String> {
    let mut a: Vec<&str> = a.iter().map(AsRef::as_ref).collect();
    let mut b: Vec<&str> = b.iter().map(AsRef::as_ref).collect();
    a.sort_unstable();
    a.dedup();
    b.sort_unstable();
    b.dedup();

    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i].to_string());
                i += 1;
                j += 1;
            }
        }
    }
    out
}

/// Keys present in both `a` and `b`, recursively
pub fn common(a: &Tree, b: &Tree) -> Tree {
    let a_keys: Vec<&str> = a.keys().map(String::as_str).collect();
    let b_keys: Vec<&str> = b.keys().map(String::as_str).collect();

    let mut out = Tree::new();
    for key in intersect_sorted(&a_keys, &b_keys) {
        let value = match (&a[&key], &b[&key]) {
            (Value::Object(a_map), Value::Object(b_map)) => Value::Object(common(a_map, b_map)),
            (_, b_value) => b_value.clone(),
        };
        out.insert(key, value);
    }
    out
}

/// Fold `common` over any number of documents; no documents gives an empty one
pub fn common_all<'a, I>(documents: I) -> Tree
where
    I: IntoIterator<Item = &'a Tree>,
{
    let mut documents = documents.into_iter();
    let Some(first) = documents.next() else {
        return Tree::new();
    };
    documents.fold(first.clone(), |acc, document| common(&acc, document))
}
