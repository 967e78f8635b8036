//! Shallow record diffing primitives
//!
//! All functions are pure and return fresh records; inputs are never aliased
//! or modified. Values are compared with [`crate::Value::strict_eq`], one
//! level deep.

use crate::record::Record;

/// Copy `left`, then apply every field of `right` that is not absent
pub fn override_defined_props_only(left: &Record, right: &Record) -> Record {
    let mut result = left.clone();
    for (key, value) in right.iter() {
        if value.is_defined() {
            result.insert(key, value.clone());
        }
    }
    result
}

/// Copy `obj` without the listed keys
///
/// Keys that `obj` does not have are ignored.
pub fn omit_keys<'a, I>(obj: &Record, keys: I) -> Record
where
    I: IntoIterator<Item = &'a str>,
{
    let omitted: Vec<&str> = keys.into_iter().collect();
    obj.iter()
        .filter(|(key, _)| !omitted.contains(key))
        .map(|(key, value)| (key, value.clone()))
        .collect()
}

/// Fields whose value differs between `left` and `right`
///
/// Each differing key holds `right`'s value, or [`crate::Value::Absent`] when
/// the key only exists in `left`. Keys are visited in `left` order, then the
/// keys only `right` has.
pub fn overridden_props(left: &Record, right: &Record) -> Record {
    let mut result = Record::new();
    let right_only = right.keys().filter(|key| !left.contains_key(key));

    for key in left.keys().chain(right_only) {
        let new_value = right.get_or_absent(key);
        if !left.get_or_absent(key).strict_eq(new_value) {
            result.insert(key, new_value.clone());
        }
    }
    result
}

/// Same key count, and every key of `left` strictly equal in `right`
pub fn are_shallow_equal(left: &Record, right: &Record) -> bool {
    if left.len() != right.len() {
        return false;
    }

    left.iter()
        .all(|(key, value)| value.strict_eq(right.get_or_absent(key)))
}
