//! Change propagation
//!
//! Splits the outcome of a batch into the internal subset to persist and the
//! full change set to report. The stored internal state is only replaced
//! when the new subset is not shallow-equal to it; otherwise the existing
//! `Arc` is handed back so snapshot identity stays stable.

use crate::diff::{are_shallow_equal, overridden_props};
use crate::partition::partition;
use crate::record::Record;
use std::fmt;
use std::sync::Arc;

type ChangeFn = dyn Fn(&Record) + Send + Sync;

/// Shared handle to a change notification callback
///
/// Identity follows the same rule as [`crate::Reducer`]: clones are the
/// same callback, separately created handles are not.
#[derive(Clone)]
pub struct ChangeCallback {
    f: Arc<ChangeFn>,
}

impl ChangeCallback {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Record) + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Invoke the callback with a change set
    pub fn notify(&self, changes: &Record) {
        (self.f)(changes)
    }

    /// Check if both handles share the same callback
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::as_ptr(&a.f).cast::<()>() == Arc::as_ptr(&b.f).cast::<()>()
    }
}

impl fmt::Debug for ChangeCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeCallback")
            .field("ptr", &Arc::as_ptr(&self.f).cast::<()>())
            .finish()
    }
}

/// Result of propagating one batch
#[derive(Clone, Debug)]
pub struct Propagation {
    /// Internal state to store from now on. Same `Arc` as the stored one
    /// when nothing internal changed.
    pub next_internal: Arc<Record>,
    /// Whether `next_internal` replaces the stored state
    pub changed: bool,
    /// Every combined field that differs across the batch
    pub change_set: Record,
}

/// Diff a batch and derive the next internal state
pub fn propagate(
    old_combined: &Record,
    new_combined: &Record,
    external_keys: &[String],
    stored_internal: &Arc<Record>,
) -> Propagation {
    let change_set = overridden_props(old_combined, new_combined);
    let candidate = partition(new_combined, external_keys);

    let changed = !are_shallow_equal(stored_internal, &candidate);
    let next_internal = if changed {
        Arc::new(candidate)
    } else {
        Arc::clone(stored_internal)
    };

    Propagation {
        next_internal,
        changed,
        change_set,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;
    use crate::value::Value;
    use std::sync::Mutex;

    fn keys(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn test_internal_change_is_committed() {
        let stored = Arc::new(record! { "firstName" => "Zdzicho", "lastName" => "Kopacz" });
        let old = record! { "firstName" => "Zdzicho", "lastName" => "Kopacz", "age" => 25 };
        let new = record! { "firstName" => "Heniu", "lastName" => "Majster", "age" => 25 };

        let result = propagate(&old, &new, &keys(&["age"]), &stored);

        assert!(result.changed);
        assert!(!Arc::ptr_eq(&result.next_internal, &stored));
        assert_eq!(
            *result.next_internal,
            record! { "firstName" => "Heniu", "lastName" => "Majster" }
        );
        assert_eq!(
            result.change_set,
            record! { "firstName" => "Heniu", "lastName" => "Majster" }
        );
    }

    #[test]
    fn test_external_only_change_keeps_stored_reference() {
        let stored = Arc::new(record! { "firstName" => "Zdzicho" });
        let old = record! { "firstName" => "Zdzicho", "age" => 25 };
        let new = record! { "firstName" => "Zdzicho", "age" => 26 };

        let result = propagate(&old, &new, &keys(&["age"]), &stored);

        assert!(!result.changed);
        assert!(Arc::ptr_eq(&result.next_internal, &stored));
        assert_eq!(result.change_set, record! { "age" => 26 });
    }

    #[test]
    fn test_no_change_yields_empty_set() {
        let stored = Arc::new(record! { "firstName" => "Zdzicho" });
        let combined = record! { "firstName" => "Zdzicho" };

        let result = propagate(&combined, &combined.clone(), &[], &stored);

        assert!(!result.changed);
        assert!(result.change_set.is_empty());
        assert!(Arc::ptr_eq(&result.next_internal, &stored));
    }

    #[test]
    fn test_dropped_field_reported_absent() {
        let stored = Arc::new(record! { "firstName" => "Zdzicho", "lastName" => "Kopacz" });
        let old = record! { "firstName" => "Zdzicho", "lastName" => "Kopacz" };
        let new = record! { "firstName" => "Zdzicho" };

        let result = propagate(&old, &new, &[], &stored);

        assert!(result.changed);
        assert_eq!(*result.next_internal, record! { "firstName" => "Zdzicho" });
        assert!(result.change_set.get_or_absent("lastName").is_absent());
        assert_eq!(result.change_set.len(), 1);
    }

    #[test]
    fn test_fresh_nested_object_counts_as_change() {
        let stored = Arc::new(record! { "address" => record! { "city" => "Gdynia" } });
        let old = (*stored).clone();
        let new = record! { "address" => record! { "city" => "Gdynia" } };

        let result = propagate(&old, &new, &[], &stored);

        assert!(result.changed);
        assert!(result.change_set.contains_key("address"));
    }

    #[test]
    fn test_shared_nested_object_is_not_a_change() {
        let address = Value::object(record! { "city" => "Gdynia" });
        let stored = Arc::new(record! { "address" => address.clone() });
        let old = (*stored).clone();
        let new = record! { "address" => address };

        let result = propagate(&old, &new, &[], &stored);

        assert!(!result.changed);
        assert!(result.change_set.is_empty());
    }

    #[test]
    fn test_callback_identity_and_notify() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let calls_clone = calls.clone();
        let callback = ChangeCallback::new(move |changes: &Record| {
            calls_clone.lock().unwrap().push(changes.clone());
        });
        let other = ChangeCallback::new(|_: &Record| {});

        callback.notify(&record! { "age" => 15 });

        assert_eq!(*calls.lock().unwrap(), vec![record! { "age" => 15 }]);
        assert!(ChangeCallback::ptr_eq(&callback, &callback.clone()));
        assert!(!ChangeCallback::ptr_eq(&callback, &other));
    }
}
