//! Union state controller
//!
//! [`UnionState`] is the per-component instance that owns the internal state
//! and hands out a memoized [`Dispatcher`] on every evaluation:
//!
//! ```
//! use blinc_union_state::{record, Record, Reducer, UnionState, Value};
//!
//! enum Action {
//!     Rename(&'static str),
//! }
//!
//! let reducer = Reducer::new(|state: Record, action: &Action| match action {
//!     Action::Rename(name) => state.with("firstName", *name),
//! });
//!
//! let mut union = UnionState::new(
//!     record! { "firstName" => "Zdzicho", "age" => 30 },
//!     record! { "age" => 25 },
//!     reducer.clone(),
//!     None,
//! );
//!
//! // "age" is controlled by the caller, so it is never stored internally
//! assert_eq!(*union.state(), record! { "firstName" => "Zdzicho" });
//!
//! union.dispatcher().dispatch(&[Action::Rename("Heniu")]).unwrap();
//!
//! let (state, _dispatch) = union.evaluate(record! { "age" => 25 }, reducer, None);
//! assert_eq!(state.get("firstName"), Some(&Value::from("Heniu")));
//! ```

use crate::dispatcher::{Dispatcher, DirtyFlag, StateSlot};
use crate::error::BuildError;
use crate::partition::{external_keys, partition};
use crate::pipeline::{combine, Reducer};
use crate::propagate::ChangeCallback;
use crate::record::Record;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Merges component-owned and caller-controlled state behind one dispatcher
pub struct UnionState<A> {
    slot: StateSlot,
    dispatcher: Dispatcher<A>,
}

impl<A> UnionState<A> {
    /// Create a controller
    ///
    /// Keys present in `external` are stripped from `initial` before it is
    /// stored.
    pub fn new(
        initial: Record,
        external: Record,
        reducer: Reducer<A>,
        on_change: Option<ChangeCallback>,
    ) -> Self {
        let internal = partition(&initial, &external_keys(&external));
        let slot = StateSlot::new(internal);
        let dispatcher = Dispatcher::new(slot.clone(), external, reducer, on_change);

        Self { slot, dispatcher }
    }

    /// Create a builder for a controller
    pub fn builder(initial: Record) -> UnionStateBuilder<A> {
        UnionStateBuilder::new(initial)
    }

    /// Evaluate the controller against the caller's current inputs
    ///
    /// Returns the internal state snapshot and the dispatcher. Internal
    /// fields whose keys the caller now supplies are dropped from the stored
    /// state first. The previous dispatcher is returned as-is unless the
    /// reducer, the callback or any external field changed.
    pub fn evaluate(
        &mut self,
        external: Record,
        reducer: Reducer<A>,
        on_change: Option<ChangeCallback>,
    ) -> (Arc<Record>, Dispatcher<A>) {
        let keys = external_keys(&external);
        let stored = self.slot.snapshot();
        if keys.iter().any(|key| stored.contains_key(key)) {
            tracing::debug!(
                external_fields = keys.len(),
                "stripping internal fields now controlled externally"
            );
            self.slot.replace(Arc::new(partition(&stored, &keys)));
        }

        if !self
            .dispatcher
            .is_current_for(&external, &reducer, on_change.as_ref())
        {
            tracing::debug!(external_fields = external.len(), "rebuilding dispatcher");
            self.dispatcher = Dispatcher::new(self.slot.clone(), external, reducer, on_change);
        }

        (self.state(), self.dispatcher.clone())
    }

    /// Get the current internal state snapshot
    pub fn state(&self) -> Arc<Record> {
        self.slot.snapshot()
    }

    /// Get the combined view: internal state overridden by defined external
    /// fields of the last evaluation
    pub fn combined(&self) -> Record {
        combine(&self.state(), self.dispatcher.external())
    }

    /// Get the dispatcher from the last evaluation
    pub fn dispatcher(&self) -> Dispatcher<A> {
        self.dispatcher.clone()
    }

    /// Get the dirty flag raised by commits, for hosts that poll it
    pub fn dirty_flag(&self) -> &DirtyFlag {
        self.slot.dirty_flag()
    }

    /// Check if a dispatch committed new internal state since the last
    /// [`UnionState::take_dirty`]
    pub fn needs_rebuild(&self) -> bool {
        self.slot.dirty_flag().load(Ordering::SeqCst)
    }

    /// Clear the dirty flag, returning whether it was set
    pub fn take_dirty(&self) -> bool {
        self.slot.dirty_flag().swap(false, Ordering::SeqCst)
    }
}

/// Builder for creating union state controllers
pub struct UnionStateBuilder<A> {
    initial: Record,
    external: Record,
    reducer: Option<Reducer<A>>,
    on_change: Option<ChangeCallback>,
}

impl<A> UnionStateBuilder<A> {
    pub fn new(initial: Record) -> Self {
        Self {
            initial,
            external: Record::new(),
            reducer: None,
            on_change: None,
        }
    }

    /// Set the caller-controlled state
    pub fn external(mut self, external: Record) -> Self {
        self.external = external;
        self
    }

    /// Set the reducer
    pub fn reducer(mut self, reducer: Reducer<A>) -> Self {
        self.reducer = Some(reducer);
        self
    }

    /// Set the change callback
    pub fn on_change(mut self, on_change: ChangeCallback) -> Self {
        self.on_change = Some(on_change);
        self
    }

    /// Build the controller
    pub fn build(self) -> Result<UnionState<A>, BuildError> {
        let reducer = self.reducer.ok_or(BuildError::MissingReducer)?;
        Ok(UnionState::new(
            self.initial,
            self.external,
            reducer,
            self.on_change,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record;
    use crate::value::Value;

    fn set_reducer() -> Reducer<(&'static str, i64)> {
        Reducer::new(|state: Record, (key, value): &(&'static str, i64)| state.with(*key, *value))
    }

    #[test]
    fn test_builder_requires_reducer() {
        let result = UnionState::<()>::builder(record! {}).build();
        assert!(matches!(result, Err(BuildError::MissingReducer)));
    }

    #[test]
    fn test_builder_strips_external_keys() {
        let union = UnionState::builder(record! { "a" => 1, "b" => 2 })
            .external(record! { "b" => 20 })
            .reducer(set_reducer())
            .build()
            .unwrap();

        assert_eq!(*union.state(), record! { "a" => 1 });
        assert_eq!(union.combined(), record! { "a" => 1, "b" => 20 });
    }

    #[test]
    fn test_external_write_is_not_stored() {
        let union = UnionState::new(
            record! { "a" => 1 },
            record! { "b" => 20 },
            set_reducer(),
            None,
        );

        union.dispatcher().dispatch(&[("b", 30), ("a", 2)]).unwrap();

        assert_eq!(*union.state(), record! { "a" => 2 });
        assert!(!union.state().contains_key("b"));
    }

    #[test]
    fn test_evaluate_reuses_dispatcher() {
        let reducer = set_reducer();
        let mut union = UnionState::new(
            record! { "a" => 1 },
            record! { "b" => 2 },
            reducer.clone(),
            None,
        );

        let (_, first) = union.evaluate(record! { "b" => 2 }, reducer.clone(), None);
        let (_, second) = union.evaluate(record! { "b" => 2 }, reducer.clone(), None);
        let (_, third) = union.evaluate(record! { "b" => 3 }, reducer, None);

        assert!(Dispatcher::ptr_eq(&first, &second));
        assert!(!Dispatcher::ptr_eq(&second, &third));
    }

    #[test]
    fn test_evaluate_rebuilds_on_new_reducer() {
        let mut union = UnionState::new(record! {}, record! {}, set_reducer(), None);

        let (_, first) = union.evaluate(record! {}, set_reducer(), None);
        let (_, second) = union.evaluate(record! {}, set_reducer(), None);

        assert!(!Dispatcher::ptr_eq(&first, &second));
    }

    #[test]
    fn test_dirty_flag() {
        let union = UnionState::new(record! { "a" => 1 }, record! {}, set_reducer(), None);
        assert!(!union.needs_rebuild());

        union.dispatcher().dispatch_one(("a", 1)).unwrap();
        assert!(!union.needs_rebuild());

        union.dispatcher().dispatch_one(("a", 5)).unwrap();
        assert!(union.needs_rebuild());
        assert!(union.take_dirty());
        assert!(!union.needs_rebuild());
    }

    #[test]
    fn test_combined_uses_latest_external() {
        let reducer = set_reducer();
        let mut union = UnionState::new(
            record! { "a" => 1 },
            record! { "b" => 2 },
            reducer.clone(),
            None,
        );

        union.evaluate(record! { "b" => Value::Absent }, reducer, None);
        assert_eq!(union.combined(), record! { "a" => 1 });
    }
}
