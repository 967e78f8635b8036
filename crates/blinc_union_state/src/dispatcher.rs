//! Batch dispatcher
//!
//! A [`Dispatcher`] is the handle a component hands out for mutating its
//! union state. It captures the external state, reducer and change callback
//! of the evaluation that built it, and shares the stored internal state
//! with the owning controller through a shared state slot.
//!
//! Dispatcher identity is meaningful: the controller only builds a new one
//! when the reducer, the callback or an external field changes, so holders
//! can compare handles with [`Dispatcher::ptr_eq`] to detect that.

use crate::diff::are_shallow_equal;
use crate::error::Result;
use crate::partition::{external_keys, KeySet};
use crate::pipeline::{apply_batch, Reducer};
use crate::propagate::{propagate, ChangeCallback};
use crate::record::Record;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// Shared dirty flag, raised whenever a dispatch commits new internal state
pub type DirtyFlag = Arc<AtomicBool>;

/// Storage for the internal state
///
/// Holds an immutable snapshot that is only ever swapped as a whole, so a
/// reader keeping an older `Arc` always sees a consistent record.
#[derive(Clone, Debug)]
pub(crate) struct StateSlot {
    current: Arc<RwLock<Arc<Record>>>,
    dirty_flag: DirtyFlag,
}

impl StateSlot {
    pub fn new(initial: Record) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(initial))),
            dirty_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get the current snapshot
    pub fn snapshot(&self) -> Arc<Record> {
        // Snapshots are never written in place, so a poisoned lock still
        // holds a complete value
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Swap in a new snapshot and raise the dirty flag
    pub fn replace(&self, next: Arc<Record>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = next;
        self.dirty_flag.store(true, Ordering::SeqCst);
    }

    /// Get the dirty flag
    pub fn dirty_flag(&self) -> &DirtyFlag {
        &self.dirty_flag
    }
}

struct DispatcherInner<A> {
    slot: StateSlot,
    external: Record,
    external_keys: KeySet,
    reducer: Reducer<A>,
    on_change: Option<ChangeCallback>,
}

/// Handle for dispatching batches of actions
pub struct Dispatcher<A> {
    inner: Arc<DispatcherInner<A>>,
}

impl<A> Dispatcher<A> {
    pub(crate) fn new(
        slot: StateSlot,
        external: Record,
        reducer: Reducer<A>,
        on_change: Option<ChangeCallback>,
    ) -> Self {
        let external_keys = external_keys(&external);
        Self {
            inner: Arc::new(DispatcherInner {
                slot,
                external,
                external_keys,
                reducer,
                on_change,
            }),
        }
    }

    /// Apply a batch of actions as one atomic reduction
    ///
    /// Reads the stored internal state at call time, folds every action
    /// through the reducer, commits the new internal subset if it differs,
    /// then notifies the change callback exactly once with the change set
    /// (possibly empty). On reducer failure nothing is committed and the
    /// callback is not invoked.
    pub fn dispatch(&self, actions: &[A]) -> Result<()> {
        let inner = &*self.inner;
        let stored = inner.slot.snapshot();

        let outcome = match apply_batch(&stored, &inner.external, actions, &inner.reducer) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(batch_len = actions.len(), "dispatch aborted: {err}");
                return Err(err);
            }
        };

        let propagation = propagate(
            &outcome.old_combined,
            &outcome.new_combined,
            &inner.external_keys,
            &stored,
        );

        if propagation.changed {
            tracing::debug!(
                batch_len = actions.len(),
                fields = propagation.next_internal.len(),
                "committing internal state"
            );
            inner.slot.replace(propagation.next_internal);
        } else {
            tracing::trace!(batch_len = actions.len(), "internal state unchanged");
        }

        if let Some(on_change) = &inner.on_change {
            on_change.notify(&propagation.change_set);
        }

        Ok(())
    }

    /// Dispatch a single action as a batch of one
    pub fn dispatch_one(&self, action: A) -> Result<()> {
        self.dispatch(std::slice::from_ref(&action))
    }

    /// The external state this dispatcher was built with
    pub fn external(&self) -> &Record {
        &self.inner.external
    }

    /// Check if both handles are the same dispatcher
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// Check if this dispatcher was built from the given dependencies
    ///
    /// External state is compared field by field with strict equality.
    pub(crate) fn is_current_for(
        &self,
        external: &Record,
        reducer: &Reducer<A>,
        on_change: Option<&ChangeCallback>,
    ) -> bool {
        let same_callback = match (&self.inner.on_change, on_change) {
            (None, None) => true,
            (Some(a), Some(b)) => ChangeCallback::ptr_eq(a, b),
            _ => false,
        };

        same_callback
            && Reducer::ptr_eq(&self.inner.reducer, reducer)
            && are_shallow_equal(&self.inner.external, external)
    }
}

impl<A> Clone for Dispatcher<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A> fmt::Debug for Dispatcher<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("external", &self.inner.external)
            .field("reducer", &self.inner.reducer)
            .field("on_change", &self.inner.on_change)
            .finish()
    }
}
