//! Action reducer pipeline
//!
//! A batch of actions is folded left-to-right through the caller's reducer,
//! starting from the combined view of internal and external state. Each
//! reducer call sees the result of every earlier action in the same batch.
//! Nothing is committed here; the caller decides what to do with the
//! before/after pair.

use crate::diff::override_defined_props_only;
use crate::error::{DispatchError, ReduceError, Result};
use crate::record::Record;
use std::fmt;
use std::sync::Arc;

type ReduceFn<A> = dyn Fn(Record, &A) -> std::result::Result<Record, ReduceError> + Send + Sync;

/// Shared handle to a pure reducer
///
/// Cloning shares the underlying function. Two handles are the *same*
/// reducer only if they were cloned from one another, which is what the
/// dispatcher cache keys on.
pub struct Reducer<A> {
    f: Arc<ReduceFn<A>>,
}

impl<A> Reducer<A> {
    /// Wrap an infallible reducer
    pub fn new<F>(f: F) -> Self
    where
        A: 'static,
        F: Fn(Record, &A) -> Record + Send + Sync + 'static,
    {
        Self {
            f: Arc::new(move |state: Record, action: &A| Ok(f(state, action))),
        }
    }

    /// Wrap a reducer that may reject an action
    pub fn fallible<F>(f: F) -> Self
    where
        F: Fn(Record, &A) -> std::result::Result<Record, ReduceError> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }

    /// Apply one action
    pub fn reduce(&self, state: Record, action: &A) -> std::result::Result<Record, ReduceError> {
        (self.f)(state, action)
    }

    /// Check if both handles share the same reducer
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::as_ptr(&a.f).cast::<()>() == Arc::as_ptr(&b.f).cast::<()>()
    }
}

impl<A> Clone for Reducer<A> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
        }
    }
}

impl<A> fmt::Debug for Reducer<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reducer")
            .field("ptr", &Arc::as_ptr(&self.f).cast::<()>())
            .finish()
    }
}

/// Combined state before and after a batch
#[derive(Clone, Debug, PartialEq)]
pub struct BatchOutcome {
    pub old_combined: Record,
    pub new_combined: Record,
}

/// Combine `internal` with the defined fields of `external`
pub fn combine(internal: &Record, external: &Record) -> Record {
    override_defined_props_only(internal, external)
}

/// Fold `actions` through `reducer` over the combined state
///
/// The reducer starts from a copy of the combined state, so `old_combined`
/// is exactly what the batch started from. An empty batch returns two equal
/// records. The first reducer error aborts the batch.
pub fn apply_batch<A>(
    internal: &Record,
    external: &Record,
    actions: &[A],
    reducer: &Reducer<A>,
) -> Result<BatchOutcome> {
    let old_combined = combine(internal, external);

    let new_combined = actions
        .iter()
        .enumerate()
        .try_fold(old_combined.clone(), |state, (index, action)| {
            tracing::trace!(index, batch_len = actions.len(), "reducing action");
            reducer
                .reduce(state, action)
                .map_err(|source| DispatchError::Reducer {
                    index,
                    batch_len: actions.len(),
                    source,
                })
        })?;

    Ok(BatchOutcome {
        old_combined,
        new_combined,
    })
}
