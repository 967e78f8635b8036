//! Blinc Union State
//!
//! Components often own part of their state and let the caller control the
//! rest. This crate merges the two into one logical state behind a single
//! reducer-driven dispatcher:
//!
//! - **Internal state**: fields the component stores itself
//! - **External state**: fields supplied by the caller on every evaluation,
//!   always taking precedence over internal fields of the same name
//! - **Combined state**: internal state overridden by the defined external
//!   fields, which is what the reducer sees
//!
//! Dispatching a batch folds every action through the reducer, persists the
//! internal subset of the result, and reports the full change set to an
//! optional callback once per batch.
//!
//! # Example
//!
//! ```rust
//! use blinc_union_state::{record, ChangeCallback, Record, Reducer, UnionState};
//! use std::sync::{Arc, Mutex};
//!
//! let reducer = Reducer::new(|state: Record, name: &&'static str| {
//!     state.with("firstName", *name)
//! });
//!
//! let changes = Arc::new(Mutex::new(Vec::new()));
//! let changes_clone = changes.clone();
//! let on_change = ChangeCallback::new(move |set: &Record| {
//!     changes_clone.lock().unwrap().push(set.clone());
//! });
//!
//! let union = UnionState::builder(record! { "firstName" => "Zdzicho" })
//!     .external(record! { "age" => 25 })
//!     .reducer(reducer)
//!     .on_change(on_change)
//!     .build()
//!     .unwrap();
//!
//! union.dispatcher().dispatch(&["Heniu"]).unwrap();
//!
//! assert_eq!(*union.state(), record! { "firstName" => "Heniu" });
//! assert_eq!(*changes.lock().unwrap(), vec![record! { "firstName" => "Heniu" }]);
//! ```

pub mod controller;
pub mod diff;
pub mod dispatcher;
pub mod error;
pub mod partition;
pub mod pipeline;
pub mod propagate;
pub mod record;
pub mod value;

pub use controller::{UnionState, UnionStateBuilder};
pub use diff::{are_shallow_equal, omit_keys, overridden_props, override_defined_props_only};
pub use dispatcher::{DirtyFlag, Dispatcher};
pub use error::{BuildError, DispatchError, ReduceError};
pub use partition::{external_keys, partition, KeySet};
pub use pipeline::{apply_batch, combine, BatchOutcome, Reducer};
pub use propagate::{propagate, ChangeCallback, Propagation};
pub use record::Record;
pub use value::Value;
