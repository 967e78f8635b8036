//! State partitioning
//!
//! External state always shadows internal state. Whatever the controller
//! persists is the internal-owned subset of a record: every key the caller
//! supplies externally is stripped, even when its external value is absent.

use crate::diff::omit_keys;
use crate::record::Record;
use smallvec::SmallVec;

/// Key names of an external state record
///
/// Component state is small; most external states fit inline.
pub type KeySet = SmallVec<[String; 8]>;

/// Collect every key of `external`, absent-valued ones included
pub fn external_keys(external: &Record) -> KeySet {
    external.keys().map(str::to_owned).collect()
}

/// The subset of `initial` whose keys are not in `external_keys`
///
/// Always returns a fresh record.
pub fn partition(initial: &Record, external_keys: &[String]) -> Record {
    omit_keys(initial, external_keys.iter().map(String::as_str))
}
