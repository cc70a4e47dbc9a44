//! Hash collections used for identifier lookups and in-flight bookkeeping.
//!
//! Keys are small identifiers and page numbers, so the Fx hasher is used by
//! default. The `std-hash` feature switches to the standard library hasher.

#[cfg(feature = "std-hash")]
pub mod map {
    pub use std::collections::{HashMap, HashSet};
}

#[cfg(not(feature = "std-hash"))]
pub mod map {
    pub use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
}
