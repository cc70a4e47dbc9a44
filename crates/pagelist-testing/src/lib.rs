//! Test tooling for pagelist controllers.
//!
//! Nothing here touches a real backend: page sources resolve when the test
//! says so and observers only record what they were told.

mod recorder;
mod source;
mod store;

pub use recorder::{ObservedEvent, RecordingObserver, StateRecorder};
pub use source::ManualPageSource;
pub use store::{records, MemoryObjectStore, TestRecord};
