pub mod error;
pub mod feed;
pub mod pipeline;
pub mod snapshot_cache;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use error::IngestError;
pub use pipeline::{FailureReason, IngestPhase, IngestionReport, Ingestor};
pub use snapshot_cache::{CachedSnapshot, SnapshotCache};
pub use store::{build_store, MemoryDisasterStore};
pub use traits::DisasterStore;
