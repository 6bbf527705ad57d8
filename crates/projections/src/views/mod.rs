//! The two catalog projections.

pub mod search_index;
pub mod snapshot;

pub use search_index::IndexProjector;
pub use snapshot::SnapshotProjector;
