pub mod catalog;
pub mod config;
pub mod counted_volume;
pub mod error;
pub mod geometry;
pub mod math;
pub mod molecule;
pub mod operations;
pub mod partition;
pub mod scheduler;

pub use error::{PartitionError, Result};
pub use partition::Partition;
