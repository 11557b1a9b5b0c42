pub mod batch;
pub mod config;
pub mod dataset;
pub mod shard;

pub use batch::{Batch, Batches, Prefetcher};
pub use dataset::{Dataset, Sample};
pub use shard::{ShardPaths, ShardSource};
