
use std::path::PathBuf;

use thiserror::Error;

///
/// The failure taxonomy of a fine-tuning run. Every variant is fatal to the
/// operation that raised it; callers receive it boxed in `utils::error::Error`
/// and may `downcast_ref` to inspect it.
///
#[derive(Debug, Error)]
pub enum FinetuneError
{
    // Configuration.

    #[error("Data directory '{0}' does not exist or is not a directory.")]
    MissingDataDir (PathBuf),

    #[error("No shards were discovered in '{0}'.")]
    NoShards (PathBuf),

    #[error("Checkpoint '{0}' does not exist.")]
    MissingCheckpoint (PathBuf),

    #[error("Cannot freeze {requested} blocks of a {available}-block tower.")]
    TooManyFrozen { requested: usize, available: usize },

    #[error("Unknown device '{0}', expected 'cpu', 'cuda' or 'auto'.")]
    UnknownDevice (String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig (String),

    // Checkpoint contents.

    #[error("Checkpoint '{path}' has no tensor named '{name}'.")]
    MissingTensor { path: PathBuf, name: String },

    #[error("Checkpoint tensor '{name}' has shape {found:?}, the model expects {expected:?}.")]
    ShapeMismatch { name: String, expected: Vec<i64>, found: Vec<i64> },

    // Data integrity.

    #[error("Shard {id} is missing its file '{path}'.")]
    MissingShardFile { id: u32, path: PathBuf },

    #[error("Shard {id} is misaligned: {boards} boards, {policies} policy targets, {values} value targets.")]
    MisalignedShard { id: u32, boards: i64, policies: i64, values: i64 },

    #[error("Shard {id} has a malformed {array} array of shape {shape:?}, expected {expected}.")]
    MalformedShard { id: u32, array: &'static str, shape: Vec<i64>, expected: String },

    // Numerics.

    #[error("Non-finite loss {loss} in epoch {epoch}, shard {shard}.")]
    NonFiniteLoss { epoch: usize, shard: u32, loss: f64 }
}
