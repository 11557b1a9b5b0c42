//!
//! Fine-tunes a pretrained dual-head (policy + value) chess network on a
//! sharded dataset: the early layers are frozen, the rest keep training
//! against a combined cross-entropy and mean-squared-error objective.
//!

pub mod config;
pub mod data;
pub mod error;
pub mod neural;
pub mod training;

pub use config::Config;
pub use error::FinetuneError;
