pub mod config;
pub mod evaluate;
pub mod freeze;
pub mod history;
pub mod loss;
pub mod stats;
pub mod trainer;

pub use evaluate::{evaluate, Evaluation};
pub use freeze::{FreezePolicy, FreezeReport};
pub use history::{EpochReport, History};
pub use loss::{clip_values, Losses, StepLoss};
pub use stats::RunningLoss;
pub use trainer::Trainer;
