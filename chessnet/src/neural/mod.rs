pub mod block;
pub mod checkpoint;
pub mod component;
pub mod config;
pub mod coords;
pub mod heads;
pub mod network;
pub mod tower;

pub use component::{Component, Mode, Parameter};
pub use heads::POLICY_SIZE;
pub use network::{GroupSummary, Network};
