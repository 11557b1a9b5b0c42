
use std::path::Path;

use tabled::{Table, Tabled};

use utils::{Serialize, Deserialize};
use utils::error::*;

use super::stats::RunningLoss;

///
/// What one epoch produced.
///
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpochReport
{
    pub epoch: usize,
    pub samples: usize,
    pub total: f64,
    pub policy: f64,
    pub value: f64,
    pub checkpoint: String
}

impl EpochReport
{
    pub fn new (epoch: usize, running: & RunningLoss, checkpoint: & Path) -> EpochReport
    {
        let mean = running.mean();
        EpochReport
        {
            epoch,
            samples: running.samples(),
            total: mean.total,
            policy: mean.policy,
            value: mean.value,
            checkpoint: checkpoint.display().to_string()
        }
    }
}

///
/// The record of a run, rewritten after every epoch.
///
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct History
{
    pub frozen_blocks: usize,
    pub trainable_parameters: usize,
    pub total_parameters: usize,
    pub epochs: Vec<EpochReport>,
    pub final_checkpoint: Option<String>
}

#[derive(Tabled)]
struct EpochRow
{
    epoch: usize,
    samples: usize,
    total: String,
    policy: String,
    value: String
}

impl History
{
    pub fn save (& self, path: & Path) -> Result<()>
    {
        utils::write_json(path, self)
    }

    ///
    /// Renders the per-epoch losses as a table.
    ///
    pub fn table (& self) -> String
    {
        let rows = self.epochs.iter().map(|e| EpochRow
        {
            epoch: e.epoch,
            samples: e.samples,
            total: format!("{:.4}", e.total),
            policy: format!("{:.4}", e.policy),
            value: format!("{:.4}", e.value)
        });

        Table::new(rows).to_string()
    }
}
