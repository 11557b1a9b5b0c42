
use std::path::PathBuf;

use utils::{Serialize, Deserialize};
use utils::error::*;

use crate::error::FinetuneError;
use crate::neural::config::Config as NeuralConfig;

///
/// A configuration for a fine-tuning run.
///
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config
{
    #[serde(default = "pretrained")]
    pub pretrained: String,

    #[serde(default)]
    pub resume: Option<String>,

    #[serde(default = "first_epoch")]
    pub first_epoch: usize,

    #[serde(default = "output_dir")]
    pub output_dir: String,

    #[serde(default = "checkpoint_prefix")]
    pub checkpoint_prefix: String,

    #[serde(default = "checkpoint_ext")]
    pub checkpoint_ext: String,

    #[serde(default = "frozen_blocks")]
    pub frozen_blocks: usize,

    #[serde(default = "epochs")]
    pub epochs: usize,

    #[serde(default = "batch_size")]
    pub batch_size: usize,

    #[serde(default = "learning_rate")]
    pub learning_rate: f64,

    #[serde(default = "weight_decay")]
    pub weight_decay: f64,

    #[serde(default = "value_loss_weight")]
    pub value_loss_weight: f64,

    #[serde(default = "value_clip")]
    pub value_clip: f64,

    #[serde(default = "prefetch")]
    pub prefetch: usize,

    #[serde(default)]
    pub seed: Option<i64>
}

impl Default for Config
{
    fn default () -> Config
    {
        Config
        {
            pretrained: pretrained(),
            resume: None,
            first_epoch: first_epoch(),
            output_dir: output_dir(),
            checkpoint_prefix: checkpoint_prefix(),
            checkpoint_ext: checkpoint_ext(),
            frozen_blocks: frozen_blocks(),
            epochs: epochs(),
            batch_size: batch_size(),
            learning_rate: learning_rate(),
            weight_decay: weight_decay(),
            value_loss_weight: value_loss_weight(),
            value_clip: value_clip(),
            prefetch: prefetch(),
            seed: None
        }
    }
}

impl Config
{
    ///
    /// Path of the checkpoint written after the given (1-based) epoch.
    ///
    pub fn epoch_checkpoint (& self, epoch: usize) -> PathBuf
    {
        PathBuf::from(& self.output_dir).join(format!("{}_epoch{}.{}", self.checkpoint_prefix, epoch, self.checkpoint_ext))
    }

    ///
    /// Path of the checkpoint written once every epoch has finished.
    ///
    pub fn final_checkpoint (& self) -> PathBuf
    {
        PathBuf::from(& self.output_dir).join(format!("{}_final.{}", self.checkpoint_prefix, self.checkpoint_ext))
    }

    ///
    /// Path of the run history record.
    ///
    pub fn history_path (& self) -> PathBuf
    {
        PathBuf::from(& self.output_dir).join("history.json")
    }

    ///
    /// Checks the run against the architecture it will train.
    ///
    pub fn validate (& self, neural: & NeuralConfig) -> Result<()>
    {
        if self.frozen_blocks > neural.blocks
        {
            return Err(FinetuneError::TooManyFrozen { requested: self.frozen_blocks, available: neural.blocks }.into());
        }

        if self.batch_size == 0 || self.first_epoch == 0
        {
            return Err(FinetuneError::InvalidConfig("batch_size and first_epoch must be at least 1.".to_owned()).into());
        }

        if ! (self.value_clip > 0.0) || ! (self.learning_rate > 0.0) || self.weight_decay < 0.0 || self.value_loss_weight < 0.0
        {
            return Err(FinetuneError::InvalidConfig(format!(
                "value_clip={} and learning_rate={} must be positive, weight_decay={} and value_loss_weight={} non-negative.",
                self.value_clip, self.learning_rate, self.weight_decay, self.value_loss_weight
            )).into());
        }

        match self.checkpoint_ext.as_str()
        {
            "safetensors" | "ot" => Ok(()),
            other => Err(FinetuneError::InvalidConfig(format!("checkpoint_ext '{}' must be 'safetensors' or 'ot'.", other)).into())
        }
    }
}

fn pretrained () -> String
{
    "chessnet_mvp_18planes_final.safetensors".to_owned()
}

fn first_epoch () -> usize
{
    1
}

fn output_dir () -> String
{
    "checkpoints".to_owned()
}

fn checkpoint_prefix () -> String
{
    "chessnet_mvp_18planes_tactics".to_owned()
}

fn checkpoint_ext () -> String
{
    "safetensors".to_owned()
}

fn frozen_blocks () -> usize
{
    6
}

fn epochs () -> usize
{
    2
}

fn batch_size () -> usize
{
    256
}

fn learning_rate () -> f64
{
    1e-4
}

fn weight_decay () -> f64
{
    1e-4
}

fn value_loss_weight () -> f64
{
    1.0
}

fn value_clip () -> f64
{
    1.0
}

fn prefetch () -> usize
{
    2
}
