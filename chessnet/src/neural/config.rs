
use tch::Device;

use utils::{Serialize, Deserialize};
use utils::error::*;

use crate::error::FinetuneError;

///
/// The architecture hyperparameters of the predictor. A checkpoint only loads
/// into a network built with the same values.
///
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config
{
    #[serde(default = "in_channels")]
    pub in_channels: i64,

    #[serde(default = "width")]
    pub width: i64,

    #[serde(default = "blocks")]
    pub blocks: usize,

    #[serde(default = "drop_path_max")]
    pub drop_path_max: f64,

    #[serde(default = "se_reduction")]
    pub se_reduction: i64,

    #[serde(default = "device")]
    pub device: String
}

impl Default for Config
{
    fn default () -> Config
    {
        Config
        {
            in_channels: in_channels(),
            width: width(),
            blocks: blocks(),
            drop_path_max: drop_path_max(),
            se_reduction: se_reduction(),
            device: device()
        }
    }
}

impl Config
{
    ///
    /// Resolves the configured device name.
    ///
    pub fn device (& self) -> Result<Device>
    {
        match self.device.as_str()
        {
            "auto" => Ok(Device::cuda_if_available()),
            "cpu"  => Ok(Device::Cpu),
            "cuda" => Ok(Device::Cuda(0)),
            other  => Err(FinetuneError::UnknownDevice(other.to_owned()).into())
        }
    }

    ///
    /// Checks that the hyperparameters describe a buildable network.
    ///
    pub fn validate (& self) -> Result<()>
    {
        if self.in_channels < 1 || self.width < 2 || self.blocks < 1 || self.se_reduction < 1
        {
            return Err(FinetuneError::InvalidConfig(format!(
                "in_channels={}, width={}, blocks={}, se_reduction={} must all be positive (width at least 2).",
                self.in_channels, self.width, self.blocks, self.se_reduction
            )).into());
        }

        if ! (0.0 .. 1.0).contains(& self.drop_path_max)
        {
            return Err(FinetuneError::InvalidConfig(format!("drop_path_max={} must lie in [0, 1).", self.drop_path_max)).into());
        }

        self.device()?;
        Ok(())
    }
}

fn in_channels () -> i64
{
    18
}

fn width () -> i64
{
    192
}

fn blocks () -> usize
{
    12
}

fn drop_path_max () -> f64
{
    0.1
}

fn se_reduction () -> i64
{
    16
}

fn device () -> String
{
    "auto".to_owned()
}
