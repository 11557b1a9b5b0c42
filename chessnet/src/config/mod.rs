
use std::path::Path;

use utils::{Serialize, Deserialize};
use utils::error::*;

pub use crate::data::config::Config as DataConfig;
pub use crate::neural::config::Config as NeuralConfig;
pub use crate::training::config::Config as TrainingConfig;

///
/// Represents a full configuration.
///
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config 
{
    #[serde(default)]
    pub neural: NeuralConfig,

    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub training: TrainingConfig,

    #[serde(default = "log_path")]
    pub log_path: String
}

impl Default for Config 
{
    fn default () -> Config 
    {
        Config 
        {
            neural: NeuralConfig::default(),
            data: DataConfig::default(),
            training: TrainingConfig::default(),
            log_path: log_path()
        }
    }
}

impl Config 
{
    ///
    /// Reads a configuration from a TOML file; absent keys take their defaults.
    ///
    pub fn from_file (path: impl AsRef<Path>) -> Result<Config>
    {
        let config : Config = utils::read_toml(path)?;
        config.validate()?;
        Ok(config)
    }

    ///
    /// Rejects values that cannot describe a runnable fine-tuning job.
    ///
    pub fn validate (& self) -> Result<()>
    {
        self.neural.validate()?;
        self.training.validate(& self.neural)?;
        Ok(())
    }
}

///
/// Returns the default log path.
///
fn log_path () -> String 
{
    "logs".to_owned()
}

#[cfg(test)]
mod tests 
{
    use super::*;
    use crate::error::FinetuneError;

    #[test]
    fn empty_document_gives_defaults ()
    {
        let config : Config = toml::from_str("").unwrap();

        assert_eq!(config.neural.in_channels, 18);
        assert_eq!(config.neural.width, 192);
        assert_eq!(config.neural.blocks, 12);
        assert_eq!(config.training.frozen_blocks, 6);
        assert_eq!(config.training.batch_size, 256);
        assert_eq!(config.data.board_prefix, "X_boards_batch_");
        assert_eq!(config.log_path, "logs");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn sections_override_selectively ()
    {
        let text = "[neural]\nwidth = 64\nblocks = 4\n\n[training]\nfrozen_blocks = 4\nepochs = 5\n";
        let config : Config = toml::from_str(text).unwrap();

        assert_eq!(config.neural.width, 64);
        assert_eq!(config.neural.in_channels, 18);
        assert_eq!(config.training.epochs, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn freezing_past_the_tower_is_rejected ()
    {
        let text = "[neural]\nblocks = 4\n\n[training]\nfrozen_blocks = 5\n";
        let config : Config = toml::from_str(text).unwrap();

        let err = config.validate().unwrap_err();
        match err.downcast_ref::<FinetuneError>()
        {
            Some(FinetuneError::TooManyFrozen { requested: 5, available: 4 }) => {},
            other => panic!("unexpected error {:?}", other)
        }
    }
}
