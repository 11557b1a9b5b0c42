
use clap::Parser;

use tabled::{Table, Tabled};

use chessnet::config::Config;
use chessnet::data::ShardSource;
use chessnet::neural::Network;
use chessnet::training::{self, FreezePolicy, Trainer};

use utils::*;

///
/// A structure representing command line arguments.
///
#[derive(Parser)]
struct CLIArgs
{
    #[clap(short, long, default_value = "finetune")]
    mode: String,

    #[clap(short, long, default_value = "config/config.toml")]
    config: String,

    /// Checkpoint to score in evaluate mode; defaults to the pretrained one.
    #[clap(long)]
    checkpoint: Option<String>
}

#[derive(Tabled)]
struct GroupRow
{
    group: String,
    parameters: usize,
    trainable: usize
}

fn main () -> Result<()>
{
    let args = CLIArgs::parse();
    let config = Config::from_file(& args.config)?;

    let _logger = log::initialize(& config.log_path, "chessnet")?;

    if let Some(seed) = config.training.seed
    {
        tch::manual_seed(seed);
    }

    match args.mode.as_str()
    {
        "finetune" => finetune(& config),
        "summary"  => summary(& config),
        "evaluate" => evaluate(& config, args.checkpoint.as_deref()),
        _ =>
        {
            Err(error::error!("Mode '{}' is unsupported.", & args.mode))
        }
    }
}

///
/// Discovers the shards, logging how many positions they are likely to hold.
///
fn discover (config: & Config) -> Result<(ShardSource, Vec<u32>)>
{
    let source = ShardSource::new(& config.data)?;
    let ids = source.discover()?;
    log::info!("Found {} shards in '{}': {:?}", ids.len(), source.dir().display(), ids);

    let first = source.sample_count(ids[0])?;
    log::info!("Estimated total positions: ~{}", first * ids.len());

    Ok((source, ids))
}

///
/// Loads the pretrained weights and, when resuming, the checkpoint to resume from.
///
fn pretrained (config: & Config) -> Result<Network>
{
    let mut network = Network::from_checkpoint(& config.neural, & config.training.pretrained)?;
    log::info!("Loaded pretrained checkpoint '{}'.", config.training.pretrained);

    if let Some(resume) = & config.training.resume
    {
        network.load(resume)?;
        log::info!("Resuming from '{}' at epoch {}.", resume, config.training.first_epoch);
    }

    network.describe();
    Ok(network)
}

fn finetune (config: & Config) -> Result<()>
{
    let (source, ids) = discover(config)?;
    let network = pretrained(config)?;

    let mut trainer = Trainer::new(network, & config.training)?;
    let history = trainer.run(& source, & ids)?;

    println!("{}", history.table());
    Ok(())
}

fn summary (config: & Config) -> Result<()>
{
    let mut network = pretrained(config)?;
    FreezePolicy::new(config.training.frozen_blocks).apply(& mut network)?;

    let rows = network.summary().into_iter().map(|g| GroupRow { group: g.group, parameters: g.parameters, trainable: g.trainable });
    println!("{}", Table::new(rows));
    Ok(())
}

fn evaluate (config: & Config, checkpoint: Option<& str>) -> Result<()>
{
    let (source, ids) = discover(config)?;

    let path = checkpoint.unwrap_or(& config.training.pretrained);
    let network = Network::from_checkpoint(& config.neural, path)?;

    let t = & config.training;
    let result = training::evaluate(& network, & source, & ids, t.batch_size, t.value_clip, t.value_loss_weight)?;

    log::info!(
        "Evaluated '{}' on {} samples: total={:.4}, policy={:.4}, value={:.4}, top-1={:.2}%",
        path, result.samples, result.loss.total, result.loss.policy, result.loss.value, result.top1 * 100.0
    );
    Ok(())
}
