
use tch::nn::{self, OptimizerConfig};

use utils::error::*;
use utils::log;

use super::config::Config;
use super::freeze::{FreezePolicy, FreezeReport};
use super::history::{EpochReport, History};
use super::loss::*;
use super::stats::RunningLoss;
use crate::data::{Batch, Batches, Dataset, ShardSource};
use crate::error::FinetuneError;
use crate::neural::{Mode, Network};

///
/// Drives fine-tuning: epochs over shards, shards over shuffled mini-batches,
/// one optimizer step per batch.
///
/// The freeze policy is applied once, when the trainer is built; the AdamW
/// optimizer only ever sees gradients for the parameters left trainable.
///
pub struct Trainer
{
    config: Config,
    network: Network,
    optimizer: nn::Optimizer,
    freeze: FreezeReport,
    position: (usize, u32)
}

impl std::fmt::Debug for Trainer
{
    fn fmt (& self, f: & mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("Trainer").field("config", & self.config).field("freeze", & self.freeze).finish()
    }
}

impl Trainer
{
    ///
    /// Freezes the network according to `config` and builds the optimizer.
    ///
    pub fn new (mut network: Network, config: & Config) -> Result<Trainer>
    {
        config.validate(network.config())?;

        let freeze = FreezePolicy::new(config.frozen_blocks).apply(& mut network)?;

        let adamw = nn::AdamW { wd: config.weight_decay, ..Default::default() };
        let optimizer = adamw.build(network.var_store(), config.learning_rate)
            .context("Failed to build the optimizer.")?;

        Ok(Trainer { config: config.clone(), network, optimizer, freeze, position: (0, 0) })
    }

    pub fn network (& self) -> & Network
    {
        & self.network
    }

    pub fn into_network (self) -> Network
    {
        self.network
    }

    pub fn freeze_report (& self) -> FreezeReport
    {
        self.freeze
    }

    ///
    /// One optimization step on one batch; returns the batch's mean losses.
    /// A non-finite loss is an error and leaves the parameters untouched.
    ///
    pub fn step (& mut self, batch: & Batch) -> Result<StepLoss>
    {
        let device = self.network.device();
        let clip = self.config.value_clip;

        let moves = batch.moves.to_device(device);
        let targets = clip_values(& batch.values.to_device(device), clip);

        let (logits, predicted) = self.network.forward(& batch.boards, Mode::Train);
        let predicted = clip_values(& predicted.squeeze_dim(-1), clip);

        let losses = Losses::compute(& logits, & moves, & predicted, & targets, self.config.value_loss_weight);
        let values = losses.values();

        if ! values.is_finite()
        {
            let (epoch, shard) = self.position;
            return Err(FinetuneError::NonFiniteLoss { epoch, shard, loss: values.total }.into());
        }

        self.optimizer.zero_grad();
        losses.total.backward();
        self.optimizer.step();

        Ok(values)
    }

    ///
    /// Trains on every batch of one loaded shard.
    ///
    pub fn train_dataset (& mut self, dataset: & Dataset, epoch: usize) -> Result<RunningLoss>
    {
        self.position = (epoch, dataset.ids().first().copied().unwrap_or_default());
        let prefetch = self.config.prefetch;
        let batches = Batches::shuffled(dataset, self.config.batch_size);
        let mut running = RunningLoss::new();

        let mut consume = |batch: Result<Batch>| -> Result<()>
        {
            let batch = batch?;
            let loss = self.step(& batch)?;
            running.add(& loss, batch.len());
            Ok(())
        };

        match prefetch
        {
            0 => batches.into_iter().try_for_each(& mut consume)?,
            depth => batches.prefetch(depth).context("Failed to start the batch prefetcher.")?.try_for_each(& mut consume)?
        }

        Ok(running)
    }

    ///
    /// Runs every configured epoch over the given shards, writing a checkpoint
    /// after each epoch and a final one at the end. Returns the run history.
    ///
    pub fn run (& mut self, source: & ShardSource, ids: & [u32]) -> Result<History>
    {
        let mut history = History
        {
            frozen_blocks: self.freeze.frozen_blocks,
            trainable_parameters: self.freeze.trainable,
            total_parameters: self.freeze.total,
            epochs: Vec::new(),
            final_checkpoint: None
        };

        let in_channels = self.network.config().in_channels;
        let first = self.config.first_epoch;
        let last = first + self.config.epochs;

        for epoch in first .. last
        {
            log::info!("===== Epoch {}/{} =====", epoch, last - 1);
            let mut epoch_loss = RunningLoss::new();

            for & id in ids
            {
                // Only this shard's arrays are resident; they are released
                // at the end of the block, before the next shard loads.
                let shard_loss =
                {
                    let dataset = Dataset::load(source, & [id], in_channels)?;
                    self.train_dataset(& dataset, epoch)?
                };

                let mean = shard_loss.mean();
                log::info!(
                    "Shard {:04}: {} samples, avg total={:.4}, policy={:.4}, value={:.4}",
                    id, shard_loss.samples(), mean.total, mean.policy, mean.value
                );
                epoch_loss.merge(& shard_loss);
            }

            let mean = epoch_loss.mean();
            log::info!("Epoch {}: total={:.4}, policy={:.4}, value={:.4}", epoch, mean.total, mean.policy, mean.value);

            let path = self.config.epoch_checkpoint(epoch);
            self.network.save(& path)?;

            history.epochs.push(EpochReport::new(epoch, & epoch_loss, & path));
            history.save(& self.config.history_path())?;
        }

        let path = self.config.final_checkpoint();
        self.network.save(& path)?;
        log::info!("Saved final fine-tuned model weights to '{}'.", path.display());

        history.final_checkpoint = Some(path.display().to_string());
        history.save(& self.config.history_path())?;

        Ok(history)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::data::dataset::tests::{misaligned, source, write_shard};
    use crate::neural::config::Config as NeuralConfig;
    use crate::neural::Parameter;

    fn neural (blocks: usize) -> NeuralConfig
    {
        NeuralConfig { width: 8, blocks, device: "cpu".to_owned(), ..NeuralConfig::default() }
    }

    fn snapshot (parameters: Vec<Parameter>) -> Vec<(String, tch::Tensor)>
    {
        parameters.into_iter().map(|p| (p.name, p.tensor.copy())).collect()
    }

    #[test]
    fn one_step_moves_only_trainable_parameters ()
    {
        let dir = tempfile::tempdir().unwrap();
        write_shard(dir.path(), 0, 8, 18);
        let dataset = Dataset::load(& source(dir.path()), & [0], 18).unwrap();

        let network = Network::new(& neural(12)).unwrap();
        let config = Config { frozen_blocks: 6, batch_size: 8, learning_rate: 1e-2, ..Config::default() };
        let mut trainer = Trainer::new(network, & config).unwrap();

        let before = snapshot(trainer.network().parameters());
        let buffers = snapshot(trainer.network().buffers());

        let batch = Batches::sequential(& dataset, 8).next().unwrap().unwrap();
        let loss = trainer.step(& batch).unwrap();
        assert!(loss.is_finite());

        let after = trainer.network().parameters();
        let changed = |prefix: & str| before.iter().zip(after.iter())
            .filter(|((name, _), _)| name.starts_with(prefix))
            .any(|((_, old), new)| ! old.equal(& new.tensor));

        let frozen_prefixes : Vec<String> = std::iter::once("stem.".to_owned())
            .chain((0 .. 6).map(|i| format!("tower.{}.", i)))
            .collect();

        for ((name, old), new) in before.iter().zip(after.iter())
        {
            if frozen_prefixes.iter().any(|p| name.starts_with(p.as_str()))
            {
                assert!(old.equal(& new.tensor), "{} moved while frozen", name);
            }
        }

        for ((name, old), new) in buffers.iter().zip(trainer.network().buffers().iter())
        {
            if frozen_prefixes.iter().any(|p| name.starts_with(p.as_str()))
            {
                assert!(old.equal(& new.tensor), "{} statistics moved while frozen", name);
            }
        }

        assert!((6 .. 12).any(|i| changed(& format!("tower.{}.", i))));
        assert!(changed("policy_"));
        assert!(changed("value_head."));
    }

    #[test]
    fn run_writes_epoch_and_final_checkpoints ()
    {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_shard(data.path(), 0, 4, 18);
        write_shard(data.path(), 1, 4, 18);

        let shards = source(data.path());
        let ids = shards.discover().unwrap();

        let config = Config
        {
            output_dir: out.path().to_string_lossy().into_owned(),
            checkpoint_prefix: "tactics".to_owned(),
            frozen_blocks: 1,
            epochs: 2,
            batch_size: 3,
            ..Config::default()
        };

        let mut trainer = Trainer::new(Network::new(& neural(2)).unwrap(), & config).unwrap();
        let history = trainer.run(& shards, & ids).unwrap();

        assert_eq!(history.epochs.len(), 2);
        assert!(history.epochs.iter().all(|e| e.samples == 8));
        assert!(out.path().join("tactics_epoch1.safetensors").is_file());
        assert!(out.path().join("tactics_epoch2.safetensors").is_file());
        assert!(out.path().join("tactics_final.safetensors").is_file());
        assert!(out.path().join("history.json").is_file());

        let reloaded = Network::from_checkpoint(& neural(2), out.path().join("tactics_final.safetensors")).unwrap();
        let boards = tch::Tensor::randn([2, 18, 8, 8], (tch::Kind::Float, tch::Device::Cpu));
        assert!(reloaded.predict(& boards).0.equal(& trainer.network().predict(& boards).0));
    }

    #[test]
    fn resumed_runs_continue_epoch_numbering ()
    {
        let data = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_shard(data.path(), 3, 2, 18);

        let config = Config
        {
            output_dir: out.path().to_string_lossy().into_owned(),
            checkpoint_prefix: "resume".to_owned(),
            first_epoch: 3,
            epochs: 1,
            frozen_blocks: 0,
            prefetch: 0,
            ..Config::default()
        };

        let mut trainer = Trainer::new(Network::new(& neural(1)).unwrap(), & config).unwrap();
        let history = trainer.run(& source(data.path()), & [3]).unwrap();

        assert_eq!(history.epochs[0].epoch, 3);
        assert!(out.path().join("resume_epoch3.safetensors").is_file());
    }

    #[test]
    fn batch_failures_abort_the_shard ()
    {
        let dataset = misaligned(8, 3);

        for prefetch in [0, 2]
        {
            let config = Config { frozen_blocks: 0, batch_size: 4, prefetch, ..Config::default() };
            let mut trainer = Trainer::new(Network::new(& neural(1)).unwrap(), & config).unwrap();

            assert!(trainer.train_dataset(& dataset, 1).is_err(), "prefetch depth {}", prefetch);
        }
    }

    #[test]
    fn non_finite_loss_aborts_before_the_update ()
    {
        let dir = tempfile::tempdir().unwrap();
        write_shard(dir.path(), 9, 4, 18);
        let paths = source(dir.path()).paths(9);
        tch::Tensor::full([4], f64::NAN, (tch::Kind::Float, tch::Device::Cpu)).write_npy(& paths.value).unwrap();
        let dataset = Dataset::load(& source(dir.path()), & [9], 18).unwrap();

        let config = Config { frozen_blocks: 0, prefetch: 0, ..Config::default() };
        let mut trainer = Trainer::new(Network::new(& neural(1)).unwrap(), & config).unwrap();
        let before = snapshot(trainer.network().parameters());

        let err = trainer.train_dataset(& dataset, 4).unwrap_err();
        assert!(matches!(err.downcast_ref::<FinetuneError>(), Some(FinetuneError::NonFiniteLoss { epoch: 4, shard: 9, .. })));

        for ((name, old), new) in before.iter().zip(trainer.network().parameters().iter())
        {
            assert!(old.equal(& new.tensor), "{} moved", name);
        }
    }
}
