
use tch::Kind;

use utils::error::*;
use utils::log;

use super::loss::*;
use super::stats::RunningLoss;
use crate::data::{Batches, Dataset, ShardSource};
use crate::neural::Network;

///
/// Losses and policy accuracy of a network over a set of shards.
///
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Evaluation
{
    pub loss: StepLoss,
    pub samples: usize,
    pub top1: f64
}

///
/// Scores the network in inference mode on every shard, one shard resident
/// at a time. Nothing in the network changes.
///
pub fn evaluate (network: & Network, source: & ShardSource, ids: & [u32], batch_size: usize, value_clip: f64, value_weight: f64) -> Result<Evaluation>
{
    let device = network.device();
    let in_channels = network.config().in_channels;

    let mut running = RunningLoss::new();
    let mut correct = 0i64;

    for & id in ids
    {
        let dataset = Dataset::load(source, & [id], in_channels)?;

        for batch in Batches::sequential(& dataset, batch_size)
        {
            let batch = batch?;
            let moves = batch.moves.to_device(device);
            let targets = clip_values(& batch.values.to_device(device), value_clip);

            let (logits, predicted) = network.predict(& batch.boards);
            let predicted = clip_values(& predicted.squeeze_dim(-1), value_clip);

            let losses = Losses::compute(& logits, & moves, & predicted, & targets, value_weight);
            running.add(& losses.values(), batch.len());

            correct += logits.argmax(-1, false).eq_tensor(& moves).sum(Kind::Int64).int64_value(& []);
        }

        log::info!("Evaluated shard {:04}: {} samples.", id, dataset.len());
    }

    let samples = running.samples();
    Ok(Evaluation { loss: running.mean(), samples, top1: correct as f64 / samples.max(1) as f64 })
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::data::dataset::tests::{source, write_shard};
    use crate::neural::config::Config;

    #[test]
    fn evaluation_covers_every_shard_and_changes_nothing ()
    {
        let dir = tempfile::tempdir().unwrap();
        write_shard(dir.path(), 0, 5, 18);
        write_shard(dir.path(), 1, 3, 18);

        let network = Network::new(& Config { width: 8, blocks: 2, device: "cpu".to_owned(), ..Config::default() }).unwrap();
        let before : Vec<_> = network.buffers().into_iter().map(|b| b.tensor.copy()).collect();

        let result = evaluate(& network, & source(dir.path()), & [0, 1], 4, 1.0, 1.0).unwrap();

        assert_eq!(result.samples, 8);
        assert!(result.loss.is_finite() && result.loss.total >= 0.0);
        assert!((0.0 ..= 1.0).contains(& result.top1));
        for (buffer, old) in network.buffers().iter().zip(before.iter())
        {
            assert!(buffer.tensor.equal(old));
        }
    }
}
