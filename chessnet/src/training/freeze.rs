
use utils::error::*;
use utils::log;

use crate::error::FinetuneError;
use crate::neural::{Component, Network};

///
/// Parameter counts after a freeze.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FreezeReport
{
    pub frozen_blocks: usize,
    pub total: usize,
    pub trainable: usize
}

///
/// Freezes the stem and the first `frozen_blocks` tower blocks; the rest of
/// the tower and both heads stay trainable.
///
/// Frozen tensors stop receiving gradients, so the optimizer leaves them as
/// loaded, and frozen normalization layers stop updating their running
/// statistics. No value is changed by applying the policy.
///
#[derive(Clone, Copy, Debug)]
pub struct FreezePolicy
{
    frozen_blocks: usize
}

impl FreezePolicy
{
    pub fn new (frozen_blocks: usize) -> FreezePolicy
    {
        FreezePolicy { frozen_blocks }
    }

    pub fn apply (& self, network: & mut Network) -> Result<FreezeReport>
    {
        let available = network.tower().len();
        if self.frozen_blocks > available
        {
            return Err(FinetuneError::TooManyFrozen { requested: self.frozen_blocks, available }.into());
        }

        network.stem_mut().set_trainable(false);

        for (i, block) in network.tower_mut().blocks_mut().iter_mut().enumerate()
        {
            block.set_trainable(i >= self.frozen_blocks);
        }

        network.policy_head_mut().set_trainable(true);
        network.value_head_mut().set_trainable(true);

        let parameters = network.parameters();
        let report = FreezeReport
        {
            frozen_blocks: self.frozen_blocks,
            total: parameters.iter().map(|p| p.numel()).sum(),
            trainable: parameters.iter().filter(|p| p.trainable).map(|p| p.numel()).sum()
        };

        log::info!("Trainable params after freezing {} of {} blocks: {} / {}.", self.frozen_blocks, available, report.trainable, report.total);
        Ok(report)
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::neural::config::Config;

    fn network (blocks: usize) -> Network
    {
        Network::new(& Config { width: 8, blocks, device: "cpu".to_owned(), ..Config::default() }).unwrap()
    }

    #[test]
    fn partitions_by_block_order ()
    {
        let mut net = network(4);
        let report = FreezePolicy::new(2).apply(& mut net).unwrap();

        assert!(! net.stem().is_trainable());
        let flags : Vec<bool> = net.tower().blocks().iter().map(|b| b.is_trainable()).collect();
        assert_eq!(flags, vec![false, false, true, true]);
        assert!(net.policy_head().is_trainable());
        assert!(net.value_head().is_trainable());

        for parameter in net.parameters()
        {
            let frozen = parameter.name.starts_with("stem.") || parameter.name.starts_with("tower.0.") || parameter.name.starts_with("tower.1.");
            assert_eq!(parameter.trainable, ! frozen, "{}", parameter.name);
            assert_eq!(parameter.tensor.requires_grad(), ! frozen, "{}", parameter.name);
        }

        let summary = net.summary();
        let trainable : usize = summary.iter().map(|g| g.trainable).sum();
        assert_eq!(report.trainable, trainable);
        assert!(report.trainable < report.total);
    }

    #[test]
    fn freezing_changes_no_value ()
    {
        let mut net = network(3);
        let before : Vec<_> = net.parameters().into_iter().map(|p| p.tensor.copy()).collect();

        FreezePolicy::new(3).apply(& mut net).unwrap();

        for (parameter, old) in net.parameters().iter().zip(before.iter())
        {
            assert!(parameter.tensor.equal(old));
        }
    }

    #[test]
    fn zero_frozen_blocks_leaves_only_the_stem_frozen ()
    {
        let mut net = network(2);
        let report = FreezePolicy::new(0).apply(& mut net).unwrap();

        let stem : usize = net.stem().parameters().iter().map(|p| p.numel()).sum();
        assert_eq!(report.total - report.trainable, stem);
    }

    #[test]
    fn more_blocks_than_the_tower_is_an_error ()
    {
        let mut net = network(2);
        let err = FreezePolicy::new(3).apply(& mut net).unwrap_err();
        assert!(matches!(err.downcast_ref::<FinetuneError>(), Some(FinetuneError::TooManyFrozen { requested: 3, available: 2 })));
    }
}
