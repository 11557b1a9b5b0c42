
use tch::{nn, Tensor};

use super::component::*;

///
/// Squeeze-and-excitation gate: a per-channel rescaling in (0, 1) computed
/// from the globally pooled feature map.
///
#[derive(Debug)]
pub struct ChannelAttention
{
    name: String,
    squeeze: nn::Linear,
    excite: nn::Linear
}

impl ChannelAttention
{
    pub fn new (p: & nn::Path, name: & str, channels: i64, reduction: i64) -> ChannelAttention
    {
        let hidden = (channels / reduction).max(8);
        let fc = p / "fc";

        ChannelAttention
        {
            name: format!("{}.fc", name),
            squeeze: nn::linear(& fc / 0, channels, hidden, Default::default()),
            excite: nn::linear(& fc / 2, hidden, channels, Default::default())
        }
    }

    pub fn forward (& self, xs: & Tensor) -> Tensor
    {
        let gate = xs.adaptive_avg_pool2d([1, 1])
            .flatten(1, -1)
            .apply(& self.squeeze)
            .gelu("none")
            .apply(& self.excite)
            .sigmoid()
            .unsqueeze(-1)
            .unsqueeze(-1);

        xs * gate
    }

    fn parameters (& self, trainable: bool) -> Vec<Parameter>
    {
        let mut result = linear_parameters(& format!("{}.0", self.name), & self.squeeze, trainable);
        result.extend(linear_parameters(& format!("{}.2", self.name), & self.excite, trainable));
        result
    }
}

///
/// Stochastic depth. While training, each sample's residual branch is zeroed
/// with probability `p` and otherwise scaled by 1 / (1 - p); inference passes
/// the branch through untouched.
///
#[derive(Clone, Copy, Debug)]
pub struct DropPath
{
    p: f64
}

impl DropPath
{
    pub fn new (p: f64) -> DropPath
    {
        DropPath { p }
    }

    pub fn probability (& self) -> f64
    {
        self.p
    }

    pub fn forward (& self, xs: & Tensor, mode: Mode) -> Tensor
    {
        if ! mode.is_train() || self.p == 0.0
        {
            return xs.shallow_clone();
        }

        let keep = 1.0 - self.p;
        let batch = xs.size()[0];

        let mask = Tensor::rand([batch, 1, 1, 1], (xs.kind(), xs.device()))
            .lt(keep)
            .to_kind(xs.kind()) / keep;

        xs * mask
    }
}

///
/// The drop probability of block `index` in a tower of `blocks`, interpolated
/// linearly from 0 at the first block to `max` at the last.
///
pub fn drop_probability (index: usize, blocks: usize, max: f64) -> f64
{
    match blocks
    {
        0 | 1 => 0.0,
        _     => max * index as f64 / (blocks - 1) as f64
    }
}

///
/// One unit of the tower: two 3x3 convolutions with batch normalization, a
/// channel attention gate and stochastic depth on the residual branch.
///
#[derive(Debug)]
pub struct ResidualBlock
{
    name: String,
    conv1: nn::Conv2D,
    bn1: nn::BatchNorm,
    conv2: nn::Conv2D,
    bn2: nn::BatchNorm,
    attention: ChannelAttention,
    drop: DropPath,
    trainable: bool
}

impl ResidualBlock
{
    ///
    /// Creates a block under `p`, whose checkpoint prefix is `name`.
    ///
    pub fn new (p: & nn::Path, name: & str, channels: i64, reduction: i64, drop_path: f64) -> ResidualBlock
    {
        let conv = nn::ConvConfig { padding: 1, bias: false, ..Default::default() };

        ResidualBlock
        {
            name: name.to_owned(),
            conv1: nn::conv2d(p / "conv1", channels, channels, 3, conv),
            bn1: nn::batch_norm2d(p / "bn1", channels, Default::default()),
            conv2: nn::conv2d(p / "conv2", channels, channels, 3, conv),
            bn2: nn::batch_norm2d(p / "bn2", channels, Default::default()),
            attention: ChannelAttention::new(& (p / "se"), & format!("{}.se", name), channels, reduction),
            drop: DropPath::new(drop_path),
            trainable: true
        }
    }

    pub fn drop_path (& self) -> & DropPath
    {
        & self.drop
    }

    pub fn name (& self) -> & str
    {
        & self.name
    }

    ///
    /// The residual branch before stochastic depth is applied.
    ///
    pub fn branch (& self, xs: & Tensor, mode: Mode) -> Tensor
    {
        let stats = mode.updates_statistics(self.trainable);

        let h = xs.apply(& self.conv1).apply_t(& self.bn1, stats).gelu("none");
        let h = h.apply(& self.conv2).apply_t(& self.bn2, stats);
        self.attention.forward(& h)
    }
}

impl Component for ResidualBlock
{
    fn forward (& self, xs: & Tensor, mode: Mode) -> Tensor
    {
        let h = self.drop.forward(& self.branch(xs, mode), mode);
        (xs + h).gelu("none")
    }

    fn parameters (& self) -> Vec<Parameter>
    {
        let t = self.trainable;
        let mut result = conv_parameters(& format!("{}.conv1", self.name), & self.conv1, t);
        result.extend(norm_parameters(& format!("{}.bn1", self.name), & self.bn1, t));
        result.extend(conv_parameters(& format!("{}.conv2", self.name), & self.conv2, t));
        result.extend(norm_parameters(& format!("{}.bn2", self.name), & self.bn2, t));
        result.extend(self.attention.parameters(t));
        result
    }

    fn buffers (& self) -> Vec<Parameter>
    {
        let mut result = norm_buffers(& format!("{}.bn1", self.name), & self.bn1);
        result.extend(norm_buffers(& format!("{}.bn2", self.name), & self.bn2));
        result
    }

    fn set_trainable (& mut self, trainable: bool)
    {
        self.trainable = trainable;
        mark_trainable(& self.parameters(), trainable);
    }

    fn is_trainable (& self) -> bool
    {
        self.trainable
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use tch::{Device, Kind};

    #[test]
    fn drop_probabilities_interpolate ()
    {
        assert_eq!(drop_probability(0, 12, 0.1), 0.0);
        assert!((drop_probability(11, 12, 0.1) - 0.1).abs() < 1e-12);
        assert!((drop_probability(6, 13, 0.2) - 0.1).abs() < 1e-12);
        assert_eq!(drop_probability(0, 1, 0.1), 0.0);
    }

    #[test]
    fn drop_path_is_identity_when_inferring ()
    {
        let xs = Tensor::randn([16, 4, 8, 8], (Kind::Float, Device::Cpu));
        let drop = DropPath::new(0.9);

        for _ in 0 .. 10
        {
            assert!(drop.forward(& xs, Mode::Infer).equal(& xs));
        }
    }

    #[test]
    fn drop_path_zeroes_or_rescales_whole_samples ()
    {
        tch::manual_seed(7);
        let xs = Tensor::ones([64, 2, 8, 8], (Kind::Float, Device::Cpu));
        let ys = DropPath::new(0.5).forward(& xs, Mode::Train);

        let mut dropped = 0;
        for i in 0 .. 64
        {
            let sample = ys.get(i);
            let first = sample.double_value(& [0, 0, 0]);
            assert!(first == 0.0 || (first - 2.0).abs() < 1e-6);
            assert!((sample - first).abs().max().double_value(& []) < 1e-6);
            if first == 0.0
            {
                dropped += 1;
            }
        }
        assert!(dropped > 0 && dropped < 64);
    }

    #[test]
    fn block_is_deterministic_when_inferring ()
    {
        let vs = nn::VarStore::new(Device::Cpu);
        let block = ResidualBlock::new(& (vs.root() / "tower" / 0), "tower.0", 8, 16, 0.9);
        let xs = Tensor::randn([4, 8, 8, 8], (Kind::Float, Device::Cpu));

        let first = block.forward(& xs, Mode::Infer);
        let second = block.forward(& xs, Mode::Infer);
        let expected = (& xs + block.branch(& xs, Mode::Infer)).gelu("none");

        assert!(first.equal(& second));
        assert!(first.equal(& expected));
        assert_eq!(first.size(), vec![4, 8, 8, 8]);
    }

    #[test]
    fn parameters_follow_checkpoint_names ()
    {
        let vs = nn::VarStore::new(Device::Cpu);
        let block = ResidualBlock::new(& (vs.root() / "tower" / 3), "tower.3", 8, 16, 0.0);

        let names : Vec<String> = block.parameters().into_iter().map(|p| p.name).collect();
        let stored = vs.variables();

        assert!(names.contains(& "tower.3.se.fc.0.weight".to_owned()));
        assert!(names.contains(& "tower.3.bn2.bias".to_owned()));
        assert!(! names.iter().any(|n| n.starts_with("tower.3.conv1.bias")));
        for name in names.iter().chain(block.buffers().iter().map(|b| & b.name))
        {
            assert!(stored.contains_key(name), "{} is not in the var store", name);
        }
    }

    #[test]
    fn freezing_clears_gradients ()
    {
        let vs = nn::VarStore::new(Device::Cpu);
        let mut block = ResidualBlock::new(& (vs.root() / "tower" / 0), "tower.0", 8, 16, 0.0);

        block.set_trainable(false);
        assert!(! block.is_trainable());
        assert!(block.parameters().iter().all(|p| ! p.tensor.requires_grad() && ! p.trainable));

        block.set_trainable(true);
        assert!(block.parameters().iter().all(|p| p.tensor.requires_grad() && p.trainable));
    }
}
