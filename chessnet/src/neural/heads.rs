
use tch::{nn, Tensor};

use super::component::*;

///
/// The size of the move-index space: one slot per (from, to) square pair.
///
pub const POLICY_SIZE : i64 = 4096;

///
/// The hidden width of the value head's projection.
///
pub const VALUE_HIDDEN : i64 = 128;

///
/// Projects the augmented input planes to the tower width.
///
#[derive(Debug)]
pub struct Stem
{
    conv: nn::Conv2D,
    bn: nn::BatchNorm,
    trainable: bool
}

impl Stem
{
    pub fn new (p: & nn::Path, in_channels: i64, width: i64) -> Stem
    {
        let conv = nn::ConvConfig { padding: 1, bias: false, ..Default::default() };

        Stem
        {
            conv: nn::conv2d(p / 0, in_channels, width, 3, conv),
            bn: nn::batch_norm2d(p / 1, width, Default::default()),
            trainable: true
        }
    }
}

impl Component for Stem
{
    fn forward (& self, xs: & Tensor, mode: Mode) -> Tensor
    {
        xs.apply(& self.conv)
            .apply_t(& self.bn, mode.updates_statistics(self.trainable))
            .gelu("none")
    }

    fn parameters (& self) -> Vec<Parameter>
    {
        let mut result = conv_parameters("stem.0", & self.conv, self.trainable);
        result.extend(norm_parameters("stem.1", & self.bn, self.trainable));
        result
    }

    fn buffers (& self) -> Vec<Parameter>
    {
        norm_buffers("stem.1", & self.bn)
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

///
/// Produces unnormalized move logits of length `POLICY_SIZE`, meant for a
/// cross-entropy loss against a single target index.
///
#[derive(Debug)]
pub struct PolicyHead
{
    conv: nn::Conv2D,
    bn: nn::BatchNorm,
    fc: nn::Linear,
    trainable: bool
}

impl PolicyHead
{
    pub fn new (root: & nn::Path, width: i64) -> PolicyHead
    {
        let conv = nn::ConvConfig { bias: false, ..Default::default() };
        let fc = nn::LinearConfig { bs_init: Some(nn::Init::Const(0.0)), ..Default::default() };

        PolicyHead
        {
            conv: nn::conv2d(root / "policy_conv", width, width, 1, conv),
            bn: nn::batch_norm2d(root / "policy_bn", width, Default::default()),
            fc: nn::linear(root / "policy_head", width * 64, POLICY_SIZE, fc),
            trainable: true
        }
    }
}

impl Component for PolicyHead
{
    fn forward (& self, xs: & Tensor, mode: Mode) -> Tensor
    {
        xs.apply(& self.conv)
            .apply_t(& self.bn, mode.updates_statistics(self.trainable))
            .gelu("none")
            .flatten(1, -1)
            .apply(& self.fc)
    }

    fn parameters (& self) -> Vec<Parameter>
    {
        let mut result = conv_parameters("policy_conv", & self.conv, self.trainable);
        result.extend(norm_parameters("policy_bn", & self.bn, self.trainable));
        result.extend(linear_parameters("policy_head", & self.fc, self.trainable));
        result
    }

    fn buffers (& self) -> Vec<Parameter>
    {
        norm_buffers("policy_bn", & self.bn)
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

///
/// Produces one unbounded scalar per position. Callers clip it.
///
#[derive(Debug)]
pub struct ValueHead
{
    conv: nn::Conv2D,
    hidden: nn::Linear,
    out: nn::Linear,
    trainable: bool
}

impl ValueHead
{
    pub fn new (p: & nn::Path, width: i64) -> ValueHead
    {
        let reduced = width / 2;

        ValueHead
        {
            conv: nn::conv2d(p / 0, width, reduced, 1, Default::default()),
            hidden: nn::linear(p / 4, reduced, VALUE_HIDDEN, Default::default()),
            out: nn::linear(p / 6, VALUE_HIDDEN, 1, Default::default()),
            trainable: true
        }
    }
}

impl Component for ValueHead
{
    fn forward (& self, xs: & Tensor, _mode: Mode) -> Tensor
    {
        xs.apply(& self.conv)
            .gelu("none")
            .adaptive_avg_pool2d([1, 1])
            .flatten(1, -1)
            .apply(& self.hidden)
            .gelu("none")
            .apply(& self.out)
    }

    fn parameters (& self) -> Vec<Parameter>
    {
        let mut result = conv_parameters("value_head.0", & self.conv, self.trainable);
        result.extend(linear_parameters("value_head.4", & self.hidden, self.trainable));
        result.extend(linear_parameters("value_head.6", & self.out, self.trainable));
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
