
use tch::{nn, Tensor};

///
/// Whether a forward pass trains or infers. Passed explicitly to every
/// forward call so one network can serve both uses.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode
{
    Train,
    Infer
}

impl Mode
{
    pub fn is_train (self) -> bool
    {
        self == Mode::Train
    }

    ///
    /// Whether a normalization layer uses batch statistics and updates its
    /// running averages. Frozen components always use their stored statistics.
    ///
    pub fn updates_statistics (self, trainable: bool) -> bool
    {
        self.is_train() && trainable
    }
}

///
/// A named tensor owned by the network's variable store, tagged with whether
/// the optimizer may update it.
///
#[derive(Debug)]
pub struct Parameter
{
    pub name: String,
    pub tensor: Tensor,
    pub trainable: bool
}

impl Parameter
{
    pub fn numel (& self) -> usize
    {
        self.tensor.numel()
    }
}

///
/// A building block of the predictor: it transforms a feature map, exposes
/// the tensors it owns and can be frozen or unfrozen as a unit.
///
pub trait Component
{
    ///
    /// Applies this component to a batch.
    ///
    fn forward (& self, xs: & Tensor, mode: Mode) -> Tensor;

    ///
    /// The learnable tensors of this component, named as in the checkpoint.
    ///
    fn parameters (& self) -> Vec<Parameter>;

    ///
    /// Non-learnable state such as normalization running statistics.
    ///
    fn buffers (& self) -> Vec<Parameter>
    {
        Vec::new()
    }

    ///
    /// Marks every learnable tensor of this component as (non-)trainable.
    ///
    fn set_trainable (& mut self, trainable: bool);

    fn is_trainable (& self) -> bool;
}

///
/// Flips the autograd flag of each learnable tensor. Tensors without
/// gradients are skipped by the optimizer and keep their values.
///
pub(crate) fn mark_trainable (parameters: & [Parameter], trainable: bool)
{
    for parameter in parameters
    {
        let _ = parameter.tensor.set_requires_grad(trainable);
    }
}

pub(crate) fn conv_parameters (name: & str, conv: & nn::Conv2D, trainable: bool) -> Vec<Parameter>
{
    let mut result = vec![param(name, "weight", & conv.ws, trainable)];
    if let Some(bs) = & conv.bs
    {
        result.push(param(name, "bias", bs, trainable));
    }
    result
}

pub(crate) fn linear_parameters (name: & str, linear: & nn::Linear, trainable: bool) -> Vec<Parameter>
{
    let mut result = vec![param(name, "weight", & linear.ws, trainable)];
    if let Some(bs) = & linear.bs
    {
        result.push(param(name, "bias", bs, trainable));
    }
    result
}

pub(crate) fn norm_parameters (name: & str, norm: & nn::BatchNorm, trainable: bool) -> Vec<Parameter>
{
    let mut result = Vec::new();
    if let Some(ws) = & norm.ws
    {
        result.push(param(name, "weight", ws, trainable));
    }
    if let Some(bs) = & norm.bs
    {
        result.push(param(name, "bias", bs, trainable));
    }
    result
}

pub(crate) fn norm_buffers (name: & str, norm: & nn::BatchNorm) -> Vec<Parameter>
{
    vec!
    [
        param(name, "running_mean", & norm.running_mean, false),
        param(name, "running_var", & norm.running_var, false)
    ]
}

fn param (prefix: & str, leaf: & str, tensor: & Tensor, trainable: bool) -> Parameter
{
    Parameter { name: format!("{}.{}", prefix, leaf), tensor: tensor.shallow_clone(), trainable }
}
