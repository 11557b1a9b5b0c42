
use tch::{Reduction, Tensor};

///
/// Clamps value targets or predictions to [-clip, clip].
///
pub fn clip_values (values: & Tensor, clip: f64) -> Tensor
{
    values.clamp(-clip, clip)
}

///
/// The two training signals and their weighted sum, as scalar tensors that
/// still carry the autograd graph.
///
#[derive(Debug)]
pub struct Losses
{
    pub total: Tensor,
    pub policy: Tensor,
    pub value: Tensor
}

impl Losses
{
    ///
    /// Cross-entropy of `logits` [B, 4096] against target indices `moves` [B],
    /// plus `value_weight` times the mean squared error between `predicted`
    /// and `targets`, both [B]. Both arguments of the value term are expected
    /// to be clipped already.
    ///
    pub fn compute (logits: & Tensor, moves: & Tensor, predicted: & Tensor, targets: & Tensor, value_weight: f64) -> Losses
    {
        let policy = logits.cross_entropy_for_logits(moves);
        let value = predicted.mse_loss(targets, Reduction::Mean);
        let total = & policy + & value * value_weight;

        Losses { total, policy, value }
    }

    ///
    /// Detaches the losses into plain numbers.
    ///
    pub fn values (& self) -> StepLoss
    {
        StepLoss
        {
            total: self.total.double_value(& []),
            policy: self.policy.double_value(& []),
            value: self.value.double_value(& [])
        }
    }
}

///
/// The losses of one batch.
///
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StepLoss
{
    pub total: f64,
    pub policy: f64,
    pub value: f64
}

impl StepLoss
{
    pub fn is_finite (& self) -> bool
    {
        self.total.is_finite() && self.policy.is_finite() && self.value.is_finite()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use tch::{Device, Kind};

    #[test]
    fn clipping_keeps_the_bounds ()
    {
        let values = Tensor::from_slice(& [1.0f32, -1.0, 1.5, -3.0, 0.25]);
        let clipped = Vec::<f32>::try_from(& clip_values(& values, 1.0)).unwrap();
        assert_eq!(clipped, vec![1.0, -1.0, 1.0, -1.0, 0.25]);
    }

    #[test]
    fn uniform_logits_cost_log_of_the_move_space ()
    {
        let logits = Tensor::zeros([2, 4096], (Kind::Float, Device::Cpu));
        let moves = Tensor::from_slice(& [3i64, 4000]);
        let predicted = Tensor::from_slice(& [0.5f32, -0.5]);
        let targets = Tensor::from_slice(& [1.0f32, 0.5]);

        let losses = Losses::compute(& logits, & moves, & predicted, & targets, 2.0).values();

        assert!((losses.policy - (4096f64).ln()).abs() < 1e-4);
        assert!((losses.value - 0.625).abs() < 1e-6);
        assert!((losses.total - (losses.policy + 2.0 * 0.625)).abs() < 1e-4);
        assert!(losses.is_finite());
    }

    #[test]
    fn nan_is_not_finite ()
    {
        let loss = StepLoss { total: f64::NAN, policy: 0.0, value: 0.0 };
        assert!(! loss.is_finite());
    }
}
