
use super::loss::StepLoss;

///
/// Sample-weighted running sums of the three losses.
///
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RunningLoss
{
    total: f64,
    policy: f64,
    value: f64,
    samples: usize
}

impl RunningLoss
{
    pub fn new () -> RunningLoss
    {
        RunningLoss::default()
    }

    ///
    /// Adds a batch whose mean losses were `loss` over `samples` samples.
    ///
    pub fn add (& mut self, loss: & StepLoss, samples: usize)
    {
        let n = samples as f64;
        self.total += loss.total * n;
        self.policy += loss.policy * n;
        self.value += loss.value * n;
        self.samples += samples;
    }

    pub fn merge (& mut self, other: & RunningLoss)
    {
        self.total += other.total;
        self.policy += other.policy;
        self.value += other.value;
        self.samples += other.samples;
    }

    pub fn samples (& self) -> usize
    {
        self.samples
    }

    ///
    /// The averages so far; zero when nothing has been added.
    ///
    pub fn mean (& self) -> StepLoss
    {
        let n = self.samples.max(1) as f64;
        StepLoss { total: self.total / n, policy: self.policy / n, value: self.value / n }
    }
}
