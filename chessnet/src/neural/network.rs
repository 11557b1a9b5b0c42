
use std::path::Path;

use tch::nn::VarStore;
use tch::{Device, Tensor};

use utils::error::*;
use utils::log;

use super::checkpoint;
use super::component::*;
use super::config::Config;
use super::coords::*;
use super::heads::*;
use super::tower::Tower;

///
/// A network that functions simultaneously as a policy and value predictor.
///
/// The input is a [B, C, 8, 8] batch of encoded boards. Two coordinate planes
/// are appended, a 3x3 stem projects to the tower width, and a tower of
/// residual attention blocks feeds two heads:
///
/// - the policy head returns [B, 4096] unnormalized move logits;
/// - the value head returns [B, 1] unbounded outcome estimates from the side
///   to move's perspective.
///
/// Every variable lives in one `VarStore` under the names used by checkpoints
/// (`stem.0.weight`, `tower.3.se.fc.0.weight`, `value_head.6.bias`, ...).
///
#[derive(Debug)]
pub struct Network
{
    config: Config,
    device: Device,
    vs: VarStore,
    coords: CoordinateChannels,
    stem: Stem,
    tower: Tower,
    policy: PolicyHead,
    value: ValueHead
}

///
/// A named group of parameters with its size, as shown in run summaries.
///
#[derive(Clone, Debug, PartialEq)]
pub struct GroupSummary
{
    pub group: String,
    pub parameters: usize,
    pub trainable: usize
}

impl Network
{
    ///
    /// Creates a freshly initialized network.
    ///
    pub fn new (config: & Config) -> Result<Network>
    {
        config.validate()?;

        let device = config.device()?;
        let vs = VarStore::new(device);
        let root = vs.root();

        let stem = Stem::new(& (& root / "stem"), config.in_channels + COORDINATE_CHANNELS, config.width);
        let tower = Tower::new(& (& root / "tower"), config.width, config.blocks, config.se_reduction, config.drop_path_max);
        let policy = PolicyHead::new(& root, config.width);
        let value = ValueHead::new(& (& root / "value_head"), config.width);

        Ok(Network { config: config.clone(), device, vs, coords: CoordinateChannels, stem, tower, policy, value })
    }

    ///
    /// Creates a network and loads its weights from a checkpoint.
    ///
    pub fn from_checkpoint (config: & Config, path: impl AsRef<Path>) -> Result<Network>
    {
        let mut net = Network::new(config)?;
        net.load(path)?;
        Ok(net)
    }

    ///
    /// Runs a forward pass, returning (policy logits [B, 4096], value [B, 1]).
    ///
    pub fn forward (& self, boards: & Tensor, mode: Mode) -> (Tensor, Tensor)
    {
        let xs = boards.to_device(self.device);

        let h = self.coords.forward(& xs, mode);
        let h = self.stem.forward(& h, mode);
        let h = self.tower.forward(& h, mode);

        let policy = self.policy.forward(& h, mode);
        let value = self.value.forward(& h, mode);

        (policy, value)
    }

    ///
    /// An inference-mode forward pass without gradient tracking.
    ///
    pub fn predict (& self, boards: & Tensor) -> (Tensor, Tensor)
    {
        tch::no_grad(|| self.forward(boards, Mode::Infer))
    }

    ///
    /// Overwrites every variable with the contents of a checkpoint.
    ///
    pub fn load (& mut self, path: impl AsRef<Path>) -> Result<()>
    {
        let path = path.as_ref();
        checkpoint::restore(& self.vs, path).context(format!("Failed to load weights file from '{}'.", path.display()))
    }

    ///
    /// Saves every variable, including normalization statistics.
    ///
    pub fn save (& self, path: impl AsRef<Path>) -> Result<()>
    {
        checkpoint::write(& self.vs, path.as_ref())
    }

    pub fn config (& self) -> & Config
    {
        & self.config
    }

    pub fn device (& self) -> Device
    {
        self.device
    }

    pub fn var_store (& self) -> & VarStore
    {
        & self.vs
    }

    pub fn stem (& self) -> & Stem
    {
        & self.stem
    }

    pub fn stem_mut (& mut self) -> & mut Stem
    {
        & mut self.stem
    }

    pub fn tower (& self) -> & Tower
    {
        & self.tower
    }

    pub fn tower_mut (& mut self) -> & mut Tower
    {
        & mut self.tower
    }

    pub fn policy_head (& self) -> & PolicyHead
    {
        & self.policy
    }

    pub fn policy_head_mut (& mut self) -> & mut PolicyHead
    {
        & mut self.policy
    }

    pub fn value_head (& self) -> & ValueHead
    {
        & self.value
    }

    pub fn value_head_mut (& mut self) -> & mut ValueHead
    {
        & mut self.value
    }

    ///
    /// Every learnable tensor, in data-flow order.
    ///
    pub fn parameters (& self) -> Vec<Parameter>
    {
        let mut result = self.stem.parameters();
        result.extend(self.tower.parameters());
        result.extend(self.policy.parameters());
        result.extend(self.value.parameters());
        result
    }

    ///
    /// Every normalization statistic, in data-flow order.
    ///
    pub fn buffers (& self) -> Vec<Parameter>
    {
        let mut result = self.stem.buffers();
        result.extend(self.tower.buffers());
        result.extend(self.policy.buffers());
        result.extend(self.value.buffers());
        result
    }

    ///
    /// Parameter counts per group: the stem, each tower block, then the heads.
    ///
    pub fn summary (& self) -> Vec<GroupSummary>
    {
        let mut groups = vec![summarize("stem", & self.stem)];
        groups.extend(self.tower.blocks().iter().map(|block| summarize(block.name(), block)));
        groups.push(summarize("policy_head", & self.policy));
        groups.push(summarize("value_head", & self.value));
        groups
    }

    ///
    /// Logs the architecture once at startup.
    ///
    pub fn describe (& self)
    {
        let total : usize = self.parameters().iter().map(|p| p.numel()).sum();
        log::info!(
            "Network: {} input planes, width {}, {} blocks, drop path up to {}, {} parameters on {:?}.",
            self.config.in_channels, self.config.width, self.config.blocks, self.config.drop_path_max, total, self.device
        );
    }
}

fn summarize (group: & str, component: & dyn Component) -> GroupSummary
{
    let parameters = component.parameters();
    GroupSummary
    {
        group: group.to_owned(),
        parameters: parameters.iter().map(|p| p.numel()).sum(),
        trainable: parameters.iter().filter(|p| p.trainable).map(|p| p.numel()).sum()
    }
}
