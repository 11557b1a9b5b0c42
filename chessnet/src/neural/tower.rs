
use tch::{nn, Tensor};

use super::block::*;
use super::component::*;

///
/// The shared feature extractor: a fixed-length, ordered stack of residual
/// blocks of one channel width. Block order is both the data-flow order and
/// the order in which blocks are frozen.
///
#[derive(Debug)]
pub struct Tower
{
    blocks: Vec<ResidualBlock>
}

impl Tower
{
    ///
    /// Builds `count` blocks under `p`; block `i` is named `tower.i`.
    ///
    pub fn new (p: & nn::Path, channels: i64, count: usize, reduction: i64, drop_path_max: f64) -> Tower
    {
        let blocks = (0 .. count)
            .map(|i|
            {
                let drop = drop_probability(i, count, drop_path_max);
                ResidualBlock::new(& (p / i), & format!("tower.{}", i), channels, reduction, drop)
            })
            .collect();

        Tower { blocks }
    }

    pub fn len (& self) -> usize
    {
        self.blocks.len()
    }

    pub fn is_empty (& self) -> bool
    {
        self.blocks.is_empty()
    }

    pub fn blocks (& self) -> & [ResidualBlock]
    {
        & self.blocks
    }

    ///
    /// Mutable access to the blocks. The slice cannot grow or shrink.
    ///
    pub fn blocks_mut (& mut self) -> & mut [ResidualBlock]
    {
        & mut self.blocks
    }
}

impl Component for Tower
{
    fn forward (& self, xs: & Tensor, mode: Mode) -> Tensor
    {
        self.blocks.iter().fold(xs.shallow_clone(), |h, block| block.forward(& h, mode))
    }

    fn parameters (& self) -> Vec<Parameter>
    {
        self.blocks.iter().flat_map(|block| block.parameters()).collect()
    }

    fn buffers (& self) -> Vec<Parameter>
    {
        self.blocks.iter().flat_map(|block| block.buffers()).collect()
    }

    fn set_trainable (& mut self, trainable: bool)
    {
        self.blocks.iter_mut().for_each(|block| block.set_trainable(trainable));
    }

    ///
    /// True if any block is trainable.
    ///
    fn is_trainable (& self) -> bool
    {
        self.blocks.iter().any(|block| block.is_trainable())
    }
}
