
use tch::Tensor;

use super::component::*;

///
/// Appends two coordinate planes to a [B, C, H, W] batch: the row coordinate
/// then the column coordinate, each running linearly from -1 to 1 along its
/// axis and constant along the other. Convolutions are translation
/// equivariant, so these planes are how the network tells edges and corners
/// apart. Stateless.
///
#[derive(Clone, Copy, Debug, Default)]
pub struct CoordinateChannels;

///
/// The number of planes the augmentation adds.
///
pub const COORDINATE_CHANNELS : i64 = 2;

impl Component for CoordinateChannels
{
    fn forward (& self, xs: & Tensor, _mode: Mode) -> Tensor
    {
        let size = xs.size();
        let (batch, height, width) = (size[0], size[2], size[3]);
        let options = (xs.kind(), xs.device());

        let rows = Tensor::linspace(-1.0, 1.0, height, options)
            .view([1, 1, height, 1])
            .expand([batch, 1, height, width], false);

        let cols = Tensor::linspace(-1.0, 1.0, width, options)
            .view([1, 1, 1, width])
            .expand([batch, 1, height, width], false);

        Tensor::cat(& [xs, & rows, & cols], 1)
    }

    fn parameters (& self) -> Vec<Parameter>
    {
        Vec::new()
    }

    fn set_trainable (& mut self, _trainable: bool) {}

    fn is_trainable (& self) -> bool
    {
        false
    }
}
