
use std::path::Path;

use tch::{Kind, Tensor};

use utils::error::*;

use super::shard::ShardSource;
use crate::error::FinetuneError;
use crate::neural::POLICY_SIZE;

///
/// One training example.
///
#[derive(Debug)]
pub struct Sample
{
    pub board: Tensor,
    pub move_index: i64,
    pub value: f32
}

///
/// The concatenated contents of one or more shards, resident in host memory:
///
/// - `boards`: [N, C, 8, 8] float;
/// - `moves`: [N] int64, the argmax of each policy target;
/// - `values`: [N] float, unclipped.
///
/// Dropping a dataset releases its arrays.
///
#[derive(Debug)]
pub struct Dataset
{
    ids: Vec<u32>,
    boards: Tensor,
    moves: Tensor,
    values: Tensor
}

impl Dataset
{
    ///
    /// Loads and concatenates the given shards in order. Every shard must hold
    /// boards with `in_channels` planes and the same number of boards, policy
    /// targets and value targets.
    ///
    pub fn load (source: & ShardSource, ids: & [u32], in_channels: i64) -> Result<Dataset>
    {
        let mut boards = Vec::with_capacity(ids.len());
        let mut moves = Vec::with_capacity(ids.len());
        let mut values = Vec::with_capacity(ids.len());

        for & id in ids
        {
            let paths = source.paths(id);

            let board = read(id, & paths.boards)?;
            let policy = read(id, & paths.policy)?;
            let value = read(id, & paths.value)?;

            let (board, policy, value) = validate(id, board, policy, value, in_channels)?;

            boards.push(board.to_kind(Kind::Float));
            moves.push(policy.argmax(1, false));
            values.push(value.to_kind(Kind::Float));
        }

        let dataset = match ids.len()
        {
            0 => Dataset
            {
                ids: Vec::new(),
                boards: Tensor::zeros([0, in_channels, 8, 8], (Kind::Float, tch::Device::Cpu)),
                moves: Tensor::zeros([0], (Kind::Int64, tch::Device::Cpu)),
                values: Tensor::zeros([0], (Kind::Float, tch::Device::Cpu))
            },
            _ => Dataset
            {
                ids: ids.to_vec(),
                boards: Tensor::cat(& boards, 0),
                moves: Tensor::cat(& moves, 0),
                values: Tensor::cat(& values, 0)
            }
        };

        Ok(dataset)
    }

    ///
    /// The shards this dataset was loaded from.
    ///
    pub fn ids (& self) -> & [u32]
    {
        & self.ids
    }

    pub fn len (& self) -> usize
    {
        self.boards.size()[0] as usize
    }

    pub fn is_empty (& self) -> bool
    {
        self.len() == 0
    }

    ///
    /// Returns sample `index`: its board, target move index and value target.
    /// For inspecting single samples; training batches gather whole index
    /// sets at once through `Batches`.
    ///
    pub fn get (& self, index: usize) -> Option<Sample>
    {
        if index >= self.len()
        {
            return None;
        }

        let i = index as i64;
        Some(Sample
        {
            board: self.boards.get(i),
            move_index: self.moves.int64_value(& [i]),
            value: self.values.double_value(& [i]) as f32
        })
    }

    pub fn boards (& self) -> & Tensor
    {
        & self.boards
    }

    pub fn moves (& self) -> & Tensor
    {
        & self.moves
    }

    pub fn values (& self) -> & Tensor
    {
        & self.values
    }
}

fn read (id: u32, path: & Path) -> Result<Tensor>
{
    if ! path.is_file()
    {
        return Err(FinetuneError::MissingShardFile { id, path: path.to_owned() }.into());
    }

    Tensor::read_npy(path).context(format!("Failed to read '{}'.", path.display()))
}

///
/// Checks the shapes of one shard's arrays and flattens [N, 1] value targets.
///
fn validate (id: u32, board: Tensor, policy: Tensor, value: Tensor, in_channels: i64) -> Result<(Tensor, Tensor, Tensor)>
{
    let malformed = |array: &'static str, shape: Vec<i64>, expected: String|
    {
        FinetuneError::MalformedShard { id, array, shape, expected }
    };

    let value = match value.size().as_slice()
    {
        [_]    => value,
        [_, 1] => value.flatten(0, -1),
        other  => return Err(malformed("value", other.to_vec(), "[N]".to_owned()).into())
    };

    if board.dim() != 4
    {
        return Err(malformed("board", board.size(), format!("[N, {}, 8, 8]", in_channels)).into());
    }
    if policy.dim() != 2
    {
        return Err(malformed("policy", policy.size(), format!("[N, {}]", POLICY_SIZE)).into());
    }

    let (boards, policies, values) = (board.size()[0], policy.size()[0], value.size()[0]);
    if boards != policies || boards != values
    {
        return Err(FinetuneError::MisalignedShard { id, boards, policies, values }.into());
    }

    if board.size()[1 ..] != [in_channels, 8, 8][..]
    {
        return Err(malformed("board", board.size(), format!("[N, {}, 8, 8]", in_channels)).into());
    }
    if policy.size()[1] != POLICY_SIZE
    {
        return Err(malformed("policy", policy.size(), format!("[N, {}]", POLICY_SIZE)).into());
    }

    Ok((board, policy, value))
}
