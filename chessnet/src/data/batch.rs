
use std::sync::mpsc::{sync_channel, Receiver};
use std::thread::{self, JoinHandle};

use tch::{Device, Kind, Tensor};

use utils::error::*;

use super::dataset::Dataset;

///
/// A mini-batch of aligned samples, still on the host.
///
#[derive(Debug)]
pub struct Batch
{
    pub boards: Tensor,
    pub moves: Tensor,
    pub values: Tensor
}

impl Batch
{
    pub fn len (& self) -> usize
    {
        self.moves.size()[0] as usize
    }

    pub fn is_empty (& self) -> bool
    {
        self.len() == 0
    }
}

///
/// Walks a dataset in a fixed sample order, `batch_size` samples at a time.
/// The final batch holds whatever remains.
///
#[derive(Debug)]
pub struct Batches
{
    boards: Tensor,
    moves: Tensor,
    values: Tensor,
    order: Tensor,
    batch_size: i64,
    cursor: i64
}

impl Batches
{
    ///
    /// Batches in a fresh random order, drawn from the global generator.
    ///
    pub fn shuffled (dataset: & Dataset, batch_size: usize) -> Batches
    {
        let order = Tensor::randperm(dataset.len() as i64, (Kind::Int64, Device::Cpu));
        Batches::with_order(dataset, order, batch_size)
    }

    ///
    /// Batches in storage order.
    ///
    pub fn sequential (dataset: & Dataset, batch_size: usize) -> Batches
    {
        let order = Tensor::arange(dataset.len() as i64, (Kind::Int64, Device::Cpu));
        Batches::with_order(dataset, order, batch_size)
    }

    fn with_order (dataset: & Dataset, order: Tensor, batch_size: usize) -> Batches
    {
        Batches
        {
            boards: dataset.boards().shallow_clone(),
            moves: dataset.moves().shallow_clone(),
            values: dataset.values().shallow_clone(),
            order,
            batch_size: batch_size.max(1) as i64,
            cursor: 0
        }
    }

    ///
    /// The number of batches not yet produced.
    ///
    pub fn remaining (& self) -> usize
    {
        let left = self.order.size()[0] - self.cursor;
        ((left + self.batch_size - 1) / self.batch_size) as usize
    }

    ///
    /// Moves batch assembly onto a worker thread that stays at most `depth`
    /// batches ahead of the consumer. The order is unchanged, and a failure
    /// on the worker reaches the consumer as an error.
    ///
    pub fn prefetch (self, depth: usize) -> std::io::Result<Prefetcher>
    {
        let (sender, receiver) = sync_channel(depth.max(1));

        let worker = thread::Builder::new()
            .name("batch prefetcher".to_owned())
            .spawn(move ||
            {
                for batch in self
                {
                    if sender.send(batch).is_err()
                    {
                        break;
                    }
                }
            })?;

        Ok(Prefetcher { receiver: Some(receiver), worker: Some(worker) })
    }
}

impl Iterator for Batches
{
    type Item = Result<Batch>;

    fn next (& mut self) -> Option<Result<Batch>>
    {
        let total = self.order.size()[0];
        if self.cursor >= total
        {
            return None;
        }

        let len = self.batch_size.min(total - self.cursor);
        let index = self.order.narrow(0, self.cursor, len);
        self.cursor += len;

        Some(gather(& self.boards, & self.moves, & self.values, & index))
    }
}

fn gather (boards: & Tensor, moves: & Tensor, values: & Tensor, index: & Tensor) -> Result<Batch>
{
    let select = |t: & Tensor, what: & str| t.f_index_select(0, index).context(format!("Failed to gather batch {}.", what));

    Ok(Batch
    {
        boards: select(boards, "boards")?,
        moves: select(moves, "moves")?,
        values: select(values, "values")?
    })
}

///
/// Receives batches staged by a background thread. Dropping it stops the
/// worker and waits for it.
///
#[derive(Debug)]
pub struct Prefetcher
{
    receiver: Option<Receiver<Result<Batch>>>,
    worker: Option<JoinHandle<()>>
}

impl Iterator for Prefetcher
{
    type Item = Result<Batch>;

    fn next (& mut self) -> Option<Result<Batch>>
    {
        match self.receiver.as_ref()?.recv()
        {
            Ok(batch) => Some(batch),
            Err(_)    =>
            {
                // The worker hung up: either every batch was sent, or it died.
                self.receiver.take();
                let worker = self.worker.take()?;
                worker.join().err().map(|payload| Err(error!("Batch prefetcher panicked: {}", panic_message(& * payload))))
            }
        }
    }
}

fn panic_message (payload: & (dyn std::any::Any + Send)) -> String
{
    payload.downcast_ref::<& str>().map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown cause".to_owned())
}

impl Drop for Prefetcher
{
    fn drop (& mut self)
    {
        // Hanging up first unblocks a worker waiting on a full channel.
        self.receiver.take();

        if let Some(worker) = self.worker.take()
        {
            let _ = worker.join();
        }
    }
}
