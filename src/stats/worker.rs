//! Background aggregation over a bounded channel
//!
//! Producers send samples without touching the aggregate's lock; a single
//! worker thread drains the channel and applies them in arrival order.

use super::{Benchmark, Statistics};
use crate::error::{AppError, Result};
use crossbeam_channel::{bounded, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// An aggregate that can absorb samples of one type.
pub trait Aggregator: Default + Send + Sync + 'static {
    type Sample: Send + 'static;

    fn record(&self, samples: &[Self::Sample]);
}

impl Aggregator for Statistics {
    type Sample = f64;

    fn record(&self, samples: &[f64]) {
        self.update(samples);
    }
}

impl Aggregator for Benchmark {
    type Sample = Duration;

    fn record(&self, samples: &[Duration]) {
        self.update(samples);
    }
}

/// Owns the background thread draining samples into an aggregate.
pub struct Worker<A: Aggregator> {
    aggregate: Arc<A>,
    sender: Option<Sender<Vec<A::Sample>>>,
    handle: Option<JoinHandle<()>>,
}

pub type StatisticsWorker = Worker<Statistics>;
pub type BenchmarkWorker = Worker<Benchmark>;

impl<A: Aggregator> Worker<A> {
    /// Start a worker with the default channel capacity
    pub fn new() -> Self {
        Self::with_capacity(crate::defaults::WORKER_CHANNEL_CAPACITY)
    }

    /// Start a worker whose channel holds at most `capacity` pending batches
    pub fn with_capacity(capacity: usize) -> Self {
        let aggregate = Arc::new(A::default());
        let (sender, receiver) = bounded::<Vec<A::Sample>>(capacity.max(1));

        let sink = Arc::clone(&aggregate);
        let handle = thread::spawn(move || {
            for batch in receiver.iter() {
                sink.record(&batch);
            }
        });

        Self {
            aggregate,
            sender: Some(sender),
            handle: Some(handle),
        }
    }

    /// Queue samples, blocking while the channel is full
    pub fn update(&self, samples: Vec<A::Sample>) -> Result<()> {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| AppError::internal("worker is closed"))?;
        sender
            .send(samples)
            .map_err(|_| AppError::internal("statistics worker has stopped"))
    }

    /// Queue a single sample
    pub fn record(&self, sample: A::Sample) -> Result<()> {
        self.update(vec![sample])
    }

    /// The aggregate as seen so far; pending samples may not be applied yet
    pub fn current(&self) -> &A {
        &self.aggregate
    }

    /// Stop accepting samples, drain the channel and return the final aggregate
    pub fn close(mut self) -> Result<Arc<A>> {
        self.shutdown()?;
        Ok(Arc::clone(&self.aggregate))
    }

    fn shutdown(&mut self) -> Result<()> {
        // Dropping the sender ends the worker loop once the channel is empty
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| AppError::internal("statistics worker panicked"))?;
        }
        Ok(())
    }
}

impl<A: Aggregator> Default for Worker<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Aggregator> Drop for Worker<A> {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}
