//! Thread-parallel training.
//!
//! A [`WorkerPool`] owns a fixed set of long-lived OS threads. Each worker allocates
//! its own [`Scratch`] once and then loops:
//!
//! 1. block until a sample is handed over (or the pool shuts down),
//! 2. run the forward and backward pass on its private buffers,
//! 3. lock the shared [`Gradients`] only to fold the sample's contribution in,
//! 4. report completion on the round's [`Countdown`].
//!
//! Samples are handed over through a zero-capacity channel, so dispatching blocks
//! until some idle worker has accepted the sample. Which worker gets which sample is
//! unspecified. After the whole batch is dispatched the coordinator waits for the
//! countdown to reach zero; only then may the weights be updated.
//!
//! Shutdown disconnects the channel: workers finish the sample they hold, observe the
//! disconnect and exit. Dropping the pool joins every worker.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, warn};

use crate::network::{self, Gradients, Scratch};
use crate::sync::Countdown;
use crate::{Activation, Dataset, Error, ParamTensor, Result, Topology};

/// State shared between the coordinating thread and the workers.
///
/// The weights are only written by the update pass, which runs after the round's
/// countdown reached zero; workers take the read lock for their forward/backward pass.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) topology: Topology,
    pub(crate) activation: Activation,
    pub(crate) weights: RwLock<ParamTensor>,
    pub(crate) gradients: Mutex<Gradients>,
    pub(crate) pending: Countdown,
}

impl Shared {
    pub(crate) fn new(topology: Topology, activation: Activation, weights: ParamTensor) -> Self {
        Self {
            topology,
            activation,
            weights: RwLock::new(weights),
            gradients: Mutex::new(Gradients::default()),
            pending: Countdown::default(),
        }
    }

    /// Backpropagate one sample and accumulate it under the gradient lock.
    pub(crate) fn train_sample(&self, input: &[f64], target: &[f64], scratch: &mut Scratch) {
        let squared_error = {
            let weights = self.weights.read();
            network::backpropagate(&weights, self.activation, input, target, scratch)
        };
        self.gradients.lock().absorb(input, scratch, squared_error);
    }
}

struct Job {
    batch: Dataset,
    index: usize,
}

pub(crate) struct WorkerPool {
    jobs: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    shared: Arc<Shared>,
}

impl WorkerPool {
    /// Start `count` workers.
    ///
    /// If a thread cannot be spawned, the workers already started are shut down and
    /// joined before the error is returned.
    pub(crate) fn spawn(count: usize, shared: &Arc<Shared>) -> Result<Self> {
        let (tx, rx) = channel::bounded::<Job>(0);
        let mut pool = Self {
            jobs: Some(tx),
            workers: Vec::with_capacity(count),
            shared: Arc::clone(shared),
        };

        for id in 0..count {
            let jobs = rx.clone();
            let shared = Arc::clone(shared);
            let handle = thread::Builder::new()
                .name(format!("perceptron-worker-{id}"))
                .spawn(move || run_worker(id, &shared, &jobs))
                .map_err(|e| Error::WorkerSpawn(e.to_string()))?;
            pool.workers.push(handle);
        }
        // Only workers may hold receivers: once they are all gone, dispatch must fail
        // instead of blocking forever.
        drop(rx);

        debug!(workers = count, "training pool started");
        Ok(pool)
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.workers.len()
    }

    /// Dispatch every sample of `batch` and wait until all of them are accumulated.
    pub(crate) fn run_round(&self, batch: &Dataset) -> Result<()> {
        let Some(jobs) = &self.jobs else {
            return Err(Error::WorkersUnavailable);
        };

        let pending = &self.shared.pending;
        pending.add(batch.len());
        for index in 0..batch.len() {
            let job = Job {
                batch: batch.clone(),
                index,
            };
            if jobs.send(job).is_err() {
                error!(
                    dispatched = index,
                    batch = batch.len(),
                    "all training workers have exited"
                );
                pending.sub(batch.len() - index);
                pending.wait();
                return Err(Error::WorkersUnavailable);
            }
        }
        pending.wait();
        Ok(())
    }

    fn shutdown(&mut self) {
        drop(self.jobs.take());
        for handle in self.workers.drain(..) {
            let name = handle.thread().name().map(str::to_owned);
            if handle.join().is_err() {
                warn!(worker = ?name, "training worker panicked");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        let workers = self.workers.len();
        self.shutdown();
        debug!(workers, "training pool stopped");
    }
}

fn run_worker(id: usize, shared: &Shared, jobs: &Receiver<Job>) {
    if !shared.weights.read().matches(&shared.topology) {
        error!(
            worker = id,
            "weights do not match the network topology; worker exiting"
        );
        return;
    }

    let mut scratch = Scratch::new(&shared.topology);
    debug!(worker = id, "training worker started");

    while let Ok(job) = jobs.recv() {
        let _done = shared.pending.guard();
        shared.train_sample(job.batch.input(job.index), job.batch.target(job.index), &mut scratch);
    }

    debug!(worker = id, "training worker exiting");
}
