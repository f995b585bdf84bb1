//! The multilayer perceptron.

use std::sync::Arc;

use tracing::{debug, error, trace};

use crate::network::{self, Gradients, Scratch};
use crate::optim::SabState;
use crate::pool::{Shared, WorkerPool};
use crate::{Dataset, Error, ParamTensor, PerceptronConfig, Result, Topology};

/// A fully connected feed-forward network with a fixed topology.
///
/// Hidden layers use the configured activation (tanh by default); the output layer is
/// linear. Training is batch gradient descent with per-weight Super-SAB learning rates,
/// optionally spread over a pool of worker threads.
///
/// A perceptron built from invalid parameters is kept in a permanent error state:
/// [`Perceptron::has_error`] returns `true` and every operation returns
/// [`Error::Disabled`].
pub struct Perceptron {
    topology: Topology,
    config: PerceptronConfig,
    // `None` in the error state.
    shared: Option<Arc<Shared>>,
    // Allocated by the first `train` call.
    sab: Option<SabState>,
    // Buffers for the serial path, allocated on first use.
    scratch: Option<Scratch>,
    pool: Option<WorkerPool>,
}

impl Perceptron {
    /// Build a perceptron with the default configuration.
    pub fn new(topology: Topology) -> Self {
        Self::with_config(topology, PerceptronConfig::default())
    }

    /// Build a perceptron; invalid parameters yield a perceptron in the error state.
    pub fn with_config(topology: Topology, config: PerceptronConfig) -> Self {
        match Self::try_new(topology, config.clone()) {
            Ok(p) => p,
            Err(e) => {
                error!(?topology, error = %e, "cannot build perceptron");
                Self {
                    topology,
                    config,
                    shared: None,
                    sab: None,
                    scratch: None,
                    pool: None,
                }
            }
        }
    }

    /// Build a perceptron, reporting invalid parameters as an error.
    pub fn try_new(topology: Topology, config: PerceptronConfig) -> Result<Self> {
        topology.validate()?;
        config.validate()?;

        let weights = ParamTensor::init(&topology, config.init);
        let shared = Shared::new(topology, config.activation, weights);
        Ok(Self {
            topology,
            config,
            shared: Some(Arc::new(shared)),
            sab: None,
            scratch: None,
            pool: None,
        })
    }

    /// True if construction failed; the perceptron is then unusable.
    #[inline]
    pub fn has_error(&self) -> bool {
        self.shared.is_none()
    }

    #[inline]
    pub fn topology(&self) -> Topology {
        self.topology
    }

    #[inline]
    pub fn config(&self) -> &PerceptronConfig {
        &self.config
    }

    #[inline]
    pub fn input_count(&self) -> usize {
        self.topology.input_count
    }

    #[inline]
    pub fn output_count(&self) -> usize {
        self.topology.output_count
    }

    /// Number of live training workers (`0` when training serially).
    #[inline]
    pub fn worker_count(&self) -> usize {
        self.pool.as_ref().map_or(0, WorkerPool::len)
    }

    /// Buffers suitable for [`Perceptron::evaluate_into`].
    pub fn scratch(&self) -> Scratch {
        Scratch::new(&self.topology)
    }

    /// Snapshot of the current weights (`None` in the error state).
    pub fn weights(&self) -> Option<ParamTensor> {
        self.shared.as_ref().map(|s| s.weights.read().clone())
    }

    /// Per-weight learning rates (`None` before the first training round).
    pub fn learning_rates(&self) -> Option<&ParamTensor> {
        self.sab.as_ref().map(SabState::learning_rates)
    }

    /// Compute the outputs for one input vector.
    ///
    /// Returns a freshly allocated vector of length `output_count`.
    pub fn evaluate(&self, input: &[f64]) -> Result<Vec<f64>> {
        let mut scratch = self.scratch();
        let mut out = vec![0.0; self.topology.output_count];
        self.evaluate_into(input, &mut scratch, &mut out)?;
        Ok(out)
    }

    /// Shape-checked, allocation-free inference.
    pub fn evaluate_into(
        &self,
        input: &[f64],
        scratch: &mut Scratch,
        out: &mut [f64],
    ) -> Result<()> {
        let shared = self.enabled("evaluate")?;
        self.check_input(input)?;
        if out.len() != self.topology.output_count {
            return Err(Error::InvalidShape(format!(
                "output buffer len {} does not match output count {}",
                out.len(),
                self.topology.output_count
            )));
        }
        if !scratch.fits(&self.topology) {
            return Err(Error::InvalidShape(
                "scratch was not built for this perceptron".to_owned(),
            ));
        }

        let weights = shared.weights.read();
        let y = network::forward(&weights, shared.activation, input, scratch);
        out.copy_from_slice(y);
        Ok(())
    }

    /// Spread training over `workers` threads.
    ///
    /// Any existing pool is shut down first. `0` selects the configured default worker
    /// count, or the host's available parallelism. One worker means serial training.
    pub fn enable_parallel_training(&mut self, workers: usize) -> Result<()> {
        self.disable_parallel_training();
        let shared = Arc::clone(self.enabled("enable_parallel_training")?);

        let count = match workers {
            0 => self.config.resolved_workers(),
            n => n,
        };
        if count <= 1 {
            debug!("parallel training not enabled; training serially");
            return Ok(());
        }

        self.pool = Some(WorkerPool::spawn(count, &shared)?);
        Ok(())
    }

    /// Shut down the worker pool, if any, and go back to serial training.
    pub fn disable_parallel_training(&mut self) {
        self.pool = None;
    }

    /// Run one training round over `batch`.
    ///
    /// Every sample is propagated forward and backward and the gradients are summed over
    /// the batch; then every weight is updated once with the Super-SAB rule.
    ///
    /// Returns the sum of squared errors of the batch under the weights as they were
    /// *before* this update.
    pub fn train(&mut self, batch: &Dataset) -> Result<f64> {
        let shared = Arc::clone(self.enabled("train")?);
        self.check_batch(batch)?;

        let topology = self.topology;
        let rule = self.config.learning;
        let sab = self.sab.get_or_insert_with(|| rule.state(&topology));

        {
            let mut grads = shared.gradients.lock();
            if !grads.is_allocated() {
                *grads = Gradients::new(&topology);
            }
        }

        match &self.pool {
            Some(pool) => {
                if let Err(e) = pool.run_round(batch) {
                    // Drop whatever part of the round made it into the accumulator.
                    *shared.gradients.lock() = Gradients::new(&topology);
                    return Err(e);
                }
            }
            None => {
                let scratch = self.scratch.get_or_insert_with(|| Scratch::new(&topology));
                for (input, target) in batch.iter() {
                    shared.train_sample(input, target, scratch);
                }
            }
        }

        let mut weights = shared.weights.write();
        let mut grads = shared.gradients.lock();
        let squared_error = grads.take_squared_error();
        sab.step(&mut weights, grads.sums_mut());

        trace!(
            samples = batch.len(),
            squared_error,
            workers = self.pool.as_ref().map_or(0, WorkerPool::len),
            "training round"
        );
        Ok(squared_error)
    }

    pub(crate) fn enabled(&self, op: &str) -> Result<&Arc<Shared>> {
        self.shared.as_ref().ok_or_else(|| {
            error!(op, "perceptron is in an error state");
            Error::Disabled
        })
    }

    fn check_input(&self, input: &[f64]) -> Result<()> {
        if input.len() != self.topology.input_count {
            return Err(Error::InvalidShape(format!(
                "input len {} does not match input count {}",
                input.len(),
                self.topology.input_count
            )));
        }
        Ok(())
    }

    pub(crate) fn check_batch(&self, batch: &Dataset) -> Result<()> {
        if batch.input_dim() != self.topology.input_count {
            return Err(Error::InvalidShape(format!(
                "batch input_dim {} does not match input count {}",
                batch.input_dim(),
                self.topology.input_count
            )));
        }
        if batch.target_dim() != self.topology.output_count {
            return Err(Error::InvalidShape(format!(
                "batch target_dim {} does not match output count {}",
                batch.target_dim(),
                self.topology.output_count
            )));
        }
        Ok(())
    }
}

impl std::fmt::Debug for Perceptron {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Perceptron")
            .field("topology", &self.topology)
            .field("has_error", &self.has_error())
            .field("workers", &self.worker_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xy_batch() -> Dataset {
        Dataset::from_rows(
            &[vec![0.0, 0.0], vec![0.5, 1.0], vec![1.0, 0.25]],
            &[vec![0.1], vec![-0.3], vec![0.4]],
        )
        .unwrap()
    }

    #[test]
    fn invalid_topology_enters_error_state() {
        let p = Perceptron::new(Topology::new(0, 1, 1, 1));
        assert!(p.has_error());
        assert!(p.weights().is_none());
        let err = Perceptron::try_new(Topology::new(1, 1, 1, 0), PerceptronConfig::default());
        assert!(matches!(err, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn invalid_config_enters_error_state() {
        let mut config = PerceptronConfig::default();
        config.learning.initial_rate = -1.0;
        let p = Perceptron::with_config(Topology::new(2, 1, 2, 1), config);
        assert!(p.has_error());
    }

    #[test]
    fn evaluate_validates_shapes() {
        let p = Perceptron::new(Topology::new(2, 1, 3, 1));
        assert!(matches!(p.evaluate(&[0.0]), Err(Error::InvalidShape(_))));

        let mut scratch = p.scratch();
        let mut out = [0.0; 2];
        assert!(p.evaluate_into(&[0.0, 0.0], &mut scratch, &mut out).is_err());

        let mut wrong = Scratch::new(&Topology::new(2, 1, 4, 1));
        let mut out = [0.0; 1];
        assert!(p.evaluate_into(&[0.0, 0.0], &mut wrong, &mut out).is_err());
    }

    #[test]
    fn evaluate_into_matches_evaluate() {
        let p = Perceptron::new(Topology::new(2, 1, 3, 2));
        let mut scratch = p.scratch();
        let mut out = [0.0; 1];
        p.evaluate_into(&[0.3, -0.2], &mut scratch, &mut out).unwrap();
        assert_eq!(out.to_vec(), p.evaluate(&[0.3, -0.2]).unwrap());
    }

    #[test]
    fn train_rejects_mismatched_batch() {
        let mut p = Perceptron::new(Topology::new(3, 1, 2, 1));
        assert!(matches!(p.train(&xy_batch()), Err(Error::InvalidShape(_))));
        assert!(p.learning_rates().is_none());
    }

    #[test]
    fn train_returns_error_before_update() {
        let mut p = Perceptron::new(Topology::new(2, 1, 3, 1));
        let batch = xy_batch();

        let mut expected = 0.0;
        for (x, t) in batch.iter() {
            let y = p.evaluate(x).unwrap();
            expected += (y[0] - t[0]) * (y[0] - t[0]);
        }

        let before = p.weights().unwrap();
        let err = p.train(&batch).unwrap();
        assert!((err - expected).abs() < 1e-12);
        assert_ne!(p.weights().unwrap(), before);
    }

    #[test]
    fn first_round_keeps_initial_learning_rates() {
        let mut p = Perceptron::new(Topology::new(2, 1, 3, 2));
        p.train(&xy_batch()).unwrap();
        let rates = p.learning_rates().unwrap();
        assert!(rates.iter().all(|lr| lr == 0.1));
    }

    #[test]
    fn empty_batch_leaves_weights_unchanged() {
        let mut p = Perceptron::new(Topology::new(2, 1, 3, 1));
        let before = p.weights().unwrap();
        let err = p.train(&Dataset::empty(2, 1).unwrap()).unwrap();
        assert_eq!(err, 0.0);
        assert_eq!(p.weights().unwrap(), before);
    }

    #[test]
    fn single_worker_stays_serial() {
        let mut p = Perceptron::new(Topology::new(2, 1, 3, 1));
        p.enable_parallel_training(1).unwrap();
        assert_eq!(p.worker_count(), 0);
        p.enable_parallel_training(3).unwrap();
        assert_eq!(p.worker_count(), 3);
        p.disable_parallel_training();
        assert_eq!(p.worker_count(), 0);
        p.disable_parallel_training();
    }
}
