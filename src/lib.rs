//! A multilayer perceptron with batch backpropagation.
//!
//! `rust-perceptron` trains a fully connected feed-forward network: `tanh` hidden layers
//! (configurable), a linear output layer, and per-weight adaptive learning rates using the
//! Super-SAB rule. A training round can run on the calling thread or be spread over a
//! pool of long-lived worker threads that share one gradient accumulator.
//!
//! # Panics vs `Result`
//!
//! This crate exposes two layers of API:
//!
//! - Low-level kernels (panic on misuse):
//!   - [`network::forward`], [`network::backpropagate`], [`Gradients::absorb`]
//!     Shape mismatches are programmer error and panic via `assert!`.
//!
//! - [`Perceptron`] (shape-checked):
//!   - [`Perceptron::evaluate`], [`Perceptron::train`], [`Perceptron::fit`]
//!     These validate inputs and return [`Result`].
//!
//! # Data layout
//!
//! - Scalars are `f64`.
//! - [`Dataset`] stores samples contiguously in row-major layout.
//! - A [`Transition`] stores its weights source-major, `sources + 1` rows of
//!   `destinations` values; the last row holds the biases.
//!
//! # Quick start
//!
//! ```rust
//! use rust_perceptron::{Dataset, FitConfig, Perceptron, Topology};
//!
//! # fn main() -> rust_perceptron::Result<()> {
//! let xs = vec![vec![0.0, 0.0], vec![0.5, 0.25], vec![1.0, 0.5], vec![0.25, 1.0]];
//! let ys = vec![vec![0.0], vec![0.125], vec![0.25], vec![-0.375]];
//! let batch = Dataset::from_rows(&xs, &ys)?;
//!
//! let mut net = Perceptron::new(Topology::new(2, 1, 4, 2));
//! net.enable_parallel_training(2)?;
//! let report = net.fit(&batch, FitConfig { rounds: 50, ..FitConfig::default() })?;
//! assert!(report.final_error.is_finite());
//!
//! let y = net.evaluate(&[0.5, 0.5])?;
//! assert_eq!(y.len(), 1);
//! # Ok(())
//! # }
//! ```
//!
//! # Allocation-free inference
//!
//! ```rust
//! use rust_perceptron::{Perceptron, Topology};
//!
//! # fn main() -> rust_perceptron::Result<()> {
//! let net = Perceptron::new(Topology::new(3, 2, 8, 1));
//! let mut scratch = net.scratch();
//! let mut out = [0.0; 2];
//! net.evaluate_into(&[0.1, -0.2, 0.3], &mut scratch, &mut out)?;
//! # Ok(())
//! # }
//! ```

pub mod activation;
pub mod config;
pub mod data;
pub mod error;
pub mod layer;
pub mod network;
pub mod optim;
pub mod perceptron;
pub(crate) mod pool;
pub(crate) mod sync;
pub mod topology;
pub mod train;
pub mod weights;

pub use activation::Activation;
pub use config::PerceptronConfig;
pub use data::Dataset;
pub use error::{Error, Result};
pub use layer::Transition;
pub use network::{Gradients, Scratch};
pub use optim::{SabState, SuperSab};
pub use perceptron::Perceptron;
pub use topology::Topology;
pub use train::{FitConfig, FitReport};
pub use weights::{ParamTensor, WeightInit};
