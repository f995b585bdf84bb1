//! Super-SAB adaptive learning rates.
//!
//! Every weight has its own learning rate. After each round the rate grows when the
//! weight's gradient kept its sign since the previous round and shrinks when the sign
//! flipped:
//!
//! - `g * g_prev > 0`: `lr *= increase`
//! - `g * g_prev < 0`: `lr *= decrease`
//! - otherwise: `lr` is unchanged
//!
//! then `w -= lr * g`, `g_prev = g` and the accumulated gradient is reset to zero.
//!
//! The update is applied once per weight per round, after every sample of the batch
//! has been accumulated, on the coordinating thread only.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, ParamTensor, Result, Topology};

pub const DEFAULT_LEARNING_RATE: f64 = 0.1;
pub const DEFAULT_INCREASE: f64 = 1.5;
pub const DEFAULT_DECREASE: f64 = 0.4;

/// Super-SAB hyperparameters.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SuperSab {
    /// Learning rate every weight starts with.
    pub initial_rate: f64,
    /// Factor applied when consecutive gradients agree in sign.
    pub increase: f64,
    /// Factor applied when consecutive gradients disagree in sign.
    pub decrease: f64,
}

impl Default for SuperSab {
    fn default() -> Self {
        Self {
            initial_rate: DEFAULT_LEARNING_RATE,
            increase: DEFAULT_INCREASE,
            decrease: DEFAULT_DECREASE,
        }
    }
}

impl SuperSab {
    pub fn validate(self) -> Result<()> {
        if !(self.initial_rate.is_finite() && self.initial_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "initial learning rate must be finite and > 0, got {}",
                self.initial_rate
            )));
        }
        if !(self.increase.is_finite() && self.increase >= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "learning rate increase must be finite and >= 1, got {}",
                self.increase
            )));
        }
        if !(self.decrease.is_finite() && self.decrease > 0.0 && self.decrease <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "learning rate decrease must be finite and in (0,1], got {}",
                self.decrease
            )));
        }
        Ok(())
    }

    /// Allocate per-weight state for `topology`.
    pub fn state(self, topology: &Topology) -> SabState {
        SabState {
            rule: self,
            learning_rates: ParamTensor::filled(topology, self.initial_rate),
            previous: ParamTensor::zeros(topology),
        }
    }

    /// The rate for one weight after seeing gradient `g` following `g_prev`.
    #[inline]
    pub fn adapt(self, rate: f64, g: f64, g_prev: f64) -> f64 {
        let agreement = g * g_prev;
        if agreement > 0.0 {
            rate * self.increase
        } else if agreement < 0.0 {
            rate * self.decrease
        } else {
            rate
        }
    }
}

/// Learning-rate and previous-gradient tensors; they persist across rounds.
#[derive(Debug, Clone)]
pub struct SabState {
    rule: SuperSab,
    learning_rates: ParamTensor,
    previous: ParamTensor,
}

impl SabState {
    #[inline]
    pub fn rule(&self) -> SuperSab {
        self.rule
    }

    #[inline]
    pub fn learning_rates(&self) -> &ParamTensor {
        &self.learning_rates
    }

    #[inline]
    pub fn previous_gradients(&self) -> &ParamTensor {
        &self.previous
    }

    /// Apply one update to `weights` and reset `grads` to zero.
    pub fn step(&mut self, weights: &mut ParamTensor, grads: &mut ParamTensor) {
        assert_eq!(
            weights.len(),
            grads.len(),
            "grads have {} transitions, weights have {}",
            grads.len(),
            weights.len()
        );
        debug_assert_eq!(weights.len(), self.learning_rates.len());

        let rule = self.rule;
        for k in 0..weights.len() {
            let w = weights.transition_mut(k).values_mut();
            let g = grads.transition_mut(k).values_mut();
            let lr = self.learning_rates.transition_mut(k).values_mut();
            let prev = self.previous.transition_mut(k).values_mut();
            debug_assert_eq!(w.len(), g.len());

            for i in 0..w.len() {
                let gi = g[i];
                lr[i] = rule.adapt(lr[i], gi, prev[i]);
                w[i] -= lr[i] * gi;
                prev[i] = gi;
                g[i] = 0.0;
            }
        }
    }
}
