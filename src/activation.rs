//! Hidden-layer activation functions.
//!
//! Each hidden neuron computes `y = activation(W x + b)`. The output layer never
//! applies an activation, so outputs are unbounded (regression-friendly).
//!
//! Only the *post-activation* values `y` are cached during the forward pass, so the
//! derivative is expressed in terms of `y` as well. Keeping both halves on one enum
//! guarantees that the forward function and the derivative used by backpropagation
//! always belong together.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
/// Element-wise hidden-layer activation.
pub enum Activation {
    #[default]
    Tanh,
    Sigmoid,
    #[cfg_attr(feature = "serde", serde(rename = "relu"))]
    ReLU,
    #[cfg_attr(feature = "serde", serde(rename = "leaky_relu"))]
    LeakyReLU {
        alpha: f64,
    },
    Identity,
}

impl Activation {
    /// Validate activation parameters.
    pub fn validate(self) -> Result<()> {
        match self {
            Activation::LeakyReLU { alpha } => {
                if !(alpha.is_finite() && alpha >= 0.0) {
                    return Err(Error::InvalidConfig(format!(
                        "leaky ReLU alpha must be finite and >= 0, got {alpha}"
                    )));
                }
            }
            Activation::Tanh | Activation::Sigmoid | Activation::ReLU | Activation::Identity => {}
        }

        Ok(())
    }

    #[inline]
    pub fn forward(self, x: f64) -> f64 {
        match self {
            Activation::Tanh => x.tanh(),
            Activation::Sigmoid => sigmoid(x),
            Activation::ReLU => x.max(0.0),
            Activation::LeakyReLU { alpha } => {
                if x > 0.0 {
                    x
                } else {
                    alpha * x
                }
            }
            Activation::Identity => x,
        }
    }

    /// Derivative with respect to the pre-activation, from the cached output `y`.
    #[inline]
    pub fn grad_from_output(self, y: f64) -> f64 {
        match self {
            Activation::Tanh => 1.0 - y * y,
            Activation::Sigmoid => y * (1.0 - y),
            Activation::ReLU => {
                if y > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
            Activation::LeakyReLU { alpha } => {
                if y > 0.0 {
                    1.0
                } else {
                    alpha
                }
            }
            Activation::Identity => 1.0,
        }
    }
}

#[inline]
fn sigmoid(x: f64) -> f64 {
    // Numerically stable sigmoid.
    if x >= 0.0 {
        let z = (-x).exp();
        1.0 / (1.0 + z)
    } else {
        let z = x.exp();
        z / (1.0 + z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_tanh() {
        assert_eq!(Activation::default(), Activation::Tanh);
    }

    #[test]
    fn leaky_relu_alpha_must_be_finite_and_non_negative() {
        assert!(
            Activation::LeakyReLU { alpha: f64::NAN }
                .validate()
                .is_err()
        );
        assert!(Activation::LeakyReLU { alpha: -0.1 }.validate().is_err());
        assert!(Activation::LeakyReLU { alpha: 0.1 }.validate().is_ok());
    }

    #[test]
    fn tanh_gradient_matches_closed_form() {
        let y = Activation::Tanh.forward(0.3);
        assert_eq!(y, 0.3_f64.tanh());
        assert_eq!(Activation::Tanh.grad_from_output(y), 1.0 - y * y);
    }

    #[test]
    fn gradients_match_finite_differences() {
        let eps = 1e-6;
        for act in [
            Activation::Tanh,
            Activation::Sigmoid,
            Activation::LeakyReLU { alpha: 0.1 },
            Activation::Identity,
        ] {
            for x in [-1.3, -0.2, 0.4, 2.0] {
                let numeric = (act.forward(x + eps) - act.forward(x - eps)) / (2.0 * eps);
                let analytic = act.grad_from_output(act.forward(x));
                assert!(
                    (numeric - analytic).abs() < 1e-6,
                    "{act:?} at {x}: numeric={numeric} analytic={analytic}"
                );
            }
        }
    }

    #[test]
    fn relu_and_leaky_relu_shapes() {
        assert_eq!(Activation::ReLU.forward(-2.0), 0.0);
        assert_eq!(Activation::ReLU.forward(3.0), 3.0);

        let act = Activation::LeakyReLU { alpha: 0.1 };
        assert_eq!(act.forward(-2.0), -0.2);
        assert_eq!(act.forward(3.0), 3.0);
        assert_eq!(Activation::ReLU.grad_from_output(0.0), 0.0);
        assert_eq!(act.grad_from_output(-0.2), 0.1);
    }
}
