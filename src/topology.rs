//! Network shape.
//!
//! A perceptron has `input_count` inputs, `hidden_layers` hidden layers of
//! `hidden_width` neurons each, and `output_count` outputs. Consecutive layers are
//! connected by a *transition*: transition `0` maps the inputs to the first hidden
//! layer and transition `hidden_layers` maps the last hidden layer to the outputs.
//!
//! Every transition also has an implicit bias source whose value is always `1`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Topology {
    pub input_count: usize,
    pub output_count: usize,
    pub hidden_width: usize,
    pub hidden_layers: usize,
}

impl Topology {
    /// Describe a topology. Validation is deferred to [`Topology::validate`].
    #[inline]
    pub const fn new(
        input_count: usize,
        output_count: usize,
        hidden_width: usize,
        hidden_layers: usize,
    ) -> Self {
        Self {
            input_count,
            output_count,
            hidden_width,
            hidden_layers,
        }
    }

    /// All four counts must be strictly positive.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("input_count", self.input_count),
            ("output_count", self.output_count),
            ("hidden_width", self.hidden_width),
            ("hidden_layers", self.hidden_layers),
        ];
        for (name, value) in fields {
            if value == 0 {
                return Err(Error::InvalidConfig(format!("{name} must be > 0")));
            }
        }
        Ok(())
    }

    /// Number of weight transitions (`hidden_layers + 1`).
    #[inline]
    pub fn transition_count(&self) -> usize {
        self.hidden_layers + 1
    }

    /// `(sources, destinations)` of transition `k`, bias excluded.
    ///
    /// Panics if `k >= transition_count()`.
    #[inline]
    pub fn transition_shape(&self, k: usize) -> (usize, usize) {
        assert!(
            k < self.transition_count(),
            "transition {k} out of range ({} transitions)",
            self.transition_count()
        );
        let sources = if k == 0 {
            self.input_count
        } else {
            self.hidden_width
        };
        (sources, self.layer_width(k))
    }

    /// Width of the layer produced by transition `k`.
    ///
    /// Layers `0..hidden_layers` are hidden, layer `hidden_layers` is the output layer.
    #[inline]
    pub fn layer_width(&self, k: usize) -> usize {
        if k == self.hidden_layers {
            self.output_count
        } else {
            self.hidden_width
        }
    }

    /// Total number of trainable weights, bias entries included.
    pub fn weight_count(&self) -> usize {
        (0..self.transition_count())
            .map(|k| {
                let (sources, destinations) = self.transition_shape(k);
                (sources + 1) * destinations
            })
            .sum()
    }
}
