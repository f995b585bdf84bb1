//! Parameter tensors: one [`Transition`] per layer transition.

use rand::SeedableRng;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Error, Result, Topology, Transition};

/// Weight initialization scheme.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum WeightInit {
    /// Every weight of a transition is `1 / (sources + 1)`.
    #[default]
    Uniform,
    /// `Uniform` plus seeded noise drawn from `[-scale, scale]`.
    ///
    /// Breaks the symmetry between neurons of the same hidden layer.
    Jittered { seed: u64, scale: f64 },
}

impl WeightInit {
    pub fn validate(self) -> Result<()> {
        match self {
            WeightInit::Uniform => Ok(()),
            WeightInit::Jittered { scale, .. } => {
                if !(scale.is_finite() && scale >= 0.0) {
                    return Err(Error::InvalidConfig(format!(
                        "jitter scale must be finite and >= 0, got {scale}"
                    )));
                }
                Ok(())
            }
        }
    }
}

/// A tensor shaped like the network's weights.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParamTensor {
    transitions: Vec<Transition>,
}

impl ParamTensor {
    /// Every entry of every transition set to `value`.
    pub fn filled(topology: &Topology, value: f64) -> Self {
        let transitions = (0..topology.transition_count())
            .map(|k| {
                let (sources, destinations) = topology.transition_shape(k);
                Transition::filled(sources, destinations, value)
            })
            .collect();
        Self { transitions }
    }

    #[inline]
    pub fn zeros(topology: &Topology) -> Self {
        Self::filled(topology, 0.0)
    }

    /// Initial weights for `topology`.
    pub fn init(topology: &Topology, init: WeightInit) -> Self {
        let mut transitions = Vec::with_capacity(topology.transition_count());
        for k in 0..topology.transition_count() {
            let (sources, destinations) = topology.transition_shape(k);
            let value = 1.0 / (sources as f64 + 1.0);
            transitions.push(Transition::filled(sources, destinations, value));
        }

        if let WeightInit::Jittered { seed, scale } = init {
            if scale > 0.0 {
                let mut rng = StdRng::seed_from_u64(seed);
                let dist = Uniform::new_inclusive(-scale, scale);
                for t in &mut transitions {
                    for w in t.values_mut() {
                        *w += dist.sample(&mut rng);
                    }
                }
            }
        }

        Self { transitions }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    #[inline]
    pub fn transition(&self, k: usize) -> &Transition {
        &self.transitions[k]
    }

    #[inline]
    pub fn transition_mut(&mut self, k: usize) -> &mut Transition {
        &mut self.transitions[k]
    }

    #[inline]
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    #[inline]
    pub fn transitions_mut(&mut self) -> &mut [Transition] {
        &mut self.transitions
    }

    /// Iterate over every scalar, transition by transition.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.transitions.iter().flat_map(|t| t.values().iter().copied())
    }

    /// True if `self` has the transition shapes of `topology`.
    pub fn matches(&self, topology: &Topology) -> bool {
        self.transitions.len() == topology.transition_count()
            && self.transitions.iter().enumerate().all(|(k, t)| {
                let (sources, destinations) = topology.transition_shape(k);
                t.sources() == sources && t.destinations() == destinations
            })
    }
}
