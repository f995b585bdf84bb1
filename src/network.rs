//! Forward evaluation and backpropagation for a single sample.
//!
//! These are the low-level, allocation-free kernels shared by inference, the
//! serial training path and every training worker. Shape mismatches are
//! programmer error and panic; [`crate::Perceptron`] validates at the API boundary.

use crate::{Activation, ParamTensor, Topology};

/// Per-agent activation buffers.
///
/// `values[k]` holds the post-activation outputs of layer `k` (the last layer holds
/// raw outputs), `errors[k]` the backpropagated error signal for layer `k`. The
/// unthreaded caller and every worker own a private `Scratch`; it is never shared.
#[derive(Debug, Clone)]
pub struct Scratch {
    values: Vec<Vec<f64>>,
    errors: Vec<Vec<f64>>,
}

impl Scratch {
    pub fn new(topology: &Topology) -> Self {
        let layers = topology.transition_count();
        let mut values = Vec::with_capacity(layers);
        let mut errors = Vec::with_capacity(layers);
        for k in 0..layers {
            values.push(vec![0.0; topology.layer_width(k)]);
            errors.push(vec![0.0; topology.layer_width(k)]);
        }
        Self { values, errors }
    }

    /// Output of the most recent forward pass.
    #[inline]
    pub fn output(&self) -> &[f64] {
        self.values
            .last()
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[inline]
    pub fn values(&self, layer: usize) -> &[f64] {
        &self.values[layer]
    }

    #[inline]
    pub fn errors(&self, layer: usize) -> &[f64] {
        &self.errors[layer]
    }

    /// True if the buffers are laid out for `topology`.
    pub fn fits(&self, topology: &Topology) -> bool {
        let layers = topology.transition_count();
        self.values.len() == layers
            && self.errors.len() == layers
            && (0..layers).all(|k| {
                self.values[k].len() == topology.layer_width(k)
                    && self.errors[k].len() == topology.layer_width(k)
            })
    }
}

/// Batch gradient accumulator.
///
/// Mirrors the weight tensor and sums every sample's contribution for the current
/// round, along with the round's total squared error. This is the only state written
/// by several workers; callers wrap it in a mutex when training in parallel.
#[derive(Debug, Clone, Default)]
pub struct Gradients {
    sums: ParamTensor,
    squared_error: f64,
}

impl Gradients {
    pub fn new(topology: &Topology) -> Self {
        Self {
            sums: ParamTensor::zeros(topology),
            squared_error: 0.0,
        }
    }

    #[inline]
    pub fn is_allocated(&self) -> bool {
        !self.sums.is_empty()
    }

    #[inline]
    pub fn sums(&self) -> &ParamTensor {
        &self.sums
    }

    #[inline]
    pub fn sums_mut(&mut self) -> &mut ParamTensor {
        &mut self.sums
    }

    #[inline]
    pub fn squared_error(&self) -> f64 {
        self.squared_error
    }

    /// Add one sample's contribution.
    ///
    /// `scratch` must hold the result of [`backpropagate`] for `input`.
    pub fn absorb(&mut self, input: &[f64], scratch: &Scratch, squared_error: f64) {
        debug_assert_eq!(self.sums.len(), scratch.values.len());

        for (k, t) in self.sums.transitions_mut().iter_mut().enumerate() {
            let inputs: &[f64] = if k == 0 { input } else { &scratch.values[k - 1] };
            t.accumulate(inputs, &scratch.errors[k]);
        }
        self.squared_error += squared_error;
    }

    /// Return the accumulated squared error and reset it for the next round.
    #[inline]
    pub fn take_squared_error(&mut self) -> f64 {
        std::mem::take(&mut self.squared_error)
    }
}

/// Forward pass for one sample.
///
/// Hidden layers store `activation(W x + b)`; the output layer stores the raw
/// weighted sum `W x + b`. Returns the output slice inside `scratch`.
pub fn forward<'a>(
    weights: &ParamTensor,
    activation: Activation,
    input: &[f64],
    scratch: &'a mut Scratch,
) -> &'a [f64] {
    assert_eq!(
        scratch.values.len(),
        weights.len(),
        "scratch has {} layers, weights have {} transitions",
        scratch.values.len(),
        weights.len()
    );
    assert_eq!(
        input.len(),
        weights.transition(0).sources(),
        "input len {} does not match input count {}",
        input.len(),
        weights.transition(0).sources()
    );

    let last = weights.len() - 1;
    for (k, t) in weights.transitions().iter().enumerate() {
        if k == 0 {
            t.forward(input, &mut scratch.values[0]);
        } else {
            // Borrow the previous layer immutably and the current one mutably.
            let (left, right) = scratch.values.split_at_mut(k);
            t.forward(&left[k - 1], &mut right[0]);
        }

        if k != last {
            for v in scratch.values[k].iter_mut() {
                *v = activation.forward(*v);
            }
        }
    }

    scratch.output()
}

/// Forward and backward pass for one `(input, target)` pair.
///
/// Afterwards `scratch` holds every layer's activations and error signals, ready to
/// be folded into a [`Gradients`] accumulator. Returns the sample's squared error
/// `sum((output - target)^2)`.
pub fn backpropagate(
    weights: &ParamTensor,
    activation: Activation,
    input: &[f64],
    target: &[f64],
    scratch: &mut Scratch,
) -> f64 {
    forward(weights, activation, input, scratch);

    let last = weights.len() - 1;
    assert_eq!(
        target.len(),
        scratch.values[last].len(),
        "target len {} does not match output count {}",
        target.len(),
        scratch.values[last].len()
    );

    let mut squared_error = 0.0;
    for ((e, &y), &t) in scratch.errors[last]
        .iter_mut()
        .zip(&scratch.values[last])
        .zip(target)
    {
        *e = y - t;
        squared_error += *e * *e;
    }

    for k in (0..last).rev() {
        let (lower, upper) = scratch.errors.split_at_mut(k + 1);
        weights.transition(k + 1).back_project(
            &upper[0],
            &scratch.values[k],
            |y| activation.grad_from_output(y),
            &mut lower[k],
        );
    }

    squared_error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WeightInit;

    fn half_squared_error(
        topo: &Topology,
        weights: &ParamTensor,
        input: &[f64],
        target: &[f64],
    ) -> f64 {
        let mut scratch = Scratch::new(topo);
        let out = forward(weights, Activation::Tanh, input, &mut scratch);
        // Gradients are those of 0.5 * sum((y - t)^2).
        0.5 * out
            .iter()
            .zip(target)
            .map(|(y, t)| (y - t) * (y - t))
            .sum::<f64>()
    }

    #[test]
    fn scratch_matches_topology() {
        let topo = Topology::new(2, 3, 4, 2);
        let scratch = Scratch::new(&topo);
        assert!(scratch.fits(&topo));
        assert_eq!(scratch.values(0).len(), 4);
        assert_eq!(scratch.values(2).len(), 3);
        assert!(!scratch.fits(&Topology::new(2, 3, 4, 3)));
    }

    #[test]
    fn output_layer_is_linear() {
        let topo = Topology::new(1, 1, 1, 1);
        let weights = ParamTensor::init(&topo, WeightInit::Uniform);
        let mut scratch = Scratch::new(&topo);
        let y = forward(&weights, Activation::Tanh, &[10.0], &mut scratch)[0];
        let h = (0.5 * 10.0 + 0.5_f64).tanh();
        assert_eq!(y, 0.5 * h + 0.5);
    }

    #[test]
    fn accumulated_gradients_match_numeric_gradients() {
        let topo = Topology::new(2, 2, 3, 2);
        let mut weights = ParamTensor::init(
            &topo,
            WeightInit::Jittered {
                seed: 3,
                scale: 0.3,
            },
        );
        let input = [0.3, -0.7];
        let target = [0.2, -0.4];

        let mut scratch = Scratch::new(&topo);
        let mut grads = Gradients::new(&topo);
        let sse = backpropagate(&weights, Activation::Tanh, &input, &target, &mut scratch);
        grads.absorb(&input, &scratch, sse);
        assert_eq!(grads.squared_error(), sse);

        let eps = 1e-6;
        for k in 0..weights.len() {
            for i in 0..weights.transition(k).values().len() {
                let orig = weights.transition(k).values()[i];
                weights.transition_mut(k).values_mut()[i] = orig + eps;
                let plus = half_squared_error(&topo, &weights, &input, &target);
                weights.transition_mut(k).values_mut()[i] = orig - eps;
                let minus = half_squared_error(&topo, &weights, &input, &target);
                weights.transition_mut(k).values_mut()[i] = orig;

                let numeric = (plus - minus) / (2.0 * eps);
                let analytic = grads.sums().transition(k).values()[i];
                assert!(
                    (numeric - analytic).abs() < 1e-6,
                    "transition {k} entry {i}: numeric={numeric} analytic={analytic}"
                );
            }
        }
    }

    #[test]
    fn absorb_sums_over_samples() {
        let topo = Topology::new(1, 1, 2, 1);
        let weights = ParamTensor::init(&topo, WeightInit::Uniform);
        let mut scratch = Scratch::new(&topo);
        let mut grads = Gradients::new(&topo);

        let sse = backpropagate(&weights, Activation::Tanh, &[0.5], &[1.0], &mut scratch);
        grads.absorb(&[0.5], &scratch, sse);
        let once = grads.sums().clone();
        grads.absorb(&[0.5], &scratch, sse);

        for (a, b) in grads.sums().iter().zip(once.iter()) {
            assert_eq!(a, 2.0 * b);
        }
        assert_eq!(grads.take_squared_error(), 2.0 * sse);
        assert_eq!(grads.squared_error(), 0.0);
    }

    #[test]
    #[should_panic]
    fn forward_panics_on_input_shape_mismatch() {
        let topo = Topology::new(2, 1, 3, 1);
        let weights = ParamTensor::init(&topo, WeightInit::Uniform);
        let mut scratch = Scratch::new(&topo);
        forward(&weights, Activation::Tanh, &[0.0; 3], &mut scratch);
    }
}
