/// One flat parameter array connecting two consecutive layers.
///
/// Entries are indexed `source * destinations + destination`. The bias is stored as an
/// extra source row (index `sources`) whose input value is always `1`.
///
/// The same shape is used for weights, accumulated gradients, learning rates and
/// previous gradients, so the kernels below work on any of them.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    sources: usize,
    destinations: usize,
    values: Vec<f64>,
}

impl Transition {
    #[inline]
    pub fn filled(sources: usize, destinations: usize, value: f64) -> Self {
        Self {
            sources,
            destinations,
            values: vec![value; (sources + 1) * destinations],
        }
    }

    /// Number of sources, bias excluded.
    #[inline]
    pub fn sources(&self) -> usize {
        self.sources
    }

    #[inline]
    pub fn destinations(&self) -> usize {
        self.destinations
    }

    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }

    #[inline]
    pub fn get(&self, source: usize, destination: usize) -> f64 {
        debug_assert!(source <= self.sources && destination < self.destinations);
        self.values[source * self.destinations + destination]
    }

    #[inline]
    pub fn bias(&self, destination: usize) -> f64 {
        self.get(self.sources, destination)
    }

    /// Raw weighted sums: `outputs[d] = sum_s w[s][d] * inputs[s] + bias[d]`.
    ///
    /// Sources are accumulated in index order and the bias is added last. No
    /// activation is applied here.
    ///
    /// Shape contract:
    /// - `inputs.len() == self.sources()`
    /// - `outputs.len() == self.destinations()`
    #[inline]
    pub fn forward(&self, inputs: &[f64], outputs: &mut [f64]) {
        debug_assert_eq!(inputs.len(), self.sources);
        debug_assert_eq!(outputs.len(), self.destinations);

        outputs.fill(0.0);
        for (row, &x) in self.values.chunks_exact(self.destinations).zip(inputs) {
            for (out, &w) in outputs.iter_mut().zip(row) {
                *out += w * x;
            }
        }
        let bias = &self.values[self.sources * self.destinations..];
        for (out, &b) in outputs.iter_mut().zip(bias) {
            *out += b;
        }
    }

    /// Project destination error signals back onto the sources.
    ///
    /// `d_sources[s] = (sum_d d_destinations[d] * w[s][d]) * grad(sources_out[s])`
    /// where `grad` is the derivative of the activation that produced `sources_out`.
    /// The bias row does not receive an error signal.
    #[inline]
    pub fn back_project(
        &self,
        d_destinations: &[f64],
        sources_out: &[f64],
        grad: impl Fn(f64) -> f64,
        d_sources: &mut [f64],
    ) {
        debug_assert_eq!(d_destinations.len(), self.destinations);
        debug_assert_eq!(sources_out.len(), self.sources);
        debug_assert_eq!(d_sources.len(), self.sources);

        let rows = self.values.chunks_exact(self.destinations);
        for ((d_src, &y), row) in d_sources.iter_mut().zip(sources_out).zip(rows) {
            let mut sum = 0.0;
            for (&d, &w) in d_destinations.iter().zip(row) {
                sum += d * w;
            }
            *d_src = sum * grad(y);
        }
    }

    /// Accumulate gradient contributions: `self[s][d] += d_destinations[d] * inputs[s]`,
    /// with the bias row receiving `d_destinations[d]` (its input is `1`).
    #[inline]
    pub fn accumulate(&mut self, inputs: &[f64], d_destinations: &[f64]) {
        debug_assert_eq!(inputs.len(), self.sources);
        debug_assert_eq!(d_destinations.len(), self.destinations);

        let (rows, bias) = self.values.split_at_mut(self.sources * self.destinations);
        for (row, &x) in rows.chunks_exact_mut(self.destinations).zip(inputs) {
            for (g, &d) in row.iter_mut().zip(d_destinations) {
                *g += d * x;
            }
        }
        for (g, &d) in bias.iter_mut().zip(d_destinations) {
            *g += d;
        }
    }
}
