use tracing::debug;

use crate::{Dataset, Error, Perceptron, Result};

#[derive(Debug, Clone, Copy)]
pub struct FitConfig {
    /// Maximum number of training rounds.
    pub rounds: usize,
    /// Stop as soon as a round reports a squared error at or below this value.
    pub target_error: Option<f64>,
    /// Log progress every `log_every` rounds (`0` disables progress logging).
    pub log_every: usize,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            rounds: 100,
            target_error: None,
            log_every: 0,
        }
    }
}

impl FitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.rounds == 0 {
            return Err(Error::InvalidConfig("rounds must be > 0".to_owned()));
        }
        if let Some(target) = self.target_error {
            if !(target.is_finite() && target >= 0.0) {
                return Err(Error::InvalidConfig(format!(
                    "target_error must be finite and >= 0, got {target}"
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct FitReport {
    /// Number of rounds actually run.
    pub rounds: usize,
    /// Squared error reported by the first round.
    pub initial_error: f64,
    /// Squared error reported by the last round (before its update).
    pub final_error: f64,
    /// True if training stopped because `target_error` was reached.
    pub converged: bool,
}

impl Perceptron {
    /// Call [`Perceptron::train`] repeatedly on the same batch.
    ///
    /// Uses the worker pool if parallel training is enabled.
    pub fn fit(&mut self, batch: &Dataset, cfg: FitConfig) -> Result<FitReport> {
        cfg.validate()?;
        if batch.is_empty() {
            return Err(Error::InvalidData("batch must not be empty".to_owned()));
        }

        let mut report = FitReport {
            rounds: 0,
            initial_error: 0.0,
            final_error: 0.0,
            converged: false,
        };

        for round in 0..cfg.rounds {
            let err = self.train(batch)?;
            if round == 0 {
                report.initial_error = err;
            }
            report.rounds = round + 1;
            report.final_error = err;

            if cfg.log_every > 0 && round % cfg.log_every == 0 {
                debug!(round, squared_error = err, "fit progress");
            }
            if cfg.target_error.is_some_and(|target| err <= target) {
                report.converged = true;
                break;
            }
        }

        debug!(
            rounds = report.rounds,
            initial_error = report.initial_error,
            final_error = report.final_error,
            converged = report.converged,
            "fit finished"
        );
        Ok(report)
    }

    /// Sum of squared errors over `batch` without training.
    pub fn sum_squared_error(&self, batch: &Dataset) -> Result<f64> {
        self.enabled("sum_squared_error")?;
        self.check_batch(batch)?;

        let mut scratch = self.scratch();
        let mut out = vec![0.0; self.output_count()];
        let mut total = 0.0;
        for (input, target) in batch.iter() {
            self.evaluate_into(input, &mut scratch, &mut out)?;
            total += squared_distance(&out, target);
        }
        Ok(total)
    }

    /// Outputs for every input of `batch`, as a flat `(len, output_count)` buffer.
    pub fn predict(&self, batch: &Dataset) -> Result<Vec<f64>> {
        self.enabled("predict")?;
        if batch.input_dim() != self.input_count() {
            return Err(Error::InvalidShape(format!(
                "batch input_dim {} does not match input count {}",
                batch.input_dim(),
                self.input_count()
            )));
        }

        let out_dim = self.output_count();
        let mut scratch = self.scratch();
        let mut preds = vec![0.0; batch.len() * out_dim];
        for (idx, chunk) in preds.chunks_exact_mut(out_dim).enumerate() {
            self.evaluate_into(batch.input(idx), &mut scratch, chunk)?;
        }
        Ok(preds)
    }
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Topology;

    fn ramp() -> Dataset {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for i in 0..8 {
            let a = (i % 4) as f64 / 4.0;
            let b = (i / 4) as f64 / 4.0;
            xs.extend_from_slice(&[a, b]);
            ys.push(0.5 * (a - b));
        }
        Dataset::from_flat(xs, ys, 2, 1).unwrap()
    }

    #[test]
    fn fit_config_validation() {
        assert!(FitConfig::default().validate().is_ok());
        let zero = FitConfig {
            rounds: 0,
            ..FitConfig::default()
        };
        assert!(zero.validate().is_err());
        let nan = FitConfig {
            target_error: Some(f64::NAN),
            ..FitConfig::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn fit_reduces_error() {
        let mut p = Perceptron::new(Topology::new(2, 1, 4, 2));
        let data = ramp();
        let report = p
            .fit(
                &data,
                FitConfig {
                    rounds: 300,
                    ..FitConfig::default()
                },
            )
            .unwrap();
        assert_eq!(report.rounds, 300);
        assert!(!report.converged);
        assert!(report.final_error < report.initial_error);
        assert!(p.sum_squared_error(&data).unwrap() < report.initial_error);
    }

    #[test]
    fn fit_stops_at_target_error() {
        let mut p = Perceptron::new(Topology::new(2, 1, 4, 2));
        let report = p
            .fit(
                &ramp(),
                FitConfig {
                    rounds: 1000,
                    target_error: Some(f64::MAX),
                    log_every: 1,
                },
            )
            .unwrap();
        assert_eq!(report.rounds, 1);
        assert!(report.converged);
    }

    #[test]
    fn fit_rejects_empty_batch() {
        let mut p = Perceptron::new(Topology::new(2, 1, 2, 1));
        let empty = Dataset::empty(2, 1).unwrap();
        assert!(matches!(
            p.fit(&empty, FitConfig::default()),
            Err(Error::InvalidData(_))
        ));
    }

    #[test]
    fn sum_squared_error_matches_first_training_round() {
        let mut p = Perceptron::new(Topology::new(2, 1, 3, 1));
        let data = ramp();
        let before = p.sum_squared_error(&data).unwrap();
        let reported = p.train(&data).unwrap();
        assert!((before - reported).abs() < 1e-12);
    }

    #[test]
    fn predict_is_row_major() {
        let p = Perceptron::new(Topology::new(2, 2, 3, 1));
        let data = Dataset::from_flat(vec![0.0, 0.0, 1.0, -1.0], vec![0.0; 4], 2, 2).unwrap();
        let preds = p.predict(&data).unwrap();
        assert_eq!(preds.len(), 4);
        assert_eq!(&preds[2..], p.evaluate(&[1.0, -1.0]).unwrap().as_slice());
    }

    #[test]
    fn batch_helpers_fail_in_error_state() {
        let p = Perceptron::new(Topology::new(2, 0, 3, 1));
        let empty = Dataset::empty(2, 1).unwrap();
        assert_eq!(p.predict(&empty), Err(Error::Disabled));
        assert_eq!(p.sum_squared_error(&empty), Err(Error::Disabled));
    }
}
