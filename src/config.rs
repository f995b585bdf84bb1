//! Perceptron configuration.
//!
//! Everything except the topology: hidden activation, weight initialization, the
//! Super-SAB hyperparameters and the default size of the training pool.
//!
//! With the `serde` feature a configuration can be loaded from JSON; every field is
//! optional and falls back to its default:
//!
//! ```json
//! {
//!   "activation": { "kind": "tanh" },
//!   "init": { "kind": "jittered", "seed": 7, "scale": 0.05 },
//!   "learning": { "initial_rate": 0.1, "increase": 1.5, "decrease": 0.4 },
//!   "default_workers": 4
//! }
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "serde")]
use std::path::Path;

use crate::{Activation, Error, Result, SuperSab, WeightInit};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PerceptronConfig {
    /// Hidden-layer activation.
    pub activation: Activation,
    pub init: WeightInit,
    pub learning: SuperSab,
    /// Worker count used by `enable_parallel_training(0)`.
    ///
    /// `None` uses the host's available parallelism.
    pub default_workers: Option<usize>,
}

impl PerceptronConfig {
    pub fn validate(&self) -> Result<()> {
        self.activation.validate()?;
        self.init.validate()?;
        self.learning.validate()?;
        if self.default_workers == Some(0) {
            return Err(Error::InvalidConfig(
                "default_workers must be > 0 when set".to_owned(),
            ));
        }
        Ok(())
    }

    /// The worker count `enable_parallel_training(0)` resolves to.
    pub fn resolved_workers(&self) -> usize {
        self.default_workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(usize::from)
                .unwrap_or(1)
        })
    }
}

#[cfg(feature = "serde")]
impl PerceptronConfig {
    /// Parse and validate a configuration from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)
            .map_err(|e| Error::InvalidConfig(format!("failed to parse config json: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let s = std::fs::read_to_string(p)
            .map_err(|e| Error::InvalidConfig(format!("failed to read {}: {e}", p.display())))?;
        Self::from_json_str(&s)
    }

    pub fn to_json_string_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::InvalidConfig(format!("failed to serialize config: {e}")))
    }
}
