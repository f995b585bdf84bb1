use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("invalid shape: {0}")]
    InvalidShape(String),
    #[error("invalid data: {0}")]
    InvalidData(String),
    /// The perceptron was built from invalid parameters and has no weights.
    #[error("perceptron is in an error state")]
    Disabled,
    #[error("failed to spawn training worker: {0}")]
    WorkerSpawn(String),
    #[error("no training worker is available")]
    WorkersUnavailable,
}

pub type Result<T> = std::result::Result<T, Error>;
