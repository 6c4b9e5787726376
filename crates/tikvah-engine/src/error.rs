use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("round length must be between 1 and 120 minutes, got {0}")]
    InvalidRoundLength(u32),
}
