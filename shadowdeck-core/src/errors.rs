use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Answer qualities are 1 (Again) through 4 (Easy).
    #[error("invalid quality: {0} (expected 1-4)")]
    InvalidQuality(u8),
    #[error("invalid input: {0}")]
    Invalid(&'static str),
    /// A store read or write failed. In-memory scheduler state is left as it was
    /// after the mutation that triggered the write.
    #[error("persistence error: {0}")]
    Persistence(String),
}

impl CoreError {
    pub fn persistence(e: impl std::fmt::Display) -> Self {
        CoreError::Persistence(e.to_string())
    }
}
