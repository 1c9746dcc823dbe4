use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The enclosing request was cancelled before every fetch settled.
    /// Partial results are discarded.
    #[error("aggregation cancelled after {settled} of {total} products settled")]
    Cancelled { settled: usize, total: usize },
}
