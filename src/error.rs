use thiserror::Error;

// caller misuse, not a contention outcome, so it panics rather than folding
// into the bool mcas returns
#[derive(Debug, Error, PartialEq, Eq)]
pub enum McasError {
    #[error("mcas: duplicate cell in batch (the same cell was referenced by more than one triple)")]
    DuplicateCell,
}
