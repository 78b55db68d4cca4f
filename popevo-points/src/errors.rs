use popevo::NetworkError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PointsError {
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("class {class} out of range for {classes} classes")]
    ClassOutOfRange { class: usize, classes: usize },
    #[error("point dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("network output width {found} doesn't match class count {expected}")]
    ClassCountMismatch { expected: usize, found: usize },
    #[error("attempted evaluation against an empty point set")]
    NoPoints,
    #[error("batch size must be positive")]
    InvalidBatchSize,
}
