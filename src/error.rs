/// Broad classification of an [`Error`], for callers that only care whether
/// to skip a malformed frame or a malformed row.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Detector output had the wrong granularity or misaligned collections.
    InputShape,
    /// A required collection was absent from detector output.
    MissingField,
    /// A row or record did not match the fixed layout it was checked against.
    Shape,
    /// An array had the wrong number of dimensions.
    Rank,
    /// A numeric cell could not be represented in the field's type.
    Conversion,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("expected a single frame of detector output, got a batch of {0} frames")]
    BatchInput(usize),

    #[error("detector output is missing the `{0}` field")]
    MissingField(&'static str),

    #[error("got {boxes} box detections but {keypoint_sets} keypoint sets")]
    BoxKeypointMismatch { boxes: usize, keypoint_sets: usize },

    #[error("keypoint set {index} has {coords} coordinate pairs but {scores} confidences")]
    KeypointScoreMismatch {
        index: usize,
        coords: usize,
        scores: usize,
    },

    #[error("{layout} row must have {} values, got {actual}", .layout.width)]
    RowWidth {
        layout: crate::record::Layout,
        actual: usize,
    },

    #[error("pose must have exactly {expected} keypoints, got {actual}")]
    KeypointCount { expected: usize, actual: usize },

    #[error("expected a {expected}-dimensional array, got {actual} dimensions")]
    Rank { expected: usize, actual: usize },

    #[error("failed to build array of shape {1:?}")]
    BuildArray(#[source] ndarray::ShapeError, (usize, usize)),

    #[error("failed to reshape keypoint columns into ({0}, 3)")]
    ReshapeKeypoints(#[source] ndarray::ShapeError, usize),

    #[error("failed to convert value to i32: {0}")]
    ConvertToI32(f64),

    #[error("failed to convert value to i64: {0}")]
    ConvertToI64(f64),

    #[error("failed to convert value to f32: {0}")]
    ConvertToF32(f64),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::BatchInput(_)
            | Self::BoxKeypointMismatch { .. }
            | Self::KeypointScoreMismatch { .. } => ErrorKind::InputShape,
            Self::MissingField(_) => ErrorKind::MissingField,
            Self::RowWidth { .. }
            | Self::KeypointCount { .. }
            | Self::BuildArray(..)
            | Self::ReshapeKeypoints(..) => ErrorKind::Shape,
            Self::Rank { .. } => ErrorKind::Rank,
            Self::ConvertToI32(_) | Self::ConvertToI64(_) | Self::ConvertToF32(_) => {
                ErrorKind::Conversion
            }
        }
    }
}
