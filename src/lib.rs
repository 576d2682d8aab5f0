//! Conversion between detection and pose records and flat numeric rows.
//!
//! Row layouts, by column:
//!
//! | record    | columns                                                   |
//! |-----------|-----------------------------------------------------------|
//! | detection | `left, top, right, bottom, confidence, class_id`          |
//! | pose      | detection columns, then `x, y, confidence` per keypoint   |
//! | tracked   | `object_id`, then the detection or pose columns           |

pub mod codec;
pub mod error;
pub mod extract;
pub mod pose;
pub mod record;

pub use crate::codec::Codec;
pub use crate::error::{Error, ErrorKind};
pub use crate::extract::{
    extract_detections, extract_poses, BoxObservation, DetectorOutput, Frame, FrameResult,
    KeypointObservation,
};
pub use crate::pose::{
    Detection, KeypointKind, Point, Pose, Tracked, TrackedDetection, TrackedPose, NUM_KEYPOINTS,
};
pub use crate::record::{Layout, Record, LAYOUT_VERSION};
