use crate::{
    error::Error,
    record::{to_f32, to_i32, to_i64, Layout, Record},
};
use ndarray::{s, ArrayView1};
use num_traits::FromPrimitive;
use serde::{Deserialize, Serialize};

/// COCO keypoints, in the order a pose model emits them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, num_derive::FromPrimitive)]
pub enum KeypointKind {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl KeypointKind {
    pub fn idx(self) -> usize {
        self as usize
    }

    pub fn from_idx(index: usize) -> Option<Self> {
        Self::from_usize(index)
    }
}

/// Number of keypoints in the COCO skeleton.
pub const NUM_KEYPOINTS: usize = KeypointKind::RightAnkle as usize + 1;

/// Columns preceding the keypoints in a pose row.
pub const DETECTION_WIDTH: usize = 6;

/// Columns per keypoint in a pose row.
pub const POINT_WIDTH: usize = 3;

/// A single keypoint observation.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
    pub confidence: f32,
}

impl Point {
    pub fn new(x: i32, y: i32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }
}

/// A bounding box detection.
///
/// `left <= right` and `top <= bottom` are expected of the detector but never
/// checked here.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Detection {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub class_id: i32,
    pub confidence: f32,
}

impl Detection {
    pub fn new(
        left: i32,
        top: i32,
        right: i32,
        bottom: i32,
        class_id: i32,
        confidence: f32,
    ) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
            class_id,
            confidence,
        }
    }

    /// Row of `[left, top, right, bottom, confidence, class_id]`.
    pub fn to_row(&self) -> [f64; DETECTION_WIDTH] {
        [
            f64::from(self.left),
            f64::from(self.top),
            f64::from(self.right),
            f64::from(self.bottom),
            f64::from(self.confidence),
            f64::from(self.class_id),
        ]
    }

    pub fn from_row(row: &[f64]) -> Result<Self, Error> {
        Self::from_flat(row, 0)
    }
}

/// A detection plus its keypoints, one per skeleton joint in joint order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    #[serde(flatten)]
    pub detection: Detection,
    pub points: Vec<Point>,
}

impl Pose {
    pub fn new(detection: Detection, points: Vec<Point>) -> Self {
        Self { detection, points }
    }

    /// Look up a COCO joint. Returns `None` for skeletons too small to have it.
    pub fn keypoint(&self, kind: KeypointKind) -> Option<&Point> {
        self.points.get(kind.idx())
    }

    /// Iterate over keypoints paired with their COCO joint, if any.
    pub fn keypoints(&self) -> impl Iterator<Item = (Option<KeypointKind>, &Point)> {
        self.points
            .iter()
            .enumerate()
            .map(|(i, point)| (KeypointKind::from_idx(i), point))
    }
}

/// A record paired with the id a tracker assigned to it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Tracked<R> {
    pub object_id: i64,
    #[serde(flatten)]
    pub record: R,
}

impl<R> Tracked<R> {
    pub fn new(object_id: i64, record: R) -> Self {
        Self { object_id, record }
    }
}

pub type TrackedDetection = Tracked<Detection>;
pub type TrackedPose = Tracked<Pose>;

impl Record for Point {
    fn layout(_num_keypoints: usize) -> Layout {
        Layout::new("point", POINT_WIDTH)
    }

    fn flatten_into(&self, _num_keypoints: usize, row: &mut Vec<f64>) -> Result<(), Error> {
        row.extend_from_slice(&[
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.confidence),
        ]);
        Ok(())
    }

    fn read_row(row: ArrayView1<'_, f64>, _num_keypoints: usize) -> Result<Self, Error> {
        Ok(Self {
            x: to_i32(row[0])?,
            y: to_i32(row[1])?,
            confidence: to_f32(row[2])?,
        })
    }
}

impl Record for Detection {
    fn layout(_num_keypoints: usize) -> Layout {
        Layout::new("detection", DETECTION_WIDTH)
    }

    fn flatten_into(&self, _num_keypoints: usize, row: &mut Vec<f64>) -> Result<(), Error> {
        row.extend_from_slice(&self.to_row());
        Ok(())
    }

    fn read_row(row: ArrayView1<'_, f64>, _num_keypoints: usize) -> Result<Self, Error> {
        Ok(Self {
            left: to_i32(row[0])?,
            top: to_i32(row[1])?,
            right: to_i32(row[2])?,
            bottom: to_i32(row[3])?,
            confidence: to_f32(row[4])?,
            class_id: to_i32(row[5])?,
        })
    }
}

impl Record for Pose {
    fn layout(num_keypoints: usize) -> Layout {
        Layout::new("pose", DETECTION_WIDTH + POINT_WIDTH * num_keypoints)
    }

    fn flatten_into(&self, num_keypoints: usize, row: &mut Vec<f64>) -> Result<(), Error> {
        if self.points.len() != num_keypoints {
            return Err(Error::KeypointCount {
                expected: num_keypoints,
                actual: self.points.len(),
            });
        }
        self.detection.flatten_into(num_keypoints, row)?;
        self.points
            .iter()
            .try_for_each(|point| point.flatten_into(num_keypoints, row))
    }

    fn read_row(row: ArrayView1<'_, f64>, num_keypoints: usize) -> Result<Self, Error> {
        let detection = Detection::read_row(row.slice(s![..DETECTION_WIDTH]), num_keypoints)?;

        // x0, y0, c0, x1, y1, c1, ...
        let keypoint_columns = row.slice_move(s![DETECTION_WIDTH..]);
        let keypoints = keypoint_columns
            .to_shape((num_keypoints, POINT_WIDTH))
            .map_err(|e| Error::ReshapeKeypoints(e, num_keypoints))?;
        let points = keypoints
            .outer_iter()
            .map(|point| Point::read_row(point, num_keypoints))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { detection, points })
    }
}

impl<R> Record for Tracked<R>
where
    R: Record,
{
    fn layout(num_keypoints: usize) -> Layout {
        R::layout(num_keypoints).tracked()
    }

    fn flatten_into(&self, num_keypoints: usize, row: &mut Vec<f64>) -> Result<(), Error> {
        // tracker ids are far below 2^53, so the cast is exact
        row.push(self.object_id as f64);
        self.record.flatten_into(num_keypoints, row)
    }

    fn read_row(row: ArrayView1<'_, f64>, num_keypoints: usize) -> Result<Self, Error> {
        Ok(Self {
            object_id: to_i64(row[0])?,
            record: R::read_row(row.slice(s![1..]), num_keypoints)?,
        })
    }
}
