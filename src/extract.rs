//! Conversion of raw detector output into records.
//!
//! Coordinates are truncated toward zero. Confidences are copied unchanged,
//! including values outside `[0, 1]`.

use crate::{
    error::Error,
    pose::{Detection, Point, Pose},
    record::to_i32,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// One box as reported by a detector.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoxObservation {
    /// `[x1, y1, x2, y2]` in pixels.
    pub xyxy: [f32; 4],
    pub conf: f32,
    pub cls: f32,
}

/// The keypoints a pose model reports for one box.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KeypointObservation {
    pub xy: Vec<[f32; 2]>,
    pub conf: Vec<f32>,
}

/// Detector output for a single frame.
pub trait FrameResult {
    /// Box detections, or `None` if the detector produced none.
    fn boxes(&self) -> Option<&[BoxObservation]>;

    /// Keypoint sets aligned by position with [`FrameResult::boxes`].
    fn keypoints(&self) -> Option<&[KeypointObservation]> {
        None
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default)]
    pub boxes: Option<Vec<BoxObservation>>,
    #[serde(default)]
    pub keypoints: Option<Vec<KeypointObservation>>,
}

impl FrameResult for Frame {
    fn boxes(&self) -> Option<&[BoxObservation]> {
        self.boxes.as_deref()
    }

    fn keypoints(&self) -> Option<&[KeypointObservation]> {
        self.keypoints.as_deref()
    }
}

/// What a detector hands back: one frame, or a batch of frames.
///
/// Only single frames can be extracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DetectorOutput<F = Frame> {
    // a JSON array is a batch, so this variant has to be tried first
    Batch(Vec<F>),
    Frame(F),
}

impl<F> DetectorOutput<F> {
    pub fn single_frame(&self) -> Result<&F, Error> {
        match self {
            Self::Frame(frame) => Ok(frame),
            Self::Batch(frames) => Err(Error::BatchInput(frames.len())),
        }
    }
}

impl<F> From<F> for DetectorOutput<F> {
    fn from(frame: F) -> Self {
        Self::Frame(frame)
    }
}

impl BoxObservation {
    fn to_detection(self) -> Result<Detection, Error> {
        let [x1, y1, x2, y2] = self.xyxy;
        Ok(Detection {
            left: to_i32(f64::from(x1))?,
            top: to_i32(f64::from(y1))?,
            right: to_i32(f64::from(x2))?,
            bottom: to_i32(f64::from(y2))?,
            class_id: to_i32(f64::from(self.cls))?,
            confidence: self.conf,
        })
    }
}

impl KeypointObservation {
    fn to_points(&self, index: usize) -> Result<Vec<Point>, Error> {
        if self.xy.len() != self.conf.len() {
            return Err(Error::KeypointScoreMismatch {
                index,
                coords: self.xy.len(),
                scores: self.conf.len(),
            });
        }
        self.xy
            .iter()
            .zip(&self.conf)
            .map(|(&[x, y], &confidence)| -> Result<Point, Error> {
                Ok(Point {
                    x: to_i32(f64::from(x))?,
                    y: to_i32(f64::from(y))?,
                    confidence,
                })
            })
            .collect()
    }
}

/// Extract one detection per box, in detector order.
#[instrument(skip(output))]
pub fn extract_detections<F>(output: &DetectorOutput<F>) -> Result<Vec<Detection>, Error>
where
    F: FrameResult,
{
    let frame = output.single_frame()?;
    let boxes = frame.boxes().ok_or(Error::MissingField("boxes"))?;
    debug!(boxes = boxes.len(), "extracting detections");
    boxes.iter().map(|b| b.to_detection()).collect()
}

/// Extract one pose per box, pairing boxes and keypoint sets by position.
#[instrument(skip(output))]
pub fn extract_poses<F>(output: &DetectorOutput<F>) -> Result<Vec<Pose>, Error>
where
    F: FrameResult,
{
    let frame = output.single_frame()?;
    let boxes = frame.boxes().ok_or(Error::MissingField("boxes"))?;
    let keypoints = frame.keypoints().ok_or(Error::MissingField("keypoints"))?;
    if boxes.len() != keypoints.len() {
        return Err(Error::BoxKeypointMismatch {
            boxes: boxes.len(),
            keypoint_sets: keypoints.len(),
        });
    }
    debug!(poses = boxes.len(), "extracting poses");

    boxes
        .iter()
        .zip(keypoints)
        .enumerate()
        .map(|(index, (b, kpts))| -> Result<Pose, Error> {
            Ok(Pose {
                detection: b.to_detection()?,
                points: kpts.to_points(index)?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        extract_detections, extract_poses, BoxObservation, DetectorOutput, Frame,
        KeypointObservation,
    };
    use crate::{
        error::ErrorKind,
        pose::{Detection, Point},
    };

    fn boxes(n: usize) -> Vec<BoxObservation> {
        (0..n)
            .map(|i| BoxObservation {
                xyxy: [10.7 + i as f32, 20.2, 30.9, 40.5],
                conf: 0.8,
                cls: 0.0,
            })
            .collect()
    }

    fn keypoint_sets(n: usize) -> Vec<KeypointObservation> {
        (0..n)
            .map(|i| KeypointObservation {
                xy: vec![[1.9, 2.1], [3.5 + i as f32, 4.0]],
                conf: vec![0.9, 0.1],
            })
            .collect()
    }

    mod detection_tests {
        use super::*;

        #[test]
        fn truncates_coordinates() {
            let output = DetectorOutput::from(Frame {
                boxes: Some(vec![BoxObservation {
                    xyxy: [10.9, 20.5, 30.1, 40.999],
                    conf: 0.75,
                    cls: 2.0,
                }]),
                keypoints: None,
            });
            let detections = extract_detections(&output).unwrap();
            assert_eq!(detections, vec![Detection::new(10, 20, 30, 40, 2, 0.75)]);
        }

        #[test]
        fn confidence_is_not_clamped() {
            let output = DetectorOutput::from(Frame {
                boxes: Some(vec![BoxObservation {
                    xyxy: [-5.5, -1.0, 3.0, 4.0],
                    conf: 1.5,
                    cls: 0.0,
                }]),
                keypoints: None,
            });
            let detections = extract_detections(&output).unwrap();
            assert_eq!(detections[0].left, -5);
            assert_eq!(detections[0].confidence, 1.5);
        }

        #[test]
        fn empty_frame() {
            let output = DetectorOutput::from(Frame {
                boxes: Some(vec![]),
                keypoints: None,
            });
            assert!(extract_detections(&output).unwrap().is_empty());
        }

        #[test]
        fn batch_is_rejected() {
            let output = DetectorOutput::Batch(vec![Frame::default(), Frame::default()]);
            let err = extract_detections(&output).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InputShape);
        }

        #[test]
        fn missing_boxes() {
            let output = DetectorOutput::from(Frame::default());
            let err = extract_detections(&output).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MissingField);
            assert_eq!(
                err.to_string(),
                "detector output is missing the `boxes` field"
            );
        }
    }

    mod pose_tests {
        use super::*;

        #[test]
        fn pairs_by_position() {
            let output = DetectorOutput::from(Frame {
                boxes: Some(boxes(2)),
                keypoints: Some(keypoint_sets(2)),
            });
            let poses = extract_poses(&output).unwrap();
            assert_eq!(poses.len(), 2);
            assert_eq!(poses[0].detection.left, 10);
            assert_eq!(poses[1].detection.left, 11);
            assert_eq!(
                poses[0].points,
                vec![Point::new(1, 2, 0.9), Point::new(3, 4, 0.1)]
            );
            assert_eq!(poses[1].points[1], Point::new(4, 4, 0.1));
        }

        #[test]
        fn mismatched_lengths_are_not_truncated() {
            let output = DetectorOutput::from(Frame {
                boxes: Some(boxes(3)),
                keypoints: Some(keypoint_sets(2)),
            });
            let err = extract_poses(&output).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InputShape);
        }

        #[test]
        fn mismatched_scores() {
            let mut sets = keypoint_sets(1);
            sets[0].conf.pop();
            let output = DetectorOutput::from(Frame {
                boxes: Some(boxes(1)),
                keypoints: Some(sets),
            });
            let err = extract_poses(&output).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InputShape);
        }

        #[test]
        fn missing_keypoints() {
            let output = DetectorOutput::from(Frame {
                boxes: Some(boxes(1)),
                keypoints: None,
            });
            let err = extract_poses(&output).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::MissingField);
        }
    }

    mod json_tests {
        use super::*;

        #[test]
        fn object_is_a_frame() {
            let output: DetectorOutput = serde_json::from_str(
                r#"{"boxes": [{"xyxy": [1.5, 2.5, 3.5, 4.5], "conf": 0.5, "cls": 1.0}]}"#,
            )
            .unwrap();
            let detections = extract_detections(&output).unwrap();
            assert_eq!(detections, vec![Detection::new(1, 2, 3, 4, 1, 0.5)]);
        }

        #[test]
        fn array_is_a_batch() {
            let output: DetectorOutput = serde_json::from_str(r#"[{"boxes": []}, {}]"#).unwrap();
            assert!(matches!(output, DetectorOutput::Batch(ref frames) if frames.len() == 2));

            let output: DetectorOutput = serde_json::from_str("[]").unwrap();
            let err = extract_detections(&output).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InputShape);
        }
    }
}
