use crate::error::Error;
use ndarray::ArrayView1;
use num_traits::ToPrimitive;
use std::fmt;

/// Version of the column layouts produced by this crate.
pub const LAYOUT_VERSION: u16 = 1;

/// Named, versioned description of the numeric row a record type encodes to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Layout {
    pub record: &'static str,
    pub tracked: bool,
    pub version: u16,
    pub width: usize,
}

impl Layout {
    pub const fn new(record: &'static str, width: usize) -> Self {
        Self {
            record,
            tracked: false,
            version: LAYOUT_VERSION,
            width,
        }
    }

    /// The same layout with a leading object id column.
    pub const fn tracked(self) -> Self {
        Self {
            tracked: true,
            width: self.width + 1,
            ..self
        }
    }

    pub fn validate_width(&self, actual: usize) -> Result<(), Error> {
        if actual != self.width {
            Err(Error::RowWidth {
                layout: *self,
                actual,
            })
        } else {
            Ok(())
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.tracked {
            write!(f, "tracked ")?;
        }
        write!(f, "{} (v{})", self.record, self.version)
    }
}

/// A record that flattens to, and rebuilds from, one fixed-width numeric row.
///
/// `num_keypoints` is the configured skeleton size; records without keypoints
/// ignore it.
pub trait Record: Sized {
    /// Return the layout of a row of this record.
    fn layout(num_keypoints: usize) -> Layout;

    /// Append this record's values to `row` in layout order.
    fn flatten_into(&self, num_keypoints: usize, row: &mut Vec<f64>) -> Result<(), Error>;

    /// Rebuild a record from a row whose width has already been validated.
    fn read_row(row: ArrayView1<'_, f64>, num_keypoints: usize) -> Result<Self, Error>;

    /// Validate that a row has the width this record's layout expects.
    fn validate_width(width: usize, num_keypoints: usize) -> Result<(), Error> {
        Self::layout(num_keypoints).validate_width(width)
    }

    /// Flatten this record into a freshly allocated row.
    fn flatten(&self, num_keypoints: usize) -> Result<Vec<f64>, Error> {
        let mut row = Vec::with_capacity(Self::layout(num_keypoints).width);
        self.flatten_into(num_keypoints, &mut row)?;
        Ok(row)
    }

    /// Rebuild a record from a row of any width, rejecting the wrong width.
    fn unflatten(row: ArrayView1<'_, f64>, num_keypoints: usize) -> Result<Self, Error> {
        Self::validate_width(row.len(), num_keypoints)?;
        Self::read_row(row, num_keypoints)
    }

    fn from_flat(values: &[f64], num_keypoints: usize) -> Result<Self, Error> {
        Self::unflatten(ArrayView1::from(values), num_keypoints)
    }
}

// Float to integer conversions truncate toward zero. Values that have no
// integer representation are errors rather than saturating.

pub(crate) fn to_i32(value: f64) -> Result<i32, Error> {
    value.to_i32().ok_or(Error::ConvertToI32(value))
}

pub(crate) fn to_i64(value: f64) -> Result<i64, Error> {
    value.to_i64().ok_or(Error::ConvertToI64(value))
}

pub(crate) fn to_f32(value: f64) -> Result<f32, Error> {
    value.to_f32().ok_or(Error::ConvertToF32(value))
}

#[cfg(test)]
mod tests {
    use super::{to_i32, to_i64, Layout, LAYOUT_VERSION};
    use crate::error::ErrorKind;

    mod layout_tests {
        use super::*;

        #[test]
        fn tracked_adds_a_column() {
            let layout = Layout::new("pose", 57).tracked();
            assert!(layout.tracked);
            assert_eq!(layout.width, 58);
            assert_eq!(layout.version, LAYOUT_VERSION);
            assert_eq!(layout.to_string(), "tracked pose (v1)");
        }

        #[test]
        fn validate_width() {
            let layout = Layout::new("detection", 6);
            assert!(layout.validate_width(6).is_ok());
            let err = layout.validate_width(7).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Shape);
            assert_eq!(
                err.to_string(),
                "detection (v1) row must have 6 values, got 7"
            );
        }
    }

    mod truncation_tests {
        use super::*;

        #[test]
        fn truncates_toward_zero() {
            assert_eq!(to_i32(10.9).unwrap(), 10);
            assert_eq!(to_i32(-3.7).unwrap(), -3);
            assert_eq!(to_i32(-0.5).unwrap(), 0);
            assert_eq!(to_i64(7.999).unwrap(), 7);
        }

        #[test]
        fn rejects_unrepresentable() {
            assert_eq!(to_i32(f64::NAN).unwrap_err().kind(), ErrorKind::Conversion);
            assert_eq!(
                to_i32(f64::INFINITY).unwrap_err().kind(),
                ErrorKind::Conversion
            );
            assert_eq!(to_i32(1e12).unwrap_err().kind(), ErrorKind::Conversion);
        }
    }
}
