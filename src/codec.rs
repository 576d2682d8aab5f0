use crate::{
    error::Error,
    pose::{self, Point, Tracked},
    record::{to_i64, Record},
};
use ndarray::{s, Array2, ArrayView2, ArrayViewD, Ix2};
use tracing::{debug, instrument};

/// Translates between records and two-dimensional arrays of numeric rows.
///
/// The codec holds no state besides the skeleton size, so one instance can be
/// shared freely between threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, structopt::StructOpt)]
pub struct Codec {
    /// Number of keypoints in every pose.
    #[structopt(short = "k", long, default_value = "17")]
    pub num_keypoints: usize,
}

impl Default for Codec {
    fn default() -> Self {
        Self {
            num_keypoints: pose::NUM_KEYPOINTS,
        }
    }
}

impl Codec {
    pub fn new(num_keypoints: usize) -> Self {
        Self { num_keypoints }
    }

    /// Return the width of an encoded row of `R`.
    pub fn width<R: Record>(&self) -> usize {
        R::layout(self.num_keypoints).width
    }

    /// Encode records into an array with one row per record, in input order.
    #[instrument(name = "Codec::encode", skip(self, records), fields(rows = records.len()))]
    pub fn encode<R: Record>(&self, records: &[R]) -> Result<Array2<f64>, Error> {
        let width = self.width::<R>();
        let mut values = Vec::with_capacity(records.len() * width);
        for record in records {
            record.flatten_into(self.num_keypoints, &mut values)?;
        }
        let shape = (records.len(), width);
        debug!(?shape, "encoded records");
        Array2::from_shape_vec(shape, values).map_err(|e| Error::BuildArray(e, shape))
    }

    /// Decode every row of `rows` into a record, in row order.
    #[instrument(name = "Codec::decode", skip(self, rows), fields(shape = ?rows.dim()))]
    pub fn decode<R: Record>(&self, rows: ArrayView2<'_, f64>) -> Result<Vec<R>, Error> {
        R::validate_width(rows.ncols(), self.num_keypoints)?;
        rows.outer_iter()
            .map(|row| R::read_row(row, self.num_keypoints))
            .collect()
    }

    /// Decode an array of unchecked rank, rejecting anything but two dimensions.
    pub fn decode_dyn<R: Record>(&self, rows: ArrayViewD<'_, f64>) -> Result<Vec<R>, Error> {
        let ndim = rows.ndim();
        let rows = rows.into_dimensionality::<Ix2>().map_err(|_| Error::Rank {
            expected: 2,
            actual: ndim,
        })?;
        self.decode(rows)
    }

    /// Decode tracker output: column 0 holds object ids, the remaining
    /// columns hold a plain record row.
    ///
    /// Ids and records come from the same rows, so the i-th output pairs the
    /// i-th id with the i-th record.
    #[instrument(name = "Codec::decode_tracked", skip(self, rows), fields(shape = ?rows.dim()))]
    pub fn decode_tracked<R: Record>(
        &self,
        rows: ArrayView2<'_, f64>,
    ) -> Result<Vec<Tracked<R>>, Error> {
        Tracked::<R>::validate_width(rows.ncols(), self.num_keypoints)?;

        let object_ids = rows
            .column(0)
            .iter()
            .map(|&id| to_i64(id))
            .collect::<Result<Vec<_>, _>>()?;
        let records = self.decode::<R>(rows.slice(s![.., 1..]))?;

        Ok(object_ids
            .into_iter()
            .zip(records)
            .map(|(object_id, record)| Tracked { object_id, record })
            .collect())
    }

    pub fn decode_tracked_dyn<R: Record>(
        &self,
        rows: ArrayViewD<'_, f64>,
    ) -> Result<Vec<Tracked<R>>, Error> {
        let ndim = rows.ndim();
        let rows = rows.into_dimensionality::<Ix2>().map_err(|_| Error::Rank {
            expected: 2,
            actual: ndim,
        })?;
        self.decode_tracked(rows)
    }

    /// Encode a keypoint list into an `(n, 3)` array of `[x, y, confidence]`.
    pub fn encode_points(&self, points: &[Point]) -> Result<Array2<f64>, Error> {
        self.encode(points)
    }

    pub fn decode_points(&self, rows: ArrayView2<'_, f64>) -> Result<Vec<Point>, Error> {
        self.decode(rows)
    }
}
