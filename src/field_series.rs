// src/field_series.rs

use std::fs;
use std::path::Path;

use tracing::warn;

use crate::error::{CompareError, Result};

/// Time series of 1D field snapshots stored as a dense row-major array.
/// Row `t` is the snapshot at time step `t`, column `x` the spatial sample.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSeries {
    n_frames: usize,
    n_points: usize,
    data: Vec<f64>,
}

impl FieldSeries {
    /// Build a series from a flat row-major buffer.
    pub fn from_rows(n_frames: usize, n_points: usize, data: Vec<f64>) -> Result<Self> {
        if n_frames == 0 || n_points == 0 {
            return Err(CompareError::Empty);
        }
        if data.len() != n_frames * n_points {
            return Err(CompareError::Config(format!(
                "buffer length {} does not match {} x {}",
                data.len(),
                n_frames,
                n_points
            )));
        }
        Ok(Self {
            n_frames,
            n_points,
            data,
        })
    }

    /// Parse whitespace-separated floats, one snapshot per line.
    ///
    /// Blank lines and `#` comments are skipped. All rows must be the same width.
    pub fn parse_txt(text: &str) -> Result<Self> {
        let mut data: Vec<f64> = Vec::new();
        let mut n_points: usize = 0;
        let mut n_frames: usize = 0;

        for (line_idx, raw) in text.lines().enumerate() {
            let line_no = line_idx + 1;
            let body = match raw.find('#') {
                Some(pos) => &raw[..pos],
                None => raw,
            };

            let row_start = data.len();
            for (col, token) in body.split_whitespace().enumerate() {
                let v = token.parse::<f64>().map_err(|_| CompareError::Parse {
                    line: line_no,
                    column: col + 1,
                    token: token.to_string(),
                })?;
                data.push(v);
            }

            let found = data.len() - row_start;
            if found == 0 {
                continue;
            }
            if n_frames == 0 {
                n_points = found;
            } else if found != n_points {
                return Err(CompareError::RaggedRow {
                    line: line_no,
                    expected: n_points,
                    found,
                });
            }
            n_frames += 1;
        }

        if n_frames == 0 {
            return Err(CompareError::Empty);
        }

        Ok(Self {
            n_frames,
            n_points,
            data,
        })
    }

    /// Read and parse a plain-text snapshot file.
    pub fn load_txt(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| CompareError::read(path, e))?;
        Self::parse_txt(&text).map_err(|e| CompareError::InFile {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
    }

    /// Restrict to columns `start..end`. `end` is clamped to the row width.
    pub fn window(&self, start: usize, end: usize) -> Result<Self> {
        let clamped_end = end.min(self.n_points);
        if clamped_end < end {
            warn!(
                "column window {}..{} clamped to {}..{} ({} points per row)",
                start, end, start, clamped_end, self.n_points
            );
        }
        if start >= clamped_end {
            return Err(CompareError::EmptyWindow {
                start,
                end,
                n_points: self.n_points,
            });
        }

        let width = clamped_end - start;
        let mut data = Vec::with_capacity(self.n_frames * width);
        for t in 0..self.n_frames {
            data.extend_from_slice(&self.frame(t)[start..clamped_end]);
        }

        Ok(Self {
            n_frames: self.n_frames,
            n_points: width,
            data,
        })
    }

    pub fn n_frames(&self) -> usize {
        self.n_frames
    }

    pub fn n_points(&self) -> usize {
        self.n_points
    }

    /// Snapshot at time step `t`.
    #[inline]
    pub fn frame(&self, t: usize) -> &[f64] {
        let off = t * self.n_points;
        &self.data[off..off + self.n_points]
    }

    #[inline]
    pub fn value(&self, t: usize, x: usize) -> f64 {
        debug_assert!(t < self.n_frames && x < self.n_points);
        self.data[t * self.n_points + x]
    }

    /// Min/max over all finite samples, or `None` if there are none.
    pub fn finite_range(&self) -> Option<(f64, f64)> {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &v in &self.data {
            if v.is_finite() {
                lo = lo.min(v);
                hi = hi.max(v);
            }
        }
        if lo.is_finite() && hi.is_finite() {
            Some((lo, hi))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_skips_comments_and_blank_lines() {
        let text = "# header\n1 2 3\n\n4 5 6 # trailing\n   \n7 8 9\n";
        let s = FieldSeries::parse_txt(text).unwrap();
        assert_eq!(s.n_frames(), 3);
        assert_eq!(s.n_points(), 3);
        assert_eq!(s.frame(1), &[4.0, 5.0, 6.0]);
        assert_eq!(s.value(2, 0), 7.0);
    }

    #[test]
    fn parse_accepts_scientific_and_nan() {
        let s = FieldSeries::parse_txt("1.5e-3 -2E2 nan\n").unwrap();
        assert_eq!(s.value(0, 0), 1.5e-3);
        assert_eq!(s.value(0, 1), -200.0);
        assert!(s.value(0, 2).is_nan());
    }

    #[test]
    fn ragged_rows_are_rejected_with_line_number() {
        let err = FieldSeries::parse_txt("1 2 3\n# c\n4 5\n").unwrap_err();
        match err {
            CompareError::RaggedRow {
                line,
                expected,
                found,
            } => {
                assert_eq!(line, 3);
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_token_reports_position() {
        let err = FieldSeries::parse_txt("1 2\n3 abc\n").unwrap_err();
        match err {
            CompareError::Parse { line, column, token } => {
                assert_eq!((line, column), (2, 2));
                assert_eq!(token, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(
            FieldSeries::parse_txt("# only a comment\n\n"),
            Err(CompareError::Empty)
        ));
    }

    #[test]
    fn window_slices_every_row() {
        let s = FieldSeries::parse_txt("0 1 2 3 4\n10 11 12 13 14\n").unwrap();
        let w = s.window(1, 4).unwrap();
        assert_eq!(w.n_points(), 3);
        assert_eq!(w.frame(0), &[1.0, 2.0, 3.0]);
        assert_eq!(w.frame(1), &[11.0, 12.0, 13.0]);
    }

    #[test]
    fn window_end_is_clamped_like_slicing() {
        let s = FieldSeries::parse_txt("0 1 2 3 4\n").unwrap();
        let w = s.window(3, 100).unwrap();
        assert_eq!(w.frame(0), &[3.0, 4.0]);

        assert!(matches!(
            s.window(5, 10),
            Err(CompareError::EmptyWindow { .. })
        ));
    }

    #[test]
    fn finite_range_ignores_nan_and_inf() {
        let s = FieldSeries::parse_txt("nan -0.5 inf\n0.25 -inf 0.75\n").unwrap();
        assert_eq!(s.finite_range(), Some((-0.5, 0.75)));

        let all_nan = FieldSeries::parse_txt("nan nan\n").unwrap();
        assert_eq!(all_nan.finite_range(), None);
    }
}
