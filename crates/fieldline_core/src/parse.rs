//! Plain-text tensor sample input.
//!
//! One sample per line: `x, y, XX, YY, XY`. Numbers are separated by any run of commas,
//! spaces and tabs; lines end with any mixture of `\n` and `\r`. A line containing any
//! other character, a malformed number, or a number count other than five is skipped.

use crate::error::{FieldError, Result};
use crate::float::approx_eq;
use crate::geom::Rect;
use crate::quantity::TensorQty;
use log::debug;

const FIELDS_PER_LINE: usize = 5;

fn is_separator(c: char) -> bool {
    matches!(c, ',' | ' ' | '\t')
}

fn is_number_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E')
}

/// Numbers on one line, or `None` if the line contains anything but numbers and separators.
pub fn parse_line(line: &str) -> Option<Vec<f64>> {
    if !line.chars().all(|c| is_separator(c) || is_number_char(c)) {
        return None;
    }
    line.split(is_separator)
        .filter(|token| !token.is_empty())
        .map(|token| token.parse::<f64>().ok())
        .collect()
}

/// Parses every well-formed line into a sample. Zero tensors are dropped when
/// `discard_zero` is set.
pub fn parse_tensor_samples(input: &str, discard_zero: bool) -> Vec<TensorQty> {
    let mut samples = Vec::new();
    let mut skipped = 0usize;
    for line in input.split(['\n', '\r']) {
        if line.trim_matches(is_separator).is_empty() {
            continue;
        }
        let values = match parse_line(line) {
            Some(values) if values.len() == FIELDS_PER_LINE => values,
            _ => {
                skipped += 1;
                continue;
            }
        };
        let [x, y, xx, yy, xy] = [values[0], values[1], values[2], values[3], values[4]];
        let zero = approx_eq(xx, 0.0) && approx_eq(yy, 0.0) && approx_eq(xy, 0.0);
        if discard_zero && zero {
            continue;
        }
        samples.push(TensorQty::from_components(x, y, xx, yy, xy));
    }
    debug!("parsed {} tensor samples, skipped {skipped} lines", samples.len());
    samples
}

/// Smallest rectangle containing every sample.
pub fn bounding_rect(samples: &[TensorQty]) -> Result<Rect> {
    let first = samples.first().ok_or(FieldError::EmptyInput)?;
    let (mut xmin, mut ymin, mut xmax, mut ymax) = (first.x, first.y, first.x, first.y);
    for s in &samples[1..] {
        xmin = xmin.min(s.x);
        xmax = xmax.max(s.x);
        ymin = ymin.min(s.y);
        ymax = ymax.max(s.y);
    }
    Rect::new(xmin, ymin, xmax, ymax)
}

/// Cell counts giving roughly `avg_per_cell` samples per cell with near-square cells.
pub fn grid_resolution(rect: &Rect, sample_count: usize, avg_per_cell: f64) -> (usize, usize) {
    let density = (sample_count as f64 / (avg_per_cell * rect.area())).sqrt();
    let count = |len: f64| {
        let n = (len * density).ceil();
        if n.is_finite() && n >= 1.0 {
            n as usize
        } else {
            1
        }
    };
    (count(rect.width()), count(rect.height()))
}
