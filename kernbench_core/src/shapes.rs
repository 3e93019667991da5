//! Small value types wrapped around native buffers.
//!
//! - [`Rectangle`] and [`RectangleSet`]: value objects and an aggregate
//!   summing a derived field.
//! - [`RangeBuffer`]: heap buffer holding a contiguous integer range with
//!   bounds-checked reads.

use crate::error::{KernelError, KernelResult};
use crate::parallel::WorkPool;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle described by its side lengths
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    width: f64,
    height: f64,
}

impl Rectangle {
    /// Sides must be finite and non-negative
    pub fn new(width: f64, height: f64) -> KernelResult<Self> {
        if !(width.is_finite() && height.is_finite()) || width < 0.0 || height < 0.0 {
            return Err(KernelError::invalid_input(format!(
                "rectangle sides must be finite and non-negative, got {} x {}",
                width, height
            )));
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Ordered collection of rectangles
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RectangleSet {
    rects: Vec<Rectangle>,
}

impl RectangleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// `n` rectangles with sides drawn uniformly from `[0, 1)`
    pub fn random(n: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let rects = (0..n)
            .map(|_| Rectangle {
                width: rng.gen(),
                height: rng.gen(),
            })
            .collect();
        Self { rects }
    }

    pub fn push(&mut self, rect: Rectangle) {
        self.rects.push(rect);
    }

    pub fn len(&self) -> usize {
        self.rects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rectangle> {
        self.rects.iter()
    }

    /// Sum of all areas
    pub fn total_area(&self) -> f64 {
        self.rects.iter().map(Rectangle::area).sum()
    }

    /// Sum of all areas computed on the pool
    pub fn total_area_parallel(&self, pool: &WorkPool) -> f64 {
        let chunk = pool.config().chunk_samples.max(1);
        pool.install(|| {
            self.rects
                .par_chunks(chunk)
                .map(|c| c.iter().map(Rectangle::area).sum::<f64>())
                .sum()
        })
    }
}

impl FromIterator<Rectangle> for RectangleSet {
    fn from_iter<I: IntoIterator<Item = Rectangle>>(iter: I) -> Self {
        Self {
            rects: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RectangleSet {
    type Item = &'a Rectangle;
    type IntoIter = std::slice::Iter<'a, Rectangle>;

    fn into_iter(self) -> Self::IntoIter {
        self.rects.iter()
    }
}

/// Fixed-capacity buffer holding the integers `start..stop`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeBuffer {
    start: i64,
    values: Box<[i64]>,
}

impl RangeBuffer {
    /// Allocate and fill the buffer.
    ///
    /// Fails for empty or inverted ranges, and when the allocation itself
    /// cannot be satisfied.
    pub fn new(start: i64, stop: i64) -> KernelResult<Self> {
        if stop <= start {
            return Err(KernelError::invalid_input(format!(
                "range buffer needs start < stop, got {}..{}",
                start, stop
            )));
        }
        let len = usize::try_from(stop.abs_diff(start))
            .map_err(|_| KernelError::Memory(format!("range {}..{} too large", start, stop)))?;

        let mut values = Vec::new();
        values.try_reserve_exact(len)?;
        values.extend(start..stop);

        Ok(Self {
            start,
            values: values.into_boxed_slice(),
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false; construction rejects empty ranges
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    /// Exclusive upper bound
    pub fn stop(&self) -> i64 {
        self.start + self.values.len() as i64
    }

    /// Value at `index`, or `None` outside `0..len`
    pub fn get(&self, index: usize) -> Option<i64> {
        self.values.get(index).copied()
    }

    /// Value at `index`, or an `IndexOutOfRange` error
    pub fn at(&self, index: usize) -> KernelResult<i64> {
        self.get(index).ok_or(KernelError::IndexOutOfRange {
            index,
            len: self.values.len(),
        })
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.values
    }

    pub fn sum(&self) -> i128 {
        self.values.iter().map(|&v| v as i128).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::ParallelConfig;
    use approx::assert_relative_eq;

    #[test]
    fn test_rectangle_area() {
        let r = Rectangle::new(3.0, 4.5).unwrap();
        assert_eq!(r.area(), 13.5);
        assert!(Rectangle::new(-1.0, 2.0).is_err());
        assert!(Rectangle::new(f64::NAN, 2.0).is_err());
        assert!(Rectangle::new(0.0, 0.0).is_ok());
    }

    #[test]
    fn test_total_area() {
        let set: RectangleSet = [(1.0, 2.0), (3.0, 4.0), (0.5, 0.5)]
            .into_iter()
            .map(|(w, h)| Rectangle::new(w, h).unwrap())
            .collect();
        assert_eq!(set.len(), 3);
        assert_eq!(set.total_area(), 14.25);
        assert_eq!(RectangleSet::new().total_area(), 0.0);
    }

    #[test]
    fn test_parallel_area_matches_serial() {
        let set = RectangleSet::random(10_000, 11);
        let pool = WorkPool::new(&ParallelConfig {
            chunk_samples: 777,
            ..ParallelConfig::with_threads(4)
        })
        .unwrap();
        assert_relative_eq!(
            set.total_area_parallel(&pool),
            set.total_area(),
            max_relative = 1e-10
        );
        assert!(set.iter().all(|r| r.width() < 1.0 && r.height() < 1.0));
    }

    #[test]
    fn test_range_buffer_contents() {
        let buf = RangeBuffer::new(-2, 3).unwrap();
        assert_eq!(buf.len(), 5);
        assert_eq!(buf.as_slice(), &[-2, -1, 0, 1, 2]);
        assert_eq!(buf.start(), -2);
        assert_eq!(buf.stop(), 3);
        assert_eq!(buf.sum(), 0);
    }

    #[test]
    fn test_range_buffer_bounds() {
        let buf = RangeBuffer::new(10, 13).unwrap();
        assert_eq!(buf.get(2), Some(12));
        assert_eq!(buf.get(3), None);
        assert_eq!(buf.get(usize::MAX), None);

        let err = buf.at(3).unwrap_err();
        assert!(err.is_out_of_range());
        assert_eq!(buf.at(0).unwrap(), 10);
    }

    #[test]
    fn test_range_buffer_rejects_empty_and_inverted() {
        assert!(RangeBuffer::new(5, 5).unwrap_err().is_invalid_input());
        assert!(RangeBuffer::new(5, 1).unwrap_err().is_invalid_input());
    }
}
