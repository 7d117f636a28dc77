use geo::{Coord, Rect};
use shrinkwraprs::Shrinkwrap;

use crate::{
    crs_geo::{Crs, CrsGeometry},
    errors::Result,
    intersection::{Intersection, Union},
};

/// Tolerance, in pixels, under which a fractional pixel bound snaps to the nearest integer.
const PIXEL_SNAP: f64 = 1e-6;

/// Bounds of a grid in 'geospace', tagged with its crs.
#[derive(Shrinkwrap, Clone, Debug, PartialEq)]
pub struct Envelope(CrsGeometry<Rect<f64>>);

impl Envelope {
    pub fn new(crs: Crs, rect: Rect<f64>) -> Self {
        Self(CrsGeometry::new(crs, rect))
    }

    pub fn rect(&self) -> Rect<f64> {
        *self.0.geometry()
    }

    pub fn contains(&self, other: &Envelope) -> bool {
        let (outer, inner) = (self.rect(), other.rect());
        outer.min().x <= inner.min().x
            && outer.min().y <= inner.min().y
            && outer.max().x >= inner.max().x
            && outer.max().y >= inner.max().y
    }
}

impl Intersection for Envelope {
    type Output = Envelope;
    fn intersection(&self, rhs: &Self) -> Result<Self::Output> {
        Ok(Envelope(self.0.intersection(&rhs.0)?))
    }
}

impl Union for Envelope {
    type Output = Envelope;
    fn union(&self, rhs: &Self) -> Self::Output {
        Envelope(self.0.union(&rhs.0))
    }
}

/// Integer pixel bounding box of a grid.
///
/// The underlying rect is half open: `min` is the first pixel, `max` one past the last.
/// [GridExtent::low] and [GridExtent::high] report inclusive bounds.
#[derive(Shrinkwrap, Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridExtent(Rect<i64>);

impl GridExtent {
    /// Extent of `shape = (width, height)` pixels starting at `offset = (col, row)`.
    pub fn new(offset: (i64, i64), shape: (usize, usize)) -> Self {
        let max = (offset.0 + shape.0 as i64, offset.1 + shape.1 as i64);
        Self(Rect::new(offset, max))
    }

    /// Smallest extent covering every pixel touched by a fractional pixel rect.
    pub fn covering(pixels: Rect<f64>) -> Option<Self> {
        let (min, max) = (pixels.min(), pixels.max());
        let snap_down = |v: f64| (v + PIXEL_SNAP).floor() as i64;
        let snap_up = |v: f64| (v - PIXEL_SNAP).ceil() as i64;
        let low = (snap_down(min.x), snap_down(min.y));
        let high = (snap_up(max.x), snap_up(max.y));
        if high.0 <= low.0 || high.1 <= low.1 {
            return None;
        }
        Some(Self(Rect::new(low, high)))
    }

    /// Inclusive lower corner.
    pub fn low(&self) -> Coord<i64> {
        self.0.min()
    }

    /// Inclusive upper corner.
    pub fn high(&self) -> Coord<i64> {
        self.0.max() - Coord { x: 1, y: 1 }
    }

    /// (width, height)
    pub fn shape(&self) -> (usize, usize) {
        (self.0.width() as usize, self.0.height() as usize)
    }

    /// Pixel count.
    pub fn size(&self) -> usize {
        let (width, height) = self.shape();
        width * height
    }

    pub fn as_pixel_rect(&self) -> Rect<f64> {
        let (min, max) = (self.0.min(), self.0.max());
        Rect::new(
            (min.x as f64, min.y as f64),
            (max.x as f64, max.y as f64),
        )
    }

    pub fn contains(&self, col: i64, row: i64) -> bool {
        let (min, max) = (self.0.min(), self.0.max());
        (min.x..max.x).contains(&col) && (min.y..max.y).contains(&row)
    }

    /// Offset of `(col, row)` in a row-major buffer of this extent.
    pub fn linear_index(&self, col: i64, row: i64) -> Option<usize> {
        if !self.contains(col, row) {
            return None;
        }
        let low = self.low();
        let (width, _) = self.shape();
        Some((row - low.y) as usize * width + (col - low.x) as usize)
    }
}

impl Intersection for GridExtent {
    type Output = GridExtent;
    fn intersection(&self, rhs: &Self) -> Result<Self::Output> {
        Ok(GridExtent(self.0.intersection(&rhs.0)?))
    }
}
