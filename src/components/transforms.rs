use geo::{AffineTransform, Coord, Rect};
use shrinkwraprs::Shrinkwrap;

use crate::errors::{MosaicError, Result};

/// Relative tolerance used when comparing transform coefficients.
pub const TRANSFORM_TOLERANCE: f64 = 1e-9;

/// Affine mapping from pixel corner coordinates `(col, row)` to world coordinates.
///
/// Pixel `(i, j)` covers `[i, i + 1) x [j, j + 1)` in pixel space, so its
/// center is at `(i + 0.5, j + 0.5)`.
#[derive(Shrinkwrap, Debug, Clone, Copy, PartialEq)]
pub struct PixelTransform(AffineTransform);

impl PixelTransform {
    /// Same coefficient order as `geo::AffineTransform::new`.
    pub fn new(a: f64, b: f64, xoff: f64, d: f64, e: f64, yoff: f64) -> Result<Self> {
        let transform = AffineTransform::new(a, b, xoff, d, e, yoff);
        transform.inverse().ok_or(MosaicError::NotInvertible)?;
        Ok(Self(transform))
    }

    /// North-up transform: `origin` is the world position of the top left pixel corner,
    /// rows grow toward decreasing y.
    pub fn north_up(origin: impl Into<Coord>, resolution: impl Into<Coord>) -> Result<Self> {
        let (origin, resolution) = (origin.into(), resolution.into());
        Self::new(resolution.x, 0., origin.x, 0., -resolution.y, origin.y)
    }

    /// From a gdal style `[xoff, a, b, yoff, d, e]` geo transform.
    pub fn from_gdal(gdal_transform: [f64; 6]) -> Result<Self> {
        Self::new(
            gdal_transform[1],
            gdal_transform[2],
            gdal_transform[0],
            gdal_transform[4],
            gdal_transform[5],
            gdal_transform[3],
        )
    }

    pub fn to_world(&self, pixel: Coord) -> Coord {
        self.0.apply(pixel)
    }

    pub fn to_pixel(&self, world: Coord) -> Coord {
        self.inverse().apply(world)
    }

    fn inverse(&self) -> AffineTransform {
        // Invertibility is checked on construction and kept by every rescale.
        self.0.inverse().unwrap_or(self.0)
    }

    /// World position of the pixel center at `(col, row)`.
    pub fn pixel_center(&self, col: i64, row: i64) -> Coord {
        self.to_world(Coord {
            x: col as f64 + 0.5,
            y: row as f64 + 0.5,
        })
    }

    /// Per axis pixel size, positive whatever the sign of the coefficients.
    pub fn resolution(&self) -> Coord {
        Coord {
            x: self.0.a().hypot(self.0.d()),
            y: self.0.b().hypot(self.0.e()),
        }
    }

    /// Same orientation and origin, with the per axis pixel size set to `resolution`.
    pub fn with_resolution(&self, resolution: Coord) -> Self {
        let current = self.resolution();
        let (sx, sy) = (resolution.x / current.x, resolution.y / current.y);
        let t = &self.0;
        Self(AffineTransform::new(
            t.a() * sx,
            t.b() * sy,
            t.xoff(),
            t.d() * sx,
            t.e() * sy,
            t.yoff(),
        ))
    }

    /// Bounding box in world space of a pixel space rect.
    pub fn world_bounds(&self, pixels: Rect<f64>) -> Rect<f64> {
        bounding_box(corners(pixels).map(|corner| self.to_world(corner)))
    }

    /// Bounding box in pixel space of a world space rect.
    ///
    /// Min and max are taken after the transform, so flipped axes are handled.
    pub fn pixel_bounds(&self, world: Rect<f64>) -> Rect<f64> {
        let inverse = self.inverse();
        bounding_box(corners(world).map(|corner| inverse.apply(corner)))
    }

    /// Whether `other` has the same linear part, so both grids only differ by a translation.
    pub fn same_linear_part(&self, other: &PixelTransform) -> bool {
        let (lhs, rhs) = (&self.0, &other.0);
        [
            (lhs.a(), rhs.a()),
            (lhs.b(), rhs.b()),
            (lhs.d(), rhs.d()),
            (lhs.e(), rhs.e()),
        ]
        .into_iter()
        .all(|(l, r)| approx_eq(l, r))
    }

    pub fn approx_eq(&self, other: &PixelTransform) -> bool {
        self.same_linear_part(other)
            && approx_eq(self.0.xoff(), other.0.xoff())
            && approx_eq(self.0.yoff(), other.0.yoff())
    }
}

pub fn approx_eq(lhs: f64, rhs: f64) -> bool {
    let scale = lhs.abs().max(rhs.abs()).max(1.);
    (lhs - rhs).abs() <= TRANSFORM_TOLERANCE * scale
}

fn corners(rect: Rect<f64>) -> [Coord; 4] {
    let (min, max) = (rect.min(), rect.max());
    [
        min,
        Coord { x: max.x, y: min.y },
        max,
        Coord { x: min.x, y: max.y },
    ]
}

fn bounding_box(points: [Coord; 4]) -> Rect<f64> {
    let (mut min, mut max) = (points[0], points[0]);
    for point in &points[1..] {
        min.x = min.x.min(point.x);
        min.y = min.y.min(point.y);
        max.x = max.x.max(point.x);
        max.y = max.y.max(point.y);
    }
    Rect::new(min, max)
}
