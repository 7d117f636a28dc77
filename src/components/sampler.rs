//! Resampling of native source pixels onto a target grid.

use geo::Coord;

use crate::components::{
    bounds::GridExtent,
    raster::{is_no_data, Raster},
    transforms::PixelTransform,
};

/// Resampling policy used when a source is read onto a target grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    /// Value of the pixel containing the position.
    #[default]
    Nearest,
    /// Weighted mean of the four surrounding pixel centers.
    Bilinear,
}

/// One band of a native read, ready for point sampling.
pub struct SourcePlane {
    values: Vec<f64>,
    no_data: f64,
    extent: GridExtent,
    transform: PixelTransform,
}

impl SourcePlane {
    pub fn new(raster: &Raster, band: usize) -> Option<Self> {
        Some(Self {
            values: raster.band_values(band),
            no_data: raster.no_data(band),
            extent: raster.geometry().extent()?,
            transform: *raster.geometry().transform(),
        })
    }

    /// Defined sample at grid pixel `(col, row)`.
    fn pixel(&self, col: i64, row: i64) -> Option<f64> {
        let value = self.values[self.extent.linear_index(col, row)?];
        (!is_no_data(value, self.no_data)).then_some(value)
    }
}

pub trait Sampler: Send + Sync {
    /// Defined value of `plane` at `world`, `None` outside the plane or on no-data.
    fn sample(&self, plane: &SourcePlane, world: Coord) -> Option<f64>;
}

impl Sampler for Interpolation {
    fn sample(&self, plane: &SourcePlane, world: Coord) -> Option<f64> {
        let pixel = plane.transform.to_pixel(world);
        match self {
            Interpolation::Nearest => nearest(plane, pixel),
            Interpolation::Bilinear => bilinear(plane, pixel).or_else(|| nearest(plane, pixel)),
        }
    }
}

fn nearest(plane: &SourcePlane, pixel: Coord) -> Option<f64> {
    plane.pixel(pixel.x.floor() as i64, pixel.y.floor() as i64)
}

/// `None` when any of the four neighbours is missing.
fn bilinear(plane: &SourcePlane, pixel: Coord) -> Option<f64> {
    let (x, y) = (pixel.x - 0.5, pixel.y - 0.5);
    let (x0, y0) = (x.floor(), y.floor());
    let (xf, yf) = (x - x0, y - y0);
    let (col, row) = (x0 as i64, y0 as i64);

    let v00 = plane.pixel(col, row)?;
    let v10 = plane.pixel(col + 1, row)?;
    let v01 = plane.pixel(col, row + 1)?;
    let v11 = plane.pixel(col + 1, row + 1)?;

    let top = v00 * (1.0 - xf) + v10 * xf;
    let bottom = v01 * (1.0 - xf) + v11 * xf;
    Some(top * (1.0 - yf) + bottom * yf)
}
