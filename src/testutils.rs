use std::sync::Arc;

use crate::{
    components::{
        backends::MemoryRaster,
        grid::GridGeometry,
        raster::Raster,
        resource::{RasterResource, SourceRef},
        sample::SampleType,
    },
    crs_geo::Crs,
    errors::{MosaicError, Result},
    Indexes,
};

pub const WGS84: &str = "EPSG:4326";

/// North-up WGS84 grid with square pixels, `origin` being the top left corner.
pub fn grid(origin: (f64, f64), resolution: f64, shape: (usize, usize)) -> GridGeometry {
    GridGeometry::north_up(origin, (resolution, resolution), shape, Crs::new(WGS84)).unwrap()
}

pub fn source(
    geometry: GridGeometry,
    sample_type: SampleType,
    no_data: Option<f64>,
    bands: Vec<Vec<f64>>,
) -> SourceRef {
    Arc::new(MemoryRaster::from_bands(geometry, sample_type, no_data, bands).unwrap()).into()
}

/// Single band `Double` source without declared no-data.
pub fn memory_source(
    origin: (f64, f64),
    resolution: f64,
    shape: (usize, usize),
    values: Vec<f64>,
) -> SourceRef {
    source(grid(origin, resolution, shape), SampleType::Double, None, vec![values])
}

pub fn constant_source(origin: (f64, f64), shape: (usize, usize), value: f64) -> SourceRef {
    memory_source(origin, 1., shape, vec![value; shape.0 * shape.1])
}

/// Source without georeferencing.
pub fn image_source(shape: (usize, usize), value: f64) -> SourceRef {
    let geometry = GridGeometry::north_up((0., 0.), (1., 1.), shape, Crs::Image).unwrap();
    source(
        geometry,
        SampleType::Double,
        None,
        vec![vec![value; shape.0 * shape.1]],
    )
}

/// Resource whose reads always fail, and whose geometry fails when it has none.
#[derive(Debug)]
pub struct FailingResource {
    geometry: Option<GridGeometry>,
}

impl FailingResource {
    pub fn without_geometry() -> Self {
        Self { geometry: None }
    }

    pub fn unreadable(geometry: GridGeometry) -> Self {
        Self {
            geometry: Some(geometry),
        }
    }
}

impl RasterResource for FailingResource {
    fn grid_geometry(&self) -> Result<GridGeometry> {
        self.geometry
            .clone()
            .ok_or_else(|| MosaicError::unavailable("geometry lookup failed"))
    }

    fn sample_type(&self) -> Result<SampleType> {
        Ok(SampleType::Float)
    }

    fn band_count(&self) -> Result<usize> {
        Ok(1)
    }

    fn no_data(&self, _band: usize) -> Option<f64> {
        None
    }

    fn read(&self, _area: &GridGeometry, _bands: &Indexes) -> Result<Raster> {
        Err(MosaicError::unavailable("read failed"))
    }
}

pub fn failing_source() -> SourceRef {
    Arc::new(FailingResource::without_geometry()).into()
}

pub fn unreadable_source(geometry: GridGeometry) -> SourceRef {
    Arc::new(FailingResource::unreadable(geometry)).into()
}
