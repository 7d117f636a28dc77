mod samples;

pub use samples::Samples;

use log::debug;
use ndarray::Array2;
use std::fmt::Debug;

use crate::{
    buffer::Buffer,
    components::{grid::GridGeometry, sample::SampleType},
    errors::{MosaicError, Result},
    Indexes,
};

/// Whether `value` marks an undefined sample for a band whose no-data value is `no_data`.
pub fn is_no_data(value: f64, no_data: f64) -> bool {
    value.is_nan() || value == no_data
}

/// Pixels of a grid, one plane per band.
#[derive(Clone, PartialEq)]
pub struct Raster {
    /// Always carries an explicit extent.
    geometry: GridGeometry,
    no_data: Box<[f64]>,
    samples: Samples,
}

impl Debug for Raster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Raster")
            .field("envelope", &self.geometry.envelope().rect())
            .field("shape", &self.samples.shape())
            .field("sample_type", &self.sample_type())
            .finish()
    }
}

impl Raster {
    /// Raster over `geometry` from row-major working values of shape (C, H, W).
    pub fn new(
        geometry: GridGeometry,
        sample_type: SampleType,
        no_data: impl Into<Box<[f64]>>,
        values: &Buffer<f64, 3>,
    ) -> Result<Self> {
        let geometry = geometry.resolved()?;
        let no_data = no_data.into();
        let (width, height) = geometry.extent().map(|e| e.shape()).unwrap_or_default();
        let shape = [no_data.len(), height, width];
        if values.shape() != shape {
            return Err(MosaicError::ShapeMismatch {
                len: values.len(),
                shape,
            });
        }
        Ok(Self {
            geometry,
            no_data,
            samples: Samples::from_f64(values, sample_type),
        })
    }

    /// Every sample set to its band's no-data value.
    pub fn filled_with_no_data(
        geometry: GridGeometry,
        sample_type: SampleType,
        no_data: impl Into<Box<[f64]>>,
    ) -> Result<Self> {
        let geometry = geometry.resolved()?;
        let no_data: Box<[f64]> = no_data.into();
        let (width, height) = geometry.extent().map(|e| e.shape()).unwrap_or_default();
        let plane_len = width * height;
        let values: Vec<f64> = no_data
            .iter()
            .flat_map(|marker| std::iter::repeat(*marker).take(plane_len))
            .collect();
        let values = Buffer::from_parts(values, [no_data.len(), height, width])?;
        Self::new(geometry, sample_type, no_data, &values)
    }

    pub fn geometry(&self) -> &GridGeometry {
        &self.geometry
    }

    pub fn sample_type(&self) -> SampleType {
        self.samples.sample_type()
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }

    pub fn band_count(&self) -> usize {
        self.no_data.len()
    }

    /// (width, height)
    pub fn shape(&self) -> (usize, usize) {
        let [_, height, width] = self.samples.shape();
        (width, height)
    }

    pub fn no_data(&self, band: usize) -> f64 {
        self.no_data[band]
    }

    /// Sample at grid coordinates `(col, row)` of this raster's extent.
    pub fn value(&self, band: usize, col: i64, row: i64) -> Option<f64> {
        if band >= self.band_count() {
            return None;
        }
        let extent = self.geometry.extent()?;
        let index = extent.linear_index(col, row)?;
        Some(self.samples.get(band * extent.size() + index))
    }

    /// `Some` only when the sample at `(col, row)` is defined.
    pub fn defined_value(&self, band: usize, col: i64, row: i64) -> Option<f64> {
        self.value(band, col, row)
            .filter(|value| !is_no_data(*value, self.no_data[band]))
    }

    pub fn band_values(&self, band: usize) -> Vec<f64> {
        self.samples.plane_f64(band)
    }

    /// Band as an array of shape (H, W).
    pub fn band_array(&self, band: usize) -> Result<Array2<f64>> {
        if band >= self.band_count() {
            return Err(MosaicError::BandOutOfRange {
                band,
                count: self.band_count(),
            });
        }
        let (width, height) = self.shape();
        Ok(Array2::from_shape_vec((height, width), self.band_values(band))?)
    }

    /// New raster holding only the selected bands, in selection order.
    pub fn select_bands(&self, indexes: &Indexes) -> Result<Raster> {
        if indexes.is_identity(self.band_count()) {
            return Ok(self.clone());
        }
        let selected = indexes.indexes_from(self.band_count())?;
        debug!("selecting bands {selected:?} of {self:?}");
        let (width, height) = self.shape();
        let values: Vec<f64> = selected
            .iter()
            .flat_map(|band| self.band_values(*band))
            .collect();
        let values = Buffer::from_parts(values, [selected.len(), height, width])?;
        let no_data: Box<[f64]> = selected.iter().map(|band| self.no_data[*band]).collect();
        Raster::new(self.geometry.clone(), self.sample_type(), no_data, &values)
    }
}
