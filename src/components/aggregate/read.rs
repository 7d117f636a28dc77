use log::{debug, info, warn};
use rayon::prelude::*;

use crate::{
    buffer::Buffer,
    components::{
        aggregate::state::AggregationState,
        band::{SourceEntry, VirtualBand},
        grid::GridGeometry,
        raster::Raster,
        sample::SampleType,
        sampler::{Interpolation, Sampler, SourcePlane},
    },
    crs_geo::Crs,
    errors::{MosaicError, Result},
    Indexes,
};

/// Everything a read needs, detached from the aggregate lock.
#[derive(Debug, Clone)]
pub struct ReadPlan {
    bands: Vec<VirtualBand>,
    working_crs: Option<Crs>,
    sample_type: SampleType,
    interpolation: Interpolation,
}

impl From<&AggregationState> for ReadPlan {
    fn from(state: &AggregationState) -> Self {
        Self {
            bands: state.bands.clone(),
            working_crs: state.working_crs().cloned(),
            sample_type: state.effective_sample_type(),
            interpolation: state.interpolation,
        }
    }
}

impl ReadPlan {
    pub fn select(mut self, indexes: &Indexes) -> Result<Self> {
        self.bands = indexes.select_from(&self.bands)?.into_vec();
        Ok(self)
    }

    fn band_no_data(&self, band: &VirtualBand) -> f64 {
        self.sample_type.no_data_marker(band.declared_no_data())
    }

    /// Composite every virtual band over `target`.
    ///
    /// Bands are composited in parallel; inside a band, entries are visited in priority
    /// order and only fill cells still undefined.
    pub fn read(&self, target: &GridGeometry) -> Result<Raster> {
        let target = target.resolved()?;
        if let Some(working) = &self.working_crs {
            if !target.crs().reconciles_with(working) {
                return Err(MosaicError::CrsMismatch {
                    expected: working.to_string(),
                    found: target.crs().to_string(),
                });
            }
        }
        let extent = target.extent().ok_or(MosaicError::NoIntersection)?;
        let (width, height) = extent.shape();
        let no_data: Vec<f64> = self.bands.iter().map(|band| self.band_no_data(band)).collect();

        // Undefined cells stay NaN while compositing, markers are written last.
        let mut buff = Buffer::filled([self.bands.len(), height, width], f64::NAN);
        if self.working_crs.is_some() {
            info!("reading {} bands over {:?}", self.bands.len(), extent);
            buff.as_mut()
                .par_chunks_mut(extent.size())
                .zip(self.bands.par_iter())
                .for_each(|(plane, band)| self.composite_band(band, &target, plane));
        }
        for (plane, marker) in buff.as_mut().chunks_mut(extent.size()).zip(&no_data) {
            plane
                .iter_mut()
                .filter(|value| value.is_nan())
                .for_each(|value| *value = *marker);
        }
        Raster::new(target, self.sample_type, no_data, &buff)
    }

    fn composite_band(&self, band: &VirtualBand, target: &GridGeometry, plane: &mut [f64]) {
        for entry in band.sources() {
            match self.composite_entry(entry, target, plane) {
                Ok(filled) => debug!("{entry:?} filled {filled} cells"),
                Err(MosaicError::NoIntersection) => debug!("{entry:?} is outside the read"),
                Err(err) => warn!("skipping {entry:?}: {err}"),
            }
        }
    }

    /// Fills the undefined cells of `plane` covered by `entry`, returns how many.
    ///
    /// Absence is decided by the source's own no-data while sampling; output markers are
    /// only written once every entry has been composited.
    fn composite_entry(
        &self,
        entry: &SourceEntry,
        target: &GridGeometry,
        plane: &mut [f64],
    ) -> Result<usize> {
        let geometry = entry.source.grid_geometry()?;
        if let Some(working) = &self.working_crs {
            if !geometry.crs().reconciles_with(working) {
                return Err(MosaicError::CrsMismatch {
                    expected: working.to_string(),
                    found: geometry.crs().to_string(),
                });
            }
        }
        let area = target.intersection(&geometry)?;
        let window = target.subgrid(&area)?;
        let (Some(target_extent), Some(window_extent)) = (target.extent(), window.extent()) else {
            return Err(MosaicError::NoIntersection);
        };

        let read = entry
            .source
            .read(&window, &Indexes::from([entry.band]))?;
        let source = SourcePlane::new(&read, 0).ok_or(MosaicError::NoIntersection)?;

        let (low, high) = (window_extent.low(), window_extent.high());
        let mut filled = 0;
        for row in low.y..=high.y {
            for col in low.x..=high.x {
                let Some(index) = target_extent.linear_index(col, row) else {
                    continue;
                };
                if !plane[index].is_nan() {
                    continue;
                }
                let world = target.transform().pixel_center(col, row);
                let Some(value) = self.interpolation.sample(&source, world) else {
                    continue;
                };
                let value = entry.apply(value);
                if !value.is_nan() {
                    plane[index] = value;
                    filled += 1;
                }
            }
        }
        Ok(filled)
    }
}
