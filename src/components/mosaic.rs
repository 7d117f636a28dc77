//! Mosaic of sources sharing one pixel grid, copied without resampling.

use geo::Coord;
use log::{debug, info, warn};

use crate::{
    buffer::Buffer,
    components::{
        backends::MemoryRaster,
        grid::{GridGeometry, ResolutionRule},
        raster::is_no_data,
        resource::SourceRef,
        sample::SampleType,
    },
    errors::{MosaicError, Result},
    Indexes,
};

/// Largest distance, in pixels, between two grid origins still considered in phase.
const PHASE_TOLERANCE: f64 = 1e-6;

struct Placement<'a> {
    source: &'a SourceRef,
    geometry: GridGeometry,
    band_count: usize,
    sample_type: SampleType,
}

impl<'a> Placement<'a> {
    fn of(source: &'a SourceRef) -> Result<Self> {
        Ok(Self {
            source,
            geometry: source.grid_geometry()?.resolved()?,
            band_count: source.band_count()?,
            sample_type: source.sample_type()?,
        })
    }

    /// Pixel of `reference` holding this source's pixel (0, 0).
    fn offset_in(&self, reference: &GridGeometry) -> Result<(i64, i64)> {
        if !self.geometry.crs().reconciles_with(reference.crs()) {
            return Err(MosaicError::CrsMismatch {
                expected: reference.crs().to_string(),
                found: self.geometry.crs().to_string(),
            });
        }
        if !self.geometry.transform().same_linear_part(reference.transform()) {
            return Err(MosaicError::ResolutionMismatch);
        }
        let origin = self.geometry.transform().to_world(Coord { x: 0., y: 0. });
        let pixel = reference.transform().to_pixel(origin);
        let (col, row) = (pixel.x.round(), pixel.y.round());
        if (pixel.x - col).abs() > PHASE_TOLERANCE || (pixel.y - row).abs() > PHASE_TOLERANCE {
            return Err(MosaicError::Misaligned);
        }
        Ok((col as i64, row as i64))
    }
}

/// Merges sources laid on the same pixel grid into one raster covering all of them.
///
/// Pixels are copied as they are; an earlier source keeps the cells it defines and later
/// sources only fill the rest. Cells no source defines hold the band's no-data marker.
///
/// Sources that fail to report their metadata or pixels are skipped. Sources that do not
/// share the first source's crs, resolution, pixel phase and band count are an error.
pub fn merge_aligned(sources: &[SourceRef]) -> Result<MemoryRaster> {
    let placements: Vec<Placement> = sources
        .iter()
        .filter_map(|source| match Placement::of(source) {
            Ok(placement) => Some(placement),
            Err(err) => {
                warn!("skipping {source:?}, metadata unavailable: {err}");
                None
            }
        })
        .collect();
    let reference = placements.first().ok_or(MosaicError::NoEnvelope)?;
    let band_count = reference.band_count;

    let mut geometry = reference.geometry.clone();
    let mut offsets = Vec::with_capacity(placements.len());
    for placement in &placements {
        if placement.band_count != band_count {
            return Err(MosaicError::BandCountMismatch(band_count, placement.band_count));
        }
        offsets.push(placement.offset_in(&reference.geometry)?);
        geometry = geometry.union(&placement.geometry, ResolutionRule::Reference)?;
    }
    let extent = geometry.extent().ok_or(MosaicError::NoEnvelope)?;
    let (width, height) = extent.shape();
    let sample_type = SampleType::supremum(placements.iter().map(|p| p.sample_type))
        .unwrap_or(SampleType::Double);

    let mut values = Buffer::filled([band_count, height, width], f64::NAN);
    for (placement, (dx, dy)) in placements.iter().zip(offsets) {
        let raster = match placement
            .source
            .read(&placement.geometry, &Indexes::all())
        {
            Ok(raster) => raster,
            Err(err) => {
                warn!("skipping {:?}, read failed: {err}", placement.source);
                continue;
            }
        };
        let Some(own) = raster.geometry().extent() else {
            continue;
        };
        let (low, high) = (own.low(), own.high());
        let mut copied = 0;
        for band in 0..band_count {
            let marker = raster.no_data(band);
            let plane = &mut values.as_mut()[band * extent.size()..(band + 1) * extent.size()];
            for row in low.y..=high.y {
                for col in low.x..=high.x {
                    let Some(index) = extent.linear_index(col + dx, row + dy) else {
                        continue;
                    };
                    let Some(value) = raster.value(band, col, row) else {
                        continue;
                    };
                    if plane[index].is_nan() && !is_no_data(value, marker) {
                        plane[index] = value;
                        copied += 1;
                    }
                }
            }
        }
        debug!("{:?} contributed {copied} cells", placement.source);
    }

    let no_data: Vec<Option<f64>> = (0..band_count)
        .map(|band| {
            let declared = placements
                .iter()
                .find_map(|placement| placement.source.no_data(band));
            Some(sample_type.no_data_marker(declared)).filter(|marker| !marker.is_nan())
        })
        .collect();
    for (band, plane) in values.as_mut().chunks_mut(extent.size()).enumerate() {
        let marker = no_data[band].unwrap_or(f64::NAN);
        plane
            .iter_mut()
            .filter(|value| value.is_nan())
            .for_each(|value| *value = marker);
    }
    info!(
        "merged {} sources into {:?} of {sample_type}",
        placements.len(),
        extent
    );
    MemoryRaster::new(geometry, sample_type, no_data, values)
}
