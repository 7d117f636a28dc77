use log::debug;
use std::sync::Arc;

use crate::{
    buffer::Buffer,
    components::{
        grid::GridGeometry,
        raster::Raster,
        resource::RasterResource,
        sample::SampleType,
    },
    errors::{MosaicError, Result},
    Indexes,
};

/// No-data markers of a read: declared values, NaN where a band declares none.
fn markers(no_data: &[Option<f64>], bands: &[usize]) -> Box<[f64]> {
    bands
        .iter()
        .map(|band| no_data[*band].unwrap_or(f64::NAN))
        .collect()
}

/// Area of `area` covered by `geometry`, on `geometry`'s own grid.
fn read_window(geometry: &GridGeometry, area: &GridGeometry) -> Result<GridGeometry> {
    if !area.crs().reconciles_with(geometry.crs()) {
        return Err(MosaicError::CrsMismatch {
            expected: geometry.crs().to_string(),
            found: area.crs().to_string(),
        });
    }
    geometry.subgrid(area.envelope())
}

/// Raster held in memory.
#[derive(Debug, Clone)]
pub struct MemoryRaster {
    geometry: GridGeometry,
    sample_type: SampleType,
    no_data: Box<[Option<f64>]>,
    values: Arc<Buffer<f64, 3>>,
}

impl MemoryRaster {
    /// `values` has shape (C, H, W) matching the extent of `geometry`.
    pub fn new(
        geometry: GridGeometry,
        sample_type: SampleType,
        no_data: impl Into<Box<[Option<f64>]>>,
        values: Buffer<f64, 3>,
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
            sample_type,
            no_data,
            values: Arc::new(values),
        })
    }

    /// One row-major plane per band.
    pub fn from_bands(
        geometry: GridGeometry,
        sample_type: SampleType,
        no_data: Option<f64>,
        bands: Vec<Vec<f64>>,
    ) -> Result<Self> {
        let (width, height) = geometry
            .resolved()?
            .extent()
            .map(|e| e.shape())
            .unwrap_or_default();
        let count = bands.len();
        let values = Buffer::from_parts(bands.concat(), [count, height, width])?;
        Self::new(geometry, sample_type, vec![no_data; count], values)
    }
}

impl RasterResource for MemoryRaster {
    fn grid_geometry(&self) -> Result<GridGeometry> {
        Ok(self.geometry.clone())
    }

    fn sample_type(&self) -> Result<SampleType> {
        Ok(self.sample_type)
    }

    fn band_count(&self) -> Result<usize> {
        Ok(self.no_data.len())
    }

    fn no_data(&self, band: usize) -> Option<f64> {
        self.no_data.get(band).copied().flatten()
    }

    fn read(&self, area: &GridGeometry, bands: &Indexes) -> Result<Raster> {
        let bands = bands.indexes_from(self.no_data.len())?;
        let window = read_window(&self.geometry, area)?;
        let (Some(own), Some(extent)) = (self.geometry.extent(), window.extent()) else {
            return Err(MosaicError::NoIntersection);
        };
        debug!("reading {:?} of memory raster {:?}", extent, own);
        let (low, high) = (extent.low(), extent.high());
        let mut values = Vec::with_capacity(bands.len() * extent.size());
        for band in bands.iter() {
            let plane = self.values.plane(*band);
            for row in low.y..=high.y {
                // Window is clipped to the own extent, so both ends index into the plane.
                let start = own.linear_index(low.x, row).unwrap_or_default();
                let end = own.linear_index(high.x, row).unwrap_or_default();
                values.extend_from_slice(&plane[start..=end]);
            }
        }
        let (width, height) = extent.shape();
        let values = Buffer::from_parts(values, [bands.len(), height, width])?;
        Raster::new(window, self.sample_type, markers(&self.no_data, &bands), &values)
    }
}

/// Implementations for gdal
#[cfg(feature = "gdal")]
pub mod gdal_backend {
    use super::*;
    use crate::components::{
        bounds::GridExtent,
        sample::NativeType,
        transforms::PixelTransform,
    };
    use crate::crs_geo::Crs;
    use gdal::{raster::GdalDataType, Dataset as GdalDataset};
    use std::path::Path;

    fn native_type(data_type: GdalDataType) -> NativeType {
        match data_type {
            GdalDataType::UInt8 => NativeType::U8,
            GdalDataType::Int8 => NativeType::I8,
            GdalDataType::UInt16 => NativeType::U16,
            GdalDataType::Int16 => NativeType::I16,
            GdalDataType::UInt32 => NativeType::U32,
            GdalDataType::Int32 => NativeType::I32,
            GdalDataType::UInt64 => NativeType::U64,
            GdalDataType::Int64 => NativeType::I64,
            GdalDataType::Float32 => NativeType::F32,
            _ => NativeType::F64,
        }
    }

    /// Dataset on disk. Metadata is read once on open, pixels on every read.
    #[derive(Debug)]
    pub struct GdalRaster {
        path: Arc<Path>,
        geometry: GridGeometry,
        sample_type: SampleType,
        no_data: Box<[Option<f64>]>,
    }

    impl GdalRaster {
        pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
            let dataset = GdalDataset::open(&path)?;
            let transform = PixelTransform::from_gdal(dataset.geo_transform()?)?;
            let extent = GridExtent::new((0, 0), dataset.raster_size());
            let geometry = GridGeometry::new(extent, transform, Crs::new(dataset.projection()));
            let mut native_types = Vec::new();
            let mut no_data = Vec::new();
            for index in 1..=dataset.raster_count() {
                let band = dataset.rasterband(index)?;
                native_types.push(SampleType::from_native(native_type(band.band_type())));
                no_data.push(band.no_data_value());
            }
            let sample_type = SampleType::supremum(native_types).unwrap_or(SampleType::Double);
            Ok(GdalRaster {
                path: Arc::from(path.as_ref()),
                geometry,
                sample_type,
                no_data: no_data.into(),
            })
        }
    }

    impl RasterResource for GdalRaster {
        fn grid_geometry(&self) -> Result<GridGeometry> {
            Ok(self.geometry.clone())
        }

        fn sample_type(&self) -> Result<SampleType> {
            Ok(self.sample_type)
        }

        fn band_count(&self) -> Result<usize> {
            Ok(self.no_data.len())
        }

        fn no_data(&self, band: usize) -> Option<f64> {
            self.no_data.get(band).copied().flatten()
        }

        fn read(&self, area: &GridGeometry, bands: &Indexes) -> Result<Raster> {
            let bands = bands.indexes_from(self.no_data.len())?;
            let window = read_window(&self.geometry, area)?;
            let extent = window.extent().ok_or(MosaicError::NoIntersection)?;
            let offset = (extent.low().x as isize, extent.low().y as isize);
            let shape = extent.shape();
            let dataset = GdalDataset::open(&self.path)?;
            let mut values = Vec::with_capacity(bands.len() * extent.size());
            for band in bands.iter() {
                let buffer = dataset
                    .rasterband(band + 1)?
                    .read_as::<f64>(offset, shape, shape, None)?;
                values.extend_from_slice(buffer.data());
            }
            let values = Buffer::from_parts(values, [bands.len(), shape.1, shape.0])?;
            Raster::new(window, self.sample_type, markers(&self.no_data, &bands), &values)
        }
    }
}
