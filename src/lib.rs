//! Virtual raster compositing many georeferenced sources into one.
//!
//! An [Aggregate] holds virtual bands, each an ordered list of source bands. Its grid
//! geometry follows the sources as they are added and removed, and reads composite
//! the sources onto any target grid, highest priority source first.

mod buffer;
pub mod components;
pub mod config;
mod crs_geo;
mod errors;
mod indexes;
mod intersection;
#[cfg(test)]
mod testutils;

#[cfg(feature = "gdal")]
pub use components::backends::gdal_backend::GdalRaster;
pub use components::{
    merge_aligned, Aggregate, AggregateEvent, AggregationChange, Envelope, EventKind,
    GridExtent, GridGeometry, Interpolation, MemoryRaster, Mode, NativeType, PixelTransform,
    Raster, RasterResource, SampleType, SampleTypeSelection, Samples, SourceEntry, SourceRef,
    SubscriptionId, VirtualBand,
};
pub use buffer::Buffer;
pub use config::AggregateConfig;
pub use crs_geo::{Crs, CrsGeometry};
pub use errors::{MosaicError, Result};
pub use indexes::Indexes;
pub use intersection::{Intersection, Union};
