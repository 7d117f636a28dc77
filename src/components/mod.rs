pub mod aggregate;
pub mod backends;
pub mod band;
pub mod bounds;
pub mod events;
pub mod grid;
pub mod mosaic;
pub mod raster;
pub mod resource;
pub mod sample;
pub mod sampler;
pub mod transforms;

pub use aggregate::{Aggregate, Mode};
pub use backends::MemoryRaster;
pub use band::{SourceEntry, ValueTransform, VirtualBand};
pub use bounds::{Envelope, GridExtent};
pub use events::{AggregateEvent, AggregationChange, EventKind, SubscriptionId};
pub use grid::{GridGeometry, ResolutionRule};
pub use mosaic::merge_aligned;
pub use raster::{Raster, Samples};
pub use resource::{RasterResource, SourceRef};
pub use sample::{NativeType, SampleType, SampleTypeSelection};
pub use sampler::{Interpolation, Sampler};
pub use transforms::PixelTransform;
