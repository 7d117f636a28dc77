use std::{fmt::Debug, hash::Hash, sync::Arc};

use shrinkwraprs::Shrinkwrap;

use crate::{
    components::{grid::GridGeometry, raster::Raster, sample::SampleType},
    errors::Result,
    Indexes,
};

/// Raster data provider consumed by an aggregate.
///
/// Every call may fail; aggregates treat a failure as the source being unavailable
/// for the operation at hand.
pub trait RasterResource: Send + Sync + Debug {
    fn grid_geometry(&self) -> Result<GridGeometry>;
    fn sample_type(&self) -> Result<SampleType>;
    fn band_count(&self) -> Result<usize>;
    /// Declared background value of `band`, if any.
    fn no_data(&self, band: usize) -> Option<f64>;
    /// Native resolution pixels of the selected bands covering `area`.
    ///
    /// The returned raster keeps the resource's own transform and is clipped to its extent.
    fn read(&self, area: &GridGeometry, bands: &Indexes) -> Result<Raster>;
}

/// Shared handle on a [RasterResource], compared by identity.
#[derive(Shrinkwrap, Clone, Debug)]
pub struct SourceRef(Arc<dyn RasterResource>);

impl SourceRef {
    pub fn new(resource: Arc<dyn RasterResource>) -> Self {
        Self(resource)
    }

    fn address(&self) -> *const () {
        Arc::as_ptr(&self.0) as *const ()
    }
}

impl<R: RasterResource + 'static> From<Arc<R>> for SourceRef {
    fn from(value: Arc<R>) -> Self {
        Self(value)
    }
}

impl Hash for SourceRef {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

impl PartialEq for SourceRef {
    fn eq(&self, other: &Self) -> bool {
        self.address().eq(&other.address())
    }
}

impl Eq for SourceRef {}
