mod read;
mod state;

pub use read::ReadPlan;
pub use state::AggregationState;

use log::info;
use parking_lot::Mutex;
use std::ops::Range;

use crate::{
    components::{
        band::VirtualBand,
        events::{AggregateEvent, AggregationChange, EventKind, Listeners, SubscriptionId},
        grid::{GridGeometry, ResolutionRule},
        raster::Raster,
        resource::{RasterResource, SourceRef},
        sample::{SampleType, SampleTypeSelection},
        sampler::Interpolation,
    },
    config::AggregateConfig,
    crs_geo::Crs,
    errors::{MosaicError, Result},
    Indexes,
};

/// How the default grid geometry of an aggregate is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Mode {
    /// Union of the source envelopes on the grid of the first source.
    #[default]
    Order,
    /// Union of the source envelopes at the finest source resolution.
    Scale,
}

impl Mode {
    pub fn resolution_rule(&self) -> ResolutionRule {
        match self {
            Mode::Order => ResolutionRule::Reference,
            Mode::Scale => ResolutionRule::Finest,
        }
    }
}

/// Virtual raster compositing a mutable set of sources.
///
/// Mutations recompute the grid geometry and sample type under the state lock, then
/// notify listeners: content changed, model changed, then the aggregation delta.
/// Reads work on a snapshot and never hold the lock while touching sources.
#[derive(Debug, Default)]
pub struct Aggregate {
    state: Mutex<AggregationState>,
    listeners: Listeners,
}

impl Aggregate {
    pub fn new(mode: Mode) -> Self {
        Self::with_config(&AggregateConfig {
            mode,
            ..Default::default()
        })
    }

    pub fn with_config(config: &AggregateConfig) -> Self {
        Self {
            state: Mutex::new(AggregationState::from_config(config)),
            listeners: Listeners::default(),
        }
    }

    /// One pass-through band per band of each resource, in order.
    pub fn from_resources<S: Into<SourceRef>>(
        mode: Mode,
        resources: impl IntoIterator<Item = S>,
    ) -> Result<Self> {
        let aggregate = Self::new(mode);
        for resource in resources {
            aggregate.add_resource(resource)?;
        }
        Ok(aggregate)
    }

    pub fn config(&self) -> AggregateConfig {
        let state = self.state.lock();
        AggregateConfig {
            mode: state.mode,
            interpolation: state.interpolation,
            sample_type: state.sample_type,
            crs: state.crs.clone(),
        }
    }

    /// Applies `mutation`, recomputes derived state and notifies listeners.
    fn mutate<T>(
        &self,
        mutation: impl FnOnce(&mut AggregationState) -> (T, Option<AggregationChange>),
    ) -> T {
        let (result, change, geometry) = {
            let mut state = self.state.lock();
            let (result, change) = mutation(&mut state);
            if change.is_none() {
                return result;
            }
            state.recompute();
            (result, change, state.geometry().cloned())
        };
        let mut events = vec![
            AggregateEvent::ContentChanged,
            AggregateEvent::ModelChanged { geometry },
        ];
        events.extend(change.map(AggregateEvent::Aggregation));
        self.listeners.notify(&events);
        result
    }

    /// Applies a settings change, recomputes derived state and notifies listeners.
    fn configure(&self, setting: impl FnOnce(&mut AggregationState), model_changed: bool) {
        let geometry = {
            let mut state = self.state.lock();
            setting(&mut state);
            state.recompute();
            state.geometry().cloned()
        };
        let mut events = vec![AggregateEvent::ContentChanged];
        if model_changed {
            events.push(AggregateEvent::ModelChanged { geometry });
        }
        self.listeners.notify(&events);
    }

    /// Adds one pass-through band per band of `source`, returns the new band indexes.
    pub fn add_resource(&self, source: impl Into<SourceRef>) -> Result<Range<usize>> {
        self.add_resource_bands(source, Indexes::all())
    }

    /// Adds one pass-through band per selected band of `source`.
    pub fn add_resource_bands(
        &self,
        source: impl Into<SourceRef>,
        bands: Indexes,
    ) -> Result<Range<usize>> {
        let source = source.into();
        let selected = bands.indexes_from(source.band_count()?)?;
        let bands = selected
            .iter()
            .map(|band| VirtualBand::pass_through(source.clone(), *band))
            .collect();
        self.add_bands(bands)
    }

    /// Adds a virtual band, returns its index.
    pub fn add_band(&self, band: VirtualBand) -> Result<usize> {
        Ok(self.add_bands(vec![band])?.start)
    }

    pub fn add_bands(&self, bands: Vec<VirtualBand>) -> Result<Range<usize>> {
        if bands.iter().any(VirtualBand::is_empty) {
            return Err(MosaicError::EmptyVirtualBand);
        }
        Ok(self.mutate(|state| {
            let start = state.bands.len();
            let mut sources: Vec<SourceRef> = Vec::new();
            for entry in bands.iter().flat_map(|band| band.sources()) {
                if !sources.contains(&entry.source) {
                    sources.push(entry.source.clone());
                }
            }
            state.bands.extend(bands);
            let added = start..state.bands.len();
            info!("added bands {added:?} from {} sources", sources.len());
            let change = AggregationChange::Added {
                sources,
                bands: added.clone(),
            };
            (added.clone(), Some(change).filter(|_| !added.is_empty()))
        }))
    }

    /// Drops every entry of `source`, and the bands left without entries.
    ///
    /// Returns whether anything referenced `source`.
    pub fn remove(&self, source: &SourceRef) -> bool {
        self.mutate(|state| {
            if !state.bands.iter().any(|band| band.references(source)) {
                return (false, None);
            }
            let mut dropped = Vec::new();
            let mut index = 0;
            state.bands.retain_mut(|band| {
                band.remove_source(source);
                let keep = !band.is_empty();
                if !keep {
                    dropped.push(index);
                }
                index += 1;
                keep
            });
            info!("removed {source:?}, dropping bands {dropped:?}");
            let change = AggregationChange::Removed {
                sources: vec![source.clone()],
                bands: dropped,
            };
            (true, Some(change))
        })
    }

    /// Removes the virtual band at `index`.
    pub fn remove_band(&self, index: usize) -> Option<VirtualBand> {
        self.mutate(|state| {
            if index >= state.bands.len() {
                return (None, None);
            }
            let band = state.bands.remove(index);
            let sources: Vec<SourceRef> = band
                .sources()
                .iter()
                .map(|entry| entry.source.clone())
                .filter(|source| !state.bands.iter().any(|band| band.references(source)))
                .collect();
            let change = AggregationChange::Removed {
                sources,
                bands: vec![index],
            };
            (Some(band), Some(change))
        })
    }

    /// Removes every band.
    pub fn clear(&self) {
        self.mutate(|state| {
            if state.bands.is_empty() {
                return ((), None);
            }
            let change = AggregationChange::Removed {
                sources: state.sources(),
                bands: (0..state.bands.len()).collect(),
            };
            state.bands.clear();
            ((), Some(change))
        })
    }

    pub fn set_mode(&self, mode: Mode) {
        self.configure(|state| state.mode = mode, true)
    }

    pub fn set_interpolation(&self, interpolation: Interpolation) {
        self.configure(|state| state.interpolation = interpolation, false)
    }

    /// Forces the output type, or goes back to inferring it with [SampleTypeSelection::Auto].
    pub fn set_sample_type(&self, selection: impl Into<SampleTypeSelection>) {
        let selection = selection.into();
        self.configure(|state| state.sample_type = selection, false)
    }

    /// Sets the working crs, `None` infers it from the first geodetic source.
    pub fn set_crs(&self, crs: Option<Crs>) {
        self.configure(|state| state.crs = crs, true)
    }

    pub fn mode(&self) -> Mode {
        self.state.lock().mode
    }

    pub fn interpolation(&self) -> Interpolation {
        self.state.lock().interpolation
    }

    pub fn band_count(&self) -> usize {
        self.state.lock().bands.len()
    }

    pub fn bands(&self) -> Vec<VirtualBand> {
        self.state.lock().bands.clone()
    }

    pub fn sources(&self) -> Vec<SourceRef> {
        self.state.lock().sources()
    }

    /// `None` while no source is eligible.
    pub fn grid_geometry(&self) -> Option<GridGeometry> {
        self.state.lock().geometry().cloned()
    }

    pub fn sample_type(&self) -> SampleType {
        self.state.lock().effective_sample_type()
    }

    pub fn working_crs(&self) -> Option<Crs> {
        self.state.lock().working_crs().cloned()
    }

    fn plan(&self) -> ReadPlan {
        ReadPlan::from(&*self.state.lock())
    }

    /// Composites every band over `target`.
    pub fn read(&self, target: &GridGeometry) -> Result<Raster> {
        self.plan().read(target)
    }

    pub fn subscribe(
        &self,
        kind: EventKind,
        listener: impl Fn(&AggregateEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.listeners.subscribe(kind, listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }
}

impl RasterResource for Aggregate {
    fn grid_geometry(&self) -> Result<GridGeometry> {
        Aggregate::grid_geometry(self).ok_or(MosaicError::NoEnvelope)
    }

    fn sample_type(&self) -> Result<SampleType> {
        Ok(Aggregate::sample_type(self))
    }

    fn band_count(&self) -> Result<usize> {
        Ok(Aggregate::band_count(self))
    }

    fn no_data(&self, band: usize) -> Option<f64> {
        let state = self.state.lock();
        let sample_type = state.effective_sample_type();
        if sample_type.is_floating() {
            return None;
        }
        let band = state.bands.get(band)?;
        Some(sample_type.no_data_marker(band.declared_no_data()))
    }

    fn read(&self, area: &GridGeometry, bands: &Indexes) -> Result<Raster> {
        let (geometry, plan) = {
            let state = self.state.lock();
            let geometry = state.geometry().cloned().ok_or(MosaicError::NoEnvelope)?;
            (geometry, ReadPlan::from(&*state))
        };
        let area = geometry.intersection(area)?;
        plan.select(bands)?.read(&geometry.subgrid(&area)?)
    }
}

#[cfg(test)]
mod tests;
