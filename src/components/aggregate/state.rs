use itertools::Itertools;
use log::{info, warn};

use crate::{
    components::{
        aggregate::Mode,
        band::VirtualBand,
        grid::GridGeometry,
        resource::SourceRef,
        sample::{SampleType, SampleTypeSelection},
        sampler::Interpolation,
    },
    config::AggregateConfig,
    crs_geo::Crs,
};

/// Sources, settings and the state derived from them.
///
/// Derived fields are only written by [AggregationState::recompute].
#[derive(Debug, Clone, Default)]
pub struct AggregationState {
    pub(crate) bands: Vec<VirtualBand>,
    pub(crate) mode: Mode,
    pub(crate) crs: Option<Crs>,
    pub(crate) sample_type: SampleTypeSelection,
    pub(crate) interpolation: Interpolation,

    working_crs: Option<Crs>,
    geometry: Option<GridGeometry>,
    inferred_type: Option<SampleType>,
}

impl AggregationState {
    /// State without bands, derived fields computed from `config`.
    pub(crate) fn from_config(config: &AggregateConfig) -> Self {
        let mut state = Self {
            mode: config.mode,
            crs: config.crs.clone(),
            sample_type: config.sample_type,
            interpolation: config.interpolation,
            ..Default::default()
        };
        state.recompute();
        state
    }

    /// Distinct sources, in order of first appearance.
    pub fn sources(&self) -> Vec<SourceRef> {
        self.bands
            .iter()
            .flat_map(|band| band.sources().iter().map(|entry| entry.source.clone()))
            .unique()
            .collect()
    }

    pub fn geometry(&self) -> Option<&GridGeometry> {
        self.geometry.as_ref()
    }

    pub fn working_crs(&self) -> Option<&Crs> {
        self.working_crs.as_ref()
    }

    /// Forced type if any, otherwise the supremum of the eligible sources' types.
    ///
    /// An aggregate without eligible sources reads as `Double`.
    pub fn effective_sample_type(&self) -> SampleType {
        match self.sample_type {
            SampleTypeSelection::Forced(sample_type) => sample_type,
            SampleTypeSelection::Auto => self.inferred_type.unwrap_or(SampleType::Double),
        }
    }

    /// Working crs, grid geometry and inferred sample type from the current sources.
    ///
    /// Sources failing to report a geometry, or whose crs does not reconcile with the
    /// working crs, do not contribute.
    pub(crate) fn recompute(&mut self) {
        let geometries: Vec<(SourceRef, GridGeometry)> = self
            .sources()
            .into_iter()
            .filter_map(|source| match source.grid_geometry() {
                Ok(geometry) => Some((source, geometry)),
                Err(err) => {
                    warn!("ignoring {source:?}, geometry unavailable: {err}");
                    None
                }
            })
            .collect();

        self.working_crs = self.crs.clone().or_else(|| {
            geometries
                .iter()
                .map(|(_, geometry)| geometry.crs())
                .find(|crs| crs.is_geodetic())
                .cloned()
        });

        let eligible: Vec<(SourceRef, GridGeometry)> = geometries
            .into_iter()
            .filter(|(source, geometry)| {
                let reconciles = self
                    .working_crs
                    .as_ref()
                    .is_some_and(|working| geometry.crs().reconciles_with(working));
                if !reconciles {
                    warn!("excluding {source:?}, crs {} does not reconcile", geometry.crs());
                }
                reconciles
            })
            .collect();

        let rule = self.mode.resolution_rule();
        self.geometry = eligible
            .iter()
            .map(|(_, geometry)| geometry)
            .fold(None, |union: Option<GridGeometry>, geometry| match union {
                None => Some(geometry.clone()),
                Some(union) => match union.union(geometry, rule) {
                    Ok(union) => Some(union),
                    Err(err) => {
                        warn!("leaving {geometry:?} out of the aggregate geometry: {err}");
                        Some(union)
                    }
                },
            });

        self.inferred_type = SampleType::supremum(eligible.iter().filter_map(|(source, _)| {
            source
                .sample_type()
                .inspect_err(|err| warn!("ignoring sample type of {source:?}: {err}"))
                .ok()
        }));

        info!(
            "recomputed aggregate of {} bands: envelope {:?}, sample type {}",
            self.bands.len(),
            self.geometry.as_ref().map(|geometry| geometry.envelope().rect()),
            self.effective_sample_type()
        );
    }
}
