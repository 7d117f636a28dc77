use crate::{
    components::{aggregate::Mode, sample::SampleTypeSelection, sampler::Interpolation},
    crs_geo::Crs,
};

/// Settings of an [crate::Aggregate].
///
/// Missing fields take their default: `ORDER` mode, nearest interpolation, inferred
/// sample type and a working crs inferred from the first geodetic source.
#[derive(Debug, Clone, PartialEq, Default, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct AggregateConfig {
    pub mode: Mode,
    pub interpolation: Interpolation,
    pub sample_type: SampleTypeSelection,
    pub crs: Option<Crs>,
}
