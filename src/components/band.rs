use std::{fmt::Debug, sync::Arc};

use crate::{
    components::resource::SourceRef,
    errors::{MosaicError, Result},
};

/// One dimensional function applied to each resampled sample before compositing.
pub type ValueTransform = Arc<dyn Fn(f64) -> f64 + Send + Sync>;

/// One band of one source contributing to a [VirtualBand].
#[derive(Clone)]
pub struct SourceEntry {
    pub source: SourceRef,
    pub band: usize,
    pub transform: Option<ValueTransform>,
}

impl Debug for SourceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceEntry")
            .field("source", &self.source)
            .field("band", &self.band)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

impl SourceEntry {
    pub fn new(source: impl Into<SourceRef>, band: usize) -> Self {
        Self {
            source: source.into(),
            band,
            transform: None,
        }
    }

    pub fn with_transform(mut self, transform: impl Fn(f64) -> f64 + Send + Sync + 'static) -> Self {
        self.transform = Some(Arc::new(transform));
        self
    }

    pub fn apply(&self, value: f64) -> f64 {
        match &self.transform {
            Some(transform) => transform(value),
            None => value,
        }
    }
}

/// Output band synthesized from source bands.
///
/// Entry order is compositing priority: the first entry with a defined sample wins.
#[derive(Clone, Debug)]
pub struct VirtualBand {
    sources: Vec<SourceEntry>,
}

impl VirtualBand {
    pub fn new(sources: Vec<SourceEntry>) -> Result<Self> {
        if sources.is_empty() {
            return Err(MosaicError::EmptyVirtualBand);
        }
        Ok(Self { sources })
    }

    /// Single entry band passing `band` of `source` through.
    pub fn pass_through(source: impl Into<SourceRef>, band: usize) -> Self {
        Self {
            sources: vec![SourceEntry::new(source, band)],
        }
    }

    pub fn sources(&self) -> &[SourceEntry] {
        &self.sources
    }

    pub fn references(&self, source: &SourceRef) -> bool {
        self.sources.iter().any(|entry| &entry.source == source)
    }

    /// Drops every entry of `source`, returns how many were dropped.
    pub(crate) fn remove_source(&mut self, source: &SourceRef) -> usize {
        let before = self.sources.len();
        self.sources.retain(|entry| &entry.source != source);
        before - self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// First no-data value declared by one of the entries.
    pub fn declared_no_data(&self) -> Option<f64> {
        self.sources
            .iter()
            .find_map(|entry| entry.source.no_data(entry.band))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::constant_source;

    #[test]
    fn empty_band_is_rejected() {
        assert!(matches!(
            VirtualBand::new(vec![]),
            Err(MosaicError::EmptyVirtualBand)
        ));
    }

    #[test]
    fn transform_is_applied() {
        let entry = SourceEntry::new(constant_source((0., 1.), (1, 1), 2.), 0)
            .with_transform(|v| v * 10. + 1.);
        assert_eq!(entry.apply(2.), 21.);
        assert_eq!(SourceEntry::new(entry.source.clone(), 0).apply(2.), 2.);
    }

    #[test]
    fn removing_a_source_keeps_the_others() {
        let (lhs, rhs) = (
            constant_source((0., 1.), (1, 1), 1.),
            constant_source((0., 1.), (1, 1), 2.),
        );
        let mut band = VirtualBand::new(vec![
            SourceEntry::new(lhs.clone(), 0),
            SourceEntry::new(rhs.clone(), 0),
            SourceEntry::new(lhs.clone(), 0),
        ])
        .unwrap();
        assert_eq!(band.remove_source(&lhs), 2);
        assert!(band.references(&rhs) && !band.references(&lhs));
    }
}
