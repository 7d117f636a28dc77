use geo::{Coord, Rect};

use crate::{
    components::{
        bounds::{Envelope, GridExtent},
        transforms::{approx_eq, PixelTransform},
    },
    crs_geo::Crs,
    errors::{MosaicError, Result},
    intersection::{Intersection, Union},
};

/// How [GridGeometry::union] picks the resolution of the combined grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionRule {
    /// Keep the resolution of the reference geometry.
    Reference,
    /// Finest resolution of both, per axis.
    Finest,
}

/// Placement of a raster: pixel extent, pixel to world transform and crs.
///
/// A geometry built from an envelope alone is "extent undefined": it knows its world
/// bounds and resolution but not which pixels it covers until [GridGeometry::resolved].
#[derive(Debug, Clone)]
pub struct GridGeometry {
    extent: Option<GridExtent>,
    transform: PixelTransform,
    envelope: Envelope,
}

impl GridGeometry {
    pub fn new(extent: GridExtent, transform: PixelTransform, crs: Crs) -> Self {
        let envelope = Envelope::new(crs, transform.world_bounds(extent.as_pixel_rect()));
        Self {
            extent: Some(extent),
            transform,
            envelope,
        }
    }

    /// North-up geometry of `shape = (width, height)` pixels whose top left corner is `origin`.
    pub fn north_up(
        origin: impl Into<Coord>,
        resolution: impl Into<Coord>,
        shape: (usize, usize),
        crs: Crs,
    ) -> Result<Self> {
        let transform = PixelTransform::north_up(origin, resolution)?;
        Ok(Self::new(GridExtent::new((0, 0), shape), transform, crs))
    }

    /// Extent undefined geometry covering `envelope` with north-up pixels of `resolution`.
    pub fn from_envelope(envelope: Envelope, resolution: impl Into<Coord>) -> Result<Self> {
        let rect = envelope.rect();
        let origin = Coord {
            x: rect.min().x,
            y: rect.max().y,
        };
        let transform = PixelTransform::north_up(origin, resolution)?;
        Ok(Self {
            extent: None,
            transform,
            envelope,
        })
    }

    pub fn extent(&self) -> Option<GridExtent> {
        self.extent
    }

    pub fn transform(&self) -> &PixelTransform {
        &self.transform
    }

    pub fn crs(&self) -> &Crs {
        self.envelope.crs()
    }

    pub fn envelope(&self) -> &Envelope {
        &self.envelope
    }

    /// Per axis pixel size, always positive.
    pub fn resolution(&self) -> Coord {
        self.transform.resolution()
    }

    /// Geometry with an explicit extent: the pixels of the transform covering the envelope.
    pub fn resolved(&self) -> Result<GridGeometry> {
        match self.extent {
            Some(_) => Ok(self.clone()),
            None => {
                let extent = self.covering_extent(self.envelope.rect())?;
                Ok(GridGeometry::new(extent, self.transform, self.crs().clone()))
            }
        }
    }

    fn covering_extent(&self, world: Rect<f64>) -> Result<GridExtent> {
        GridExtent::covering(self.transform.pixel_bounds(world)).ok_or(MosaicError::NoIntersection)
    }

    fn check_crs(&self, other: &GridGeometry) -> Result<()> {
        if self.crs().reconciles_with(other.crs()) {
            Ok(())
        } else {
            Err(MosaicError::CrsMismatch {
                expected: self.crs().to_string(),
                found: other.crs().to_string(),
            })
        }
    }

    /// World intersection of both envelopes.
    pub fn intersection(&self, other: &GridGeometry) -> Result<Envelope> {
        self.check_crs(other)?;
        self.envelope.intersection(&other.envelope)
    }

    /// Pixels of this grid touching `area`, keeping this grid's transform.
    pub fn subgrid(&self, area: &Envelope) -> Result<GridGeometry> {
        let resolved = self.resolved()?;
        let covering = resolved.covering_extent(area.rect())?;
        let extent = match resolved.extent {
            Some(extent) => extent.intersection(&covering)?,
            None => covering,
        };
        Ok(GridGeometry::new(extent, self.transform, self.crs().clone()))
    }

    /// Geometry covering both envelopes.
    ///
    /// The transform comes from the first geometry with an explicit extent, rescaled
    /// to the resolution picked by `rule`. The extent is the combined envelope seen
    /// through that transform, rounded outward to whole pixels.
    pub fn union(&self, other: &GridGeometry, rule: ResolutionRule) -> Result<GridGeometry> {
        self.check_crs(other)?;
        let envelope = self.envelope.union(&other.envelope);
        let reference = if self.extent.is_some() || other.extent.is_none() {
            self
        } else {
            other
        };
        let resolution = match rule {
            ResolutionRule::Reference => reference.resolution(),
            ResolutionRule::Finest => {
                let (lhs, rhs) = (self.resolution(), other.resolution());
                Coord {
                    x: lhs.x.min(rhs.x),
                    y: lhs.y.min(rhs.y),
                }
            }
        };
        let transform = reference.transform.with_resolution(resolution);
        if self.extent.is_none() && other.extent.is_none() {
            return Ok(GridGeometry {
                extent: None,
                transform,
                envelope,
            });
        }
        let extent = GridExtent::covering(transform.pixel_bounds(envelope.rect()))
            .ok_or(MosaicError::NoIntersection)?;
        Ok(GridGeometry::new(extent, transform, self.crs().clone()))
    }
}

impl PartialEq for GridGeometry {
    fn eq(&self, other: &Self) -> bool {
        let same_placement = match (self.extent, other.extent) {
            (Some(lhs), Some(rhs)) => lhs == rhs,
            (None, None) => {
                let (lhs, rhs) = (self.envelope.rect(), other.envelope.rect());
                approx_eq(lhs.min().x, rhs.min().x)
                    && approx_eq(lhs.min().y, rhs.min().y)
                    && approx_eq(lhs.max().x, rhs.max().x)
                    && approx_eq(lhs.max().y, rhs.max().y)
            }
            _ => false,
        };
        same_placement && self.transform.approx_eq(&other.transform) && self.crs() == other.crs()
    }
}
