use std::{fmt::Display, sync::Arc};

use geo::{CoordNum, Rect};
use shrinkwraprs::Shrinkwrap;

use crate::{errors::Result, intersection::Intersection, intersection::Union};

/// Coordinate reference system of a grid.
///
/// `Image` is the pixel indexed system of a raster without georeferencing.
/// It never reconciles with anything, not even another `Image`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Deserialize, serde::Serialize)]
#[serde(from = "String", into = "String")]
pub enum Crs {
    Image,
    Defined(Arc<str>),
}

impl Crs {
    pub fn new(definition: impl AsRef<str>) -> Self {
        let definition = definition.as_ref().trim();
        if definition.is_empty() {
            Crs::Image
        } else {
            Crs::Defined(Arc::from(definition))
        }
    }

    pub fn is_geodetic(&self) -> bool {
        matches!(self, Crs::Defined(_))
    }

    /// Whether samples in `self` can be placed in `working` without reprojection.
    pub fn reconciles_with(&self, working: &Crs) -> bool {
        match (self, working) {
            (Crs::Defined(lhs), Crs::Defined(rhs)) => lhs.eq_ignore_ascii_case(rhs),
            _ => false,
        }
    }
}

impl Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Crs::Image => write!(f, "image"),
            Crs::Defined(definition) => write!(f, "{definition}"),
        }
    }
}

impl From<&str> for Crs {
    fn from(value: &str) -> Self {
        Crs::new(value)
    }
}

impl From<String> for Crs {
    fn from(value: String) -> Self {
        Crs::new(value)
    }
}

/// Image crs maps to the empty string.
impl From<Crs> for String {
    fn from(value: Crs) -> Self {
        match value {
            Crs::Image => String::new(),
            Crs::Defined(definition) => definition.to_string(),
        }
    }
}

/// Geometry tagged with the [Crs] its coordinates live in.
#[derive(Shrinkwrap, Debug, Clone, PartialEq)]
pub struct CrsGeometry<G> {
    crs: Crs,
    #[shrinkwrap(main_field)]
    geometry: G,
}

impl<G> CrsGeometry<G> {
    pub fn new(crs: Crs, geometry: G) -> Self {
        Self { crs, geometry }
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn geometry(&self) -> &G {
        &self.geometry
    }
}

impl<T: CoordNum> Intersection for CrsGeometry<Rect<T>> {
    type Output = CrsGeometry<Rect<T>>;
    fn intersection(&self, rhs: &Self) -> Result<Self::Output> {
        let geometry = self.geometry.intersection(&rhs.geometry)?;
        Ok(CrsGeometry::new(self.crs.clone(), geometry))
    }
}

impl<T: CoordNum> Union for CrsGeometry<Rect<T>> {
    type Output = CrsGeometry<Rect<T>>;
    fn union(&self, rhs: &Self) -> Self::Output {
        CrsGeometry::new(self.crs.clone(), self.geometry.union(&rhs.geometry))
    }
}
