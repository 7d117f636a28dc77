use geo::{CoordNum, Rect};

use crate::errors::{MosaicError, Result};

pub trait Intersection {
    type Output;
    fn intersection(&self, rhs: &Self) -> Result<Self::Output>;
}

pub trait Union {
    type Output;
    fn union(&self, rhs: &Self) -> Self::Output;
}

fn max<T: CoordNum>(x: T, y: T) -> T {
    if x > y {
        x
    } else {
        y
    }
}

fn min<T: CoordNum>(x: T, y: T) -> T {
    if x < y {
        x
    } else {
        y
    }
}

/// Rects sharing only an edge do not intersect.
impl<T: CoordNum> Intersection for Rect<T> {
    type Output = Rect<T>;
    fn intersection(&self, rhs: &Self) -> Result<Rect<T>> {
        let (lhs_min, lhs_max) = (self.min(), self.max());
        let (rhs_min, rhs_max) = (rhs.min(), rhs.max());
        if (lhs_max.x <= rhs_min.x) | (lhs_max.y <= rhs_min.y) {
            return Err(MosaicError::NoIntersection);
        }
        if (lhs_min.x >= rhs_max.x) | (lhs_min.y >= rhs_max.y) {
            return Err(MosaicError::NoIntersection);
        }

        let lower = (max(lhs_min.x, rhs_min.x), max(lhs_min.y, rhs_min.y));
        let upper = (min(lhs_max.x, rhs_max.x), min(lhs_max.y, rhs_max.y));
        Ok(Self::new(lower, upper))
    }
}

impl<T: CoordNum> Union for Rect<T> {
    type Output = Rect<T>;
    fn union(&self, rhs: &Self) -> Rect<T> {
        let (lhs_min, lhs_max) = (self.min(), self.max());
        let (rhs_min, rhs_max) = (rhs.min(), rhs.max());
        Rect::new(
            (min(lhs_min.x, rhs_min.x), min(lhs_min.y, rhs_min.y)),
            (max(lhs_max.x, rhs_max.x), max(lhs_max.y, rhs_max.y)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Rect::new((0., 0.), (2., 2.)), Rect::new((1., 1.), (3., 3.)), Some(Rect::new((1., 1.), (2., 2.))))]
    #[case(Rect::new((0., 0.), (2., 2.)), Rect::new((2., 0.), (4., 2.)), None)]
    #[case(Rect::new((0., 0.), (2., 2.)), Rect::new((5., 5.), (6., 6.)), None)]
    fn rect_intersection(
        #[case] lhs: Rect<f64>,
        #[case] rhs: Rect<f64>,
        #[case] expected: Option<Rect<f64>>,
    ) {
        assert_eq!(lhs.intersection(&rhs).ok(), expected)
    }

    #[test]
    fn rect_union_covers_both() {
        let union = Rect::new((0, 0), (2, 2)).union(&Rect::new((-1, 3), (1, 4)));
        assert_eq!(union, Rect::new((-1, 0), (2, 4)));
    }
}
