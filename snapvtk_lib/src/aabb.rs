//! Axis-aligned boxes used as particle domains and lookup regions

use std::fmt;

use nalgebra::Vector3;
use rayon::prelude::*;

use crate::Real;

/// Axis-aligned box in three dimensions, given by its min and max corner
///
/// Domains of particle collections and lookup regions are treated as closed boxes, i.e. points on
/// the faces belong to the box.
#[derive(Clone, PartialEq)]
pub struct Aabb3d<R: Real> {
    min: Vector3<R>,
    max: Vector3<R>,
}

impl<R: Real> Aabb3d<R> {
    /// Constructs a box from its min and max corner
    #[inline(always)]
    pub fn new(min: Vector3<R>, max: Vector3<R>) -> Self {
        Self { min, max }
    }

    /// Constructs a degenerate box at the origin
    pub fn zeros() -> Self {
        Self::new(Vector3::zeros(), Vector3::zeros())
    }

    /// Computes the smallest box enclosing all points in parallel, an empty slice yields [`Aabb3d::zeros`]
    /// ```
    /// use snapvtk_lib::Aabb3d;
    /// use nalgebra::Vector3;
    ///
    /// let aabb = Aabb3d::<f64>::par_from_points(&[
    ///     Vector3::new(1.0, 1.0, 1.0),
    ///     Vector3::new(0.5, 3.0, 5.0),
    ///     Vector3::new(-1.0, 1.0, 1.0)
    /// ]);
    /// assert_eq!(aabb.min(), &Vector3::new(-1.0, 1.0, 1.0));
    /// assert_eq!(aabb.max(), &Vector3::new(1.0, 3.0, 5.0));
    /// ```
    pub fn par_from_points(points: &[Vector3<R>]) -> Self {
        let Some(first) = points.first() else {
            return Self::zeros();
        };

        let (min, max) = points
            .par_iter()
            .fold(
                || (*first, *first),
                |(min, max), p| (min.inf(p), max.sup(p)),
            )
            .reduce(
                || (*first, *first),
                |(min_a, max_a), (min_b, max_b)| (min_a.inf(&min_b), max_a.sup(&max_b)),
            );
        Self::new(min, max)
    }

    #[inline(always)]
    pub fn min(&self) -> &Vector3<R> {
        &self.min
    }

    #[inline(always)]
    pub fn max(&self) -> &Vector3<R> {
        &self.max
    }

    /// Returns whether `min()[i] <= max()[i]` holds for all axes
    /// ```
    /// use snapvtk_lib::Aabb3d;
    /// use nalgebra::Vector3;
    /// assert!(Aabb3d::<f64>::zeros().is_consistent());
    /// assert!(!Aabb3d::new(Vector3::new(-1.0, 1.0, -1.0), Vector3::new(1.0, -1.0, 1.0)).is_consistent());
    /// ```
    pub fn is_consistent(&self) -> bool {
        self.min <= self.max
    }

    /// Vector from the min to the max corner
    #[inline(always)]
    pub fn extents(&self) -> Vector3<R> {
        self.max - self.min
    }

    /// Checks if the point is inside of the box or on one of its faces
    pub fn contains_point_inclusive(&self, point: &Vector3<R>) -> bool {
        point >= &self.min && point <= &self.max
    }
}

impl<R: Real> fmt::Debug for Aabb3d<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Aabb3d {{ min: [{:.7}, {:.7}, {:.7}], max: [{:.7}, {:.7}, {:.7}] }}",
            self.min.x, self.min.y, self.min.z, self.max.x, self.max.y, self.max.z
        )
    }
}
