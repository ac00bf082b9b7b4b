use anyhow::anyhow;
use nalgebra::Vector3;

use crate::Real;

/// Groups a flat coordinate array into points and converts them to another [`Real`] type
///
/// Fails if the number of coordinates is not a multiple of three or a coordinate cannot be
/// represented in the output type.
pub fn points_from_flat_coords<RealIn: Real, RealOut: Real>(
    coords: &[RealIn],
) -> Result<Vec<Vector3<RealOut>>, anyhow::Error> {
    if coords.len() % 3 != 0 {
        return Err(anyhow!(
            "number of point coordinates ({}) is not a multiple of 3",
            coords.len()
        ));
    }

    coords
        .chunks_exact(3)
        .enumerate()
        .map(|(i, c)| -> Result<Vector3<RealOut>, anyhow::Error> {
            let convert = |value: RealIn| {
                value.try_convert::<RealOut>().ok_or_else(|| {
                    anyhow!(
                        "failed to convert coordinate {} of point {} to {}",
                        value,
                        i,
                        std::any::type_name::<RealOut>()
                    )
                })
            };
            Ok(Vector3::new(convert(c[0])?, convert(c[1])?, convert(c[2])?))
        })
        .try_collect_with_capacity(coords.len() / 3)
}

/// Extension methods for iterators over results
pub(crate) trait IteratorExt {
    /// Collects into a `Vec` with the given capacity, stops at the first error
    fn try_collect_with_capacity<T, E>(self, capacity: usize) -> Result<Vec<T>, E>
    where
        Self: Sized + Iterator<Item = Result<T, E>>;
}

impl<Iter: Iterator> IteratorExt for Iter {
    fn try_collect_with_capacity<T, E>(mut self, capacity: usize) -> Result<Vec<T>, E>
    where
        Self: Sized + Iterator<Item = Result<T, E>>,
    {
        self.try_fold(Vec::with_capacity(capacity), |mut vec, item| {
            vec.push(item?);
            Ok(vec)
        })
    }
}
