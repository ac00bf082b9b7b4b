use std::fmt::{Debug, Display};

use nalgebra::{RealField, SVector};
use num_traits::{FromPrimitive, ToPrimitive};

/// Convenience trait that combines `Send` and `Sync`
pub trait ThreadSafe: Sync + Send {}
impl<T> ThreadSafe for T where T: Sync + Send {}

/// Trait that has to be implemented for types to be used as floating point values in the context of the library (e.g. particle positions and attributes)
pub trait Real:
    RealField + Copy + FromPrimitive + ToPrimitive + Debug + Display + Default + ThreadSafe
{
    /// Tries to convert this value to another [`Real`] type, returns `None` if the value cannot be represented
    fn try_convert<T: Real>(self) -> Option<T> {
        T::from_f64(self.to_f64()?)
    }

    /// Converts the value to `f32`, values outside of the `f32` range become infinite
    fn to_f32_lossy(self) -> f32 {
        self.to_f32().unwrap_or(f32::NAN)
    }

    /// Returns whether the type uses double precision (64 bit) storage
    fn is_double_precision() -> bool {
        std::mem::size_of::<Self>() == std::mem::size_of::<f64>()
    }
}

impl<T> Real for T where
    T: RealField + Copy + FromPrimitive + ToPrimitive + Debug + Display + Default + ThreadSafe
{
}

/// Conversion of types holding [`Real`] values (e.g. vectors) between different [`Real`] types
pub trait RealConvert: Sized {
    type Out<To>
    where
        To: Real;

    /// Tries to convert the value to use the given [`Real`] type, returns `None` if any component cannot be represented
    fn try_convert<To: Real>(self) -> Option<Self::Out<To>>;
}

impl<From: Real, const D: usize> RealConvert for SVector<From, D> {
    type Out<To>
        = SVector<To, D>
    where
        To: Real;

    fn try_convert<To: Real>(self) -> Option<SVector<To, D>> {
        let mut converted = SVector::<To, D>::zeros();
        for i in 0..D {
            converted[i] = Real::try_convert(self[i])?;
        }
        Some(converted)
    }
}

impl<From: Real, const D: usize> RealConvert for &SVector<From, D> {
    type Out<To>
        = SVector<To, D>
    where
        To: Real;

    fn try_convert<To: Real>(self) -> Option<SVector<To, D>> {
        RealConvert::try_convert(*self)
    }
}
