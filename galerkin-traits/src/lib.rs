//! Scalar traits shared by the `galerkin` crates.
use nalgebra::RealField;

pub use nalgebra;

/// Real scalar type used for coefficients, geometry and quadrature weights.
///
/// This is `nalgebra`'s [`RealField`] restricted to `Copy` types, which covers `f32` and `f64`.
pub trait Real: RealField + Copy {
    /// Converts an `f64` constant to `Self`.
    ///
    /// Panics if the constant is not representable, which cannot happen for `f32` or `f64`.
    fn from_constant(value: f64) -> Self {
        Self::from_f64(value).expect("constant must be representable by the scalar type")
    }

    /// Converts a count (number of points, nodes, ...) to `Self`.
    fn from_count(count: usize) -> Self {
        Self::from_constant(count as f64)
    }
}

impl<T: RealField + Copy> Real for T {}
