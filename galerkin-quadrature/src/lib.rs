//! Quadrature rules for the reference cells used by `galerkin`.
//!
//! All reference domains are subsets of `[-1, 1]^d`: the interval `[-1, 1]`, the square and cube
//! `[-1, 1]^d`, the triangle with vertices `(-1, -1), (1, -1), (-1, 1)` and the tetrahedron with
//! vertices `(-1, -1, -1), (1, -1, -1), (-1, 1, -1), (-1, -1, 1)`.
//!
//! Rules are returned as plain `(weights, points)` pairs so that they can be converted into
//! whatever scalar type the caller assembles with.

pub mod simplex;
pub mod tensor;
pub mod univariate;

/// A D-dimensional point.
pub type Point<const D: usize> = [f64; D];

/// A two-dimensional point.
pub type Point2 = Point<2>;

/// A three-dimensional point.
pub type Point3 = Point<3>;

/// A D-dimensional rule.
pub type Rule<const D: usize> = (Vec<f64>, Vec<Point<D>>);

/// A two-dimensional quadrature rule.
pub type Rule2d = Rule<2>;

/// A three-dimensional rule.
pub type Rule3d = Rule<3>;

/// Approximates the integral of `f` with the given rule.
pub fn integrate<const D: usize>(rule: &Rule<D>, f: impl Fn(&Point<D>) -> f64) -> f64 {
    let (weights, points) = rule;
    weights.iter().zip(points).map(|(w, x)| w * f(x)).sum()
}
