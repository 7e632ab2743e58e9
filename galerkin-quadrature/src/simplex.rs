//! Rules for the reference triangle and tetrahedron obtained by collapsing tensor rules.
//!
//! The Duffy transformation maps `[-1, 1]^d` onto the reference simplex by collapsing one face
//! of the cube onto a vertex. Pulling a Gauss tensor rule back through it gives a rule with
//! positive weights whose points all lie strictly inside the simplex.

use crate::tensor::{hexahedron_gauss, quadrilateral_gauss};
use crate::Rule;

/// A collapsed Gauss rule for the reference triangle with `num_points_per_dim^2` points.
///
/// With `n` points per dimension the rule integrates polynomials of total degree `2 n - 2`
/// exactly.
pub fn triangle_collapsed_gauss(num_points_per_dim: usize) -> Rule<2> {
    let (square_weights, square_points) = quadrilateral_gauss(num_points_per_dim);
    let mut weights = Vec::with_capacity(square_weights.len());
    let mut points = Vec::with_capacity(square_points.len());

    for (w, [a, b]) in square_weights.into_iter().zip(square_points) {
        let collapse = 0.5 * (1.0 - b);
        points.push([(1.0 + a) * collapse - 1.0, b]);
        weights.push(w * collapse);
    }

    (weights, points)
}

/// A collapsed Gauss rule for the reference tetrahedron with `num_points_per_dim^3` points.
///
/// With `n` points per dimension the rule integrates polynomials of total degree `2 n - 3`
/// exactly.
pub fn tetrahedron_collapsed_gauss(num_points_per_dim: usize) -> Rule<3> {
    let (cube_weights, cube_points) = hexahedron_gauss(num_points_per_dim);
    let mut weights = Vec::with_capacity(cube_weights.len());
    let mut points = Vec::with_capacity(cube_points.len());

    for (w, [a, b, c]) in cube_weights.into_iter().zip(cube_points) {
        let collapse_c = 0.5 * (1.0 - c);
        let collapse_b = 0.5 * (1.0 - b);
        points.push([
            (1.0 + a) * collapse_b * collapse_c - 1.0,
            (1.0 + b) * collapse_c - 1.0,
            c,
        ]);
        weights.push(w * collapse_b * collapse_c * collapse_c);
    }

    (weights, points)
}
