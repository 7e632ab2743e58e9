use crate::fe::ElementType;
use galerkin_quadrature::simplex::{tetrahedron_collapsed_gauss, triangle_collapsed_gauss};
use galerkin_quadrature::tensor::quadrilateral_gauss;
use galerkin_quadrature::{univariate, Rule};
use galerkin_traits::Real;

/// A quadrature rule on a reference cell.
///
/// Points are stored flat as `points[q * dim + d]` and weights as `weights[q * n_comp + c]`.
/// Only scalar rules (`n_comp == 1`) can be used for assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct Quadrature<T> {
    dim: usize,
    n_comp: usize,
    points: Vec<T>,
    weights: Vec<T>,
}

impl<T: Real> Quadrature<T> {
    /// Builds a rule from raw points and weights.
    ///
    /// # Panics
    ///
    /// Panics if the lengths of `points` and `weights` do not describe the same number of points.
    pub fn from_parts(dim: usize, n_comp: usize, points: Vec<T>, weights: Vec<T>) -> Self {
        assert!(n_comp > 0, "a quadrature rule needs at least one weight component");
        let n = weights.len() / n_comp;
        assert_eq!(weights.len(), n * n_comp);
        assert_eq!(points.len(), n * dim, "points and weights disagree on the number of points");
        Self {
            dim,
            n_comp,
            points,
            weights,
        }
    }

    /// The rule with a single point and unit weight on a 0-dimensional cell.
    pub fn point() -> Self {
        Self::from_parts(0, 1, Vec::new(), vec![T::one()])
    }

    /// Gauss–Legendre rule on `[-1, 1]` with `num_points` points.
    pub fn gauss(num_points: usize) -> Self {
        Self::from_rule(univariate::gauss(num_points))
    }

    /// Default rule for `element` with `order + 1` points per direction.
    pub fn for_element(element: ElementType, order: usize) -> Self {
        let n = order + 1;
        match element {
            ElementType::Edge2 => Self::from_rule(univariate::gauss(n)),
            ElementType::Quad4 => Self::from_rule(quadrilateral_gauss(n)),
            ElementType::Tri3 => Self::from_rule(triangle_collapsed_gauss(n)),
            ElementType::Tet4 => Self::from_rule(tetrahedron_collapsed_gauss(n)),
        }
    }

    /// Converts a scalar `(weights, points)` rule into the flat layout.
    pub fn from_rule<const D: usize>((weights, points): Rule<D>) -> Self {
        let points = points
            .iter()
            .flatten()
            .map(|&x| T::from_constant(x))
            .collect();
        let weights = weights.iter().map(|&w| T::from_constant(w)).collect();
        Self::from_parts(D, 1, points, weights)
    }

    /// Rule on the faces of `element`.
    pub fn for_faces(element: ElementType, order: usize) -> Self {
        match element.face_type() {
            Some(face) => Self::for_element(face, order),
            None => Self::point(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn num_components(&self) -> usize {
        self.n_comp
    }

    pub fn num_points(&self) -> usize {
        self.weights.len() / self.n_comp
    }

    pub fn points(&self) -> &[T] {
        &self.points
    }

    pub fn weights(&self) -> &[T] {
        &self.weights
    }

    pub fn point_at(&self, q: usize) -> &[T] {
        &self.points[q * self.dim..(q + 1) * self.dim]
    }
}
