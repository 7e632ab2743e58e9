use crate::fe::{ElementType, Quadrature};
use galerkin_traits::Real;

/// Basis functions and their reference derivatives tabulated at a fixed set of points.
///
/// The points are grouped into `num_regions` blocks of `num_points` points each: the volume
/// tabulation has a single region, a face tabulation has one region per local face. Entry `k` of
/// [`Tabulation::derivatives`] holds the `k`-th derivatives laid out as
///
/// ```text
/// T[k][((r * Np + q) * Nb + b) * Nc + c) * cdim^k + ...]
/// ```
///
/// For vector-valued fields the basis index is `b = node * Nc + component`.
#[derive(Debug, Clone)]
pub struct Tabulation<T> {
    num_regions: usize,
    num_points: usize,
    num_basis: usize,
    num_components: usize,
    cdim: usize,
    t: Vec<Vec<T>>,
}

impl<T: Real> Tabulation<T> {
    /// Tabulates the Lagrange basis of `element` with `nc` components.
    ///
    /// `regions[r]` holds the reference points of region `r` laid out as `q * dim + d`, and
    /// `k` is the highest derivative order to tabulate.
    pub fn new(element: ElementType, nc: usize, regions: &[Vec<T>], k: usize) -> Self {
        let cdim = element.dim();
        let nodes = element.num_nodes();
        let num_points = regions.first().map(|p| p.len() / cdim.max(1)).unwrap_or(0);
        let num_basis = nodes * nc;
        let nr = regions.len();
        let block = num_basis * nc;

        let mut t: Vec<Vec<T>> = (0..=k)
            .map(|order| vec![T::zero(); nr * num_points * block * cdim.pow(order as u32)])
            .collect();

        let mut phi = vec![T::zero(); nodes];
        let mut grad = vec![T::zero(); nodes * cdim];
        let mut hess = vec![T::zero(); nodes * cdim * cdim];

        for (r, points) in regions.iter().enumerate() {
            assert_eq!(points.len(), num_points * cdim, "all regions must have the same number of points");
            for q in 0..num_points {
                let xi = &points[q * cdim..(q + 1) * cdim];
                element.evaluate_basis(xi, &mut phi);
                if k >= 1 {
                    element.gradients(xi, &mut grad);
                }
                if k >= 2 {
                    element.hessians(xi, &mut hess);
                }
                let base = (r * num_points + q) * num_basis;
                for node in 0..nodes {
                    for comp in 0..nc {
                        let b = node * nc + comp;
                        let idx = (base + b) * nc + comp;
                        t[0][idx] = phi[node];
                        if k >= 1 {
                            t[1][idx * cdim..(idx + 1) * cdim]
                                .copy_from_slice(&grad[node * cdim..(node + 1) * cdim]);
                        }
                        if k >= 2 {
                            let n2 = cdim * cdim;
                            t[2][idx * n2..(idx + 1) * n2].copy_from_slice(&hess[node * n2..(node + 1) * n2]);
                        }
                    }
                }
            }
        }

        Self {
            num_regions: nr,
            num_points,
            num_basis,
            num_components: nc,
            cdim,
            t,
        }
    }

    /// Tabulation at the points of `quadrature` (single region).
    pub fn volume(element: ElementType, nc: usize, quadrature: &Quadrature<T>, k: usize) -> Self {
        Self::new(element, nc, &[quadrature.points().to_vec()], k)
    }

    /// Tabulation at the face quadrature mapped onto every local face of `element`.
    pub fn faces(element: ElementType, nc: usize, face_quadrature: &Quadrature<T>, k: usize) -> Self {
        let dim = element.dim();
        let regions: Vec<Vec<T>> = (0..element.num_faces())
            .map(|f| {
                let mut points = vec![T::zero(); face_quadrature.num_points() * dim];
                for q in 0..face_quadrature.num_points() {
                    element.map_face_point(f, face_quadrature.point_at(q), &mut points[q * dim..(q + 1) * dim]);
                }
                points
            })
            .collect();
        Self::new(element, nc, &regions, k)
    }

    pub fn num_regions(&self) -> usize {
        self.num_regions
    }

    pub fn num_points(&self) -> usize {
        self.num_points
    }

    pub fn num_basis(&self) -> usize {
        self.num_basis
    }

    pub fn num_components(&self) -> usize {
        self.num_components
    }

    pub fn cdim(&self) -> usize {
        self.cdim
    }

    /// Highest tabulated derivative order.
    pub fn max_derivative(&self) -> usize {
        self.t.len() - 1
    }

    pub fn derivatives(&self, k: usize) -> &[T] {
        &self.t[k]
    }

    /// Basis values at point `q` of region `r`, laid out as `b * Nc + c`.
    pub fn values_at(&self, r: usize, q: usize) -> &[T] {
        let stride = self.num_basis * self.num_components;
        let start = (r * self.num_points + q) * stride;
        &self.t[0][start..start + stride]
    }

    /// Reference gradients at point `q` of region `r`, laid out as `(b * Nc + c) * cdim + d`.
    pub fn gradients_at(&self, r: usize, q: usize) -> &[T] {
        let stride = self.num_basis * self.num_components * self.cdim;
        let start = (r * self.num_points + q) * stride;
        &self.t[1][start..start + stride]
    }

    /// Reference Hessians at point `q` of region `r`, `None` unless second derivatives were
    /// tabulated.
    pub fn hessians_at(&self, r: usize, q: usize) -> Option<&[T]> {
        let t2 = self.t.get(2)?;
        let stride = self.num_basis * self.num_components * self.cdim * self.cdim;
        let start = (r * self.num_points + q) * stride;
        Some(&t2[start..start + stride])
    }
}
