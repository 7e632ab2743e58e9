use crate::dense::{DenseMatrix, DenseVector, SingularMatrixError, SmallSquare};
use crate::fe::{ElementType, Quadrature};
use eyre::eyre;
use galerkin_traits::Real;

/// Geometry of a batch of elements (or element faces) at quadrature points.
///
/// Per element `e` and point `q` with `i = e * Np + q`:
///
/// - `v[i * dE + d]`: physical coordinates,
/// - `J[(i * dE + a) * dim + b]`: `dx_a / dxi_b`,
/// - `invJ[(i * dim + b) * dE + a]`: `dxi_b / dx_a`,
/// - `detJ[i]`: the cell Jacobian determinant, or the face measure for faces.
///
/// For faces the Jacobians are those of the supporting cell so that reference gradients
/// tabulated on the cell can be pushed forward, and `normals` holds the outward unit normal.
#[derive(Debug, Clone)]
pub struct FEGeom<T> {
    n_elems: usize,
    n_points: usize,
    dim: usize,
    dim_embed: usize,
    v: Vec<T>,
    jacobian: Vec<T>,
    inv_jacobian: Vec<T>,
    det_jacobian: Vec<T>,
    normals: Vec<T>,
    faces: Vec<usize>,
}

/// Geometry at a single quadrature point of a single element.
#[derive(Debug, Copy, Clone)]
pub struct PointGeom<'a, T> {
    pub v: &'a [T],
    pub jacobian: &'a [T],
    pub inv_jacobian: &'a [T],
    pub det_jacobian: T,
    pub normal: Option<&'a [T]>,
}

/// Inverts the `dim x dim` Jacobian `j`, returning its determinant.
fn invert<T: Real>(dim: usize, j: &[T], inv: &mut [T]) -> Result<T, SingularMatrixError> {
    fn invert_n<T: Real, const N: usize>(j: &[T], inv: &mut [T]) -> Result<T, SingularMatrixError>
    where
        DenseMatrix<T, N, N>: SmallSquare<Scalar = T>,
    {
        let m = DenseMatrix::<T, N, N>::from_fn(|r, c| j[r * N + c]);
        let m_inv = m.inverse()?;
        inv[..N * N].copy_from_slice(&m_inv.to_row_major());
        Ok(m.determinant())
    }

    match dim {
        1 => invert_n::<T, 1>(j, inv),
        2 => invert_n::<T, 2>(j, inv),
        3 => invert_n::<T, 3>(j, inv),
        _ => panic!("unsupported reference dimension {}", dim),
    }
}

/// Physical point and reference Jacobian of a cell at the reference point `xi`.
fn map_point<T: Real>(element: ElementType, coords: &[T], xi: &[T], x: &mut [T], jacobian: &mut [T]) {
    let dim = element.dim();
    let nodes = element.num_nodes();
    let mut phi = [T::zero(); 4];
    let mut grad = [T::zero(); 12];
    element.evaluate_basis(xi, &mut phi);
    element.gradients(xi, &mut grad);
    x[..dim].fill(T::zero());
    jacobian[..dim * dim].fill(T::zero());
    for n in 0..nodes {
        for a in 0..dim {
            let xa = coords[n * dim + a];
            x[a] += phi[n] * xa;
            for b in 0..dim {
                jacobian[a * dim + b] += xa * grad[n * dim + b];
            }
        }
    }
}

fn centroid<T: Real>(element: ElementType, coords: &[T], out: &mut [T]) {
    let dim = element.dim();
    let nodes = element.num_nodes();
    out[..dim].fill(T::zero());
    for n in 0..nodes {
        for d in 0..dim {
            out[d] += coords[n * dim + d];
        }
    }
    for d in 0..dim {
        out[d] /= T::from_count(nodes);
    }
}

/// Unnormalized normal of a face and its measure relative to the reference face.
fn face_normal<T: Real>(element: ElementType, coords: &[T], face: usize) -> (DenseVector<T, 3>, T) {
    let dim = element.dim();
    let nodes = element.faces()[face];
    let node = |i: usize| DenseVector::<T, 3>::from_fn(|d| if d < dim { coords[nodes[i] * dim + d] } else { T::zero() });
    let half = T::from_constant(0.5);
    match dim {
        1 => (DenseVector::from_array([T::one(), T::zero(), T::zero()]), T::one()),
        2 => {
            let mut t = node(1) - node(0);
            t.scale(half);
            let n = DenseVector::from_array([t[1], -t[0], T::zero()]);
            let measure = n.magnitude();
            (n, measure)
        }
        _ => {
            let mut t1 = node(1) - node(0);
            let mut t2 = node(2) - node(0);
            t1.scale(half);
            t2.scale(half);
            let n = t1.cross(&t2);
            let measure = n.magnitude();
            (n, measure)
        }
    }
}

impl<T: Real> FEGeom<T> {
    fn allocate(n_elems: usize, n_points: usize, dim: usize) -> Self {
        let n = n_elems * n_points;
        Self {
            n_elems,
            n_points,
            dim,
            dim_embed: dim,
            v: vec![T::zero(); n * dim],
            jacobian: vec![T::zero(); n * dim * dim],
            inv_jacobian: vec![T::zero(); n * dim * dim],
            det_jacobian: vec![T::zero(); n],
            normals: Vec::new(),
            faces: Vec::new(),
        }
    }

    /// Computes the geometry of cells at the points of `quadrature`.
    ///
    /// `cell_coords` holds the vertex coordinates of every cell, `nodes * dim` values per cell.
    pub fn for_cells(element: ElementType, cell_coords: &[T], quadrature: &Quadrature<T>) -> eyre::Result<Self> {
        let dim = element.dim();
        let stride = element.num_nodes() * dim;
        let n_elems = cell_coords.len() / stride;
        let np = quadrature.num_points();
        let mut geom = Self::allocate(n_elems, np, dim);

        for e in 0..n_elems {
            let coords = &cell_coords[e * stride..(e + 1) * stride];
            for q in 0..np {
                let i = e * np + q;
                geom.fill_point(element, coords, quadrature.point_at(q), i)?;
            }
        }
        Ok(geom)
    }

    /// Computes the geometry of cell faces at the points of `face_quadrature`.
    ///
    /// `faces[e]` is the local index of the face of cell `e`.
    pub fn for_faces(
        element: ElementType,
        cell_coords: &[T],
        faces: &[usize],
        face_quadrature: &Quadrature<T>,
    ) -> eyre::Result<Self> {
        let dim = element.dim();
        let stride = element.num_nodes() * dim;
        let n_elems = faces.len();
        assert_eq!(cell_coords.len(), n_elems * stride, "one face per cell is required");
        let np = face_quadrature.num_points();
        let mut geom = Self::allocate(n_elems, np, dim);
        geom.normals = vec![T::zero(); n_elems * np * dim];
        geom.faces = faces.to_vec();

        let mut xi = [T::zero(); 3];
        let mut center = [T::zero(); 3];
        for (e, &face) in faces.iter().enumerate() {
            let coords = &cell_coords[e * stride..(e + 1) * stride];
            centroid(element, coords, &mut center);
            let (mut normal, measure) = face_normal(element, coords, face);
            normal = normal.normalize();

            for q in 0..np {
                let i = e * np + q;
                element.map_face_point(face, face_quadrature.point_at(q), &mut xi);
                geom.fill_point(element, coords, &xi[..dim], i)?;
                geom.det_jacobian[i] = measure;

                let x = &geom.v[i * dim..(i + 1) * dim];
                let outward = (0..dim).fold(T::zero(), |acc, d| acc + (x[d] - center[d]) * normal[d]);
                let sign = if outward < T::zero() { -T::one() } else { T::one() };
                for d in 0..dim {
                    geom.normals[i * dim + d] = sign * normal[d];
                }
            }
        }
        Ok(geom)
    }

    fn fill_point(&mut self, element: ElementType, coords: &[T], xi: &[T], i: usize) -> eyre::Result<()> {
        let dim = self.dim;
        let n2 = dim * dim;
        map_point(
            element,
            coords,
            xi,
            &mut self.v[i * dim..(i + 1) * dim],
            &mut self.jacobian[i * n2..(i + 1) * n2],
        );
        let det = invert(
            dim,
            &self.jacobian[i * n2..(i + 1) * n2],
            &mut self.inv_jacobian[i * n2..(i + 1) * n2],
        )
        .map_err(|_| eyre!("Singular element Jacobian encountered"))?;
        self.det_jacobian[i] = det;
        Ok(())
    }

    pub fn num_elements(&self) -> usize {
        self.n_elems
    }

    pub fn num_points(&self) -> usize {
        self.n_points
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn dim_embed(&self) -> usize {
        self.dim_embed
    }

    pub fn is_face_geometry(&self) -> bool {
        !self.faces.is_empty()
    }

    /// Local face index of element `e`, zero for cell geometry.
    pub fn face(&self, e: usize) -> usize {
        self.faces.get(e).copied().unwrap_or(0)
    }

    pub fn point(&self, e: usize, q: usize) -> PointGeom<'_, T> {
        let i = e * self.n_points + q;
        let (d, de) = (self.dim, self.dim_embed);
        PointGeom {
            v: &self.v[i * de..(i + 1) * de],
            jacobian: &self.jacobian[i * de * d..(i + 1) * de * d],
            inv_jacobian: &self.inv_jacobian[i * d * de..(i + 1) * d * de],
            det_jacobian: self.det_jacobian[i],
            normal: if self.normals.is_empty() {
                None
            } else {
                Some(&self.normals[i * de..(i + 1) * de])
            },
        }
    }

    /// Restricts the geometry to the elements in `range`.
    pub fn slice(&self, range: std::ops::Range<usize>) -> Self {
        let np = self.n_points;
        let (d, de) = (self.dim, self.dim_embed);
        let pts = range.start * np..range.end * np;
        Self {
            n_elems: range.len(),
            n_points: np,
            dim: d,
            dim_embed: de,
            v: self.v[pts.start * de..pts.end * de].to_vec(),
            jacobian: self.jacobian[pts.start * de * d..pts.end * de * d].to_vec(),
            inv_jacobian: self.inv_jacobian[pts.start * d * de..pts.end * d * de].to_vec(),
            det_jacobian: self.det_jacobian[pts.clone()].to_vec(),
            normals: if self.normals.is_empty() {
                Vec::new()
            } else {
                self.normals[pts.start * de..pts.end * de].to_vec()
            },
            faces: if self.faces.is_empty() {
                Vec::new()
            } else {
                self.faces[range].to_vec()
            },
        }
    }
}
