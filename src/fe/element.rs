use galerkin_traits::Real;
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

/// Reference cell types with first-order Lagrange bases.
///
/// Reference cells live in `[-1, 1]^d`:
///
/// - `Edge2`: nodes `-1`, `1`.
/// - `Tri3`: nodes `(-1, -1)`, `(1, -1)`, `(-1, 1)`.
/// - `Quad4`: nodes `(-1, -1)`, `(1, -1)`, `(1, 1)`, `(-1, 1)`.
/// - `Tet4`: nodes `(-1, -1, -1)`, `(1, -1, -1)`, `(-1, 1, -1)`, `(-1, -1, 1)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ElementType {
    Edge2,
    Tri3,
    Quad4,
    Tet4,
}

impl Display for ElementType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Edge2 => "EDGE2",
            Self::Tri3 => "TRI3",
            Self::Quad4 => "QUAD4",
            Self::Tet4 => "TET4",
        };
        write!(f, "{}", name)
    }
}

const EDGE2_NODES: [[f64; 3]; 2] = [[-1.0, 0.0, 0.0], [1.0, 0.0, 0.0]];
const TRI3_NODES: [[f64; 3]; 3] = [[-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [-1.0, 1.0, 0.0]];
const QUAD4_NODES: [[f64; 3]; 4] = [[-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [1.0, 1.0, 0.0], [-1.0, 1.0, 0.0]];
const TET4_NODES: [[f64; 3]; 4] = [
    [-1.0, -1.0, -1.0],
    [1.0, -1.0, -1.0],
    [-1.0, 1.0, -1.0],
    [-1.0, -1.0, 1.0],
];

const EDGE2_FACES: [&[usize]; 2] = [&[0], &[1]];
const TRI3_FACES: [&[usize]; 3] = [&[0, 1], &[1, 2], &[2, 0]];
const QUAD4_FACES: [&[usize]; 4] = [&[0, 1], &[1, 2], &[2, 3], &[3, 0]];
const TET4_FACES: [&[usize]; 4] = [&[0, 2, 1], &[0, 1, 3], &[0, 3, 2], &[1, 2, 3]];

impl ElementType {
    /// Dimension of the reference cell.
    pub fn dim(&self) -> usize {
        match self {
            Self::Edge2 => 1,
            Self::Tri3 | Self::Quad4 => 2,
            Self::Tet4 => 3,
        }
    }

    pub fn num_nodes(&self) -> usize {
        match self {
            Self::Edge2 => 2,
            Self::Tri3 => 3,
            Self::Quad4 | Self::Tet4 => 4,
        }
    }

    pub fn num_faces(&self) -> usize {
        self.faces().len()
    }

    /// Local node indices of each face.
    pub fn faces(&self) -> &'static [&'static [usize]] {
        match self {
            Self::Edge2 => &EDGE2_FACES,
            Self::Tri3 => &TRI3_FACES,
            Self::Quad4 => &QUAD4_FACES,
            Self::Tet4 => &TET4_FACES,
        }
    }

    /// Element type of the faces, `None` for the vertex faces of a segment.
    pub fn face_type(&self) -> Option<ElementType> {
        match self {
            Self::Edge2 => None,
            Self::Tri3 | Self::Quad4 => Some(Self::Edge2),
            Self::Tet4 => Some(Self::Tri3),
        }
    }

    /// Reference coordinates of `node`.
    pub fn reference_node<T: Real>(&self, node: usize) -> Vec<T> {
        let nodes: &[[f64; 3]] = match self {
            Self::Edge2 => &EDGE2_NODES,
            Self::Tri3 => &TRI3_NODES,
            Self::Quad4 => &QUAD4_NODES,
            Self::Tet4 => &TET4_NODES,
        };
        nodes[node][..self.dim()]
            .iter()
            .map(|&x| T::from_constant(x))
            .collect()
    }

    /// Evaluates all basis functions at `xi`.
    #[replace_float_literals(T::from_constant(literal))]
    pub fn evaluate_basis<T: Real>(&self, xi: &[T], phi: &mut [T]) {
        match self {
            Self::Edge2 => {
                phi[0] = (1.0 - xi[0]) / 2.0;
                phi[1] = (1.0 + xi[0]) / 2.0;
            }
            Self::Tri3 => {
                phi[0] = -(xi[0] + xi[1]) / 2.0;
                phi[1] = (1.0 + xi[0]) / 2.0;
                phi[2] = (1.0 + xi[1]) / 2.0;
            }
            Self::Quad4 => {
                let (x, y) = (xi[0], xi[1]);
                phi[0] = (1.0 - x) * (1.0 - y) / 4.0;
                phi[1] = (1.0 + x) * (1.0 - y) / 4.0;
                phi[2] = (1.0 + x) * (1.0 + y) / 4.0;
                phi[3] = (1.0 - x) * (1.0 + y) / 4.0;
            }
            Self::Tet4 => {
                phi[0] = -(1.0 + xi[0] + xi[1] + xi[2]) / 2.0;
                phi[1] = (1.0 + xi[0]) / 2.0;
                phi[2] = (1.0 + xi[1]) / 2.0;
                phi[3] = (1.0 + xi[2]) / 2.0;
            }
        }
    }

    /// Reference gradients of all basis functions at `xi`, laid out as `grad[n * dim + d]`.
    #[replace_float_literals(T::from_constant(literal))]
    pub fn gradients<T: Real>(&self, xi: &[T], grad: &mut [T]) {
        match self {
            Self::Edge2 => {
                grad[0] = -0.5;
                grad[1] = 0.5;
            }
            Self::Tri3 => {
                grad[..6].copy_from_slice(&[-0.5, -0.5, 0.5, 0.0, 0.0, 0.5]);
            }
            Self::Quad4 => {
                let (x, y) = (xi[0], xi[1]);
                grad[..8].copy_from_slice(&[
                    -(1.0 - y) / 4.0,
                    -(1.0 - x) / 4.0,
                    (1.0 - y) / 4.0,
                    -(1.0 + x) / 4.0,
                    (1.0 + y) / 4.0,
                    (1.0 + x) / 4.0,
                    -(1.0 + y) / 4.0,
                    (1.0 - x) / 4.0,
                ]);
            }
            Self::Tet4 => {
                #[rustfmt::skip]
                grad[..12].copy_from_slice(&[
                    -0.5, -0.5, -0.5,
                    0.5, 0.0, 0.0,
                    0.0, 0.5, 0.0,
                    0.0, 0.0, 0.5,
                ]);
            }
        }
    }

    /// Reference Hessians of all basis functions, laid out as `hess[(n * dim + d1) * dim + d2]`.
    ///
    /// Only the bilinear quadrilateral has non-zero second derivatives.
    #[replace_float_literals(T::from_constant(literal))]
    pub fn hessians<T: Real>(&self, _xi: &[T], hess: &mut [T]) {
        let d = self.dim();
        hess[..self.num_nodes() * d * d].fill(0.0);
        if let Self::Quad4 = self {
            // d2phi/dxdy for each node
            let mixed = [0.25, -0.25, 0.25, -0.25];
            for (n, &m) in mixed.iter().enumerate() {
                hess[(n * d) * d + 1] = m;
                hess[(n * d + 1) * d] = m;
            }
        }
    }

    /// Maps a point of the reference face `face` into reference coordinates of the cell.
    ///
    /// For segments the face point is empty and the vertex itself is returned.
    pub fn map_face_point<T: Real>(&self, face: usize, xi_face: &[T], xi: &mut [T]) {
        let nodes = self.faces()[face];
        let dim = self.dim();
        let mut phi = [T::zero(); 3];
        match self.face_type() {
            Some(face_type) => face_type.evaluate_basis(xi_face, &mut phi),
            None => phi[0] = T::one(),
        }
        xi[..dim].fill(T::zero());
        for (i, &node) in nodes.iter().enumerate() {
            let x = self.reference_node::<T>(node);
            for d in 0..dim {
                xi[d] += phi[i] * x[d];
            }
        }
    }
}
