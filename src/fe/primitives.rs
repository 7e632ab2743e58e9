//! Closed-form geometric quantities of first-order simplices.
//!
//! Each function dispatches on the element type at runtime and on the spatial dimension `D` at
//! compile time. Combinations without a formula fail with [`NotImplemented`].
use crate::dense::{cross_product, Array1D, DenseMatrixSymm, DenseVector};
use crate::fe::{ElementType, NotImplemented};
use crate::mesh::Mesh;
use galerkin_traits::Real;
use numeric_literals::replace_float_literals;

/// Vertex coordinates of `mesh` as fixed-size vectors.
///
/// # Panics
///
/// Panics if `D` differs from the dimension of the mesh.
pub fn coordinates<T: Real, const D: usize>(mesh: &Mesh<T>) -> Array1D<DenseVector<T, D>> {
    assert_eq!(mesh.dim(), D, "mesh dimension does not match the requested dimension");
    (0..mesh.num_vertices())
        .map(|v| DenseVector::from_fn(|d| mesh.vertex(v)[d]))
        .collect()
}

fn embed<T: Real, const D: usize>(v: &DenseVector<T, D>) -> DenseVector<T, 3> {
    DenseVector::from_fn(|d| if d < D { v[d] } else { T::zero() })
}

/// Signed volume of an element.
#[replace_float_literals(T::from_constant(literal))]
pub fn volume<T: Real, const D: usize>(element: ElementType, coords: &[DenseVector<T, D>]) -> Result<T, NotImplemented> {
    match (element, D) {
        (ElementType::Edge2, 1) => Ok((coords[0][0] - coords[1][0]).abs()),
        (ElementType::Edge2, _) => Ok((coords[0] - coords[1]).magnitude()),
        (ElementType::Tri3, 2) => {
            let (x1, y1) = (coords[0][0], coords[0][1]);
            let (x2, y2) = (coords[1][0], coords[1][1]);
            let (x3, y3) = (coords[2][0], coords[2][1]);
            Ok(0.5 * (x2 * y3 - x3 * y2 - x1 * (y3 - y2) + y1 * (x3 - x2)))
        }
        (ElementType::Tet4, 3) => {
            let p: Vec<DenseVector<T, 3>> = coords.iter().map(embed).collect();
            let v0 = p[1] - p[0];
            let v1 = p[2] - p[0];
            let v2 = p[3] - p[0];
            Ok(cross_product(&v0, &v1).dot(&v2) / 6.0)
        }
        _ => Err(NotImplemented::new("Volume calculation", element, D)),
    }
}

/// Area of a face of `element`, given the coordinates of the face nodes.
pub fn face_area<T: Real, const D: usize>(
    element: ElementType,
    face_coords: &[DenseVector<T, D>],
) -> Result<T, NotImplemented> {
    match (element, D) {
        (ElementType::Edge2, 1) => Ok(T::one()),
        (ElementType::Tri3, 2) => Ok((face_coords[0] - face_coords[1]).magnitude()),
        (ElementType::Tet4, 3) => {
            let p: Vec<DenseVector<T, 3>> = face_coords.iter().map(embed).collect();
            let n = cross_product(&(p[1] - p[0]), &(p[2] - p[0]));
            Ok(n.magnitude() * T::from_constant(0.5))
        }
        _ => Err(NotImplemented::new("Face area calculation", element, D)),
    }
}

/// Physical gradients of the shape functions, one per element node.
#[replace_float_literals(T::from_constant(literal))]
pub fn grad_shape<T: Real, const D: usize>(
    element: ElementType,
    coords: &[DenseVector<T, D>],
    volume: T,
) -> Result<Vec<DenseVector<T, D>>, NotImplemented> {
    match (element, D) {
        (ElementType::Edge2, 1) => {
            let c = 1.0 / volume;
            Ok(vec![DenseVector::from_fn(|_| -c), DenseVector::from_fn(|_| c)])
        }
        (ElementType::Tri3, 2) => {
            let x21 = coords[1][0] - coords[0][0];
            let x31 = coords[2][0] - coords[0][0];
            let y21 = coords[1][1] - coords[0][1];
            let y31 = coords[2][1] - coords[0][1];
            let c = 0.5 / volume;
            let row = |a: T, b: T| DenseVector::from_fn(|d| if d == 0 { a } else { b });
            Ok(vec![
                row(c * (y21 - y31), c * (x31 - x21)),
                row(c * y31, -c * x31),
                row(-c * y21, c * x21),
            ])
        }
        _ => Err(NotImplemented::new("Calculation of shape function gradients", element, D)),
    }
}

/// Outward normal of the face opposite to the node with shape function gradient `grad`.
#[replace_float_literals(T::from_constant(literal))]
pub fn normal<T: Real, const D: usize>(
    element: ElementType,
    volume: T,
    edge_len: T,
    grad: &DenseVector<T, D>,
) -> Result<DenseVector<T, D>, NotImplemented> {
    match (element, D) {
        (ElementType::Edge2, 1) => Ok(*grad * (-volume)),
        (ElementType::Tri3, 2) => Ok(*grad * (-2.0 * volume / edge_len)),
        _ => Err(NotImplemented::new("Computation of a normal", element, D)),
    }
}

/// Smallest element height, computed from the shape function gradients.
#[replace_float_literals(T::from_constant(literal))]
pub fn element_length<T: Real, const D: usize>(
    element: ElementType,
    grad_phi: &[DenseVector<T, D>],
) -> Result<T, NotImplemented> {
    match (element, D) {
        (ElementType::Edge2, 1) | (ElementType::Tri3, 2) => Ok(grad_phi
            .iter()
            .map(|g| 1.0 / g.magnitude())
            .reduce(|h, hi| h.min(hi))
            .unwrap_or(0.0)),
        _ => Err(NotImplemented::new("Computation of an element length", element, D)),
    }
}

/// Consistent mass matrix of an element with the given volume.
#[replace_float_literals(T::from_constant(literal))]
pub fn mass<T: Real, const N: usize>(element: ElementType, volume: T) -> Result<DenseMatrixSymm<T, N>, NotImplemented> {
    let factor = match element {
        ElementType::Edge2 => volume / 6.0,
        ElementType::Tri3 => volume / 12.0,
        ElementType::Tet4 => volume / 20.0,
        _ => return Err(NotImplemented::new("Mass matrix", element, element.dim())),
    };
    assert_eq!(element.num_nodes(), N, "matrix size must match the number of element nodes");
    let mut m = DenseMatrixSymm::zero();
    for i in 0..N {
        for j in i..N {
            m.set(i, j, if i == j { 2.0 } else { 1.0 });
        }
    }
    m.scale(factor);
    Ok(m)
}

/// Row-summed (lumped) mass matrix of an element with the given volume.
#[replace_float_literals(T::from_constant(literal))]
pub fn mass_lumped<T: Real, const N: usize>(
    element: ElementType,
    volume: T,
) -> Result<DenseMatrixSymm<T, N>, NotImplemented> {
    let diagonal = match element {
        ElementType::Edge2 => 3.0 * volume / 6.0,
        ElementType::Tri3 => 4.0 * volume / 12.0,
        _ => return Err(NotImplemented::new("Lumped mass matrix", element, element.dim())),
    };
    assert_eq!(element.num_nodes(), N, "matrix size must match the number of element nodes");
    let mut m = DenseMatrixSymm::zero();
    for i in 0..N {
        m.set(i, i, diagonal);
    }
    Ok(m)
}

fn cell_coordinates<T: Real, const D: usize>(
    coords: &Array1D<DenseVector<T, D>>,
    cell: &[usize],
) -> Vec<DenseVector<T, D>> {
    cell.iter().map(|&v| coords[v]).collect()
}

/// Volumes of all cells of `mesh`.
pub fn calc_volumes<T: Real, const D: usize>(mesh: &Mesh<T>) -> Result<Array1D<T>, NotImplemented> {
    let coords = coordinates::<T, D>(mesh);
    (0..mesh.num_cells())
        .map(|e| volume(mesh.element(), &cell_coordinates(&coords, mesh.cell(e))))
        .collect::<Result<Vec<_>, _>>()
        .map(Array1D::from)
}

/// Shape function gradients of all cells of `mesh`.
pub fn calc_grad_shape<T: Real, const D: usize>(
    mesh: &Mesh<T>,
    volumes: &Array1D<T>,
) -> Result<Array1D<Vec<DenseVector<T, D>>>, NotImplemented> {
    let coords = coordinates::<T, D>(mesh);
    (0..mesh.num_cells())
        .map(|e| grad_shape(mesh.element(), &cell_coordinates(&coords, mesh.cell(e)), volumes[e]))
        .collect::<Result<Vec<_>, _>>()
        .map(Array1D::from)
}

pub fn calc_element_length<T: Real, const D: usize>(
    element: ElementType,
    grad_phi: &Array1D<Vec<DenseVector<T, D>>>,
) -> Result<Array1D<T>, NotImplemented> {
    grad_phi
        .iter()
        .map(|grads| element_length(element, grads))
        .collect::<Result<Vec<_>, _>>()
        .map(Array1D::from)
}
