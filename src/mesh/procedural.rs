//! Basic procedural mesh generation routines.
use crate::fe::ElementType;
use crate::mesh::{Facet, Mesh};
use galerkin_traits::Real;
use itertools::iproduct;

/// Uniform mesh of `[x_min, x_max]` with `nx` segments.
///
/// Boundary sets: `left`, `right` and `marker` (both ends).
pub fn line_mesh<T: Real>(x_min: T, x_max: T, nx: usize) -> Mesh<T> {
    assert!(nx > 0, "a line mesh needs at least one cell");
    let h = (x_max - x_min) / T::from_count(nx);
    let vertices = (0..=nx).map(|i| x_min + h * T::from_count(i)).collect();
    let cells = (0..nx).flat_map(|i| [i, i + 1]).collect();

    let mut mesh = Mesh::from_vertices_and_connectivity(ElementType::Edge2, vertices, cells);
    let left = Facet { cell: 0, face: 0 };
    let right = Facet { cell: nx - 1, face: 1 };
    mesh.add_boundary("left", vec![left]);
    mesh.add_boundary("right", vec![right]);
    mesh.add_boundary("marker", vec![left, right]);
    mesh
}

/// Uniform mesh of the rectangle `[x_min, x_max] x [y_min, y_max]` with `nx x ny` quadrilaterals,
/// each split in two when `element` is [`ElementType::Tri3`].
///
/// Boundary sets: `left`, `right`, `bottom`, `top` and `marker` (the whole boundary).
///
/// # Panics
///
/// Panics if `element` is not a two-dimensional element or a dimension has no cells.
pub fn rectangle_mesh<T: Real>(
    element: ElementType,
    (x_min, x_max): (T, T),
    (y_min, y_max): (T, T),
    nx: usize,
    ny: usize,
) -> Mesh<T> {
    assert!(nx > 0 && ny > 0, "a rectangle mesh needs at least one cell in each direction");
    let hx = (x_max - x_min) / T::from_count(nx);
    let hy = (y_max - y_min) / T::from_count(ny);
    let vertex = |i: usize, j: usize| j * (nx + 1) + i;

    let mut vertices = Vec::with_capacity(2 * (nx + 1) * (ny + 1));
    for (j, i) in iproduct!(0..=ny, 0..=nx) {
        vertices.push(x_min + hx * T::from_count(i));
        vertices.push(y_min + hy * T::from_count(j));
    }

    let mut cells = Vec::new();
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut bottom = Vec::new();
    let mut top = Vec::new();

    for (j, i) in iproduct!(0..ny, 0..nx) {
        let (a, b, c, d) = (vertex(i, j), vertex(i + 1, j), vertex(i + 1, j + 1), vertex(i, j + 1));
        match element {
            ElementType::Quad4 => {
                let cell = cells.len() / 4;
                cells.extend_from_slice(&[a, b, c, d]);
                if j == 0 {
                    bottom.push(Facet { cell, face: 0 });
                }
                if i == nx - 1 {
                    right.push(Facet { cell, face: 1 });
                }
                if j == ny - 1 {
                    top.push(Facet { cell, face: 2 });
                }
                if i == 0 {
                    left.push(Facet { cell, face: 3 });
                }
            }
            ElementType::Tri3 => {
                let lower = cells.len() / 3;
                let upper = lower + 1;
                cells.extend_from_slice(&[a, b, d, c, d, b]);
                if j == 0 {
                    bottom.push(Facet { cell: lower, face: 0 });
                }
                if i == 0 {
                    left.push(Facet { cell: lower, face: 2 });
                }
                if j == ny - 1 {
                    top.push(Facet { cell: upper, face: 0 });
                }
                if i == nx - 1 {
                    right.push(Facet { cell: upper, face: 2 });
                }
            }
            _ => panic!("rectangle meshes only support {} and {}", ElementType::Quad4, ElementType::Tri3),
        }
    }

    let mut mesh = Mesh::from_vertices_and_connectivity(element, vertices, cells);
    let marker = [&left, &right, &bottom, &top]
        .into_iter()
        .flatten()
        .copied()
        .collect();
    mesh.add_boundary("left", left);
    mesh.add_boundary("right", right);
    mesh.add_boundary("bottom", bottom);
    mesh.add_boundary("top", top);
    mesh.add_boundary("marker", marker);
    mesh
}
