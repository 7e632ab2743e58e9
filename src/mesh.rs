use crate::fe::ElementType;
use galerkin_traits::Real;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod procedural;

/// A face of a cell, identified by the cell index and the local face index.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Facet {
    pub cell: usize,
    pub face: usize,
}

/// Index-based conforming mesh made of a single element type.
///
/// Vertex coordinates are stored flat (`dim` values per vertex) and so is the connectivity
/// (`element.num_nodes()` vertex indices per cell). Cells can be grouped into named regions and
/// boundary facets into named sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh<T> {
    dim: usize,
    element: ElementType,
    vertices: Vec<T>,
    cells: Vec<usize>,
    regions: BTreeMap<String, Vec<usize>>,
    boundaries: BTreeMap<String, Vec<Facet>>,
}

impl<T: Real> Mesh<T> {
    /// Construct a mesh from flat vertex coordinates and connectivity.
    ///
    /// # Panics
    ///
    /// Panics if the array lengths are inconsistent with `element`, or a cell references a
    /// vertex that does not exist.
    pub fn from_vertices_and_connectivity(element: ElementType, vertices: Vec<T>, cells: Vec<usize>) -> Self {
        let dim = element.dim();
        assert_eq!(vertices.len() % dim, 0, "vertex coordinates must have {} entries each", dim);
        assert_eq!(cells.len() % element.num_nodes(), 0, "cells must have {} vertices each", element.num_nodes());
        let num_vertices = vertices.len() / dim;
        assert!(
            cells.iter().all(|&v| v < num_vertices),
            "connectivity references a vertex out of bounds"
        );
        Self {
            dim,
            element,
            vertices,
            cells,
            regions: BTreeMap::new(),
            boundaries: BTreeMap::new(),
        }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn element(&self) -> ElementType {
        self.element
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len() / self.dim
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len() / self.element.num_nodes()
    }

    pub fn vertices(&self) -> &[T] {
        &self.vertices
    }

    pub fn vertex(&self, v: usize) -> &[T] {
        &self.vertices[v * self.dim..(v + 1) * self.dim]
    }

    pub fn cell(&self, e: usize) -> &[usize] {
        let n = self.element.num_nodes();
        &self.cells[e * n..(e + 1) * n]
    }

    /// Vertex indices of face `face` of cell `e`.
    pub fn facet_vertices(&self, facet: Facet) -> impl Iterator<Item = usize> + '_ {
        let cell = self.cell(facet.cell);
        self.element.faces()[facet.face].iter().map(move |&i| cell[i])
    }

    /// Concatenated vertex coordinates of `cells`, as consumed by
    /// [`FEGeom`](crate::fe::FEGeom).
    pub fn cell_coordinates(&self, cells: impl IntoIterator<Item = usize>) -> Vec<T> {
        let mut coords = Vec::new();
        for e in cells {
            for &v in self.cell(e) {
                coords.extend_from_slice(self.vertex(v));
            }
        }
        coords
    }

    pub fn add_region(&mut self, name: &str, cells: Vec<usize>) {
        self.regions.insert(name.to_string(), cells);
    }

    pub fn add_boundary(&mut self, name: &str, facets: Vec<Facet>) {
        self.boundaries.insert(name.to_string(), facets);
    }

    pub fn region(&self, name: &str) -> Option<&[usize]> {
        self.regions.get(name).map(Vec::as_slice)
    }

    pub fn boundary(&self, name: &str) -> Option<&[Facet]> {
        self.boundaries.get(name).map(Vec::as_slice)
    }

    pub fn region_names(&self) -> impl Iterator<Item = &str> {
        self.regions.keys().map(String::as_str)
    }

    pub fn boundary_names(&self) -> impl Iterator<Item = &str> {
        self.boundaries.keys().map(String::as_str)
    }

    /// Vertices touched by the facets of the boundary `name`, sorted and deduplicated.
    pub fn boundary_vertices(&self, name: &str) -> Option<Vec<usize>> {
        let facets = self.boundary(name)?;
        let mut vertices: Vec<usize> = facets
            .iter()
            .flat_map(|&facet| self.facet_vertices(facet))
            .collect();
        vertices.sort_unstable();
        vertices.dedup();
        Some(vertices)
    }
}
