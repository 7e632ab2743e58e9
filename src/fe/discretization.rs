use crate::fe::{ElementType, Quadrature, Tabulation};
use galerkin_traits::Real;

/// First-order Lagrange discretization of one field.
#[derive(Debug, Clone)]
pub struct FiniteElement<T> {
    element: ElementType,
    nc: usize,
    quadrature: Quadrature<T>,
    face_quadrature: Quadrature<T>,
    tabulation: Tabulation<T>,
    face_tabulation: Tabulation<T>,
}

impl<T: Real> FiniteElement<T> {
    /// Creates the discretization with `nc` components, tabulated up to derivative order
    /// `jet_degree` at quadrature points of the given order.
    pub fn new(element: ElementType, nc: usize, qorder: usize, jet_degree: usize) -> Self {
        let quadrature = Quadrature::for_element(element, qorder);
        let face_quadrature = Quadrature::for_faces(element, qorder);
        Self::with_quadrature(element, nc, quadrature, face_quadrature, jet_degree)
    }

    pub fn with_quadrature(
        element: ElementType,
        nc: usize,
        quadrature: Quadrature<T>,
        face_quadrature: Quadrature<T>,
        jet_degree: usize,
    ) -> Self {
        let tabulation = Tabulation::volume(element, nc, &quadrature, jet_degree);
        let face_tabulation = Tabulation::faces(element, nc, &face_quadrature, jet_degree);
        Self {
            element,
            nc,
            quadrature,
            face_quadrature,
            tabulation,
            face_tabulation,
        }
    }

    pub fn element(&self) -> ElementType {
        self.element
    }

    pub fn num_components(&self) -> usize {
        self.nc
    }

    /// Number of local basis functions (`nodes * components`).
    pub fn dimension(&self) -> usize {
        self.element.num_nodes() * self.nc
    }

    pub fn spatial_dimension(&self) -> usize {
        self.element.dim()
    }

    pub fn quadrature(&self) -> &Quadrature<T> {
        &self.quadrature
    }

    pub fn face_quadrature(&self) -> &Quadrature<T> {
        &self.face_quadrature
    }

    pub fn tabulation(&self) -> &Tabulation<T> {
        &self.tabulation
    }

    pub fn face_tabulation(&self) -> &Tabulation<T> {
        &self.face_tabulation
    }

    /// Number of tabulated derivative orders, i.e. 2 when Hessians are available.
    pub fn jet_degree(&self) -> usize {
        self.tabulation.max_derivative()
    }
}

/// The discretizations of all fields of a problem and their offsets in the element closure.
#[derive(Debug, Clone)]
pub struct DiscreteSystem<T> {
    dim: usize,
    fields: Vec<FiniteElement<T>>,
    field_offsets: Vec<usize>,
    component_offsets: Vec<usize>,
}

impl<T: Real> DiscreteSystem<T> {
    pub fn new(fields: Vec<FiniteElement<T>>) -> Self {
        let dim = fields.first().map(FiniteElement::spatial_dimension).unwrap_or(0);
        let mut field_offsets = Vec::with_capacity(fields.len() + 1);
        let mut component_offsets = Vec::with_capacity(fields.len() + 1);
        let (mut off, mut coff) = (0, 0);
        for fe in &fields {
            field_offsets.push(off);
            component_offsets.push(coff);
            off += fe.dimension();
            coff += fe.num_components();
        }
        field_offsets.push(off);
        component_offsets.push(coff);
        Self {
            dim,
            fields,
            field_offsets,
            component_offsets,
        }
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn field(&self, f: usize) -> &FiniteElement<T> {
        &self.fields[f]
    }

    pub fn fields(&self) -> &[FiniteElement<T>] {
        &self.fields
    }

    /// Offset of field `f` in the element closure.
    pub fn field_offset(&self, f: usize) -> usize {
        self.field_offsets[f]
    }

    /// Offset of field `f` in the component-indexed jet buffers.
    pub fn component_offset(&self, f: usize) -> usize {
        self.component_offsets[f]
    }

    /// Size of the element closure, summed over all fields.
    pub fn total_dimension(&self) -> usize {
        self.field_offsets[self.fields.len()]
    }

    pub fn total_components(&self) -> usize {
        self.component_offsets[self.fields.len()]
    }

    pub fn jet_degree(&self, f: usize) -> usize {
        self.fields[f].jet_degree()
    }

    /// Whether any field carries second derivatives.
    pub fn has_hessians(&self) -> bool {
        self.fields.iter().any(|fe| fe.jet_degree() > 1)
    }

    pub fn dimension(&self) -> usize {
        self.dim
    }
}
