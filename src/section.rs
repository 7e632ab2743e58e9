//! Numbering of vertex degrees of freedom.
use itertools::iproduct;

/// Maps the degrees of freedom of a set of vertex-based fields to indices.
///
/// Every vertex carries `components[f]` values of each field `f`. A *local* vector holds all of
/// them, vertex by vertex with fields and components interleaved. The *global* vector holds only
/// the unconstrained entries, numbered in local order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    num_vertices: usize,
    components: Vec<usize>,
    component_offsets: Vec<usize>,
    total_components: usize,
    global: Vec<Option<usize>>,
    num_dofs: usize,
}

impl Section {
    /// A section without constraints.
    pub fn new(num_vertices: usize, components: &[usize]) -> Self {
        Self::with_constraints(num_vertices, components, |_, _, _| false)
    }

    /// A section where the entries for which `is_constrained(field, vertex, component)` holds are
    /// excluded from the global numbering.
    pub fn with_constraints(
        num_vertices: usize,
        components: &[usize],
        is_constrained: impl Fn(usize, usize, usize) -> bool,
    ) -> Self {
        let component_offsets: Vec<usize> = components
            .iter()
            .scan(0, |offset, &nc| {
                let current = *offset;
                *offset += nc;
                Some(current)
            })
            .collect();
        let total_components = components.iter().sum();

        let mut global = Vec::with_capacity(num_vertices * total_components);
        let mut num_dofs = 0;
        for v in 0..num_vertices {
            for (f, &nc) in components.iter().enumerate() {
                for c in 0..nc {
                    if is_constrained(f, v, c) {
                        global.push(None);
                    } else {
                        global.push(Some(num_dofs));
                        num_dofs += 1;
                    }
                }
            }
        }

        Self {
            num_vertices,
            components: components.to_vec(),
            component_offsets,
            total_components,
            global,
            num_dofs,
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.num_vertices
    }

    pub fn num_fields(&self) -> usize {
        self.components.len()
    }

    pub fn num_components(&self, field: usize) -> usize {
        self.components[field]
    }

    /// Number of unconstrained degrees of freedom.
    pub fn num_dofs(&self) -> usize {
        self.num_dofs
    }

    /// Size of the local vector.
    pub fn local_size(&self) -> usize {
        self.num_vertices * self.total_components
    }

    pub fn local_index(&self, field: usize, vertex: usize, component: usize) -> usize {
        debug_assert!(component < self.components[field]);
        vertex * self.total_components + self.component_offsets[field] + component
    }

    /// Global index of an entry, `None` if it is constrained.
    pub fn global_index(&self, field: usize, vertex: usize, component: usize) -> Option<usize> {
        self.global[self.local_index(field, vertex, component)]
    }

    pub fn global_of_local(&self, local: usize) -> Option<usize> {
        self.global[local]
    }

    pub fn is_constrained(&self, field: usize, vertex: usize, component: usize) -> bool {
        self.global_index(field, vertex, component).is_none()
    }

    /// Appends the local indices of the closure of a cell with the given vertices.
    ///
    /// The closure is ordered field by field, then by cell vertex, then by component, which is
    /// the layout of element coefficients in a discretization system.
    pub fn closure(&self, cell_vertices: &[usize], indices: &mut Vec<usize>) {
        for (f, &nc) in self.components.iter().enumerate() {
            indices.extend(iproduct!(cell_vertices.iter(), 0..nc).map(|(&v, c)| self.local_index(f, v, c)));
        }
    }

    /// Copies the global vector into the unconstrained entries of a local vector.
    pub fn global_to_local<T: Copy>(&self, global: &[T], local: &mut [T]) {
        for (l, g) in self.global.iter().enumerate() {
            if let Some(g) = g {
                local[l] = global[*g];
            }
        }
    }
}
