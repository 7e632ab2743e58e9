use crate::assembly::ElementBatch;
use crate::fe::{DiscreteSystem, FEGeom};
use crate::mesh::{Facet, Mesh};
use crate::problem::bc::{AuxFunction, DirichletBC, InitialCondition};
use crate::problem::fe_problem::FEProblemInterface;
use crate::problem::nonlinear::NonlinearProblem;
use crate::section::Section;
use crate::weak_form::{JacobianKind, JacobianType, Key};
use eyre::{eyre, WrapErr};
use galerkin_traits::Real;
use log::{debug, info, warn};
use nalgebra::DVector;
use nalgebra_sparse::{CooMatrix, CsrMatrix};

/// Cells or facets an integration key runs over.
enum Support {
    Cells(Vec<usize>),
    Facets(Vec<Facet>),
}

impl Support {
    fn is_empty(&self) -> bool {
        match self {
            Self::Cells(cells) => cells.is_empty(),
            Self::Facets(facets) => facets.is_empty(),
        }
    }
}

fn is_active(mask: &Option<Vec<bool>>, index: usize) -> bool {
    mask.as_ref().map_or(true, |mask| mask[index])
}

/// A stationary finite element problem on a mesh, solved for the unconstrained vertex values.
///
/// Residuals and Jacobians are assembled cell by cell from the blocks registered with the
/// underlying [`FEProblemInterface`]; essential boundary conditions are imposed by eliminating
/// the constrained entries from the unknowns.
#[derive(Debug)]
pub struct FENonlinearProblem<T: Real> {
    mesh: Mesh<T>,
    fep: FEProblemInterface<T>,
    bcs: Vec<DirichletBC<T>>,
    ics: Vec<InitialCondition<T>>,
    aux_functions: Vec<AuxFunction<T>>,
    section: Option<Section>,
    aux_section: Option<Section>,
    /// Per field, the cells it lives on, `None` when it covers the whole mesh.
    cell_masks: Vec<Option<Vec<bool>>>,
    vertex_masks: Vec<Option<Vec<bool>>>,
    local: Vec<T>,
    local_t: Option<Vec<T>>,
    aux_local: Vec<T>,
    time: T,
    u_t_shift: T,
}

impl<T: Real> FENonlinearProblem<T> {
    pub fn new(mesh: Mesh<T>, qorder: usize) -> Self {
        let fep = FEProblemInterface::new(mesh.element(), qorder);
        Self {
            mesh,
            fep,
            bcs: Vec::new(),
            ics: Vec::new(),
            aux_functions: Vec::new(),
            section: None,
            aux_section: None,
            cell_masks: Vec::new(),
            vertex_masks: Vec::new(),
            local: Vec::new(),
            local_t: None,
            aux_local: Vec::new(),
            time: T::zero(),
            u_t_shift: T::zero(),
        }
    }

    pub fn mesh(&self) -> &Mesh<T> {
        &self.mesh
    }

    pub fn fe_problem(&self) -> &FEProblemInterface<T> {
        &self.fep
    }

    /// The weak form is defined through the returned problem interface.
    pub fn fe_problem_mut(&mut self) -> &mut FEProblemInterface<T> {
        &mut self.fep
    }

    pub fn add_boundary_condition(&mut self, bc: DirichletBC<T>) {
        self.bcs.push(bc);
    }

    pub fn add_initial_condition(&mut self, ic: InitialCondition<T>) {
        self.ics.push(ic);
    }

    pub fn set_aux_function(&mut self, aux: AuxFunction<T>) {
        self.aux_functions.push(aux);
    }

    pub fn time(&self) -> T {
        self.time
    }

    /// Sets the time at which forms, boundary values and auxiliary fields are evaluated.
    pub fn set_time(&mut self, time: T) -> eyre::Result<()> {
        self.time = time;
        if self.section.is_some() {
            self.interpolate_aux()?;
        }
        Ok(())
    }

    /// Sets the shift `a` in `dF/dU + a dF/dU_t` passed to Jacobian integrands.
    pub fn set_u_t_shift(&mut self, shift: T) {
        self.u_t_shift = shift;
    }

    /// Sets the time derivative of the unknowns seen by `field_dot` in later assemblies.
    ///
    /// Constrained entries get a zero rate. Without a call every time derivative is zero.
    pub fn set_time_derivative(&mut self, x_t: &DVector<T>) -> eyre::Result<()> {
        let section = self.section_or_err()?;
        if x_t.len() != section.num_dofs() {
            return Err(eyre!(
                "Time derivative has length {}, expected {}.",
                x_t.len(),
                section.num_dofs()
            ));
        }
        let mut local_t = vec![T::zero(); section.local_size()];
        section.global_to_local(x_t.as_slice(), &mut local_t);
        self.local_t = Some(local_t);
        Ok(())
    }

    pub fn section(&self) -> Option<&Section> {
        self.section.as_ref()
    }

    fn ds(&self) -> eyre::Result<&DiscreteSystem<T>> {
        Ok(self.fep.discrete_system()?)
    }

    fn section_or_err(&self) -> eyre::Result<&Section> {
        self.section
            .as_ref()
            .ok_or_else(|| eyre!("The problem has not been set up yet."))
    }

    fn boundary_vertices(&self, name: &str) -> eyre::Result<Vec<usize>> {
        self.mesh
            .boundary_vertices(name)
            .ok_or_else(|| eyre!("Boundary '{}' does not exist in the mesh.", name))
    }

    fn cell_mask(&self, block: Option<&str>) -> eyre::Result<Option<Vec<bool>>> {
        let block = match block {
            Some(block) => block,
            None => return Ok(None),
        };
        let cells = self
            .mesh
            .region(block)
            .ok_or_else(|| eyre!("Field block '{}' does not exist in the mesh.", block))?;
        let mut mask = vec![false; self.mesh.num_cells()];
        for &cell in cells {
            mask[cell] = true;
        }
        Ok(Some(mask))
    }

    /// Vertices touched by the masked cells.
    fn vertex_mask(&self, cell_mask: &[bool]) -> Vec<bool> {
        let mut mask = vec![false; self.mesh.num_vertices()];
        for cell in (0..self.mesh.num_cells()).filter(|&cell| cell_mask[cell]) {
            for &v in self.mesh.cell(cell) {
                mask[v] = true;
            }
        }
        mask
    }

    /// Whether `cell` lies in the blocks of all `fields`.
    fn covers(&self, fields: &[usize], cell: usize) -> bool {
        fields.iter().all(|&f| is_active(&self.cell_masks[f], cell))
    }

    /// Sorts the functionals, numbers the degrees of freedom and interpolates auxiliary fields.
    ///
    /// Must be called after the weak form is complete and all boundary conditions are added.
    pub fn set_up(&mut self) -> eyre::Result<()> {
        self.fep.set_up()?;
        let ds = self.ds()?;
        let components: Vec<usize> = ds
            .fields()
            .iter()
            .map(|fe| fe.num_components())
            .collect();

        let mut cell_masks = Vec::with_capacity(components.len());
        for field in self.fep.fields().iter() {
            cell_masks.push(self.cell_mask(field.block.as_deref())?);
        }
        let vertex_masks: Vec<Option<Vec<bool>>> = cell_masks
            .iter()
            .map(|mask| mask.as_ref().map(|mask| self.vertex_mask(mask)))
            .collect();

        let mut constrained = vec![false; self.mesh.num_vertices() * ds.total_components()];
        let layout = Section::new(self.mesh.num_vertices(), &components);
        // Entries of restricted fields outside their block are held at zero
        for (f, mask) in vertex_masks.iter().enumerate() {
            if let Some(mask) = mask {
                for v in (0..self.mesh.num_vertices()).filter(|&v| !mask[v]) {
                    for c in 0..components[f] {
                        constrained[layout.local_index(f, v, c)] = true;
                    }
                }
            }
        }
        for bc in &self.bcs {
            let f = self.fep.fields().index_of(bc.field())?;
            for &c in bc.components() {
                if c >= components[f] {
                    return Err(eyre!(
                        "Boundary condition on '{}' constrains component {} of a field with {} components.",
                        bc.boundary(),
                        c,
                        components[f]
                    ));
                }
            }
            for v in self.boundary_vertices(bc.boundary())? {
                if !is_active(&vertex_masks[f], v) {
                    continue;
                }
                for &c in bc.components() {
                    constrained[layout.local_index(f, v, c)] = true;
                }
            }
        }
        let section = Section::with_constraints(self.mesh.num_vertices(), &components, |f, v, c| {
            constrained[layout.local_index(f, v, c)]
        });
        info!(
            "Set up problem with {} unknowns ({} constrained)",
            section.num_dofs(),
            section.local_size() - section.num_dofs()
        );
        self.local = vec![T::zero(); section.local_size()];
        self.local_t = None;
        self.section = Some(section);
        self.cell_masks = cell_masks;
        self.vertex_masks = vertex_masks;

        self.aux_section = self.fep.aux_discrete_system().map(|aux_ds| {
            let aux_components: Vec<usize> = aux_ds
                .fields()
                .iter()
                .map(|fe| fe.num_components())
                .collect();
            Section::new(self.mesh.num_vertices(), &aux_components)
        });
        self.interpolate_aux()
    }

    fn interpolate_aux(&mut self) -> eyre::Result<()> {
        let aux_section = match &self.aux_section {
            Some(aux_section) => aux_section,
            None => return Ok(()),
        };
        self.aux_local = vec![T::zero(); aux_section.local_size()];
        for info in self.fep.aux_fields().iter() {
            if !self.aux_functions.iter().any(|aux| aux.field() == info.id) {
                warn!("Auxiliary field '{}' has no values assigned, using zero.", info.name);
            }
        }
        for aux in &self.aux_functions {
            let f = self.fep.aux_fields().index_of(aux.field())?;
            let nc = aux_section.num_components(f);
            let mut values = vec![T::zero(); nc];
            for v in 0..self.mesh.num_vertices() {
                aux.evaluate(self.time, self.mesh.vertex(v), &mut values);
                for (c, value) in values.iter().enumerate() {
                    self.aux_local[aux_section.local_index(f, v, c)] = *value;
                }
            }
        }
        Ok(())
    }

    /// Fills the local vector from the unknowns and the boundary values at the current time.
    fn update_local(&mut self, x: &DVector<T>) -> eyre::Result<()> {
        let section = self
            .section
            .as_ref()
            .ok_or_else(|| eyre!("The problem has not been set up yet."))?;
        section.global_to_local(x.as_slice(), &mut self.local);
        for bc in &self.bcs {
            let f = self.fep.fields().index_of(bc.field())?;
            let mut values = vec![T::zero(); bc.components().len()];
            for v in self
                .mesh
                .boundary_vertices(bc.boundary())
                .ok_or_else(|| eyre!("Boundary '{}' does not exist in the mesh.", bc.boundary()))?
            {
                if !is_active(&self.vertex_masks[f], v) {
                    continue;
                }
                bc.evaluate(self.time, self.mesh.vertex(v), &mut values);
                for (&c, value) in bc.components().iter().zip(&values) {
                    self.local[section.local_index(f, v, c)] = *value;
                }
            }
        }
        Ok(())
    }

    /// Values of all fields at all vertices (the local vector) for the unknowns `x`.
    pub fn vertex_values(&mut self, x: &DVector<T>) -> eyre::Result<Vec<T>> {
        self.update_local(x)?;
        Ok(self.local.clone())
    }

    /// Cells or facets of `key`'s region that lie in the blocks of all `fields`.
    fn support(&self, key: &Key, fields: &[usize], boundary: bool) -> eyre::Result<Support> {
        let region = key.region();
        if boundary {
            if region.is_empty() {
                return Err(eyre!("Boundary integrands must be registered on a named boundary."));
            }
            let facets = self
                .mesh
                .boundary(region)
                .ok_or_else(|| eyre!("Boundary '{}' does not exist in the mesh.", region))?;
            Ok(Support::Facets(
                facets
                    .iter()
                    .filter(|facet| self.covers(fields, facet.cell))
                    .copied()
                    .collect(),
            ))
        } else {
            let cells: Vec<usize> = if region.is_empty() {
                (0..self.mesh.num_cells()).collect()
            } else {
                self.mesh
                    .region(region)
                    .ok_or_else(|| eyre!("Region '{}' does not exist in the mesh.", region))?
                    .to_vec()
            };
            Ok(Support::Cells(
                cells
                    .into_iter()
                    .filter(|&cell| self.covers(fields, cell))
                    .collect(),
            ))
        }
    }

    fn geometry(&self, support: &Support) -> eyre::Result<(FEGeom<T>, Vec<usize>)> {
        let ds = self.ds()?;
        let fe = ds.field(0);
        let element = self.mesh.element();
        match support {
            Support::Cells(cells) => {
                let coords = self.mesh.cell_coordinates(cells.iter().copied());
                Ok((FEGeom::for_cells(element, &coords, fe.quadrature())?, cells.clone()))
            }
            Support::Facets(facets) => {
                let cells: Vec<usize> = facets.iter().map(|facet| facet.cell).collect();
                let faces: Vec<usize> = facets.iter().map(|facet| facet.face).collect();
                let coords = self.mesh.cell_coordinates(cells.iter().copied());
                let geom = FEGeom::for_faces(element, &coords, &faces, fe.face_quadrature())?;
                Ok((geom, cells))
            }
        }
    }

    /// Local indices of the closures of `cells`, back to back.
    fn closures(&self, section: &Section, cells: &[usize]) -> Vec<usize> {
        let mut indices = Vec::new();
        for &cell in cells {
            section.closure(self.mesh.cell(cell), &mut indices);
        }
        indices
    }

    fn gather(values: &[T], indices: &[usize]) -> Vec<T> {
        indices.iter().map(|&i| values[i]).collect()
    }

    fn aux_coefficients(&self, cells: &[usize]) -> Option<Vec<T>> {
        self.aux_section.as_ref().map(|aux_section| {
            let indices = self.closures(aux_section, cells);
            Self::gather(&self.aux_local, &indices)
        })
    }

    fn assemble_residual(&mut self, boundary: bool, f: &mut DVector<T>) -> eyre::Result<()> {
        let keys = if boundary {
            self.fep.weak_form().get_bnd_residual_keys()
        } else {
            self.fep.weak_form().get_residual_keys()
        };
        let tot_dim = self.ds()?.total_dimension();
        let section = self.section_or_err()?.clone();

        for key in keys {
            let support = self.support(&key, &[key.field], boundary)?;
            if support.is_empty() {
                continue;
            }
            let (geom, cells) = self.geometry(&support)?;
            let indices = self.closures(&section, &cells);
            let coefficients = Self::gather(&self.local, &indices);
            let coefficients_t = self.local_t.as_ref().map(|local_t| Self::gather(local_t, &indices));
            let aux = self.aux_coefficients(&cells);
            let mut batch = ElementBatch::new(&geom, &coefficients);
            if let Some(coefficients_t) = &coefficients_t {
                batch = batch.with_time_derivatives(coefficients_t);
            }
            if let Some(aux) = &aux {
                batch = batch.with_aux(aux);
            }

            let mut elem_vec = vec![T::zero(); cells.len() * tot_dim];
            let result = if boundary {
                self.fep
                    .integrate_bnd_residual(&key, &batch, self.time, &mut elem_vec)
            } else {
                self.fep
                    .integrate_residual(&key, &batch, self.time, &mut elem_vec)
            };
            result.wrap_err_with(|| format!("Failed to integrate residual for key {}", key))?;

            for (local, value) in indices.iter().zip(&elem_vec) {
                if let Some(g) = section.global_of_local(*local) {
                    f[g] += *value;
                }
            }
            debug!("Assembled residual for key {} over {} cells", key, cells.len());
        }
        Ok(())
    }

    fn assemble_matrix(&mut self, jtype: JacobianType, boundary: bool, coo: &mut CooMatrix<T>) -> eyre::Result<()> {
        let keys = if boundary {
            self.fep.weak_form().get_bnd_jacobian_keys()
        } else {
            self.fep.weak_form().get_jacobian_keys()
        };
        let kinds = if boundary {
            JacobianKind::boundary_blocks()
        } else {
            JacobianKind::blocks(jtype)
        };
        let tot_dim = self.ds()?.total_dimension();
        let section = self.section_or_err()?.clone();

        for key in keys {
            // Keys with blocks of other types only would scatter explicit zeros
            if !self.fep.weak_form().has_jacobian_blocks(&kinds, &key) {
                continue;
            }
            let (f, g) = self.fep.weak_form().split_jacobian_field(key.field);
            let support = self.support(&key, &[f, g], boundary)?;
            if support.is_empty() {
                continue;
            }
            let (geom, cells) = self.geometry(&support)?;
            let indices = self.closures(&section, &cells);
            let coefficients = Self::gather(&self.local, &indices);
            let coefficients_t = self.local_t.as_ref().map(|local_t| Self::gather(local_t, &indices));
            let aux = self.aux_coefficients(&cells);
            let mut batch = ElementBatch::new(&geom, &coefficients);
            if let Some(coefficients_t) = &coefficients_t {
                batch = batch.with_time_derivatives(coefficients_t);
            }
            if let Some(aux) = &aux {
                batch = batch.with_aux(aux);
            }

            let mut elem_mat = vec![T::zero(); cells.len() * tot_dim * tot_dim];
            let result = if boundary {
                self.fep
                    .integrate_bnd_jacobian(&key, &batch, self.time, self.u_t_shift, &mut elem_mat)
            } else {
                self.fep
                    .integrate_jacobian(jtype, &key, &batch, self.time, self.u_t_shift, &mut elem_mat)
            };
            result.wrap_err_with(|| format!("Failed to integrate Jacobian for key {}", key))?;

            for (e, closure) in indices.chunks_exact(tot_dim).enumerate() {
                let block = &elem_mat[e * tot_dim * tot_dim..(e + 1) * tot_dim * tot_dim];
                for (i, row) in closure.iter().enumerate() {
                    let gi = match section.global_of_local(*row) {
                        Some(gi) => gi,
                        None => continue,
                    };
                    for (j, col) in closure.iter().enumerate() {
                        if let Some(gj) = section.global_of_local(*col) {
                            coo.push(gi, gj, block[i * tot_dim + j]);
                        }
                    }
                }
            }
            debug!("Assembled {:?} for key {} over {} cells", jtype, key, cells.len());
        }
        Ok(())
    }

    /// Assembles the operator of type `jtype` at the unknowns `x`.
    ///
    /// Boundary Jacobian blocks contribute to [`JacobianType::Jacobian`] only.
    pub fn assemble_jacobian(&mut self, jtype: JacobianType, x: &DVector<T>) -> eyre::Result<CsrMatrix<T>> {
        self.update_local(x)?;
        let n = self.section_or_err()?.num_dofs();
        let mut coo = CooMatrix::new(n, n);
        self.assemble_matrix(jtype, false, &mut coo)?;
        if jtype == JacobianType::Jacobian {
            self.assemble_matrix(jtype, true, &mut coo)?;
        }
        Ok(CsrMatrix::from(&coo))
    }
}

impl<T: Real> NonlinearProblem<T> for FENonlinearProblem<T> {
    fn dimension(&self) -> usize {
        self.section
            .as_ref()
            .map(Section::num_dofs)
            .unwrap_or(0)
    }

    fn initial_guess(&mut self, x: &mut DVector<T>) -> eyre::Result<()> {
        let section = self.section_or_err()?;
        x.fill(T::zero());
        for ic in &self.ics {
            let f = self.fep.fields().index_of(ic.field())?;
            let mut values = vec![T::zero(); section.num_components(f)];
            for v in 0..self.mesh.num_vertices() {
                ic.evaluate(self.mesh.vertex(v), &mut values);
                for (c, value) in values.iter().enumerate() {
                    if let Some(g) = section.global_index(f, v, c) {
                        x[g] = *value;
                    }
                }
            }
        }
        Ok(())
    }

    fn compute_residual(&mut self, x: &DVector<T>, f: &mut DVector<T>) -> eyre::Result<()> {
        self.update_local(x)?;
        f.fill(T::zero());
        self.assemble_residual(false, f)?;
        self.assemble_residual(true, f)
    }

    fn compute_jacobian(&mut self, x: &DVector<T>) -> eyre::Result<CsrMatrix<T>> {
        self.assemble_jacobian(JacobianType::Jacobian, x)
    }
}
