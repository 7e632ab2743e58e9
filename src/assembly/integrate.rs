use crate::arena::MemoryArena;
use crate::assembly::{
    evaluate_field_jets, evaluate_field_values, fill_point_basis, update_element_mat, update_element_vec,
    AssemblyData, AssemblyError, ElementBatch, JacobianBlocks,
};
use crate::dependency::{DependencyEvaluator, FunctionalId};
use crate::fe::{DiscreteSystem, FiniteElement, PointGeom, Quadrature, Tabulation};
use crate::functional::{Integrand, JacobianIntegrand, ResidualIntegrand};
use crate::weak_form::{JacobianKind, JacobianType, Key, ResidualKind, WeakForm};
use galerkin_traits::Real;
use log::debug;

/// Borrowed state needed to integrate one key over a batch of elements.
///
/// The engine is strictly sequential: one element, one quadrature point and one field at a time
/// write into `asmbl`, which functionals then read.
pub struct Integrator<'a, T> {
    pub ds: &'a DiscreteSystem<T>,
    pub aux_ds: Option<&'a DiscreteSystem<T>>,
    pub weak_form: &'a WeakForm<T>,
    pub evaluator: &'a mut DependencyEvaluator<T>,
    pub asmbl: &'a mut AssemblyData<T>,
    pub arena: &'a mut MemoryArena<T>,
}

/// Which tabulations a pass reads.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Domain {
    Volume,
    Boundary,
}

fn check_scalar<T: Real>(quadrature: &Quadrature<T>) -> Result<(), AssemblyError> {
    if quadrature.num_components() != 1 {
        Err(AssemblyError::NonScalarQuadrature(quadrature.num_components()))
    } else {
        Ok(())
    }
}

fn tabulations<T: Real>(ds: &DiscreteSystem<T>, domain: Domain) -> Vec<&Tabulation<T>> {
    ds.fields()
        .iter()
        .map(|fe| match domain {
            Domain::Volume => fe.tabulation(),
            Domain::Boundary => fe.face_tabulation(),
        })
        .collect()
}

fn tabulation_of<T: Real>(fe: &FiniteElement<T>, domain: Domain) -> &Tabulation<T> {
    match domain {
        Domain::Volume => fe.tabulation(),
        Domain::Boundary => fe.face_tabulation(),
    }
}

fn quadrature_of<T: Real>(fe: &FiniteElement<T>, domain: Domain) -> &Quadrature<T> {
    match domain {
        Domain::Volume => fe.quadrature(),
        Domain::Boundary => fe.face_quadrature(),
    }
}

/// The pointwise block `g`, or an empty slice if it has no integrands.
fn active<'s, T>(forms: &[JacobianIntegrand<T>], g: &'s [T]) -> &'s [T] {
    if forms.is_empty() {
        &[]
    } else {
        g
    }
}

/// Accumulates `w * integrand(asmbl)` over all integrands into `out`.
fn accumulate<T: Real, F: ?Sized>(
    integrands: &[Integrand<F>],
    mut evaluate: impl FnMut(&F, &mut [T]),
    w: T,
    scratch: &mut [T],
    out: &mut [T],
) {
    for integrand in integrands {
        scratch.fill(T::zero());
        evaluate(integrand.func(), scratch);
        for (o, s) in out.iter_mut().zip(scratch.iter()) {
            *o += *s * w;
        }
    }
}

impl<'a, T: Real> Integrator<'a, T> {
    /// Sizes the arena so that any single integration call fits.
    fn reserve_scratch(&mut self) {
        let de = self.ds.dimension();
        let max_nc = self.ds.fields().iter().map(FiniteElement::num_components).max().unwrap_or(0);
        let max_nb = self.ds.fields().iter().map(FiniteElement::dimension).max().unwrap_or(0);
        let max_np = self
            .ds
            .fields()
            .iter()
            .map(|fe| fe.quadrature().num_points().max(fe.face_quadrature().num_points()))
            .max()
            .unwrap_or(0);
        let block = max_nc * max_nc * (1 + de) * (1 + de);
        let residual = max_np * max_nc * (1 + de) + max_nc * de;
        let basis = max_nb * max_nc * de;
        self.arena.reserve(residual.max(2 * block) + 2 * basis);
    }

    /// Runs the sorted value functionals and evaluates the jets at point `q` of region `r`.
    #[allow(clippy::too_many_arguments)]
    fn prepare_point(
        &mut self,
        domain: Domain,
        tabs: &[&Tabulation<T>],
        aux_tabs: &[&Tabulation<T>],
        aux_on_bnd: bool,
        r: usize,
        q: usize,
        point: &PointGeom<T>,
        batch: &ElementBatch<T>,
        e: usize,
        sorted: &[FunctionalId],
    ) {
        let tot_dim = self.ds.total_dimension();
        let de = self.ds.dimension();
        let coefficients = &batch.coefficients[e * tot_dim..(e + 1) * tot_dim];
        let coefficients_t = batch
            .coefficients_t
            .map(|c| &c[e * tot_dim..(e + 1) * tot_dim]);

        self.asmbl.set_point(point.v);
        if domain == Domain::Boundary {
            if let Some(normal) = point.normal {
                self.asmbl.set_normal(normal);
            }
        }
        evaluate_field_jets(
            self.ds,
            tabs,
            r,
            q,
            point.inv_jacobian,
            de,
            coefficients,
            coefficients_t,
            &mut self.asmbl.u,
            &mut self.asmbl.u_x,
            Some(self.asmbl.u_t.as_mut_slice()),
        );

        if let (Some(aux_ds), Some(aux)) = (self.aux_ds, batch.aux_coefficients) {
            let aux_dim = aux_ds.total_dimension();
            let aux_coefficients = &aux[e * aux_dim..(e + 1) * aux_dim];
            if aux_on_bnd {
                evaluate_field_values(
                    aux_ds,
                    aux_tabs,
                    0,
                    q,
                    de,
                    aux_coefficients,
                    &mut self.asmbl.a,
                    &mut self.asmbl.a_x,
                );
            } else {
                evaluate_field_jets(
                    aux_ds,
                    aux_tabs,
                    r,
                    q,
                    point.inv_jacobian,
                    de,
                    aux_coefficients,
                    None,
                    &mut self.asmbl.a,
                    &mut self.asmbl.a_x,
                    None,
                );
            }
        }

        for id in sorted {
            self.evaluator.evaluate(*id, self.asmbl);
        }
    }

    /// Auxiliary tabulations for `domain` and whether the auxiliary fields live on the boundary.
    fn aux_tabulations(&self, domain: Domain, num_points: usize) -> Result<(Vec<&'a Tabulation<T>>, bool), AssemblyError> {
        let aux_ds = match self.aux_ds {
            Some(aux_ds) => aux_ds,
            None => return Ok((Vec::new(), false)),
        };
        let aux_on_bnd = domain == Domain::Boundary && aux_ds.dimension() < self.ds.dimension();
        let tabs = if aux_on_bnd {
            tabulations(aux_ds, Domain::Volume)
        } else {
            tabulations(aux_ds, domain)
        };
        if let Some(tab) = tabs.first() {
            if tab.num_points() != num_points {
                return Err(AssemblyError::TabulationMismatch {
                    primary: num_points,
                    auxiliary: tab.num_points(),
                });
            }
        }
        Ok((tabs, aux_on_bnd))
    }

    fn residual_pass(
        &mut self,
        domain: Domain,
        kinds: [ResidualKind; 2],
        key: &Key,
        sorted: &[FunctionalId],
        batch: &ElementBatch<T>,
        t: T,
        elem_vec: &mut [T],
    ) -> Result<(), AssemblyError> {
        let weak_form = self.weak_form;
        let f0_forms: &[ResidualIntegrand<T>] = weak_form.get_residual(kinds[0], key);
        let f1_forms: &[ResidualIntegrand<T>] = weak_form.get_residual(kinds[1], key);
        if f0_forms.is_empty() && f1_forms.is_empty() {
            return Ok(());
        }

        let ds = self.ds;
        let field = key.field;
        if field >= ds.num_fields() {
            return Err(AssemblyError::UnknownFieldId(field));
        }
        let fe = ds.field(field);
        let quadrature = quadrature_of(fe, domain);
        check_scalar(quadrature)?;
        let tab = tabulation_of(fe, domain);
        let tabs = tabulations(ds, domain);
        let nq = tab.num_points();
        let (aux_tabs, aux_on_bnd) = self.aux_tabulations(domain, nq)?;

        let nc = fe.num_components();
        let nb = tab.num_basis();
        let de = ds.dimension();
        let tot_dim = ds.total_dimension();
        let field_offset = ds.field_offset(field);
        self.asmbl.time = t;

        debug!(
            "Integrating {:?} residual for key {} over {} elements",
            domain,
            key,
            batch.num_elements()
        );

        self.reserve_scratch();
        let marker = self.arena.mark();
        let f0_slice = self.arena.allocate(nq * nc);
        let f1_slice = self.arena.allocate(nq * nc * de);
        let scratch_slice = self.arena.allocate(nc * de.max(1));
        let basis_slice = self.arena.allocate(nb * nc * de);

        for e in 0..batch.num_elements() {
            let r = if domain == Domain::Boundary { batch.geom.face(e) } else { 0 };
            {
                let [f0, f1] = self.arena.slices_mut([&f0_slice, &f1_slice]);
                f0.fill(T::zero());
                f1.fill(T::zero());
            }

            for q in 0..nq {
                let point = batch.geom.point(e, q);
                let w = point.det_jacobian * quadrature.weights()[q];
                self.prepare_point(domain, &tabs, &aux_tabs, aux_on_bnd, r, q, &point, batch, e, sorted);

                let asmbl: &AssemblyData<T> = self.asmbl;
                let values = self.evaluator.values();
                let [f0, f1, scratch] = self.arena.slices_mut([&f0_slice, &f1_slice, &scratch_slice]);
                accumulate(
                    f0_forms,
                    |func, out| func.evaluate(asmbl, values, out),
                    w,
                    &mut scratch[..nc],
                    &mut f0[q * nc..(q + 1) * nc],
                );
                accumulate(
                    f1_forms,
                    |func, out| func.evaluate(asmbl, values, out),
                    w,
                    &mut scratch[..nc * de],
                    &mut f1[q * nc * de..(q + 1) * nc * de],
                );
            }

            let out = &mut elem_vec[e * tot_dim + field_offset..];
            for q in 0..nq {
                let point = batch.geom.point(e, q);
                let [f0, f1, basis_der] = self.arena.slices_mut([&f0_slice, &f1_slice, &basis_slice]);
                let basis = fill_point_basis(tab, r, q, point.inv_jacobian, de, basis_der);
                let f0_q: &[T] = if f0_forms.is_empty() { &[] } else { &f0[q * nc..(q + 1) * nc] };
                let f1_q: &[T] = if f1_forms.is_empty() {
                    &[]
                } else {
                    &f1[q * nc * de..(q + 1) * nc * de]
                };
                update_element_vec(&basis, de, f0_q, f1_q, out);
            }
        }

        self.arena.rewind(marker);
        Ok(())
    }

    /// Integrates the residual of `key.field` over a batch of cells.
    ///
    /// The element vectors (`tot_dim` entries per element) in `elem_vec` are added to at the
    /// offset of the field. Nothing is done if no `F0`/`F1` integrands are registered for `key`.
    pub fn integrate_residual(
        &mut self,
        key: &Key,
        sorted: &[FunctionalId],
        batch: &ElementBatch<T>,
        t: T,
        elem_vec: &mut [T],
    ) -> Result<(), AssemblyError> {
        self.residual_pass(
            Domain::Volume,
            [ResidualKind::F0, ResidualKind::F1],
            key,
            sorted,
            batch,
            t,
            elem_vec,
        )
    }

    /// Integrates the boundary residual of `key.field` over a batch of faces.
    ///
    /// The batch geometry must be face geometry; the local face index of each element selects the
    /// tabulation region.
    pub fn integrate_bnd_residual(
        &mut self,
        key: &Key,
        sorted: &[FunctionalId],
        batch: &ElementBatch<T>,
        t: T,
        elem_vec: &mut [T],
    ) -> Result<(), AssemblyError> {
        self.residual_pass(
            Domain::Boundary,
            [ResidualKind::BndF0, ResidualKind::BndF1],
            key,
            sorted,
            batch,
            t,
            elem_vec,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn jacobian_pass(
        &mut self,
        domain: Domain,
        kinds: [JacobianKind; 4],
        key: &Key,
        sorted: &[FunctionalId],
        batch: &ElementBatch<T>,
        t: T,
        u_t_shift: T,
        elem_mat: &mut [T],
    ) -> Result<(), AssemblyError> {
        let weak_form = self.weak_form;
        let forms: [&[JacobianIntegrand<T>]; 4] = kinds.map(|kind| weak_form.get_jacobian(kind, key));
        if forms.iter().all(|f| f.is_empty()) {
            return Ok(());
        }

        let ds = self.ds;
        let (field_i, field_j) = weak_form.split_jacobian_field(key.field);
        if field_i >= ds.num_fields() {
            return Err(AssemblyError::UnknownFieldId(field_i));
        }
        if field_j >= ds.num_fields() {
            return Err(AssemblyError::UnknownFieldId(field_j));
        }
        let fe_i = ds.field(field_i);
        let fe_j = ds.field(field_j);
        let quadrature = quadrature_of(fe_i, domain);
        check_scalar(quadrature)?;
        let tab_i = tabulation_of(fe_i, domain);
        let tab_j = tabulation_of(fe_j, domain);
        let tabs = tabulations(ds, domain);
        let nq = tab_i.num_points();
        let (aux_tabs, aux_on_bnd) = self.aux_tabulations(domain, nq)?;

        let de = ds.dimension();
        let (nc_i, nc_j) = (fe_i.num_components(), fe_j.num_components());
        let tot_dim = ds.total_dimension();
        let offsets = (ds.field_offset(field_i), ds.field_offset(field_j));
        let sizes = [nc_i * nc_j, nc_i * nc_j * de, nc_i * nc_j * de, nc_i * nc_j * de * de];
        self.asmbl.time = t;
        self.asmbl.u_t_shift = u_t_shift;

        debug!(
            "Integrating {:?} Jacobian {:?} for key {} over {} elements",
            domain,
            kinds[0],
            key,
            batch.num_elements()
        );

        self.reserve_scratch();
        let marker = self.arena.mark();
        let g_slices = sizes.map(|n| self.arena.allocate(n));
        let scratch_slice = self.arena.allocate(sizes[3]);
        let basis_i_slice = self.arena.allocate(tab_i.num_basis() * nc_i * de);
        let basis_j_slice = self.arena.allocate(tab_j.num_basis() * nc_j * de);

        for e in 0..batch.num_elements() {
            let r = if domain == Domain::Boundary { batch.geom.face(e) } else { 0 };
            let e_offset = e * tot_dim * tot_dim;

            for q in 0..nq {
                let point = batch.geom.point(e, q);
                let w = point.det_jacobian * quadrature.weights()[q];
                self.prepare_point(domain, &tabs, &aux_tabs, aux_on_bnd, r, q, &point, batch, e, sorted);

                let asmbl: &AssemblyData<T> = self.asmbl;
                let values = self.evaluator.values();
                let [g0, g1, g2, g3, scratch, basis_der_i, basis_der_j] = self.arena.slices_mut([
                    &g_slices[0],
                    &g_slices[1],
                    &g_slices[2],
                    &g_slices[3],
                    &scratch_slice,
                    &basis_i_slice,
                    &basis_j_slice,
                ]);
                for (k, g) in [&mut *g0, &mut *g1, &mut *g2, &mut *g3].into_iter().enumerate() {
                    g.fill(T::zero());
                    accumulate(
                        forms[k],
                        |func, out| func.evaluate(asmbl, values, out),
                        w,
                        &mut scratch[..sizes[k]],
                        g,
                    );
                }

                let basis_i = fill_point_basis(tab_i, r, q, point.inv_jacobian, de, basis_der_i);
                let basis_j = fill_point_basis(tab_j, r, q, point.inv_jacobian, de, basis_der_j);
                let blocks = JacobianBlocks {
                    g0: active(forms[0], g0),
                    g1: active(forms[1], g1),
                    g2: active(forms[2], g2),
                    g3: active(forms[3], g3),
                };
                update_element_mat(&basis_i, &basis_j, de, &blocks, tot_dim, offsets, &mut elem_mat[e_offset..]);
            }
        }

        self.arena.rewind(marker);
        Ok(())
    }

    /// Integrates the Jacobian block of the field pair encoded in `key.field` over a batch of
    /// cells.
    ///
    /// `jtype` selects the `G`, `GP` or `GT` integrands. Element matrices are `tot_dim x tot_dim`,
    /// stored row-major and back to back in `elem_mat`.
    #[allow(clippy::too_many_arguments)]
    pub fn integrate_jacobian(
        &mut self,
        jtype: JacobianType,
        key: &Key,
        sorted: &[FunctionalId],
        batch: &ElementBatch<T>,
        t: T,
        u_t_shift: T,
        elem_mat: &mut [T],
    ) -> Result<(), AssemblyError> {
        self.jacobian_pass(
            Domain::Volume,
            JacobianKind::blocks(jtype),
            key,
            sorted,
            batch,
            t,
            u_t_shift,
            elem_mat,
        )
    }

    /// Integrates the boundary Jacobian block of the field pair encoded in `key.field` over a
    /// batch of faces.
    #[allow(clippy::too_many_arguments)]
    pub fn integrate_bnd_jacobian(
        &mut self,
        key: &Key,
        sorted: &[FunctionalId],
        batch: &ElementBatch<T>,
        t: T,
        u_t_shift: T,
        elem_mat: &mut [T],
    ) -> Result<(), AssemblyError> {
        self.jacobian_pass(
            Domain::Boundary,
            JacobianKind::boundary_blocks(),
            key,
            sorted,
            batch,
            t,
            u_t_shift,
            elem_mat,
        )
    }
}
