use crate::arena::MemoryArena;
use crate::assembly::{AssemblyData, AssemblyError, AssemblyViews, ElementBatch, Integrator};
use crate::dependency::{DependencyError, DependencyEvaluator, DependencyGraph, FunctionalId, ValueHandle};
use crate::fe::{DiscreteSystem, ElementType, FiniteElement};
use crate::functional::{
    FunctionalContext, Integrand, JacobianFunc, JacobianIntegrand, ResidualFunc, ResidualIntegrand, ValueFunctional,
};
use crate::problem::fields::Fields;
use crate::weak_form::{JacobianKind, JacobianType, Key, ResidualKind, WeakForm};
use eyre::eyre;
use galerkin_traits::Real;
use log::{debug, info};
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

/// Scratch entries reserved up front so that typical problems never grow the arena.
const DEFAULT_ARENA_CAPACITY: usize = 1024;

#[derive(Debug, Copy, Clone)]
enum Cache {
    Residual,
    BndResidual,
    Jacobian,
    BndJacobian,
}

/// A finite element problem described by a weak form.
///
/// Usage follows three stages:
///
/// 1. Register fields and auxiliary fields, then call [`create`](Self::create) to build the
///    discretizations and bind the field views.
/// 2. Create value functionals and integrands, and register the integrands as residual and
///    Jacobian blocks.
/// 3. Call [`set_up`](Self::set_up) to sort the functionals of every block, after which the
///    `integrate_*` routines may be called.
#[derive(Debug)]
pub struct FEProblemInterface<T> {
    element: ElementType,
    qorder: usize,
    fields: Fields,
    aux_fields: Fields,
    jet_degrees: FxHashMap<usize, usize>,
    ds: Option<DiscreteSystem<T>>,
    aux_ds: Option<DiscreteSystem<T>>,
    views: AssemblyViews<T>,
    weak_form: WeakForm<T>,
    evaluator: DependencyEvaluator<T>,
    asmbl: AssemblyData<T>,
    arena: MemoryArena<T>,
    sorted_res: BTreeMap<Key, Vec<FunctionalId>>,
    sorted_bnd_res: BTreeMap<Key, Vec<FunctionalId>>,
    sorted_jac: BTreeMap<Key, Vec<FunctionalId>>,
    sorted_bnd_jac: BTreeMap<Key, Vec<FunctionalId>>,
}

impl<T: Real> FEProblemInterface<T> {
    /// A problem on cells of type `element`, integrated with quadrature of order `qorder`.
    pub fn new(element: ElementType, qorder: usize) -> Self {
        let dim = element.dim();
        Self {
            element,
            qorder,
            fields: Fields::new(),
            aux_fields: Fields::new(),
            jet_degrees: FxHashMap::default(),
            ds: None,
            aux_ds: None,
            views: AssemblyViews::new(dim),
            weak_form: WeakForm::new(),
            evaluator: DependencyEvaluator::new(),
            asmbl: AssemblyData::new(dim),
            arena: MemoryArena::new(DEFAULT_ARENA_CAPACITY),
            sorted_res: BTreeMap::new(),
            sorted_bnd_res: BTreeMap::new(),
            sorted_jac: BTreeMap::new(),
            sorted_bnd_jac: BTreeMap::new(),
        }
    }

    pub fn element(&self) -> ElementType {
        self.element
    }

    pub fn dimension(&self) -> usize {
        self.element.dim()
    }

    pub fn is_created(&self) -> bool {
        self.ds.is_some()
    }

    fn assert_not_created(&self, what: &str) -> eyre::Result<()> {
        if self.is_created() {
            Err(eyre!("Cannot {} after the problem has been created.", what))
        } else {
            Ok(())
        }
    }

    pub fn quadrature_order(&self) -> usize {
        self.qorder
    }

    pub fn set_quadrature_order(&mut self, qorder: usize) -> eyre::Result<()> {
        self.assert_not_created("change the quadrature order")?;
        self.qorder = qorder;
        Ok(())
    }

    /// Requests Hessians (`degree = 2`) of field `id` in addition to values and gradients.
    pub fn set_jet_degree(&mut self, id: usize, degree: usize) -> eyre::Result<()> {
        self.assert_not_created("change the jet degree")?;
        self.fields.get(id)?;
        if !(1..=2).contains(&degree) {
            return Err(eyre!("Jet degree must be 1 or 2, got {}.", degree));
        }
        self.jet_degrees.insert(id, degree);
        Ok(())
    }

    // Field bookkeeping

    pub fn add_field(&mut self, id: usize, name: &str, num_components: usize, order: usize) -> eyre::Result<()> {
        self.assert_not_created("add a field")?;
        self.fields.add(id, name, num_components, order)
    }

    pub fn set_field(&mut self, id: usize, name: &str, num_components: usize, order: usize) -> eyre::Result<()> {
        self.assert_not_created("set a field")?;
        self.fields.set(id, name, num_components, order)
    }

    /// Adds a field that lives only on the cells of the mesh region `block`.
    ///
    /// Its degrees of freedom are the vertices of those cells, and its residual and Jacobian
    /// blocks are integrated over the cells of their region that lie in `block`.
    pub fn add_block_field(
        &mut self,
        id: usize,
        name: &str,
        num_components: usize,
        order: usize,
        block: &str,
    ) -> eyre::Result<()> {
        self.assert_not_created("add a field")?;
        self.fields.add_restricted(id, name, num_components, order, block)
    }

    /// The region field `id` is restricted to, if any.
    pub fn get_field_block(&self, id: usize) -> eyre::Result<Option<&str>> {
        Ok(self.fields.get(id)?.block.as_deref())
    }

    pub fn get_field_name(&self, id: usize) -> eyre::Result<&str> {
        Ok(self.fields.get(id)?.name.as_str())
    }

    pub fn get_field_id(&self, name: &str) -> eyre::Result<usize> {
        Ok(self.fields.id(name)?)
    }

    pub fn has_field_by_id(&self, id: usize) -> bool {
        self.fields.has_id(id)
    }

    pub fn has_field_by_name(&self, name: &str) -> bool {
        self.fields.has_name(name)
    }

    pub fn get_num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn get_field_names(&self) -> Vec<String> {
        self.fields.names()
    }

    pub fn get_field_num_components(&self, id: usize) -> eyre::Result<usize> {
        Ok(self.fields.get(id)?.num_components)
    }

    pub fn get_field_order(&self, id: usize) -> eyre::Result<usize> {
        Ok(self.fields.get(id)?.order)
    }

    pub fn get_field_component_name(&self, id: usize, component: usize) -> eyre::Result<&str> {
        self.fields.component_name(id, component)
    }

    pub fn set_field_component_name(&mut self, id: usize, component: usize, name: &str) -> eyre::Result<()> {
        self.fields.set_component_name(id, component, name)
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn add_aux_field(&mut self, id: usize, name: &str, num_components: usize, order: usize) -> eyre::Result<()> {
        self.assert_not_created("add an auxiliary field")?;
        self.aux_fields.add(id, name, num_components, order)
    }

    pub fn set_aux_field(&mut self, id: usize, name: &str, num_components: usize, order: usize) -> eyre::Result<()> {
        self.assert_not_created("set an auxiliary field")?;
        self.aux_fields.set(id, name, num_components, order)
    }

    pub fn get_aux_field_name(&self, id: usize) -> eyre::Result<&str> {
        Ok(self.aux_fields.get(id)?.name.as_str())
    }

    pub fn get_aux_field_id(&self, name: &str) -> eyre::Result<usize> {
        Ok(self.aux_fields.id(name)?)
    }

    pub fn has_aux_field_by_id(&self, id: usize) -> bool {
        self.aux_fields.has_id(id)
    }

    pub fn has_aux_field_by_name(&self, name: &str) -> bool {
        self.aux_fields.has_name(name)
    }

    pub fn get_num_aux_fields(&self) -> usize {
        self.aux_fields.len()
    }

    pub fn get_aux_field_names(&self) -> Vec<String> {
        self.aux_fields.names()
    }

    pub fn get_aux_field_num_components(&self, id: usize) -> eyre::Result<usize> {
        Ok(self.aux_fields.get(id)?.num_components)
    }

    pub fn get_aux_field_order(&self, id: usize) -> eyre::Result<usize> {
        Ok(self.aux_fields.get(id)?.order)
    }

    pub fn get_aux_field_component_name(&self, id: usize, component: usize) -> eyre::Result<&str> {
        self.aux_fields.component_name(id, component)
    }

    pub fn set_aux_field_component_name(&mut self, id: usize, component: usize, name: &str) -> eyre::Result<()> {
        self.aux_fields.set_component_name(id, component, name)
    }

    pub fn aux_fields(&self) -> &Fields {
        &self.aux_fields
    }

    // Set-up

    /// One element per field; `jet_degrees` holds the jet degree by id, if any.
    fn discretize(&self, fields: &Fields, jet_degrees: Option<&FxHashMap<usize, usize>>) -> DiscreteSystem<T> {
        let elements = fields
            .iter()
            .map(|field| {
                let degree = jet_degrees
                    .and_then(|degrees| degrees.get(&field.id).copied())
                    .unwrap_or(1);
                FiniteElement::new(self.element, field.num_components, self.qorder, degree)
            })
            .collect();
        DiscreteSystem::new(elements)
    }

    /// Builds the discretization systems and binds the field views.
    pub fn create(&mut self) -> eyre::Result<()> {
        self.assert_not_created("create the problem")?;
        if self.fields.is_empty() {
            return Err(eyre!("Problem has no fields."));
        }

        // Hessians are only requested for primary fields
        let ds = self.discretize(&self.fields, Some(&self.jet_degrees));
        let aux_ds = if self.aux_fields.is_empty() {
            None
        } else {
            Some(self.discretize(&self.aux_fields, None))
        };

        self.asmbl
            .resize_primary(ds.total_components(), ds.has_hessians());
        if let Some(aux_ds) = &aux_ds {
            self.asmbl
                .resize_aux(aux_ds.total_components(), aux_ds.has_hessians());
        }

        let names = self.fields.names();
        let aux_names = self.aux_fields.names();
        self.views.bind(
            &ds,
            &names,
            aux_ds
                .as_ref()
                .map(|aux_ds| (aux_ds, aux_names.as_slice())),
        );
        self.weak_form.set_num_fields(ds.num_fields());

        info!(
            "Created {} problem with {} fields ({} dofs per cell) and {} auxiliary fields",
            self.element,
            ds.num_fields(),
            ds.total_dimension(),
            self.aux_fields.len()
        );
        self.ds = Some(ds);
        self.aux_ds = aux_ds;
        Ok(())
    }

    pub fn discrete_system(&self) -> Result<&DiscreteSystem<T>, AssemblyError> {
        self.ds.as_ref().ok_or(AssemblyError::NotSetUp)
    }

    pub fn aux_discrete_system(&self) -> Option<&DiscreteSystem<T>> {
        self.aux_ds.as_ref()
    }

    fn context_parts(&mut self) -> Result<(&mut DependencyEvaluator<T>, &AssemblyViews<T>), AssemblyError> {
        if !self.is_created() {
            return Err(AssemblyError::NotSetUp);
        }
        Ok((&mut self.evaluator, &self.views))
    }

    /// Creates a value functional named `name`, restricted to `region` (empty for the whole
    /// domain).
    ///
    /// `build` receives the set-up context, through which it declares the values it provides and
    /// obtains handles to values and field views it reads.
    pub fn create_functional<F, B>(&mut self, name: &str, region: &str, build: B) -> eyre::Result<FunctionalId>
    where
        F: ValueFunctional<T> + 'static,
        B: FnOnce(&mut FunctionalContext<'_, T>) -> eyre::Result<F>,
    {
        let (evaluator, views) = self.context_parts()?;
        let mut ctx = FunctionalContext::new(name, region, evaluator.values_mut(), views);
        let functional = build(&mut ctx)?;
        let info = ctx.into_info();
        Ok(evaluator.add_functional(info, Box::new(functional))?)
    }

    /// Creates a residual integrand (`f0` or `f1`) to be registered with a residual block.
    pub fn residual_functional<F, B>(&mut self, name: &str, region: &str, build: B) -> eyre::Result<ResidualIntegrand<T>>
    where
        F: ResidualFunc<T> + 'static,
        B: FnOnce(&mut FunctionalContext<'_, T>) -> eyre::Result<F>,
    {
        let (evaluator, views) = self.context_parts()?;
        let mut ctx = FunctionalContext::new(name, region, evaluator.values_mut(), views);
        let func = build(&mut ctx)?;
        let info = ctx.into_info();
        let id = evaluator.add_integrand(info);
        Ok(Integrand::new(id, Box::new(func)))
    }

    /// Creates a Jacobian integrand (`g0`..`g3`) to be registered with a Jacobian block.
    pub fn jacobian_functional<F, B>(&mut self, name: &str, region: &str, build: B) -> eyre::Result<JacobianIntegrand<T>>
    where
        F: JacobianFunc<T> + 'static,
        B: FnOnce(&mut FunctionalContext<'_, T>) -> eyre::Result<F>,
    {
        let (evaluator, views) = self.context_parts()?;
        let mut ctx = FunctionalContext::new(name, region, evaluator.values_mut(), views);
        let func = build(&mut ctx)?;
        let info = ctx.into_info();
        let id = evaluator.add_integrand(info);
        Ok(Integrand::new(id, Box::new(func)))
    }

    /// Declares the problem-wide parameter `name` with an initial value.
    ///
    /// Functionals read it with [`FunctionalContext::get_parameter`], or with
    /// [`FunctionalContext::get_value`] when they are not restricted to a region. Parameters need
    /// no supplier and can be changed between assemblies with [`set_parameter`](Self::set_parameter).
    pub fn declare_parameter<V: Default + 'static>(&mut self, name: &str, value: V) -> eyre::Result<ValueHandle<V>> {
        let handle = self.evaluator.declare_parameter(name)?;
        self.evaluator.set_parameter(handle, value);
        debug!("Declared parameter '{}'", name);
        Ok(handle)
    }

    pub fn set_parameter<V: 'static>(&mut self, handle: ValueHandle<V>, value: V) {
        self.evaluator.set_parameter(handle, value);
    }

    pub fn parameter<V: 'static>(&self, handle: ValueHandle<V>) -> &V {
        self.evaluator.values().get(handle)
    }

    pub fn evaluator(&self) -> &DependencyEvaluator<T> {
        &self.evaluator
    }

    pub fn weak_form(&self) -> &WeakForm<T> {
        &self.weak_form
    }

    pub fn assembly_data(&self) -> &AssemblyData<T> {
        &self.asmbl
    }

    fn field_key(&self, id: usize, region: &str) -> eyre::Result<Key> {
        if !self.is_created() {
            return Err(AssemblyError::NotSetUp.into());
        }
        Ok(Key::for_region(region, self.fields.index_of(id)?))
    }

    fn field_pair_key(&self, fid: usize, gid: usize, region: &str) -> eyre::Result<Key> {
        if !self.is_created() {
            return Err(AssemblyError::NotSetUp.into());
        }
        let f = self.fields.index_of(fid)?;
        let g = self.fields.index_of(gid)?;
        Ok(Key::for_region(region, self.weak_form.jacobian_field(f, g)))
    }

    /// Registers the residual integrands of field `id` on `region`.
    pub fn add_residual_block(
        &mut self,
        id: usize,
        f0: Option<ResidualIntegrand<T>>,
        f1: Option<ResidualIntegrand<T>>,
        region: &str,
    ) -> eyre::Result<()> {
        let key = self.field_key(id, region)?;
        self.weak_form.add_residual(ResidualKind::F0, key.clone(), f0);
        self.weak_form.add_residual(ResidualKind::F1, key, f1);
        Ok(())
    }

    /// Registers boundary residual integrands of field `id` on the facet set `boundary`.
    pub fn add_boundary_residual_block(
        &mut self,
        id: usize,
        f0: Option<ResidualIntegrand<T>>,
        f1: Option<ResidualIntegrand<T>>,
        boundary: &str,
    ) -> eyre::Result<()> {
        let key = self.field_key(id, boundary)?;
        self.weak_form.add_residual(ResidualKind::BndF0, key.clone(), f0);
        self.weak_form.add_residual(ResidualKind::BndF1, key, f1);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn add_jacobian_kinds(
        &mut self,
        kinds: [JacobianKind; 4],
        fid: usize,
        gid: usize,
        g0: Option<JacobianIntegrand<T>>,
        g1: Option<JacobianIntegrand<T>>,
        g2: Option<JacobianIntegrand<T>>,
        g3: Option<JacobianIntegrand<T>>,
        region: &str,
    ) -> eyre::Result<()> {
        let key = self.field_pair_key(fid, gid, region)?;
        for (kind, g) in kinds.into_iter().zip([g0, g1, g2, g3]) {
            self.weak_form.add_jacobian(kind, key.clone(), g);
        }
        Ok(())
    }

    /// Registers the Jacobian integrands of test field `fid` and trial field `gid` on `region`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_jacobian_block(
        &mut self,
        fid: usize,
        gid: usize,
        g0: Option<JacobianIntegrand<T>>,
        g1: Option<JacobianIntegrand<T>>,
        g2: Option<JacobianIntegrand<T>>,
        g3: Option<JacobianIntegrand<T>>,
        region: &str,
    ) -> eyre::Result<()> {
        let kinds = JacobianKind::blocks(JacobianType::Jacobian);
        self.add_jacobian_kinds(kinds, fid, gid, g0, g1, g2, g3, region)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_jacobian_preconditioner_block(
        &mut self,
        fid: usize,
        gid: usize,
        g0: Option<JacobianIntegrand<T>>,
        g1: Option<JacobianIntegrand<T>>,
        g2: Option<JacobianIntegrand<T>>,
        g3: Option<JacobianIntegrand<T>>,
        region: &str,
    ) -> eyre::Result<()> {
        let kinds = JacobianKind::blocks(JacobianType::Preconditioner);
        self.add_jacobian_kinds(kinds, fid, gid, g0, g1, g2, g3, region)
    }

    /// Registers the derivative of the residual with respect to the time derivative of `gid`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_jacobian_dynamic_block(
        &mut self,
        fid: usize,
        gid: usize,
        g0: Option<JacobianIntegrand<T>>,
        g1: Option<JacobianIntegrand<T>>,
        g2: Option<JacobianIntegrand<T>>,
        g3: Option<JacobianIntegrand<T>>,
        region: &str,
    ) -> eyre::Result<()> {
        let kinds = JacobianKind::blocks(JacobianType::Dynamic);
        self.add_jacobian_kinds(kinds, fid, gid, g0, g1, g2, g3, region)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn add_boundary_jacobian_block(
        &mut self,
        fid: usize,
        gid: usize,
        g0: Option<JacobianIntegrand<T>>,
        g1: Option<JacobianIntegrand<T>>,
        g2: Option<JacobianIntegrand<T>>,
        g3: Option<JacobianIntegrand<T>>,
        boundary: &str,
    ) -> eyre::Result<()> {
        let kinds = JacobianKind::boundary_blocks();
        self.add_jacobian_kinds(kinds, fid, gid, g0, g1, g2, g3, boundary)
    }

    /// Sorts the functionals of every registered block.
    pub fn set_up(&mut self) -> eyre::Result<()> {
        if !self.is_created() {
            return Err(AssemblyError::NotSetUp.into());
        }
        self.sort_functionals()?;
        Ok(())
    }

    /// Computes, for every key with integrands, the value functionals the integrands need in the
    /// order they must be evaluated.
    pub fn sort_functionals(&mut self) -> Result<(), DependencyError> {
        let suppliers = self.evaluator.get_suppliers()?;
        let graph = self.evaluator.build_dependency_graph(&suppliers)?;
        let wf = &self.weak_form;

        let residual_roots = |kinds: [ResidualKind; 2], key: &Key| -> Vec<FunctionalId> {
            kinds
                .iter()
                .flat_map(|&kind| wf.get_residual(kind, key))
                .map(|integrand| integrand.id())
                .collect()
        };
        let jacobian_roots = |kinds: &[JacobianKind], key: &Key| -> Vec<FunctionalId> {
            kinds
                .iter()
                .flat_map(|&kind| wf.get_jacobian(kind, key))
                .map(|integrand| integrand.id())
                .collect()
        };

        let mut sorted_res = BTreeMap::new();
        for key in wf.get_residual_keys() {
            let roots = residual_roots([ResidualKind::F0, ResidualKind::F1], &key);
            sorted_res.insert(key, self.sort_roots(&graph, &suppliers, &roots)?);
        }
        let mut sorted_bnd_res = BTreeMap::new();
        for key in wf.get_bnd_residual_keys() {
            let roots = residual_roots([ResidualKind::BndF0, ResidualKind::BndF1], &key);
            sorted_bnd_res.insert(key, self.sort_roots(&graph, &suppliers, &roots)?);
        }
        let volume_kinds: Vec<JacobianKind> = [JacobianType::Jacobian, JacobianType::Preconditioner, JacobianType::Dynamic]
            .into_iter()
            .flat_map(JacobianKind::blocks)
            .collect();
        let mut sorted_jac = BTreeMap::new();
        for key in wf.get_jacobian_keys() {
            let roots = jacobian_roots(&volume_kinds, &key);
            sorted_jac.insert(key, self.sort_roots(&graph, &suppliers, &roots)?);
        }
        let mut sorted_bnd_jac = BTreeMap::new();
        for key in wf.get_bnd_jacobian_keys() {
            let roots = jacobian_roots(&JacobianKind::boundary_blocks(), &key);
            sorted_bnd_jac.insert(key, self.sort_roots(&graph, &suppliers, &roots)?);
        }

        for (kind, sorted) in [
            ("residual", &sorted_res),
            ("boundary residual", &sorted_bnd_res),
            ("Jacobian", &sorted_jac),
            ("boundary Jacobian", &sorted_bnd_jac),
        ] {
            for (key, ids) in sorted {
                let names: Vec<&str> = ids
                    .iter()
                    .map(|id| self.evaluator.info(*id).name.as_str())
                    .collect();
                debug!("Sorted {} functionals for key {}: {:?}", kind, key, names);
            }
        }

        self.sorted_res = sorted_res;
        self.sorted_bnd_res = sorted_bnd_res;
        self.sorted_jac = sorted_jac;
        self.sorted_bnd_jac = sorted_bnd_jac;
        Ok(())
    }

    fn sort_roots(
        &self,
        graph: &DependencyGraph<FunctionalId>,
        suppliers: &BTreeMap<String, FunctionalId>,
        roots: &[FunctionalId],
    ) -> Result<Vec<FunctionalId>, DependencyError> {
        let mut graph = graph.clone();
        for &id in roots {
            graph.add_node(id);
            self.evaluator
                .add_dependency_edges(&mut graph, id, suppliers)?;
        }
        Ok(graph
            .topological_sort(roots)?
            .into_iter()
            .filter(|id| self.evaluator.is_value_functional(*id))
            .collect())
    }

    /// Value functionals evaluated before the residual integrands of `key`, in order.
    pub fn sorted_residual_functionals(&self, key: &Key) -> &[FunctionalId] {
        self.sorted_res.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn sorted_jacobian_functionals(&self, key: &Key) -> &[FunctionalId] {
        self.sorted_jac.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    fn integrator(&mut self, cache: Cache, key: &Key) -> Result<(Integrator<'_, T>, &[FunctionalId]), AssemblyError> {
        let Self {
            ds,
            aux_ds,
            weak_form,
            evaluator,
            asmbl,
            arena,
            sorted_res,
            sorted_bnd_res,
            sorted_jac,
            sorted_bnd_jac,
            ..
        } = self;
        let ds = ds.as_ref().ok_or(AssemblyError::NotSetUp)?;
        let sorted = match cache {
            Cache::Residual => sorted_res,
            Cache::BndResidual => sorted_bnd_res,
            Cache::Jacobian => sorted_jac,
            Cache::BndJacobian => sorted_bnd_jac,
        };
        let sorted = sorted.get(key).map(Vec::as_slice).unwrap_or(&[]);
        let integrator = Integrator {
            ds,
            aux_ds: aux_ds.as_ref(),
            weak_form,
            evaluator,
            asmbl,
            arena,
        };
        Ok((integrator, sorted))
    }

    /// See [`Integrator::integrate_residual`].
    pub fn integrate_residual(
        &mut self,
        key: &Key,
        batch: &ElementBatch<T>,
        t: T,
        elem_vec: &mut [T],
    ) -> Result<(), AssemblyError> {
        let (mut integrator, sorted) = self.integrator(Cache::Residual, key)?;
        integrator.integrate_residual(key, sorted, batch, t, elem_vec)
    }

    pub fn integrate_bnd_residual(
        &mut self,
        key: &Key,
        batch: &ElementBatch<T>,
        t: T,
        elem_vec: &mut [T],
    ) -> Result<(), AssemblyError> {
        let (mut integrator, sorted) = self.integrator(Cache::BndResidual, key)?;
        integrator.integrate_bnd_residual(key, sorted, batch, t, elem_vec)
    }

    /// See [`Integrator::integrate_jacobian`].
    pub fn integrate_jacobian(
        &mut self,
        jtype: JacobianType,
        key: &Key,
        batch: &ElementBatch<T>,
        t: T,
        u_t_shift: T,
        elem_mat: &mut [T],
    ) -> Result<(), AssemblyError> {
        let (mut integrator, sorted) = self.integrator(Cache::Jacobian, key)?;
        integrator.integrate_jacobian(jtype, key, sorted, batch, t, u_t_shift, elem_mat)
    }

    pub fn integrate_bnd_jacobian(
        &mut self,
        key: &Key,
        batch: &ElementBatch<T>,
        t: T,
        u_t_shift: T,
        elem_mat: &mut [T],
    ) -> Result<(), AssemblyError> {
        let (mut integrator, sorted) = self.integrator(Cache::BndJacobian, key)?;
        integrator.integrate_bnd_jacobian(key, sorted, batch, t, u_t_shift, elem_mat)
    }
}
