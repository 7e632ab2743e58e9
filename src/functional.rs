//! Functionals: the user-extensible units evaluated at every quadrature point.
//!
//! There are three kinds:
//!
//! - [`ValueFunctional`]s compute named intermediate values (a material density, a flux, ...)
//!   that other functionals consume.
//! - [`ResidualFunc`]s are the pointwise residual integrands `f0`/`f1`.
//! - [`JacobianFunc`]s are the pointwise Jacobian integrands `g0`..`g3`.
//!
//! All of them are constructed through a [`FunctionalContext`], which hands out views of the
//! field jets and records which values the functional provides and depends on. Closures with
//! the right signature implement the traits directly.
use crate::assembly::{AssemblyData, AssemblyError, AssemblyViews};
use crate::dependency::{DependencyError, FunctionalId, FunctionalInfo, ValueHandle, ValueStore};
use crate::field_value::{FieldGradient, FieldHessian, FieldValue, Normal, Point};
use galerkin_traits::Real;
use std::fmt;

/// Computes values provided to other functionals.
pub trait ValueFunctional<T> {
    fn evaluate(&self, asmbl: &AssemblyData<T>, values: &mut ValueStore);
}

impl<T, F> ValueFunctional<T> for F
where
    F: Fn(&AssemblyData<T>, &mut ValueStore),
{
    fn evaluate(&self, asmbl: &AssemblyData<T>, values: &mut ValueStore) {
        self(asmbl, values)
    }
}

/// A pointwise residual integrand.
///
/// An `f0` integrand writes one entry per component of the test field, an `f1` integrand writes
/// `components * dim` entries laid out as `c * dim + d`. The output is zeroed before the call.
pub trait ResidualFunc<T> {
    fn evaluate(&self, asmbl: &AssemblyData<T>, values: &ValueStore, f: &mut [T]);
}

impl<T, F> ResidualFunc<T> for F
where
    F: Fn(&AssemblyData<T>, &ValueStore, &mut [T]),
{
    fn evaluate(&self, asmbl: &AssemblyData<T>, values: &ValueStore, f: &mut [T]) {
        self(asmbl, values, f)
    }
}

/// A pointwise Jacobian integrand.
///
/// For test field `i` with `nc_i` components and trial field `j` with `nc_j` components, the
/// output layouts are `g0[fc * nc_j + gc]`, `g1[(fc * nc_j + gc) * dim + df]` (trial gradient),
/// `g2[(fc * nc_j + gc) * dim + df]` (test gradient) and
/// `g3[((fc * nc_j + gc) * dim + df) * dim + dg]`. The output is zeroed before the call.
pub trait JacobianFunc<T> {
    fn evaluate(&self, asmbl: &AssemblyData<T>, values: &ValueStore, g: &mut [T]);
}

impl<T, F> JacobianFunc<T> for F
where
    F: Fn(&AssemblyData<T>, &ValueStore, &mut [T]),
{
    fn evaluate(&self, asmbl: &AssemblyData<T>, values: &ValueStore, g: &mut [T]) {
        self(asmbl, values, g)
    }
}

/// An integrand registered with the dependency evaluator.
pub struct Integrand<F: ?Sized> {
    id: FunctionalId,
    func: Box<F>,
}

impl<F: ?Sized> Integrand<F> {
    pub(crate) fn new(id: FunctionalId, func: Box<F>) -> Self {
        Self { id, func }
    }

    pub fn id(&self) -> FunctionalId {
        self.id
    }

    pub fn func(&self) -> &F {
        &self.func
    }
}

impl<F: ?Sized> fmt::Debug for Integrand<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Integrand").field("id", &self.id).finish()
    }
}

pub type ResidualIntegrand<T> = Integrand<dyn ResidualFunc<T>>;
pub type JacobianIntegrand<T> = Integrand<dyn JacobianFunc<T>>;

/// Set-up context handed to functional constructors.
pub struct FunctionalContext<'a, T> {
    values: &'a mut ValueStore,
    views: &'a AssemblyViews<T>,
    info: FunctionalInfo,
}

impl<'a, T: Real> FunctionalContext<'a, T> {
    pub(crate) fn new(name: &str, region: &str, values: &'a mut ValueStore, views: &'a AssemblyViews<T>) -> Self {
        Self {
            values,
            views,
            info: FunctionalInfo {
                name: name.to_string(),
                region: region.to_string(),
                ..FunctionalInfo::default()
            },
        }
    }

    pub(crate) fn into_info(self) -> FunctionalInfo {
        self.info
    }

    pub fn spatial_dimension(&self) -> usize {
        self.views.dim()
    }

    /// Region the functional is restricted to, empty for the whole domain.
    pub fn region(&self) -> &str {
        &self.info.region
    }

    /// Name under which `name` is stored, qualified by the region as `name@region`.
    pub fn value_name(&self, name: &str) -> String {
        if self.info.region.is_empty() {
            name.to_string()
        } else {
            format!("{}@{}", name, self.info.region)
        }
    }

    /// Declares a value provided by the functional under construction.
    pub fn declare_value<V: Default + 'static>(&mut self, name: &str) -> Result<ValueHandle<V>, DependencyError> {
        let value_name = self.value_name(name);
        let handle = self.values.declare(&value_name)?;
        self.info.provides.insert(value_name);
        Ok(handle)
    }

    /// Requests a value provided by another functional, recording the dependency.
    pub fn get_value<V: Default + 'static>(&mut self, name: &str) -> Result<ValueHandle<V>, DependencyError> {
        let value_name = self.value_name(name);
        let handle = self.values.lookup(&value_name)?;
        self.info.depends_on.insert(value_name);
        Ok(handle)
    }

    /// Requests the problem-wide parameter `name`, which is never qualified by the region.
    pub fn get_parameter<V: Default + 'static>(&mut self, name: &str) -> Result<ValueHandle<V>, DependencyError> {
        if !self.values.is_parameter(name) {
            return Err(DependencyError::UnknownParameter(name.to_string()));
        }
        self.values.lookup(name)
    }

    pub fn field_value(&self, field_name: &str) -> Result<FieldValue<T>, AssemblyError> {
        Ok(self.views.field(field_name)?.value.clone())
    }

    pub fn field_gradient(&self, field_name: &str) -> Result<FieldGradient<T>, AssemblyError> {
        Ok(self.views.field(field_name)?.gradient.clone())
    }

    pub fn field_hessian(&self, field_name: &str) -> Result<FieldHessian<T>, AssemblyError> {
        Ok(self.views.field(field_name)?.hessian.clone())
    }

    /// Time derivative of a field.
    pub fn field_dot(&self, field_name: &str) -> Result<FieldValue<T>, AssemblyError> {
        Ok(self.views.field(field_name)?.dot.clone())
    }

    pub fn aux_field_value(&self, field_name: &str) -> Result<FieldValue<T>, AssemblyError> {
        Ok(self.views.aux_field(field_name)?.value.clone())
    }

    pub fn aux_field_gradient(&self, field_name: &str) -> Result<FieldGradient<T>, AssemblyError> {
        Ok(self.views.aux_field(field_name)?.gradient.clone())
    }

    pub fn xyz(&self) -> Point<T> {
        self.views.xyz().clone()
    }

    pub fn normal(&self) -> Normal<T> {
        self.views.normal().clone()
    }
}
