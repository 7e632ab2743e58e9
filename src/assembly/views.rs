use crate::assembly::{AssemblyBuffer, AssemblyError};
use crate::fe::DiscreteSystem;
use crate::field_value::{FieldGradient, FieldHessian, FieldValue, LateBindArray, Normal, Point, SpatialVector};
use galerkin_traits::Real;
use rustc_hash::FxHashMap;

/// Views of the jets of one field.
#[derive(Debug, Clone)]
pub struct FieldViews<T> {
    pub value: FieldValue<T>,
    pub gradient: FieldGradient<T>,
    pub hessian: FieldHessian<T>,
    pub dot: FieldValue<T>,
}

impl<T> FieldViews<T> {
    fn unbound(dim: usize, values: AssemblyBuffer, derivatives: AssemblyBuffer) -> Self {
        Self {
            value: FieldValue(LateBindArray::unbound(values)),
            gradient: FieldGradient {
                array: LateBindArray::unbound(derivatives),
                dim,
            },
            hessian: FieldHessian {
                array: LateBindArray::unbound(derivatives),
                dim,
            },
            dot: FieldValue(LateBindArray::unbound(AssemblyBuffer::UT)),
        }
    }
}

/// Name-indexed views of everything a functional may read at a quadrature point.
#[derive(Debug, Clone)]
pub struct AssemblyViews<T> {
    dim: usize,
    fields: FxHashMap<String, FieldViews<T>>,
    aux_fields: FxHashMap<String, FieldViews<T>>,
    xyz: Point<T>,
    normal: Normal<T>,
}

impl<T: Real> AssemblyViews<T> {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            fields: FxHashMap::default(),
            aux_fields: FxHashMap::default(),
            xyz: SpatialVector(LateBindArray::unbound(AssemblyBuffer::Xyz)),
            normal: SpatialVector(LateBindArray::unbound(AssemblyBuffer::Normal)),
        }
    }

    /// Binds every view to its location in the assembly buffers.
    ///
    /// `names[f]` is the name of field `f` of `ds`.
    pub(crate) fn bind(
        &mut self,
        ds: &DiscreteSystem<T>,
        names: &[String],
        aux: Option<(&DiscreteSystem<T>, &[String])>,
    ) {
        let dim = self.dim;
        self.xyz.0.set(0, dim);
        self.normal.0.set(0, dim);

        self.fields = bind_fields(dim, ds, names, AssemblyBuffer::U, AssemblyBuffer::UX);
        self.aux_fields = match aux {
            Some((aux_ds, aux_names)) => bind_fields(dim, aux_ds, aux_names, AssemblyBuffer::A, AssemblyBuffer::AX),
            None => FxHashMap::default(),
        };
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn field(&self, name: &str) -> Result<&FieldViews<T>, AssemblyError> {
        self.fields
            .get(name)
            .ok_or_else(|| AssemblyError::UnknownField(name.to_string()))
    }

    pub fn aux_field(&self, name: &str) -> Result<&FieldViews<T>, AssemblyError> {
        self.aux_fields
            .get(name)
            .ok_or_else(|| AssemblyError::UnknownField(name.to_string()))
    }

    pub fn xyz(&self) -> &Point<T> {
        &self.xyz
    }

    pub fn normal(&self) -> &Normal<T> {
        &self.normal
    }
}

fn bind_fields<T: Real>(
    dim: usize,
    ds: &DiscreteSystem<T>,
    names: &[String],
    values: AssemblyBuffer,
    derivatives: AssemblyBuffer,
) -> FxHashMap<String, FieldViews<T>> {
    let hessian_offset = ds.total_components() * dim;
    names
        .iter()
        .enumerate()
        .map(|(f, name)| {
            let nc = ds.field(f).num_components();
            let offset = ds.component_offset(f);
            let mut views = FieldViews::unbound(dim, values, derivatives);
            views.value.0.set(offset, nc);
            views.gradient.array.set(offset * dim, nc * dim);
            if values == AssemblyBuffer::U {
                views.dot.0.set(offset, nc);
            }
            if ds.jet_degree(f) > 1 {
                views
                    .hessian
                    .array
                    .set(hessian_offset + offset * dim * dim, nc * dim * dim);
            }
            (name.clone(), views)
        })
        .collect()
}
