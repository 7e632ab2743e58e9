//! Late-bound views into the per-point assembly buffers.
//!
//! A view records *where* in [`AssemblyData`] a quantity lives, not the data itself. Views are
//! handed to functionals at set-up time and bound once the discretization is known, after which
//! every read observes whatever the assembly engine wrote for the current quadrature point.
//! Reading an unbound view is a programming error and panics.
use crate::assembly::{AssemblyBuffer, AssemblyData};
use std::marker::PhantomData;
use std::ops::Range;

#[derive(Debug)]
pub struct LateBindArray<T> {
    buffer: AssemblyBuffer,
    binding: Option<Range<usize>>,
    marker: PhantomData<fn() -> T>,
}

impl<T> Clone for LateBindArray<T> {
    fn clone(&self) -> Self {
        Self {
            buffer: self.buffer,
            binding: self.binding.clone(),
            marker: PhantomData,
        }
    }
}

impl<T> LateBindArray<T> {
    pub fn unbound(buffer: AssemblyBuffer) -> Self {
        Self {
            buffer,
            binding: None,
            marker: PhantomData,
        }
    }

    /// Points the view at `len` entries starting at `offset` of its buffer.
    pub fn set(&mut self, offset: usize, len: usize) {
        self.binding = Some(offset..offset + len);
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    pub fn buffer(&self) -> AssemblyBuffer {
        self.buffer
    }

    /// Number of entries covered by the view, zero while unbound.
    pub fn len(&self) -> usize {
        self.binding.as_ref().map(Range::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get<'a>(&self, asmbl: &'a AssemblyData<T>) -> &'a [T] {
        let range = self
            .binding
            .clone()
            .unwrap_or_else(|| panic!("{:?} view dereferenced before it was bound", self.buffer));
        &asmbl.buffer(self.buffer)[range]
    }
}

impl<T: Copy> LateBindArray<T> {
    pub fn at(&self, asmbl: &AssemblyData<T>, idx: usize) -> T {
        self.get(asmbl)[idx]
    }
}

/// Values of one field's components (also used for time derivatives).
#[derive(Debug, Clone)]
pub struct FieldValue<T>(pub(crate) LateBindArray<T>);

impl<T: Copy> FieldValue<T> {
    pub fn get<'a>(&self, asmbl: &'a AssemblyData<T>) -> &'a [T] {
        self.0.get(asmbl)
    }

    /// Value of component `c`.
    pub fn at(&self, asmbl: &AssemblyData<T>, c: usize) -> T {
        self.0.at(asmbl, c)
    }

    pub fn is_bound(&self) -> bool {
        self.0.is_bound()
    }
}

/// Gradient of one field, stored component-major: entry `c * dim + d` is `du_c/dx_d`.
#[derive(Debug, Clone)]
pub struct FieldGradient<T> {
    pub(crate) array: LateBindArray<T>,
    pub(crate) dim: usize,
}

impl<T: Copy> FieldGradient<T> {
    pub fn get<'a>(&self, asmbl: &'a AssemblyData<T>) -> &'a [T] {
        self.array.get(asmbl)
    }

    /// Gradient of component `c`.
    pub fn component<'a>(&self, asmbl: &'a AssemblyData<T>, c: usize) -> &'a [T] {
        &self.array.get(asmbl)[c * self.dim..(c + 1) * self.dim]
    }

    pub fn at(&self, asmbl: &AssemblyData<T>, c: usize, d: usize) -> T {
        self.array.at(asmbl, c * self.dim + d)
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn is_bound(&self) -> bool {
        self.array.is_bound()
    }
}

/// A spatial vector of length `dim`, such as the physical point or the outward normal.
#[derive(Debug, Clone)]
pub struct SpatialVector<T>(pub(crate) LateBindArray<T>);

impl<T: Copy> SpatialVector<T> {
    pub fn get<'a>(&self, asmbl: &'a AssemblyData<T>) -> &'a [T] {
        self.0.get(asmbl)
    }

    pub fn at(&self, asmbl: &AssemblyData<T>, d: usize) -> T {
        let values = self.0.get(asmbl);
        assert!(d < values.len());
        values[d]
    }
}

/// Physical coordinates of the current quadrature point.
pub type Point<T> = SpatialVector<T>;

/// Outward unit normal at the current boundary quadrature point.
pub type Normal<T> = SpatialVector<T>;

/// Second derivatives of one field: entry `(c * dim + d1) * dim + d2` is `d2u_c/dx_d1 dx_d2`.
///
/// Only bound when the field is discretized with jet degree 2.
#[derive(Debug, Clone)]
pub struct FieldHessian<T> {
    pub(crate) array: LateBindArray<T>,
    pub(crate) dim: usize,
}

impl<T: Copy> FieldHessian<T> {
    pub fn get<'a>(&self, asmbl: &'a AssemblyData<T>) -> &'a [T] {
        self.array.get(asmbl)
    }

    pub fn at(&self, asmbl: &AssemblyData<T>, c: usize, d1: usize, d2: usize) -> T {
        self.array.at(asmbl, (c * self.dim + d1) * self.dim + d2)
    }

    pub fn is_bound(&self) -> bool {
        self.array.is_bound()
    }
}
