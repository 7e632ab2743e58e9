//! Weak-form finite element assembly.
//!
//! A problem is described by pointwise integrands (the `f0`/`f1` residual and `g0`..`g3`
//! Jacobian terms) registered per field and region in a [`weak_form::WeakForm`]. Integrands
//! may consume named values computed by other functionals; the [`dependency`] module sorts them
//! so that every value is computed before it is read. The [`assembly`] engine then evaluates
//! field jets at quadrature points, runs the functionals and integrates the element vectors and
//! matrices.
pub mod arena;
pub mod assembly;
pub mod dense;
pub mod dependency;
pub mod fe;
pub mod field_value;
pub mod functional;
pub mod mesh;
pub mod problem;
pub mod section;
pub mod weak_form;

pub mod optimize {
    pub use galerkin_optimize::*;
}

#[cfg(feature = "proptest")]
pub mod proptest;

pub use galerkin_traits::Real;

pub extern crate nalgebra;
pub extern crate nalgebra_sparse;
