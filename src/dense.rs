//! Fixed-size small vectors and matrices used as per-element scratch storage.
//!
//! The types here have value semantics and never allocate, with the exception of
//! [`DenseMatrixSymm`], [`Array1D`] and [`Array2D`]. Conversions to and from `nalgebra` types are
//! provided so that results can be handed to the rest of the ecosystem.
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};

mod array;
mod matrix;
mod symm;
mod vector;

pub use array::*;
pub use matrix::*;
pub use symm::*;
pub use vector::*;

/// Returned when inverting a matrix whose determinant is exactly zero.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SingularMatrixError;

impl Display for SingularMatrixError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Matrix is singular")
    }
}

impl Error for SingularMatrixError {}
