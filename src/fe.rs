//! Finite element substrate: reference elements, quadrature, tabulated bases, discretizations
//! and element geometry.
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};

mod discretization;
mod element;
mod geometry;
pub mod primitives;
mod quadrature;
mod tabulation;

pub use discretization::*;
pub use element::*;
pub use geometry::*;
pub use quadrature::*;
pub use tabulation::*;

/// A geometric operation was requested for an element type and dimension it has no formula for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotImplemented {
    pub what: &'static str,
    pub element: ElementType,
    pub dim: usize,
}

impl NotImplemented {
    pub fn new(what: &'static str, element: ElementType, dim: usize) -> Self {
        Self { what, element, dim }
    }
}

impl Display for NotImplemented {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} for {} in {} dimensions is not implemented.",
            self.what, self.element, self.dim
        )
    }
}

impl Error for NotImplemented {}
