//! The weak-form assembly engine.
//!
//! Assembly proceeds in batches of elements that share a discretization. For every element and
//! quadrature point, the jets of all fields are reconstructed into [`AssemblyData`], the value
//! functionals are run in dependency order and the pointwise integrands are evaluated. The
//! weighted pointwise results are then contracted against the basis functions into element
//! vectors and matrices, which the caller scatters into global structures.
use crate::fe::FEGeom;
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};

mod data;
mod integrate;
mod jets;
mod update;
mod views;

pub use data::*;
pub use integrate::*;
pub use jets::*;
pub use update::*;
pub use views::*;

/// Configuration errors detected while setting up or running assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyError {
    /// The quadrature has more than one weight per point.
    NonScalarQuadrature(usize),
    /// Primary and auxiliary tabulations disagree on the number of points.
    TabulationMismatch { primary: usize, auxiliary: usize },
    UnknownField(String),
    UnknownFieldId(usize),
    FieldIdExists { name: String, id: usize },
    /// An operation requires the problem to be created first.
    NotSetUp,
}

impl Display for AssemblyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonScalarQuadrature(n) => {
                write!(f, "Only scalar quadrature is supported, got {} weight components.", n)
            }
            Self::TabulationMismatch { primary, auxiliary } => write!(
                f,
                "Number of tabulation points for auxiliary fields ({}) does not match the primary fields ({}).",
                auxiliary, primary
            ),
            Self::UnknownField(name) => write!(f, "Field '{}' does not exist. Typo?", name),
            Self::UnknownFieldId(id) => write!(f, "Field with ID = '{}' does not exist.", id),
            Self::FieldIdExists { name, id } => {
                write!(f, "Cannot add field '{}' with ID = {}. ID already exists.", name, id)
            }
            Self::NotSetUp => write!(f, "The problem has not been created yet."),
        }
    }
}

impl Error for AssemblyError {}

/// Input of one integration call: a batch of elements sharing a discretization.
///
/// `coefficients` holds the element closures back to back (`tot_dim` values per element), and
/// likewise `coefficients_t` for time derivatives and `aux_coefficients` for the auxiliary
/// system.
#[derive(Debug, Copy, Clone)]
pub struct ElementBatch<'a, T> {
    pub geom: &'a FEGeom<T>,
    pub coefficients: &'a [T],
    pub coefficients_t: Option<&'a [T]>,
    pub aux_coefficients: Option<&'a [T]>,
}

impl<'a, T> ElementBatch<'a, T> {
    pub fn new(geom: &'a FEGeom<T>, coefficients: &'a [T]) -> Self {
        Self {
            geom,
            coefficients,
            coefficients_t: None,
            aux_coefficients: None,
        }
    }

    pub fn with_time_derivatives(mut self, coefficients_t: &'a [T]) -> Self {
        self.coefficients_t = Some(coefficients_t);
        self
    }

    pub fn with_aux(mut self, aux_coefficients: &'a [T]) -> Self {
        self.aux_coefficients = Some(aux_coefficients);
        self
    }
}

impl<'a, T: galerkin_traits::Real> ElementBatch<'a, T> {
    pub fn num_elements(&self) -> usize {
        self.geom.num_elements()
    }
}
