//! Named value flow between functionals and the dependency ordering derived from it.
//!
//! Functionals *provide* named values and *depend on* values provided by others. The
//! [`DependencyEvaluator`] owns the value storage and all value-providing functionals, and
//! from the declared names it builds a [`DependencyGraph`] whose topological order is the order
//! in which functionals must be evaluated at each quadrature point.
use std::error::Error;
use std::fmt;
use std::fmt::{Display, Formatter};

mod evaluator;
mod graph;

pub use evaluator::*;
pub use graph::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyError {
    /// A second functional attempted to declare a value that is already declared.
    ValueAlreadyDeclared(String),
    /// A value was requested with a different type than it was declared with.
    ValueTypeMismatch(String),
    /// A functional with the same name is already registered.
    FunctionalExists(String),
    /// No functional with the given name is registered.
    FunctionalNotFound(String),
    /// More than one functional supplies the given value.
    DuplicateSupplier(String),
    /// A functional depends on a value no functional supplies.
    UnresolvedDependency { functional: String, value: String },
    /// The dependency relation contains a cycle.
    CyclicDependency,
    /// No parameter with the given name is declared.
    UnknownParameter(String),
}

impl Display for DependencyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValueAlreadyDeclared(name) => {
                write!(f, "Trying to declare an already existing value '{}'.", name)
            }
            Self::ValueTypeMismatch(name) => {
                write!(f, "Value '{}' is used with a type different from its declaration.", name)
            }
            Self::FunctionalExists(name) => write!(f, "Functional with name '{}' already exists.", name),
            Self::FunctionalNotFound(name) => write!(f, "No functional with name '{}' found. Typo?", name),
            Self::DuplicateSupplier(name) => {
                write!(f, "Value '{}' is supplied by multiple functionals.", name)
            }
            Self::UnresolvedDependency { functional, value } => {
                write!(
                    f,
                    "Did not find any functional which would supply '{}' (required by '{}').",
                    value, functional
                )
            }
            Self::CyclicDependency => write!(f, "Cyclic dependency detected."),
            Self::UnknownParameter(name) => write!(f, "Parameter '{}' has not been declared.", name),
        }
    }
}

impl Error for DependencyError {}
