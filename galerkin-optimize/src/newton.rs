use crate::calculus::{DifferentiableVectorFunction, VectorFunction};
use galerkin_traits::Real;
use log::debug;
use nalgebra::{DVectorView, DVectorViewMut, Scalar};
use numeric_literals::replace_float_literals;
use std::error::Error;
use std::fmt;
use std::fmt::Display;

/// Convergence criteria for Newton's method.
///
/// The iteration stops once `|F(x)| <= tolerance`, or, when a relative tolerance is given, once
/// `|F(x)| <= relative_tolerance * |F(x_0)|`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NewtonSettings<T> {
    pub max_iterations: Option<usize>,
    pub tolerance: T,
    pub relative_tolerance: Option<T>,
}

impl<T: Real> NewtonSettings<T> {
    pub fn with_tolerance(tolerance: T) -> Self {
        Self {
            max_iterations: None,
            tolerance,
            relative_tolerance: None,
        }
    }

    pub fn max_iterations(self, max_iterations: usize) -> Self {
        Self {
            max_iterations: Some(max_iterations),
            ..self
        }
    }

    fn is_converged(&self, residual_norm: T, initial_norm: T) -> bool {
        residual_norm <= self.tolerance
            || self
                .relative_tolerance
                .map(|rtol| residual_norm <= rtol * initial_norm)
                .unwrap_or(false)
    }
}

/// Outcome of a converged Newton iteration.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NewtonReport<T> {
    pub iterations: usize,
    pub residual_norm: T,
}

#[derive(Debug)]
pub enum NewtonError {
    /// No convergence within the given number of iterations.
    MaximumIterationsReached(usize),
    /// Evaluating `F` failed.
    FunctionError(Box<dyn Error>),
    /// Solving `J dx = -F` failed.
    JacobianError(Box<dyn Error>),
    /// The line search could not find an acceptable step.
    LineSearchError(Box<dyn Error>),
}

impl Display for NewtonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaximumIterationsReached(iterations) => {
                write!(f, "Newton's method did not converge in {} iterations.", iterations)
            }
            Self::FunctionError(err) => write!(f, "Function evaluation failed: {}", err),
            Self::JacobianError(err) => write!(f, "Jacobian solve failed: {}", err),
            Self::LineSearchError(err) => write!(f, "Line search failed: {}", err),
        }
    }
}

impl Error for NewtonError {}

/// Solves `F(x) = 0` with full Newton steps, starting from the given `x`.
///
/// `f` and `dx` are work vectors of the same length as `x`. On return `f` holds `F(x)`.
pub fn newton<'a, T, F>(
    function: F,
    x: impl Into<DVectorViewMut<'a, T>>,
    f: impl Into<DVectorViewMut<'a, T>>,
    dx: impl Into<DVectorViewMut<'a, T>>,
    settings: NewtonSettings<T>,
) -> Result<NewtonReport<T>, NewtonError>
where
    T: Real,
    F: DifferentiableVectorFunction<T>,
{
    newton_line_search(function, x, f, dx, settings, &mut NoLineSearch)
}

/// Same as [`newton`], but each update is taken along the Newton direction by `line_search`.
pub fn newton_line_search<'a, T, F>(
    mut function: F,
    x: impl Into<DVectorViewMut<'a, T>>,
    f: impl Into<DVectorViewMut<'a, T>>,
    dx: impl Into<DVectorViewMut<'a, T>>,
    settings: NewtonSettings<T>,
    line_search: &mut impl LineSearch<T, F>,
) -> Result<NewtonReport<T>, NewtonError>
where
    T: Real,
    F: DifferentiableVectorFunction<T>,
{
    let mut x = x.into();
    let mut f = f.into();
    let mut direction = dx.into();
    assert_eq!(x.nrows(), f.nrows(), "x and f must have the same length");
    assert_eq!(direction.nrows(), f.nrows(), "dx and f must have the same length");

    function
        .eval_into(&mut f, &DVectorView::from(&x))
        .map_err(NewtonError::FunctionError)?;
    let initial_norm = f.norm();
    let mut residual_norm = initial_norm;
    debug!("Newton iteration 0: |F| = {}", residual_norm);

    let mut iterations = 0;
    while !settings.is_converged(residual_norm, initial_norm) {
        if settings.max_iterations == Some(iterations) {
            return Err(NewtonError::MaximumIterationsReached(iterations));
        }

        function
            .solve_jacobian_system(&mut direction, &DVectorView::from(&x), &DVectorView::from(&f))
            .map_err(NewtonError::JacobianError)?;
        // J d = F, so the descent direction is -d
        direction.neg_mut();

        let alpha = line_search
            .step(
                &mut function,
                DVectorViewMut::from(&mut f),
                DVectorViewMut::from(&mut x),
                DVectorView::from(&direction),
            )
            .map_err(NewtonError::LineSearchError)?;
        iterations += 1;
        residual_norm = f.norm();
        debug!("Newton iteration {}: alpha = {}, |F| = {}", iterations, alpha, residual_norm);
    }

    Ok(NewtonReport {
        iterations,
        residual_norm,
    })
}

/// Moves `x` along `direction` and leaves `F` at the new point in `f`. Returns the step length.
pub trait LineSearch<T: Scalar, F: VectorFunction<T>> {
    fn step(
        &mut self,
        function: &mut F,
        f: DVectorViewMut<T>,
        x: DVectorViewMut<T>,
        direction: DVectorView<T>,
    ) -> Result<T, Box<dyn Error>>;
}

/// Always takes the full step.
#[derive(Clone, Debug)]
pub struct NoLineSearch;

impl<T, F> LineSearch<T, F> for NoLineSearch
where
    T: Real,
    F: VectorFunction<T>,
{
    fn step(
        &mut self,
        function: &mut F,
        mut f: DVectorViewMut<T>,
        mut x: DVectorViewMut<T>,
        direction: DVectorView<T>,
    ) -> Result<T, Box<dyn Error>> {
        x.axpy(T::one(), &direction, T::one());
        function.eval_into(&mut f, &DVectorView::from(&x))?;
        Ok(T::one())
    }
}

/// Backtracking on the merit function `g(x) = |F(x)|^2 / 2`.
///
/// A step `alpha` is accepted when `g(x + alpha p) <= (1 - c alpha) g(x)`, which is the Armijo
/// condition for an exact Newton direction `p`. Rejected steps are multiplied by `contraction`.
#[derive(Clone, Debug)]
pub struct BacktrackingLineSearch {
    pub sufficient_decrease: f64,
    pub contraction: f64,
    pub min_step: f64,
}

impl Default for BacktrackingLineSearch {
    fn default() -> Self {
        Self {
            sufficient_decrease: 1e-4,
            contraction: 0.5,
            min_step: 1e-6,
        }
    }
}

impl<T, F> LineSearch<T, F> for BacktrackingLineSearch
where
    T: Real,
    F: VectorFunction<T>,
{
    #[replace_float_literals(T::from_constant(literal))]
    fn step(
        &mut self,
        function: &mut F,
        mut f: DVectorViewMut<T>,
        mut x: DVectorViewMut<T>,
        direction: DVectorView<T>,
    ) -> Result<T, Box<dyn Error>> {
        let c = T::from_constant(self.sufficient_decrease);
        let contraction = T::from_constant(self.contraction);
        let min_step = T::from_constant(self.min_step);
        let merit_initial = 0.5 * f.norm_squared();

        let mut taken = 0.0;
        let mut alpha = 1.0;
        loop {
            // x currently sits at x_0 + taken * p
            x.axpy(alpha - taken, &direction, T::one());
            taken = alpha;
            function.eval_into(&mut f, &DVectorView::from(&x))?;

            let merit = 0.5 * f.norm_squared();
            if merit <= (1.0 - c * alpha) * merit_initial {
                return Ok(alpha);
            }
            if alpha < min_step {
                return Err(Box::from(format!(
                    "step length {} fell below the minimum {} without sufficient decrease",
                    alpha, min_step
                )));
            }
            alpha *= contraction;
        }
    }
}
