use eyre::eyre;
use galerkin_optimize::calculus::{DifferentiableVectorFunction, VectorFunction};
use galerkin_optimize::newton::{newton_line_search, BacktrackingLineSearch, NewtonSettings, NoLineSearch};
use galerkin_traits::Real;
use log::info;
use nalgebra::{DMatrix, DVector, DVectorView, DVectorViewMut};
use nalgebra_sparse::CsrMatrix;
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};
use std::error::Error;

/// A system of nonlinear equations `F(x) = 0` with a sparse Jacobian.
pub trait NonlinearProblem<T: Real> {
    /// Number of unknowns.
    fn dimension(&self) -> usize;

    fn initial_guess(&mut self, x: &mut DVector<T>) -> eyre::Result<()>;

    fn compute_residual(&mut self, x: &DVector<T>, f: &mut DVector<T>) -> eyre::Result<()>;

    fn compute_jacobian(&mut self, x: &DVector<T>) -> eyre::Result<CsrMatrix<T>>;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineSearchKind {
    /// Full Newton steps.
    None,
    Backtracking,
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonlinearSolverSettings<T> {
    pub max_iterations: Option<usize>,
    /// Absolute tolerance on the Euclidean norm of the residual.
    pub tolerance: T,
    pub line_search: LineSearchKind,
}

impl<T: Real> Default for NonlinearSolverSettings<T> {
    #[replace_float_literals(T::from_constant(literal))]
    fn default() -> Self {
        Self {
            max_iterations: Some(50),
            tolerance: 1e-10,
            line_search: LineSearchKind::None,
        }
    }
}

impl<T: Copy> From<&NonlinearSolverSettings<T>> for NewtonSettings<T> {
    fn from(settings: &NonlinearSolverSettings<T>) -> Self {
        NewtonSettings {
            max_iterations: settings.max_iterations,
            tolerance: settings.tolerance,
            relative_tolerance: None,
        }
    }
}

/// Presents a [`NonlinearProblem`] to Newton's method, solving the Jacobian systems with a dense
/// LU factorization.
struct NewtonAdapter<'a, T: Real, P> {
    problem: &'a mut P,
    x: DVector<T>,
    f: DVector<T>,
}

impl<'a, T: Real, P: NonlinearProblem<T>> VectorFunction<T> for NewtonAdapter<'a, T, P> {
    fn dimension(&self) -> usize {
        self.problem.dimension()
    }

    fn eval_into(&mut self, f: &mut DVectorViewMut<T>, x: &DVectorView<T>) -> Result<(), Box<dyn Error>> {
        self.x.copy_from(x);
        self.problem
            .compute_residual(&self.x, &mut self.f)
            .map_err(|err| Box::<dyn Error>::from(format!("{:#}", err)))?;
        f.copy_from(&self.f);
        Ok(())
    }
}

impl<'a, T: Real, P: NonlinearProblem<T>> DifferentiableVectorFunction<T> for NewtonAdapter<'a, T, P> {
    fn solve_jacobian_system(
        &mut self,
        sol: &mut DVectorViewMut<T>,
        x: &DVectorView<T>,
        rhs: &DVectorView<T>,
    ) -> Result<(), Box<dyn Error>> {
        self.x.copy_from(x);
        let jacobian = self
            .problem
            .compute_jacobian(&self.x)
            .map_err(|err| Box::<dyn Error>::from(format!("{:#}", err)))?;
        let solution = DMatrix::from(&jacobian)
            .lu()
            .solve(rhs)
            .ok_or_else(|| Box::<dyn Error>::from("Jacobian is singular."))?;
        sol.copy_from(&solution);
        Ok(())
    }
}

/// Solves a [`NonlinearProblem`] with Newton's method.
///
/// After a successful solve, the solution and the Jacobian evaluated at it are kept.
#[derive(Debug, Clone)]
pub struct NonlinearSolver<T: Real> {
    settings: NonlinearSolverSettings<T>,
    solution: DVector<T>,
    jacobian: Option<CsrMatrix<T>>,
    num_iterations: usize,
}

impl<T: Real> Default for NonlinearSolver<T> {
    fn default() -> Self {
        Self::new(NonlinearSolverSettings::default())
    }
}

impl<T: Real> NonlinearSolver<T> {
    pub fn new(settings: NonlinearSolverSettings<T>) -> Self {
        Self {
            settings,
            solution: DVector::zeros(0),
            jacobian: None,
            num_iterations: 0,
        }
    }

    pub fn settings(&self) -> &NonlinearSolverSettings<T> {
        &self.settings
    }

    /// Solves `problem` starting from its initial guess and returns the number of iterations.
    pub fn solve<P: NonlinearProblem<T>>(&mut self, problem: &mut P) -> eyre::Result<usize> {
        let n = problem.dimension();
        let mut x = DVector::zeros(n);
        problem.initial_guess(&mut x)?;
        let mut f = DVector::zeros(n);
        let mut dx = DVector::zeros(n);

        let settings = NewtonSettings::from(&self.settings);
        let mut adapter = NewtonAdapter {
            problem: &mut *problem,
            x: DVector::zeros(n),
            f: DVector::zeros(n),
        };
        let result = match self.settings.line_search {
            LineSearchKind::None => newton_line_search(&mut adapter, &mut x, &mut f, &mut dx, settings, &mut NoLineSearch),
            LineSearchKind::Backtracking => newton_line_search(
                &mut adapter,
                &mut x,
                &mut f,
                &mut dx,
                settings,
                &mut BacktrackingLineSearch::default(),
            ),
        };
        let report = result.map_err(|err| eyre!("Nonlinear solve failed: {}", err))?;
        let iterations = report.iterations;
        info!(
            "Nonlinear solve converged in {} iterations, |F| = {}",
            iterations, report.residual_norm
        );

        self.jacobian = Some(problem.compute_jacobian(&x)?);
        self.solution = x;
        self.num_iterations = iterations;
        Ok(iterations)
    }

    pub fn solution(&self) -> &DVector<T> {
        &self.solution
    }

    /// Jacobian at the solution of the last successful solve.
    pub fn jacobian(&self) -> Option<&CsrMatrix<T>> {
        self.jacobian.as_ref()
    }

    pub fn num_iterations(&self) -> usize {
        self.num_iterations
    }
}
