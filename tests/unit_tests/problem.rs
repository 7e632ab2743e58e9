use eyre::eyre;
use galerkin::assembly::AssemblyData;
use galerkin::dependency::ValueStore;
use galerkin::fe::ElementType;
use galerkin::mesh::procedural::{line_mesh, rectangle_mesh};
use galerkin::mesh::Mesh;
use galerkin::nalgebra::{DMatrix, DVector};
use galerkin::nalgebra_sparse::{CooMatrix, CsrMatrix};
use galerkin::problem::{
    AuxFunction, DirichletBC, FENonlinearProblem, FEProblemInterface, InitialCondition, LineSearchKind,
    NonlinearProblem, NonlinearSolver, NonlinearSolverSettings,
};
use galerkin::weak_form::{JacobianType, Key};
use matrixcompare::assert_matrix_eq;
use util::assert_approx_slice_eq;

/// `F(x) = (x0^2 - 4, x1 - 3)`.
struct Quadratic;

impl NonlinearProblem<f64> for Quadratic {
    fn dimension(&self) -> usize {
        2
    }

    fn initial_guess(&mut self, x: &mut DVector<f64>) -> eyre::Result<()> {
        x.fill(1.0);
        Ok(())
    }

    fn compute_residual(&mut self, x: &DVector<f64>, f: &mut DVector<f64>) -> eyre::Result<()> {
        f[0] = x[0] * x[0] - 4.0;
        f[1] = x[1] - 3.0;
        Ok(())
    }

    fn compute_jacobian(&mut self, x: &DVector<f64>) -> eyre::Result<CsrMatrix<f64>> {
        let mut coo = CooMatrix::new(2, 2);
        coo.push(0, 0, 2.0 * x[0]);
        coo.push(1, 1, 1.0);
        Ok(CsrMatrix::from(&coo))
    }
}

#[test]
fn solver_converges_on_small_system() -> eyre::Result<()> {
    for line_search in [LineSearchKind::None, LineSearchKind::Backtracking] {
        let settings = NonlinearSolverSettings {
            line_search,
            ..NonlinearSolverSettings::default()
        };
        let mut solver = NonlinearSolver::new(settings);
        let iterations = solver.solve(&mut Quadratic)?;
        assert!(iterations > 1);
        assert_eq!(solver.num_iterations(), iterations);
        assert_approx_slice_eq!(solver.solution().as_slice(), [2.0, 3.0], abstol = 1e-9);
        let jacobian = solver.jacobian().ok_or_else(|| eyre!("missing Jacobian"))?;
        assert_matrix_eq!(
            DMatrix::from(jacobian),
            DMatrix::from_diagonal(&DVector::from_column_slice(&[4.0, 1.0])),
            comp = abs,
            tol = 1e-8
        );
    }
    Ok(())
}

#[test]
fn solver_reports_iteration_limit() {
    let settings = NonlinearSolverSettings {
        max_iterations: Some(1),
        ..NonlinearSolverSettings::default()
    };
    let err = NonlinearSolver::new(settings)
        .solve(&mut Quadratic)
        .unwrap_err();
    assert!(err.to_string().contains("did not converge in 1 iterations"));
}

/// `F(x) = x - (2, 3)`.
struct Shifted;

impl NonlinearProblem<f64> for Shifted {
    fn dimension(&self) -> usize {
        2
    }

    fn initial_guess(&mut self, x: &mut DVector<f64>) -> eyre::Result<()> {
        x.fill(0.0);
        Ok(())
    }

    fn compute_residual(&mut self, x: &DVector<f64>, f: &mut DVector<f64>) -> eyre::Result<()> {
        f[0] = x[0] - 2.0;
        f[1] = x[1] - 3.0;
        Ok(())
    }

    fn compute_jacobian(&mut self, _: &DVector<f64>) -> eyre::Result<CsrMatrix<f64>> {
        Ok(CsrMatrix::identity(2))
    }
}

#[test]
fn solver_solves_linear_system_in_one_step() -> eyre::Result<()> {
    let mut solver = NonlinearSolver::default();
    let iterations = solver.solve(&mut Shifted)?;
    assert_eq!(iterations, 1);
    assert_eq!(solver.solution().as_slice(), &[2.0, 3.0]);
    let jacobian = solver.jacobian().ok_or_else(|| eyre!("missing Jacobian"))?;
    assert_eq!(DMatrix::from(jacobian), DMatrix::identity(2, 2));
    Ok(())
}

#[test]
fn solver_settings_serialize() {
    let settings = NonlinearSolverSettings {
        max_iterations: None,
        tolerance: 1e-6,
        line_search: LineSearchKind::Backtracking,
    };
    let json = serde_json::to_string(&settings).unwrap();
    let parsed: NonlinearSolverSettings<f64> = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, settings);
}

/// `-div(k grad u) = source` with `k = 1 + coefficient * u^2` computed by a value functional.
fn diffusion(mesh: Mesh<f64>, source: f64, coefficient: f64) -> eyre::Result<FENonlinearProblem<f64>> {
    let mut problem = FENonlinearProblem::new(mesh, 2);
    let fep = problem.fe_problem_mut();
    fep.add_field(0, "u", 1, 1)?;
    fep.create()?;
    let dim = fep.dimension();

    fep.create_functional("diffusivity", "", |ctx| {
        let u = ctx.field_value("u")?;
        let k = ctx.declare_value::<f64>("k")?;
        let dk = ctx.declare_value::<f64>("dk_du")?;
        Ok(move |asmbl: &AssemblyData<f64>, values: &mut ValueStore| {
            let u = u.at(asmbl, 0);
            values.set(k, 1.0 + coefficient * u * u);
            values.set(dk, 2.0 * coefficient * u);
        })
    })?;

    let f0 = fep.residual_functional("source", "", |_| {
        Ok(move |_: &AssemblyData<f64>, _: &ValueStore, f: &mut [f64]| f[0] = -source)
    })?;
    let f1 = fep.residual_functional("flux", "", |ctx| {
        let grad = ctx.field_gradient("u")?;
        let k = ctx.get_value::<f64>("k")?;
        Ok(move |asmbl: &AssemblyData<f64>, values: &ValueStore, f: &mut [f64]| {
            let k = *values.get(k);
            for (f, g) in f.iter_mut().zip(grad.get(asmbl)) {
                *f = k * g;
            }
        })
    })?;
    fep.add_residual_block(0, Some(f0), Some(f1), "")?;

    let g2 = fep.jacobian_functional("flux_du", "", |ctx| {
        let grad = ctx.field_gradient("u")?;
        let dk = ctx.get_value::<f64>("dk_du")?;
        Ok(move |asmbl: &AssemblyData<f64>, values: &ValueStore, g: &mut [f64]| {
            let dk = *values.get(dk);
            for (g, grad) in g.iter_mut().zip(grad.get(asmbl)) {
                *g = dk * grad;
            }
        })
    })?;
    let g3 = fep.jacobian_functional("flux_dgrad", "", |ctx| {
        let k = ctx.get_value::<f64>("k")?;
        Ok(move |_: &AssemblyData<f64>, values: &ValueStore, g: &mut [f64]| {
            let k = *values.get(k);
            for d in 0..dim {
                g[d * dim + d] = k;
            }
        })
    })?;
    fep.add_jacobian_block(0, 0, None, None, Some(g2), Some(g3), "")?;
    Ok(problem)
}

/// Central differences of the residual around `x`.
fn finite_difference_jacobian(problem: &mut impl NonlinearProblem<f64>, x: &DVector<f64>) -> eyre::Result<DMatrix<f64>> {
    let n = x.len();
    let h = 1e-6;
    let mut fd = DMatrix::zeros(n, n);
    let (mut f_plus, mut f_minus) = (DVector::zeros(n), DVector::zeros(n));
    for j in 0..n {
        let mut x_plus = x.clone();
        let mut x_minus = x.clone();
        x_plus[j] += h;
        x_minus[j] -= h;
        problem.compute_residual(&x_plus, &mut f_plus)?;
        problem.compute_residual(&x_minus, &mut f_minus)?;
        fd.set_column(j, &((&f_plus - &f_minus) / (2.0 * h)));
    }
    Ok(fd)
}

fn solve(problem: &mut FENonlinearProblem<f64>) -> eyre::Result<Vec<f64>> {
    let mut solver = NonlinearSolver::default();
    solver.solve(problem)?;
    problem.vertex_values(solver.solution())
}

#[test]
fn poisson_in_one_dimension_is_nodally_exact() -> eyre::Result<()> {
    // -u'' = -2 with u = x^2 on the boundary
    let mut problem = diffusion(line_mesh(0.0, 1.0, 2), -2.0, 0.0)?;
    problem.add_boundary_condition(DirichletBC::new("marker", 0, &[0], |_, x: &[f64], u: &mut [f64]| {
        u[0] = x[0] * x[0]
    }));
    problem.set_up()?;
    assert_eq!(problem.dimension(), 1);

    let key = Key::for_region("", 0);
    let diffusivity = problem
        .fe_problem()
        .evaluator()
        .functional_id("diffusivity")
        .ok_or_else(|| eyre!("functional not registered"))?;
    assert_eq!(problem.fe_problem().sorted_residual_functionals(&key), &[diffusivity]);
    assert_eq!(problem.fe_problem().sorted_jacobian_functionals(&key), &[diffusivity]);

    let u = solve(&mut problem)?;
    assert_approx_slice_eq!(u, [0.0, 0.25, 1.0], abstol = 1e-12);
    Ok(())
}

#[test]
fn linear_solutions_pass_the_patch_test() -> eyre::Result<()> {
    let exact = |x: &[f64]| 1.0 + x[0] - 2.0 * x[1];
    for element in [ElementType::Quad4, ElementType::Tri3] {
        let mesh = rectangle_mesh(element, (0.0, 2.0), (-1.0, 1.0), 3, 2);
        let vertices: Vec<f64> = (0..mesh.num_vertices())
            .map(|v| exact(mesh.vertex(v)))
            .collect();
        let mut problem = diffusion(mesh, 0.0, 0.0)?;
        problem.add_boundary_condition(DirichletBC::new("marker", 0, &[0], move |_, x: &[f64], u: &mut [f64]| {
            u[0] = exact(x)
        }));
        problem.set_up()?;
        assert_eq!(problem.dimension(), 2);
        let u = solve(&mut problem)?;
        assert_approx_slice_eq!(u, vertices, abstol = 1e-10);
    }
    Ok(())
}

#[test]
fn jacobian_matches_finite_differences() -> eyre::Result<()> {
    let mesh = rectangle_mesh(ElementType::Tri3, (0.0, 1.0), (0.0, 1.0), 3, 3);
    let mut problem = diffusion(mesh, 1.0, 0.5)?;
    problem.add_boundary_condition(DirichletBC::new("left", 0, &[0], |_, x: &[f64], u: &mut [f64]| {
        u[0] = x[1]
    }));
    problem.set_up()?;

    let n = problem.dimension();
    assert_eq!(n, 12);
    let x = DVector::from_fn(n, |i, _| 0.1 * (i as f64) - 0.3);
    let jacobian = DMatrix::from(&problem.compute_jacobian(&x)?);
    let fd = finite_difference_jacobian(&mut problem, &x)?;
    assert_matrix_eq!(jacobian, fd, comp = abs, tol = 1e-6);

    // And the nonlinear problem actually solves
    let mut solver = NonlinearSolver::default();
    solver.solve(&mut problem)?;
    assert!(solver.num_iterations() > 1);
    let mut f = DVector::zeros(n);
    problem.compute_residual(solver.solution(), &mut f)?;
    assert!(f.norm() <= 1e-10);
    Ok(())
}

#[test]
fn boundary_residual_integrates_over_facets() -> eyre::Result<()> {
    let mesh = rectangle_mesh(ElementType::Quad4, (0.0, 2.0), (0.0, 1.0), 2, 1);
    let mut problem = FENonlinearProblem::new(mesh, 2);
    let fep = problem.fe_problem_mut();
    fep.add_field(0, "u", 1, 1)?;
    fep.add_aux_field(0, "g", 1, 1)?;
    fep.create()?;
    // g * (n . e_y), which is g on the top boundary
    let flux = fep.residual_functional("flux", "top", |ctx| {
        let g = ctx.aux_field_value("g")?;
        let normal = ctx.normal();
        Ok(move |asmbl: &AssemblyData<f64>, _: &ValueStore, f: &mut [f64]| {
            f[0] = g.at(asmbl, 0) * normal.at(asmbl, 1)
        })
    })?;
    fep.add_boundary_residual_block(0, Some(flux), None, "top")?;
    problem.set_aux_function(AuxFunction::new(0, |t, x: &[f64], g: &mut [f64]| g[0] = x[0] * (1.0 + t)));
    problem.set_up()?;

    let x = DVector::zeros(problem.dimension());
    let mut f = DVector::zeros(problem.dimension());
    problem.compute_residual(&x, &mut f)?;
    // Vertices 3, 4 and 5 lie on the top edge at x = 0, 1, 2
    assert_approx_slice_eq!(
        f.as_slice(),
        [0.0, 0.0, 0.0, 1.0 / 6.0, 1.0, 5.0 / 6.0],
        abstol = 1e-12
    );

    // Auxiliary values follow the time
    problem.set_time(1.0)?;
    problem.compute_residual(&x, &mut f)?;
    assert!((f.sum() - 4.0).abs() < 1e-12);
    Ok(())
}

#[test]
fn dynamic_jacobian_is_shifted_mass() -> eyre::Result<()> {
    let mut problem = FENonlinearProblem::new(line_mesh(0.0, 3.0, 1), 2);
    let fep = problem.fe_problem_mut();
    fep.add_field(0, "u", 1, 1)?;
    fep.create()?;
    let dot = fep.residual_functional("dot", "", |ctx| {
        let u_t = ctx.field_dot("u")?;
        Ok(move |asmbl: &AssemblyData<f64>, _: &ValueStore, f: &mut [f64]| f[0] = u_t.at(asmbl, 0))
    })?;
    fep.add_residual_block(0, Some(dot), None, "")?;
    let shift = fep.jacobian_functional("shift", "", |_| {
        Ok(|asmbl: &AssemblyData<f64>, _: &ValueStore, g: &mut [f64]| g[0] = *asmbl.u_t_shift())
    })?;
    fep.add_jacobian_dynamic_block(0, 0, Some(shift), None, None, None, "")?;
    problem.add_initial_condition(InitialCondition::new(0, |x: &[f64], u: &mut [f64]| u[0] = x[0]));
    problem.set_up()?;
    problem.set_u_t_shift(2.0);

    let mut x = DVector::zeros(problem.dimension());
    problem.initial_guess(&mut x)?;
    assert_approx_slice_eq!(x.as_slice(), [0.0, 3.0], abstol = 1e-14);

    let mass = DMatrix::from(&problem.assemble_jacobian(JacobianType::Dynamic, &x)?);
    let expected = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 2.0]);
    assert_matrix_eq!(mass, expected, comp = abs, tol = 1e-12);

    // Only dynamic blocks are registered
    let jacobian = problem.assemble_jacobian(JacobianType::Jacobian, &x)?;
    assert_eq!(jacobian.nnz(), 0);
    assert_eq!(problem.assemble_jacobian(JacobianType::Preconditioner, &x)?.nnz(), 0);

    // Without a time derivative the rate is zero
    let mut f = DVector::zeros(2);
    problem.compute_residual(&x, &mut f)?;
    assert_approx_slice_eq!(f.as_slice(), [0.0, 0.0], abstol = 1e-14);

    // u_t = 1 + x / 3 integrates against the hat functions on [0, 3]
    problem.set_time_derivative(&DVector::from_column_slice(&[1.0, 2.0]))?;
    problem.compute_residual(&x, &mut f)?;
    assert_approx_slice_eq!(f.as_slice(), [2.0, 2.5], abstol = 1e-12);
    assert!(problem.set_time_derivative(&DVector::zeros(3)).is_err());
    Ok(())
}

#[test]
fn field_bookkeeping() -> eyre::Result<()> {
    let mut fep = FEProblemInterface::<f64>::new(ElementType::Tri3, 2);
    assert!(fep.create().is_err());
    assert!(fep
        .residual_functional("early", "", |_| {
            Ok(|_: &AssemblyData<f64>, _: &ValueStore, _: &mut [f64]| {})
        })
        .is_err());

    fep.add_field(1, "disp", 2, 1)?;
    fep.add_field(0, "p", 1, 1)?;
    assert!(fep.add_field(1, "other", 1, 1).is_err());
    let err = fep.add_field(2, "quadratic", 1, 2).unwrap_err();
    assert!(err.to_string().contains("only first order"));

    assert_eq!(fep.get_num_fields(), 2);
    assert_eq!(fep.get_field_names(), vec!["p".to_string(), "disp".to_string()]);
    assert_eq!(fep.get_field_id("disp")?, 1);
    assert_eq!(fep.get_field_name(0)?, "p");
    assert!(fep.get_field_id("nope").is_err());
    assert!(fep.has_field_by_name("p") && !fep.has_field_by_id(7));
    assert_eq!(fep.get_field_num_components(1)?, 2);
    assert_eq!(fep.get_field_order(1)?, 1);

    assert_eq!(fep.get_field_component_name(1, 1)?, "1");
    fep.set_field_component_name(1, 1, "y")?;
    assert_eq!(fep.get_field_component_name(1, 1)?, "y");
    assert_eq!(fep.get_field_component_name(0, 0)?, "");
    assert!(fep.set_field_component_name(0, 0, "x").is_err());

    fep.set_field(0, "pressure", 1, 1)?;
    assert!(!fep.has_field_by_name("p"));
    assert_eq!(fep.get_field_id("pressure")?, 0);

    fep.add_aux_field(0, "k", 1, 1)?;
    assert_eq!(fep.get_num_aux_fields(), 1);
    assert_eq!(fep.get_aux_field_id("k")?, 0);

    fep.create()?;
    assert!(fep.add_field(5, "late", 1, 1).is_err());
    assert_eq!(fep.discrete_system()?.total_dimension(), 9);
    // Closure order is by field id: pressure first
    assert_eq!(fep.discrete_system()?.field_offset(1), 3);
    Ok(())
}

#[test]
fn jet_degrees_apply_to_primary_fields_only() -> eyre::Result<()> {
    let mut fep = FEProblemInterface::<f64>::new(ElementType::Quad4, 2);
    fep.add_field(0, "u", 1, 1)?;
    fep.add_aux_field(0, "k", 1, 1)?;
    assert!(fep.set_jet_degree(0, 3).is_err());
    fep.set_jet_degree(0, 2)?;
    fep.create()?;

    assert_eq!(fep.discrete_system()?.jet_degree(0), 2);
    assert!(fep.discrete_system()?.has_hessians());
    let aux_ds = fep.aux_discrete_system().ok_or_else(|| eyre!("missing aux system"))?;
    assert_eq!(aux_ds.jet_degree(0), 1);
    assert!(!aux_ds.has_hessians());
    Ok(())
}

#[test]
fn block_restricted_fields_live_on_their_region() -> eyre::Result<()> {
    // Vertices at x = 0, 1, 2; "right" is the second cell
    let mut mesh = line_mesh(0.0, 2.0, 2);
    mesh.add_region("right", vec![1]);
    let mut problem = FENonlinearProblem::new(mesh, 2);
    let fep = problem.fe_problem_mut();
    fep.add_field(0, "u", 1, 1)?;
    fep.add_block_field(1, "p", 1, 1, "right")?;
    fep.create()?;
    assert_eq!(fep.get_field_block(1)?, Some("right"));
    assert_eq!(fep.get_field_block(0)?, None);

    for (id, name, target) in [(0, "u", 1.0), (1, "p", 2.0)] {
        let f0 = fep.residual_functional(&format!("{}_mass", name), "", |ctx| {
            let value = ctx.field_value(name)?;
            Ok(move |asmbl: &AssemblyData<f64>, _: &ValueStore, f: &mut [f64]| f[0] = value.at(asmbl, 0) - target)
        })?;
        fep.add_residual_block(id, Some(f0), None, "")?;
        let g0 = fep.jacobian_functional(&format!("{}_mass_du", name), "", |_| {
            Ok(|_: &AssemblyData<f64>, _: &ValueStore, g: &mut [f64]| g[0] = 1.0)
        })?;
        fep.add_jacobian_block(id, id, Some(g0), None, None, None, "")?;
    }
    // Boundary conditions do not reach outside the block
    problem.add_boundary_condition(DirichletBC::new("left", 1, &[0], |_, _: &[f64], p: &mut [f64]| p[0] = 5.0));
    problem.set_up()?;
    assert_eq!(problem.dimension(), 5);

    let x = DVector::from_element(5, 0.5);
    let mut f = DVector::zeros(5);
    problem.compute_residual(&x, &mut f)?;
    // Global order: u0, u1, p1, u2, p2. The p rows only see the second cell
    assert_approx_slice_eq!(f.as_slice(), [-0.25, -0.5, -0.75, -0.25, -0.75], abstol = 1e-12);
    let jacobian = DMatrix::from(&problem.compute_jacobian(&x)?);
    assert_matrix_eq!(jacobian, finite_difference_jacobian(&mut problem, &x)?, comp = abs, tol = 1e-8);

    // Local order: u0, p0, u1, p1, u2, p2
    let values = solve(&mut problem)?;
    assert_approx_slice_eq!(values, [1.0, 0.0, 1.0, 2.0, 1.0, 2.0], abstol = 1e-12);

    let mut problem = FENonlinearProblem::<f64>::new(line_mesh(0.0, 2.0, 2), 2);
    let fep = problem.fe_problem_mut();
    fep.add_block_field(0, "p", 1, 1, "nowhere")?;
    fep.create()?;
    assert!(problem.set_up().is_err());
    Ok(())
}

#[test]
fn parameters_are_set_between_assemblies() -> eyre::Result<()> {
    // Cells of length 1/2, the first one forms "left_cell"
    let mut mesh = line_mesh(0.0, 1.0, 2);
    mesh.add_region("left_cell", vec![0]);
    let mut problem = FENonlinearProblem::new(mesh, 2);
    let fep = problem.fe_problem_mut();
    fep.add_field(0, "u", 1, 1)?;
    fep.create()?;
    let kappa = fep.declare_parameter::<f64>("kappa", 2.0)?;
    assert!(fep.declare_parameter::<f64>("kappa", 1.0).is_err());

    let source = fep.residual_functional("uses_kappa", "", |ctx| {
        let kappa = ctx.get_value::<f64>("kappa")?;
        Ok(move |_: &AssemblyData<f64>, values: &ValueStore, f: &mut [f64]| f[0] = -*values.get(kappa))
    })?;
    fep.add_residual_block(0, Some(source), None, "")?;
    // Region-restricted functionals reach parameters by their plain name
    let left = fep.residual_functional("uses_kappa_left", "left_cell", |ctx| {
        let kappa = ctx.get_parameter::<f64>("kappa")?;
        Ok(move |_: &AssemblyData<f64>, values: &ValueStore, f: &mut [f64]| f[0] = -*values.get(kappa))
    })?;
    fep.add_residual_block(0, Some(left), None, "left_cell")?;
    assert!(fep
        .residual_functional("uses_lambda", "", |ctx| {
            ctx.get_parameter::<f64>("lambda")?;
            Ok(|_: &AssemblyData<f64>, _: &ValueStore, _: &mut [f64]| {})
        })
        .is_err());
    problem.set_up()?;

    let x = DVector::zeros(3);
    let mut f = DVector::zeros(3);
    problem.compute_residual(&x, &mut f)?;
    assert_approx_slice_eq!(f.as_slice(), [-1.0, -1.5, -0.5], abstol = 1e-12);

    problem.fe_problem_mut().set_parameter(kappa, 4.0);
    assert_eq!(*problem.fe_problem().parameter(kappa), 4.0);
    problem.compute_residual(&x, &mut f)?;
    assert_approx_slice_eq!(f.as_slice(), [-2.0, -3.0, -1.0], abstol = 1e-12);
    Ok(())
}

#[test]
fn missing_suppliers_fail_set_up() -> eyre::Result<()> {
    let mut problem = FENonlinearProblem::new(line_mesh(0.0, 1.0, 2), 1);
    let fep = problem.fe_problem_mut();
    fep.add_field(0, "u", 1, 1)?;
    fep.create()?;
    let f0 = fep.residual_functional("reads_density", "", |ctx| {
        let rho = ctx.get_value::<f64>("density")?;
        Ok(move |_: &AssemblyData<f64>, values: &ValueStore, f: &mut [f64]| f[0] = *values.get(rho))
    })?;
    fep.add_residual_block(0, Some(f0), None, "")?;
    let err = problem.set_up().unwrap_err();
    assert!(format!("{:#}", err).contains("'density'"));
    Ok(())
}

#[test]
fn boundary_conditions_are_validated() -> eyre::Result<()> {
    let mut problem = diffusion(line_mesh(0.0, 1.0, 2), 0.0, 0.0)?;
    problem.add_boundary_condition(DirichletBC::new("left", 0, &[1], |_, _: &[f64], u: &mut [f64]| u[0] = 0.0));
    assert!(problem.set_up().is_err());

    let mut problem = diffusion(line_mesh(0.0, 1.0, 2), 0.0, 0.0)?;
    problem.add_boundary_condition(DirichletBC::new("nowhere", 0, &[0], |_, _: &[f64], u: &mut [f64]| u[0] = 0.0));
    assert!(problem.set_up().is_err());
    Ok(())
}

#[test]
fn preconditioner_blocks_assemble_separately() -> eyre::Result<()> {
    let mesh = || rectangle_mesh(ElementType::Quad4, (0.0, 1.0), (0.0, 1.0), 2, 2);
    let mut problem = diffusion(mesh(), 1.0, 0.5)?;
    let fep = problem.fe_problem_mut();
    let dim = fep.dimension();
    let laplace = fep.jacobian_functional("laplace", "", |_| {
        Ok(move |_: &AssemblyData<f64>, _: &ValueStore, g: &mut [f64]| {
            for d in 0..dim {
                g[d * dim + d] = 1.0;
            }
        })
    })?;
    fep.add_jacobian_preconditioner_block(0, 0, None, None, None, Some(laplace), "")?;
    assert!(fep.weak_form().has_jacobian_preconditioner());
    problem.set_up()?;

    let n = problem.dimension();
    let x = DVector::from_fn(n, |i, _| 0.2 * i as f64);
    let preconditioner = DMatrix::from(&problem.assemble_jacobian(JacobianType::Preconditioner, &x)?);
    let jacobian = DMatrix::from(&problem.assemble_jacobian(JacobianType::Jacobian, &x)?);

    // The linear problem's Jacobian is the Laplacian itself
    let mut linear = diffusion(mesh(), 1.0, 0.0)?;
    linear.set_up()?;
    let laplacian = DMatrix::from(&linear.compute_jacobian(&x)?);
    assert_matrix_eq!(preconditioner, laplacian, comp = abs, tol = 1e-12);
    assert!((&jacobian - &laplacian).amax() > 1e-3);
    Ok(())
}

/// Diffusion with the cubic Robin term `u^3` on the facets of `boundary`.
fn cubic_robin(mesh: Mesh<f64>, boundary: &str) -> eyre::Result<FENonlinearProblem<f64>> {
    let mut problem = diffusion(mesh, 1.0, 0.0)?;
    let fep = problem.fe_problem_mut();
    let robin = fep.residual_functional("robin", boundary, |ctx| {
        let u = ctx.field_value("u")?;
        Ok(move |asmbl: &AssemblyData<f64>, _: &ValueStore, f: &mut [f64]| f[0] = u.at(asmbl, 0).powi(3))
    })?;
    fep.add_boundary_residual_block(0, Some(robin), None, boundary)?;
    let robin_du = fep.jacobian_functional("robin_du", boundary, |ctx| {
        let u = ctx.field_value("u")?;
        Ok(move |asmbl: &AssemblyData<f64>, _: &ValueStore, g: &mut [f64]| g[0] = 3.0 * u.at(asmbl, 0).powi(2))
    })?;
    fep.add_boundary_jacobian_block(0, 0, Some(robin_du), None, None, None, boundary)?;
    problem.set_up()?;
    Ok(problem)
}

#[test]
fn boundary_jacobian_matches_finite_differences() -> eyre::Result<()> {
    let meshes = [
        rectangle_mesh(ElementType::Quad4, (0.0, 1.0), (0.0, 1.0), 3, 2),
        rectangle_mesh(ElementType::Tri3, (0.0, 1.0), (0.0, 1.0), 2, 2),
        line_mesh(0.0, 1.0, 3),
    ];
    for mesh in meshes {
        let mut problem = cubic_robin(mesh, "right")?;
        let n = problem.dimension();
        let x = DVector::from_fn(n, |i, _| 0.5 + 0.1 * i as f64);

        let jacobian = DMatrix::from(&problem.compute_jacobian(&x)?);
        let fd = finite_difference_jacobian(&mut problem, &x)?;
        assert_matrix_eq!(jacobian, fd, comp = abs, tol = 1e-7);

        // Boundary blocks only enter the Jacobian, not the time derivative
        let dynamic = problem.assemble_jacobian(JacobianType::Dynamic, &x)?;
        assert_eq!(dynamic.nnz(), 0);
    }
    Ok(())
}

/// A coupled problem in a vector field `u` and a scalar `p`:
///
/// `(p u, v) + (grad u + p I, grad v) = 0` and `(div u + p^3, q) = 0`.
fn coupled(mesh: Mesh<f64>) -> eyre::Result<FENonlinearProblem<f64>> {
    let mut problem = FENonlinearProblem::new(mesh, 2);
    let fep = problem.fe_problem_mut();
    fep.add_field(0, "u", 2, 1)?;
    fep.add_field(1, "p", 1, 1)?;
    fep.create()?;
    let dim = fep.dimension();

    let u_f0 = fep.residual_functional("u_f0", "", |ctx| {
        let u = ctx.field_value("u")?;
        let p = ctx.field_value("p")?;
        Ok(move |asmbl: &AssemblyData<f64>, _: &ValueStore, f: &mut [f64]| {
            for c in 0..dim {
                f[c] = p.at(asmbl, 0) * u.at(asmbl, c);
            }
        })
    })?;
    let u_f1 = fep.residual_functional("u_f1", "", |ctx| {
        let grad = ctx.field_gradient("u")?;
        let p = ctx.field_value("p")?;
        Ok(move |asmbl: &AssemblyData<f64>, _: &ValueStore, f: &mut [f64]| {
            for c in 0..dim {
                for d in 0..dim {
                    f[c * dim + d] = grad.at(asmbl, c, d);
                }
                f[c * dim + c] += p.at(asmbl, 0);
            }
        })
    })?;
    fep.add_residual_block(0, Some(u_f0), Some(u_f1), "")?;
    let p_f0 = fep.residual_functional("p_f0", "", |ctx| {
        let grad = ctx.field_gradient("u")?;
        let p = ctx.field_value("p")?;
        Ok(move |asmbl: &AssemblyData<f64>, _: &ValueStore, f: &mut [f64]| {
            let div: f64 = (0..dim).map(|d| grad.at(asmbl, d, d)).sum();
            f[0] = div + p.at(asmbl, 0).powi(3);
        })
    })?;
    fep.add_residual_block(1, Some(p_f0), None, "")?;

    let uu_g0 = fep.jacobian_functional("uu_g0", "", |ctx| {
        let p = ctx.field_value("p")?;
        Ok(move |asmbl: &AssemblyData<f64>, _: &ValueStore, g: &mut [f64]| {
            for c in 0..dim {
                g[c * dim + c] = p.at(asmbl, 0);
            }
        })
    })?;
    let uu_g3 = fep.jacobian_functional("uu_g3", "", |_| {
        Ok(move |_: &AssemblyData<f64>, _: &ValueStore, g: &mut [f64]| {
            for c in 0..dim {
                for d in 0..dim {
                    g[((c * dim + c) * dim + d) * dim + d] = 1.0;
                }
            }
        })
    })?;
    fep.add_jacobian_block(0, 0, Some(uu_g0), None, None, Some(uu_g3), "")?;

    let up_g0 = fep.jacobian_functional("up_g0", "", |ctx| {
        let u = ctx.field_value("u")?;
        Ok(move |asmbl: &AssemblyData<f64>, _: &ValueStore, g: &mut [f64]| {
            for c in 0..dim {
                g[c] = u.at(asmbl, c);
            }
        })
    })?;
    let up_g2 = fep.jacobian_functional("up_g2", "", |_| {
        Ok(move |_: &AssemblyData<f64>, _: &ValueStore, g: &mut [f64]| {
            for c in 0..dim {
                g[c * dim + c] = 1.0;
            }
        })
    })?;
    fep.add_jacobian_block(0, 1, Some(up_g0), None, Some(up_g2), None, "")?;

    let pu_g1 = fep.jacobian_functional("pu_g1", "", |_| {
        Ok(move |_: &AssemblyData<f64>, _: &ValueStore, g: &mut [f64]| {
            for c in 0..dim {
                g[c * dim + c] = 1.0;
            }
        })
    })?;
    fep.add_jacobian_block(1, 0, None, Some(pu_g1), None, None, "")?;
    let pp_g0 = fep.jacobian_functional("pp_g0", "", |ctx| {
        let p = ctx.field_value("p")?;
        Ok(move |asmbl: &AssemblyData<f64>, _: &ValueStore, g: &mut [f64]| g[0] = 3.0 * p.at(asmbl, 0).powi(2))
    })?;
    fep.add_jacobian_block(1, 1, Some(pp_g0), None, None, None, "")?;
    problem.set_up()?;
    Ok(problem)
}

#[test]
fn coupled_jacobian_matches_finite_differences() -> eyre::Result<()> {
    for element in [ElementType::Quad4, ElementType::Tri3] {
        let mesh = rectangle_mesh(element, (0.0, 1.0), (0.0, 2.0), 2, 2);
        let mut problem = coupled(mesh)?;
        let n = problem.dimension();
        assert_eq!(n, 27);
        let x = DVector::from_fn(n, |i, _| ((i * 7) % 11) as f64 / 11.0 - 0.4);

        let jacobian = DMatrix::from(&problem.compute_jacobian(&x)?);
        let fd = finite_difference_jacobian(&mut problem, &x)?;
        assert_matrix_eq!(jacobian, fd, comp = abs, tol = 1e-7);

        // The off-diagonal blocks couple u and p: rows of p (every third entry) see u columns
        assert!(jacobian.abs().row(2).iter().step_by(3).any(|&v| v > 0.0));
        assert!(jacobian.abs().row(2).iter().skip(1).step_by(3).any(|&v| v > 0.0));
    }
    Ok(())
}
