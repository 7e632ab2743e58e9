use galerkin::assembly::{AssemblyData, ElementBatch};
use galerkin::dependency::ValueStore;
use galerkin::fe::{ElementType, FEGeom};
use galerkin::problem::FEProblemInterface;
use galerkin::weak_form::{JacobianKind, JacobianType, Key, ResidualKind, WeakForm};
use util::assert_approx_slice_eq;

fn constant(value: f64) -> impl Fn(&AssemblyData<f64>, &ValueStore, &mut [f64]) {
    move |_: &AssemblyData<f64>, _: &ValueStore, f: &mut [f64]| f.fill(value)
}

fn two_field_problem() -> eyre::Result<FEProblemInterface<f64>> {
    let mut fep = FEProblemInterface::new(ElementType::Edge2, 2);
    fep.add_field(0, "u", 1, 1)?;
    fep.add_field(3, "v", 2, 1)?;
    fep.create()?;
    Ok(fep)
}

#[test]
fn keys_encode_region_and_field() {
    assert_eq!(Key::for_region("", 2), Key::new(None, 0, 2, 0));
    assert_eq!(Key::for_region("top", 1).region(), "top");
    assert_eq!(Key::for_region("", 1).region(), "");
    assert_eq!(Key::for_region("top", 1).to_string(), "(top, 0, 1, 0)");
    assert_eq!(Key::for_region("", 1).to_string(), "(<domain>, 0, 1, 0)");

    let mut wf = WeakForm::<f64>::new();
    wf.set_num_fields(3);
    assert_eq!(wf.jacobian_field(1, 2), 5);
    assert_eq!(wf.split_jacobian_field(5), (1, 2));
}

#[test]
fn empty_weak_form_has_nothing() {
    let wf = WeakForm::<f64>::new();
    let key = Key::for_region("", 0);
    assert!(wf.get_residual(ResidualKind::F0, &key).is_empty());
    assert!(wf.get_jacobian(JacobianKind::G3, &key).is_empty());
    assert!(wf.get_residual_keys().is_empty());
    assert!(!wf.has_jacobian());
    assert!(!wf.has_jacobian_preconditioner());
    assert!(!wf.has_dyn_jacobian());
}

#[test]
fn blocks_are_keyed_by_field_position() -> eyre::Result<()> {
    let mut fep = two_field_problem()?;
    let f0 = fep.residual_functional("u_f0", "", |_| Ok(constant(1.0)))?;
    fep.add_residual_block(0, Some(f0), None, "")?;
    let f1 = fep.residual_functional("v_f1", "", |_| Ok(constant(1.0)))?;
    fep.add_residual_block(3, None, Some(f1), "")?;
    let bnd = fep.residual_functional("v_bnd", "right", |_| Ok(constant(1.0)))?;
    fep.add_boundary_residual_block(3, Some(bnd), None, "right")?;

    let g = fep.jacobian_functional("uv_g0", "", |_| Ok(constant(1.0)))?;
    fep.add_jacobian_block(0, 3, Some(g), None, None, None, "")?;
    let gt = fep.jacobian_functional("vv_gt0", "", |_| Ok(constant(1.0)))?;
    fep.add_jacobian_dynamic_block(3, 3, Some(gt), None, None, None, "")?;

    let wf = fep.weak_form();
    assert_eq!(wf.num_fields(), 2);
    assert_eq!(
        wf.get_residual_keys(),
        vec![Key::for_region("", 0), Key::for_region("", 1)]
    );
    assert_eq!(wf.get_bnd_residual_keys(), vec![Key::for_region("right", 1)]);
    assert_eq!(wf.get_residual(ResidualKind::F0, &Key::for_region("", 0)).len(), 1);
    assert!(wf.get_residual(ResidualKind::F1, &Key::for_region("", 0)).is_empty());
    assert_eq!(wf.get_residual(ResidualKind::BndF0, &Key::for_region("right", 1)).len(), 1);

    assert_eq!(
        wf.get_jacobian_keys(),
        vec![Key::for_region("", 1), Key::for_region("", 3)]
    );
    assert!(wf.get_bnd_jacobian_keys().is_empty());
    assert!(wf.has_jacobian());
    assert!(!wf.has_jacobian_preconditioner());
    assert!(wf.has_dyn_jacobian());
    assert_eq!(JacobianKind::blocks(JacobianType::Dynamic)[0], JacobianKind::GT0);
    Ok(())
}

#[test]
fn integrands_of_the_same_kind_are_summed() -> eyre::Result<()> {
    let mut fep = FEProblemInterface::new(ElementType::Edge2, 1);
    fep.add_field(0, "u", 1, 1)?;
    fep.create()?;
    let first = fep.residual_functional("first", "", |_| Ok(constant(1.0)))?;
    let second = fep.residual_functional("second", "", |_| Ok(constant(2.0)))?;
    fep.add_residual_block(0, Some(first), None, "")?;
    fep.add_residual_block(0, Some(second), None, "")?;
    fep.set_up()?;

    let key = Key::for_region("", 0);
    assert_eq!(fep.weak_form().get_residual(ResidualKind::F0, &key).len(), 2);

    // Two cells of length 1 and 2
    let coords = [0.0, 1.0, 1.0, 3.0];
    let quadrature = fep.discrete_system()?.field(0).quadrature().clone();
    let geom = FEGeom::for_cells(ElementType::Edge2, &coords, &quadrature)?;
    let coefficients = [0.0; 4];
    let batch = ElementBatch::new(&geom, &coefficients);
    let mut elem_vec = vec![0.0; 4];
    fep.integrate_residual(&key, &batch, 0.0, &mut elem_vec)?;
    assert_approx_slice_eq!(elem_vec, [1.5, 1.5, 3.0, 3.0], abstol = 1e-13);

    // Keys without integrands leave the element vectors untouched
    fep.integrate_residual(&Key::for_region("", 1), &batch, 0.0, &mut elem_vec)?;
    assert_approx_slice_eq!(elem_vec, [1.5, 1.5, 3.0, 3.0], abstol = 1e-13);
    Ok(())
}
