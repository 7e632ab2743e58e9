use galerkin::dense::DenseVector;
use galerkin::fe::primitives::{calc_volumes, element_length, grad_shape, mass, mass_lumped, normal, volume};
use galerkin::fe::{DiscreteSystem, ElementType, FiniteElement, NotImplemented};
use galerkin::mesh::procedural::{line_mesh, rectangle_mesh};
use matrixcompare::assert_scalar_eq;

fn v2(x: f64, y: f64) -> DenseVector<f64, 2> {
    DenseVector::from_array([x, y])
}

#[test]
fn triangle_primitives() {
    let coords = [v2(0.0, 0.0), v2(1.0, 0.0), v2(0.0, 1.0)];
    let vol = volume(ElementType::Tri3, &coords).unwrap();
    assert_scalar_eq!(vol, 0.5, comp = abs, tol = 1e-14);

    let grads = grad_shape(ElementType::Tri3, &coords, vol).unwrap();
    assert_eq!(grads, vec![v2(-1.0, -1.0), v2(1.0, 0.0), v2(0.0, 1.0)]);

    // The hypotenuse is opposite to node 0
    let n = normal(ElementType::Tri3, vol, 2.0_f64.sqrt(), &grads[0]).unwrap();
    let expected = 0.5_f64.sqrt();
    assert_scalar_eq!(n[0], expected, comp = abs, tol = 1e-14);
    assert_scalar_eq!(n[1], expected, comp = abs, tol = 1e-14);

    let h = element_length(ElementType::Tri3, &grads).unwrap();
    assert_scalar_eq!(h, 0.5_f64.sqrt(), comp = abs, tol = 1e-14);
}

#[test]
fn mass_matrices() {
    let m = mass::<f64, 2>(ElementType::Edge2, 3.0).unwrap();
    assert_scalar_eq!(m.get(0, 0), 1.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(m.get(0, 1), 0.5, comp = abs, tol = 1e-14);

    let m = mass::<f64, 3>(ElementType::Tri3, 1.2).unwrap();
    let total: f64 = (0..3)
        .flat_map(|i| (0..3).map(move |j| (i, j)))
        .map(|(i, j)| m.get(i, j))
        .sum();
    assert_scalar_eq!(total, 1.2, comp = abs, tol = 1e-14);

    let lumped = mass_lumped::<f64, 3>(ElementType::Tri3, 1.2).unwrap();
    assert_scalar_eq!(lumped.get(1, 1), 0.4, comp = abs, tol = 1e-14);
    assert_eq!(lumped.get(0, 1), 0.0);
}

#[test]
fn unsupported_primitives_are_reported() {
    let coords = [v2(0.0, 0.0), v2(1.0, 0.0), v2(1.0, 1.0), v2(0.0, 1.0)];
    let err = volume(ElementType::Quad4, &coords).unwrap_err();
    assert_eq!(err, NotImplemented::new("Volume calculation", ElementType::Quad4, 2));
    assert_eq!(err.to_string(), "Volume calculation for QUAD4 in 2 dimensions is not implemented.");

    assert!(mass::<f64, 4>(ElementType::Quad4, 1.0).is_err());
    assert!(mass_lumped::<f64, 4>(ElementType::Tet4, 1.0).is_err());
    assert!(grad_shape(ElementType::Quad4, &coords, 1.0).is_err());
}

#[test]
fn mesh_volumes_sum_to_domain_measure() {
    let mesh = rectangle_mesh(ElementType::Tri3, (0.0, 2.0), (0.0, 1.5), 3, 2);
    let volumes = calc_volumes::<f64, 2>(&mesh).unwrap();
    assert_eq!(volumes.size(), 12);
    assert!(volumes.iter().all(|&v| v > 0.0));
    assert_scalar_eq!(volumes.iter().sum::<f64>(), 3.0, comp = abs, tol = 1e-12);

    let mesh = line_mesh(-1.0, 1.0, 4);
    let volumes = calc_volumes::<f64, 1>(&mesh).unwrap();
    assert_scalar_eq!(volumes[2], 0.5, comp = abs, tol = 1e-14);
}

#[test]
fn discrete_system_offsets() {
    let ds = DiscreteSystem::new(vec![
        FiniteElement::<f64>::new(ElementType::Tri3, 1, 2, 1),
        FiniteElement::new(ElementType::Tri3, 2, 2, 2),
    ]);
    assert_eq!(ds.num_fields(), 2);
    assert_eq!(ds.dimension(), 2);
    assert_eq!(ds.field_offset(1), 3);
    assert_eq!(ds.total_dimension(), 9);
    assert_eq!(ds.component_offset(1), 1);
    assert_eq!(ds.total_components(), 3);
    assert!(ds.has_hessians());
    assert_eq!(ds.jet_degree(0), 1);
}

#[test]
fn tabulated_basis_is_a_partition_of_unity() {
    for element in [ElementType::Edge2, ElementType::Tri3, ElementType::Quad4, ElementType::Tet4] {
        let fe = FiniteElement::<f64>::new(element, 1, 2, 1);
        let tab = fe.tabulation();
        assert_eq!(tab.num_points(), fe.quadrature().num_points());
        for q in 0..tab.num_points() {
            let sum: f64 = tab.values_at(0, q).iter().sum();
            assert_scalar_eq!(sum, 1.0, comp = abs, tol = 1e-13);
            let grads = tab.gradients_at(0, q);
            for d in 0..element.dim() {
                let dsum: f64 = (0..tab.num_basis())
                    .map(|b| grads[b * element.dim() + d])
                    .sum();
                assert_scalar_eq!(dsum, 0.0, comp = abs, tol = 1e-13);
            }
        }
        let weights: f64 = fe.quadrature().weights().iter().sum();
        let reference_volume = match element {
            ElementType::Edge2 => 2.0,
            ElementType::Tri3 => 2.0,
            ElementType::Quad4 => 4.0,
            ElementType::Tet4 => 4.0 / 3.0,
        };
        assert_scalar_eq!(weights, reference_volume, comp = abs, tol = 1e-12);
    }
}
