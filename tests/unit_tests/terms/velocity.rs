use crate::unit_tests::tensor;
use fenris_terms::coefficient::Coefficient;
use fenris_terms::geometry::VolumeGeometry;
use fenris_terms::settings::IntegralMode;
use fenris_terms::tensor::TensorShape;
use fenris_terms::terms::{allocate_output, evaluate_term, DiffusionVelocity, ElementTerm, FluxSign};
use matrixcompare::assert_scalar_eq;

#[test]
fn integrated_and_averaged_diffusive_flux() {
    let bf_gm = tensor([1, 2, 2, 3], &[0.0; 12]);
    let det = tensor([1, 2, 1, 1], &[0.5, 1.5]);
    let grad = tensor([1, 2, 2, 1], &[1.0, 2.0, 3.0, -1.0]);
    let mtx_d = tensor([1, 1, 2, 2], &[2.0, 0.0, 0.0, 1.0]);
    let geometry = VolumeGeometry::new(bf_gm.view(), det.view()).unwrap();

    let integrate = DiffusionVelocity::integrate(grad.view(), Coefficient::Shared(mtx_d.view()), geometry);
    assert_eq!(integrate.name(), "di_diffusion_integrate");
    let mut output = allocate_output(&integrate).unwrap();
    assert_eq!(output.shape(), TensorShape::new(1, 1, 2, 1));
    evaluate_term(&integrate, &mut output).unwrap();
    // 0.5 * [2, 2] + 1.5 * [6, -1]
    assert_scalar_eq!(output.as_slice()[0], 10.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(output.as_slice()[1], -0.5, comp = abs, tol = 1e-14);

    let velocity = DiffusionVelocity::velocity(grad.view(), Coefficient::Shared(mtx_d.view()), geometry);
    assert_eq!(velocity.name(), "de_diffusion_velocity");
    evaluate_term(&velocity, &mut output).unwrap();
    // Negated and divided by the element volume 2
    assert_scalar_eq!(output.as_slice()[0], -5.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(output.as_slice()[1], 0.25, comp = abs, tol = 1e-14);

    let total_velocity = DiffusionVelocity {
        mode: IntegralMode::Integral,
        ..velocity
    };
    assert_eq!(total_velocity.sign, FluxSign::Velocity);
    evaluate_term(&total_velocity, &mut output).unwrap();
    assert_scalar_eq!(output.as_slice()[0], -10.0, comp = abs, tol = 1e-14);
    assert_scalar_eq!(output.as_slice()[1], 0.5, comp = abs, tol = 1e-14);
}

#[test]
fn velocity_uses_per_element_permeability() {
    let bf_gm = tensor([1, 1, 2, 3], &[0.0; 6]);
    let det = tensor([2, 1, 1, 1], &[0.5, 0.25]);
    let grad = tensor([2, 1, 2, 1], &[1.0, 1.0, 1.0, 1.0]);
    let mtx_d = tensor([2, 1, 2, 2], &[1.0, 0.0, 0.0, 1.0, 3.0, 0.0, 0.0, 3.0]);
    let geometry = VolumeGeometry::new(bf_gm.view(), det.view()).unwrap();
    let term = DiffusionVelocity::velocity(grad.view(), Coefficient::PerElement(mtx_d.view()), geometry);
    let mut output = allocate_output(&term).unwrap();
    evaluate_term(&term, &mut output).unwrap();
    assert_eq!(output.as_slice(), &[-1.0, -1.0, -3.0, -3.0]);
}
