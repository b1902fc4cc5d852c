//! Round-trip consistency between the simulator and its own output, and
//! smoothness of the objective in the friction parameters.

use approx::assert_relative_eq;

use mecdrive_dynamics::params::DriveParameters;
use mecdrive_sim::objective::{aggregate_objective, objective};
use mecdrive_sim::trajectory::simulate;
use mecdrive_test_utils::{constant_command, default_coupling, mixed_command, synthetic_series};

#[test]
fn objective_is_zero_against_self_generated_telemetry() {
    let r = default_coupling();
    let params = DriveParameters::default();
    let series = synthetic_series(&r, &params, 100, 0.01, 12.0, constant_command(0.7)).unwrap();

    // The "measured" columns are the simulator's own Euler output, so the
    // prediction error against the generating parameters vanishes.
    let loss = objective(&r, &params, &series).unwrap();
    assert_relative_eq!(loss, 0.0, epsilon = 1e-9);
}

#[test]
fn objective_grows_with_parameter_error() {
    let r = default_coupling();
    let truth = DriveParameters::default();
    let series = synthetic_series(&r, &truth, 150, 0.01, 12.0, mixed_command(30)).unwrap();

    let near = truth.with_motor_constant(truth.motor_constant() * 1.05);
    let far = truth.with_motor_constant(truth.motor_constant() * 1.5);

    let loss_truth = objective(&r, &truth, &series).unwrap();
    let loss_near = objective(&r, &near, &series).unwrap();
    let loss_far = objective(&r, &far, &series).unwrap();

    assert!(loss_truth < loss_near);
    assert!(loss_near < loss_far);
}

#[test]
fn friction_perturbation_changes_loss_continuously() {
    let r = default_coupling();
    let truth = DriveParameters::default();
    let series = synthetic_series(&r, &truth, 100, 0.01, 12.0, mixed_command(25)).unwrap();

    // fl_wheel_friction is index 6 of the flat layout. The sigmoid
    // friction law keeps the objective continuous in the coefficient: the
    // loss change must shrink with the perturbation.
    let base = truth.parameter(6).unwrap();
    let loss_at = |value: f64| {
        let perturbed = truth.with_parameter(6, value).unwrap();
        objective(&r, &perturbed, &series).unwrap()
    };

    let loss_0 = loss_at(base);
    let delta_coarse = (loss_at(base + 1e-3) - loss_0).abs();
    let delta_fine = (loss_at(base + 1e-6) - loss_0).abs();

    assert!(delta_coarse > 0.0, "loss must respond to friction changes");
    assert!(
        delta_fine < delta_coarse / 100.0,
        "loss change must vanish with the perturbation: coarse {delta_coarse}, fine {delta_fine}"
    );
}

#[test]
fn aggregate_objective_over_synthetic_runs() {
    let r = default_coupling();
    let truth = DriveParameters::default();
    let samples = vec![
        synthetic_series(&r, &truth, 80, 0.01, 12.0, constant_command(0.5)).unwrap(),
        synthetic_series(&r, &truth, 80, 0.01, 12.0, mixed_command(20)).unwrap(),
    ];

    assert_relative_eq!(
        aggregate_objective(&r, &truth, &samples).unwrap(),
        0.0,
        epsilon = 1e-9
    );

    let wrong = truth.with_uniform_roller_friction(5.0);
    assert!(aggregate_objective(&r, &wrong, &samples).unwrap() > 0.0);
}

#[test]
fn simulated_trajectory_matches_measured_columns_exactly() {
    let r = default_coupling();
    let params = DriveParameters::default();
    let series = synthetic_series(&r, &params, 60, 0.01, 12.0, constant_command(0.3)).unwrap();

    let trajectory = simulate(&r, &params, &series).unwrap();
    for i in 0..series.len() {
        let measured = series.measured_position(i);
        assert_relative_eq!(trajectory.position[i][0], measured[0], epsilon = 1e-12);
        assert_relative_eq!(trajectory.position[i][1], measured[1], epsilon = 1e-12);
        assert_relative_eq!(trajectory.position[i][2], measured[2], epsilon = 1e-12);
    }
}
