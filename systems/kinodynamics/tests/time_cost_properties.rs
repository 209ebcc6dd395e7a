use proptest::prelude::*;
use team_tasking_system_kinodynamics::{time_cost, MotionBounds};

fn bounds() -> impl Strategy<Value = MotionBounds> {
    (0.05_f32..50.0, 0.05_f32..500.0).prop_map(|(max_accel, max_vel)| MotionBounds {
        max_accel,
        max_vel,
    })
}

proptest! {
    #[test]
    fn already_at_target_costs_nothing(x0 in -5_000.0_f32..5_000.0, bounds in bounds()) {
        prop_assert_eq!(time_cost(x0, 0.0, x0, 0.0, bounds), 0.0);
    }

    #[test]
    fn cost_never_decreases_with_distance(
        x0 in -1_000.0_f32..1_000.0,
        near in 0.0_f32..3_000.0,
        extra in 0.0_f32..3_000.0,
        direction in prop::bool::ANY,
        bounds in bounds(),
    ) {
        let sign = if direction { 1.0 } else { -1.0 };
        let short = time_cost(x0, 0.0, x0 + sign * near, 0.0, bounds);
        let long = time_cost(x0, 0.0, x0 + sign * (near + extra), 0.0, bounds);
        prop_assert!(long + 1e-3 * long.max(1.0) >= short, "short {} long {}", short, long);
    }

    #[test]
    fn cost_is_symmetric_in_direction(
        distance in 0.0_f32..5_000.0,
        bounds in bounds(),
    ) {
        let forward = time_cost(0.0, 0.0, distance, 0.0, bounds);
        let backward = time_cost(distance, 0.0, 0.0, 0.0, bounds);
        prop_assert!((forward - backward).abs() <= 1e-3 * forward.max(1.0));
    }

    #[test]
    fn costs_from_rest_are_never_negative(
        x0 in -5_000.0_f32..5_000.0,
        xf in -5_000.0_f32..5_000.0,
        bounds in bounds(),
    ) {
        prop_assert!(time_cost(x0, 0.0, xf, 0.0, bounds) >= 0.0);
    }
}
