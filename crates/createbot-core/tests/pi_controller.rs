use createbot_core::control::{PiController, PiGains, SteeringState, WheelVelocities};
use proptest::prelude::*;

proptest! {
    #[test]
    fn velocities_stay_within_limit(
        reference in any::<u16>(),
        readings in prop::collection::vec(any::<u16>(), 1..200),
    ) {
        let mut state = SteeringState::new(
            reference,
            PiController::new(PiGains::default()),
            WheelVelocities::straight(100),
            500,
        );
        for measured in readings {
            let (_, v) = state.tick(measured);
            prop_assert!((-500..=500).contains(&v.left));
            prop_assert!((-500..=500).contains(&v.right));
        }
    }

    #[test]
    fn integral_is_running_sum(errors in prop::collection::vec(-1000i32..1000, 1..50)) {
        let mut pi = PiController::new(PiGains::default());
        let mut sum = 0.0;
        for e in errors {
            let step = pi.update(e as f64, 0.0);
            sum += e as f64;
            prop_assert!((step.error_i - sum).abs() < 1e-6);
        }
    }
}

#[test]
fn test_reading_at_reference_keeps_course() {
    let mut state = SteeringState::new(
        300,
        PiController::new(PiGains::default()),
        WheelVelocities::straight(100),
        500,
    );
    for _ in 0..10 {
        let (step, v) = state.tick(300);
        assert_eq!(step.correction, 0.0);
        assert_eq!(v, WheelVelocities::straight(100));
    }
}

#[test]
fn test_too_far_from_wall_turns_right() {
    // Reading below reference: the left wheel speeds up and the right slows down
    let mut state = SteeringState::new(
        500,
        PiController::new(PiGains::default()),
        WheelVelocities::straight(100),
        500,
    );
    let (_, v) = state.tick(100);
    assert!(v.left > 100);
    assert!(v.right < 100);
}

#[test]
fn test_reset_restores_base() {
    let mut state = SteeringState::new(
        500,
        PiController::new(PiGains::default()),
        WheelVelocities::straight(100),
        500,
    );
    state.tick(0);
    state.tick(0);
    state.reset(250);

    assert_eq!(state.reference(), 250);
    assert_eq!(state.velocities(), WheelVelocities::straight(100));
    assert_eq!(state.controller().error_i(), 0.0);
}

#[test]
fn test_integral_limit_bounds_accumulation() {
    let mut pi = PiController::new(PiGains::default()).with_integral_limit(250.0);
    for _ in 0..10 {
        pi.update(100.0, 0.0);
    }
    assert_eq!(pi.error_i(), 250.0);
}
