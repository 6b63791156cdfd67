use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

use crate::VehicleState;

/// Chassis acceleration produced by one force evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChassisAcceleration {
    /// World-frame linear acceleration (m/s^2).
    pub linear: Vector2<f64>,
    /// Yaw acceleration (rad/s^2).
    pub yaw: f64,
}

/// A generic integration strategy trait.
pub trait Integrator {
    /// Advances the rigid-body part of the state (position, heading, velocity, yaw rate).
    /// Wheel speeds and the acceleration estimate are left to the caller.
    fn integrate(&self, state: &VehicleState, accel: &ChassisAcceleration, dt: f64) -> VehicleState;
}

/// Semi-implicit Euler integrator (Symplectic Euler).
/// This is first-order accurate but conserves energy better than explicit Euler.
/// Velocities are updated first, then positions use the NEW velocity.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemiImplicitEuler;

impl Integrator for SemiImplicitEuler {
    fn integrate(&self, state: &VehicleState, accel: &ChassisAcceleration, dt: f64) -> VehicleState {
        let velocity = state.velocity + accel.linear * dt;
        let yaw_rate = state.yaw_rate + accel.yaw * dt;
        VehicleState {
            position: state.position + velocity * dt,
            heading: state.heading + yaw_rate * dt,
            velocity,
            yaw_rate,
            ..*state
        }
    }
}

/// Plain forward Euler. Kept for comparison runs; drifts at large time steps.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExplicitEuler;

impl Integrator for ExplicitEuler {
    fn integrate(&self, state: &VehicleState, accel: &ChassisAcceleration, dt: f64) -> VehicleState {
        VehicleState {
            position: state.position + state.velocity * dt,
            heading: state.heading + state.yaw_rate * dt,
            velocity: state.velocity + accel.linear * dt,
            yaw_rate: state.yaw_rate + accel.yaw * dt,
            ..*state
        }
    }
}

/// Serializable integrator selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegratorKind {
    #[default]
    SemiImplicitEuler,
    ExplicitEuler,
}

impl Integrator for IntegratorKind {
    fn integrate(&self, state: &VehicleState, accel: &ChassisAcceleration, dt: f64) -> VehicleState {
        match self {
            IntegratorKind::SemiImplicitEuler => SemiImplicitEuler.integrate(state, accel, dt),
            IntegratorKind::ExplicitEuler => ExplicitEuler.integrate(state, accel, dt),
        }
    }
}

/// Equal sub-steps covering one caller time step without exceeding `max_dt`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SubstepPlan {
    pub count: u32,
    pub dt: f64,
}

impl SubstepPlan {
    pub fn new(dt: f64, max_dt: f64) -> Self {
        // Tolerance keeps exact multiples of max_dt from rounding up an extra sub-step.
        let count = ((dt / max_dt) - 1e-9).ceil().max(1.0) as u32;
        SubstepPlan { count, dt: dt / count as f64 }
    }
}

/// Fixed-timestep accumulator for real-time loops: feeds variable frame times in,
/// reports how many fixed steps to run.
#[derive(Debug, Clone)]
pub struct FixedTimestepAccumulator {
    pub fixed_dt: f64,
    pub accumulator: f64,
}

impl FixedTimestepAccumulator {
    pub fn new(fixed_dt: f64) -> Self {
        FixedTimestepAccumulator {
            fixed_dt,
            accumulator: 0.0,
        }
    }

    /// Adds `frame_dt` and returns the number of whole fixed steps now due.
    pub fn advance(&mut self, frame_dt: f64) -> u32 {
        self.accumulator += frame_dt;
        let mut steps = 0;
        while self.accumulator >= self.fixed_dt {
            self.accumulator -= self.fixed_dt;
            steps += 1;
        }
        steps
    }

    /// Time carried over to the next frame.
    pub fn remaining(&self) -> f64 {
        self.accumulator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn create_test_state() -> VehicleState {
        VehicleState {
            velocity: Vector2::new(1.0, 2.0),
            yaw_rate: 0.5,
            ..VehicleState::default()
        }
    }

    #[test]
    fn test_semi_implicit_euler_uses_new_velocity() {
        let state = create_test_state();
        let accel = ChassisAcceleration { linear: Vector2::new(10.0, 0.0), yaw: 1.0 };

        let next = SemiImplicitEuler.integrate(&state, &accel, 0.1);

        assert_relative_eq!(next.velocity.x, 2.0, epsilon = 1e-12);
        assert_relative_eq!(next.position.x, 0.2, epsilon = 1e-12);
        assert_relative_eq!(next.position.y, 0.2, epsilon = 1e-12);
        assert_relative_eq!(next.yaw_rate, 0.6, epsilon = 1e-12);
        assert_relative_eq!(next.heading, 0.06, epsilon = 1e-12);
    }

    #[test]
    fn test_explicit_euler_uses_old_velocity() {
        let state = create_test_state();
        let accel = ChassisAcceleration { linear: Vector2::new(10.0, 0.0), yaw: 1.0 };

        let next = IntegratorKind::ExplicitEuler.integrate(&state, &accel, 0.1);

        assert_relative_eq!(next.position.x, 0.1, epsilon = 1e-12);
        assert_relative_eq!(next.heading, 0.05, epsilon = 1e-12);
        assert_relative_eq!(next.velocity.x, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_substep_plan() {
        assert_eq!(SubstepPlan::new(0.01, 0.005).count, 2);
        assert_eq!(SubstepPlan::new(0.002, 0.005).count, 1);
        let plan = SubstepPlan::new(1.0 / 60.0, 0.005);
        assert_eq!(plan.count, 4);
        assert_relative_eq!(plan.dt * plan.count as f64, 1.0 / 60.0, epsilon = 1e-15);
    }

    #[test]
    fn test_fixed_timestep_accumulator() {
        let mut acc = FixedTimestepAccumulator::new(0.01);

        // 0.025s with fixed 0.01s steps: 2 steps, 0.005s carried over
        assert_eq!(acc.advance(0.025), 2);
        assert_relative_eq!(acc.remaining(), 0.005, epsilon = 1e-9);
        assert_eq!(acc.advance(0.006), 1);
    }
}
