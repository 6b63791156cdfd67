use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};
use simcore::{
    ensure_finite, ChassisAcceleration, DriverInput, Integrator, IntegratorKind, SimError, SimResult,
    SubstepPlan, SurfaceModel, SurfaceSample, TireState, VehicleState, WheelId,
};

use crate::grip::compute_grip;
use crate::load::compute_loads;
use crate::tire::{compute_force, positive, slip_angle, slip_ratio, TireForce, TireParams};
use crate::vehicle::VehicleSpec;

/// Upper bound on resolve rounds per step.
const MAX_ITERATIONS: u32 = 64;
/// Caller time steps needing more sub-steps than this are rejected.
const MAX_SUBSTEPS: u32 = 10_000;
/// Wheel speed offset (rad/s) for the central difference of tire force.
const WHEEL_SPEED_PROBE: f64 = 1e-3;

/// Numerical settings of the step solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Fixed-point rounds between load transfer and tire force.
    pub iterations: u32,
    /// Largest internal time step (s); longer steps are split evenly.
    pub max_dt: f64,
    pub integrator: IntegratorKind,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            iterations: 4,
            max_dt: 1.0 / 200.0,
            integrator: IntegratorKind::default(),
        }
    }
}

impl SolverConfig {
    pub fn validate(&self) -> SimResult<()> {
        if !(1..=MAX_ITERATIONS).contains(&self.iterations) {
            return Err(SimError::configuration(
                "solver.iterations",
                format!("must lie in 1..={MAX_ITERATIONS}, got {}", self.iterations),
            ));
        }
        positive("solver.max_dt", self.max_dt)
    }
}

/// A driver input that was outside its range and has been clamped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InputOutOfRange {
    pub field: &'static str,
    pub requested: f64,
    pub applied: f64,
}

/// Everything one step produced. Diagnostics come from the last sub-step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub state: VehicleState,
    pub tires: [TireState; 4],
    /// Net tire force in the chassis frame (N).
    pub net_force: Vector2<f64>,
    /// Yaw moment about the CoG (N*m).
    pub yaw_torque: f64,
    /// m * yaw_rate * forward speed of the resulting state (N).
    pub centripetal_force: f64,
    pub clamped_inputs: Vec<InputOutOfRange>,
    pub substeps: u32,
}

/// Where a contact patch is and how it moves, fixed for the duration of one sub-step.
#[derive(Debug, Clone, Copy)]
struct WheelKinematics {
    /// Contact patch relative to the CoG, chassis frame.
    position: Vector2<f64>,
    steer: f64,
    slip_ratio: f64,
    slip_angle: f64,
    surface: SurfaceSample,
}

#[derive(Debug, Clone, Copy, Default)]
struct WheelContact {
    load: f64,
    grip: f64,
    force: TireForce,
}

struct SubstepOutcome {
    state: VehicleState,
    contacts: [WheelContact; 4],
    kinematics: [WheelKinematics; 4],
    net_force: Vector2<f64>,
    yaw_torque: f64,
}

/// Advances a vehicle by one discrete time step.
///
/// Holds only read-only data, so one instance can step any number of vehicles
/// sharing the same spec, from any thread.
#[derive(Debug, Clone)]
pub struct VehicleDynamics {
    spec: VehicleSpec,
    solver: SolverConfig,
}

impl VehicleDynamics {
    pub fn new(spec: VehicleSpec, solver: SolverConfig) -> SimResult<Self> {
        spec.validate()?;
        solver.validate()?;
        log::debug!(
            "vehicle dynamics ready: mass {} kg, wheelbase {} m, {} resolve iterations, max_dt {} s, {:?}",
            spec.mass,
            spec.wheelbase,
            solver.iterations,
            solver.max_dt,
            solver.integrator
        );
        Ok(VehicleDynamics { spec, solver })
    }

    pub fn spec(&self) -> &VehicleSpec {
        &self.spec
    }

    pub fn solver(&self) -> &SolverConfig {
        &self.solver
    }

    pub fn step<S: SurfaceModel + ?Sized>(
        &self,
        surface: &S,
        prior: &VehicleState,
        input: &DriverInput,
        dt: f64,
    ) -> SimResult<VehicleState> {
        self.step_detailed(surface, prior, input, dt).map(|report| report.state)
    }

    pub fn step_detailed<S: SurfaceModel + ?Sized>(
        &self,
        surface: &S,
        prior: &VehicleState,
        input: &DriverInput,
        dt: f64,
    ) -> SimResult<StepReport> {
        let plan = self.plan_substeps(dt)?;
        if let Some(field) = prior.first_non_finite() {
            return Err(SimError::InvalidState { field });
        }
        let (input, clamped_inputs) = self.clamp_input(input)?;

        let mut outcome = self.substep(surface, prior, &input, plan.dt)?;
        for _ in 1..plan.count {
            outcome = self.substep(surface, &outcome.state, &input, plan.dt)?;
        }

        let state = outcome.state;
        let centripetal_force = ensure_finite(
            self.spec.mass * state.yaw_rate * state.body_velocity().x,
            None,
            "centripetal force",
        )?;
        let tires = WheelId::ALL.map(|wheel| self.tire_state(wheel, &outcome));

        Ok(StepReport {
            state,
            tires,
            net_force: outcome.net_force,
            yaw_torque: outcome.yaw_torque,
            centripetal_force,
            clamped_inputs,
            substeps: plan.count,
        })
    }

    fn plan_substeps(&self, dt: f64) -> SimResult<SubstepPlan> {
        if !(dt.is_finite() && dt > 0.0) || dt / self.solver.max_dt > MAX_SUBSTEPS as f64 {
            return Err(SimError::InvalidTimeStep { dt });
        }
        Ok(SubstepPlan::new(dt, self.solver.max_dt))
    }

    /// Rejects non-finite inputs and clamps finite ones into range.
    fn clamp_input(&self, input: &DriverInput) -> SimResult<(DriverInput, Vec<InputOutOfRange>)> {
        let max_steer = self.spec.max_steer_angle;
        let mut clamped = Vec::new();
        let mut clamp = |field: &'static str, requested: f64, low: f64, high: f64| -> SimResult<f64> {
            if !requested.is_finite() {
                return Err(SimError::InvalidInput { field });
            }
            let applied = requested.clamp(low, high);
            if applied != requested {
                log::debug!("driver input {field} = {requested} out of range, clamped to {applied}");
                clamped.push(InputOutOfRange { field, requested, applied });
            }
            Ok(applied)
        };

        let input = DriverInput {
            throttle: clamp("throttle", input.throttle, 0.0, 1.0)?,
            brake: clamp("brake", input.brake, 0.0, 1.0)?,
            steer: clamp("steer", input.steer, -max_steer, max_steer)?,
        };
        Ok((input, clamped))
    }

    fn substep<S: SurfaceModel + ?Sized>(
        &self,
        surface: &S,
        prior: &VehicleState,
        input: &DriverInput,
        dt: f64,
    ) -> SimResult<SubstepOutcome> {
        let spec = &self.spec;
        let kinematics = self.wheel_kinematics(surface, prior, input.steer)?;

        // Load transfer and tire force depend on each other; iterate a fixed number of rounds
        // starting from last step's acceleration.
        let mut accel = prior.acceleration;
        let mut contacts = [WheelContact::default(); 4];
        let mut net_force = Vector2::zeros();
        let mut yaw_torque = 0.0;
        for iteration in 0..self.solver.iterations {
            let loads = compute_loads(spec, &spec.static_load_shares, accel.x, accel.y);
            net_force = Vector2::zeros();
            yaw_torque = 0.0;
            for wheel in WheelId::ALL {
                let i = wheel.index();
                let k = &kinematics[i];
                let (grip, force) = tire_response(loads[i], k.slip_ratio, k.slip_angle, &k.surface, spec.tire(wheel));
                let chassis_force = Rotation2::new(k.steer) * Vector2::new(force.longitudinal, force.lateral);
                net_force += chassis_force;
                yaw_torque += k.position.x * chassis_force.y - k.position.y * chassis_force.x;
                contacts[i] = WheelContact { load: loads[i], grip, force };
            }
            accel = net_force / spec.mass;
            log::trace!(
                "resolve round {iteration}: accel ({:.4}, {:.4}) m/s^2, yaw torque {:.3} N*m",
                accel.x,
                accel.y,
                yaw_torque
            );
        }

        for wheel in WheelId::ALL {
            let contact = &contacts[wheel.index()];
            ensure_finite(contact.load, Some(wheel), "normal load")?;
            ensure_finite(contact.grip, Some(wheel), "grip")?;
            ensure_finite(contact.force.longitudinal, Some(wheel), "longitudinal force")?;
            ensure_finite(contact.force.lateral, Some(wheel), "lateral force")?;
        }
        ensure_finite(net_force.x, None, "net force x")?;
        ensure_finite(net_force.y, None, "net force y")?;
        ensure_finite(yaw_torque, None, "yaw torque")?;

        let chassis_accel = ChassisAcceleration {
            linear: Rotation2::new(prior.heading) * accel,
            yaw: yaw_torque / spec.yaw_inertia,
        };
        let mut state = self.solver.integrator.integrate(prior, &chassis_accel, dt);
        state.acceleration = accel;

        // Wheels see the updated chassis velocity, so free-rolling wheels keep up with it.
        let body_velocity = state.body_velocity();
        for wheel in WheelId::ALL {
            let i = wheel.index();
            let k = &kinematics[i];
            let patch_velocity = contact_patch_velocity(body_velocity, state.yaw_rate, k.position, k.steer);
            let omega = self.advance_wheel_speed(
                wheel,
                prior.wheel_speeds[i],
                patch_velocity,
                contacts[i].load,
                &k.surface,
                input,
                dt,
            );
            state.wheel_speeds[i] = ensure_finite(omega, Some(wheel), "wheel speed")?;
        }
        ensure_state_finite(&state)?;

        Ok(SubstepOutcome {
            state,
            contacts,
            kinematics,
            net_force,
            yaw_torque,
        })
    }

    fn wheel_kinematics<S: SurfaceModel + ?Sized>(
        &self,
        surface: &S,
        state: &VehicleState,
        steer: f64,
    ) -> SimResult<[WheelKinematics; 4]> {
        let spec = &self.spec;
        let body_velocity = state.body_velocity();
        let orientation = Rotation2::new(state.heading);
        let mut kinematics = [WheelKinematics {
            position: Vector2::zeros(),
            steer: 0.0,
            slip_ratio: 0.0,
            slip_angle: 0.0,
            surface: SurfaceSample::DRY_ASPHALT,
        }; 4];
        for wheel in WheelId::ALL {
            let position = spec.wheel_position(wheel);
            let steer = spec.wheel_steer_angle(wheel, steer);
            let velocity = contact_patch_velocity(body_velocity, state.yaw_rate, position, steer);
            let wheel_surface_speed = state.wheel_speeds[wheel.index()] * spec.tire_radius;
            let sample = surface.sample(state.position + orientation * position);
            ensure_finite(sample.friction, Some(wheel), "surface friction")?;
            ensure_finite(sample.slip_threshold_scale, Some(wheel), "surface slip threshold")?;
            ensure_finite(sample.condition, Some(wheel), "surface condition")?;
            kinematics[wheel.index()] = WheelKinematics {
                position,
                steer,
                slip_ratio: slip_ratio(wheel_surface_speed, velocity.x),
                slip_angle: slip_angle(velocity.x, velocity.y),
                surface: sample,
            };
        }
        Ok(kinematics)
    }

    /// Linearly implicit wheel spin update followed by the brake.
    ///
    /// The tire force slope against wheel speed stiffens the effective inertia, which keeps
    /// light wheels stable at large time steps. Brake torque only removes rotation, so a
    /// braked wheel stops at zero instead of reversing.
    fn advance_wheel_speed(
        &self,
        wheel: WheelId,
        omega: f64,
        patch_velocity: Vector2<f64>,
        load: f64,
        surface: &SurfaceSample,
        input: &DriverInput,
        dt: f64,
    ) -> f64 {
        let spec = &self.spec;
        let tire = spec.tire(wheel);
        let radius = spec.tire_radius;
        let alpha = slip_angle(patch_velocity.x, patch_velocity.y);
        let force_at = |omega: f64| {
            let kappa = slip_ratio(omega * radius, patch_velocity.x);
            tire_response(load, kappa, alpha, surface, tire).1.longitudinal
        };

        let reaction = force_at(omega);
        let slope = (force_at(omega + WHEEL_SPEED_PROBE) - force_at(omega - WHEEL_SPEED_PROBE))
            / (2.0 * WHEEL_SPEED_PROBE);
        let drive = spec.drivetrain.drive_torque(wheel, input.throttle);
        let effective_inertia = spec.wheel_inertia + dt * radius * slope.max(0.0);
        let spun = omega + dt * (drive - radius * reaction) / effective_inertia;

        let brake_delta = dt * spec.drivetrain.brake_torque(wheel, input.brake) / spec.wheel_inertia;
        if spun > 0.0 {
            (spun - brake_delta).max(0.0)
        } else {
            (spun + brake_delta).min(0.0)
        }
    }

    fn tire_state(&self, wheel: WheelId, outcome: &SubstepOutcome) -> TireState {
        let i = wheel.index();
        let contact = &outcome.contacts[i];
        let kinematics = &outcome.kinematics[i];
        let condition = &self.spec.tire(wheel).condition;
        TireState {
            slip_ratio: kinematics.slip_ratio,
            slip_angle: kinematics.slip_angle,
            normal_load: contact.load,
            grip: contact.grip,
            longitudinal_force: contact.force.longitudinal,
            lateral_force: contact.force.lateral,
            temperature: condition.temperature_c,
            pressure: condition.pressure_psi,
            wear: condition.wear,
        }
    }
}

/// Single-call step: validates `spec` and runs with the default solver settings.
pub fn step<S: SurfaceModel + ?Sized>(
    spec: &VehicleSpec,
    surface: &S,
    prior: &VehicleState,
    input: &DriverInput,
    dt: f64,
) -> SimResult<VehicleState> {
    VehicleDynamics::new(spec.clone(), SolverConfig::default())?.step(surface, prior, input, dt)
}

/// Velocity of a contact patch in its wheel frame (x along the wheel, y to its left).
fn contact_patch_velocity(
    body_velocity: Vector2<f64>,
    yaw_rate: f64,
    position: Vector2<f64>,
    steer: f64,
) -> Vector2<f64> {
    // v_patch = v_body + omega x r
    let chassis = Vector2::new(
        body_velocity.x - yaw_rate * position.y,
        body_velocity.y + yaw_rate * position.x,
    );
    Rotation2::new(steer).inverse() * chassis
}

fn tire_response(
    load: f64,
    slip_ratio: f64,
    slip_angle: f64,
    surface: &SurfaceSample,
    tire: &TireParams,
) -> (f64, TireForce) {
    let grip = compute_grip(load, slip_ratio, slip_angle, surface, tire);
    (grip, compute_force(grip, load, slip_ratio, slip_angle, tire))
}

fn ensure_state_finite(state: &VehicleState) -> SimResult<()> {
    ensure_finite(state.position.x, None, "position x")?;
    ensure_finite(state.position.y, None, "position y")?;
    ensure_finite(state.heading, None, "heading")?;
    ensure_finite(state.velocity.x, None, "velocity x")?;
    ensure_finite(state.velocity.y, None, "velocity y")?;
    ensure_finite(state.yaw_rate, None, "yaw rate")?;
    ensure_finite(state.acceleration.x, None, "acceleration x")?;
    ensure_finite(state.acceleration.y, None, "acceleration y")?;
    Ok(())
}
