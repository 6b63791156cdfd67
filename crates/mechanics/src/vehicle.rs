use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use simcore::{SimError, SimResult, WheelId};

use crate::load::LoadClampPolicy;
use crate::tire::{positive, unit_interval, TireParams};

/// Which axles receive drive torque.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveLayout {
    Rwd,
    Fwd,
    /// Fraction of drive torque sent to the front axle.
    Awd { front_split: f64 },
}

impl DriveLayout {
    pub fn front_fraction(&self) -> f64 {
        match self {
            DriveLayout::Rwd => 0.0,
            DriveLayout::Fwd => 1.0,
            DriveLayout::Awd { front_split } => *front_split,
        }
    }
}

/// Drive and brake torque capacity at the wheels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Drivetrain {
    pub layout: DriveLayout,
    /// Total drive torque at the wheels at full throttle (N*m).
    pub max_drive_torque: f64,
    /// Total brake torque at full brake (N*m).
    pub max_brake_torque: f64,
    /// Fraction of brake torque on the front axle.
    pub brake_bias: f64,
}

impl Default for Drivetrain {
    fn default() -> Self {
        Drivetrain {
            layout: DriveLayout::Rwd,
            max_drive_torque: 2400.0,
            max_brake_torque: 6000.0,
            brake_bias: 0.65,
        }
    }
}

impl Drivetrain {
    /// Drive torque on `wheel` for a throttle in [0, 1].
    pub fn drive_torque(&self, wheel: WheelId, throttle: f64) -> f64 {
        let axle_fraction = if wheel.is_front() {
            self.layout.front_fraction()
        } else {
            1.0 - self.layout.front_fraction()
        };
        0.5 * axle_fraction * self.max_drive_torque * throttle
    }

    /// Brake torque magnitude on `wheel` for a brake input in [0, 1].
    pub fn brake_torque(&self, wheel: WheelId, brake: f64) -> f64 {
        let axle_fraction = if wheel.is_front() { self.brake_bias } else { 1.0 - self.brake_bias };
        0.5 * axle_fraction * self.max_brake_torque * brake
    }
}

/// Immutable physical description of one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleSpec {
    /// kg
    pub mass: f64,
    /// Yaw moment of inertia (kg*m^2).
    pub yaw_inertia: f64,
    /// Centre of gravity height above ground (m).
    pub cog_height: f64,
    /// Distance the centre of gravity sits ahead of the wheelbase midpoint (m).
    pub cog_longitudinal_offset: f64,
    pub track_width: f64,
    pub wheelbase: f64,
    /// Fraction of weight on each wheel at rest, indexed by `WheelId`. Sums to 1.
    pub static_load_shares: [f64; 4],
    pub tire_radius: f64,
    /// Rotational inertia of one wheel about its axle (kg*m^2).
    pub wheel_inertia: f64,
    /// Road-wheel angle limit (rad).
    pub max_steer_angle: f64,
    /// Rear steer angle as a fraction of front steer, opposite phase. 0 disables.
    pub rear_steer_ratio: f64,
    pub drivetrain: Drivetrain,
    pub tires: [TireParams; 4],
    pub load_clamp_policy: LoadClampPolicy,
}

impl Default for VehicleSpec {
    fn default() -> Self {
        let wheelbase = 2.6;
        let cog_longitudinal_offset = 0.1;
        VehicleSpec {
            mass: 1200.0,
            yaw_inertia: 1800.0,
            cog_height: 0.5,
            cog_longitudinal_offset,
            track_width: 1.55,
            wheelbase,
            static_load_shares: static_shares_from_geometry(wheelbase, cog_longitudinal_offset),
            tire_radius: 0.31,
            wheel_inertia: 1.2,
            max_steer_angle: 0.6,
            rear_steer_ratio: 0.0,
            drivetrain: Drivetrain::default(),
            tires: std::array::from_fn(|_| TireParams::default()),
            load_clamp_policy: LoadClampPolicy::default(),
        }
    }
}

/// Static shares implied by the CoG position: each axle carries the other axle's lever arm.
pub fn static_shares_from_geometry(wheelbase: f64, cog_longitudinal_offset: f64) -> [f64; 4] {
    let to_front = 0.5 * wheelbase - cog_longitudinal_offset;
    let front = 0.5 * (1.0 - to_front / wheelbase);
    let rear = 0.5 - front;
    [front, front, rear, rear]
}

const SHARE_SUM_TOLERANCE: f64 = 1e-9;

impl VehicleSpec {
    pub fn validate(&self) -> SimResult<()> {
        positive("mass", self.mass)?;
        positive("yaw_inertia", self.yaw_inertia)?;
        positive("track_width", self.track_width)?;
        positive("wheelbase", self.wheelbase)?;
        positive("tire_radius", self.tire_radius)?;
        positive("wheel_inertia", self.wheel_inertia)?;
        if !(self.cog_height.is_finite() && self.cog_height >= 0.0) {
            return Err(SimError::configuration("cog_height", "must be finite and non-negative"));
        }
        if !(self.cog_longitudinal_offset.abs() < 0.5 * self.wheelbase) {
            return Err(SimError::configuration(
                "cog_longitudinal_offset",
                "centre of gravity must lie between the axles",
            ));
        }
        if !(self.max_steer_angle > 0.0 && self.max_steer_angle < std::f64::consts::FRAC_PI_2) {
            return Err(SimError::configuration("max_steer_angle", "must lie in (0, pi/2)"));
        }
        unit_interval("rear_steer_ratio", self.rear_steer_ratio)?;

        for share in self.static_load_shares {
            unit_interval("static_load_shares", share)?;
        }
        let share_sum: f64 = self.static_load_shares.iter().sum();
        if (share_sum - 1.0).abs() > SHARE_SUM_TOLERANCE {
            return Err(SimError::configuration(
                "static_load_shares",
                format!("must sum to 1, got {share_sum}"),
            ));
        }

        let drivetrain = &self.drivetrain;
        if !(drivetrain.max_drive_torque.is_finite() && drivetrain.max_drive_torque >= 0.0) {
            return Err(SimError::configuration("drivetrain.max_drive_torque", "must be finite and non-negative"));
        }
        if !(drivetrain.max_brake_torque.is_finite() && drivetrain.max_brake_torque >= 0.0) {
            return Err(SimError::configuration("drivetrain.max_brake_torque", "must be finite and non-negative"));
        }
        unit_interval("drivetrain.brake_bias", drivetrain.brake_bias)?;
        unit_interval("drivetrain.layout.front_split", drivetrain.layout.front_fraction())?;

        for tire in &self.tires {
            tire.validate()?;
        }
        Ok(())
    }

    pub fn weight(&self) -> f64 {
        self.mass * simcore::GRAVITY
    }

    /// Contact patch position relative to the CoG in the chassis frame (x forward, y left).
    pub fn wheel_position(&self, wheel: WheelId) -> Vector2<f64> {
        let x = if wheel.is_front() {
            0.5 * self.wheelbase - self.cog_longitudinal_offset
        } else {
            -(0.5 * self.wheelbase + self.cog_longitudinal_offset)
        };
        let y = if wheel.is_left() { 0.5 * self.track_width } else { -0.5 * self.track_width };
        Vector2::new(x, y)
    }

    /// Road-wheel steer angle for an already clamped steering input.
    pub fn wheel_steer_angle(&self, wheel: WheelId, steer: f64) -> f64 {
        if wheel.is_front() {
            steer
        } else {
            -self.rear_steer_ratio * steer
        }
    }

    pub fn tire(&self, wheel: WheelId) -> &TireParams {
        &self.tires[wheel.index()]
    }
}
