use std::fmt;

use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};

// Wheel layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WheelId {
    FL,
    FR,
    RL,
    RR,
}

impl WheelId {
    /// Every wheel in array index order.
    pub const ALL: [WheelId; 4] = [WheelId::FL, WheelId::FR, WheelId::RL, WheelId::RR];

    pub fn index(self) -> usize {
        match self {
            WheelId::FL => 0,
            WheelId::FR => 1,
            WheelId::RL => 2,
            WheelId::RR => 3,
        }
    }

    pub fn is_front(self) -> bool {
        matches!(self, WheelId::FL | WheelId::FR)
    }

    pub fn is_left(self) -> bool {
        matches!(self, WheelId::FL | WheelId::RL)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WheelId::FL => "FL",
            WheelId::FR => "FR",
            WheelId::RL => "RL",
            WheelId::RR => "RR",
        }
    }
}

impl fmt::Display for WheelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Tire diagnostics
/// Per-wheel tire quantities produced by one step. Rebuilt every step and never fed back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TireState {
    pub slip_ratio: f64,
    pub slip_angle: f64,
    pub normal_load: f64,
    pub grip: f64,
    pub longitudinal_force: f64,
    pub lateral_force: f64,
    // Pass-through placeholders, not evolved here.
    pub temperature: f64,
    pub pressure: f64,
    pub wear: f64,
}

// Vehicle state
/// Kinematic snapshot of one vehicle. The only value that crosses step boundaries.
///
/// Velocity is kept in the world frame; `acceleration` is the body-frame
/// acceleration estimate of the previous step and seeds the next load transfer solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub position: Vector2<f64>,
    pub elevation: f64,
    pub heading: f64,
    pub velocity: Vector2<f64>,
    pub yaw_rate: f64,
    pub wheel_speeds: [f64; 4],
    pub acceleration: Vector2<f64>,
}

impl Default for VehicleState {
    fn default() -> Self {
        VehicleState::at_rest(Vector2::zeros(), 0.0)
    }
}

impl VehicleState {
    pub fn at_rest(position: Vector2<f64>, heading: f64) -> Self {
        VehicleState {
            position,
            elevation: 0.0,
            heading,
            velocity: Vector2::zeros(),
            yaw_rate: 0.0,
            wheel_speeds: [0.0; 4],
            acceleration: Vector2::zeros(),
        }
    }

    /// Straight-line motion at `speed` along `heading` with every wheel rolling freely.
    pub fn rolling(speed: f64, heading: f64, tire_radius: f64) -> Self {
        let omega = if tire_radius > 0.0 { speed / tire_radius } else { 0.0 };
        VehicleState {
            velocity: Rotation2::new(heading) * Vector2::new(speed, 0.0),
            wheel_speeds: [omega; 4],
            ..VehicleState::at_rest(Vector2::zeros(), heading)
        }
    }

    /// Velocity expressed in the chassis frame (x forward, y left).
    pub fn body_velocity(&self) -> Vector2<f64> {
        Rotation2::new(self.heading).inverse() * self.velocity
    }

    pub fn speed(&self) -> f64 {
        self.velocity.norm()
    }

    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.elevation.is_finite()
            && self.heading.is_finite()
            && self.velocity.iter().all(|v| v.is_finite())
            && self.yaw_rate.is_finite()
            && self.wheel_speeds.iter().all(|v| v.is_finite())
            && self.acceleration.iter().all(|v| v.is_finite())
    }

    /// Name of the first non-finite field, if any.
    pub fn first_non_finite(&self) -> Option<&'static str> {
        if !self.position.iter().all(|v| v.is_finite()) {
            Some("position")
        } else if !self.elevation.is_finite() {
            Some("elevation")
        } else if !self.heading.is_finite() {
            Some("heading")
        } else if !self.velocity.iter().all(|v| v.is_finite()) {
            Some("velocity")
        } else if !self.yaw_rate.is_finite() {
            Some("yaw_rate")
        } else if !self.wheel_speeds.iter().all(|v| v.is_finite()) {
            Some("wheel_speeds")
        } else if !self.acceleration.iter().all(|v| v.is_finite()) {
            Some("acceleration")
        } else {
            None
        }
    }
}

// Driver input
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverInput {
    /// 0..1
    pub throttle: f64,
    /// 0..1
    pub brake: f64,
    /// Road-wheel steer angle in radians, positive turns left.
    pub steer: f64,
}

impl DriverInput {
    pub fn new(throttle: f64, brake: f64, steer: f64) -> Self {
        DriverInput { throttle, brake, steer }
    }
}

// Surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SurfaceTexture {
    /// Asphalt, concrete
    Sealed,
    /// Dirt, gravel, grass
    Loose,
    Ice,
}

/// Road properties under a single contact patch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSample {
    /// Friction multiplier applied to the tire's peak grip.
    pub friction: f64,
    /// Scales the slip at which grip peaks.
    pub slip_threshold_scale: f64,
    pub texture: SurfaceTexture,
    /// 0 is slippery, 1 is ideal.
    pub condition: f64,
}

impl SurfaceSample {
    /// Fallback used wherever no surface data exists.
    pub const DRY_ASPHALT: SurfaceSample = SurfaceSample {
        friction: 1.0,
        slip_threshold_scale: 1.0,
        texture: SurfaceTexture::Sealed,
        condition: 1.0,
    };
}

impl Default for SurfaceSample {
    fn default() -> Self {
        SurfaceSample::DRY_ASPHALT
    }
}

/// Road condition capability queried per wheel position. Must never fail.
pub trait SurfaceModel: Send + Sync {
    fn sample(&self, position: Vector2<f64>) -> SurfaceSample;
}

impl<S: SurfaceModel + ?Sized> SurfaceModel for &S {
    fn sample(&self, position: Vector2<f64>) -> SurfaceSample {
        (**self).sample(position)
    }
}

impl<S: SurfaceModel + ?Sized> SurfaceModel for Box<S> {
    fn sample(&self, position: Vector2<f64>) -> SurfaceSample {
        (**self).sample(position)
    }
}

/// Adapts a closure into a procedural surface.
#[derive(Debug, Clone, Copy)]
pub struct FnSurface<F>(pub F);

impl<F> SurfaceModel for FnSurface<F>
where
    F: Fn(Vector2<f64>) -> SurfaceSample + Send + Sync,
{
    fn sample(&self, position: Vector2<f64>) -> SurfaceSample {
        (self.0)(position)
    }
}
