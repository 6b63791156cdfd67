pub mod config;
pub mod dynamics;
pub mod grip;
pub mod load;
pub mod surface;
pub mod tire;
pub mod vehicle;

pub use config::VehicleConfig;
pub use dynamics::{step, InputOutOfRange, SolverConfig, StepReport, VehicleDynamics};
pub use grip::{compute_grip, ConditionEffect, TireCondition};
pub use load::{compute_loads, LoadClampPolicy};
pub use surface::{RoadSurface, RoadType, SurfaceGrid, TrackSurface, UniformSurface};
pub use tire::{compute_force, slip_angle, slip_ratio, TireForce, TireParams};
pub use vehicle::{DriveLayout, Drivetrain, VehicleSpec};
