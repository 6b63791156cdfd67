pub mod curve;
pub mod error;
pub mod integrators;
pub mod traits;

pub use curve::interpolate_curve;
pub use error::{ensure_finite, SimError, SimResult};
pub use integrators::{
    ChassisAcceleration, ExplicitEuler, FixedTimestepAccumulator, Integrator, IntegratorKind,
    SemiImplicitEuler, SubstepPlan,
};
pub use traits::*;

/// Standard gravity (m/s^2).
pub const GRAVITY: f64 = 9.81;
