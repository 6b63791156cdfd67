use serde::{Deserialize, Serialize};
use simcore::{SimError, SimResult};

use crate::grip::{ConditionEffect, TireCondition};

/// Below this forward speed (m/s) the slip denominators are floored.
pub const LOW_SPEED: f64 = 0.5;
/// Below this contact patch speed (m/s) the slip angle is defined as zero.
pub const STANDSTILL_SPEED: f64 = 1e-3;
/// Friction limits below this (N) produce no force.
const MIN_FORCE_LIMIT: f64 = 1e-9;

/// Grip curve and stiffness parameters of one tire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TireParams {
    /// Load (N) above which the grip coefficient starts to fall.
    pub reference_load: f64,
    /// Exponent of the load-sensitivity falloff, 0 = insensitive.
    pub load_sensitivity: f64,
    /// Peak friction coefficient on an ideal (friction 1.0) surface.
    pub peak_grip: f64,
    /// Slip ratio at which grip peaks.
    pub peak_slip_ratio: f64,
    /// Slip angle (rad) at which grip peaks.
    pub peak_slip_angle: f64,
    /// Fraction of peak grip left at full slide.
    pub sliding_grip_ratio: f64,
    /// N per unit slip ratio.
    pub longitudinal_stiffness: f64,
    /// N per radian of slip angle.
    pub cornering_stiffness: f64,
    pub condition: TireCondition,
    pub effects: Vec<ConditionEffect>,
}

impl Default for TireParams {
    fn default() -> Self {
        TireParams {
            reference_load: 4000.0,
            load_sensitivity: 0.4,
            peak_grip: 1.1,
            peak_slip_ratio: 0.12,
            peak_slip_angle: 0.15,
            sliding_grip_ratio: 0.75,
            longitudinal_stiffness: 80_000.0,
            cornering_stiffness: 60_000.0,
            condition: TireCondition::default(),
            effects: ConditionEffect::standard_set(),
        }
    }
}

impl TireParams {
    pub fn validate(&self) -> SimResult<()> {
        positive("tire.reference_load", self.reference_load)?;
        positive("tire.peak_grip", self.peak_grip)?;
        positive("tire.peak_slip_ratio", self.peak_slip_ratio)?;
        positive("tire.peak_slip_angle", self.peak_slip_angle)?;
        positive("tire.longitudinal_stiffness", self.longitudinal_stiffness)?;
        positive("tire.cornering_stiffness", self.cornering_stiffness)?;
        unit_interval("tire.load_sensitivity", self.load_sensitivity)?;
        unit_interval("tire.sliding_grip_ratio", self.sliding_grip_ratio)?;
        for effect in &self.effects {
            effect.validate()?;
        }
        self.condition.validate()
    }
}

pub(crate) fn positive(field: &'static str, value: f64) -> SimResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::configuration(field, format!("must be finite and positive, got {value}")))
    }
}

pub(crate) fn unit_interval(field: &'static str, value: f64) -> SimResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(SimError::configuration(field, format!("must lie in [0, 1], got {value}")))
    }
}

/// Slip ratio from wheel surface speed (omega * r) and the contact patch's forward speed.
///
/// Normalised by the larger of the two speeds so it stays within [-1, 1]; a locked
/// wheel at speed is exactly -1. The low-speed floor keeps it finite at standstill.
pub fn slip_ratio(wheel_surface_speed: f64, v_long: f64) -> f64 {
    let denominator = v_long.abs().max(wheel_surface_speed.abs()).max(LOW_SPEED);
    ((wheel_surface_speed - v_long) / denominator).clamp(-1.0, 1.0)
}

/// Angle between wheel heading and contact patch velocity. Positive = sliding left.
pub fn slip_angle(v_long: f64, v_lat: f64) -> f64 {
    if v_long.hypot(v_lat) < STANDSTILL_SPEED {
        return 0.0;
    }
    v_lat.atan2(v_long.abs().max(LOW_SPEED))
}

/// Force at the contact patch, in the wheel frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TireForce {
    pub longitudinal: f64,
    pub lateral: f64,
}

impl TireForce {
    pub const ZERO: TireForce = TireForce { longitudinal: 0.0, lateral: 0.0 };

    pub fn magnitude(&self) -> f64 {
        self.longitudinal.hypot(self.lateral)
    }
}

/// Tire reaction force bounded by the friction circle.
///
/// Each axis follows `L * tanh(C * slip / L)`: linear in slip with slope `C` and
/// asymptotic to the limit `L = grip * load`. Lateral force opposes the slip angle.
pub fn compute_force(grip: f64, load: f64, slip_ratio: f64, slip_angle: f64, params: &TireParams) -> TireForce {
    let limit = grip * load;
    if !(load > 0.0 && limit > MIN_FORCE_LIMIT) {
        return TireForce::ZERO;
    }

    let longitudinal = limit * (params.longitudinal_stiffness * slip_ratio / limit).tanh();
    let lateral = -limit * (params.cornering_stiffness * slip_angle / limit).tanh();

    scale_to_friction_circle(longitudinal, lateral, limit)
}

/// Scales both axes by one shared factor so the resultant never exceeds `limit`.
fn scale_to_friction_circle(longitudinal: f64, lateral: f64, limit: f64) -> TireForce {
    let combined = longitudinal.hypot(lateral);
    if combined > limit {
        let scale = limit / combined;
        TireForce {
            longitudinal: longitudinal * scale,
            lateral: lateral * scale,
        }
    } else {
        TireForce { longitudinal, lateral }
    }
}
