//! Tire grip - available friction coefficient at the contact patch
//!
//! The grip coefficient is the surface friction ceiling shaped by:
//! - a load-sensitivity curve (saturation above a reference load)
//! - a unimodal combined-slip curve (zero at zero slip, peak, then falloff)
//! - multiplicative condition effects (temperature, wear, pressure, camber, tread)
//!
//! Condition effects read a `TireCondition` that this crate never evolves. Every
//! effect evaluates to exactly 1.0 at the nominal condition.

use serde::{Deserialize, Serialize};
use simcore::{interpolate_curve, SimError, SimResult, SurfaceSample, SurfaceTexture};

use crate::tire::TireParams;

const REFERENCE_TIRE_WIDTH_MM: f64 = 305.0;
const REFERENCE_OPTIMAL_PRESSURE_PSI: f64 = 28.0;
const OPTIMAL_CAMBER_FOR_REFERENCE_TIRE_DEG: f64 = -3.5;

/// Lower edge of the optimal temperature window (deg C) by compound hardness.
const HARDNESS_TO_TEMP_LOW: [(f64, f64); 8] = [
    (0.0, 45.0),
    (0.4, 55.0),
    (0.5, 75.0),
    (0.6, 80.0),
    (0.7, 80.0),
    (0.8, 85.0),
    (0.9, 85.0),
    (1.0, 85.0),
];

/// Upper edge of the optimal temperature window (deg C) by compound hardness.
const HARDNESS_TO_TEMP_HIGH: [(f64, f64); 8] = [
    (0.0, 65.0),
    (0.4, 75.0),
    (0.5, 105.0),
    (0.6, 105.0),
    (0.7, 110.0),
    (0.8, 115.0),
    (0.9, 120.0),
    (1.0, 120.0),
];

const WEAR_TO_GRIP: [(f64, f64); 11] = [
    (0.0, 1.0),
    (0.1, 0.95),
    (0.2, 0.9),
    (0.3, 0.82),
    (0.4, 0.75),
    (0.5, 0.6),
    (0.6, 0.5),
    (0.7, 0.2),
    (0.8, 0.08),
    (0.9, 0.03),
    (1.0, 0.0),
];

/// Physical tire condition. Placeholders for future thermal/wear/pressure dynamics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TireCondition {
    pub temperature_c: f64,
    pub pressure_psi: f64,
    /// 0 = new, 1 = worn out
    pub wear: f64,
    pub camber_deg: f64,
    /// 0 = soft, 1 = hard
    pub hardness: f64,
    pub width_mm: f64,
    /// 0 = slick, 1 = full tread
    pub tread: f64,
}

impl Default for TireCondition {
    fn default() -> Self {
        TireCondition {
            temperature_c: 90.0,
            pressure_psi: REFERENCE_OPTIMAL_PRESSURE_PSI,
            wear: 0.0,
            camber_deg: OPTIMAL_CAMBER_FOR_REFERENCE_TIRE_DEG,
            hardness: 0.5,
            width_mm: REFERENCE_TIRE_WIDTH_MM,
            tread: 0.0,
        }
    }
}

impl TireCondition {
    pub fn validate(&self) -> SimResult<()> {
        let finite = [
            ("tire.condition.temperature_c", self.temperature_c),
            ("tire.condition.camber_deg", self.camber_deg),
        ];
        for (field, value) in finite {
            if !value.is_finite() {
                return Err(SimError::configuration(field, "must be finite"));
            }
        }
        crate::tire::positive("tire.condition.pressure_psi", self.pressure_psi)?;
        crate::tire::positive("tire.condition.width_mm", self.width_mm)?;
        crate::tire::unit_interval("tire.condition.wear", self.wear)?;
        crate::tire::unit_interval("tire.condition.hardness", self.hardness)?;
        crate::tire::unit_interval("tire.condition.tread", self.tread)
    }
}

/// A multiplicative grip modifier driven by the tire condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionEffect {
    /// Optimal window from compound hardness; cubic falloff when cold or overheated.
    Temperature,
    /// Piecewise-linear wear -> grip curve.
    Wear { curve: Vec<(f64, f64)> },
    /// `(optimal / pressure)^exponent`
    Pressure { optimal_psi: f64, exponent: f64 },
    /// Exponential decay away from the width-adjusted optimal camber.
    Camber { optimal_deg: f64, falloff_deg: f64 },
    /// Tread helps on wet sealed roads and loose ground, costs grip on dry tarmac.
    Tread,
}

impl ConditionEffect {
    /// All effects with their reference constants.
    pub fn standard_set() -> Vec<ConditionEffect> {
        vec![
            ConditionEffect::Temperature,
            ConditionEffect::Wear { curve: WEAR_TO_GRIP.to_vec() },
            ConditionEffect::Pressure {
                optimal_psi: REFERENCE_OPTIMAL_PRESSURE_PSI,
                exponent: 0.7,
            },
            ConditionEffect::Camber {
                optimal_deg: OPTIMAL_CAMBER_FOR_REFERENCE_TIRE_DEG,
                falloff_deg: 5.0,
            },
            ConditionEffect::Tread,
        ]
    }

    pub fn factor(&self, condition: &TireCondition, surface: &SurfaceSample) -> f64 {
        let factor = match self {
            ConditionEffect::Temperature => temperature_factor(condition.temperature_c, condition.hardness),
            ConditionEffect::Wear { curve } => interpolate_curve(condition.wear.clamp(0.0, 1.0), curve),
            ConditionEffect::Pressure { optimal_psi, exponent } => {
                (optimal_psi / at_least(condition.pressure_psi, 1.0)).powf(*exponent)
            }
            ConditionEffect::Camber { optimal_deg, falloff_deg } => {
                let width_adjustment =
                    0.05 * (condition.width_mm - REFERENCE_TIRE_WIDTH_MM) / REFERENCE_TIRE_WIDTH_MM;
                let optimal = optimal_deg + width_adjustment;
                (-(condition.camber_deg - optimal).abs() / at_least(*falloff_deg, f64::EPSILON)).exp()
            }
            ConditionEffect::Tread => tread_factor(condition.tread, surface),
        };
        at_least(factor, 0.0)
    }

    pub fn validate(&self) -> SimResult<()> {
        match self {
            ConditionEffect::Temperature | ConditionEffect::Tread => Ok(()),
            ConditionEffect::Wear { curve } => {
                if curve.is_empty() {
                    return Err(SimError::configuration("tire.effects.wear.curve", "must not be empty"));
                }
                if curve.iter().any(|(x, y)| !(x.is_finite() && y.is_finite())) {
                    return Err(SimError::configuration("tire.effects.wear.curve", "points must be finite"));
                }
                if curve.windows(2).any(|pair| pair[1].0 < pair[0].0) {
                    return Err(SimError::configuration("tire.effects.wear.curve", "must be sorted by wear"));
                }
                Ok(())
            }
            ConditionEffect::Pressure { optimal_psi, exponent } => {
                crate::tire::positive("tire.effects.pressure.optimal_psi", *optimal_psi)?;
                crate::tire::positive("tire.effects.pressure.exponent", *exponent)
            }
            ConditionEffect::Camber { optimal_deg, falloff_deg } => {
                if !optimal_deg.is_finite() {
                    return Err(SimError::configuration("tire.effects.camber.optimal_deg", "must be finite"));
                }
                crate::tire::positive("tire.effects.camber.falloff_deg", *falloff_deg)
            }
        }
    }
}

/// `value`, or `floor` when below it. Unlike `f64::max`, NaN passes through.
fn at_least(value: f64, floor: f64) -> f64 {
    if value < floor { floor } else { value }
}

fn temperature_factor(temperature_c: f64, hardness: f64) -> f64 {
    let low = interpolate_curve(hardness, &HARDNESS_TO_TEMP_LOW);
    let high = interpolate_curve(hardness, &HARDNESS_TO_TEMP_HIGH);
    if temperature_c < low {
        (at_least(temperature_c, 0.0) / low).powi(3)
    } else if temperature_c > high {
        let overheating = (temperature_c - high) / (high - low);
        (1.0 - overheating).clamp(0.0, 1.0).powi(3)
    } else {
        1.0
    }
}

fn tread_factor(tread: f64, surface: &SurfaceSample) -> f64 {
    let tread = tread.clamp(0.0, 1.0);
    match surface.texture {
        SurfaceTexture::Sealed => {
            let x = surface.condition - 0.5;
            1.0 - tread.sqrt() * x.signum() * x.abs().sqrt()
        }
        SurfaceTexture::Loose => 1.0 + 0.5 * tread,
        SurfaceTexture::Ice => 1.0,
    }
}

/// Highest grip coefficient this tire can reach on `surface`.
pub fn friction_ceiling(surface: &SurfaceSample, params: &TireParams) -> f64 {
    at_least(surface.friction, 0.0) * params.peak_grip
}

/// 1 up to the reference load, then `(reference / load)^sensitivity`.
pub fn load_factor(load: f64, params: &TireParams) -> f64 {
    if load <= params.reference_load {
        1.0
    } else {
        (params.reference_load / load).powf(params.load_sensitivity)
    }
}

/// Weighted Euclidean slip magnitude, 1.0 at the (surface-scaled) peak.
pub fn combined_slip(slip_ratio: f64, slip_angle: f64, surface: &SurfaceSample, params: &TireParams) -> f64 {
    let threshold = at_least(surface.slip_threshold_scale, f64::EPSILON);
    (slip_ratio / (params.peak_slip_ratio * threshold)).hypot(slip_angle / (params.peak_slip_angle * threshold))
}

/// Unimodal slip response: 0 at no slip, 1 at the peak, settling to `sliding_ratio`.
pub fn slip_factor(combined_slip: f64, sliding_ratio: f64) -> f64 {
    let x = combined_slip.abs();
    let rise = 2.0 * x / (1.0 + x * x);
    if x <= 1.0 {
        rise
    } else {
        sliding_ratio + (1.0 - sliding_ratio) * rise
    }
}

/// Product of the tire's condition effects.
pub fn condition_factor(params: &TireParams, surface: &SurfaceSample) -> f64 {
    params
        .effects
        .iter()
        .map(|effect| effect.factor(&params.condition, surface))
        .product()
}

/// Grip coefficient available at the contact patch, clamped to [0, friction ceiling].
///
/// Non-finite surface or condition values come out as NaN for the caller to report.
pub fn compute_grip(
    load: f64,
    slip_ratio: f64,
    slip_angle: f64,
    surface: &SurfaceSample,
    params: &TireParams,
) -> f64 {
    let ceiling = friction_ceiling(surface, params);
    let grip = ceiling
        * load_factor(at_least(load, 0.0), params)
        * slip_factor(combined_slip(slip_ratio, slip_angle, surface, params), params.sliding_grip_ratio)
        * condition_factor(params, surface);
    if grip > ceiling { ceiling } else { at_least(grip, 0.0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn peak_slip(params: &TireParams) -> f64 {
        params.peak_slip_ratio
    }

    #[test]
    fn test_nominal_condition_is_neutral() {
        let params = TireParams::default();
        for effect in &params.effects {
            assert_eq!(effect.factor(&params.condition, &SurfaceSample::DRY_ASPHALT), 1.0, "{effect:?}");
        }
        assert_eq!(condition_factor(&params, &SurfaceSample::DRY_ASPHALT), 1.0);
    }

    #[test]
    fn test_peak_grip_at_peak_slip() {
        let params = TireParams::default();
        let grip = compute_grip(3000.0, peak_slip(&params), 0.0, &SurfaceSample::DRY_ASPHALT, &params);
        assert_relative_eq!(grip, params.peak_grip, epsilon = 1e-12);
    }

    #[test]
    fn test_slip_curve_is_unimodal() {
        let params = TireParams::default();
        let surface = SurfaceSample::DRY_ASPHALT;
        let grip_at = |kappa: f64| compute_grip(3000.0, kappa, 0.0, &surface, &params);

        assert_eq!(grip_at(0.0), 0.0);
        let mut previous = 0.0;
        let mut kappa = 0.0;
        while kappa < peak_slip(&params) {
            kappa += 0.001;
            let grip = grip_at(kappa.min(peak_slip(&params)));
            assert!(grip >= previous);
            previous = grip;
        }
        for k in [0.2, 0.4, 0.7, 1.0] {
            let grip = grip_at(k);
            assert!(grip < previous);
            assert!(grip > params.sliding_grip_ratio * params.peak_grip);
            previous = grip;
        }
    }

    #[test]
    fn test_grip_continuous_across_zero_slip() {
        let params = TireParams::default();
        let surface = SurfaceSample::DRY_ASPHALT;
        let mut previous = compute_grip(3000.0, -0.01, 0.0, &surface, &params);
        for i in -999..=1000 {
            let kappa = i as f64 * 1e-5;
            let grip = compute_grip(3000.0, kappa, 0.5 * kappa, &surface, &params);
            // Slope of the rise is bounded by 2 * peak / peak_slip per unit combined slip
            assert!((grip - previous).abs() < 0.01, "jump at kappa={kappa}");
            previous = grip;
        }
    }

    #[test]
    fn test_grip_continuous_across_zero_load() {
        let params = TireParams::default();
        let surface = SurfaceSample::DRY_ASPHALT;
        let at_zero = compute_grip(0.0, 0.1, 0.05, &surface, &params);
        let mut previous = compute_grip(-10.0, 0.1, 0.05, &surface, &params);
        assert_eq!(previous, at_zero);
        for i in 0..=20_000 {
            let load = i as f64 * 0.5;
            let grip = compute_grip(load, 0.1, 0.05, &surface, &params);
            assert!((grip - previous).abs() < 1e-3, "jump at load={load}");
            assert!(grip <= previous + 1e-15, "load sensitivity must not increase grip");
            previous = grip;
        }
    }

    #[test]
    fn test_load_sensitivity_reduces_grip_above_reference() {
        let params = TireParams::default();
        assert_eq!(load_factor(params.reference_load, &params), 1.0);
        assert_relative_eq!(
            load_factor(2.0 * params.reference_load, &params),
            0.5f64.powf(params.load_sensitivity),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_combined_slip_degrades_total_grip() {
        let params = TireParams::default();
        let surface = SurfaceSample::DRY_ASPHALT;
        let pure = compute_grip(3000.0, params.peak_slip_ratio, 0.0, &surface, &params);
        let combined = compute_grip(3000.0, params.peak_slip_ratio, params.peak_slip_angle, &surface, &params);
        assert!(combined < pure);
    }

    #[test]
    fn test_grip_clamped_to_surface_ceiling() {
        let mut params = TireParams::default();
        params.condition.pressure_psi = 14.0; // underinflated factor > 1
        let ice = SurfaceSample { friction: 0.1, ..SurfaceSample::DRY_ASPHALT };
        for kappa in [0.05, 0.12, 0.5] {
            let grip = compute_grip(2000.0, kappa, 0.0, &ice, &params);
            assert!((0.0..=friction_ceiling(&ice, &params)).contains(&grip));
        }
        let peak = compute_grip(2000.0, params.peak_slip_ratio, 0.0, &ice, &params);
        assert_relative_eq!(peak, friction_ceiling(&ice, &params), epsilon = 1e-12);
    }

    #[test]
    fn test_condition_effects_move_away_from_nominal() {
        let surface = SurfaceSample::DRY_ASPHALT;
        let cold = TireCondition { temperature_c: 37.5, ..TireCondition::default() };
        assert_relative_eq!(ConditionEffect::Temperature.factor(&cold, &surface), 0.125, epsilon = 1e-12);

        let worn = TireCondition { wear: 0.5, ..TireCondition::default() };
        let wear = ConditionEffect::Wear { curve: WEAR_TO_GRIP.to_vec() };
        assert_relative_eq!(wear.factor(&worn, &surface), 0.6, epsilon = 1e-12);

        let cambered = TireCondition { camber_deg: 1.5, ..TireCondition::default() };
        let camber = ConditionEffect::Camber { optimal_deg: -3.5, falloff_deg: 5.0 };
        assert_relative_eq!(camber.factor(&cambered, &surface), (-1.0f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_non_finite_surface_is_not_masked() {
        let params = TireParams::default();
        let broken = SurfaceSample { friction: f64::NAN, ..SurfaceSample::DRY_ASPHALT };
        assert!(compute_grip(3000.0, 0.1, 0.05, &broken, &params).is_nan());

        let broken = SurfaceSample { slip_threshold_scale: f64::NAN, ..SurfaceSample::DRY_ASPHALT };
        assert!(compute_grip(3000.0, 0.1, 0.05, &broken, &params).is_nan());

        let broken = SurfaceSample { condition: f64::NAN, ..SurfaceSample::DRY_ASPHALT };
        let treaded = TireCondition { tread: 1.0, ..TireCondition::default() };
        assert!(ConditionEffect::Tread.factor(&treaded, &broken).is_nan());
    }

    #[test]
    fn test_effect_validation() {
        for effect in ConditionEffect::standard_set() {
            assert!(effect.validate().is_ok(), "{effect:?}");
        }
        let rejected = [
            (ConditionEffect::Pressure { optimal_psi: -28.0, exponent: 0.7 }, "tire.effects.pressure.optimal_psi"),
            (ConditionEffect::Pressure { optimal_psi: 28.0, exponent: f64::NAN }, "tire.effects.pressure.exponent"),
            (ConditionEffect::Camber { optimal_deg: -3.5, falloff_deg: 0.0 }, "tire.effects.camber.falloff_deg"),
            (ConditionEffect::Camber { optimal_deg: f64::INFINITY, falloff_deg: 5.0 }, "tire.effects.camber.optimal_deg"),
            (ConditionEffect::Wear { curve: Vec::new() }, "tire.effects.wear.curve"),
            (ConditionEffect::Wear { curve: vec![(0.5, 0.6), (0.0, 1.0)] }, "tire.effects.wear.curve"),
            (ConditionEffect::Wear { curve: vec![(0.0, f64::NAN), (1.0, 0.0)] }, "tire.effects.wear.curve"),
        ];
        for (effect, expected) in rejected {
            match effect.validate() {
                Err(SimError::Configuration { field, .. }) => assert_eq!(field, expected, "{effect:?}"),
                other => panic!("{effect:?} gave {other:?}"),
            }
        }
    }

    #[test]
    fn test_tread_helps_on_loose_and_wet() {
        let treaded = TireCondition { tread: 1.0, ..TireCondition::default() };
        let gravel = SurfaceSample {
            texture: SurfaceTexture::Loose,
            ..SurfaceSample::DRY_ASPHALT
        };
        assert_relative_eq!(ConditionEffect::Tread.factor(&treaded, &gravel), 1.5, epsilon = 1e-12);

        let wet = SurfaceSample { condition: 0.25, ..SurfaceSample::DRY_ASPHALT };
        assert!(ConditionEffect::Tread.factor(&treaded, &wet) > 1.0);
        assert!(ConditionEffect::Tread.factor(&treaded, &SurfaceSample::DRY_ASPHALT) < 1.0);
    }
}
