use serde::{Deserialize, Serialize};
use simcore::{WheelId, GRAVITY};

use crate::vehicle::VehicleSpec;

/// What happens to load a wheel cannot carry (its transferred load would be negative).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadClampPolicy {
    /// Clamp at zero and drop the excess. The total can then exceed the vehicle weight.
    #[default]
    ClampOnly,
    /// Clamp at zero, then rescale the remaining loads back to the vehicle weight.
    Redistribute,
}

/// Per-wheel normal loads (N) from static shares plus longitudinal and lateral transfer.
///
/// `longitudinal_accel` > 0 shifts load rearward, `lateral_accel` > 0 (towards the
/// left) shifts load onto the right-hand wheels. Accelerations are body frame, m/s^2.
pub fn compute_loads(
    spec: &VehicleSpec,
    static_shares: &[f64; 4],
    longitudinal_accel: f64,
    lateral_accel: f64,
) -> [f64; 4] {
    let weight = spec.mass * GRAVITY;
    // Totals moved between axles and between sides; each wheel takes half.
    let longitudinal_transfer = spec.mass * longitudinal_accel * spec.cog_height / spec.wheelbase;
    let lateral_transfer = spec.mass * lateral_accel * spec.cog_height / spec.track_width;

    let mut loads = [0.0; 4];
    for wheel in WheelId::ALL {
        let axle = if wheel.is_front() { -0.5 } else { 0.5 };
        let side = if wheel.is_left() { -0.5 } else { 0.5 };
        let load = static_shares[wheel.index()] * weight
            + axle * longitudinal_transfer
            + side * lateral_transfer;
        // NaN stays NaN so the caller can report it
        loads[wheel.index()] = if load < 0.0 { 0.0 } else { load };
    }

    if spec.load_clamp_policy == LoadClampPolicy::Redistribute {
        let total: f64 = loads.iter().sum();
        if total > weight && total > 0.0 {
            let scale = weight / total;
            for load in &mut loads {
                *load *= scale;
            }
        }
    }
    loads
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn total(loads: &[f64; 4]) -> f64 {
        loads.iter().sum()
    }

    #[test]
    fn test_static_loads_follow_shares() {
        let spec = VehicleSpec::default();
        let loads = compute_loads(&spec, &spec.static_load_shares, 0.0, 0.0);
        for wheel in WheelId::ALL {
            assert_relative_eq!(
                loads[wheel.index()],
                spec.static_load_shares[wheel.index()] * spec.mass * GRAVITY,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_acceleration_shifts_load_rearward() {
        let spec = VehicleSpec::default();
        let rest = compute_loads(&spec, &spec.static_load_shares, 0.0, 0.0);
        let accel = compute_loads(&spec, &spec.static_load_shares, 4.0, 0.0);
        let brake = compute_loads(&spec, &spec.static_load_shares, -4.0, 0.0);

        let expected = 0.5 * spec.mass * 4.0 * spec.cog_height / spec.wheelbase;
        assert_relative_eq!(accel[WheelId::RL.index()] - rest[WheelId::RL.index()], expected, epsilon = 1e-9);
        assert_relative_eq!(rest[WheelId::FL.index()] - accel[WheelId::FL.index()], expected, epsilon = 1e-9);
        assert!(brake[WheelId::FR.index()] > rest[WheelId::FR.index()]);
        assert!(brake[WheelId::RR.index()] < rest[WheelId::RR.index()]);
    }

    #[test]
    fn test_cornering_loads_outside_wheels() {
        let spec = VehicleSpec::default();
        // Turning left: acceleration points left, right-hand wheels are outside.
        let loads = compute_loads(&spec, &spec.static_load_shares, 0.0, 6.0);
        assert!(loads[WheelId::FR.index()] > loads[WheelId::FL.index()]);
        assert!(loads[WheelId::RR.index()] > loads[WheelId::RL.index()]);
    }

    #[test]
    fn test_loads_conserve_weight_without_lift() {
        let spec = VehicleSpec::default();
        let weight = spec.mass * GRAVITY;
        for ax in [-8.0, -3.0, 0.0, 2.5, 6.0] {
            for ay in [-8.0, -1.0, 0.0, 4.0, 8.0] {
                let loads = compute_loads(&spec, &spec.static_load_shares, ax, ay);
                assert!(loads.iter().all(|&l| l > 0.0));
                assert_relative_eq!(total(&loads), weight, max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn test_extreme_transfer_clamps_without_redistribution() {
        let spec = VehicleSpec::default();
        let loads = compute_loads(&spec, &spec.static_load_shares, 0.0, 40.0);
        assert_eq!(loads[WheelId::FL.index()], 0.0);
        assert_eq!(loads[WheelId::RL.index()], 0.0);
        assert!(loads.iter().all(|&l| l >= 0.0));
        // Excess is lost, not redistributed
        assert!(total(&loads) > spec.mass * GRAVITY);
    }

    #[test]
    fn test_redistribute_policy_conserves_weight() {
        let spec = VehicleSpec {
            load_clamp_policy: LoadClampPolicy::Redistribute,
            ..VehicleSpec::default()
        };
        let weight = spec.mass * GRAVITY;
        for ax in [-60.0, 0.0, 60.0] {
            for ay in [-60.0, 0.0, 60.0] {
                let loads = compute_loads(&spec, &spec.static_load_shares, ax, ay);
                assert!(loads.iter().all(|&l| l >= 0.0));
                assert_relative_eq!(total(&loads), weight, max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn test_non_finite_acceleration_is_not_clamped_away() {
        let spec = VehicleSpec::default();
        let loads = compute_loads(&spec, &spec.static_load_shares, f64::NAN, 0.0);
        assert!(loads.iter().all(|load| load.is_nan()));
    }
}
