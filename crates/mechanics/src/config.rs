use std::path::Path;

use serde::{Deserialize, Serialize};
use simcore::SimResult;

use crate::dynamics::{SolverConfig, VehicleDynamics};
use crate::vehicle::VehicleSpec;

/// Vehicle and solver settings as loaded from JSON. Missing fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    pub vehicle: VehicleSpec,
    pub solver: SolverConfig,
}

impl VehicleConfig {
    /// Parses and validates a configuration.
    pub fn from_json_str(json: &str) -> SimResult<Self> {
        let config: VehicleConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        log::debug!("loaded vehicle config from {}", path.display());
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> SimResult<()> {
        self.vehicle.validate()?;
        self.solver.validate()
    }

    pub fn into_dynamics(self) -> SimResult<VehicleDynamics> {
        VehicleDynamics::new(self.vehicle, self.solver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle::DriveLayout;
    use approx::assert_relative_eq;
    use simcore::{IntegratorKind, SimError};

    #[test]
    fn test_defaults_survive_json() {
        let defaults = VehicleConfig::default();
        let json = serde_json::to_string_pretty(&defaults).unwrap();
        let parsed = VehicleConfig::from_json_str(&json).unwrap();

        assert_eq!(parsed.solver.iterations, defaults.solver.iterations);
        assert_relative_eq!(parsed.solver.max_dt, defaults.solver.max_dt, max_relative = 1e-15);
        assert_relative_eq!(parsed.vehicle.mass, defaults.vehicle.mass);
        for (a, b) in parsed.vehicle.static_load_shares.iter().zip(&defaults.vehicle.static_load_shares) {
            assert_relative_eq!(*a, *b, max_relative = 1e-15);
        }
        assert_eq!(parsed.vehicle.tires[0].effects, defaults.vehicle.tires[0].effects);
        assert_eq!(parsed.vehicle.load_clamp_policy, defaults.vehicle.load_clamp_policy);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let json = r#"{
            "vehicle": {
                "mass": 1500.0,
                "drivetrain": {
                    "layout": { "awd": { "front_split": 0.4 } },
                    "max_drive_torque": 3000.0,
                    "max_brake_torque": 7000.0,
                    "brake_bias": 0.6
                }
            },
            "solver": { "integrator": "ExplicitEuler" }
        }"#;
        let config = VehicleConfig::from_json_str(json).unwrap();
        assert_eq!(config.vehicle.mass, 1500.0);
        assert_eq!(config.vehicle.drivetrain.layout, DriveLayout::Awd { front_split: 0.4 });
        assert_eq!(config.vehicle.wheelbase, VehicleSpec::default().wheelbase);
        assert_eq!(config.solver.integrator, IntegratorKind::ExplicitEuler);
        assert_eq!(config.solver.iterations, 4);
        assert!(config.into_dynamics().is_ok());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = VehicleConfig::from_json_str(r#"{ "solver": { "iterations": 0 } }"#).unwrap_err();
        assert!(matches!(err, SimError::Configuration { field: "solver.iterations", .. }));

        let err = VehicleConfig::from_json_str(r#"{ "vehicle": { "wheelbase": -1.0 } }"#).unwrap_err();
        assert!(matches!(err, SimError::Configuration { .. }));

        let err = VehicleConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, SimError::ConfigParse(_)));
    }

    #[test]
    fn test_from_path() {
        let path = std::env::temp_dir().join(format!("carsim-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "vehicle": { "tire_radius": 0.33 } }"#).unwrap();
        let config = VehicleConfig::from_path(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.vehicle.tire_radius, 0.33);

        let missing = VehicleConfig::from_path(std::env::temp_dir().join("carsim-no-such-config.json"));
        assert!(matches!(missing, Err(SimError::ConfigIo(_))));
    }
}
