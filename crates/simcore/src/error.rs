use thiserror::Error;

use crate::WheelId;

pub type SimResult<T> = Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    /// Invalid vehicle or solver configuration. Fatal until corrected.
    #[error("invalid configuration `{field}`: {reason}")]
    Configuration { field: &'static str, reason: String },

    #[error("vehicle state field `{field}` is not finite")]
    InvalidState { field: &'static str },

    #[error("driver input `{field}` is not finite")]
    InvalidInput { field: &'static str },

    #[error("time step must be finite and positive, got {dt}")]
    InvalidTimeStep { dt: f64 },

    /// A NaN or infinite value appeared inside a step. Always a modelling defect.
    #[error("numeric divergence in {quantity}{} (value {value})", wheel_suffix(.wheel))]
    NumericDivergence {
        wheel: Option<WheelId>,
        quantity: &'static str,
        value: f64,
    },

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),
}

impl SimError {
    pub fn configuration(field: &'static str, reason: impl Into<String>) -> Self {
        SimError::Configuration { field, reason: reason.into() }
    }
}

fn wheel_suffix(wheel: &Option<WheelId>) -> String {
    match wheel {
        Some(w) => format!(" at wheel {w}"),
        None => String::new(),
    }
}

/// Passes `value` through when finite, otherwise reports which quantity diverged.
pub fn ensure_finite(value: f64, wheel: Option<WheelId>, quantity: &'static str) -> SimResult<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        log::error!("non-finite {quantity} ({value}) at {wheel:?}");
        Err(SimError::NumericDivergence { wheel, quantity, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divergence_message_names_wheel() {
        let err = ensure_finite(f64::NAN, Some(WheelId::RL), "longitudinal force").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("longitudinal force"));
        assert!(msg.contains("wheel RL"));
    }

    #[test]
    fn test_finite_value_passes_through() {
        assert_eq!(ensure_finite(2.5, None, "yaw torque").unwrap(), 2.5);
        assert!(matches!(
            ensure_finite(f64::INFINITY, None, "yaw torque"),
            Err(SimError::NumericDivergence { wheel: None, .. })
        ));
    }
}
