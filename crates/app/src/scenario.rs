use std::path::Path;

use mechanics::{RoadSurface, StepReport, UniformSurface, VehicleConfig};
use serde::{Deserialize, Serialize};
use simcore::{DriverInput, FixedTimestepAccumulator, SimError, SimResult, TireState, VehicleState};

/// Driver inputs held constant for `duration` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct InputFrame {
    pub duration: f64,
    #[serde(default)]
    pub throttle: f64,
    #[serde(default)]
    pub brake: f64,
    #[serde(default)]
    pub steer: f64,
}

/// A replayable drive: vehicle, road, start state and the input timeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub config: VehicleConfig,
    pub road: RoadSurface,
    pub initial_state: VehicleState,
    /// Fixed step the timeline is cut into (s).
    pub step_dt: f64,
    pub frames: Vec<InputFrame>,
}

impl Default for Scenario {
    fn default() -> Self {
        Scenario {
            config: VehicleConfig::default(),
            road: RoadSurface::default(),
            initial_state: VehicleState::default(),
            step_dt: 0.01,
            frames: Vec::new(),
        }
    }
}

/// One output line.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub step: u64,
    pub time: f64,
    pub state: VehicleState,
    pub speed: f64,
    pub tires: [TireState; 4],
    pub centripetal_force: f64,
}

impl Snapshot {
    fn new(step: u64, time: f64, report: &StepReport) -> Self {
        Snapshot {
            step,
            time,
            state: report.state,
            speed: report.state.speed(),
            tires: report.tires,
            centripetal_force: report.centripetal_force,
        }
    }
}

impl Scenario {
    pub fn from_json_str(json: &str) -> SimResult<Self> {
        let scenario: Scenario = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn from_path(path: impl AsRef<Path>) -> SimResult<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    fn validate(&self) -> SimResult<()> {
        self.config.validate()?;
        self.road.validate()?;
        if !(self.step_dt.is_finite() && self.step_dt > 0.0) {
            return Err(SimError::InvalidTimeStep { dt: self.step_dt });
        }
        if self.frames.iter().any(|frame| !(frame.duration.is_finite() && frame.duration >= 0.0)) {
            return Err(SimError::configuration("frames.duration", "must be finite and non-negative"));
        }
        Ok(())
    }

    /// Steps the vehicle through every frame, handing each snapshot to `emit`.
    ///
    /// Frame durations that are not a multiple of `step_dt` carry their remainder into the
    /// next frame. Returns the final state.
    pub fn run(&self, mut emit: impl FnMut(&Snapshot)) -> SimResult<VehicleState> {
        let dynamics = self.config.clone().into_dynamics()?;
        let surface = UniformSurface::new(self.road);
        let mut accumulator = FixedTimestepAccumulator::new(self.step_dt);
        let mut state = self.initial_state;
        let mut step = 0u64;

        for (index, frame) in self.frames.iter().enumerate() {
            let input = DriverInput::new(frame.throttle, frame.brake, frame.steer);
            let steps = accumulator.advance(frame.duration);
            log::info!("frame {index}: {steps} steps of {:?}", input);
            for _ in 0..steps {
                let report = dynamics.step_detailed(&surface, &state, &input, self.step_dt)?;
                for clamp in &report.clamped_inputs {
                    log::warn!(
                        "frame {index}: {} {} clamped to {}",
                        clamp.field,
                        clamp.requested,
                        clamp.applied
                    );
                }
                step += 1;
                state = report.state;
                emit(&Snapshot::new(step, step as f64 * self.step_dt, &report));
            }
        }
        log::info!("replayed {step} steps, final speed {:.3} m/s", state.speed());
        Ok(state)
    }
}
