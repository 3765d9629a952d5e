//! Engine configuration, per §6/§12.

use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, PhysicsResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineConfig {
    /// Units px/s^2, applied along +y each step.
    pub gravity: f32,
    pub steps_per_second: u32,
    pub velocity_iterations: u32,
    pub sleep_linear_threshold: f32,
    pub sleep_angular_threshold: f32,
    pub sleep_time_threshold: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gravity: 981.0,
            steps_per_second: 500,
            velocity_iterations: 5,
            sleep_linear_threshold: 0.15,
            sleep_angular_threshold: 0.15,
            sleep_time_threshold: 0.5,
        }
    }
}

impl EngineConfig {
    pub fn fixed_time_step(&self) -> f32 {
        1.0 / self.steps_per_second as f32
    }

    pub fn validate(&self) -> PhysicsResult<()> {
        if self.steps_per_second == 0 {
            return Err(PhysicsError::NonFiniteState { field: "steps_per_second" });
        }
        let finite_and_nonneg = [
            ("gravity", self.gravity),
            ("sleep_linear_threshold", self.sleep_linear_threshold),
            ("sleep_angular_threshold", self.sleep_angular_threshold),
            ("sleep_time_threshold", self.sleep_time_threshold),
        ];
        for (field, value) in finite_and_nonneg {
            if !value.is_finite() || value < 0.0 {
                return Err(PhysicsError::NonFiniteState { field });
            }
        }
        Ok(())
    }
}
