//! Error types for construction and stepping.

use thiserror::Error;

/// Errors raised by body/engine construction and by the fixed-step driver.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum PhysicsError {
    #[error("polygon requires at least 3 vertices, got {vertex_count}")]
    DegeneratePolygon { vertex_count: usize },

    #[error("density must be positive, got {density}")]
    NonPositiveDensity { density: f32 },

    #[error("non-finite value in field `{field}`")]
    NonFiniteState { field: &'static str },

    #[error("EPA failed to converge after {iterations} iterations")]
    EpaDidNotConverge { iterations: u32 },
}

pub type PhysicsResult<T> = Result<T, PhysicsError>;
