use thiserror::Error;

// ---------------------------------------------------------------------------
// Construction-time configuration errors (fatal to the controller instance)
// ---------------------------------------------------------------------------

#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("timestep must be positive and finite, got {0}")]
    InvalidTimestep(f64),

    #[error("proportional gain must be positive and finite, got {0}")]
    InvalidProportionalGain(f64),

    #[error("integral gain must be non-negative and finite, got {0}")]
    InvalidIntegralGain(f64),

    #[error("derivative gain must be non-negative and finite, got {0}")]
    InvalidDerivativeGain(f64),

    #[error("output bounds are flipped or not finite: min {min}, max {max}")]
    InvalidOutputBounds { min: f64, max: f64 },

    #[error("integral limit must be positive, got {0}")]
    InvalidIntegralLimit(f64),

    #[error("discontinuity threshold must be positive, got {0}")]
    InvalidResetThreshold(f64),

    #[error("max grip force must be positive and finite, got {0}")]
    InvalidGripForce(f64),

    #[error("release force {release} must be below max grip force {max}")]
    InvalidReleaseForce { release: f64, max: f64 },

    #[error("max grasp width must be positive and finite, got {0}")]
    InvalidGraspWidth(f64),

    #[error("gripper fingers must use force actuation, got {0:?}")]
    UnsupportedFingerActuation(crate::dynamics::state::Actuation),

    #[error("body mass must be positive, got {0}")]
    InvalidMass(f64),
}

// ---------------------------------------------------------------------------
// Per-tick control errors (handled locally, never reach the physics world)
// ---------------------------------------------------------------------------

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum ControlError {
    #[error("rejected non-positive timestep {0}")]
    InvalidTimestep(f64),

    #[error("non-finite error or output signal")]
    NonFinite,
}

// ---------------------------------------------------------------------------
// Crate-level error
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to encode summary: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
