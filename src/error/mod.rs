use thiserror::Error;

use crate::background::quadrature::QuadratureError;
use crate::data::observation_error::DataError;

#[derive(Error, Debug)]
pub enum CsgtError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Quadrature(#[from] QuadratureError),
    /// The expansion rate squared became non-positive or non-finite
    #[error("Non-physical expansion at z = {z}: E(z)^2 = {radicand}")]
    NonPhysical { z: f64, radicand: f64 },
    /// Luminosity distance is not positive, the distance modulus is undefined
    #[error("Degenerate luminosity distance at z = {z}: d_L = {distance} Mpc")]
    DegenerateDistance { z: f64, distance: f64 },
    #[error("Parameter vector has {found} entries, but the model has {expected} free parameters")]
    DimensionMismatch { expected: usize, found: usize },
    #[error("Invalid bounds for `{name}`: [{lower}, {upper}]")]
    InvalidBounds {
        name: String,
        lower: f64,
        upper: f64,
    },
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Optimizer failed: {0}")]
    Optimizer(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
