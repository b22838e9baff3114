//! Observation-prediction pairs

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::{Observable, Observation};

/// One observation next to the model prediction at its redshift
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub(crate) observable: Observable,
    pub(crate) z: f64,
    pub(crate) observed: f64,
    pub(crate) predicted: f64,
    pub(crate) sigma: f64,
}

impl Prediction {
    pub(crate) fn new(observable: Observable, observation: &Observation, predicted: f64) -> Self {
        Self {
            observable,
            z: observation.z(),
            observed: observation.value(),
            predicted,
            sigma: observation.sigma(),
        }
    }

    pub fn observable(&self) -> Observable {
        self.observable
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    pub fn observed(&self) -> f64 {
        self.observed
    }

    pub fn predicted(&self) -> f64 {
        self.predicted
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// `observed - predicted`
    pub fn residual(&self) -> f64 {
        self.observed - self.predicted
    }

    /// Residual in units of the uncertainty
    ///
    /// Its absolute value is the "fit degree" of a single measurement.
    pub fn pull(&self) -> f64 {
        self.residual() / self.sigma
    }

    /// Contribution to the chi-square
    pub fn chi_square(&self) -> f64 {
        self.pull().powi(2)
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "z = {:.3}: {} observed {:.4} ± {:.4}, predicted {:.4} (pull {:+.2})",
            self.z,
            self.observable,
            self.observed,
            self.sigma,
            self.predicted,
            self.pull()
        )
    }
}
