//! Dark-energy equations of state
//!
//! Every model of the dark-energy sector is expressed through a single function
//! `w(z)` implemented by the [EquationOfState] trait. [DarkEnergy] is the tagged
//! set of parametrizations used by [crate::model::Model]; any closure
//! `Fn(f64) -> f64` can be used wherever an [EquationOfState] is accepted.

pub mod gaussian;
pub mod information;
pub mod tabulated;

use serde::{Deserialize, Serialize};

pub use gaussian::GaussianBump;
pub use information::{DissipativeMemory, LogisticInformation};
pub use tabulated::Tabulated;

use crate::error::CsgtError;

/// Step used by [EquationOfState::information_acceleration]
const DERIVATIVE_STEP: f64 = 1e-4;

/// A dark-energy equation of state `w(z)`
///
/// Implementations must return a finite value for every `z >= 0` reachable by the
/// fit. Values below -1 (phantom regime) are allowed.
pub trait EquationOfState: Send + Sync {
    /// Equation of state at redshift `z`
    fn w(&self, z: f64) -> f64;

    /// The "information acceleration" `d(w + 1)/dz`
    ///
    /// Evaluated by a central difference, one-sided at `z = 0`.
    fn information_acceleration(&self, z: f64) -> f64 {
        let h = DERIVATIVE_STEP;
        if z < h {
            (self.w(z + h) - self.w(z)) / h
        } else {
            (self.w(z + h) - self.w(z - h)) / (2.0 * h)
        }
    }
}

impl<F> EquationOfState for F
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    fn w(&self, z: f64) -> f64 {
        self(z)
    }
}

/// The supported dark-energy parametrizations
///
/// # Examples
///
/// ```
/// use csgt::equation::{DarkEnergy, EquationOfState};
///
/// let lambda = DarkEnergy::CosmologicalConstant;
/// assert_eq!(lambda.w(1.3), -1.0);
///
/// let bump = DarkEnergy::exact_gaussian(0.0833, 1.0);
/// assert!(bump.w(0.7) > -1.0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DarkEnergy {
    /// `w = -1` at all redshifts
    #[default]
    CosmologicalConstant,
    /// Gaussian perturbation around a constant background
    GaussianBump(GaussianBump),
    /// Phantom dive derived from the logistic information rate
    LogisticInformation(LogisticInformation),
    /// Piecewise-linear table
    Tabulated(Tabulated),
}

impl DarkEnergy {
    /// The exact-Gaussian form: background `-1`, peak at `z = 0.7`
    pub fn exact_gaussian(amplitude: f64, sigma: f64) -> Self {
        DarkEnergy::GaussianBump(GaussianBump::exact(amplitude, sigma))
    }

    /// The logistic-information phantom dive for a universe lifetime `tau_end` (Gyr)
    pub fn logistic_information(tau_end: f64) -> Self {
        DarkEnergy::LogisticInformation(LogisticInformation::new(tau_end))
    }

    /// Tabulate `w(z)` from the dissipative-memory logistic integration
    ///
    /// # Errors
    ///
    /// See [DissipativeMemory::tabulate].
    pub fn dissipative_memory(tau_end: f64, beta: f64, gamma: f64) -> Result<Self, CsgtError> {
        DissipativeMemory::new(tau_end)
            .with_beta(beta)
            .with_gamma(gamma)
            .tabulate()
            .map(DarkEnergy::Tabulated)
    }

    /// `true` for the cosmological constant, or any variant that is identically -1
    pub fn is_lambda(&self) -> bool {
        match self {
            DarkEnergy::CosmologicalConstant => true,
            DarkEnergy::GaussianBump(bump) => bump.amplitude == 0.0 && bump.w_offset == -1.0,
            _ => false,
        }
    }
}

impl EquationOfState for DarkEnergy {
    fn w(&self, z: f64) -> f64 {
        match self {
            DarkEnergy::CosmologicalConstant => -1.0,
            DarkEnergy::GaussianBump(bump) => bump.w(z),
            DarkEnergy::LogisticInformation(info) => info.w(z),
            DarkEnergy::Tabulated(table) => table.w(z),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn closures_are_equations_of_state() {
        let w = |z: f64| -1.0 + 0.1 * z;
        assert_relative_eq!(w.w(2.0), -0.8);
        assert_relative_eq!(w.information_acceleration(1.0), 0.1, epsilon = 1e-9);
        assert_relative_eq!(w.information_acceleration(0.0), 0.1, epsilon = 1e-9);
    }

    #[test]
    fn lambda_is_flat() {
        let lambda = DarkEnergy::CosmologicalConstant;
        for z in [0.0, 0.5, 3.0] {
            assert_eq!(lambda.w(z), -1.0);
            assert_eq!(lambda.information_acceleration(z), 0.0);
        }
        assert!(lambda.is_lambda());
        assert!(DarkEnergy::exact_gaussian(0.0, 1.0).is_lambda());
        assert!(!DarkEnergy::exact_gaussian(0.08, 1.0).is_lambda());
    }

    #[test]
    fn serde_uses_kind_tag() {
        let de = DarkEnergy::exact_gaussian(0.1, 0.8);
        let json = serde_json::to_string(&de).unwrap();
        assert!(json.contains("\"kind\":\"gaussian_bump\""));
        let back: DarkEnergy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, de);
    }
}
