//! Homogeneous background cosmology
//!
//! [Cosmology] carries the fixed physical inputs. [ExpansionRate] integrates an
//! equation of state into the normalized Hubble rate `E(z)` and, through the
//! [DistanceCalculator] trait, into distances and distance moduli. [ExpansionGrid]
//! provides the same interface backed by a monotone spline on a uniform redshift
//! grid, which is what the likelihood uses inside optimizer loops.

pub mod distance;
pub mod expansion;
pub mod grid;
pub mod quadrature;
pub mod spline;

use serde::{Deserialize, Serialize};

pub use distance::DistanceCalculator;
pub use expansion::ExpansionRate;
pub use grid::ExpansionGrid;
pub use quadrature::{QuadratureError, QuadratureOptions};
pub use spline::MonotoneSpline;

use crate::error::CsgtError;

/// Speed of light in km/s
pub const SPEED_OF_LIGHT: f64 = 299_792.458;

/// Background cosmological parameters of a spatially flat universe
///
/// The dark-energy density is the flatness complement `1 - omega_m - omega_r`.
///
/// # Examples
///
/// ```
/// use csgt::background::Cosmology;
///
/// let planck = Cosmology::new(67.4, 0.3);
/// assert!((planck.omega_de() - 0.7).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cosmology {
    /// Hubble constant in km/s/Mpc
    pub h0: f64,
    pub omega_m: f64,
    pub omega_r: f64,
    /// km/s
    pub speed_of_light: f64,
}

impl Default for Cosmology {
    fn default() -> Self {
        Self {
            h0: 67.4,
            omega_m: 0.3,
            omega_r: 0.0,
            speed_of_light: SPEED_OF_LIGHT,
        }
    }
}

impl Cosmology {
    pub fn new(h0: f64, omega_m: f64) -> Self {
        Self {
            h0,
            omega_m,
            ..Default::default()
        }
    }

    pub fn with_radiation(mut self, omega_r: f64) -> Self {
        self.omega_r = omega_r;
        self
    }

    pub fn with_h0(mut self, h0: f64) -> Self {
        self.h0 = h0;
        self
    }

    pub fn with_omega_m(mut self, omega_m: f64) -> Self {
        self.omega_m = omega_m;
        self
    }

    /// Dark-energy density parameter today
    pub fn omega_de(&self) -> f64 {
        1.0 - self.omega_m - self.omega_r
    }

    /// Hubble distance `c / H0` in Mpc
    pub fn hubble_distance(&self) -> f64 {
        self.speed_of_light / self.h0
    }

    /// Check that the parameters describe a usable background
    ///
    /// # Errors
    ///
    /// [CsgtError::Config] for a non-positive `h0` or `speed_of_light`, or for
    /// negative / non-finite density parameters.
    pub fn validate(&self) -> Result<(), CsgtError> {
        let finite = [self.h0, self.omega_m, self.omega_r, self.speed_of_light]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(CsgtError::Config(format!(
                "cosmology contains non-finite values: {self:?}"
            )));
        }
        if self.h0 <= 0.0 || self.speed_of_light <= 0.0 {
            return Err(CsgtError::Config(format!(
                "h0 and speed_of_light must be positive, got h0 = {}, c = {}",
                self.h0, self.speed_of_light
            )));
        }
        if self.omega_m < 0.0 || self.omega_r < 0.0 {
            return Err(CsgtError::Config(format!(
                "density parameters must be non-negative, got omega_m = {}, omega_r = {}",
                self.omega_m, self.omega_r
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn flat_complement() {
        let c = Cosmology::new(70.0, 0.25).with_radiation(1e-4);
        assert_relative_eq!(c.omega_de(), 0.7499);
        assert_relative_eq!(c.hubble_distance(), SPEED_OF_LIGHT / 70.0);
    }

    #[test]
    fn validation() {
        assert!(Cosmology::default().validate().is_ok());
        assert!(Cosmology::new(0.0, 0.3).validate().is_err());
        assert!(Cosmology::new(70.0, -0.1).validate().is_err());
        assert!(Cosmology::new(f64::NAN, 0.3).validate().is_err());
    }

    #[test]
    fn deserializes_with_defaults() {
        let c: Cosmology = serde_json::from_str(r#"{"h0": 73.0}"#).unwrap();
        assert_eq!(c.h0, 73.0);
        assert_eq!(c.omega_m, 0.3);
        assert_eq!(c.speed_of_light, SPEED_OF_LIGHT);
    }
}
