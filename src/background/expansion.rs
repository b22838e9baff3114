use super::quadrature::{integrate, integrate_with, QuadratureOptions};
use super::Cosmology;
use crate::equation::EquationOfState;
use crate::error::CsgtError;

/// Normalized expansion rate `E(z) = H(z) / H0` for a given equation of state
///
/// The dark-energy density evolves as `exp(3 I(z))` with
/// `I(z) = ∫_0^z (1 + w(z')) / (1 + z') dz'`, evaluated by adaptive quadrature on
/// every call. Distances follow from the [DistanceCalculator](super::DistanceCalculator)
/// implementation.
///
/// # Examples
///
/// ```
/// use csgt::background::{Cosmology, ExpansionRate};
/// use csgt::equation::DarkEnergy;
///
/// let cosmology = Cosmology::new(67.4, 0.3);
/// let lambda = DarkEnergy::CosmologicalConstant;
/// let rate = ExpansionRate::new(cosmology, &lambda);
/// assert_eq!(rate.e(0.0).unwrap(), 1.0);
/// assert!(rate.e(1.0).unwrap() > 1.7);
/// ```
#[derive(Clone, Copy)]
pub struct ExpansionRate<'a> {
    cosmology: Cosmology,
    dark_energy: &'a dyn EquationOfState,
    quadrature: QuadratureOptions,
}

impl std::fmt::Debug for ExpansionRate<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpansionRate")
            .field("cosmology", &self.cosmology)
            .field("quadrature", &self.quadrature)
            .finish_non_exhaustive()
    }
}

impl<'a> ExpansionRate<'a> {
    pub fn new(cosmology: Cosmology, dark_energy: &'a dyn EquationOfState) -> Self {
        Self {
            cosmology,
            dark_energy,
            quadrature: QuadratureOptions::default(),
        }
    }

    pub fn with_quadrature(mut self, quadrature: QuadratureOptions) -> Self {
        self.quadrature = quadrature;
        self
    }

    pub fn cosmology(&self) -> &Cosmology {
        &self.cosmology
    }

    pub fn dark_energy(&self) -> &'a dyn EquationOfState {
        self.dark_energy
    }

    pub fn quadrature(&self) -> &QuadratureOptions {
        &self.quadrature
    }

    /// The dark-energy exponent `I(z)`
    pub fn exponent(&self, z: f64) -> Result<f64, CsgtError> {
        self.exponent_between(0.0, z)
    }

    /// `∫_{from}^{to} (1 + w(z)) / (1 + z) dz`
    pub fn exponent_between(&self, from: f64, to: f64) -> Result<f64, CsgtError> {
        let w = self.dark_energy;
        let integral = integrate(
            |z| (1.0 + w.w(z)) / (1.0 + z),
            from,
            to,
            &self.quadrature,
        )?;
        Ok(integral.value)
    }

    /// `E(z)` from an already known exponent `I(z)`
    ///
    /// # Errors
    ///
    /// [CsgtError::NonPhysical] if `E(z)^2` is not positive and finite.
    pub fn e_from_exponent(&self, z: f64, exponent: f64) -> Result<f64, CsgtError> {
        let c = &self.cosmology;
        let zp1 = 1.0 + z;
        let radicand = c.omega_m * zp1.powi(3)
            + c.omega_r * zp1.powi(4)
            + c.omega_de() * (3.0 * exponent).exp();
        if radicand > 0.0 && radicand.is_finite() {
            Ok(radicand.sqrt())
        } else {
            Err(CsgtError::NonPhysical { z, radicand })
        }
    }

    /// `dE/dz` at a redshift where the exponent and `E` are already known
    pub fn e_derivative(&self, z: f64, exponent: f64, e: f64) -> f64 {
        let c = &self.cosmology;
        let zp1 = 1.0 + z;
        let dark = c.omega_de() * (3.0 * exponent).exp() * 3.0 * (1.0 + self.dark_energy.w(z)) / zp1;
        (3.0 * c.omega_m * zp1 * zp1 + 4.0 * c.omega_r * zp1.powi(3) + dark) / (2.0 * e)
    }

    /// Normalized expansion rate `E(z)`
    ///
    /// `E(0)` is exactly `1.0` without any integration.
    ///
    /// # Errors
    ///
    /// - [CsgtError::Quadrature] if the dark-energy integral does not converge
    /// - [CsgtError::NonPhysical] if the radicand is not positive and finite
    pub fn e(&self, z: f64) -> Result<f64, CsgtError> {
        if z == 0.0 {
            return Ok(1.0);
        }
        let exponent = self.exponent(z)?;
        self.e_from_exponent(z, exponent)
    }

    /// Hubble rate `H(z) = H0 E(z)` in km/s/Mpc
    pub fn hubble(&self, z: f64) -> Result<f64, CsgtError> {
        Ok(self.cosmology.h0 * self.e(z)?)
    }

    /// Dimensionless comoving distance `∫_{from}^{to} dz / E(z)`
    ///
    /// Inside the interval `E` is evaluated from `I(from) = exponent_at_from` plus the
    /// partial integral from `from`, so a caller stepping through consecutive
    /// intervals never re-integrates from zero.
    pub fn inverse_e_integral(
        &self,
        from: f64,
        to: f64,
        exponent_at_from: f64,
    ) -> Result<f64, CsgtError> {
        let integral = integrate_with(
            |z| {
                let exponent = exponent_at_from + self.exponent_between(from, z)?;
                Ok::<f64, CsgtError>(1.0 / self.e_from_exponent(z, exponent)?)
            },
            from,
            to,
            &self.quadrature,
        )?;
        Ok(integral.value)
    }
}
