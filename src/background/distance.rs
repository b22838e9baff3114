use super::quadrature::integrate_with;
use super::{Cosmology, ExpansionRate};
use crate::error::CsgtError;

/// Mpc to 10 pc, the reference distance of absolute magnitudes
const MPC_OVER_10PC: f64 = 1e5;

/// Distance modulus for a luminosity distance in Mpc and a magnitude offset
///
/// # Errors
///
/// [CsgtError::DegenerateDistance] if `d_l` is not positive and finite.
pub fn distance_modulus_from_luminosity(
    z: f64,
    luminosity_distance: f64,
    magnitude_offset: f64,
) -> Result<f64, CsgtError> {
    if luminosity_distance > 0.0 && luminosity_distance.is_finite() {
        Ok(5.0 * (luminosity_distance * MPC_OVER_10PC).log10() + magnitude_offset)
    } else {
        Err(CsgtError::DegenerateDistance {
            z,
            distance: luminosity_distance,
        })
    }
}

/// Distances on a flat background
///
/// Implementors provide `E(z)` and the dimensionless comoving integral; the
/// physical distances and the distance modulus follow.
pub trait DistanceCalculator: Sync {
    /// Background parameters
    fn cosmology(&self) -> &Cosmology;

    /// Normalized expansion rate `E(z)`
    fn e(&self, z: f64) -> Result<f64, CsgtError>;

    /// Dimensionless comoving distance `∫_0^z dz' / E(z')`
    fn comoving_integral(&self, z: f64) -> Result<f64, CsgtError>;

    /// Hubble rate in km/s/Mpc
    fn hubble(&self, z: f64) -> Result<f64, CsgtError> {
        Ok(self.cosmology().h0 * self.e(z)?)
    }

    /// Line-of-sight comoving distance in Mpc
    fn comoving_distance(&self, z: f64) -> Result<f64, CsgtError> {
        Ok(self.cosmology().hubble_distance() * self.comoving_integral(z)?)
    }

    /// Luminosity distance `(1 + z) chi(z)` in Mpc
    fn luminosity_distance(&self, z: f64) -> Result<f64, CsgtError> {
        Ok((1.0 + z) * self.comoving_distance(z)?)
    }

    /// Distance modulus `5 log10(d_L / 10 pc) + M`, with the reason on failure
    fn try_distance_modulus(&self, z: f64, magnitude_offset: f64) -> Result<f64, CsgtError> {
        let d_l = self.luminosity_distance(z)?;
        distance_modulus_from_luminosity(z, d_l, magnitude_offset)
    }

    /// Distance modulus, `f64::INFINITY` when it is undefined or any step failed
    fn distance_modulus(&self, z: f64, magnitude_offset: f64) -> f64 {
        match self.try_distance_modulus(z, magnitude_offset) {
            Ok(mu) => mu,
            Err(e) => {
                tracing::trace!("distance modulus at z = {z} failed: {e}");
                f64::INFINITY
            }
        }
    }
}

impl DistanceCalculator for ExpansionRate<'_> {
    fn cosmology(&self) -> &Cosmology {
        ExpansionRate::cosmology(self)
    }

    fn e(&self, z: f64) -> Result<f64, CsgtError> {
        ExpansionRate::e(self, z)
    }

    fn hubble(&self, z: f64) -> Result<f64, CsgtError> {
        ExpansionRate::hubble(self, z)
    }

    fn comoving_integral(&self, z: f64) -> Result<f64, CsgtError> {
        if z == 0.0 {
            return Ok(0.0);
        }
        integrate_with(
            |zp| Ok::<f64, CsgtError>(1.0 / ExpansionRate::e(self, zp)?),
            0.0,
            z,
            self.quadrature(),
        )
        .map(|integral| integral.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equation::DarkEnergy;
    use approx::assert_relative_eq;

    #[test]
    fn lcdm_distance_modulus_reference() {
        let lambda = DarkEnergy::CosmologicalConstant;
        let rate = ExpansionRate::new(Cosmology::new(67.4, 0.3), &lambda);
        assert_relative_eq!(rate.luminosity_distance(1.0).unwrap(), 6862.55, max_relative = 1e-5);
        assert_relative_eq!(rate.distance_modulus(1.0, 0.0), 44.1824, epsilon = 1e-3);
        assert_relative_eq!(rate.distance_modulus(0.5, 0.0), 42.3434, epsilon = 1e-3);
        assert_relative_eq!(rate.distance_modulus(2.0, 0.0), 46.0394, epsilon = 1e-3);
    }

    #[test]
    fn magnitude_offset_is_additive() {
        let lambda = DarkEnergy::CosmologicalConstant;
        let rate = ExpansionRate::new(Cosmology::new(67.4, 0.3), &lambda);
        let mu0 = rate.distance_modulus(0.8, 0.0);
        assert_relative_eq!(rate.distance_modulus(0.8, -19.3), mu0 - 19.3, epsilon = 1e-12);
    }

    #[test]
    fn zero_redshift_is_infinite_sentinel() {
        let lambda = DarkEnergy::CosmologicalConstant;
        let rate = ExpansionRate::new(Cosmology::new(67.4, 0.3), &lambda);
        assert_eq!(rate.comoving_distance(0.0).unwrap(), 0.0);
        assert_eq!(rate.distance_modulus(0.0, -19.3), f64::INFINITY);
        assert!(matches!(
            rate.try_distance_modulus(0.0, -19.3),
            Err(CsgtError::DegenerateDistance { .. })
        ));
    }

    #[test]
    fn failures_become_the_sentinel() {
        let lambda = DarkEnergy::CosmologicalConstant;
        let rate = ExpansionRate::new(
            Cosmology {
                omega_m: -2.0,
                ..Default::default()
            },
            &lambda,
        );
        assert_eq!(rate.distance_modulus(1.0, 0.0), f64::INFINITY);
    }

    #[test]
    fn low_redshift_hubble_law() {
        let lambda = DarkEnergy::CosmologicalConstant;
        let cosmology = Cosmology::new(70.0, 0.3);
        let rate = ExpansionRate::new(cosmology, &lambda);
        let z = 1e-3;
        assert_relative_eq!(
            rate.comoving_distance(z).unwrap(),
            cosmology.hubble_distance() * z,
            max_relative = 1e-3
        );
    }
}
