use serde::{Deserialize, Serialize};

use super::EquationOfState;

/// `w(z) = w_offset + A exp(-(z - z_peak)^2 / (2 sigma^2))`
///
/// With `w_offset = -1` and `A > 0` this is the quintessence-like bump; a negative
/// amplitude gives a phantom dip below -1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GaussianBump {
    pub amplitude: f64,
    pub sigma: f64,
    pub z_peak: f64,
    pub w_offset: f64,
}

impl GaussianBump {
    /// Peak location of the exact-Gaussian form
    pub const Z_PEAK: f64 = 0.7;

    pub fn new(amplitude: f64, sigma: f64, z_peak: f64, w_offset: f64) -> Self {
        Self {
            amplitude,
            sigma,
            z_peak,
            w_offset,
        }
    }

    /// Bump on the cosmological-constant background, peaked at [GaussianBump::Z_PEAK]
    pub fn exact(amplitude: f64, sigma: f64) -> Self {
        Self::new(amplitude, sigma, Self::Z_PEAK, -1.0)
    }

    /// Analytic `dw/dz`
    pub fn slope(&self, z: f64) -> f64 {
        let dz = z - self.z_peak;
        -self.amplitude * dz / (self.sigma * self.sigma) * self.envelope(z)
    }

    #[inline]
    fn envelope(&self, z: f64) -> f64 {
        let dz = z - self.z_peak;
        (-(dz * dz) / (2.0 * self.sigma * self.sigma)).exp()
    }
}

impl EquationOfState for GaussianBump {
    fn w(&self, z: f64) -> f64 {
        self.w_offset + self.amplitude * self.envelope(z)
    }

    fn information_acceleration(&self, z: f64) -> f64 {
        self.slope(z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn peak_value_and_symmetry() {
        let bump = GaussianBump::exact(0.0833, 1.0);
        assert_relative_eq!(bump.w(0.7), -1.0 + 0.0833);
        assert_relative_eq!(bump.w(0.2), bump.w(1.2), epsilon = 1e-15);
        assert_relative_eq!(bump.w(0.0), -1.0 + 0.0833 * (-0.245_f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn slope_matches_finite_difference() {
        let bump = GaussianBump::new(0.2, 0.4, 0.6, -0.95);
        let h = 1e-6;
        for z in [0.1, 0.6, 1.4] {
            let numeric = (bump.w(z + h) - bump.w(z - h)) / (2.0 * h);
            assert_relative_eq!(bump.slope(z), numeric, epsilon = 1e-7);
        }
        assert_eq!(bump.slope(0.6), 0.0);
    }

    #[test]
    fn negative_amplitude_crosses_phantom_divide() {
        let dip = GaussianBump::exact(-0.15, 0.3);
        assert!(dip.w(0.7) < -1.0);
        assert_relative_eq!(dip.w(10.0), -1.0, epsilon = 1e-12);
    }
}
