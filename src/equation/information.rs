//! Information-divergence parametrizations
//!
//! Both forms are driven by a logistic "learning rate" `k = 4 / (tau_end / T_univ)`
//! tied to the lifetime `tau_end` of the universe in Gyr. A short lifetime gives a
//! steep transition and a deep phantom dive; long lifetimes tend to ΛCDM.

use serde::{Deserialize, Serialize};

use super::{EquationOfState, Tabulated};
use crate::error::CsgtError;

/// Present age of the universe in Gyr
pub const UNIVERSE_AGE_GYR: f64 = 13.8;

/// Redshift of the information transition
pub const TRANSITION_REDSHIFT: f64 = 0.8;

/// Logistic information rate for a lifetime `tau_end` (Gyr)
pub fn learning_rate(tau_end: f64, universe_age: f64) -> f64 {
    4.0 / (tau_end / universe_age)
}

/// `w(z) = -1 - depth (k / k_ref) exp(-(z - z_peak)^2 / (2 width^2))`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogisticInformation {
    /// Lifetime of the universe in Gyr
    pub tau_end: f64,
    pub universe_age: f64,
    pub depth: f64,
    /// Rate at which the dive reaches `depth`
    pub k_ref: f64,
    pub z_peak: f64,
    pub width: f64,
}

impl Default for LogisticInformation {
    fn default() -> Self {
        Self {
            tau_end: 50.0,
            universe_age: UNIVERSE_AGE_GYR,
            depth: 0.15,
            k_ref: 1.1,
            z_peak: 0.7,
            width: 0.2,
        }
    }
}

impl LogisticInformation {
    pub fn new(tau_end: f64) -> Self {
        Self {
            tau_end,
            ..Default::default()
        }
    }

    pub fn rate(&self) -> f64 {
        learning_rate(self.tau_end, self.universe_age)
    }

    /// Informational divergence `D(z) = 1 / (1 + exp(-k (z - z0)))`
    pub fn divergence(&self, z: f64) -> f64 {
        1.0 / (1.0 + (-self.rate() * (z - TRANSITION_REDSHIFT)).exp())
    }
}

impl EquationOfState for LogisticInformation {
    fn w(&self, z: f64) -> f64 {
        let dz = z - self.z_peak;
        let dive = self.depth * (self.rate() / self.k_ref);
        -1.0 - dive * (-(dz * dz) / (2.0 * self.width * self.width)).exp()
    }
}

/// The dissipative logistic equation
///
/// `dD/dt = k D (1 - D) - beta exp(-gamma z) D` is integrated with an explicit
/// Euler scheme from `z_start` down to `z = 0`, using `dt = dz`. The metabolic
/// rate `L = dD/d(-z)` normalized to its maximum sets
/// `w = -1 - 0.2 (k / 1.1) (L - 0.2 beta exp(-gamma z))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DissipativeMemory {
    pub tau_end: f64,
    /// Dissipation (selective forgetting) rate
    pub beta: f64,
    /// High-redshift suppression scale
    pub gamma: f64,
    /// Initial divergence at `z_start`
    pub seed: f64,
    pub z_start: f64,
    pub steps: usize,
}

impl Default for DissipativeMemory {
    fn default() -> Self {
        Self {
            tau_end: 50.0,
            beta: 0.15,
            gamma: 1.2,
            seed: 0.001,
            z_start: 3.0,
            steps: 300,
        }
    }
}

impl DissipativeMemory {
    pub fn new(tau_end: f64) -> Self {
        Self {
            tau_end,
            ..Default::default()
        }
    }

    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    /// Integrate the divergence history
    ///
    /// Returns `(z, D)` ordered from `z_start` down to zero.
    pub fn divergence_history(&self) -> (Vec<f64>, Vec<f64>) {
        let k = learning_rate(self.tau_end, UNIVERSE_AGE_GYR);
        let n = self.steps.max(2);
        let dz = self.z_start / (n - 1) as f64;
        let zs: Vec<f64> = (0..n).map(|i| self.z_start - i as f64 * dz).collect();

        let mut d = Vec::with_capacity(n);
        d.push(self.seed);
        for i in 1..n {
            let prev = d[i - 1];
            let growth = k * prev * (1.0 - prev);
            let dissipation = self.beta * (-self.gamma * zs[i - 1]).exp() * prev;
            d.push(prev + (growth - dissipation) * dz);
        }
        (zs, d)
    }

    /// Tabulate the resulting `w(z)` in ascending redshift
    ///
    /// # Errors
    ///
    /// [CsgtError::Config] if `tau_end` or `z_start` is not positive, or if the
    /// divergence never grows (the metabolic rate cannot be normalized).
    pub fn tabulate(&self) -> Result<Tabulated, CsgtError> {
        if !(self.tau_end > 0.0 && self.tau_end.is_finite()) {
            return Err(CsgtError::Config(format!(
                "tau_end must be positive, got {}",
                self.tau_end
            )));
        }
        if !(self.z_start > 0.0) {
            return Err(CsgtError::Config(format!(
                "z_start must be positive, got {}",
                self.z_start
            )));
        }

        let k = learning_rate(self.tau_end, UNIVERSE_AGE_GYR);
        let (zs, d) = self.divergence_history();
        let n = zs.len();
        let h = zs[0] - zs[1];

        // Gradient with respect to -z: central inside, one-sided at the ends
        let rate: Vec<f64> = (0..n)
            .map(|i| match i {
                0 => (d[1] - d[0]) / h,
                i if i == n - 1 => (d[n - 1] - d[n - 2]) / h,
                i => (d[i + 1] - d[i - 1]) / (2.0 * h),
            })
            .collect();
        let peak = rate.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !(peak > 0.0 && peak.is_finite()) {
            return Err(CsgtError::Config(format!(
                "dissipative memory (tau_end = {}, beta = {}) never accumulates information",
                self.tau_end, self.beta
            )));
        }

        let mut table: Vec<(f64, f64)> = zs
            .iter()
            .zip(rate.iter())
            .map(|(&z, &l)| {
                let l_norm = l / peak;
                let w = -1.0
                    - 0.2 * (k / 1.1) * (l_norm - 0.2 * self.beta * (-self.gamma * z).exp());
                (z, w)
            })
            .collect();
        table.reverse();
        let (z, w): (Vec<f64>, Vec<f64>) = table.into_iter().unzip();
        Tabulated::new(z, w)
    }
}
