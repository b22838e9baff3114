//! Dense tables of the expansion history
//!
//! [ExpansionHistory] tabulates a [Realization] on a redshift grid next to the ΛCDM
//! background with the same `H0` and `Omega_m`, which is what plots of `w(z)` and
//! of the relative Hubble-rate deviation are drawn from. [w_of_a_table] produces
//! the `(a, w)` pairs Boltzmann codes read for a tabulated equation of state.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::background::QuadratureOptions;
use crate::equation::EquationOfState;
use crate::error::CsgtError;
use crate::model::Realization;

/// One row of an [ExpansionHistory]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub z: f64,
    pub w: f64,
    /// `dw/dz`
    pub dw_dz: f64,
    /// `E(z) = H(z) / H0`
    pub e: f64,
    /// `H(z)` in km/s/Mpc
    pub hubble: f64,
    /// `100 (H - H_ΛCDM) / H_ΛCDM`
    pub delta_hubble_percent: f64,
}

/// Expansion history of a realization on a redshift grid
///
/// # Examples
///
/// ```
/// use csgt::background::Cosmology;
/// use csgt::history::ExpansionHistory;
/// use csgt::model::Model;
///
/// let realization = Model::exact_gaussian(Cosmology::new(67.4, 0.3))
///     .realize(&[0.0833, 1.0])
///     .unwrap();
/// let history = ExpansionHistory::tabulate(&realization, &[0.0, 0.7, 1.5]).unwrap();
/// assert_eq!(history.rows()[0].e, 1.0);
/// assert!(history.rows()[1].delta_hubble_percent > 0.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpansionHistory {
    rows: Vec<HistoryRow>,
}

impl ExpansionHistory {
    /// Tabulate `realization` at `redshifts`
    pub fn tabulate(realization: &Realization, redshifts: &[f64]) -> Result<Self, CsgtError> {
        Self::tabulate_with(realization, redshifts, QuadratureOptions::default())
    }

    pub fn tabulate_with(
        realization: &Realization,
        redshifts: &[f64],
        quadrature: QuadratureOptions,
    ) -> Result<Self, CsgtError> {
        let rate = realization.expansion_rate(quadrature);
        let lambda = realization.lambda_counterpart();
        let lambda_rate = lambda.expansion_rate(quadrature);
        let dark_energy = &realization.dark_energy;

        let rows = redshifts
            .iter()
            .map(|&z| {
                let hubble = rate.hubble(z)?;
                let reference = lambda_rate.hubble(z)?;
                Ok(HistoryRow {
                    z,
                    w: dark_energy.w(z),
                    dw_dz: dark_energy.information_acceleration(z),
                    e: rate.e(z)?,
                    hubble,
                    delta_hubble_percent: 100.0 * (hubble - reference) / reference,
                })
            })
            .collect::<Result<Vec<_>, CsgtError>>()?;
        Ok(Self { rows })
    }

    /// Tabulate on `n` evenly spaced redshifts from `0` to `z_max`
    pub fn uniform(realization: &Realization, z_max: f64, n: usize) -> Result<Self, CsgtError> {
        if n < 2 || !(z_max > 0.0) {
            return Err(CsgtError::Config(format!(
                "uniform history needs z_max > 0 and at least two points, got {z_max} and {n}"
            )));
        }
        let step = z_max / (n - 1) as f64;
        let redshifts: Vec<f64> = (0..n).map(|i| i as f64 * step).collect();
        Self::tabulate(realization, &redshifts)
    }

    pub fn rows(&self) -> &[HistoryRow] {
        &self.rows
    }

    /// Row with the largest relative Hubble-rate deviation from ΛCDM
    pub fn peak_deviation(&self) -> Option<&HistoryRow> {
        self.rows.iter().max_by(|a, b| {
            a.delta_hubble_percent
                .abs()
                .total_cmp(&b.delta_hubble_percent.abs())
        })
    }

    /// Write the table as CSV with a header row
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), CsgtError> {
        let mut writer = csv::Writer::from_path(path.as_ref())?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        tracing::info!(
            "Wrote {} expansion-history rows to {}",
            self.rows.len(),
            path.as_ref().display()
        );
        Ok(())
    }
}

/// `(a, w(a))` pairs with `a = 1 / (1 + z)`, ordered by increasing scale factor
pub fn w_of_a_table(dark_energy: &dyn EquationOfState, redshifts: &[f64]) -> Vec<(f64, f64)> {
    let mut table: Vec<(f64, f64)> = redshifts
        .iter()
        .map(|&z| (1.0 / (1.0 + z), dark_energy.w(z)))
        .collect();
    table.sort_by(|a, b| a.0.total_cmp(&b.0));
    table
}
