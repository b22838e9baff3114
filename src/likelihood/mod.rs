//! Chi-square of a model against observations
//!
//! For every [ObservationSet] the model predicts the observed quantity at each
//! redshift: the distance modulus for supernova sets and `H0 E(z)` for Hubble-rate
//! sets. The chi-square is `Σ ((observed - predicted) / sigma)^2` over all sets.
//!
//! Optimizers see [ChiSquare] through the [Objective] trait, whose cost never fails:
//! any failure on the way (a parameter vector that does not realize, a quadrature
//! that does not converge, a non-physical expansion, a non-finite prediction) is
//! mapped to the finite [CHI2_PENALTY]. [ChiSquare::try_chi_square] keeps the reason.

mod prediction;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use prediction::Prediction;

use crate::background::grid::DEFAULT_GRID_NODES;
use crate::background::{DistanceCalculator, ExpansionGrid, QuadratureOptions};
use crate::data::{Dataset, Observable, ObservationSet};
use crate::error::CsgtError;
use crate::model::{Model, Realization};
use crate::optimize::Objective;

/// Cost assigned to parameter vectors whose chi-square cannot be computed
pub const CHI2_PENALTY: f64 = 1e18;

/// How distances are computed during a likelihood evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DistanceMethod {
    /// Nested adaptive quadrature for every redshift
    Direct,
    /// One [ExpansionGrid] per evaluation, covering the supernova redshifts
    Grid { nodes: usize },
}

impl Default for DistanceMethod {
    fn default() -> Self {
        DistanceMethod::Grid {
            nodes: DEFAULT_GRID_NODES,
        }
    }
}

/// Numerical settings of the likelihood
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LikelihoodOptions {
    pub method: DistanceMethod,
    pub quadrature: QuadratureOptions,
}

impl LikelihoodOptions {
    /// Direct quadrature, no grid
    pub fn direct() -> Self {
        Self {
            method: DistanceMethod::Direct,
            ..Default::default()
        }
    }

    pub fn grid(nodes: usize) -> Self {
        Self {
            method: DistanceMethod::Grid { nodes },
            ..Default::default()
        }
    }

    pub fn with_method(mut self, method: DistanceMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_quadrature(mut self, quadrature: QuadratureOptions) -> Self {
        self.quadrature = quadrature;
        self
    }
}

/// Chi-square contribution of one observation set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetContribution {
    pub name: String,
    pub observable: Observable,
    pub n_observations: usize,
    pub chi_square: f64,
}

/// Per-set chi-square contributions and their total
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChiSquareBreakdown {
    pub sets: Vec<SetContribution>,
    pub total: f64,
}

impl ChiSquareBreakdown {
    pub fn get(&self, name: &str) -> Option<&SetContribution> {
        self.sets.iter().find(|s| s.name == name)
    }
}

impl fmt::Display for ChiSquareBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for set in &self.sets {
            writeln!(
                f,
                "{} ({}, {} points): chi2 = {:.4}",
                set.name, set.observable, set.n_observations, set.chi_square
            )?;
        }
        write!(f, "total chi2 = {:.4}", self.total)
    }
}

/// Chi-square of `model` against `dataset` as a function of the free parameters
///
/// # Examples
///
/// ```
/// use csgt::background::Cosmology;
/// use csgt::data::fiducial;
/// use csgt::likelihood::ChiSquare;
/// use csgt::model::Model;
///
/// let dataset = fiducial::joint_sample().unwrap();
/// let model = Model::exact_gaussian(Cosmology::new(67.4, 0.3));
/// let chi2 = ChiSquare::new(&model, &dataset);
/// let value = chi2.try_chi_square(&[0.0833, 1.0]).unwrap();
/// assert!(value.is_finite() && value > 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct ChiSquare<'a> {
    model: &'a Model,
    dataset: &'a Dataset,
    options: LikelihoodOptions,
}

impl<'a> ChiSquare<'a> {
    pub fn new(model: &'a Model, dataset: &'a Dataset) -> Self {
        Self {
            model,
            dataset,
            options: LikelihoodOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LikelihoodOptions) -> Self {
        self.options = options;
        self
    }

    pub fn model(&self) -> &Model {
        self.model
    }

    pub fn dataset(&self) -> &Dataset {
        self.dataset
    }

    pub fn options(&self) -> &LikelihoodOptions {
        &self.options
    }

    /// Realize `theta` and hand a distance calculator for it to `f`
    fn with_calculator<R>(
        &self,
        theta: &[f64],
        f: impl FnOnce(&dyn DistanceCalculator, &Realization) -> Result<R, CsgtError>,
    ) -> Result<R, CsgtError> {
        let realization = self.model.realize(theta)?;
        let rate = realization.expansion_rate(self.options.quadrature);
        let z_max = self.dataset.max_distance_redshift();
        match self.options.method {
            DistanceMethod::Grid { nodes } if z_max > 0.0 => {
                let grid = ExpansionGrid::build(rate, z_max, nodes)?;
                f(&grid, &realization)
            }
            _ => f(&rate, &realization),
        }
    }

    fn predict_set(
        calculator: &dyn DistanceCalculator,
        realization: &Realization,
        set: &ObservationSet,
    ) -> Result<Vec<Prediction>, CsgtError> {
        set.iter()
            .map(|observation| {
                let z = observation.z();
                let predicted = match set.observable() {
                    Observable::DistanceModulus => {
                        calculator.try_distance_modulus(z, realization.magnitude_offset)?
                    }
                    Observable::HubbleRate => calculator.hubble(z)?,
                };
                Ok(Prediction::new(set.observable(), observation, predicted))
            })
            .collect()
    }

    /// Predictions for every observation, grouped like the sets of the dataset
    pub fn predictions(&self, theta: &[f64]) -> Result<Vec<Vec<Prediction>>, CsgtError> {
        self.with_calculator(theta, |calculator, realization| {
            self.dataset
                .sets()
                .iter()
                .map(|set| Self::predict_set(calculator, realization, set))
                .collect()
        })
    }

    /// Chi-square per observation set
    pub fn breakdown(&self, theta: &[f64]) -> Result<ChiSquareBreakdown, CsgtError> {
        let predictions = self.predictions(theta)?;
        let sets: Vec<SetContribution> = self
            .dataset
            .sets()
            .iter()
            .zip(predictions)
            .map(|(set, predictions)| SetContribution {
                name: set.name().to_string(),
                observable: set.observable(),
                n_observations: set.len(),
                chi_square: predictions.iter().map(Prediction::chi_square).sum(),
            })
            .collect();
        let total = sets.iter().map(|s| s.chi_square).sum();
        Ok(ChiSquareBreakdown { sets, total })
    }

    /// Chi-square with the reason when it cannot be computed
    pub fn try_chi_square(&self, theta: &[f64]) -> Result<f64, CsgtError> {
        let total = self.with_calculator(theta, |calculator, realization| {
            let mut total = 0.0;
            for set in self.dataset.sets() {
                total += Self::predict_set(calculator, realization, set)?
                    .iter()
                    .map(Prediction::chi_square)
                    .sum::<f64>();
            }
            Ok(total)
        })?;
        if total.is_finite() {
            Ok(total)
        } else {
            Err(CsgtError::Optimizer(format!(
                "non-finite chi-square {total} at {theta:?}"
            )))
        }
    }

    /// Chi-square, or [CHI2_PENALTY] when it cannot be computed
    pub fn chi_square(&self, theta: &[f64]) -> f64 {
        match self.try_chi_square(theta) {
            Ok(value) => value,
            Err(e) => {
                tracing::trace!("chi-square penalized at {theta:?}: {e}");
                CHI2_PENALTY
            }
        }
    }
}

impl Objective for ChiSquare<'_> {
    fn cost(&self, theta: &[f64]) -> f64 {
        self.chi_square(theta)
    }
}

/// Chi-square of `model` at `theta` against `dataset` with default options
///
/// Returns [CHI2_PENALTY] when the chi-square cannot be computed.
pub fn chi_square(model: &Model, theta: &[f64], dataset: &Dataset) -> f64 {
    ChiSquare::new(model, dataset).chi_square(theta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::{Cosmology, ExpansionRate};
    use crate::data::Observation;
    use crate::equation::DarkEnergy;
    use approx::assert_relative_eq;

    fn lambda_model() -> Model {
        Model::lambda_cdm(Cosmology::new(67.4, 0.3))
            .with_free(crate::model::Parameter::MagnitudeOffset, -20.0, 1.0)
    }

    fn sn_set(points: &[(f64, f64, f64)]) -> ObservationSet {
        ObservationSet::new(
            "sn",
            Observable::DistanceModulus,
            points
                .iter()
                .map(|&(z, mu, s)| Observation::new(z, mu, s).unwrap())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn single_point_chi_square() {
        // mu(1) = 44.1824 for H0 = 67.4, Omega_m = 0.3, M = 0
        let dataset = Dataset::new(vec![sn_set(&[(1.0, 44.2824, 0.1)])]);
        let model = lambda_model();
        let chi2 = ChiSquare::new(&model, &dataset).with_options(LikelihoodOptions::direct());
        let value = chi2.try_chi_square(&[0.0, 67.4, 0.3]).unwrap();
        assert_relative_eq!(value, 1.0, epsilon = 2e-2);
    }

    #[test]
    fn hubble_rate_sets_use_h_of_z() {
        let lambda = DarkEnergy::CosmologicalConstant;
        let rate = ExpansionRate::new(Cosmology::new(67.4, 0.3), &lambda);
        let h = rate.hubble(0.51).unwrap();
        let set = ObservationSet::new(
            "bao",
            Observable::HubbleRate,
            vec![Observation::new(0.51, h + 2.0, 2.0).unwrap()],
        )
        .unwrap();
        let dataset = Dataset::new(vec![set]);
        let model = Model::lambda_cdm(Cosmology::new(67.4, 0.3));
        let value = ChiSquare::new(&model, &dataset)
            .try_chi_square(&[-19.35, 67.4, 0.3])
            .unwrap();
        assert_relative_eq!(value, 1.0, epsilon = 1e-8);
    }

    #[test]
    fn failures_become_the_penalty() {
        let dataset = Dataset::new(vec![sn_set(&[(0.5, 42.0, 0.1)])]);
        let model = lambda_model();
        let chi2 = ChiSquare::new(&model, &dataset);
        // Wrong dimension
        assert_eq!(chi2.chi_square(&[0.0]), CHI2_PENALTY);
        // Non-physical background
        assert_eq!(chi2.chi_square(&[0.0, -5.0, 0.3]), CHI2_PENALTY);
        assert!(chi2.try_chi_square(&[0.0]).is_err());
        assert_eq!(chi2.cost(&[0.0]), CHI2_PENALTY);
    }

    #[test]
    fn grid_and_direct_agree() {
        let dataset = Dataset::new(vec![sn_set(&[
            (0.1, 38.3, 0.1),
            (0.5, 42.3, 0.1),
            (1.2, 44.7, 0.1),
        ])]);
        let model = Model::exact_gaussian(Cosmology::new(67.4, 0.3))
            .with_free(crate::model::Parameter::MagnitudeOffset, -20.0, 1.0);
        let theta = [0.2, 0.6, 0.0];
        let direct = ChiSquare::new(&model, &dataset)
            .with_options(LikelihoodOptions::direct())
            .try_chi_square(&theta)
            .unwrap();
        let grid = ChiSquare::new(&model, &dataset)
            .try_chi_square(&theta)
            .unwrap();
        assert_relative_eq!(direct, grid, max_relative = 1e-5);
    }

    #[test]
    fn breakdown_sums_to_total() {
        let sn = sn_set(&[(0.3, 40.0, 0.2), (0.8, 43.0, 0.2)]);
        let bao = ObservationSet::new(
            "bao",
            Observable::HubbleRate,
            vec![Observation::new(0.7, 90.0, 3.0).unwrap()],
        )
        .unwrap();
        let dataset = Dataset::new(vec![sn, bao]);
        let model = lambda_model();
        let chi2 = ChiSquare::new(&model, &dataset);
        let theta = [0.0, 70.0, 0.3];
        let breakdown = chi2.breakdown(&theta).unwrap();
        assert_eq!(breakdown.sets.len(), 2);
        assert_eq!(breakdown.get("bao").unwrap().n_observations, 1);
        assert_relative_eq!(
            breakdown.total,
            chi2.try_chi_square(&theta).unwrap(),
            max_relative = 1e-12
        );
        let predictions = chi2.predictions(&theta).unwrap();
        assert_eq!(predictions[0].len(), 2);
        assert_eq!(predictions[1][0].observable(), Observable::HubbleRate);
    }

    #[test]
    fn empty_dataset_has_zero_chi_square() {
        let dataset = Dataset::default();
        let model = lambda_model();
        assert_eq!(chi_square(&model, &[0.0, 70.0, 0.3], &dataset), 0.0);
    }
}
