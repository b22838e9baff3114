//! Fitting models to data and comparing nested models
//!
//! [fit_model] minimizes the chi-square of a [Model] against a [Dataset].
//! [compare_models] fits a reference model first and then the candidate, starting
//! the candidate from the reference optimum mapped into its own parameter space.
//! When the candidate nests the reference exactly, the candidate can therefore
//! never end with a larger chi-square than the reference.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{fit, FitResult, Optimizer};
use crate::data::Dataset;
use crate::error::CsgtError;
use crate::likelihood::{ChiSquare, LikelihoodOptions};
use crate::model::Model;

/// Settings of a model comparison
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonOptions {
    pub likelihood: LikelihoodOptions,
    /// Start the candidate from the embedded reference optimum
    pub seed_with_reference: bool,
}

impl Default for ComparisonOptions {
    fn default() -> Self {
        Self {
            likelihood: LikelihoodOptions::default(),
            seed_with_reference: true,
        }
    }
}

impl ComparisonOptions {
    pub fn with_likelihood(mut self, likelihood: LikelihoodOptions) -> Self {
        self.likelihood = likelihood;
        self
    }

    pub fn with_reference_seed(mut self, seed: bool) -> Self {
        self.seed_with_reference = seed;
        self
    }
}

/// Fits of a candidate and a reference model to the same data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelComparison {
    pub candidate_name: String,
    pub reference_name: String,
    pub candidate: FitResult,
    pub reference: FitResult,
    /// `chi2_reference - chi2_candidate`; positive when the candidate fits better
    pub delta_chi_square: f64,
    /// Whether the reference optimum was reproduced exactly in the candidate space
    pub nested: bool,
}

impl ModelComparison {
    /// Additional free parameters of the candidate
    pub fn extra_parameters(&self) -> isize {
        self.candidate.parameters.len() as isize - self.reference.parameters.len() as isize
    }

    pub fn candidate_preferred(&self) -> bool {
        self.delta_chi_square > 0.0
    }
}

impl fmt::Display for ModelComparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {}", self.reference_name, self.reference)?;
        writeln!(f, "{}: {}", self.candidate_name, self.candidate)?;
        write!(
            f,
            "delta chi2 = {:.4} ({} extra parameters{})",
            self.delta_chi_square,
            self.extra_parameters(),
            if self.nested { "" } else { ", not nested" }
        )
    }
}

/// Minimize the chi-square of `model` against `dataset`
///
/// A local optimizer without an initial guess starts from
/// [Model::initial_guess].
///
/// # Errors
///
/// Configuration errors only: an invalid model, an empty dataset or invalid
/// optimizer settings. A fit that does not converge is returned with
/// `converged = false`.
///
/// # Examples
///
/// ```
/// use csgt::background::Cosmology;
/// use csgt::data::fiducial;
/// use csgt::likelihood::LikelihoodOptions;
/// use csgt::model::Model;
/// use csgt::optimize::{fit_model, Optimizer};
///
/// let dataset = fiducial::joint_sample().unwrap();
/// let model = Model::exact_gaussian(Cosmology::new(67.4, 0.3));
/// let result = fit_model(&model, &dataset, &Optimizer::local(), &LikelihoodOptions::default()).unwrap();
/// let a = result.get("A").unwrap();
/// assert!((0.01..=0.5).contains(&a));
/// ```
pub fn fit_model(
    model: &Model,
    dataset: &Dataset,
    optimizer: &Optimizer,
    likelihood: &LikelihoodOptions,
) -> Result<FitResult, CsgtError> {
    model.validate()?;
    if dataset.is_empty() {
        return Err(CsgtError::Config(format!(
            "cannot fit model `{}` to an empty dataset",
            model.name()
        )));
    }
    let bounds = model.bounds()?;
    let objective = ChiSquare::new(model, dataset).with_options(*likelihood);

    let optimizer = match optimizer {
        Optimizer::Local(options) if options.initial_guess.is_none() => {
            Optimizer::Local(options.clone().with_initial_guess(model.initial_guess()))
        }
        other => other.clone(),
    };

    tracing::debug!("Fitting {} to {} observations", model, dataset.n_observations());
    fit(&objective, &bounds, &optimizer)
}

/// Fit `reference` and `candidate` to `dataset` and compare their chi-squares
///
/// The reference optimum is embedded into the candidate parameter space with
/// [Model::embed]. A global optimizer receives it as a member of the initial
/// population; a local optimizer runs once from its usual initial guess and once
/// from the embedded point and keeps the better result.
///
/// # Errors
///
/// Configuration errors of either fit.
pub fn compare_models(
    candidate: &Model,
    reference: &Model,
    dataset: &Dataset,
    optimizer: &Optimizer,
    options: &ComparisonOptions,
) -> Result<ModelComparison, CsgtError> {
    let reference_fit = fit_model(reference, dataset, optimizer, &options.likelihood)?;

    let embedding = if options.seed_with_reference {
        let embedding = candidate.embed(reference, &reference_fit.parameters)?;
        if !embedding.exact {
            tracing::warn!(
                "`{}` does not reproduce the optimum of `{}`; the chi-square difference may be negative",
                candidate.name(),
                reference.name()
            );
        }
        Some(embedding)
    } else {
        None
    };

    let candidate_fit = match (optimizer, &embedding) {
        (_, None) => fit_model(candidate, dataset, optimizer, &options.likelihood)?,
        (Optimizer::Global(global), Some(embedding)) => {
            let seeded = Optimizer::Global(global.clone().with_member(embedding.theta.clone()));
            fit_model(candidate, dataset, &seeded, &options.likelihood)?
        }
        (Optimizer::Local(local), Some(embedding)) => {
            let plain = fit_model(candidate, dataset, optimizer, &options.likelihood)?;
            let seeded = Optimizer::Local(local.clone().with_initial_guess(embedding.theta.clone()));
            let from_reference = fit_model(candidate, dataset, &seeded, &options.likelihood)?;
            let evaluations = plain.evaluations + from_reference.evaluations;
            let mut best = if from_reference.chi_square <= plain.chi_square {
                from_reference
            } else {
                plain
            };
            best.evaluations = evaluations;
            best
        }
    };

    let delta_chi_square = reference_fit.chi_square - candidate_fit.chi_square;
    tracing::info!(
        "{} vs {}: delta chi2 = {:.4}",
        candidate.name(),
        reference.name(),
        delta_chi_square
    );

    Ok(ModelComparison {
        candidate_name: candidate.name().to_string(),
        reference_name: reference.name().to_string(),
        candidate: candidate_fit,
        reference: reference_fit,
        delta_chi_square,
        nested: embedding.map(|e| e.exact).unwrap_or(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::Cosmology;
    use crate::data::{fiducial, Observable, SyntheticSet};
    use crate::model::Parameter;

    #[test]
    fn empty_dataset_is_a_configuration_error() {
        let model = Model::exact_gaussian(Cosmology::new(67.4, 0.3));
        let result = fit_model(
            &model,
            &Dataset::default(),
            &Optimizer::local(),
            &LikelihoodOptions::default(),
        );
        assert!(matches!(result, Err(CsgtError::Config(_))));
    }

    #[test]
    fn invalid_model_is_rejected_before_fitting() {
        let model = Model::lambda_cdm(Cosmology::new(67.4, 0.3)).with_free_default(Parameter::Sigma);
        let dataset = fiducial::joint_sample().unwrap();
        assert!(fit_model(&model, &dataset, &Optimizer::local(), &LikelihoodOptions::default()).is_err());
    }

    #[test]
    fn nested_comparison_never_loses() {
        let cosmology = Cosmology::new(67.4, 0.3);
        let reference = Model::exact_gaussian(cosmology);
        let candidate = reference
            .clone()
            .with_name("shifted-peak")
            .with_free(Parameter::ZPeak, 0.3, 1.2);
        let truth = reference.realize(&[0.15, 0.7]).unwrap();
        let set = SyntheticSet::new("sn", Observable::DistanceModulus)
            .like(&fiducial::pantheon_sample().unwrap())
            .with_noise(5)
            .generate(&truth)
            .unwrap();
        let dataset = Dataset::new(vec![set]);

        let comparison = compare_models(
            &candidate,
            &reference,
            &dataset,
            &Optimizer::local(),
            &ComparisonOptions::default(),
        )
        .unwrap();
        assert!(comparison.nested);
        assert_eq!(comparison.extra_parameters(), 1);
        assert!(comparison.delta_chi_square >= 0.0, "{comparison}");
    }

    #[test]
    fn radiation_mismatch_is_not_nested() {
        let reference = Model::exact_gaussian(Cosmology::new(67.4, 0.3));
        let candidate = Model::exact_gaussian(Cosmology::new(67.4, 0.3).with_radiation(0.05))
            .with_name("radiating")
            .with_free(Parameter::ZPeak, 0.3, 1.2);
        let dataset = fiducial::joint_sample().unwrap();
        let comparison = compare_models(
            &candidate,
            &reference,
            &dataset,
            &Optimizer::local(),
            &ComparisonOptions::default(),
        )
        .unwrap();
        assert!(!comparison.nested, "{comparison}");
    }

    #[test]
    fn comparison_serializes() {
        let fit = FitResult {
            parameter_names: vec!["A".into()],
            parameters: vec![0.1],
            chi_square: 3.0,
            converged: true,
            iterations: 4,
            evaluations: 12,
            message: "ok".into(),
        };
        let comparison = ModelComparison {
            candidate_name: "c".into(),
            reference_name: "r".into(),
            candidate: fit.clone(),
            reference: FitResult {
                chi_square: 5.0,
                ..fit
            },
            delta_chi_square: 2.0,
            nested: true,
        };
        assert!(comparison.candidate_preferred());
        let json = serde_json::to_string(&comparison).unwrap();
        let back: ModelComparison = serde_json::from_str(&json).unwrap();
        assert_eq!(back, comparison);
    }
}
