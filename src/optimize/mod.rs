//! Bounded minimization of chi-square objectives
//!
//! Two strategies share one entry point, [fit]:
//!
//! - [Optimizer::Local]: quasi-Newton L-BFGS (argmin) with box constraints enforced
//!   by clamping every proposal and projecting the finite-difference gradient.
//! - [Optimizer::Global]: differential evolution (`best1bin`, Latin-hypercube start)
//!   with an optional local polish.
//!
//! Optimizer non-convergence is never an error; it is reported through
//! [FitResult::converged]. Only configuration problems are returned as `Err`.

pub mod comparison;
pub mod evolution;
pub mod lbfgsb;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use comparison::{compare_models, fit_model, ComparisonOptions, ModelComparison};
pub use evolution::GlobalOptions;
pub use lbfgsb::LocalOptions;

use crate::error::CsgtError;
use crate::likelihood::CHI2_PENALTY;

/// A scalar function to be minimized
///
/// Implementations must be reentrant; the global optimizer may evaluate them from
/// several threads. Failures should be expressed as a large finite cost.
pub trait Objective: Sync {
    fn cost(&self, theta: &[f64]) -> f64;
}

impl<F> Objective for F
where
    F: Fn(&[f64]) -> f64 + Sync,
{
    fn cost(&self, theta: &[f64]) -> f64 {
        self(theta)
    }
}

/// Hard box constraints `lower <= theta <= upper`
///
/// # Examples
///
/// ```
/// use csgt::optimize::Bounds;
///
/// let bounds = Bounds::new(vec![(0.01, 0.5), (0.5, 2.0)]).unwrap();
/// assert_eq!(bounds.clamp(&[0.0, 3.0]), vec![0.01, 2.0]);
/// assert!(Bounds::new(vec![(1.0, 0.0)]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    labels: Vec<String>,
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl Bounds {
    /// Unlabelled bounds, named `x0`, `x1`, ...
    ///
    /// # Errors
    ///
    /// [CsgtError::InvalidBounds] if a pair is reversed or not finite.
    pub fn new(pairs: Vec<(f64, f64)>) -> Result<Self, CsgtError> {
        Self::labelled(
            pairs
                .into_iter()
                .enumerate()
                .map(|(i, (lower, upper))| (format!("x{i}"), lower, upper))
                .collect(),
        )
    }

    /// Bounds with parameter names
    pub fn labelled(entries: Vec<(String, f64, f64)>) -> Result<Self, CsgtError> {
        let mut labels = Vec::with_capacity(entries.len());
        let mut lower = Vec::with_capacity(entries.len());
        let mut upper = Vec::with_capacity(entries.len());
        for (name, lo, hi) in entries {
            if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
                return Err(CsgtError::InvalidBounds {
                    name,
                    lower: lo,
                    upper: hi,
                });
            }
            labels.push(name);
            lower.push(lo);
            upper.push(hi);
        }
        Ok(Self {
            labels,
            lower,
            upper,
        })
    }

    pub fn dim(&self) -> usize {
        self.lower.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lower.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Project a point into the box
    pub fn clamp(&self, theta: &[f64]) -> Vec<f64> {
        theta
            .iter()
            .zip(self.lower.iter().zip(self.upper.iter()))
            .map(|(&v, (&lo, &hi))| v.max(lo).min(hi))
            .collect()
    }

    pub fn contains(&self, theta: &[f64]) -> bool {
        theta.len() == self.dim()
            && theta
                .iter()
                .zip(self.lower.iter().zip(self.upper.iter()))
                .all(|(&v, (&lo, &hi))| v >= lo && v <= hi)
    }

    pub fn midpoint(&self) -> Vec<f64> {
        self.lower
            .iter()
            .zip(self.upper.iter())
            .map(|(lo, hi)| 0.5 * (lo + hi))
            .collect()
    }

    pub(crate) fn check_not_empty(&self) -> Result<(), CsgtError> {
        if self.is_empty() {
            Err(CsgtError::Config(
                "cannot fit a model without free parameters".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    pub(crate) fn check_dim(&self, theta: &[f64]) -> Result<(), CsgtError> {
        if theta.len() == self.dim() {
            Ok(())
        } else {
            Err(CsgtError::DimensionMismatch {
                expected: self.dim(),
                found: theta.len(),
            })
        }
    }
}

/// Which minimization strategy to run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Optimizer {
    Local(LocalOptions),
    Global(GlobalOptions),
}

impl Default for Optimizer {
    fn default() -> Self {
        Optimizer::Local(LocalOptions::default())
    }
}

impl Optimizer {
    pub fn local() -> Self {
        Optimizer::Local(LocalOptions::default())
    }

    pub fn global() -> Self {
        Optimizer::Global(GlobalOptions::default())
    }
}

/// Outcome of a fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub parameter_names: Vec<String>,
    /// Best point found, always inside the bounds
    pub parameters: Vec<f64>,
    /// Objective value at `parameters`
    pub chi_square: f64,
    pub converged: bool,
    pub iterations: u64,
    /// Number of objective evaluations, including finite-difference probes
    pub evaluations: usize,
    /// Termination reason
    pub message: String,
}

impl FitResult {
    /// Best-fit value of a named parameter
    pub fn get(&self, name: &str) -> Option<f64> {
        self.parameter_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.parameters[i])
    }

    /// A best point that still costs the penalty carries no information
    pub(crate) fn reject_penalty(mut self) -> Self {
        if !(self.chi_square < CHI2_PENALTY) {
            tracing::warn!(
                "Objective returned the penalty at the optimum ({:e})",
                self.chi_square
            );
            self.converged = false;
            self.message = "objective returned the penalty at the optimum".to_string();
        }
        self
    }
}

impl fmt::Display for FitResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chi2 = {:.4} (", self.chi_square)?;
        for (i, (name, value)) in self
            .parameter_names
            .iter()
            .zip(self.parameters.iter())
            .enumerate()
        {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name} = {value:.5}")?;
        }
        write!(
            f,
            "), converged = {}, iterations = {}, evaluations = {}: {}",
            self.converged, self.iterations, self.evaluations, self.message
        )
    }
}

/// Minimize `objective` inside `bounds`
///
/// # Errors
///
/// Only configuration errors: an empty parameter space, an initial guess or seed
/// member of the wrong dimension, or invalid optimizer settings. A fit that fails
/// to converge is returned as `Ok` with `converged = false`.
///
/// # Examples
///
/// ```
/// use csgt::optimize::{fit, Bounds, LocalOptions, Optimizer};
///
/// let bounds = Bounds::new(vec![(-5.0, 5.0), (-5.0, 5.0)]).unwrap();
/// let parabola = |x: &[f64]| (x[0] - 1.0).powi(2) + (x[1] + 2.0).powi(2);
/// let result = fit(&parabola, &bounds, &Optimizer::Local(LocalOptions::default())).unwrap();
/// assert!((result.parameters[0] - 1.0).abs() < 1e-4);
/// assert!((result.parameters[1] + 2.0).abs() < 1e-4);
/// ```
pub fn fit(
    objective: &dyn Objective,
    bounds: &Bounds,
    optimizer: &Optimizer,
) -> Result<FitResult, CsgtError> {
    bounds.check_not_empty()?;
    let result = match optimizer {
        Optimizer::Local(options) => lbfgsb::minimize(objective, bounds, options)?,
        Optimizer::Global(options) => evolution::minimize(objective, bounds, options)?,
    };
    if result.converged {
        tracing::info!("Fit converged: {}", result);
    } else {
        tracing::warn!("Fit did not converge: {}", result);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_validation() {
        assert!(Bounds::new(vec![(0.0, 1.0), (2.0, 2.0)]).is_ok());
        assert!(matches!(
            Bounds::new(vec![(0.0, f64::INFINITY)]),
            Err(CsgtError::InvalidBounds { .. })
        ));
        let named = Bounds::labelled(vec![("H0".to_string(), 80.0, 60.0)]);
        match named {
            Err(CsgtError::InvalidBounds { name, .. }) => assert_eq!(name, "H0"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bounds_geometry() {
        let bounds = Bounds::new(vec![(0.0, 1.0), (-2.0, 2.0)]).unwrap();
        assert_eq!(bounds.midpoint(), vec![0.5, 0.0]);
        assert!(bounds.contains(&[1.0, -2.0]));
        assert!(!bounds.contains(&[1.1, 0.0]));
        assert!(!bounds.contains(&[0.5]));
        assert_eq!(bounds.clamp(&[-1.0, 3.0]), vec![0.0, 2.0]);
    }

    #[test]
    fn empty_bounds_are_rejected() {
        let bounds = Bounds::new(vec![]).unwrap();
        let zero = |_: &[f64]| 0.0;
        assert!(fit(&zero, &bounds, &Optimizer::default()).is_err());
    }

    #[test]
    fn fit_result_lookup_and_display() {
        let result = FitResult {
            parameter_names: vec!["A".into(), "sigma".into()],
            parameters: vec![0.1, 0.9],
            chi_square: 12.5,
            converged: true,
            iterations: 7,
            evaluations: 40,
            message: "Solver converged".into(),
        };
        assert_eq!(result.get("sigma"), Some(0.9));
        assert_eq!(result.get("H0"), None);
        assert!(result.to_string().contains("A = 0.10000"));
    }

    #[test]
    fn optimizer_serde_tag() {
        let json = serde_json::to_string(&Optimizer::global()).unwrap();
        assert!(json.contains("\"method\":\"global\""));
        let back: Optimizer = serde_json::from_str(r#"{"method": "local"}"#).unwrap();
        assert_eq!(back, Optimizer::local());
    }
}
