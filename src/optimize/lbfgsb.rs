//! Box-constrained L-BFGS
//!
//! argmin's [LBFGS] with a More–Thuente line search is run on a wrapper problem
//! that clamps every proposal into the bounds before evaluating the objective, so
//! the objective is never called outside the box. Gradients are finite
//! differences (one-sided at a bound) and components that would push further
//! out of an active bound are zeroed.

use argmin::core::{
    CostFunction, Error, Executor, Gradient, State, TerminationReason, TerminationStatus,
};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{Bounds, FitResult, Objective};
use crate::error::CsgtError;
use crate::likelihood::CHI2_PENALTY;

/// Tolerance for treating a coordinate as sitting on its bound
const ACTIVE_BOUND_EPS: f64 = 1e-12;

/// Settings of the local optimizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalOptions {
    pub max_iters: u64,
    /// Convergence tolerance on the gradient norm
    pub grad_tol: f64,
    /// Convergence tolerance on the change in cost between iterations
    pub cost_tol: f64,
    /// Number of correction pairs kept for the inverse Hessian
    pub history: usize,
    /// Relative finite-difference step
    pub fd_step: f64,
    /// Starting point; the midpoint of the bounds when absent
    pub initial_guess: Option<Vec<f64>>,
}

impl Default for LocalOptions {
    fn default() -> Self {
        Self {
            max_iters: 1000,
            grad_tol: 1e-6,
            cost_tol: 1e-9,
            history: 10,
            fd_step: 1e-7,
            initial_guess: None,
        }
    }
}

impl LocalOptions {
    pub fn with_initial_guess(mut self, initial_guess: Vec<f64>) -> Self {
        self.initial_guess = Some(initial_guess);
        self
    }

    pub fn with_max_iters(mut self, max_iters: u64) -> Self {
        self.max_iters = max_iters;
        self
    }

    pub fn with_grad_tol(mut self, grad_tol: f64) -> Self {
        self.grad_tol = grad_tol;
        self
    }

    pub fn with_cost_tol(mut self, cost_tol: f64) -> Self {
        self.cost_tol = cost_tol;
        self
    }

    pub fn with_history(mut self, history: usize) -> Self {
        self.history = history;
        self
    }
}

/// Lowest cost seen so far and where
struct BestPoint {
    cost: f64,
    theta: Vec<f64>,
}

/// Wrapper making an [Objective] usable by argmin
struct BoundedProblem<'a> {
    objective: &'a dyn Objective,
    bounds: &'a Bounds,
    fd_step: f64,
    evaluations: &'a AtomicUsize,
    best: &'a Mutex<BestPoint>,
}

impl BoundedProblem<'_> {
    /// Evaluate at a point already inside the bounds, recording the best
    fn evaluate(&self, theta: &[f64]) -> f64 {
        self.evaluations.fetch_add(1, Ordering::Relaxed);
        let cost = self.objective.cost(theta);
        let cost = if cost.is_finite() { cost } else { CHI2_PENALTY };
        if let Ok(mut best) = self.best.lock() {
            if cost < best.cost {
                best.cost = cost;
                best.theta = theta.to_vec();
            }
        }
        cost
    }

    fn finite_difference(&self, theta: &[f64]) -> Vec<f64> {
        let f0 = self.evaluate(theta);
        let lower = self.bounds.lower();
        let upper = self.bounds.upper();
        let mut probe = theta.to_vec();
        let mut grad = vec![0.0; theta.len()];

        for i in 0..theta.len() {
            if upper[i] <= lower[i] {
                continue;
            }
            let h = self.fd_step * theta[i].abs().max(1.0);
            let x = theta[i];
            grad[i] = if x - h >= lower[i] && x + h <= upper[i] {
                probe[i] = x + h;
                let plus = self.evaluate(&probe);
                probe[i] = x - h;
                let minus = self.evaluate(&probe);
                (plus - minus) / (2.0 * h)
            } else if x + h <= upper[i] {
                probe[i] = x + h;
                (self.evaluate(&probe) - f0) / h
            } else {
                probe[i] = x - h;
                (f0 - self.evaluate(&probe)) / h
            };
            probe[i] = x;
        }

        // Projected gradient at active bounds
        for (i, g) in grad.iter_mut().enumerate() {
            if theta[i] <= lower[i] + ACTIVE_BOUND_EPS && *g > 0.0 {
                *g = 0.0;
            }
            if theta[i] >= upper[i] - ACTIVE_BOUND_EPS && *g < 0.0 {
                *g = 0.0;
            }
        }
        grad
    }
}

impl CostFunction for BoundedProblem<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, Error> {
        Ok(self.evaluate(&self.bounds.clamp(param)))
    }
}

impl Gradient for BoundedProblem<'_> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, param: &Self::Param) -> Result<Self::Gradient, Error> {
        Ok(self.finite_difference(&self.bounds.clamp(param)))
    }
}

/// Run the local optimizer
///
/// # Errors
///
/// [CsgtError::DimensionMismatch] for an initial guess of the wrong length and
/// [CsgtError::Optimizer] for invalid tolerances. Everything that goes wrong while
/// iterating yields a non-converged [FitResult] at the best point seen.
pub fn minimize(
    objective: &dyn Objective,
    bounds: &Bounds,
    options: &LocalOptions,
) -> Result<FitResult, CsgtError> {
    bounds.check_not_empty()?;
    let start = match &options.initial_guess {
        Some(guess) => {
            bounds.check_dim(guess)?;
            bounds.clamp(guess)
        }
        None => bounds.midpoint(),
    };

    let linesearch = MoreThuenteLineSearch::new();
    let solver = LBFGS::new(linesearch, options.history.max(1))
        .with_tolerance_grad(options.grad_tol)
        .map_err(|e| CsgtError::Optimizer(format!("invalid gradient tolerance: {e}")))?
        .with_tolerance_cost(options.cost_tol)
        .map_err(|e| CsgtError::Optimizer(format!("invalid cost tolerance: {e}")))?;

    let evaluations = AtomicUsize::new(0);
    let best = Mutex::new(BestPoint {
        cost: f64::INFINITY,
        theta: start.clone(),
    });
    let problem = BoundedProblem {
        objective,
        bounds,
        fd_step: options.fd_step,
        evaluations: &evaluations,
        best: &best,
    };

    tracing::debug!(
        "L-BFGS-B: {} parameters, start {:?}, max_iters {}, grad_tol {:e}",
        bounds.dim(),
        start,
        options.max_iters,
        options.grad_tol
    );

    let outcome = Executor::new(problem, solver)
        .configure(|state| state.param(start.clone()).max_iters(options.max_iters))
        .run();

    let (iterations, converged, message) = match outcome {
        Ok(result) => {
            let state = result.state();
            let status = state.get_termination_status();
            let converged = matches!(
                status,
                TerminationStatus::Terminated(TerminationReason::SolverConverged)
                    | TerminationStatus::Terminated(TerminationReason::TargetCostReached)
            );
            (state.get_iter(), converged, status.to_string())
        }
        Err(e) => {
            tracing::warn!("L-BFGS-B stopped with an error: {e}");
            (0, false, format!("optimizer error: {e}"))
        }
    };

    let evaluations = evaluations.load(Ordering::Relaxed);
    let (theta, chi_square) = match best.into_inner() {
        Ok(best) if best.cost.is_finite() => (best.theta, best.cost),
        _ => {
            let theta = start;
            let cost = objective.cost(&theta);
            (theta, cost)
        }
    };

    tracing::debug!("L-BFGS-B finished after {iterations} iterations: {message}");

    Ok(FitResult {
        parameter_names: bounds.labels().to_vec(),
        parameters: theta,
        chi_square,
        converged,
        iterations,
        evaluations,
        message,
    }
    .reject_penalty())
}
