//! Differential evolution
//!
//! `best1bin` strategy: every trial vector is the current best plus a scaled
//! difference of two other members, crossed over binomially with its parent.
//! The population starts from a Latin hypercube and is updated once per
//! generation, so a seeded run gives the same result whether the costs are
//! evaluated serially or on the rayon pool.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::lbfgsb::{self, LocalOptions};
use super::{Bounds, FitResult, Objective};
use crate::error::CsgtError;
use crate::likelihood::CHI2_PENALTY;

/// Settings of the global optimizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalOptions {
    /// Population size per free parameter
    pub popsize: usize,
    pub max_generations: u64,
    /// Relative convergence tolerance on the spread of the population costs
    pub tol: f64,
    /// Absolute convergence tolerance on the spread of the population costs
    pub atol: f64,
    /// Range the differential weight is drawn from each generation
    pub mutation: (f64, f64),
    /// Crossover probability
    pub recombination: f64,
    /// Seed for reproducible runs; drawn from the OS when absent
    pub seed: Option<u64>,
    /// Members placed in the initial population ahead of the Latin hypercube
    pub init_population: Vec<Vec<f64>>,
    /// Refine the best member with the local optimizer
    pub polish: bool,
    /// Evaluate each generation on the rayon thread pool
    pub parallel: bool,
}

impl Default for GlobalOptions {
    fn default() -> Self {
        Self {
            popsize: 15,
            max_generations: 1000,
            tol: 0.01,
            atol: 0.0,
            mutation: (0.5, 1.0),
            recombination: 0.7,
            seed: None,
            init_population: Vec::new(),
            polish: true,
            parallel: false,
        }
    }
}

impl GlobalOptions {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_popsize(mut self, popsize: usize) -> Self {
        self.popsize = popsize;
        self
    }

    pub fn with_max_generations(mut self, max_generations: u64) -> Self {
        self.max_generations = max_generations;
        self
    }

    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Add a member to the initial population
    pub fn with_member(mut self, member: Vec<f64>) -> Self {
        self.init_population.push(member);
        self
    }

    pub fn with_polish(mut self, polish: bool) -> Self {
        self.polish = polish;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    fn validate(&self) -> Result<(), CsgtError> {
        let (lo, hi) = self.mutation;
        if !(lo >= 0.0 && lo <= hi && hi <= 2.0) {
            return Err(CsgtError::Optimizer(format!(
                "mutation range must satisfy 0 <= lo <= hi <= 2, got ({lo}, {hi})"
            )));
        }
        if !(0.0..=1.0).contains(&self.recombination) {
            return Err(CsgtError::Optimizer(format!(
                "recombination must lie in [0, 1], got {}",
                self.recombination
            )));
        }
        if !(self.tol >= 0.0 && self.atol >= 0.0) {
            return Err(CsgtError::Optimizer(
                "convergence tolerances must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}

fn evaluate(objective: &dyn Objective, theta: &[f64]) -> f64 {
    let cost = objective.cost(theta);
    if cost.is_finite() {
        cost
    } else {
        CHI2_PENALTY
    }
}

fn evaluate_all(objective: &dyn Objective, members: &[Vec<f64>], parallel: bool) -> Vec<f64> {
    if parallel {
        members
            .par_iter()
            .map(|theta| evaluate(objective, theta))
            .collect()
    } else {
        members
            .iter()
            .map(|theta| evaluate(objective, theta))
            .collect()
    }
}

/// One point per stratum along every axis, strata shuffled independently
fn latin_hypercube(bounds: &Bounds, size: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut population = vec![vec![0.0; bounds.dim()]; size];
    let segment = 1.0 / size as f64;
    let mut strata: Vec<usize> = (0..size).collect();
    for j in 0..bounds.dim() {
        strata.shuffle(rng);
        let (lo, hi) = (bounds.lower()[j], bounds.upper()[j]);
        for (member, &k) in population.iter_mut().zip(strata.iter()) {
            let u = (k as f64 + rng.random::<f64>()) * segment;
            member[j] = lo + u * (hi - lo);
        }
    }
    population
}

/// Two distinct indices, both different from `exclude`
fn pick_two(size: usize, exclude: usize, rng: &mut StdRng) -> (usize, usize) {
    let mut r1 = rng.random_range(0..size);
    while r1 == exclude {
        r1 = rng.random_range(0..size);
    }
    let mut r2 = rng.random_range(0..size);
    while r2 == exclude || r2 == r1 {
        r2 = rng.random_range(0..size);
    }
    (r1, r2)
}

fn mean_and_std(costs: &[f64]) -> (f64, f64) {
    let n = costs.len() as f64;
    let mean = costs.iter().sum::<f64>() / n;
    let var = costs.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

fn best_index(costs: &[f64]) -> usize {
    costs
        .iter()
        .enumerate()
        .fold(0, |best, (i, &c)| if c < costs[best] { i } else { best })
}

/// Run differential evolution, optionally followed by a local polish
///
/// # Errors
///
/// [CsgtError::Config] for an empty parameter space,
/// [CsgtError::DimensionMismatch] for an initial member of the wrong length and
/// [CsgtError::Optimizer] for invalid settings.
pub fn minimize(
    objective: &dyn Objective,
    bounds: &Bounds,
    options: &GlobalOptions,
) -> Result<FitResult, CsgtError> {
    bounds.check_not_empty()?;
    options.validate()?;
    for member in &options.init_population {
        bounds.check_dim(member)?;
    }

    let dim = bounds.dim();
    let size = (options.popsize * dim).max(5);
    let mut rng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut population = latin_hypercube(bounds, size, &mut rng);
    for (slot, member) in population.iter_mut().zip(options.init_population.iter()) {
        *slot = bounds.clamp(member);
    }
    if options.init_population.len() > size {
        tracing::warn!(
            "{} seed members supplied, only the first {size} are used",
            options.init_population.len()
        );
    }

    let mut costs = evaluate_all(objective, &population, options.parallel);
    let mut evaluations = size;
    let mut best = best_index(&costs);

    tracing::debug!(
        "Differential evolution: {dim} parameters, population {size}, best start cost {:.6}",
        costs[best]
    );

    let mut converged = false;
    let mut generations = 0;
    while generations < options.max_generations {
        generations += 1;

        let (f_lo, f_hi) = options.mutation;
        let scale = if f_hi > f_lo {
            rng.random_range(f_lo..f_hi)
        } else {
            f_lo
        };

        let trials: Vec<Vec<f64>> = (0..size)
            .map(|i| {
                let (r1, r2) = pick_two(size, i, &mut rng);
                let forced = rng.random_range(0..dim);
                (0..dim)
                    .map(|j| {
                        if j == forced || rng.random::<f64>() < options.recombination {
                            let (lo, hi) = (bounds.lower()[j], bounds.upper()[j]);
                            let v = population[best][j]
                                + scale * (population[r1][j] - population[r2][j]);
                            if v < lo || v > hi {
                                lo + rng.random::<f64>() * (hi - lo)
                            } else {
                                v
                            }
                        } else {
                            population[i][j]
                        }
                    })
                    .collect()
            })
            .collect();

        let trial_costs = evaluate_all(objective, &trials, options.parallel);
        evaluations += size;

        for (i, (trial, cost)) in trials.into_iter().zip(trial_costs).enumerate() {
            if cost <= costs[i] {
                population[i] = trial;
                costs[i] = cost;
            }
        }
        best = best_index(&costs);

        let (mean, spread) = mean_and_std(&costs);
        tracing::trace!(
            "generation {generations}: best {:.6}, mean {:.6}, spread {:.3e}",
            costs[best],
            mean,
            spread
        );
        if spread <= options.atol + options.tol * mean.abs() {
            converged = true;
            break;
        }
    }

    let message = if converged {
        "Optimization terminated successfully".to_string()
    } else {
        "Maximum number of generations reached".to_string()
    };
    let mut result = FitResult {
        parameter_names: bounds.labels().to_vec(),
        parameters: population[best].clone(),
        chi_square: costs[best],
        converged,
        iterations: generations,
        evaluations,
        message,
    };

    if options.polish {
        let local = LocalOptions::default().with_initial_guess(result.parameters.clone());
        let polished = lbfgsb::minimize(objective, bounds, &local)?;
        result.evaluations += polished.evaluations;
        if polished.chi_square < result.chi_square {
            tracing::debug!(
                "Polish improved chi2 from {:.6} to {:.6}",
                result.chi_square,
                polished.chi_square
            );
            result.parameters = polished.parameters;
            result.chi_square = polished.chi_square;
        }
    }

    Ok(result.reject_penalty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn rastrigin(x: &[f64]) -> f64 {
        10.0 * x.len() as f64
            + x.iter()
                .map(|v| v * v - 10.0 * (2.0 * std::f64::consts::PI * v).cos())
                .sum::<f64>()
    }

    #[test]
    fn finds_the_global_minimum_of_rastrigin() {
        let f = |x: &[f64]| rastrigin(x);
        let bounds = Bounds::new(vec![(-5.12, 5.12), (-5.12, 5.12)]).unwrap();
        let result = minimize(&f, &bounds, &GlobalOptions::default().with_seed(7)).unwrap();
        assert!(result.chi_square < 1e-6, "{result}");
        assert_relative_eq!(result.parameters[0], 0.0, epsilon = 1e-4);
        assert_relative_eq!(result.parameters[1], 0.0, epsilon = 1e-4);
    }

    #[test]
    fn seeded_runs_are_reproducible_and_thread_independent() {
        let f = |x: &[f64]| (x[0] - 0.3).powi(2) + (x[1] + 0.2).powi(2);
        let bounds = Bounds::new(vec![(-1.0, 1.0), (-1.0, 1.0)]).unwrap();
        let options = GlobalOptions::default().with_seed(42).with_polish(false);
        let serial = minimize(&f, &bounds, &options).unwrap();
        let again = minimize(&f, &bounds, &options).unwrap();
        let parallel = minimize(&f, &bounds, &options.clone().with_parallel(true)).unwrap();
        assert_eq!(serial.parameters, again.parameters);
        assert_eq!(serial.parameters, parallel.parameters);
        assert_eq!(serial.iterations, parallel.iterations);
    }

    #[test]
    fn stays_inside_the_bounds() {
        let f = |x: &[f64]| {
            assert!((0.0..=1.0).contains(&x[0]), "evaluated outside at {x:?}");
            -x[0]
        };
        let bounds = Bounds::new(vec![(0.0, 1.0)]).unwrap();
        let result = minimize(&f, &bounds, &GlobalOptions::default().with_seed(1)).unwrap();
        assert_relative_eq!(result.parameters[0], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn seed_member_is_never_lost() {
        // A narrow well that random sampling is unlikely to hit
        let f = |x: &[f64]| {
            let d = (x[0] - 0.123456).powi(2) + (x[1] - 0.654321).powi(2);
            if d < 1e-8 {
                -1.0 + d
            } else {
                0.0
            }
        };
        let bounds = Bounds::new(vec![(0.0, 1.0), (0.0, 1.0)]).unwrap();
        let options = GlobalOptions::default()
            .with_seed(3)
            .with_polish(false)
            .with_max_generations(20)
            .with_member(vec![0.123456, 0.654321]);
        let result = minimize(&f, &bounds, &options).unwrap();
        assert!(result.chi_square <= -1.0 + 1e-12, "{result}");
    }

    #[test]
    fn non_finite_costs_are_penalized() {
        let f = |x: &[f64]| if x[0] < 0.5 { f64::NAN } else { (x[0] - 0.7).powi(2) };
        let bounds = Bounds::new(vec![(0.0, 1.0)]).unwrap();
        let result = minimize(&f, &bounds, &GlobalOptions::default().with_seed(11)).unwrap();
        assert!(result.chi_square.is_finite());
        assert_relative_eq!(result.parameters[0], 0.7, epsilon = 1e-4);
    }

    #[test]
    fn flat_penalty_population_is_not_converged() {
        let f = |_: &[f64]| CHI2_PENALTY;
        let bounds = Bounds::new(vec![(0.0, 1.0), (-1.0, 1.0)]).unwrap();
        for polish in [false, true] {
            let options = GlobalOptions::default()
                .with_seed(5)
                .with_max_generations(10)
                .with_polish(polish);
            let result = minimize(&f, &bounds, &options).unwrap();
            assert!(!result.converged, "{result}");
            assert!(result.message.contains("penalty"));
        }
    }

    #[test]
    fn empty_parameter_space_is_an_error() {
        let f = |_: &[f64]| 0.0;
        let bounds = Bounds::new(Vec::new()).unwrap();
        assert!(matches!(
            minimize(&f, &bounds, &GlobalOptions::default().with_seed(1)),
            Err(CsgtError::Config(_))
        ));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let f = |x: &[f64]| x[0];
        let bounds = Bounds::new(vec![(0.0, 1.0)]).unwrap();
        let mut options = GlobalOptions::default();
        options.recombination = 1.5;
        assert!(matches!(
            minimize(&f, &bounds, &options),
            Err(CsgtError::Optimizer(_))
        ));
        let wrong = GlobalOptions::default().with_member(vec![0.1, 0.2]);
        assert!(matches!(
            minimize(&f, &bounds, &wrong),
            Err(CsgtError::DimensionMismatch { .. })
        ));
    }
}
