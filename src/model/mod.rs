//! Parametrized cosmological models
//!
//! A [Model] fixes an equation-of-state [Family], baseline values for every
//! [Parameter] and the ordered list of free parameters with their box bounds.
//! [Model::realize] maps a free-parameter vector `theta` onto a concrete
//! [Realization]: background cosmology, dark energy and the supernova magnitude
//! offset. Optimizers only ever see `theta`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::background::{Cosmology, ExpansionRate, QuadratureOptions};
use crate::equation::{DarkEnergy, GaussianBump, LogisticInformation};
use crate::error::CsgtError;
use crate::optimize::Bounds;

/// A named model parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    /// Gaussian bump amplitude `A`
    Amplitude,
    /// Gaussian bump width
    Sigma,
    ZPeak,
    /// Constant background of the bump
    WOffset,
    /// Lifetime of the universe in Gyr (logistic information)
    TauEnd,
    H0,
    OmegaM,
    /// Supernova absolute magnitude offset `M`
    MagnitudeOffset,
}

impl Parameter {
    pub fn name(&self) -> &'static str {
        match self {
            Parameter::Amplitude => "A",
            Parameter::Sigma => "sigma",
            Parameter::ZPeak => "z_peak",
            Parameter::WOffset => "w_offset",
            Parameter::TauEnd => "tau_end",
            Parameter::H0 => "H0",
            Parameter::OmegaM => "Omega_m",
            Parameter::MagnitudeOffset => "M",
        }
    }

    /// Bounds used when a parameter is freed without explicit bounds
    pub fn default_bounds(&self) -> (f64, f64) {
        match self {
            Parameter::Amplitude => (0.01, 0.5),
            Parameter::Sigma => (0.1, 2.0),
            Parameter::ZPeak => (0.0, 2.0),
            Parameter::WOffset => (-1.5, -0.5),
            Parameter::TauEnd => (15.0, 500.0),
            Parameter::H0 => (50.0, 90.0),
            Parameter::OmegaM => (0.05, 0.6),
            Parameter::MagnitudeOffset => (-20.0, -18.5),
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Values of every [Parameter]
///
/// Holds the baseline of a [Model]; free parameters are overwritten by `theta`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterValues {
    pub amplitude: f64,
    pub sigma: f64,
    pub z_peak: f64,
    pub w_offset: f64,
    pub tau_end: f64,
    pub h0: f64,
    pub omega_m: f64,
    pub magnitude_offset: f64,
}

impl Default for ParameterValues {
    fn default() -> Self {
        Self {
            amplitude: 0.0833,
            sigma: 1.0,
            z_peak: GaussianBump::Z_PEAK,
            w_offset: -1.0,
            tau_end: 50.0,
            h0: 67.4,
            omega_m: 0.3,
            magnitude_offset: -19.3,
        }
    }
}

impl ParameterValues {
    pub fn get(&self, parameter: Parameter) -> f64 {
        match parameter {
            Parameter::Amplitude => self.amplitude,
            Parameter::Sigma => self.sigma,
            Parameter::ZPeak => self.z_peak,
            Parameter::WOffset => self.w_offset,
            Parameter::TauEnd => self.tau_end,
            Parameter::H0 => self.h0,
            Parameter::OmegaM => self.omega_m,
            Parameter::MagnitudeOffset => self.magnitude_offset,
        }
    }

    pub fn set(&mut self, parameter: Parameter, value: f64) {
        let slot = match parameter {
            Parameter::Amplitude => &mut self.amplitude,
            Parameter::Sigma => &mut self.sigma,
            Parameter::ZPeak => &mut self.z_peak,
            Parameter::WOffset => &mut self.w_offset,
            Parameter::TauEnd => &mut self.tau_end,
            Parameter::H0 => &mut self.h0,
            Parameter::OmegaM => &mut self.omega_m,
            Parameter::MagnitudeOffset => &mut self.magnitude_offset,
        };
        *slot = value;
    }

    /// Values for which `family` reduces to `w = -1`
    ///
    /// The Gaussian bump vanishes for `A = 0, w_offset = -1`; the logistic dive
    /// vanishes only for an infinite lifetime.
    fn lambda_limit(mut self, family: Family) -> Self {
        match family {
            Family::Lambda => {}
            Family::GaussianBump => {
                self.amplitude = 0.0;
                self.w_offset = -1.0;
            }
            Family::LogisticInformation => self.tau_end = f64::INFINITY,
        }
        self
    }
}

/// Equation-of-state family of a [Model]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    /// ΛCDM, `w = -1`
    Lambda,
    GaussianBump,
    LogisticInformation,
}

impl Family {
    /// Parameters that influence a realization of this family
    pub fn parameters(&self) -> &'static [Parameter] {
        use Parameter::*;
        match self {
            Family::Lambda => &[H0, OmegaM, MagnitudeOffset],
            Family::GaussianBump => &[
                Amplitude,
                Sigma,
                ZPeak,
                WOffset,
                H0,
                OmegaM,
                MagnitudeOffset,
            ],
            Family::LogisticInformation => &[TauEnd, H0, OmegaM, MagnitudeOffset],
        }
    }

    fn dark_energy(&self, values: &ParameterValues) -> DarkEnergy {
        match self {
            Family::Lambda => DarkEnergy::CosmologicalConstant,
            Family::GaussianBump => DarkEnergy::GaussianBump(GaussianBump::new(
                values.amplitude,
                values.sigma,
                values.z_peak,
                values.w_offset,
            )),
            Family::LogisticInformation => {
                DarkEnergy::LogisticInformation(LogisticInformation::new(values.tau_end))
            }
        }
    }
}

/// A free parameter and its box constraint
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FreeParameter {
    pub parameter: Parameter,
    pub lower: f64,
    pub upper: f64,
}

/// The concrete physics for one parameter vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Realization {
    pub cosmology: Cosmology,
    pub dark_energy: DarkEnergy,
    pub magnitude_offset: f64,
}

impl Realization {
    /// Direct `E(z)` / distance integrator for this realization
    pub fn expansion_rate(&self, quadrature: QuadratureOptions) -> ExpansionRate<'_> {
        ExpansionRate::new(self.cosmology, &self.dark_energy).with_quadrature(quadrature)
    }

    /// The ΛCDM realization sharing this background
    pub fn lambda_counterpart(&self) -> Realization {
        Realization {
            dark_energy: DarkEnergy::CosmologicalConstant,
            ..self.clone()
        }
    }
}

/// Point of a candidate parameter space corresponding to a reference optimum
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub theta: Vec<f64>,
    /// `true` when the candidate realization at `theta` is identical to the reference
    /// realization, so the candidate can do no worse than the reference
    pub exact: bool,
}

/// A model: family, baseline values and free parameters
///
/// # Examples
///
/// ```
/// use csgt::background::Cosmology;
/// use csgt::model::{Model, Parameter};
///
/// let model = Model::exact_gaussian(Cosmology::new(67.4, 0.3))
///     .with_free(Parameter::H0, 60.0, 80.0);
/// assert_eq!(model.n_free(), 3);
/// let realization = model.realize(&[0.1, 1.0, 70.0]).unwrap();
/// assert_eq!(realization.cosmology.h0, 70.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    name: String,
    family: Family,
    cosmology: Cosmology,
    values: ParameterValues,
    free: Vec<FreeParameter>,
}

impl Model {
    /// A model without free parameters; `h0` and `omega_m` are taken from `cosmology`
    pub fn new(name: impl Into<String>, family: Family, cosmology: Cosmology) -> Self {
        let values = ParameterValues {
            h0: cosmology.h0,
            omega_m: cosmology.omega_m,
            ..Default::default()
        };
        Self {
            name: name.into(),
            family,
            cosmology,
            values,
            free: Vec::new(),
        }
    }

    /// Free amplitude and width, peak at 0.7 on a `w = -1` background, `M = -19.3`
    pub fn exact_gaussian(cosmology: Cosmology) -> Self {
        Model::new("exact-gaussian", Family::GaussianBump, cosmology)
            .with_value(Parameter::Amplitude, 0.0833)
            .with_value(Parameter::Sigma, 1.0)
            .with_value(Parameter::ZPeak, GaussianBump::Z_PEAK)
            .with_value(Parameter::WOffset, -1.0)
            .with_value(Parameter::MagnitudeOffset, -19.3)
            .with_free(Parameter::Amplitude, 0.01, 0.5)
            .with_free(Parameter::Sigma, 0.5, 2.0)
    }

    /// Seven free parameters: bump shape, background offset and the SN calibration
    pub fn extended_gaussian(cosmology: Cosmology) -> Self {
        Model::new("extended-gaussian", Family::GaussianBump, cosmology)
            .with_value(Parameter::Sigma, 0.8)
            .with_value(Parameter::MagnitudeOffset, -19.35)
            .with_value(Parameter::H0, 73.0)
            .with_free(Parameter::Amplitude, 0.01, 0.5)
            .with_free(Parameter::Sigma, 0.1, 1.5)
            .with_free(Parameter::ZPeak, 0.4, 1.2)
            .with_free(Parameter::MagnitudeOffset, -19.38, -19.32)
            .with_free(Parameter::H0, 72.5, 73.5)
            .with_free(Parameter::OmegaM, 0.25, 0.35)
            .with_free(Parameter::WOffset, -1.10, -0.90)
    }

    /// ΛCDM with free calibration, Hubble constant and matter density
    pub fn lambda_cdm(cosmology: Cosmology) -> Self {
        Model::new("lambda-cdm", Family::Lambda, cosmology)
            .with_value(Parameter::MagnitudeOffset, -19.35)
            .with_value(Parameter::H0, 73.0)
            .with_free(Parameter::MagnitudeOffset, -19.38, -19.32)
            .with_free(Parameter::H0, 72.5, 73.5)
            .with_free(Parameter::OmegaM, 0.25, 0.35)
    }

    /// Logistic information dive with a free lifetime
    pub fn logistic_information(cosmology: Cosmology) -> Self {
        Model::new("logistic-information", Family::LogisticInformation, cosmology)
            .with_value(Parameter::TauEnd, 50.0)
            .with_free(Parameter::TauEnd, 15.0, 500.0)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the baseline value of a parameter
    ///
    /// For a free parameter this is the initial guess of local fits.
    pub fn with_value(mut self, parameter: Parameter, value: f64) -> Self {
        self.values.set(parameter, value);
        self
    }

    /// Free a parameter with explicit bounds, or update the bounds if already free
    pub fn with_free(mut self, parameter: Parameter, lower: f64, upper: f64) -> Self {
        match self.free.iter_mut().find(|f| f.parameter == parameter) {
            Some(existing) => {
                existing.lower = lower;
                existing.upper = upper;
            }
            None => self.free.push(FreeParameter {
                parameter,
                lower,
                upper,
            }),
        }
        self
    }

    /// Free a parameter with its [default bounds](Parameter::default_bounds)
    pub fn with_free_default(self, parameter: Parameter) -> Self {
        let (lower, upper) = parameter.default_bounds();
        self.with_free(parameter, lower, upper)
    }

    /// Update the bounds of a free parameter; fixed parameters are left untouched
    pub fn with_bounds(mut self, parameter: Parameter, lower: f64, upper: f64) -> Self {
        if let Some(existing) = self.free.iter_mut().find(|f| f.parameter == parameter) {
            existing.lower = lower;
            existing.upper = upper;
        }
        self
    }

    /// Fix a parameter at `value`, removing it from the free list
    pub fn with_fixed(mut self, parameter: Parameter, value: f64) -> Self {
        self.free.retain(|f| f.parameter != parameter);
        self.values.set(parameter, value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn cosmology(&self) -> &Cosmology {
        &self.cosmology
    }

    pub fn values(&self) -> &ParameterValues {
        &self.values
    }

    pub fn free(&self) -> &[FreeParameter] {
        &self.free
    }

    pub fn n_free(&self) -> usize {
        self.free.len()
    }

    pub fn free_parameters(&self) -> Vec<Parameter> {
        self.free.iter().map(|f| f.parameter).collect()
    }

    pub fn parameter_names(&self) -> Vec<String> {
        self.free.iter().map(|f| f.parameter.name().to_string()).collect()
    }

    /// Box constraints of the free parameters, in order
    ///
    /// # Errors
    ///
    /// [CsgtError::InvalidBounds] for reversed or non-finite bounds.
    pub fn bounds(&self) -> Result<Bounds, CsgtError> {
        Bounds::labelled(
            self.free
                .iter()
                .map(|f| (f.parameter.name().to_string(), f.lower, f.upper))
                .collect(),
        )
    }

    /// Baseline values of the free parameters, clamped into their bounds
    pub fn initial_guess(&self) -> Vec<f64> {
        self.free
            .iter()
            .map(|f| self.values.get(f.parameter).max(f.lower).min(f.upper))
            .collect()
    }

    /// Check that every free parameter acts on this family and the bounds are valid
    pub fn validate(&self) -> Result<(), CsgtError> {
        for free in &self.free {
            if !self.family.parameters().contains(&free.parameter) {
                return Err(CsgtError::Config(format!(
                    "parameter `{}` has no effect on the {:?} family of model `{}`",
                    free.parameter, self.family, self.name
                )));
            }
        }
        for (i, a) in self.free.iter().enumerate() {
            if self.free[..i].iter().any(|b| b.parameter == a.parameter) {
                return Err(CsgtError::Config(format!(
                    "parameter `{}` is listed twice in model `{}`",
                    a.parameter, self.name
                )));
            }
        }
        self.bounds().map(|_| ())
    }

    /// All parameter values after applying `theta`
    ///
    /// # Errors
    ///
    /// [CsgtError::DimensionMismatch] if `theta` does not match the free parameters.
    pub fn values_at(&self, theta: &[f64]) -> Result<ParameterValues, CsgtError> {
        if theta.len() != self.free.len() {
            return Err(CsgtError::DimensionMismatch {
                expected: self.free.len(),
                found: theta.len(),
            });
        }
        let mut values = self.values;
        for (free, &value) in self.free.iter().zip(theta) {
            values.set(free.parameter, value);
        }
        Ok(values)
    }

    /// Map a parameter vector onto the physics it describes
    ///
    /// # Errors
    ///
    /// - [CsgtError::DimensionMismatch] for a `theta` of the wrong length
    /// - [CsgtError::Config] if the resulting cosmology is invalid (non-finite
    ///   entries, non-positive `H0`, negative `Omega_m`)
    pub fn realize(&self, theta: &[f64]) -> Result<Realization, CsgtError> {
        let values = self.values_at(theta)?;
        let cosmology = Cosmology {
            h0: values.h0,
            omega_m: values.omega_m,
            ..self.cosmology
        };
        cosmology.validate()?;
        if !values.magnitude_offset.is_finite() {
            return Err(CsgtError::Config(format!(
                "magnitude offset must be finite, got {}",
                values.magnitude_offset
            )));
        }
        Ok(Realization {
            cosmology,
            dark_energy: self.family.dark_energy(&values),
            magnitude_offset: values.magnitude_offset,
        })
    }

    /// Map the optimum of a (nested) reference model into this model's parameter space
    ///
    /// Shared parameters take the reference values. When the families differ, the
    /// extra parameters are set to their ΛCDM limit. Values outside this model's
    /// bounds are clamped, in which case the embedding is not exact. Neither is it
    /// when the two models disagree on `Omega_r` or the speed of light.
    ///
    /// # Errors
    ///
    /// [CsgtError::DimensionMismatch] if `theta_ref` does not fit `reference`.
    pub fn embed(&self, reference: &Model, theta_ref: &[f64]) -> Result<Embedding, CsgtError> {
        let reference_values = reference.values_at(theta_ref)?;
        let target = if reference.family == self.family {
            reference_values
        } else if reference.family == Family::Lambda {
            reference_values.lambda_limit(self.family)
        } else {
            // Families are not nested; only the shared parameters carry over
            let mut values = reference_values;
            for &p in self.family.parameters() {
                if !reference.family.parameters().contains(&p) {
                    values.set(p, self.values.get(p));
                }
            }
            values
        };
        let mut exact = reference.family == self.family || reference.family == Family::Lambda;

        let theta = self
            .free
            .iter()
            .map(|f| {
                let wanted = target.get(f.parameter);
                let clamped = wanted.max(f.lower).min(f.upper);
                if clamped != wanted {
                    exact = false;
                }
                clamped
            })
            .collect();

        // Fixed parameters must agree with the reference, unless they cannot matter
        let is_free = |p: Parameter| self.free.iter().any(|f| f.parameter == p);
        let silent = |p: Parameter| {
            self.family == Family::GaussianBump
                && target.amplitude == 0.0
                && matches!(p, Parameter::Sigma | Parameter::ZPeak)
        };
        for &p in self.family.parameters() {
            if !is_free(p) && !silent(p) && self.values.get(p) != target.get(p) {
                exact = false;
            }
        }

        // Background constants outside the parameter set must match as well
        if self.cosmology.omega_r != reference.cosmology.omega_r
            || self.cosmology.speed_of_light != reference.cosmology.speed_of_light
        {
            exact = false;
        }

        Ok(Embedding { theta, exact })
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?}", self.name, self.family)?;
        for free in &self.free {
            write!(f, ", {} in [{}, {}]", free.parameter, free.lower, free.upper)?;
        }
        write!(f, ")")
    }
}
