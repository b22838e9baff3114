//! JSON analysis configuration
//!
//! An [AnalysisConfig] names everything a model comparison needs: the background
//! cosmology, the candidate and reference models, where the observations come from
//! and which optimizer to run. [Analysis] resolves it into models and a dataset.
//!
//! ```json
//! {
//!   "cosmology": { "h0": 67.4, "omega_m": 0.3 },
//!   "candidate": { "preset": "exact_gaussian" },
//!   "reference": { "preset": "exact_gaussian", "name": "fixed-width",
//!                  "fixed": { "sigma": 1.0 } },
//!   "data": [ { "source": "fiducial", "sample": "pantheon" },
//!             { "source": "file", "path": "bao.csv", "observable": "hubble_rate",
//!               "options": { "delimiter": "comma" } } ],
//!   "optimizer": { "method": "global", "seed": 42 }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::background::Cosmology;
use crate::data::{fiducial, read_table, Dataset, Observable, ObservationSet, TableOptions};
use crate::error::CsgtError;
use crate::model::{FreeParameter, Model, Parameter};
use crate::optimize::{compare_models, fit_model, ComparisonOptions, FitResult, ModelComparison, Optimizer};

/// Built-in models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelPreset {
    ExactGaussian,
    ExtendedGaussian,
    LambdaCdm,
    LogisticInformation,
}

impl ModelPreset {
    pub fn build(self, cosmology: Cosmology) -> Model {
        match self {
            ModelPreset::ExactGaussian => Model::exact_gaussian(cosmology),
            ModelPreset::ExtendedGaussian => Model::extended_gaussian(cosmology),
            ModelPreset::LambdaCdm => Model::lambda_cdm(cosmology),
            ModelPreset::LogisticInformation => Model::logistic_information(cosmology),
        }
    }
}

/// A preset with optional overrides
///
/// Overrides apply in the order baseline values, newly freed parameters, fixed
/// parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    pub preset: ModelPreset,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Baseline values, also the initial guess of free parameters
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<Parameter, f64>,
    /// Parameters to free, or free parameters to re-bound
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub free: Vec<FreeParameter>,
    /// Parameters to fix at a value
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fixed: BTreeMap<Parameter, f64>,
}

impl ModelConfig {
    pub fn preset(preset: ModelPreset) -> Self {
        Self {
            preset,
            name: None,
            values: BTreeMap::new(),
            free: Vec::new(),
            fixed: BTreeMap::new(),
        }
    }

    /// Build and validate the model
    pub fn build(&self, cosmology: Cosmology) -> Result<Model, CsgtError> {
        let mut model = self.preset.build(cosmology);
        if let Some(name) = &self.name {
            model = model.with_name(name.clone());
        }
        for (&parameter, &value) in &self.values {
            model = model.with_value(parameter, value);
        }
        for free in &self.free {
            model = model.with_free(free.parameter, free.lower, free.upper);
        }
        for (&parameter, &value) in &self.fixed {
            model = model.with_fixed(parameter, value);
        }
        model.validate()?;
        Ok(model)
    }
}

/// Built-in observation samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FiducialSample {
    Pantheon,
    DesiBao,
}

/// Where an observation set comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum DataSource {
    /// A table on disk; relative paths are resolved against the configuration file
    File {
        path: PathBuf,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        observable: Observable,
        #[serde(default)]
        options: TableOptions,
    },
    Fiducial { sample: FiducialSample },
}

impl DataSource {
    pub fn load(&self, base_dir: Option<&Path>) -> Result<ObservationSet, CsgtError> {
        let set = match self {
            DataSource::File {
                path,
                name,
                observable,
                options,
            } => {
                let path = match base_dir {
                    Some(dir) if path.is_relative() => dir.join(path),
                    _ => path.clone(),
                };
                let name = name
                    .clone()
                    .unwrap_or_else(|| path.display().to_string());
                read_table(&path, name, *observable, options)?
            }
            DataSource::Fiducial { sample } => match sample {
                FiducialSample::Pantheon => fiducial::pantheon_sample()?,
                FiducialSample::DesiBao => fiducial::desi_bao_sample()?,
            },
        };
        Ok(set)
    }
}

fn lambda_cdm_reference() -> ModelConfig {
    ModelConfig::preset(ModelPreset::LambdaCdm)
}

/// Everything needed to run a model comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub cosmology: Cosmology,
    pub candidate: ModelConfig,
    /// ΛCDM when absent
    #[serde(default = "lambda_cdm_reference")]
    pub reference: ModelConfig,
    pub data: Vec<DataSource>,
    #[serde(default)]
    pub optimizer: Optimizer,
    #[serde(default)]
    pub comparison: ComparisonOptions,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

impl AnalysisConfig {
    pub fn new(candidate: ModelConfig, data: Vec<DataSource>) -> Self {
        Self {
            cosmology: Cosmology::default(),
            candidate,
            reference: lambda_cdm_reference(),
            data,
            optimizer: Optimizer::default(),
            comparison: ComparisonOptions::default(),
            base_dir: None,
        }
    }

    /// Parse a configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, CsgtError> {
        let config: Self = serde_json::from_str(json)?;
        config.cosmology.validate()?;
        Ok(config)
    }

    /// Read a configuration file; relative data paths are taken relative to it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CsgtError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let mut config = Self::from_json(&json)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        tracing::debug!("Loaded analysis configuration from {}", path.display());
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, CsgtError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn with_reference(mut self, reference: ModelConfig) -> Self {
        self.reference = reference;
        self
    }

    pub fn with_cosmology(mut self, cosmology: Cosmology) -> Self {
        self.cosmology = cosmology;
        self
    }

    pub fn with_optimizer(mut self, optimizer: Optimizer) -> Self {
        self.optimizer = optimizer;
        self
    }

    pub fn with_comparison(mut self, comparison: ComparisonOptions) -> Self {
        self.comparison = comparison;
        self
    }
}

/// A resolved configuration: models built, data loaded
#[derive(Debug, Clone)]
pub struct Analysis {
    candidate: Model,
    reference: Model,
    dataset: Dataset,
    optimizer: Optimizer,
    comparison: ComparisonOptions,
}

impl Analysis {
    /// Build the models and load every data source
    ///
    /// # Errors
    ///
    /// Invalid models, unreadable data sources or an empty data list.
    pub fn new(config: &AnalysisConfig) -> Result<Self, CsgtError> {
        if config.data.is_empty() {
            return Err(CsgtError::Config("no data sources configured".to_string()));
        }
        let candidate = config.candidate.build(config.cosmology)?;
        let reference = config.reference.build(config.cosmology)?;
        let dataset = config
            .data
            .iter()
            .map(|source| source.load(config.base_dir.as_deref()))
            .collect::<Result<Vec<_>, _>>()
            .map(Dataset::new)?;
        tracing::info!(
            "Analysis of {} against {}: {} observations in {} sets",
            candidate.name(),
            reference.name(),
            dataset.n_observations(),
            dataset.sets().len()
        );
        Ok(Self {
            candidate,
            reference,
            dataset,
            optimizer: config.optimizer.clone(),
            comparison: config.comparison,
        })
    }

    pub fn candidate(&self) -> &Model {
        &self.candidate
    }

    pub fn reference(&self) -> &Model {
        &self.reference
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Fit the candidate alone
    pub fn fit(&self) -> Result<FitResult, CsgtError> {
        fit_model(
            &self.candidate,
            &self.dataset,
            &self.optimizer,
            &self.comparison.likelihood,
        )
    }

    /// Fit both models and compare them
    pub fn run(&self) -> Result<ModelComparison, CsgtError> {
        compare_models(
            &self.candidate,
            &self.reference,
            &self.dataset,
            &self.optimizer,
            &self.comparison,
        )
    }
}
