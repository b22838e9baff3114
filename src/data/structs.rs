use serde::{Deserialize, Serialize};
use std::fmt;

use crate::data::observation_error::DataError;

/// The physical quantity an [ObservationSet] measures
///
/// The likelihood uses this tag to choose the projection from a model
/// realization to a predicted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Observable {
    /// Supernova distance modulus `mu = m - M`, in magnitudes
    DistanceModulus,
    /// Expansion rate `H(z)` in km/s/Mpc, as derived from BAO measurements
    HubbleRate,
}

impl fmt::Display for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observable::DistanceModulus => write!(f, "distance modulus"),
            Observable::HubbleRate => write!(f, "H(z)"),
        }
    }
}

/// A single measurement: redshift, observed value and its 1-sigma uncertainty
///
/// Deserialization goes through [Observation::new].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawObservation", into = "RawObservation")]
pub struct Observation {
    z: f64,
    value: f64,
    sigma: f64,
}

#[derive(Clone, Copy, Serialize, Deserialize)]
struct RawObservation {
    z: f64,
    value: f64,
    sigma: f64,
}

impl TryFrom<RawObservation> for Observation {
    type Error = DataError;

    fn try_from(raw: RawObservation) -> Result<Self, Self::Error> {
        Observation::new(raw.z, raw.value, raw.sigma)
    }
}

impl From<Observation> for RawObservation {
    fn from(observation: Observation) -> Self {
        RawObservation {
            z: observation.z,
            value: observation.value,
            sigma: observation.sigma,
        }
    }
}

impl Observation {
    /// Create a validated observation
    ///
    /// # Errors
    ///
    /// Returns [DataError::InvalidObservation] when any field is non-finite,
    /// when `z < 0` or when `sigma <= 0`.
    pub fn new(z: f64, value: f64, sigma: f64) -> Result<Self, DataError> {
        let invalid = |reason| DataError::InvalidObservation {
            z,
            value,
            sigma,
            reason,
        };
        if !(z.is_finite() && value.is_finite() && sigma.is_finite()) {
            return Err(invalid("all fields must be finite"));
        }
        if z < 0.0 {
            return Err(invalid("redshift must be non-negative"));
        }
        if sigma <= 0.0 {
            return Err(invalid("uncertainty must be positive"));
        }
        Ok(Self { z, value, sigma })
    }

    pub fn z(&self) -> f64 {
        self.z
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }
}

/// An immutable, named collection of observations of one [Observable]
///
/// Sets are constructed through [ObservationSet::new], the
/// [builder](ObservationSet::builder) or one of the loaders in [crate::data::parser].
/// Observations are kept sorted by redshift.
///
/// # Examples
///
/// ```
/// use csgt::prelude::data::*;
///
/// let bao = ObservationSet::builder("DESI", Observable::HubbleRate)
///     .observation(0.51, 65.72, 1.99)
///     .observation(0.706, 67.78, 1.75)
///     .build()
///     .unwrap();
/// assert_eq!(bao.len(), 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawObservationSet", into = "RawObservationSet")]
pub struct ObservationSet {
    name: String,
    observable: Observable,
    observations: Vec<Observation>,
}

#[derive(Serialize, Deserialize)]
struct RawObservationSet {
    name: String,
    observable: Observable,
    observations: Vec<Observation>,
}

impl TryFrom<RawObservationSet> for ObservationSet {
    type Error = DataError;

    fn try_from(raw: RawObservationSet) -> Result<Self, Self::Error> {
        ObservationSet::new(raw.name, raw.observable, raw.observations)
    }
}

impl From<ObservationSet> for RawObservationSet {
    fn from(set: ObservationSet) -> Self {
        RawObservationSet {
            name: set.name,
            observable: set.observable,
            observations: set.observations,
        }
    }
}

impl ObservationSet {
    /// Construct a set from already validated observations
    ///
    /// # Errors
    ///
    /// Returns [DataError::Empty] if `observations` is empty.
    pub fn new(
        name: impl Into<String>,
        observable: Observable,
        mut observations: Vec<Observation>,
    ) -> Result<Self, DataError> {
        let name = name.into();
        if observations.is_empty() {
            return Err(DataError::Empty { source_name: name });
        }
        observations.sort_by(|a, b| a.z.total_cmp(&b.z));
        Ok(Self {
            name,
            observable,
            observations,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn observable(&self) -> Observable {
        self.observable
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.observations.iter()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Largest redshift in the set
    pub fn max_redshift(&self) -> f64 {
        self.observations.last().map(|o| o.z).unwrap_or(0.0)
    }
}

impl fmt::Display for ObservationSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, n={}, z=[{:.3}, {:.3}])",
            self.name,
            self.observable,
            self.len(),
            self.observations.first().map(|o| o.z).unwrap_or(0.0),
            self.max_redshift()
        )
    }
}

/// The collection of observation sets entering one fit
///
/// A dataset may hold supernova sets, BAO sets or both; the chi-square is the
/// sum over every set it contains.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    sets: Vec<ObservationSet>,
}

impl Dataset {
    pub fn new(sets: Vec<ObservationSet>) -> Self {
        Self { sets }
    }

    pub fn with_set(mut self, set: ObservationSet) -> Self {
        self.sets.push(set);
        self
    }

    pub fn add_set(&mut self, set: ObservationSet) {
        self.sets.push(set);
    }

    pub fn sets(&self) -> &[ObservationSet] {
        &self.sets
    }

    /// Get a set by name
    pub fn get(&self, name: &str) -> Option<&ObservationSet> {
        self.sets.iter().find(|s| s.name() == name)
    }

    /// Total number of observations across all sets
    pub fn n_observations(&self) -> usize {
        self.sets.iter().map(ObservationSet::len).sum()
    }

    /// Largest redshift of any observation that needs a distance prediction
    pub fn max_distance_redshift(&self) -> f64 {
        self.sets
            .iter()
            .filter(|s| s.observable() == Observable::DistanceModulus)
            .map(ObservationSet::max_redshift)
            .fold(0.0, f64::max)
    }

    pub fn is_empty(&self) -> bool {
        self.sets.iter().all(ObservationSet::is_empty)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dataset with {} sets", self.sets.len())?;
        for set in &self.sets {
            writeln!(f, "  {}", set)?;
        }
        Ok(())
    }
}
