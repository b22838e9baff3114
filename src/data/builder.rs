use crate::data::observation_error::DataError;
use crate::data::*;

impl ObservationSet {
    /// Start building a set of observations
    pub fn builder(name: impl Into<String>, observable: Observable) -> ObservationSetBuilder {
        ObservationSetBuilder {
            name: name.into(),
            observable,
            rows: Vec::new(),
        }
    }
}

/// Incremental constructor for [ObservationSet]
///
/// Rows are validated when [build](ObservationSetBuilder::build) is called, so the
/// builder can be chained without intermediate error handling.
pub struct ObservationSetBuilder {
    name: String,
    observable: Observable,
    rows: Vec<(f64, f64, f64)>,
}

impl ObservationSetBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn observation(mut self, z: f64, value: f64, sigma: f64) -> Self {
        self.rows.push((z, value, sigma));
        self
    }

    /// Add every `(z, value, sigma)` triple in `rows`
    pub fn observations<I>(mut self, rows: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64, f64)>,
    {
        self.rows.extend(rows);
        self
    }

    /// Validate the rows and produce the set
    ///
    /// # Errors
    ///
    /// The first invalid row is reported as [DataError::InvalidObservation]; an
    /// empty builder yields [DataError::Empty].
    pub fn build(self) -> Result<ObservationSet, DataError> {
        let observations = self
            .rows
            .into_iter()
            .map(|(z, value, sigma)| Observation::new(z, value, sigma))
            .collect::<Result<Vec<_>, _>>()?;
        ObservationSet::new(self.name, self.observable, observations)
    }
}
