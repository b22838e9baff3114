use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::data::observation_error::DataError;
use crate::data::{Observable, Observation, ObservationSet};

/// Zero-based column indices of the `(z, value, sigma)` triple in a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLayout {
    pub redshift: usize,
    pub value: usize,
    pub sigma: usize,
}

impl ColumnLayout {
    /// Pantheon+SH0ES release: `zHD`, `MU_SH0ES`, `MU_SH0ES_ERR_DIAG`
    pub const PANTHEON_PLUS: ColumnLayout = ColumnLayout {
        redshift: 2,
        value: 10,
        sigma: 11,
    };

    fn width(&self) -> usize {
        self.redshift.max(self.value).max(self.sigma) + 1
    }
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            redshift: 0,
            value: 1,
            sigma: 2,
        }
    }
}

/// Field separator of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Delimiter {
    /// Comma separated values
    Comma,
    /// Runs of spaces, as in the Pantheon+ `.dat` release
    #[default]
    Whitespace,
    Tab,
}

impl Delimiter {
    fn byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Whitespace => b' ',
            Delimiter::Tab => b'\t',
        }
    }
}

/// Options for [read_table]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableOptions {
    pub layout: ColumnLayout,
    pub delimiter: Delimiter,
    /// Fail on the first row that is numeric but invalid (`sigma <= 0`, `z < 0`)
    /// instead of skipping it
    pub strict: bool,
}

impl TableOptions {
    pub fn pantheon_plus() -> Self {
        Self {
            layout: ColumnLayout::PANTHEON_PLUS,
            delimiter: Delimiter::Whitespace,
            strict: false,
        }
    }

    pub fn with_layout(mut self, layout: ColumnLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }
}

/// Read an observation table from disk
///
/// Lines starting with `#` are comments. Rows whose selected columns are not
/// numeric (header lines, missing values) are skipped. Rows that are numeric but
/// physically invalid are skipped as well unless [TableOptions::strict] is set.
/// The resulting set is sorted by redshift.
///
/// # Errors
///
/// - [DataError::Unavailable] if the file cannot be opened. No placeholder data is
///   substituted.
/// - [DataError::Empty] if no valid rows remain.
///
/// # Example
///
/// ```rust,no_run
/// use csgt::prelude::data::*;
///
/// let sn = read_table(
///     "Pantheon+SH0ES.dat",
///     "Pantheon+",
///     Observable::DistanceModulus,
///     &TableOptions::pantheon_plus(),
/// )
/// .unwrap();
/// println!("{sn}");
/// ```
pub fn read_table(
    path: impl AsRef<Path>,
    name: impl Into<String>,
    observable: Observable,
    options: &TableOptions,
) -> Result<ObservationSet, DataError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| DataError::Unavailable {
        source_name: path.display().to_string(),
        reason: e.to_string(),
    })?;
    read_table_from_reader(file, name, observable, options)
}

/// Read an observation table from any reader, see [read_table]
pub fn read_table_from_reader<R: Read>(
    reader: R,
    name: impl Into<String>,
    observable: Observable,
    options: &TableOptions,
) -> Result<ObservationSet, DataError> {
    let name = name.into();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .delimiter(options.delimiter.byte())
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut observations = Vec::new();
    let mut rows_read = 0usize;
    let mut non_numeric = 0usize;
    let mut rejected = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| DataError::MalformedRow {
            source_name: name.clone(),
            line: e.position().map(|p| p.line() as usize).unwrap_or(idx + 1),
            reason: e.to_string(),
        })?;
        let line = record.position().map(|p| p.line() as usize).unwrap_or(idx + 1);

        // Only whitespace tables treat a run of separators as one; elsewhere an
        // empty field is a missing value and keeps its column
        let fields: Vec<&str> = match options.delimiter {
            Delimiter::Whitespace => record.iter().filter(|f| !f.is_empty()).collect(),
            Delimiter::Comma | Delimiter::Tab => record.iter().collect(),
        };
        if fields.iter().all(|f| f.is_empty()) {
            continue;
        }
        rows_read += 1;

        if fields.len() < options.layout.width() {
            non_numeric += 1;
            continue;
        }
        let parse = |idx: usize| fields[idx].parse::<f64>().ok();
        let (z, value, sigma) = match (
            parse(options.layout.redshift),
            parse(options.layout.value),
            parse(options.layout.sigma),
        ) {
            (Some(z), Some(value), Some(sigma)) => (z, value, sigma),
            _ => {
                non_numeric += 1;
                continue;
            }
        };

        match Observation::new(z, value, sigma) {
            Ok(observation) => observations.push(observation),
            Err(e) if options.strict => {
                return Err(DataError::MalformedRow {
                    source_name: name,
                    line,
                    reason: e.to_string(),
                })
            }
            Err(e) => {
                tracing::warn!("{name}: skipping row {line}: {e}");
                rejected += 1;
            }
        }
    }

    tracing::info!(
        "{name}: {} observations loaded ({rows_read} rows read, {non_numeric} non-numeric, {rejected} rejected)",
        observations.len()
    );

    ObservationSet::new(name, observable, observations)
}
