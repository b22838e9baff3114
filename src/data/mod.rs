pub mod builder;
pub mod fiducial;
pub mod observation_error;
pub mod parser;
pub mod structs;
pub mod synthetic;

pub use builder::ObservationSetBuilder;
pub use observation_error::DataError;
pub use parser::{read_table, read_table_from_reader, ColumnLayout, Delimiter, TableOptions};
pub use structs::{Dataset, Observable, Observation, ObservationSet};
pub use synthetic::SyntheticSet;
