//! Fitting dark-energy equations of state to distance and expansion-rate data
//!
//! The pipeline runs from a parametrized `w(z)` ([equation]) through the
//! normalized expansion rate and distances ([background]) to a chi-square against
//! supernova and BAO observations ([likelihood]), which the optimizers in
//! [optimize] minimize over the free parameters of a [model::Model].

pub mod background;
pub mod config;
pub mod data;
pub mod equation;
pub mod error;
pub mod history;
pub mod likelihood;
pub mod model;
pub mod optimize;

pub use crate::background::{Cosmology, DistanceCalculator, ExpansionGrid, ExpansionRate};
pub use crate::data::{Dataset, Observable, Observation, ObservationSet};
pub use crate::equation::{DarkEnergy, EquationOfState};
pub use crate::model::{Model, Parameter};
pub use error::CsgtError;

pub mod prelude {
    pub mod data {
        pub use crate::data::{
            fiducial, read_table, read_table_from_reader, ColumnLayout, DataError, Dataset,
            Delimiter, Observable, Observation, ObservationSet, SyntheticSet, TableOptions,
        };
    }
    pub mod background {
        pub use crate::background::{
            Cosmology, DistanceCalculator, ExpansionGrid, ExpansionRate, QuadratureOptions,
        };
        pub use crate::equation::{DarkEnergy, EquationOfState};
    }
    pub mod optimize {
        pub use crate::likelihood::{chi_square, ChiSquare, LikelihoodOptions, CHI2_PENALTY};
        pub use crate::optimize::{
            compare_models, fit, fit_model, Bounds, ComparisonOptions, FitResult, GlobalOptions,
            LocalOptions, ModelComparison, Optimizer,
        };
    }

    pub use crate::data::*;
    pub use crate::equation::*;
    pub use crate::model::*;
    pub use crate::CsgtError;
}
