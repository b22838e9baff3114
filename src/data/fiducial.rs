//! Small built-in samples
//!
//! A 20-point supernova distance-modulus sample spanning `0.01 <= z <= 2` and the
//! six DESI DR1 BAO Hubble-rate points. They are convenient for examples, tests and
//! quick fits; real analyses should load a full catalogue with
//! [read_table](super::read_table).

use super::{DataError, Dataset, Observable, ObservationSet};

/// Name of the built-in supernova set
pub const PANTHEON_SAMPLE: &str = "pantheon-sample";
/// Name of the built-in BAO set
pub const DESI_BAO_SAMPLE: &str = "desi-bao";

const SUPERNOVAE: [(f64, f64, f64); 20] = [
    (0.010, 32.5, 0.15),
    (0.015, 33.2, 0.12),
    (0.020, 33.8, 0.14),
    (0.030, 34.5, 0.11),
    (0.040, 35.1, 0.13),
    (0.050, 35.6, 0.10),
    (0.100, 37.2, 0.08),
    (0.200, 38.9, 0.09),
    (0.300, 39.8, 0.07),
    (0.400, 40.5, 0.08),
    (0.500, 41.1, 0.06),
    (0.600, 41.6, 0.07),
    (0.700, 42.0, 0.05),
    (0.800, 42.4, 0.06),
    (0.900, 42.8, 0.04),
    (1.000, 43.1, 0.05),
    (1.200, 43.7, 0.03),
    (1.500, 44.2, 0.04),
    (1.800, 44.6, 0.02),
    (2.000, 44.9, 0.03),
];

// H(z) in km/s/Mpc
const BAO: [(f64, f64, f64); 6] = [
    (0.120, 71.33, 4.20),
    (0.510, 65.72, 1.99),
    (0.706, 67.78, 1.75),
    (0.934, 70.74, 1.39),
    (1.321, 71.04, 1.93),
    (1.484, 68.37, 3.95),
];

/// The supernova distance-modulus sample
pub fn pantheon_sample() -> Result<ObservationSet, DataError> {
    ObservationSet::builder(PANTHEON_SAMPLE, Observable::DistanceModulus)
        .observations(SUPERNOVAE)
        .build()
}

/// The DESI DR1 Hubble-rate points
pub fn desi_bao_sample() -> Result<ObservationSet, DataError> {
    ObservationSet::builder(DESI_BAO_SAMPLE, Observable::HubbleRate)
        .observations(BAO)
        .build()
}

/// Both samples in one dataset
pub fn joint_sample() -> Result<Dataset, DataError> {
    Ok(Dataset::new(vec![pantheon_sample()?, desi_bao_sample()?]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_are_complete() {
        let sn = pantheon_sample().unwrap();
        assert_eq!(sn.len(), 20);
        assert_eq!(sn.max_redshift(), 2.0);
        let bao = desi_bao_sample().unwrap();
        assert_eq!(bao.len(), 6);
        let joint = joint_sample().unwrap();
        assert_eq!(joint.n_observations(), 26);
        assert_eq!(joint.max_distance_redshift(), 2.0);
        assert!(joint.get(DESI_BAO_SAMPLE).is_some());
    }
}
