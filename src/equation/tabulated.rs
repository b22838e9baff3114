use serde::{Deserialize, Serialize};

use super::EquationOfState;
use crate::error::CsgtError;

/// Piecewise-linear `w(z)` table with flat extrapolation
///
/// Nodes must be finite with strictly increasing redshift. Deserialization goes
/// through the same validation as [Tabulated::new].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTable", into = "RawTable")]
pub struct Tabulated {
    z: Vec<f64>,
    w: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
struct RawTable {
    z: Vec<f64>,
    w: Vec<f64>,
}

impl TryFrom<RawTable> for Tabulated {
    type Error = CsgtError;

    fn try_from(raw: RawTable) -> Result<Self, Self::Error> {
        Tabulated::new(raw.z, raw.w)
    }
}

impl From<Tabulated> for RawTable {
    fn from(table: Tabulated) -> Self {
        RawTable {
            z: table.z,
            w: table.w,
        }
    }
}

impl Tabulated {
    /// Build a table from matching node vectors
    ///
    /// # Errors
    ///
    /// [CsgtError::Config] when the vectors differ in length, are empty, contain
    /// non-finite values or the redshifts are not strictly increasing.
    pub fn new(z: Vec<f64>, w: Vec<f64>) -> Result<Self, CsgtError> {
        if z.len() != w.len() {
            return Err(CsgtError::Config(format!(
                "w(z) table has {} redshifts but {} values",
                z.len(),
                w.len()
            )));
        }
        if z.is_empty() {
            return Err(CsgtError::Config("w(z) table is empty".to_string()));
        }
        if z.iter().chain(w.iter()).any(|v| !v.is_finite()) {
            return Err(CsgtError::Config(
                "w(z) table contains non-finite values".to_string(),
            ));
        }
        if z.windows(2).any(|pair| pair[1] <= pair[0]) {
            return Err(CsgtError::Config(
                "w(z) table redshifts must be strictly increasing".to_string(),
            ));
        }
        Ok(Self { z, w })
    }

    pub fn redshifts(&self) -> &[f64] {
        &self.z
    }

    pub fn values(&self) -> &[f64] {
        &self.w
    }

    pub fn len(&self) -> usize {
        self.z.len()
    }

    pub fn is_empty(&self) -> bool {
        self.z.is_empty()
    }
}

impl EquationOfState for Tabulated {
    fn w(&self, z: f64) -> f64 {
        let n = self.z.len();
        if z <= self.z[0] {
            return self.w[0];
        }
        if z >= self.z[n - 1] {
            return self.w[n - 1];
        }
        // First node strictly above z; 1 <= hi <= n - 1 here
        let hi = self.z.partition_point(|&node| node <= z);
        let lo = hi - 1;
        let t = (z - self.z[lo]) / (self.z[hi] - self.z[lo]);
        self.w[lo] + t * (self.w[hi] - self.w[lo])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn table() -> Tabulated {
        Tabulated::new(vec![0.0, 1.0, 2.0], vec![-1.0, -1.2, -0.9]).unwrap()
    }

    #[test]
    fn interpolates_linearly() {
        let t = table();
        assert_relative_eq!(t.w(0.5), -1.1);
        assert_relative_eq!(t.w(1.0), -1.2);
        assert_relative_eq!(t.w(1.5), -1.05);
    }

    #[test]
    fn extrapolates_flat() {
        let t = table();
        assert_eq!(t.w(5.0), -0.9);
        assert_eq!(t.w(-1.0), -1.0);
    }

    #[test]
    fn single_node_is_constant() {
        let t = Tabulated::new(vec![0.3], vec![-0.95]).unwrap();
        assert_eq!(t.w(0.0), -0.95);
        assert_eq!(t.w(2.0), -0.95);
    }

    #[test]
    fn validates_nodes() {
        assert!(Tabulated::new(vec![0.0, 1.0], vec![-1.0]).is_err());
        assert!(Tabulated::new(vec![], vec![]).is_err());
        assert!(Tabulated::new(vec![0.0, 0.0], vec![-1.0, -1.0]).is_err());
        assert!(Tabulated::new(vec![0.0, 1.0], vec![-1.0, f64::NAN]).is_err());
    }

    #[test]
    fn deserialization_validates() {
        let ok: Result<Tabulated, _> = serde_json::from_str(r#"{"z":[0.0,1.0],"w":[-1.0,-1.1]}"#);
        assert!(ok.is_ok());
        let bad: Result<Tabulated, _> = serde_json::from_str(r#"{"z":[1.0,0.0],"w":[-1.0,-1.1]}"#);
        assert!(bad.is_err());
    }
}
