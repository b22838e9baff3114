use super::distance::DistanceCalculator;
use super::spline::MonotoneSpline;
use super::{Cosmology, ExpansionRate};
use crate::error::CsgtError;

/// Default number of nodes of an [ExpansionGrid]
pub const DEFAULT_GRID_NODES: usize = 200;

/// `E(z)` and the comoving integral tabulated on a uniform redshift grid
///
/// Both `I(z)` and `∫ dz / E` are accumulated segment by segment, so building the
/// grid costs one pass of short quadratures rather than one nested integral per
/// query. Queries are answered by monotone cubic Hermite splines through the node
/// values and their exact derivatives; redshifts beyond the grid fall back to the
/// direct [ExpansionRate].
#[derive(Debug, Clone)]
pub struct ExpansionGrid<'a> {
    direct: ExpansionRate<'a>,
    z_max: f64,
    e: MonotoneSpline,
    comoving: MonotoneSpline,
}

impl<'a> ExpansionGrid<'a> {
    /// Tabulate `rate` on `nodes` points over `[0, z_max]`
    ///
    /// # Errors
    ///
    /// - [CsgtError::Config] if `z_max` is not positive or `nodes < 2`
    /// - any error of the underlying [ExpansionRate] on a segment
    pub fn build(rate: ExpansionRate<'a>, z_max: f64, nodes: usize) -> Result<Self, CsgtError> {
        if !(z_max > 0.0 && z_max.is_finite()) {
            return Err(CsgtError::Config(format!(
                "grid upper redshift must be positive, got {z_max}"
            )));
        }
        if nodes < 2 {
            return Err(CsgtError::Config(format!(
                "grid needs at least two nodes, got {nodes}"
            )));
        }

        let step = z_max / (nodes - 1) as f64;
        let zs: Vec<f64> = (0..nodes)
            .map(|i| if i == nodes - 1 { z_max } else { i as f64 * step })
            .collect();

        let mut e_values = Vec::with_capacity(nodes);
        let mut e_slopes = Vec::with_capacity(nodes);
        let mut chi_values = Vec::with_capacity(nodes);
        let mut exponent = 0.0;
        let mut chi = 0.0;
        e_values.push(1.0);
        e_slopes.push(rate.e_derivative(0.0, 0.0, 1.0));
        chi_values.push(0.0);

        for pair in zs.windows(2) {
            let (lo, hi) = (pair[0], pair[1]);
            chi += rate.inverse_e_integral(lo, hi, exponent)?;
            exponent += rate.exponent_between(lo, hi)?;
            let e = rate.e_from_exponent(hi, exponent)?;
            e_values.push(e);
            e_slopes.push(rate.e_derivative(hi, exponent, e));
            chi_values.push(chi);
        }

        // d(chi)/dz = 1 / E exactly at every node
        let chi_slopes = e_values.iter().map(|e| 1.0 / e).collect();

        Ok(Self {
            direct: rate,
            z_max,
            e: MonotoneSpline::hermite(zs.clone(), e_values, e_slopes)?,
            comoving: MonotoneSpline::hermite(zs, chi_values, chi_slopes)?,
        })
    }

    /// Tabulate with [DEFAULT_GRID_NODES] nodes
    pub fn with_default_nodes(rate: ExpansionRate<'a>, z_max: f64) -> Result<Self, CsgtError> {
        Self::build(rate, z_max, DEFAULT_GRID_NODES)
    }

    pub fn z_max(&self) -> f64 {
        self.z_max
    }

    pub fn nodes(&self) -> usize {
        self.e.knots().0.len()
    }

    /// The direct integrator used outside the grid
    pub fn direct(&self) -> &ExpansionRate<'a> {
        &self.direct
    }
}

impl DistanceCalculator for ExpansionGrid<'_> {
    fn cosmology(&self) -> &Cosmology {
        self.direct.cosmology()
    }

    fn e(&self, z: f64) -> Result<f64, CsgtError> {
        if z == 0.0 {
            Ok(1.0)
        } else if self.e.contains(z) {
            Ok(self.e.eval(z))
        } else {
            self.direct.e(z)
        }
    }

    fn comoving_integral(&self, z: f64) -> Result<f64, CsgtError> {
        if self.comoving.contains(z) {
            Ok(self.comoving.eval(z))
        } else {
            DistanceCalculator::comoving_integral(&self.direct, z)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equation::DarkEnergy;
    use approx::assert_relative_eq;

    #[test]
    fn grid_matches_direct_integration() {
        let bump = DarkEnergy::exact_gaussian(0.0833, 1.0);
        let rate = ExpansionRate::new(Cosmology::new(67.4, 0.3), &bump);
        let grid = ExpansionGrid::with_default_nodes(rate, 2.5).unwrap();
        assert_eq!(grid.nodes(), DEFAULT_GRID_NODES);
        for z in [0.013, 0.31, 0.7, 1.234, 2.0, 2.5] {
            assert_relative_eq!(grid.e(z).unwrap(), rate.e(z).unwrap(), max_relative = 1e-6);
            assert_relative_eq!(
                grid.distance_modulus(z, -19.3),
                rate.distance_modulus(z, -19.3),
                epsilon = 1e-4
            );
        }
    }

    #[test]
    fn falls_back_beyond_the_grid() {
        let lambda = DarkEnergy::CosmologicalConstant;
        let rate = ExpansionRate::new(Cosmology::new(67.4, 0.3), &lambda);
        let grid = ExpansionGrid::build(rate, 1.0, 20).unwrap();
        assert_relative_eq!(
            grid.comoving_integral(1.5).unwrap(),
            DistanceCalculator::comoving_integral(&rate, 1.5).unwrap(),
            max_relative = 1e-12
        );
        assert_eq!(grid.e(0.0).unwrap(), 1.0);
    }

    #[test]
    fn rejects_degenerate_grids() {
        let lambda = DarkEnergy::CosmologicalConstant;
        let rate = ExpansionRate::new(Cosmology::new(67.4, 0.3), &lambda);
        assert!(ExpansionGrid::build(rate, 0.0, 200).is_err());
        assert!(ExpansionGrid::build(rate, 1.0, 1).is_err());
    }
}
