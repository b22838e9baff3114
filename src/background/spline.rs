use crate::error::CsgtError;

/// Monotone piecewise-cubic Hermite interpolant
///
/// Slopes are either estimated from the knots or supplied by the caller; in both
/// cases the Fritsch–Carlson limiter is applied, so the interpolant is monotone
/// wherever the knot values are and never overshoots between knots.
/// Evaluation outside the knot range clamps to the end values; callers that
/// need extrapolation must check [MonotoneSpline::contains] first.
#[derive(Debug, Clone, PartialEq)]
pub struct MonotoneSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    slopes: Vec<f64>,
}

impl MonotoneSpline {
    /// Build the spline through `(x, y)`
    ///
    /// # Errors
    ///
    /// [CsgtError::Config] if fewer than two knots are given, the lengths differ,
    /// any value is non-finite or `x` is not strictly increasing.
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> Result<Self, CsgtError> {
        validate_knots(&x, &y)?;
        let delta = secants(&x, &y);
        let mut slopes = initial_slopes(&delta);
        limit_slopes(&delta, &mut slopes);
        Ok(Self { x, y, slopes })
    }

    /// Build the spline from knots with known derivatives
    ///
    /// The derivatives are limited where they would break monotonicity.
    ///
    /// # Errors
    ///
    /// As [MonotoneSpline::new], and when `slopes` does not match the knots.
    pub fn hermite(x: Vec<f64>, y: Vec<f64>, mut slopes: Vec<f64>) -> Result<Self, CsgtError> {
        validate_knots(&x, &y)?;
        if slopes.len() != x.len() || slopes.iter().any(|m| !m.is_finite()) {
            return Err(CsgtError::Config(format!(
                "spline needs {} finite slopes, got {}",
                x.len(),
                slopes.len()
            )));
        }
        let delta = secants(&x, &y);
        limit_slopes(&delta, &mut slopes);
        Ok(Self { x, y, slopes })
    }

    pub fn knots(&self) -> (&[f64], &[f64]) {
        (&self.x, &self.y)
    }

    /// Whether `x` lies inside the knot range
    pub fn contains(&self, x: f64) -> bool {
        x >= self.x[0] && x <= self.x[self.x.len() - 1]
    }

    pub fn eval(&self, x: f64) -> f64 {
        let k = self.x.len();
        if x <= self.x[0] {
            return self.y[0];
        }
        if x >= self.x[k - 1] {
            return self.y[k - 1];
        }

        let i = (self.x.partition_point(|&v| v <= x) - 1).min(k - 2);
        let h = self.x[i + 1] - self.x[i];
        let t = (x - self.x[i]) / h;

        // Cubic Hermite basis
        let h00 = (1.0 + 2.0 * t) * (1.0 - t) * (1.0 - t);
        let h10 = t * (1.0 - t) * (1.0 - t);
        let h01 = t * t * (3.0 - 2.0 * t);
        let h11 = t * t * (t - 1.0);

        h00 * self.y[i] + h10 * h * self.slopes[i] + h01 * self.y[i + 1] + h11 * h * self.slopes[i + 1]
    }
}

fn validate_knots(x: &[f64], y: &[f64]) -> Result<(), CsgtError> {
    if x.len() != y.len() || x.len() < 2 {
        return Err(CsgtError::Config(format!(
            "spline needs at least two matching knots, got {} x and {} y",
            x.len(),
            y.len()
        )));
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(CsgtError::Config("spline knots must be finite".to_string()));
    }
    if x.windows(2).any(|pair| pair[1] <= pair[0]) {
        return Err(CsgtError::Config(
            "spline knots must be strictly increasing".to_string(),
        ));
    }
    Ok(())
}

fn secants(x: &[f64], y: &[f64]) -> Vec<f64> {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xs, ys)| (ys[1] - ys[0]) / (xs[1] - xs[0]))
        .collect()
}

/// Average of adjacent secants, zero at local extrema, one-sided at the ends
fn initial_slopes(delta: &[f64]) -> Vec<f64> {
    let k = delta.len() + 1;
    let mut m = vec![0.0; k];
    m[0] = delta[0];
    for i in 1..k - 1 {
        m[i] = if delta[i - 1].signum() != delta[i].signum() {
            0.0
        } else {
            0.5 * (delta[i - 1] + delta[i])
        };
    }
    m[k - 1] = delta[k - 2];
    m
}

/// Fritsch–Carlson condition `alpha^2 + beta^2 <= 9` on every interval
fn limit_slopes(delta: &[f64], m: &mut [f64]) {
    for i in 0..delta.len() {
        if delta[i].abs() < 1e-30 {
            m[i] = 0.0;
            m[i + 1] = 0.0;
            continue;
        }
        let alpha = m[i] / delta[i];
        let beta = m[i + 1] / delta[i];
        let phi = alpha * alpha + beta * beta;
        if phi > 9.0 {
            let tau = 3.0 / phi.sqrt();
            m[i] = tau * alpha * delta[i];
            m[i + 1] = tau * beta * delta[i];
        }
    }
}
