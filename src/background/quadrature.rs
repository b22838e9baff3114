//! Adaptive Gauss–Kronrod quadrature
//!
//! A globally adaptive 7/15-point Gauss–Kronrod integrator. The interval with the
//! largest error estimate is bisected until the summed error satisfies
//! `error <= max(abs_tol, rel_tol * |estimate|)` or the subdivision limit is hit.
//! Defaults follow the QUADPACK `qags` conventions (`limit = 50`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kronrod abscissae on [0, 1], symmetric about the centre
const XGK: [f64; 8] = [
    0.991_455_371_120_812_6,
    0.949_107_912_342_758_5,
    0.864_864_423_359_769_1,
    0.741_531_185_599_394_4,
    0.586_087_235_467_691_1,
    0.405_845_151_377_397_2,
    0.207_784_955_007_898_5,
    0.0,
];

/// Weights of the 15-point Kronrod rule
const WGK: [f64; 8] = [
    0.022_935_322_010_529_22,
    0.063_092_092_629_978_55,
    0.104_790_010_322_250_18,
    0.140_653_259_715_525_92,
    0.169_004_726_639_267_9,
    0.190_350_578_064_785_4,
    0.204_432_940_075_298_9,
    0.209_482_141_084_727_83,
];

/// Weights of the embedded 7-point Gauss rule (nodes `XGK[1]`, `XGK[3]`, `XGK[5]`, centre)
const WG: [f64; 4] = [
    0.129_484_966_168_869_7,
    0.279_705_391_489_276_7,
    0.381_830_050_505_118_9,
    0.417_959_183_673_469_4,
];

/// Errors raised by the integrator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuadratureError {
    /// The tolerance was not reached within the subdivision limit
    #[error(
        "Quadrature did not converge on [{lower}, {upper}] after {subdivisions} subdivisions \
         (estimate {estimate:e}, error {error:e})"
    )]
    NotConverged {
        lower: f64,
        upper: f64,
        estimate: f64,
        error: f64,
        subdivisions: usize,
    },
    /// The integrand returned NaN or infinity
    #[error("Integrand is not finite at x = {x}")]
    NonFinite { x: f64 },
    /// The integration limits are not finite
    #[error("Integration limits must be finite, got [{lower}, {upper}]")]
    InvalidInterval { lower: f64, upper: f64 },
}

/// Tolerances of the adaptive integrator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadratureOptions {
    pub abs_tol: f64,
    pub rel_tol: f64,
    /// Maximum number of subintervals
    pub limit: usize,
}

impl Default for QuadratureOptions {
    fn default() -> Self {
        Self {
            abs_tol: 1e-8,
            rel_tol: 1e-10,
            limit: 50,
        }
    }
}

impl QuadratureOptions {
    pub fn with_abs_tol(mut self, abs_tol: f64) -> Self {
        self.abs_tol = abs_tol;
        self
    }

    pub fn with_rel_tol(mut self, rel_tol: f64) -> Self {
        self.rel_tol = rel_tol;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit.max(1);
        self
    }
}

/// Result of an integration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Integral {
    pub value: f64,
    /// Estimated absolute error
    pub error: f64,
    /// Number of subintervals used
    pub subdivisions: usize,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    lower: f64,
    upper: f64,
    value: f64,
    error: f64,
}

/// Integrate `f` over `[a, b]`
///
/// Reversed limits are allowed and flip the sign of the result; `a == b` is zero.
///
/// # Errors
///
/// See [QuadratureError].
pub fn integrate<F>(mut f: F, a: f64, b: f64, options: &QuadratureOptions) -> Result<Integral, QuadratureError>
where
    F: FnMut(f64) -> f64,
{
    integrate_with(|x| Ok::<f64, QuadratureError>(f(x)), a, b, options)
}

/// Integrate a fallible integrand over `[a, b]`
///
/// The first error returned by `f` aborts the integration and is propagated.
/// Integrator failures are converted into `E` through [From].
pub fn integrate_with<F, E>(mut f: F, a: f64, b: f64, options: &QuadratureOptions) -> Result<Integral, E>
where
    F: FnMut(f64) -> Result<f64, E>,
    E: From<QuadratureError>,
{
    if !(a.is_finite() && b.is_finite()) {
        return Err(QuadratureError::InvalidInterval { lower: a, upper: b }.into());
    }
    if a == b {
        return Ok(Integral {
            value: 0.0,
            error: 0.0,
            subdivisions: 0,
        });
    }
    if b < a {
        let flipped = integrate_with(f, b, a, options)?;
        return Ok(Integral {
            value: -flipped.value,
            ..flipped
        });
    }

    let mut segments = vec![kronrod(&mut f, a, b)?];
    let limit = options.limit.max(1);

    loop {
        let value: f64 = segments.iter().map(|s| s.value).sum();
        let error: f64 = segments.iter().map(|s| s.error).sum();
        let tolerance = options.abs_tol.max(options.rel_tol * value.abs());

        if error <= tolerance {
            return Ok(Integral {
                value,
                error,
                subdivisions: segments.len(),
            });
        }
        if segments.len() >= limit {
            return Err(QuadratureError::NotConverged {
                lower: a,
                upper: b,
                estimate: value,
                error,
                subdivisions: segments.len(),
            }
            .into());
        }

        // Bisect the segment with the largest error
        let worst = segments
            .iter()
            .enumerate()
            .max_by(|(_, l), (_, r)| l.error.total_cmp(&r.error))
            .map(|(idx, _)| idx)
            .unwrap_or(0);
        let segment = segments.swap_remove(worst);
        let mid = 0.5 * (segment.lower + segment.upper);
        if mid <= segment.lower || mid >= segment.upper {
            // Interval can no longer be split in floating point
            return Err(QuadratureError::NotConverged {
                lower: a,
                upper: b,
                estimate: value,
                error,
                subdivisions: segments.len() + 1,
            }
            .into());
        }
        segments.push(kronrod(&mut f, segment.lower, mid)?);
        segments.push(kronrod(&mut f, mid, segment.upper)?);
    }
}

/// Apply the 15-point Kronrod rule with its embedded 7-point Gauss rule on one segment
fn kronrod<F, E>(f: &mut F, lower: f64, upper: f64) -> Result<Segment, E>
where
    F: FnMut(f64) -> Result<f64, E>,
    E: From<QuadratureError>,
{
    let centre = 0.5 * (lower + upper);
    let half = 0.5 * (upper - lower);

    let mut eval = |x: f64| -> Result<f64, E> {
        let y = f(x)?;
        if y.is_finite() {
            Ok(y)
        } else {
            Err(QuadratureError::NonFinite { x }.into())
        }
    };

    let f_centre = eval(centre)?;
    let mut kronrod = WGK[7] * f_centre;
    let mut gauss = WG[3] * f_centre;

    for (j, (&node, &weight)) in XGK.iter().zip(WGK.iter()).take(7).enumerate() {
        let dx = half * node;
        let pair = eval(centre - dx)? + eval(centre + dx)?;
        kronrod += weight * pair;
        if j % 2 == 1 {
            gauss += WG[j / 2] * pair;
        }
    }

    let value = kronrod * half;
    let error = ((kronrod - gauss) * half).abs();
    Ok(Segment {
        lower,
        upper,
        value,
        error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn integrates_polynomials_exactly() {
        let opts = QuadratureOptions::default();
        let result = integrate(|x| 3.0 * x * x + 2.0 * x + 1.0, 0.0, 2.0, &opts).unwrap();
        assert_relative_eq!(result.value, 14.0, epsilon = 1e-12);
        assert_eq!(result.subdivisions, 1);
    }

    #[test]
    fn integrates_smooth_functions() {
        let opts = QuadratureOptions::default();
        let result = integrate(f64::sin, 0.0, std::f64::consts::PI, &opts).unwrap();
        assert_relative_eq!(result.value, 2.0, epsilon = 1e-12);

        let result = integrate(|x| 1.0 / (1.0 + x), 0.0, 3.0, &opts).unwrap();
        assert_relative_eq!(result.value, 4.0_f64.ln(), epsilon = 1e-12);
    }

    #[test]
    fn reversed_and_empty_intervals() {
        let opts = QuadratureOptions::default();
        let forward = integrate(f64::exp, 0.0, 1.0, &opts).unwrap();
        let backward = integrate(f64::exp, 1.0, 0.0, &opts).unwrap();
        assert_relative_eq!(forward.value, -backward.value);
        assert_eq!(integrate(f64::exp, 0.5, 0.5, &opts).unwrap().value, 0.0);
    }

    #[test]
    fn reports_non_convergence() {
        let opts = QuadratureOptions::default().with_limit(2);
        let result = integrate(|x| (50.0 * x).sin().abs(), 0.0, 10.0, &opts);
        assert!(matches!(
            result,
            Err(QuadratureError::NotConverged { subdivisions: 2, .. })
        ));
    }

    #[test]
    fn rejects_non_finite_integrand() {
        let opts = QuadratureOptions::default();
        let result = integrate(|x| 1.0 / (x - 0.5), 0.0, 1.0, &opts);
        assert!(matches!(result, Err(QuadratureError::NonFinite { .. })));
    }

    #[test]
    fn propagates_integrand_errors() {
        #[derive(Debug, PartialEq)]
        enum Failure {
            Integrand,
            Quadrature,
        }
        impl From<QuadratureError> for Failure {
            fn from(_: QuadratureError) -> Self {
                Failure::Quadrature
            }
        }
        let opts = QuadratureOptions::default();
        let result = integrate_with(
            |x| if x > 0.9 { Err(Failure::Integrand) } else { Ok(x) },
            0.0,
            1.0,
            &opts,
        );
        assert_eq!(result.unwrap_err(), Failure::Integrand);
    }
}
