//! Piecewise-linear interpolation with linear extrapolation, and resampling onto regular grids.
use h2f_common::Real;
use itertools::Itertools;
use serde::Serialize;
use thiserror::Error;
use tracing::{instrument, trace};

/// Number of points produced when resampling without a step size.
pub const DEFAULT_NUM_POINTS: usize = 500;

/// Largest number of points a resampling may produce.
pub const MAX_NUM_POINTS: usize = 1_000_000;

#[derive(Debug, Error, PartialEq)]
pub enum InterpolationError {
    #[error("At least 2 points are required for interpolation, found {0}")]
    TooFewPoints(usize),
    #[error("x has {x} values but y has {y}")]
    LengthMismatch { x: usize, y: usize },
    #[error("x-value at index {0} is not a finite number")]
    NonFinite(usize),
    #[error("Step size must be a positive finite number, found {0}")]
    InvalidStepSize(Real),
    #[error("Resampling would produce {requested} points, at most {limit} are allowed")]
    TooManyPoints { requested: Real, limit: usize },
}

#[derive(Debug, Error, PartialEq)]
pub enum SplineError {
    #[error("Interpolation failed: {0}")]
    Interpolation(#[from] InterpolationError),
    #[error(
        "X-values must be strictly increasing, found {previous} followed by {current} at index {index}. Adjust filter settings to prevent duplicate or decreasing values"
    )]
    NonMonotonicDomain {
        index: usize,
        previous: Real,
        current: Real,
    },
}

/// How densely a spline is resampled.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Resolution {
    /// Evenly spaced points spanning the domain, both ends included.
    Points(usize),
    /// Points `min, min + step, ...` strictly below the domain's maximum.
    Step(Real),
}

impl Default for Resolution {
    fn default() -> Self {
        Resolution::Points(DEFAULT_NUM_POINTS)
    }
}

impl Resolution {
    /// Uses the given step size if it is positive, otherwise the default number of points.
    pub fn from_step_size(step_size: Option<Real>) -> Self {
        step_size
            .filter(|&step| step > 0.0)
            .map(Resolution::Step)
            .unwrap_or_default()
    }
}

/// A resampled curve.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Fit {
    pub x: Vec<Real>,
    pub y: Vec<Real>,
}

/// `n` evenly spaced values from `start` to `stop`, both included.
pub fn linspace(start: Real, stop: Real, n: usize) -> Vec<Real> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n - 1) as Real;
            (0..n)
                .map(|i| if i == n - 1 { stop } else { start + i as Real * step })
                .collect()
        }
    }
}

/// Values `start + i * step` for every `i` such that the value is below `stop`.
///
/// The length is `ceil((stop - start) / step)`, so `stop` itself is never produced. The step must
/// be positive and finite, and the length may not exceed [MAX_NUM_POINTS].
pub fn arange(start: Real, stop: Real, step: Real) -> Result<Vec<Real>, InterpolationError> {
    if !(step.is_finite() && step > 0.0) {
        return Err(InterpolationError::InvalidStepSize(step));
    }
    let len = ((stop - start) / step).ceil().max(0.0);
    if !len.is_finite() || len > MAX_NUM_POINTS as Real {
        return Err(InterpolationError::TooManyPoints {
            requested: len,
            limit: MAX_NUM_POINTS,
        });
    }
    Ok((0..len as usize).map(|i| start + i as Real * step).collect())
}

/// A piecewise-linear interpolant through points with strictly increasing x.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearSpline {
    x: Vec<Real>,
    y: Vec<Real>,
}

impl LinearSpline {
    /// Fits the interpolant, requiring at least two points and strictly increasing finite x-values.
    pub fn new(x: Vec<Real>, y: Vec<Real>) -> Result<Self, SplineError> {
        if x.len() != y.len() {
            return Err(InterpolationError::LengthMismatch {
                x: x.len(),
                y: y.len(),
            }
            .into());
        }
        if x.len() < 2 {
            return Err(InterpolationError::TooFewPoints(x.len()).into());
        }
        if let Some(index) = x.iter().position(|v| !v.is_finite()) {
            return Err(InterpolationError::NonFinite(index).into());
        }
        if let Some((index, (&previous, &current))) = x
            .iter()
            .tuple_windows()
            .enumerate()
            .find(|(_, (previous, current))| current <= previous)
        {
            return Err(SplineError::NonMonotonicDomain {
                index: index + 1,
                previous,
                current,
            });
        }
        Ok(Self { x, y })
    }

    /// Fits the interpolant to points given in any order.
    ///
    /// Points are sorted by x. Where several points share an x-value, the first one encountered is kept.
    pub fn from_unordered(x: Vec<Real>, y: Vec<Real>) -> Result<Self, SplineError> {
        if x.len() != y.len() {
            return Err(InterpolationError::LengthMismatch {
                x: x.len(),
                y: y.len(),
            }
            .into());
        }
        if let Some(index) = x.iter().position(|v| !v.is_finite()) {
            return Err(InterpolationError::NonFinite(index).into());
        }
        let (x, y): (Vec<_>, Vec<_>) = x
            .into_iter()
            .zip(y)
            .sorted_by(|a, b| a.0.total_cmp(&b.0))
            .dedup_by(|a, b| a.0 == b.0)
            .unzip();
        Self::new(x, y)
    }

    /// The smallest and largest x-values of the fitted points.
    pub fn domain(&self) -> (Real, Real) {
        (
            self.x.first().copied().unwrap_or_default(),
            self.x.last().copied().unwrap_or_default(),
        )
    }

    /// Evaluates the interpolant at `x`.
    ///
    /// Outside the fitted domain the nearest edge segment is extended linearly.
    pub fn evaluate(&self, x: Real) -> Real {
        // `new` guarantees at least two points, so both indices are in bounds.
        let upper = self.x.partition_point(|&v| v < x).clamp(1, self.x.len() - 1);
        let lower = upper - 1;
        let (x0, x1) = (self.x[lower], self.x[upper]);
        let (y0, y1) = (self.y[lower], self.y[upper]);
        y0 + (y1 - y0) * (x - x0) / (x1 - x0)
    }

    /// Evaluates the interpolant at every value of `xs`.
    pub fn evaluate_all(&self, xs: &[Real]) -> Vec<Real> {
        xs.iter().map(|&x| self.evaluate(x)).collect()
    }

    /// Resamples the interpolant over its own domain.
    pub fn resample(&self, resolution: Resolution) -> Result<Fit, SplineError> {
        let (min, max) = self.domain();
        let x = match resolution {
            Resolution::Points(n) if n > MAX_NUM_POINTS => {
                return Err(InterpolationError::TooManyPoints {
                    requested: n as Real,
                    limit: MAX_NUM_POINTS,
                }
                .into());
            }
            Resolution::Points(n) => linspace(min, max, n),
            Resolution::Step(step) => arange(min, max, step)?,
        };
        trace!("Resampling {} points onto {} points", self.x.len(), x.len());
        let y = self.evaluate_all(&x);
        Ok(Fit { x, y })
    }
}

/// Fits a linear spline to `(x, y)` and resamples it, either every `step_size` or onto
/// [DEFAULT_NUM_POINTS] evenly spaced points. A step size which is not positive counts as none.
#[instrument(skip_all, level = "debug", fields(points = x.len(), step_size), err(level = "warn"))]
pub fn compute_linear_spline(
    x: &[Real],
    y: &[Real],
    step_size: Option<Real>,
) -> Result<Fit, SplineError> {
    if let Some(step_size) = step_size {
        tracing::Span::current().record("step_size", step_size);
    }
    LinearSpline::new(x.to_vec(), y.to_vec())?.resample(Resolution::from_step_size(step_size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn linspace_includes_both_ends() {
        let values = linspace(1.0, 2.0, 5);
        assert_eq!(values, vec![1.0, 1.25, 1.5, 1.75, 2.0]);
        assert_eq!(linspace(0.0, 0.3, 500).len(), 500);
        assert_eq!(linspace(0.0, 0.3, 500).last(), Some(&0.3));
        assert_eq!(linspace(3.0, 4.0, 1), vec![3.0]);
    }

    #[test]
    fn arange_excludes_stop() {
        assert_eq!(arange(0.0, 1.0, 0.25).unwrap(), vec![0.0, 0.25, 0.5, 0.75]);
        assert_eq!(arange(0.0, 1.1, 0.25).unwrap().len(), 5);
        assert!(arange(1.0, 0.0, 0.25).unwrap().is_empty());
    }

    #[test]
    fn reproduces_linear_function() {
        let x = vec![0.0, 0.5, 1.3, 2.0, 4.1, 7.7];
        let y = x.iter().map(|x| 2.0 * x + 1.0).collect::<Vec<_>>();
        let spline = LinearSpline::new(x.clone(), y.clone()).unwrap();
        for (x, y) in x.iter().zip(&y) {
            assert_approx_eq!(spline.evaluate(*x), *y, 1e-9);
        }
        let fit = spline.resample(Resolution::default()).unwrap();
        assert_eq!(fit.x.len(), DEFAULT_NUM_POINTS);
        for (x, y) in fit.x.iter().zip(&fit.y) {
            assert_approx_eq!(*y, 2.0 * x + 1.0, 1e-9);
        }
    }

    #[test]
    fn interpolates_between_points() {
        let spline = LinearSpline::new(vec![0.0, 1.0, 3.0], vec![0.0, 1.0, 0.0]).unwrap();
        assert_approx_eq!(spline.evaluate(0.5), 0.5);
        assert_approx_eq!(spline.evaluate(2.0), 0.5);
        assert_approx_eq!(spline.evaluate(1.0), 1.0);
    }

    #[test]
    fn extrapolates_linearly() {
        let spline = LinearSpline::new(vec![0.0, 1.0, 3.0], vec![0.0, 1.0, 0.0]).unwrap();
        assert_approx_eq!(spline.evaluate(-1.0), -1.0);
        assert_approx_eq!(spline.evaluate(5.0), -1.0);
    }

    #[test]
    fn resample_with_step_size() {
        let fit = compute_linear_spline(&[0.0, 1.0], &[0.0, 10.0], Some(0.3)).unwrap();
        assert_eq!(fit.x.len(), 4);
        assert_approx_eq!(fit.x[3], 0.9);
        assert_approx_eq!(fit.y[3], 9.0);
        assert!(fit.x.iter().all(|&x| x < 1.0));
    }

    #[test]
    fn rejects_infinite_step_size() {
        assert_eq!(
            compute_linear_spline(&[0.0, 1.0], &[0.0, 1.0], Some(Real::INFINITY)),
            Err(SplineError::Interpolation(
                InterpolationError::InvalidStepSize(Real::INFINITY)
            ))
        );
    }

    #[test]
    fn non_positive_step_size_uses_default_points() {
        for step_size in [Some(0.0), Some(-0.5), Some(Real::NAN), None] {
            let fit = compute_linear_spline(&[0.0, 1.0], &[0.0, 1.0], step_size).unwrap();
            assert_eq!(fit.x.len(), DEFAULT_NUM_POINTS);
        }
    }

    #[test]
    fn rejects_excessive_point_count() {
        for step_size in [1e-300, 1e-9] {
            assert!(matches!(
                compute_linear_spline(&[0.0, 1.0], &[0.0, 1.0], Some(step_size)),
                Err(SplineError::Interpolation(
                    InterpolationError::TooManyPoints {
                        limit: MAX_NUM_POINTS,
                        ..
                    }
                ))
            ));
        }
        let spline = LinearSpline::new(vec![0.0, 1.0], vec![0.0, 1.0]).unwrap();
        assert!(spline.resample(Resolution::Points(MAX_NUM_POINTS + 1)).is_err());
        let fit = compute_linear_spline(&[0.0, 1.0], &[0.0, 1.0], Some(1e-5)).unwrap();
        assert!(fit.x.len() <= MAX_NUM_POINTS);
    }

    #[test]
    fn rejects_too_few_points() {
        assert_eq!(
            compute_linear_spline(&[1.0], &[1.0], None),
            Err(SplineError::Interpolation(InterpolationError::TooFewPoints(
                1
            )))
        );
    }

    #[test]
    fn rejects_mismatched_lengths() {
        assert_eq!(
            LinearSpline::new(vec![1.0, 2.0], vec![1.0]),
            Err(SplineError::Interpolation(
                InterpolationError::LengthMismatch { x: 2, y: 1 }
            ))
        );
    }

    #[test]
    fn rejects_non_finite_x() {
        assert_eq!(
            LinearSpline::new(vec![1.0, Real::NAN, 3.0], vec![1.0, 2.0, 3.0]),
            Err(SplineError::Interpolation(InterpolationError::NonFinite(1)))
        );
    }

    #[test]
    fn rejects_non_monotonic_domain() {
        assert_eq!(
            LinearSpline::new(vec![0.0, 1.0, 1.0, 2.0], vec![0.0; 4]),
            Err(SplineError::NonMonotonicDomain {
                index: 2,
                previous: 1.0,
                current: 1.0
            })
        );
    }

    #[test]
    fn unordered_points_are_sorted() {
        let ordered = LinearSpline::new(vec![0.0, 1.0, 2.0], vec![5.0, 6.0, 8.0]).unwrap();
        let unordered =
            LinearSpline::from_unordered(vec![2.0, 0.0, 1.0, 1.0], vec![8.0, 5.0, 6.0, 7.0])
                .unwrap();
        assert_eq!(ordered, unordered);
    }
}
