//! Cubic spline interpolation with not-a-knot end conditions.
//!
//! The spline is stored as knot values plus second derivatives `M_i`. On
//! interval `[x_i, x_{i+1}]` with `h = x_{i+1} - x_i`:
//!
//! ```text
//! S(x) = M_i (x_{i+1} - x)^3 / 6h + M_{i+1} (x - x_i)^3 / 6h
//!      + (y_i / h - M_i h / 6) (x_{i+1} - x)
//!      + (y_{i+1} / h - M_{i+1} h / 6) (x - x_i)
//! ```
//!
//! Queries outside `[x_0, x_{n-1}]` evaluate the first or last piece, so the
//! curve extrapolates with the end polynomials instead of clamping.
//!
//! With two knots the spline is the straight line through them and with
//! three it is the interpolating parabola.

use nalgebra::{DMatrix, DVector};

use crate::error::{PhysicsError, PhysicsResult};

#[derive(Clone, Debug)]
pub struct CubicSpline {
    x: Vec<f64>,
    y: Vec<f64>,
    /// Second derivative at each knot
    m: Vec<f64>,
}

impl CubicSpline {
    /// Fit a not-a-knot spline through `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns error if the slices differ in length, hold fewer than two
    /// points, contain non-finite values, or `x` is not strictly increasing.
    pub fn not_a_knot(x: &[f64], y: &[f64]) -> PhysicsResult<Self> {
        if x.len() != y.len() {
            return Err(PhysicsError::InvalidArg {
                what: "x and y must have the same length",
            });
        }
        if x.len() < 2 {
            return Err(PhysicsError::InvalidArg {
                what: "spline needs at least two points",
            });
        }
        for (&xi, &yi) in x.iter().zip(y) {
            bl_core::ensure_finite(xi, "spline x")?;
            bl_core::ensure_finite(yi, "spline y")?;
        }
        if x.windows(2).any(|w| w[1] <= w[0]) {
            return Err(PhysicsError::Spline {
                what: "x must be strictly increasing".to_string(),
            });
        }

        let h: Vec<f64> = x.windows(2).map(|w| w[1] - w[0]).collect();
        let slopes: Vec<f64> = y
            .windows(2)
            .zip(&h)
            .map(|(w, hi)| (w[1] - w[0]) / hi)
            .collect();

        let m = match x.len() {
            2 => vec![0.0; 2],
            3 => {
                let curvature = 2.0 * (slopes[1] - slopes[0]) / (h[0] + h[1]);
                vec![curvature; 3]
            }
            _ => solve_second_derivatives(&h, &slopes)?,
        };

        Ok(Self {
            x: x.to_vec(),
            y: y.to_vec(),
            m,
        })
    }

    /// Evaluate the spline at `xq`.
    pub fn eval(&self, xq: f64) -> f64 {
        let n = self.x.len();
        let i = self
            .x
            .partition_point(|&xi| xi <= xq)
            .saturating_sub(1)
            .min(n - 2);

        let (x0, x1) = (self.x[i], self.x[i + 1]);
        let (y0, y1) = (self.y[i], self.y[i + 1]);
        let (m0, m1) = (self.m[i], self.m[i + 1]);
        let h = x1 - x0;
        let a = x1 - xq;
        let b = xq - x0;

        m0 * a * a * a / (6.0 * h)
            + m1 * b * b * b / (6.0 * h)
            + (y0 / h - m0 * h / 6.0) * a
            + (y1 / h - m1 * h / 6.0) * b
    }

    /// Knot abscissae.
    pub fn knots(&self) -> &[f64] {
        &self.x
    }
}

/// Solve the n×n system for knot second derivatives (n >= 4).
///
/// Interior rows enforce continuous first derivatives; the first and last
/// rows enforce a continuous third derivative at `x_1` and `x_{n-2}`.
fn solve_second_derivatives(h: &[f64], slopes: &[f64]) -> PhysicsResult<Vec<f64>> {
    let n = h.len() + 1;
    let mut a = DMatrix::<f64>::zeros(n, n);
    let mut rhs = DVector::<f64>::zeros(n);

    a[(0, 0)] = h[1];
    a[(0, 1)] = -(h[0] + h[1]);
    a[(0, 2)] = h[0];

    for i in 1..n - 1 {
        a[(i, i - 1)] = h[i - 1];
        a[(i, i)] = 2.0 * (h[i - 1] + h[i]);
        a[(i, i + 1)] = h[i];
        rhs[i] = 6.0 * (slopes[i] - slopes[i - 1]);
    }

    a[(n - 1, n - 3)] = h[n - 2];
    a[(n - 1, n - 2)] = -(h[n - 3] + h[n - 2]);
    a[(n - 1, n - 1)] = h[n - 3];

    a.lu()
        .solve(&rhs)
        .map(|sol| sol.iter().copied().collect())
        .ok_or_else(|| PhysicsError::Spline {
            what: format!("singular not-a-knot system for {n} knots"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cubic(x: f64) -> f64 {
        0.5 * x * x * x - 2.0 * x * x + x + 3.0
    }

    #[test]
    fn reproduces_cubic_exactly() {
        let x = [0.0, 0.7, 1.5, 2.0, 3.2, 4.0];
        let y: Vec<f64> = x.iter().map(|&v| cubic(v)).collect();
        let spline = CubicSpline::not_a_knot(&x, &y).unwrap();

        for xq in [0.3, 1.0, 2.5, 3.9] {
            assert!((spline.eval(xq) - cubic(xq)).abs() < 1e-9, "x={xq}");
        }
    }

    #[test]
    fn extrapolates_with_end_pieces() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y: Vec<f64> = x.iter().map(|&v| cubic(v)).collect();
        let spline = CubicSpline::not_a_knot(&x, &y).unwrap();

        // Not clamped to the end values
        assert!((spline.eval(0.0) - cubic(0.0)).abs() < 1e-8);
        assert!((spline.eval(6.5) - cubic(6.5)).abs() < 1e-8);
    }

    #[test]
    fn passes_through_knots() {
        let x = [0.5, 1.0, 1.8, 2.4, 3.0, 3.3];
        let y = [10.0, 8.1, 6.9, 6.2, 5.8, 5.7];
        let spline = CubicSpline::not_a_knot(&x, &y).unwrap();
        for (&xi, &yi) in x.iter().zip(&y) {
            assert!((spline.eval(xi) - yi).abs() < 1e-10);
        }
    }

    #[test]
    fn two_points_is_linear() {
        let spline = CubicSpline::not_a_knot(&[0.0, 2.0], &[1.0, 5.0]).unwrap();
        assert!((spline.eval(1.0) - 3.0).abs() < 1e-12);
        assert!((spline.eval(3.0) - 7.0).abs() < 1e-12);
    }

    #[test]
    fn three_points_is_parabola() {
        let f = |x: f64| 2.0 * x * x - x + 1.0;
        let x = [0.0, 1.0, 3.0];
        let y: Vec<f64> = x.iter().map(|&v| f(v)).collect();
        let spline = CubicSpline::not_a_knot(&x, &y).unwrap();
        assert!((spline.eval(2.0) - f(2.0)).abs() < 1e-10);
        assert!((spline.eval(-1.0) - f(-1.0)).abs() < 1e-10);
    }

    #[test]
    fn rejects_bad_input() {
        assert!(CubicSpline::not_a_knot(&[1.0], &[1.0]).is_err());
        assert!(CubicSpline::not_a_knot(&[1.0, 2.0], &[1.0]).is_err());
        assert!(CubicSpline::not_a_knot(&[1.0, 1.0, 2.0], &[1.0, 2.0, 3.0]).is_err());
        assert!(CubicSpline::not_a_knot(&[3.0, 2.0, 1.0], &[1.0, 2.0, 3.0]).is_err());
        assert!(CubicSpline::not_a_knot(&[1.0, f64::NAN], &[1.0, 2.0]).is_err());
    }
}
