//! Bounded Nelder–Mead minimizer used by model fitting.

use std::time::Instant;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Minimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FitFailure {
    IterationLimit(usize),
    TimedOut,
    NonFinite,
}

impl core::fmt::Display for FitFailure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FitFailure::IterationLimit(n) => write!(f, "optimizer did not converge in {n} iterations"),
            FitFailure::TimedOut => f.write_str("optimizer exceeded its time budget"),
            FitFailure::NonFinite => f.write_str("objective became non-finite"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Limits {
    pub max_iterations: usize,
    pub deadline: Instant,
    /// Relative tolerance on the spread of objective values.
    pub f_tol: f64,
    /// Absolute tolerance on the simplex diameter.
    pub x_tol: f64,
}

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Minimize `f` from `start`, with an initial simplex of edge `step`.
///
/// Converges when both the objective spread and the simplex diameter fall
/// under tolerance. Gives up with [`FitFailure`] at the iteration cap or the
/// deadline; never loops unbounded.
pub(crate) fn nelder_mead<F>(f: F, start: &[f64], step: f64, limits: Limits) -> Result<Minimum, FitFailure>
where
    F: Fn(&[f64]) -> f64,
{
    let n = start.len();
    let eval = |x: &[f64]| -> Result<f64, FitFailure> {
        let v = f(x);
        if v.is_nan() { Err(FitFailure::NonFinite) } else { Ok(v) }
    };

    let mut simplex: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
    simplex.push((start.to_vec(), eval(start)?));
    for i in 0..n {
        let mut x = start.to_vec();
        x[i] += step;
        let v = eval(&x)?;
        simplex.push((x, v));
    }

    for iteration in 0..limits.max_iterations {
        if Instant::now() >= limits.deadline {
            return Err(FitFailure::TimedOut);
        }

        simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
        let best = simplex[0].1;
        let worst = simplex[n].1;

        let f_spread = (worst - best).abs();
        let diameter = simplex
            .iter()
            .skip(1)
            .map(|(x, _)| {
                x.iter()
                    .zip(&simplex[0].0)
                    .map(|(a, b)| (a - b).abs())
                    .fold(0.0, f64::max)
            })
            .fold(0.0, f64::max);
        if f_spread <= limits.f_tol * (1.0 + best.abs()) && diameter <= limits.x_tol {
            let (x, value) = simplex.swap_remove(0);
            if !value.is_finite() || x.iter().any(|v| !v.is_finite()) {
                return Err(FitFailure::NonFinite);
            }
            return Ok(Minimum {
                x,
                value,
                iterations: iteration,
            });
        }

        // Centroid of all but the worst vertex.
        let mut centroid = vec![0.0; n];
        for (x, _) in simplex.iter().take(n) {
            for (c, xi) in centroid.iter_mut().zip(x) {
                *c += xi / n as f64;
            }
        }
        let along = |coef: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(&simplex[n].0)
                .map(|(c, w)| c + coef * (c - w))
                .collect()
        };

        let reflected = along(REFLECT);
        let f_reflected = eval(&reflected)?;

        if f_reflected < best {
            let expanded = along(EXPAND);
            let f_expanded = eval(&expanded)?;
            simplex[n] = if f_expanded < f_reflected {
                (expanded, f_expanded)
            } else {
                (reflected, f_reflected)
            };
            continue;
        }

        if f_reflected < simplex[n - 1].1 {
            simplex[n] = (reflected, f_reflected);
            continue;
        }

        let contracted = along(-CONTRACT);
        let f_contracted = eval(&contracted)?;
        if f_contracted < worst {
            simplex[n] = (contracted, f_contracted);
            continue;
        }

        let anchor = simplex[0].0.clone();
        for vertex in simplex.iter_mut().skip(1) {
            let shrunk: Vec<f64> = anchor
                .iter()
                .zip(&vertex.0)
                .map(|(a, x)| a + SHRINK * (x - a))
                .collect();
            let v = eval(&shrunk)?;
            *vertex = (shrunk, v);
        }
    }

    Err(FitFailure::IterationLimit(limits.max_iterations))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn limits(max_iterations: usize) -> Limits {
        Limits {
            max_iterations,
            deadline: Instant::now() + Duration::from_secs(5),
            f_tol: 1e-10,
            x_tol: 1e-7,
        }
    }

    #[test]
    fn finds_quadratic_minimum() {
        let f = |x: &[f64]| (x[0] - 0.3).powi(2) + 2.0 * (x[1] + 0.4).powi(2);
        let m = nelder_mead(f, &[0.0, 0.0], 0.1, limits(1_000)).unwrap();
        assert!((m.x[0] - 0.3).abs() < 1e-4);
        assert!((m.x[1] + 0.4).abs() < 1e-4);
    }

    #[test]
    fn one_dimensional_search() {
        let f = |x: &[f64]| (x[0] - 0.7).abs();
        let m = nelder_mead(f, &[0.0], 0.1, limits(1_000)).unwrap();
        assert!((m.x[0] - 0.7).abs() < 1e-4);
    }

    #[test]
    fn stops_at_iteration_cap() {
        let f = |x: &[f64]| (x[0] - 0.3).powi(2) + (x[1] - 0.1).powi(2);
        let err = nelder_mead(f, &[5.0, 5.0], 0.1, limits(3)).unwrap_err();
        assert_eq!(err, FitFailure::IterationLimit(3));
    }

    #[test]
    fn stops_at_deadline() {
        let f = |x: &[f64]| x[0] * x[0];
        let expired = Limits {
            deadline: Instant::now(),
            ..limits(1_000)
        };
        assert_eq!(nelder_mead(f, &[1.0], 0.1, expired).unwrap_err(), FitFailure::TimedOut);
    }

    #[test]
    fn nan_objective_is_reported() {
        let f = |_: &[f64]| f64::NAN;
        assert_eq!(nelder_mead(f, &[0.0], 0.1, limits(10)).unwrap_err(), FitFailure::NonFinite);
    }
}
