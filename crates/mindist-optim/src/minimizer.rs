//! Limited-memory BFGS minimizer for smooth objectives.
//!
//! The minimizer only needs the value and the gradient of the objective. The search direction
//! comes from the usual two-loop recursion over the last `memory` correction pairs, the step is
//! capped to `max_step` and accepted with a backtracking Armijo line search.

use std::collections::VecDeque;

/// A differentiable scalar objective.
pub trait Objective {
    /// Evaluate the objective and its gradient at `x`.
    ///
    /// The returned gradient must have the same length as `x`.
    fn value_gradient(&self, x: &[f64]) -> (f64, Vec<f64>);
}

impl<F> Objective for F
where
    F: Fn(&[f64]) -> (f64, Vec<f64>),
{
    fn value_gradient(&self, x: &[f64]) -> (f64, Vec<f64>) {
        self(x)
    }
}

/// Reason why the minimizer terminated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TerminationReason {
    /// Converged: gradient norm below tolerance
    GradientConverged,
    /// Maximum iterations reached
    MaxIterations,
    /// No step along the search direction decreased the objective
    LineSearchFailed,
}

/// Result of a local minimization.
#[derive(Debug, Clone)]
pub struct MinimizerResult {
    /// The final point. Same length as the starting point.
    pub x: Vec<f64>,
    /// Objective value at `x`.
    pub value: f64,
    /// Euclidean norm of the gradient at `x`.
    pub gradient_norm: f64,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Number of objective evaluations performed.
    pub num_evaluations: usize,
    /// Whether the gradient tolerance was satisfied.
    pub success: bool,
    /// Reason for termination.
    pub termination_reason: TerminationReason,
}

/// A local minimization routine: value and gradient in, converged point out.
///
/// Running out of iterations is not an error: the result is returned with `success = false`
/// and the caller may still use the unconverged point.
pub trait LocalMinimizer {
    /// Minimize `objective` starting from `x0`.
    fn minimize<O: Objective + ?Sized>(&self, x0: &[f64], objective: &O) -> MinimizerResult;
}

/// Parameters of the L-BFGS minimizer.
#[derive(Debug, Clone)]
pub struct LbfgsParams {
    /// Convergence threshold on the gradient norm.
    pub tolerance: f64,
    /// Maximum number of iterations.
    pub max_iterations: usize,
    /// Number of correction pairs kept in memory.
    pub memory: usize,
    /// Maximum length of a single step.
    pub max_step: f64,
    /// Sufficient decrease constant of the Armijo condition.
    pub armijo: f64,
    /// Maximum number of step halvings in the line search.
    pub max_backtracks: usize,
}

impl Default for LbfgsParams {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 500,
            memory: 4,
            max_step: 0.1,
            armijo: 1e-4,
            max_backtracks: 30,
        }
    }
}

impl LbfgsParams {
    /// Create default minimizer parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set gradient tolerance.
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    /// Set maximum iterations.
    pub fn with_max_iterations(mut self, max_iters: usize) -> Self {
        self.max_iterations = max_iters;
        self
    }

    /// Set the number of stored correction pairs.
    pub fn with_memory(mut self, memory: usize) -> Self {
        self.memory = memory;
        self
    }

    /// Set the maximum step length.
    pub fn with_max_step(mut self, max_step: f64) -> Self {
        self.max_step = max_step;
        self
    }
}

/// Limited-memory BFGS minimizer.
#[derive(Debug, Clone, Default)]
pub struct Lbfgs {
    /// Minimizer parameters.
    pub params: LbfgsParams,
}

impl Lbfgs {
    /// Create a new minimizer with the given parameters.
    pub fn new(params: LbfgsParams) -> Self {
        Self { params }
    }
}

struct CorrectionPair {
    s: Vec<f64>,
    y: Vec<f64>,
    rho: f64,
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

/// Two-loop recursion: returns `-H g` for the inverse Hessian approximation `H`.
fn search_direction(gradient: &[f64], history: &VecDeque<CorrectionPair>) -> Vec<f64> {
    let mut q = gradient.to_vec();
    let mut alphas = Vec::with_capacity(history.len());

    for pair in history.iter().rev() {
        let alpha = pair.rho * dot(&pair.s, &q);
        q.iter_mut()
            .zip(pair.y.iter())
            .for_each(|(qi, yi)| *qi -= alpha * yi);
        alphas.push(alpha);
    }

    let gamma = match history.back() {
        Some(pair) => dot(&pair.s, &pair.y) / dot(&pair.y, &pair.y),
        None => 1.0,
    };
    q.iter_mut().for_each(|qi| *qi *= gamma);

    for (pair, alpha) in history.iter().zip(alphas.iter().rev()) {
        let beta = pair.rho * dot(&pair.y, &q);
        q.iter_mut()
            .zip(pair.s.iter())
            .for_each(|(qi, si)| *qi += (alpha - beta) * si);
    }

    q.iter_mut().for_each(|qi| *qi = -*qi);
    q
}

impl LocalMinimizer for Lbfgs {
    fn minimize<O: Objective + ?Sized>(&self, x0: &[f64], objective: &O) -> MinimizerResult {
        let params = &self.params;

        let mut x = x0.to_vec();
        let (mut value, mut gradient) = objective.value_gradient(&x);
        let mut num_evaluations = 1;
        let mut gradient_norm = norm(&gradient);

        let mut history: VecDeque<CorrectionPair> = VecDeque::with_capacity(params.memory);
        let mut iterations = 0;
        let mut termination_reason = TerminationReason::MaxIterations;

        loop {
            if gradient_norm <= params.tolerance {
                termination_reason = TerminationReason::GradientConverged;
                break;
            }
            if iterations >= params.max_iterations {
                break;
            }

            let mut direction = search_direction(&gradient, &history);
            let mut slope = dot(&direction, &gradient);

            // the curvature pairs went stale, restart from steepest descent
            if slope >= 0.0 || !slope.is_finite() {
                history.clear();
                direction = gradient.iter().map(|g| -g).collect();
                slope = -gradient_norm * gradient_norm;
            }

            let direction_norm = norm(&direction);
            if direction_norm > params.max_step {
                let scale = params.max_step / direction_norm;
                direction.iter_mut().for_each(|d| *d *= scale);
                slope *= scale;
            }

            let mut step = 1.0;
            let mut accepted = None;
            for _ in 0..=params.max_backtracks {
                let x_new = x
                    .iter()
                    .zip(direction.iter())
                    .map(|(xi, di)| xi + step * di)
                    .collect::<Vec<_>>();
                let (value_new, gradient_new) = objective.value_gradient(&x_new);
                num_evaluations += 1;

                if value_new <= value + params.armijo * step * slope {
                    accepted = Some((x_new, value_new, gradient_new));
                    break;
                }
                step *= 0.5;
            }

            iterations += 1;

            let Some((x_new, value_new, gradient_new)) = accepted else {
                log::debug!(
                    "line search failed at iteration {} with gradient norm {:e}",
                    iterations,
                    gradient_norm
                );
                termination_reason = TerminationReason::LineSearchFailed;
                break;
            };

            let s = x_new
                .iter()
                .zip(x.iter())
                .map(|(a, b)| a - b)
                .collect::<Vec<_>>();
            let y = gradient_new
                .iter()
                .zip(gradient.iter())
                .map(|(a, b)| a - b)
                .collect::<Vec<_>>();
            let sy = dot(&s, &y);
            if sy > 1e-12 * norm(&s) * norm(&y) && sy > 0.0 {
                if history.len() == params.memory {
                    history.pop_front();
                }
                if params.memory > 0 {
                    history.push_back(CorrectionPair { s, y, rho: 1.0 / sy });
                }
            }

            x = x_new;
            value = value_new;
            gradient = gradient_new;
            gradient_norm = norm(&gradient);
        }

        MinimizerResult {
            x,
            value,
            gradient_norm,
            iterations,
            num_evaluations,
            success: gradient_norm <= params.tolerance,
            termination_reason,
        }
    }
}
