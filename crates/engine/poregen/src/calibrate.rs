//! Porosity-targeting helpers
//!
//! Generators whose porosity is only indirectly controlled (number of seeds,
//! number of fibers) share two strategies: bisection over a scalar control
//! parameter, and a fractional schedule that inserts work in batches and
//! re-estimates between them.

use std::fmt::Debug;

use tracing::debug;

use crate::error::{Error, Result};

/// Scalar that bisection can search over.
pub trait ControlParameter: Copy + PartialEq + Debug {
    /// Point between `lo` and `hi`, rounded towards `lo` for integers.
    fn midpoint(lo: Self, hi: Self) -> Self;
}

impl ControlParameter for u64 {
    fn midpoint(lo: Self, hi: Self) -> Self {
        lo / 2 + hi / 2 + (lo % 2 + hi % 2) / 2
    }
}

impl ControlParameter for f64 {
    fn midpoint(lo: Self, hi: Self) -> Self {
        0.5 * (lo + hi)
    }
}

/// How the measured quantity moves when the control parameter grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    Decreasing,
    Increasing,
}

/// Bracket and stopping rule for [`bisect`].
#[derive(Debug, Clone, PartialEq)]
pub struct BisectParams<P> {
    pub lower: P,
    pub upper: P,
    pub target: f64,
    pub tol: f64,
    pub max_iter: usize,
    pub response: Response,
}

/// Outcome of a calibration loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration<P> {
    /// Evaluated parameter closest to the target
    pub parameter: P,
    /// Measurement at `parameter`
    pub achieved: f64,
    pub target: f64,
    pub iterations: usize,
    /// Whether `|achieved - target| <= tol` was reached
    pub converged: bool,
    /// Every `(parameter, measurement)` pair in evaluation order
    pub history: Vec<(P, f64)>,
}

impl<P> Calibration<P> {
    pub fn error(&self) -> f64 {
        (self.achieved - self.target).abs()
    }
}

/// Bisection search on `[lower, upper]`.
///
/// Each round evaluates `eval` at the midpoint, which returns the measured
/// quantity and an arbitrary output. The search stops once the measurement is
/// within `tol` of the target or after `max_iter` rounds; running out of
/// rounds is not an error. The output of the evaluation closest to the target
/// is returned with the calibration record, so a larger `max_iter` never makes
/// the result worse.
pub fn bisect<P, T, F>(params: &BisectParams<P>, mut eval: F) -> Result<(T, Calibration<P>)>
where
    P: ControlParameter,
    F: FnMut(P) -> Result<(f64, T)>,
{
    if params.max_iter == 0 {
        return Err(Error::invalid("bisection needs at least one iteration"));
    }
    if !(params.tol >= 0.0) {
        return Err(Error::invalid(format!(
            "tolerance must be non-negative, got {}",
            params.tol
        )));
    }

    let (mut lo, mut hi) = (params.lower, params.upper);
    let mut history = Vec::with_capacity(params.max_iter);
    let mut best: Option<(P, f64, T)> = None;
    let mut converged = false;

    for _ in 0..params.max_iter {
        let p = P::midpoint(lo, hi);
        let (measured, output) = eval(p)?;
        let err = measured - params.target;
        history.push((p, measured));
        debug!("bisect: parameter {:?} -> {:.4} (target {:.4})", p, measured, params.target);

        // Move the bracket towards the side that closes the gap
        let raise = match params.response {
            Response::Decreasing => err > 0.0,
            Response::Increasing => err < 0.0,
        };
        if raise {
            lo = p;
        } else {
            hi = p;
        }

        let closer = match &best {
            Some((_, achieved, _)) => err.abs() < (achieved - params.target).abs(),
            None => true,
        };
        if closer {
            best = Some((p, measured, output));
        }
        if err.abs() <= params.tol {
            converged = true;
            break;
        }
    }

    let Some((parameter, achieved, output)) = best else {
        return Err(Error::invalid("bisection needs at least one iteration"));
    };
    let calibration = Calibration {
        parameter,
        achieved,
        target: params.target,
        iterations: history.len(),
        converged,
        history,
    };
    Ok((output, calibration))
}

/// Cumulative fractions of the total work to have done after each batch.
///
/// The first batch is 20 % of the estimate; the remaining 80 % is spread over
/// later batches with weights `(max_iter - i)^2`, so early batches are large
/// and later ones refine. The last fraction is exactly 1 when `max_iter > 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct FractionalSchedule {
    fractions: Vec<f64>,
}

impl FractionalSchedule {
    pub fn new(max_iter: usize) -> Result<Self> {
        if max_iter == 0 {
            return Err(Error::invalid("a schedule needs at least one batch"));
        }
        let weight_sum: f64 = (1..max_iter).map(|k| (k * k) as f64).sum();
        let mut fractions = Vec::with_capacity(max_iter);
        fractions.push(0.2);
        for i in 1..max_iter {
            let step = ((max_iter - i) * (max_iter - i)) as f64 * 0.8 / weight_sum;
            fractions.push(fractions[i - 1] + step);
        }
        Ok(Self { fractions })
    }

    pub fn fractions(&self) -> &[f64] {
        &self.fractions
    }

    pub fn len(&self) -> usize {
        self.fractions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fractions.is_empty()
    }
}
