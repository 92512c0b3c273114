//! Random duration sampling.
//!
//! Beta-PERT (shape λ=4) is the default and only required family; `Uniform`
//! and `Triangular` are provided behind the same `EstimationFamily` selector
//! so the trial loop never needs to change if another family is added.

use rand::Rng;
use rand_distr::{Distribution, Gamma};

use crate::dag::Estimate;

/// Beta-PERT's standard shape parameter. See Kelley & Walker-era PERT, or
/// any project-risk text: λ=4 is the conventional choice balancing a
/// single most-likely mode against the optimistic/pessimistic tails.
const PERT_LAMBDA: f64 = 4.0;

/// Selects which distribution family a task's three-point estimate is
/// sampled from. `BetaPert` is the default; the others exist so a task set
/// can opt a subset of tasks into a simpler model without touching the
/// simulation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EstimationFamily {
    #[default]
    BetaPert,
    Uniform,
    Triangular,
}

/// Draw one random duration for `estimate` under `family`, clamped to the
/// closed interval `[optimistic, pessimistic]`.
///
/// Never returns `NaN`: degenerate estimates (`P == O`) short-circuit to
/// the constant `O` before any distribution is constructed.
pub fn sample(family: EstimationFamily, estimate: &Estimate, rng: &mut impl Rng) -> f64 {
    let Estimate {
        optimistic: o,
        most_likely: m,
        pessimistic: p,
    } = *estimate;

    if p <= o {
        return o;
    }

    let raw = match family {
        EstimationFamily::BetaPert => sample_beta_pert(o, m, p, rng),
        EstimationFamily::Uniform => rng.gen_range(o..=p),
        EstimationFamily::Triangular => sample_triangular(o, m, p, rng),
    };

    raw.clamp(o, p)
}

/// Beta-PERT via two independent Gamma variates: `x = G(α)/(G(α)+G(β))`.
/// This avoids the rejection-sampling pathologies a direct Beta sampler can
/// hit when either shape parameter sits near 1 (i.e. `M` close to `O` or
/// `P`), which is common with hand-entered three-point estimates.
fn sample_beta_pert(o: f64, m: f64, p: f64, rng: &mut impl Rng) -> f64 {
    let range = p - o;
    let alpha = 1.0 + PERT_LAMBDA * (m - o) / range;
    let beta = 1.0 + PERT_LAMBDA * (p - m) / range;

    let x = sample_beta_via_gamma(alpha, beta, rng);
    o + x * range
}

fn sample_beta_via_gamma(alpha: f64, beta: f64, rng: &mut impl Rng) -> f64 {
    // Shape parameters are always >= 1 for a valid PERT triple, but guard
    // against underflow to zero shape from adversarial/degenerate inputs.
    let alpha = alpha.max(f64::MIN_POSITIVE);
    let beta = beta.max(f64::MIN_POSITIVE);

    let ga = Gamma::new(alpha, 1.0)
        .map(|d| d.sample(rng))
        .unwrap_or(alpha);
    let gb = Gamma::new(beta, 1.0)
        .map(|d| d.sample(rng))
        .unwrap_or(beta);

    let denom = ga + gb;
    if denom <= 0.0 || !denom.is_finite() {
        0.5
    } else {
        (ga / denom).clamp(0.0, 1.0)
    }
}

/// Inverse-CDF sampling of the triangular distribution with mode `m`.
fn sample_triangular(o: f64, m: f64, p: f64, rng: &mut impl Rng) -> f64 {
    let u: f64 = rng.gen_range(0.0..1.0);
    let fm = (m - o) / (p - o);
    if u < fm {
        o + (u * (p - o) * (m - o)).sqrt()
    } else {
        p - ((1.0 - u) * (p - o) * (p - m)).sqrt()
    }
}
