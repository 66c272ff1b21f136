//! Case-count inference: how many cases does one observed death imply?

use rand::Rng;
use rand_distr::{Distribution, Geometric};

use crate::error::{SimError, SimResult};

fn geometric(cfr: f64) -> SimResult<Geometric> {
    if !(cfr.is_finite() && cfr > 0.0 && cfr <= 1.0) {
        return Err(SimError::invalid_parameter(
            "cfr",
            format!("must lie in (0, 1], got {cfr}"),
        ));
    }
    Geometric::new(cfr).map_err(|e| SimError::invalid_parameter("cfr", e.to_string()))
}

/// Number of primary cases implied by a single death: the number of
/// Bernoulli(cfr) trials up to and including the first success, i.e.
/// `1 + Geometric(cfr)`. Always at least 1 (the fatal case itself).
pub fn cases_for_death<R: Rng + ?Sized>(cfr: f64, rng: &mut R) -> SimResult<u64> {
    Ok(1 + geometric(cfr)?.sample(rng))
}

/// One independent draw per death.
pub fn cases_for_deaths<R: Rng + ?Sized>(
    cfr: f64,
    n: usize,
    rng: &mut R,
) -> SimResult<Vec<u64>> {
    let geom = geometric(cfr)?;
    Ok((0..n).map(|_| 1 + geom.sample(rng)).collect())
}
