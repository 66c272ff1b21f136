//! Discretized delay distributions: the serial interval and the
//! onset-to-death delay, with truncated resampling.

use rand::Rng;
use rand_distr::Distribution;
use serde::{Deserialize, Serialize};
use statrs::distribution::ContinuousCDF;

use crate::error::{SimError, SimResult};

/// Continuous parametric family a delay distribution is built from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DelayFamily {
    Gamma { shape: f64, rate: f64 },
    LogNormal { meanlog: f64, sdlog: f64 },
}

impl DelayFamily {
    /// Log-normal parameterized by its natural-scale mean and standard
    /// deviation rather than meanlog/sdlog.
    pub fn log_normal_from_mean_sd(mean: f64, sd: f64) -> Self {
        let cv2 = (sd / mean) * (sd / mean);
        let sdlog = (1.0 + cv2).ln().sqrt();
        let meanlog = mean.ln() - sdlog * sdlog / 2.0;
        Self::LogNormal { meanlog, sdlog }
    }
}

#[derive(Debug, Clone)]
enum Kernel {
    Gamma {
        cdf: statrs::distribution::Gamma,
        sampler: rand_distr::Gamma<f64>,
    },
    LogNormal {
        cdf: statrs::distribution::LogNormal,
        sampler: rand_distr::LogNormal<f64>,
    },
}

/// A delay distribution discretized at unit (one-day) width with zero
/// left-censoring offset: `pmf(k) = CDF(k + 1) - CDF(k)`.
///
/// Sampling draws the continuous variate and floors it, which yields
/// exactly the discretized pmf.
#[derive(Debug, Clone)]
pub struct DelayDistribution {
    name: String,
    family: DelayFamily,
    kernel: Kernel,
}

impl DelayDistribution {
    pub fn new(name: impl Into<String>, family: DelayFamily) -> SimResult<Self> {
        let name = name.into();
        let kernel = match family {
            DelayFamily::Gamma { shape, rate } => {
                if !(shape.is_finite() && shape > 0.0 && rate.is_finite() && rate > 0.0) {
                    return Err(SimError::invalid_parameter(
                        "delay family",
                        format!("gamma requires positive finite shape and rate, got shape {shape}, rate {rate}"),
                    ));
                }
                Kernel::Gamma {
                    cdf: statrs::distribution::Gamma::new(shape, rate)
                        .map_err(|e| SimError::invalid_parameter("delay family", e.to_string()))?,
                    // rand_distr takes a scale, statrs a rate
                    sampler: rand_distr::Gamma::new(shape, 1.0 / rate)
                        .map_err(|e| SimError::invalid_parameter("delay family", e.to_string()))?,
                }
            }
            DelayFamily::LogNormal { meanlog, sdlog } => {
                if !(meanlog.is_finite() && sdlog.is_finite() && sdlog > 0.0) {
                    return Err(SimError::invalid_parameter(
                        "delay family",
                        format!("log-normal requires finite meanlog and positive sdlog, got meanlog {meanlog}, sdlog {sdlog}"),
                    ));
                }
                Kernel::LogNormal {
                    cdf: statrs::distribution::LogNormal::new(meanlog, sdlog)
                        .map_err(|e| SimError::invalid_parameter("delay family", e.to_string()))?,
                    sampler: rand_distr::LogNormal::new(meanlog, sdlog)
                        .map_err(|e| SimError::invalid_parameter("delay family", e.to_string()))?,
                }
            }
        };
        Ok(Self { name, family, kernel })
    }

    /// Serial interval: log-normal with mean 4.7 days, sd 2.9 days.
    pub fn serial_interval() -> Self {
        Self::new(
            "serial interval",
            DelayFamily::log_normal_from_mean_sd(4.7, 2.9),
        )
        .expect("serial interval parameters are valid")
    }

    /// Onset-to-death delay, gamma parameterization.
    pub fn onset_to_death_gamma() -> Self {
        Self::new(
            "onset to death (gamma)",
            DelayFamily::Gamma {
                shape: 4.726,
                rate: 0.3151,
            },
        )
        .expect("onset-to-death gamma parameters are valid")
    }

    /// Onset-to-death delay, log-normal parameterization adjusted for
    /// right censoring of not-yet-observed deaths.
    pub fn onset_to_death_log_normal() -> Self {
        Self::new(
            "onset to death (log-normal)",
            DelayFamily::LogNormal {
                meanlog: 2.839078,
                sdlog: 0.577242,
            },
        )
        .expect("onset-to-death log-normal parameters are valid")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn family(&self) -> DelayFamily {
        self.family
    }

    fn cdf(&self, x: f64) -> f64 {
        match &self.kernel {
            Kernel::Gamma { cdf, .. } => cdf.cdf(x),
            Kernel::LogNormal { cdf, .. } => cdf.cdf(x),
        }
    }

    /// Probability mass on day offset `k` of the discretized distribution.
    pub fn pmf(&self, k: u64) -> f64 {
        let k = k as f64;
        self.cdf(k + 1.0) - self.cdf(k)
    }

    /// The pmf evaluated on `0..len`, for use as a convolution kernel.
    pub fn pmf_vec(&self, len: usize) -> Vec<f64> {
        (0..len as u64).map(|k| self.pmf(k)).collect()
    }

    pub fn sample_one<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        let x = match &self.kernel {
            Kernel::Gamma { sampler, .. } => sampler.sample(rng),
            Kernel::LogNormal { sampler, .. } => sampler.sample(rng),
        };
        x.floor() as u64
    }

    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<u64> {
        (0..n).map(|_| self.sample_one(rng)).collect()
    }

    /// Wrap this distribution in a resample-until-in-bounds sampler over
    /// `[min, max]` days. Fails up front when the window carries no mass.
    pub fn truncated(self, min: u64, max: u64) -> SimResult<TruncatedDelay> {
        if min > max {
            return Err(SimError::invalid_parameter(
                "truncation bounds",
                format!("min_delay {min} exceeds max_delay {max}"),
            ));
        }
        let mass: f64 = (min..=max).map(|k| self.pmf(k)).sum();
        if mass < MIN_WINDOW_MASS {
            return Err(SimError::TruncationExhausted {
                distribution: self.name,
                min,
                max,
            });
        }
        Ok(TruncatedDelay {
            delay: self,
            min,
            max,
        })
    }
}

/// Mass below which the truncation window is treated as empty.
const MIN_WINDOW_MASS: f64 = 1e-12;

/// Truncated sampler: values outside `[min, max]` are rejected and redrawn,
/// never clamped.
#[derive(Debug, Clone)]
pub struct TruncatedDelay {
    delay: DelayDistribution,
    min: u64,
    max: u64,
}

impl TruncatedDelay {
    /// Rejection attempts per value before reporting exhaustion. The
    /// construction-time mass check makes hitting this astronomically
    /// unlikely for any accepted configuration.
    const MAX_ATTEMPTS: u32 = 10_000;

    pub fn distribution(&self) -> &DelayDistribution {
        &self.delay
    }

    pub fn min_delay(&self) -> u64 {
        self.min
    }

    pub fn max_delay(&self) -> u64 {
        self.max
    }

    pub fn sample_one<R: Rng + ?Sized>(&self, rng: &mut R) -> SimResult<u64> {
        for _ in 0..Self::MAX_ATTEMPTS {
            let k = self.delay.sample_one(rng);
            if k >= self.min && k <= self.max {
                return Ok(k);
            }
        }
        Err(SimError::TruncationExhausted {
            distribution: self.delay.name.clone(),
            min: self.min,
            max: self.max,
        })
    }

    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> SimResult<Vec<u64>> {
        (0..n).map(|_| self.sample_one(rng)).collect()
    }
}

#[cfg(test)]
mod test {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    #[test]
    fn test_pmf_sums_to_one() {
        for dist in [
            DelayDistribution::serial_interval(),
            DelayDistribution::onset_to_death_gamma(),
            DelayDistribution::onset_to_death_log_normal(),
        ] {
            let total: f64 = dist.pmf_vec(500).iter().sum();
            assert!(
                (total - 1.0).abs() < 1e-6,
                "{} pmf sums to {total}",
                dist.name()
            );
        }
    }

    #[test]
    fn test_sample_matches_pmf() {
        // Empirical frequencies of floored draws should track the
        // discretized pmf.
        let dist = DelayDistribution::serial_interval();
        let mut rng = StdRng::seed_from_u64(4711);
        let n = 100_000;
        let mut freq = vec![0u64; 64];
        for k in dist.sample(n, &mut rng) {
            if (k as usize) < freq.len() {
                freq[k as usize] += 1;
            }
        }
        for k in 0..15u64 {
            let expected = dist.pmf(k);
            let observed = freq[k as usize] as f64 / n as f64;
            assert!(
                (observed - expected).abs() < 5e-3,
                "pmf({k}) = {expected}, observed {observed}"
            );
        }
    }

    #[test]
    fn test_truncated_sampling_respects_bounds() {
        let trunc = DelayDistribution::onset_to_death_gamma()
            .truncated(1, 60)
            .unwrap();
        let mut rng = StdRng::seed_from_u64(8675309);
        let samples = trunc.sample(10_000, &mut rng).unwrap();
        assert_eq!(samples.len(), 10_000);
        assert!(samples.iter().all(|&k| (1..=60).contains(&k)));
    }

    #[test]
    fn test_truncation_window_without_mass_is_an_error() {
        // Essentially all gamma(4.726, 0.3151) mass lies below day 300.
        let err = DelayDistribution::onset_to_death_gamma()
            .truncated(400, 500)
            .unwrap_err();
        match err {
            SimError::TruncationExhausted {
                distribution,
                min,
                max,
            } => {
                assert_eq!(distribution, "onset to death (gamma)");
                assert_eq!((min, max), (400, 500));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_inverted_bounds_rejected() {
        let err = DelayDistribution::serial_interval()
            .truncated(10, 2)
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidParameter { .. }));
    }

    #[test]
    fn test_log_normal_from_mean_sd() {
        let DelayFamily::LogNormal { meanlog, sdlog } =
            DelayFamily::log_normal_from_mean_sd(4.7, 2.9)
        else {
            panic!("expected log-normal family");
        };
        // Round-trip: natural-scale mean and sd of the fitted log-normal.
        let mean = (meanlog + sdlog * sdlog / 2.0).exp();
        let sd = (mean * mean * ((sdlog * sdlog).exp() - 1.0)).sqrt();
        assert!((mean - 4.7).abs() < 1e-9);
        assert!((sd - 2.9).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_parameters_rejected() {
        assert!(
            DelayDistribution::new(
                "bad",
                DelayFamily::Gamma {
                    shape: -1.0,
                    rate: 0.5
                }
            )
            .is_err()
        );
        assert!(
            DelayDistribution::new(
                "bad",
                DelayFamily::LogNormal {
                    meanlog: 0.0,
                    sdlog: 0.0
                }
            )
            .is_err()
        );
    }
}
