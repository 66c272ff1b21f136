//! End-to-end back-calculation: deaths in, pooled case projections out.

use chrono::{Duration, NaiveDate};
use rand::{SeedableRng, rngs::StdRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cases::cases_for_death;
use crate::delay::{DelayDistribution, TruncatedDelay};
use crate::error::{SimError, SimResult};
use crate::merge::{merge_additive, merge_concatenative};
use crate::projection::{ProjectionEnsemble, project};

/// Stream constant for deriving independent per-repetition seeds from the
/// master seed, so parallel and serial runs agree bit-for-bit.
const SEED_STREAM: u64 = 0x9E37_79B9_7F4A_7C15;

/// Which onset-to-death parameterization to back-project with. The two are
/// interchangeable fits of the same delay; they differ in family and in how
/// far back the truncation window reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OnsetToDeathModel {
    Gamma,
    RightCensoredLogNormal,
}

impl OnsetToDeathModel {
    fn build(self) -> SimResult<TruncatedDelay> {
        match self {
            Self::Gamma => DelayDistribution::onset_to_death_gamma().truncated(1, 60),
            Self::RightCensoredLogNormal => {
                DelayDistribution::onset_to_death_log_normal().truncated(1, 80)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Reproduction number. Values below 1 are clamped to 1 with a warning.
    pub r: f64,
    /// Case fatality ratio, must lie in (0, 1].
    pub cfr: f64,
    /// Outer repetitions; values below 10 are clamped to 10.
    pub n_sim: usize,
    /// Days to project beyond the last reported death; clamped to >= 1.
    pub duration: i64,
    /// Branching-process realizations per death per repetition.
    pub inner_n_sim: usize,
    pub onset_to_death: OnsetToDeathModel,
    pub seed: u64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            r: 2.0,
            cfr: 0.02,
            n_sim: 100,
            duration: 1,
            inner_n_sim: 10,
            onset_to_death: OnsetToDeathModel::Gamma,
            seed: 0,
        }
    }
}

/// Everything `simulate` returns: the inputs echoed back, the raw simulated
/// onset/case traces (repetition-major, one entry per repetition x death),
/// and the pooled projection ensemble of `n_sim x inner_n_sim` realizations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub death_dates: Vec<NaiveDate>,
    pub onset_dates: Vec<NaiveDate>,
    pub case_counts: Vec<u64>,
    pub ensemble: ProjectionEnsemble,
}

struct Repetition {
    onsets: Vec<NaiveDate>,
    cases: Vec<u64>,
    ensemble: ProjectionEnsemble,
}

/// A reusable, immutable simulation instance: the two delay distributions
/// and the (corrected) parameters, built once and shared across calls.
/// `simulate` takes `&self` and is safe to call concurrently.
#[derive(Debug, Clone)]
pub struct Simulator {
    r: f64,
    cfr: f64,
    n_sim: usize,
    duration: i64,
    inner_n_sim: usize,
    seed: u64,
    serial_interval: DelayDistribution,
    onset_to_death: TruncatedDelay,
}

impl Simulator {
    /// Validate and correct the configuration. `cfr` out of (0, 1] and a
    /// non-positive `inner_n_sim` are hard errors; `r`, `duration` and
    /// `n_sim` are soft-clamped with a diagnostic.
    pub fn new(config: SimulatorConfig) -> SimResult<Self> {
        if !(config.cfr.is_finite() && config.cfr > 0.0 && config.cfr <= 1.0) {
            return Err(SimError::invalid_parameter(
                "cfr",
                format!("must lie in (0, 1], got {}", config.cfr),
            ));
        }
        if config.inner_n_sim == 0 {
            return Err(SimError::invalid_parameter(
                "inner_n_sim",
                "must be a positive integer",
            ));
        }

        let mut r = config.r;
        if !r.is_finite() {
            return Err(SimError::invalid_parameter(
                "r",
                format!("must be finite, got {r}"),
            ));
        }
        if r < 1.0 {
            tracing::warn!(r, "reproduction number below 1, using 1");
            r = 1.0;
        }
        let mut duration = config.duration;
        if duration < 1 {
            tracing::warn!(duration, "projection duration below 1 day, using 1");
            duration = 1;
        }
        let mut n_sim = config.n_sim;
        if n_sim < 10 {
            tracing::warn!(n_sim, "fewer than 10 repetitions requested, using 10");
            n_sim = 10;
        }

        Ok(Self {
            r,
            cfr: config.cfr,
            n_sim,
            duration,
            inner_n_sim: config.inner_n_sim,
            seed: config.seed,
            serial_interval: DelayDistribution::serial_interval(),
            onset_to_death: config.onset_to_death.build()?,
        })
    }

    /// Effective reproduction number after clamping.
    pub fn r(&self) -> f64 {
        self.r
    }

    pub fn cfr(&self) -> f64 {
        self.cfr
    }

    /// Effective repetition count after clamping.
    pub fn n_sim(&self) -> usize {
        self.n_sim
    }

    /// Effective projection duration after clamping.
    pub fn duration(&self) -> i64 {
        self.duration
    }

    pub fn inner_n_sim(&self) -> usize {
        self.inner_n_sim
    }

    pub fn serial_interval(&self) -> &DelayDistribution {
        &self.serial_interval
    }

    pub fn onset_to_death(&self) -> &TruncatedDelay {
        &self.onset_to_death
    }

    /// Run the full back-calculation over `death_dates`.
    ///
    /// Each of `n_sim` repetitions draws one onset date (death minus a
    /// truncated onset-to-death delay) and one case count per death, runs a
    /// branching-process projection per death up to the common end date
    /// `max(death_dates) + duration`, and sums the per-death ensembles.
    /// Repetition ensembles are then pooled by concatenation on the common
    /// axis `[min(death_dates) - max_delay, end]`. Any repetition failure
    /// aborts the call.
    pub fn simulate(&self, death_dates: &[NaiveDate]) -> SimResult<SimulationOutput> {
        let (earliest, latest) = match (death_dates.iter().min(), death_dates.iter().max()) {
            (Some(&lo), Some(&hi)) => (lo, hi),
            _ => return Err(SimError::EmptyDeathDates),
        };
        let end_date = latest + Duration::days(self.duration);
        // Earliest possible onset over all draws; every repetition is
        // padded onto this axis so repetitions can be concatenated.
        let axis_start = earliest - Duration::days(self.onset_to_death.max_delay() as i64);
        let axis_days = (end_date - axis_start).num_days() as usize + 1;

        tracing::debug!(
            deaths = death_dates.len(),
            n_sim = self.n_sim,
            inner_n_sim = self.inner_n_sim,
            %end_date,
            "starting back-calculation"
        );

        let repetitions: Vec<Repetition> = (0..self.n_sim)
            .into_par_iter()
            .map(|rep| self.run_repetition(rep, death_dates, end_date, axis_start, axis_days))
            .collect::<SimResult<Vec<_>>>()?;

        let mut onset_dates = Vec::with_capacity(self.n_sim * death_dates.len());
        let mut case_counts = Vec::with_capacity(self.n_sim * death_dates.len());
        let mut ensembles = Vec::with_capacity(self.n_sim);
        for rep in repetitions {
            onset_dates.extend(rep.onsets);
            case_counts.extend(rep.cases);
            ensembles.push(rep.ensemble);
        }
        let ensemble = merge_concatenative(&ensembles)?;

        Ok(SimulationOutput {
            death_dates: death_dates.to_vec(),
            onset_dates,
            case_counts,
            ensemble,
        })
    }

    fn run_repetition(
        &self,
        rep: usize,
        death_dates: &[NaiveDate],
        end_date: NaiveDate,
        axis_start: NaiveDate,
        axis_days: usize,
    ) -> SimResult<Repetition> {
        let stream = self.seed.wrapping_add((rep as u64).wrapping_mul(SEED_STREAM));
        let mut rng = StdRng::seed_from_u64(stream);

        let mut onsets = Vec::with_capacity(death_dates.len());
        let mut cases = Vec::with_capacity(death_dates.len());
        // The zero ensemble pins every repetition to the common axis.
        let mut ensembles = vec![ProjectionEnsemble::zeros(
            axis_start,
            axis_days,
            self.inner_n_sim,
        )];
        for &death in death_dates {
            let delay = self.onset_to_death.sample_one(&mut rng)?;
            let onset = death - Duration::days(delay as i64);
            let n_cases = cases_for_death(self.cfr, &mut rng)?;
            // An onset at or past the end date projects a single day.
            let horizon = (end_date - onset).num_days().max(0) as usize;
            ensembles.push(project(
                onset,
                n_cases,
                self.r,
                &self.serial_interval,
                self.inner_n_sim,
                horizon,
                &mut rng,
            ));
            onsets.push(onset);
            cases.push(n_cases);
        }
        let ensemble = merge_additive(&ensembles)?;
        Ok(Repetition {
            onsets,
            cases,
            ensemble,
        })
    }
}
