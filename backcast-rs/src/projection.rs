//! Projection ensembles and the branching process projector.

use chrono::{Duration, NaiveDate};
use nalgebra::DMatrix;
use rand::Rng;
use rand_distr::{Distribution, Poisson};
use serde::{Deserialize, Serialize};

use crate::delay::DelayDistribution;

/// A set of independent simulated daily new-case trajectories sharing one
/// contiguous date axis.
///
/// Rows index days from `start`, columns index realizations. Ensembles are
/// never mutated after construction; merges build new ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionEnsemble {
    start: NaiveDate,
    counts: DMatrix<u64>,
}

impl ProjectionEnsemble {
    /// `counts` must have at least one row; the axis is
    /// `start..=start + nrows - 1`.
    pub fn new(start: NaiveDate, counts: DMatrix<u64>) -> Self {
        assert!(counts.nrows() > 0, "ensemble needs at least one day");
        Self { start, counts }
    }

    /// An all-zero ensemble, used to widen another ensemble's axis.
    pub fn zeros(start: NaiveDate, n_days: usize, n_realizations: usize) -> Self {
        Self::new(start, DMatrix::zeros(n_days, n_realizations))
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.start + Duration::days(self.counts.nrows() as i64 - 1)
    }

    pub fn n_days(&self) -> usize {
        self.counts.nrows()
    }

    pub fn n_realizations(&self) -> usize {
        self.counts.ncols()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        (0..self.counts.nrows() as i64).map(move |d| self.start + Duration::days(d))
    }

    pub fn counts(&self) -> &DMatrix<u64> {
        &self.counts
    }

    /// New-case count on `date` in realization `j`, or `None` when the date
    /// falls outside the axis.
    pub fn value(&self, date: NaiveDate, j: usize) -> Option<u64> {
        let offset = (date - self.start).num_days();
        if offset < 0 || offset >= self.counts.nrows() as i64 {
            return None;
        }
        Some(self.counts[(offset as usize, j)])
    }

    /// Cumulative cases in realization `j` from the axis start through
    /// `date` inclusive.
    pub fn cumulative_through(&self, date: NaiveDate, j: usize) -> u64 {
        (0..self.counts.nrows())
            .take_while(|&d| self.start + Duration::days(d as i64) <= date)
            .map(|d| self.counts[(d, j)])
            .sum()
    }
}

/// Forward-simulate a Poisson branching process from one incidence seed.
///
/// Each of the `n_sim` realizations starts with `seed_count` cases on
/// `seed_date`; every later day draws Poisson(R x sum over prior days of
/// cases x serial-interval pmf at the lag). The axis spans
/// `seed_date..=seed_date + horizon_days`.
///
/// Inputs are trusted: the caller layer is responsible for clamping `r`.
pub fn project<R: Rng + ?Sized>(
    seed_date: NaiveDate,
    seed_count: u64,
    r: f64,
    serial_interval: &DelayDistribution,
    n_sim: usize,
    horizon_days: usize,
    rng: &mut R,
) -> ProjectionEnsemble {
    let n_days = horizon_days + 1;
    let kernel = serial_interval.pmf_vec(n_days);
    let mut counts = DMatrix::<u64>::zeros(n_days, n_sim);
    for j in 0..n_sim {
        counts[(0, j)] = seed_count;
        for step in 1..n_days {
            let mut infectious_pressure = 0.0;
            for lag in 1..=usize::min(step, kernel.len() - 1) {
                infectious_pressure += counts[(step - lag, j)] as f64 * kernel[lag];
            }
            let rate = r * infectious_pressure;
            if rate > 0.0 {
                // Poisson requires a non-zero rate
                counts[(step, j)] = Poisson::new(rate).unwrap().sample(rng) as u64;
            }
        }
    }
    ProjectionEnsemble::new(seed_date, counts)
}
