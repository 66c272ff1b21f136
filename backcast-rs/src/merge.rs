//! Combining projection ensembles.
//!
//! Two distinct operations with different semantics: additive merges sum
//! per-realization trajectories across ensembles (contributions of several
//! deaths within one repetition), concatenative merges pool independent
//! realizations (separate repetitions) onto one axis.

use nalgebra::DMatrix;

use crate::error::{SimError, SimResult};
use crate::projection::ProjectionEnsemble;

/// Sum ensembles realization-by-realization over the union of their date
/// axes; days an input does not cover contribute zero. All inputs must
/// carry the same realization count.
pub fn merge_additive(ensembles: &[ProjectionEnsemble]) -> SimResult<ProjectionEnsemble> {
    let first = ensembles.first().ok_or_else(|| {
        SimError::invalid_parameter("ensembles", "at least one ensemble is required")
    })?;
    let n = first.n_realizations();
    let mut start = first.start();
    let mut end = first.end();
    for ens in &ensembles[1..] {
        if ens.n_realizations() != n {
            return Err(SimError::RealizationMismatch {
                expected: n,
                found: ens.n_realizations(),
            });
        }
        start = start.min(ens.start());
        end = end.max(ens.end());
    }

    let n_days = (end - start).num_days() as usize + 1;
    let mut counts = DMatrix::<u64>::zeros(n_days, n);
    for ens in ensembles {
        let offset = (ens.start() - start).num_days() as usize;
        for j in 0..n {
            for d in 0..ens.n_days() {
                counts[(offset + d, j)] += ens.counts()[(d, j)];
            }
        }
    }
    Ok(ProjectionEnsemble::new(start, counts))
}

/// Append realizations from independent ensembles sharing one date axis;
/// every input trajectory is carried over unchanged.
pub fn merge_concatenative(ensembles: &[ProjectionEnsemble]) -> SimResult<ProjectionEnsemble> {
    let first = ensembles.first().ok_or_else(|| {
        SimError::invalid_parameter("ensembles", "at least one ensemble is required")
    })?;
    let start = first.start();
    let end = first.end();
    let mut total = 0;
    for ens in ensembles {
        if ens.start() != start || ens.end() != end {
            return Err(SimError::AxisMismatch {
                expected_start: start,
                expected_end: end,
                found_start: ens.start(),
                found_end: ens.end(),
            });
        }
        total += ens.n_realizations();
    }

    let n_days = first.n_days();
    let mut counts = DMatrix::<u64>::zeros(n_days, total);
    let mut col = 0;
    for ens in ensembles {
        for j in 0..ens.n_realizations() {
            for d in 0..n_days {
                counts[(d, col)] = ens.counts()[(d, j)];
            }
            col += 1;
        }
    }
    Ok(ProjectionEnsemble::new(start, counts))
}

#[cfg(test)]
mod test {
    use chrono::{Duration, NaiveDate};

    use super::*;

    fn day(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 2, 1).unwrap() + Duration::days(offset)
    }

    fn ensemble(start: i64, rows: usize, cols: usize, fill: impl Fn(usize, usize) -> u64) -> ProjectionEnsemble {
        ProjectionEnsemble::new(day(start), DMatrix::from_fn(rows, cols, fill))
    }

    #[test]
    fn test_additive_sums_aligned_days() {
        let a = ensemble(0, 3, 2, |d, j| (d + j) as u64);
        let b = ensemble(0, 3, 2, |d, _| d as u64);
        let merged = merge_additive(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(merged.start(), day(0));
        assert_eq!(merged.n_days(), 3);
        for j in 0..2 {
            for d in 0..3i64 {
                assert_eq!(
                    merged.value(day(d), j),
                    Some(a.value(day(d), j).unwrap() + b.value(day(d), j).unwrap())
                );
            }
        }
    }

    #[test]
    fn test_additive_union_axis_with_offset() {
        let a = ensemble(0, 2, 1, |_, _| 1);
        let b = ensemble(3, 2, 1, |_, _| 2);
        let merged = merge_additive(&[a, b]).unwrap();
        assert_eq!(merged.start(), day(0));
        assert_eq!(merged.end(), day(4));
        let values: Vec<u64> = (0..5).map(|d| merged.value(day(d), 0).unwrap()).collect();
        // Disjoint axes: each input's days keep their own values, the gap
        // day is zero, nothing is dropped.
        assert_eq!(values, vec![1, 1, 0, 2, 2]);
    }

    #[test]
    fn test_additive_is_commutative_and_associative() {
        let a = ensemble(0, 4, 3, |d, j| (3 * d + j) as u64);
        let b = ensemble(1, 4, 3, |d, j| (7 * d + 2 * j) as u64);
        let c = ensemble(-2, 4, 3, |d, j| (d * j) as u64);
        let abc = merge_additive(&[a.clone(), b.clone(), c.clone()]).unwrap();
        let cba = merge_additive(&[c.clone(), b.clone(), a.clone()]).unwrap();
        assert_eq!(abc, cba);
        let ab_then_c =
            merge_additive(&[merge_additive(&[a, b]).unwrap(), c]).unwrap();
        assert_eq!(abc, ab_then_c);
    }

    #[test]
    fn test_additive_rejects_unequal_realization_counts() {
        let a = ensemble(0, 2, 3, |_, _| 0);
        let b = ensemble(0, 2, 4, |_, _| 0);
        let err = merge_additive(&[a, b]).unwrap_err();
        assert_eq!(
            err,
            SimError::RealizationMismatch {
                expected: 3,
                found: 4
            }
        );
    }

    #[test]
    fn test_concatenative_widens_and_preserves() {
        let a = ensemble(0, 3, 10, |d, j| (d * 100 + j) as u64);
        let b = ensemble(0, 3, 5, |d, j| (d * 1000 + j) as u64);
        let merged = merge_concatenative(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(merged.n_realizations(), 15);
        assert_eq!(merged.start(), a.start());
        assert_eq!(merged.end(), a.end());
        for d in 0..3i64 {
            for j in 0..10 {
                assert_eq!(merged.value(day(d), j), a.value(day(d), j));
            }
            for j in 0..5 {
                assert_eq!(merged.value(day(d), 10 + j), b.value(day(d), j));
            }
        }
    }

    #[test]
    fn test_concatenative_is_associative() {
        let a = ensemble(0, 3, 2, |d, j| (d + j) as u64);
        let b = ensemble(0, 3, 3, |d, j| (d * j) as u64);
        let c = ensemble(0, 3, 1, |d, _| d as u64);
        let abc = merge_concatenative(&[a.clone(), b.clone(), c.clone()]).unwrap();
        let nested = merge_concatenative(&[merge_concatenative(&[a, b]).unwrap(), c]).unwrap();
        assert_eq!(abc, nested);
    }

    #[test]
    fn test_concatenative_rejects_mismatched_axes() {
        let a = ensemble(0, 3, 2, |_, _| 0);
        let b = ensemble(1, 3, 2, |_, _| 0);
        let err = merge_concatenative(&[a, b]).unwrap_err();
        assert!(matches!(err, SimError::AxisMismatch { .. }));
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(merge_additive(&[]).is_err());
        assert!(merge_concatenative(&[]).is_err());
    }
}
