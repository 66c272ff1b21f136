use backcast::ProjectionEnsemble;
use chrono::NaiveDate;

pub struct SummaryRow {
    pub date: NaiveDate,
    pub mean: f64,
    pub median: f64,
    pub q2_5: f64,
    pub q25: f64,
    pub q75: f64,
    pub q97_5: f64,
}

/// Per-date mean, median and 2.5/25/75/97.5 percentiles across the
/// ensemble's realizations.
pub fn summarize(ensemble: &ProjectionEnsemble) -> Vec<SummaryRow> {
    let n = ensemble.n_realizations();
    ensemble
        .dates()
        .enumerate()
        .map(|(d, date)| {
            let mut values: Vec<f64> = (0..n)
                .map(|j| ensemble.counts()[(d, j)] as f64)
                .collect();
            values.sort_by(|a, b| a.partial_cmp(b).unwrap());
            let mean = values.iter().sum::<f64>() / n as f64;
            SummaryRow {
                date,
                mean,
                median: quantile(&values, 0.5),
                q2_5: quantile(&values, 0.025),
                q25: quantile(&values, 0.25),
                q75: quantile(&values, 0.75),
                q97_5: quantile(&values, 0.975),
            }
        })
        .collect()
}

/// Linearly interpolated quantile of an ascending-sorted slice.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}
