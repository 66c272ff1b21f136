use backcast::{OnsetToDeathModel, SimulatorConfig};
use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Parameters {
    /// Reported death dates, ISO `YYYY-MM-DD`.
    pub deaths: Vec<NaiveDate>,
    #[serde(default = "default_r")]
    pub r: f64,
    #[serde(default = "default_cfr")]
    pub cfr: f64,
    #[serde(default = "default_n_sim")]
    pub n_sim: usize,
    #[serde(default = "default_duration")]
    pub duration: i64,
    #[serde(default = "default_inner_n_sim")]
    pub inner_n_sim: usize,
    #[serde(default = "default_onset_to_death")]
    pub onset_to_death: OnsetToDeathModel,
    #[serde(default)]
    pub seed: u64,
}

fn default_r() -> f64 {
    2.0
}

fn default_cfr() -> f64 {
    0.02
}

fn default_n_sim() -> usize {
    1000
}

fn default_duration() -> i64 {
    30
}

fn default_inner_n_sim() -> usize {
    10
}

fn default_onset_to_death() -> OnsetToDeathModel {
    OnsetToDeathModel::Gamma
}

impl Parameters {
    pub fn to_config(&self) -> SimulatorConfig {
        SimulatorConfig {
            r: self.r,
            cfr: self.cfr,
            n_sim: self.n_sim,
            duration: self.duration,
            inner_n_sim: self.inner_n_sim,
            onset_to_death: self.onset_to_death,
            seed: self.seed,
        }
    }
}
