//! Monte Carlo back-calculation of currently circulating cases from a
//! handful of recently reported deaths: onset dates are drawn backwards
//! through the onset-to-death delay, case counts through the case fatality
//! ratio, and a Poisson branching process projects the implied epidemic
//! forward under the serial interval.

pub mod cases;
pub mod delay;
pub mod error;
pub mod merge;
pub mod projection;
pub mod simulate;

pub use cases::{cases_for_death, cases_for_deaths};
pub use delay::{DelayDistribution, DelayFamily, TruncatedDelay};
pub use error::{SimError, SimResult};
pub use merge::{merge_additive, merge_concatenative};
pub use projection::{ProjectionEnsemble, project};
pub use simulate::{OnsetToDeathModel, SimulationOutput, Simulator, SimulatorConfig};
