//! Forward simulation of recorded drive telemetry and the scalar
//! prediction-error objective used for parameter fitting.
//!
//! A [`DataSeries`](series::DataSeries) is one recorded run: uniform-timestep
//! columns of commanded powers, battery voltage, and measured pose/velocity.
//! [`simulate`](trajectory::simulate) forward-integrates the dynamics model
//! over the recorded commands and [`objective`](objective::objective)
//! reduces the divergence from the measurements to a single scalar — the
//! sole interface consumed by external parameter-search drivers.

pub mod objective;
pub mod series;
pub mod trajectory;

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::objective::{aggregate_objective, objective, objective_per_sample};
    pub use crate::series::{DataSeries, SeriesError};
    pub use crate::trajectory::{simulate, SimulatedTrajectory, SimulationError};
}
