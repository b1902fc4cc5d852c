//! Parameter estimation for the mecanum drivetrain model.
//!
//! Two drivers fit [`DriveParameters`](mecdrive_dynamics::params::DriveParameters)
//! to recorded telemetry:
//!
//! - [`GradientDescent`](descent::GradientDescent) walks the flat parameter
//!   vector along finite-difference gradients of the trajectory objective.
//! - [`RandomSearch`](search::RandomSearch) draws candidates from a
//!   [`SearchSpace`](search::SearchSpace) and keeps the best scorer.
//!
//! Both evaluate candidates in parallel and are deterministic for a given
//! seed and input set.

pub mod config;
pub mod descent;
pub mod error;
pub mod gradient;
pub mod search;

pub mod prelude {
    //! Convenient re-exports of the fitting surface.
    pub use crate::config::{ConfigError, TuneConfig};
    pub use crate::descent::{FitReport, GradientDescent};
    pub use crate::error::FitError;
    pub use crate::gradient::{default_tuned_indices, gradient, partial_derivative, DEFAULT_GRAD_STEP};
    pub use crate::search::{ParamRange, RandomSearch, RangeError, SearchReport, SearchSpace};
}
