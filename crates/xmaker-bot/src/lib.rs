//! xmaker - cross-exchange market maker.
//!
//! Wires the pieces together:
//! - reference-price stream → market cache
//! - per-(pair, side) reconciler loops against the venue REST API
//! - shared rate budget, graceful shutdown on ctrl-c

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
