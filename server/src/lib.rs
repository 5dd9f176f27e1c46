//! The Visage HTTP service.
//!
//! ```text
//! GET  /                  service summary
//! GET  /health            liveness and engine state
//! GET  /blendshape-names  channel names of the loaded engine
//! GET  /status            cached readiness verdict (?refresh=true re-runs it)
//! POST /process-audio     multipart `file` → blendshape animation
//! ```
//!
//! [`router`] builds the axum application from an [`AppState`]; the binary
//! owns startup ordering (environment, native bring-up, engine, readiness)
//! and hands the results to [`AppState::new`].

mod config;
mod context;
mod error;
mod routes;
mod startup;
mod state;

pub use config::{default_config_path, expand_env, Config};
pub use context::RequestContext;
pub use error::{ApiError, ConfigError};
pub use routes::router;
pub use startup::standard_checks;
pub use state::AppState;
