//! Crux API - HTTP Surface and Background Task Host
//!
//! Serves the persisted and live rankings, route and log writes, climber
//! views, health and Prometheus metrics over Axum. The binary also owns
//! the completion trigger listener and the scheduled ranking job through
//! a [`SubscriptionTable`].

#[macro_use]
mod macros;

pub mod config;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod server;
pub mod state;
pub mod subscriptions;
pub mod telemetry;
pub mod types;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use openapi::ApiDoc;
pub use routes::create_api_router;
pub use server::{load_store, start_background_tasks};
pub use state::AppState;
pub use subscriptions::{SubscriptionPurpose, SubscriptionTable};
pub use types::*;
