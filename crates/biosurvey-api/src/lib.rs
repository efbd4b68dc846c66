//! HTTP + `WebSocket` API for the biosurvey indicator backend.
//!
//! # Modules
//!
//! - [`state`] -- shared application state (service + job queue)
//! - [`auth`] -- principal extraction from the gateway header
//! - [`handlers`] -- status and indicator endpoints
//! - [`jobs`] -- job submission, status, and downloads
//! - [`ws`] -- live job status stream
//! - [`router`] -- route table and middleware
//! - [`server`] -- TCP bind and serve
//! - [`error`] -- error-to-response mapping

pub mod auth;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
