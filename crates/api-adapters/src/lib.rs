//! # api-adapters
//!
//! The HTTP face of PollStream: the axum router serving the Authoritative
//! Store (`web-axum`) and the reqwest client the Local Mirror uses to reach
//! it (`http-client`). Both sides share the bodies in [`dto`].

pub mod dto;

#[cfg(feature = "web-axum")]
pub mod error;
#[cfg(feature = "web-axum")]
pub mod handlers;
#[cfg(feature = "web-axum")]
pub mod metrics;
#[cfg(feature = "web-axum")]
pub mod middleware;
#[cfg(feature = "web-axum")]
pub mod routes;
#[cfg(feature = "web-axum")]
pub mod state;

#[cfg(feature = "http-client")]
pub mod http_client;

#[cfg(feature = "web-axum")]
pub use routes::router;
#[cfg(feature = "web-axum")]
pub use state::AppState;

#[cfg(feature = "http-client")]
pub use http_client::HttpPollClient;
