//! HTTP surface of the inference service.
//!
//! `inference_router()` returns a composable `Router`; `start_server_on`
//! binds it and serves in the background until shut down.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::inference_router;
pub use server::{start_server_on, InferenceServer};
pub use types::ApiContext;
