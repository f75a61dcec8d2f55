//! relay-axum: HTTP surface for relay-blob.
//!
//! Streams uploads into a [`relay_blob::RelayAdapter`], serves files and
//! byte ranges back out, and lists stored manifests.

pub mod app;
pub mod params;
pub mod routes;
pub mod state;
mod error;
pub use error::{RelayAxumError, NOT_FOUND_TEXT};
pub use state::RelayState;

pub use app::RelayApp;
