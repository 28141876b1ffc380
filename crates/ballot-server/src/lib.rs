//! HTTP server for the ballot ledger.
//!
//! Exposes the ballot's calls as JSON endpoints. The caller of each mutating
//! request is identified by an [`AuthProvider`]; accepted calls are persisted
//! through a [`StateStore`](ballot_store::StateStore) when one is configured.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use auth::{AuthProvider, HeaderAuth, CALLER_HEADER};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::BallotServer;
pub use state::AppState;
