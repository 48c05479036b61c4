//! HTTP server for the EDMS engineering data store.
//!
//! Exposes the service's write and read operations as a small REST API:
//! `POST /v1/{partition}` applies a write request and `GET
//! /v1/{partition}/{iid}` reads a Thing, its revision history or its file
//! data. Callers authenticate with static bearer tokens; everything else is
//! decided by the service's access gate.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;

pub use auth::{Action, AuthProvider, Credentials, Identity, TokenAuth};
pub use config::{SeedConfig, ServerConfig};
pub use error::{ErrorBody, ServerError, ServerResult};
pub use handler::{AppState, ReadQuery};
pub use server::{EdmsServer, SeededModel};
