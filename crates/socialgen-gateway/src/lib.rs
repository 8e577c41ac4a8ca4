//! socialgen-gateway - HTTP API for content generation
//!
//! Exposes `POST /api/generate`, which cleans a transcript, builds the
//! platform prompt, runs it through the provider manager and returns the
//! parsed sections, plus `GET /api/status`.

pub mod protocol;
pub mod server;

pub use server::GatewayServer;
