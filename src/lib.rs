//! db-keyserver: per-user Cloudant databases with scoped API keys
//!
//! Creates an isolated database per ImageShare user and hands back a key that
//! can read and write only that database, so the administrator's credentials
//! never leave the server.

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
// Remote account seam and its Cloudant implementation
pub mod remote;
pub mod cloudant;
pub mod provision;
// REST API module: Axum handlers for GET /, PUT /get_key, GET /health
pub mod rest;
