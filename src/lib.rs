//! Educational email simulation service.
//!
//! Users keep parameterized HTML templates, render them with per-send
//! variables and queue the result for delivery. Every outgoing email is
//! marked as a simulation in its subject and carries an educational
//! disclaimer in its body.

// Shared infrastructure
pub mod config;
pub mod error;
pub mod metrics;
pub mod storage;
pub mod telemetry;

// Domain
pub mod apikey;
pub mod auth;
pub mod delivery;
pub mod email;
pub mod queue;
pub mod ratelimit;
pub mod template;

// Application layer
pub mod api;
pub mod server;
pub mod tasks;
